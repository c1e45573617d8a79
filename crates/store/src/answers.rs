//! Final form state persistence.

use std::path::{Path, PathBuf};

use chrono::Utc;
use dialform_core::error::StoreError;
use dialform_core::state::FormState;
use tracing::info;

use crate::file_stamp;

/// Write the final form state to `<dir>/<form_id>_<timestamp>.json`.
///
/// Returns the path written. The directory is created if missing.
pub fn save_answers(dir: &Path, form_id: &str, state: &FormState) -> Result<PathBuf, StoreError> {
    std::fs::create_dir_all(dir).map_err(|e| StoreError::Write {
        path: dir.display().to_string(),
        reason: e.to_string(),
    })?;

    let path = dir.join(format!("{}_{}.json", form_id, file_stamp(Utc::now())));
    let json = serde_json::to_string_pretty(state)?;

    std::fs::write(&path, json).map_err(|e| StoreError::Write {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;

    info!(path = %path.display(), "Saved answers");
    Ok(path)
}

/// Read a previously saved form state back.
pub fn load_answers(path: &Path) -> Result<FormState, StoreError> {
    let content = std::fs::read_to_string(path).map_err(|e| StoreError::Read {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    Ok(serde_json::from_str(&content)?)
}
