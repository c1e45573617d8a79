//! Turn-by-turn transcript persistence.

use std::path::{Path, PathBuf};

use chrono::Utc;
use dialform_core::error::StoreError;
use dialform_core::message::Conversation;
use tracing::info;

use crate::file_stamp;

/// Write the full conversation log to `<dir>/<form_id>_<timestamp>.json`
/// as a JSON array of `{timestamp, role, content}` entries, error events
/// included.
pub fn save_transcript(
    dir: &Path,
    form_id: &str,
    conversation: &Conversation,
) -> Result<PathBuf, StoreError> {
    std::fs::create_dir_all(dir).map_err(|e| StoreError::Write {
        path: dir.display().to_string(),
        reason: e.to_string(),
    })?;

    let path = dir.join(format!("{}_{}.json", form_id, file_stamp(Utc::now())));
    let json = serde_json::to_string_pretty(&conversation.messages)?;

    std::fs::write(&path, json).map_err(|e| StoreError::Write {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;

    info!(path = %path.display(), entries = conversation.messages.len(), "Saved transcript");
    Ok(path)
}
