//! Form template loading and listing.
//!
//! Templates are JSON files in a forms directory. Loading validates the
//! schema eagerly — a malformed template is fatal before any dialog
//! starts. Listing skips broken templates so one bad file does not hide
//! the rest.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use dialform_core::error::SchemaError;
use dialform_core::schema::FormSchema;
use tracing::debug;

/// Load and validate one form template.
pub fn load_form_template(path: &Path) -> Result<FormSchema, SchemaError> {
    let content = std::fs::read_to_string(path).map_err(|e| SchemaError::Io {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;

    let schema: FormSchema = serde_json::from_str(&content).map_err(|e| SchemaError::Parse {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;

    schema.validate()?;
    Ok(schema)
}

/// Scan a directory for form templates: template id → path.
///
/// Unparseable or invalid templates are skipped (logged at debug), and
/// the map is ordered for a stable interactive listing.
pub fn list_form_templates(dir: &Path) -> BTreeMap<String, PathBuf> {
    let mut result = BTreeMap::new();

    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(_) => return result,
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        match load_form_template(&path) {
            Ok(schema) => {
                result.insert(schema.id, path);
            }
            Err(e) => {
                debug!(path = %path.display(), error = %e, "Skipping invalid form template");
            }
        }
    }

    result
}
