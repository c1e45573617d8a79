//! State reconciliation under the no-regression invariant.
//!
//! The prompt policy already tells the model not to touch frozen fields;
//! the merger enforces the same rule structurally, so a confused model
//! cannot undo previously-settled answers. The merger never infers user
//! intent — the dialog engine flags correction turns explicitly.

use dialform_core::error::ExtractionError;
use dialform_core::state::{FieldStatus, FormState};
use tracing::warn;

/// Merge a validated candidate into the authoritative state.
///
/// - A candidate missing any authoritative field rejects the whole merge,
///   preserving the total-key invariant.
/// - Fields with status `filled` or `skipped` are frozen: a candidate
///   overwrite is dropped (and logged) unless `correction` is set.
/// - A field once `filled` never reverts to `not_started`, correction or
///   not — a correction replaces a value, it does not un-start a field.
/// - `optional` always keeps its initialization-derived value.
pub fn merge(
    current: &mut FormState,
    candidate: &FormState,
    correction: bool,
) -> Result<(), ExtractionError> {
    let missing: Vec<&str> = current
        .field_names()
        .filter(|name| !candidate.contains(name.as_str()))
        .map(String::as_str)
        .collect();
    if !missing.is_empty() {
        return Err(ExtractionError::SchemaViolation {
            detail: format!("candidate is missing fields: {}", missing.join(", ")),
        });
    }

    let names: Vec<String> = current.field_names().cloned().collect();
    for name in names {
        // presence of both sides established above
        let Some(incoming) = candidate.get(&name).cloned() else {
            continue;
        };
        let Some(field) = current.get_mut(&name) else {
            continue;
        };

        let frozen = field.status.is_frozen();
        let changed = incoming.status != field.status || incoming.value != field.value;

        if frozen && changed && !correction {
            warn!(
                field = %name,
                current = field.status.as_str(),
                candidate = incoming.status.as_str(),
                "Dropping candidate overwrite of frozen field"
            );
            continue;
        }

        if field.status == FieldStatus::Filled && incoming.status == FieldStatus::NotStarted {
            warn!(field = %name, "Refusing to revert a filled field to not_started");
            continue;
        }

        field.value = incoming.value;
        field.status = incoming.status;
        // optional is derived at init and never follows the candidate
    }

    Ok(())
}
