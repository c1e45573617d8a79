//! Response validation: raw model text → validated candidate state.
//!
//! The model is instructed to answer with a single JSON object
//! `{"state": ..., "next_question": ...}`. Everything it sends is treated
//! as hostile until proven otherwise: parsing is strict, every violation
//! names what went wrong, and nothing reaches the authoritative state
//! without passing here first. Pure — no network or file I/O.

use std::collections::BTreeMap;

use dialform_core::error::ExtractionError;
use dialform_core::schema::{FieldSpec, FormSchema};
use dialform_core::state::{FieldState, FieldStatus, FormState};
use dialform_core::value::FieldValue;
use serde_json::Value;
use tracing::debug;

/// Strip a single fenced code block (``` or ```json) from a model reply.
///
/// Models wrap JSON in markdown fences despite instructions; one level of
/// unwrapping is tolerated, anything deeper is the model's problem.
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop an optional language tag on the fence line
    let rest = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest.strip_prefix("json").unwrap_or(rest),
    };
    match rest.rfind("```") {
        Some(end) => rest[..end].trim(),
        None => rest.trim(),
    }
}

/// Parse and validate a raw model reply against the extraction contract.
///
/// On success returns the candidate state, restricted to exactly the
/// schema's field names, plus the model's follow-up question.
pub fn parse_extraction(
    raw: &str,
    schema: &FormSchema,
) -> Result<(FormState, Option<String>), ExtractionError> {
    // 1-2. Direct parse, then one markdown-stripping retry.
    let parsed: Value = match serde_json::from_str(raw.trim()) {
        Ok(value) => value,
        Err(_) => {
            let stripped = strip_code_fence(raw);
            serde_json::from_str(stripped)
                .map_err(|e| ExtractionError::MalformedOutput(e.to_string()))?
        }
    };

    let Some(object) = parsed.as_object() else {
        return Err(ExtractionError::MalformedOutput(format!(
            "expected a JSON object, got {parsed}"
        )));
    };

    // 3. Exactly the keys `state` and `next_question`.
    for key in ["state", "next_question"] {
        if !object.contains_key(key) {
            return Err(ExtractionError::SchemaViolation {
                detail: format!("missing top-level key: {key}"),
            });
        }
    }
    if object.len() != 2 {
        let extra: Vec<&str> = object
            .keys()
            .map(String::as_str)
            .filter(|k| !matches!(*k, "state" | "next_question"))
            .collect();
        return Err(ExtractionError::SchemaViolation {
            detail: format!("unexpected top-level keys: {}", extra.join(", ")),
        });
    }

    // 4. Type checks on both keys.
    let state_obj = object["state"]
        .as_object()
        .ok_or_else(|| ExtractionError::SchemaViolation {
            detail: "state must be an object".into(),
        })?;

    let next_question = match &object["next_question"] {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => {
            return Err(ExtractionError::SchemaViolation {
                detail: format!("next_question must be a string or null, got {other}"),
            });
        }
    };

    // 5. The state's key set must cover every schema field; unknown keys
    // are tolerated and dropped.
    let missing: Vec<&str> = schema
        .fields
        .iter()
        .map(|f| f.name.as_str())
        .filter(|name| !state_obj.contains_key(*name))
        .collect();
    if !missing.is_empty() {
        return Err(ExtractionError::SchemaViolation {
            detail: format!("state is missing schema fields: {}", missing.join(", ")),
        });
    }
    for key in state_obj.keys() {
        if schema.field(key).is_none() {
            debug!(field = %key, "Dropping unknown field from model state");
        }
    }

    // 6-7. Per-field validation, restricted to the schema's fields.
    let mut fields = BTreeMap::new();
    for spec in &schema.fields {
        let entry = &state_obj[&spec.name];
        let field = validate_field(&spec.name, entry)?;
        let field = enforce_value_invariants(spec, field)?;
        fields.insert(spec.name.clone(), field);
    }

    Ok((FormState::from_fields(fields), next_question))
}

/// Structural validation of one field entry: the three required keys,
/// a boolean `optional`, a canonical `status`.
fn validate_field(name: &str, entry: &Value) -> Result<FieldState, ExtractionError> {
    let object = entry
        .as_object()
        .ok_or_else(|| ExtractionError::SchemaViolation {
            detail: format!("field {name}: entry must be an object"),
        })?;

    for key in ["value", "status", "optional"] {
        if !object.contains_key(key) {
            return Err(ExtractionError::SchemaViolation {
                detail: format!("field {name}: missing key {key}"),
            });
        }
    }

    let optional = object["optional"]
        .as_bool()
        .ok_or_else(|| ExtractionError::SchemaViolation {
            detail: format!("field {name}: optional must be a boolean"),
        })?;

    let status: FieldStatus = serde_json::from_value(object["status"].clone()).map_err(|_| {
        ExtractionError::SchemaViolation {
            detail: format!("field {name}: unknown status {}", object["status"]),
        }
    })?;

    let value = match &object["value"] {
        Value::Null => None,
        other => Some(other.clone()),
    };

    Ok(FieldState {
        value,
        status,
        optional,
    })
}

/// Enforce the data-model invariants tying status to value:
/// `filled` values must normalize against the declared type (and are
/// canonicalized in passing), `not_started` values are coerced to null.
fn enforce_value_invariants(
    spec: &FieldSpec,
    mut field: FieldState,
) -> Result<FieldState, ExtractionError> {
    match field.status {
        FieldStatus::Filled => {
            let raw = field
                .value
                .as_ref()
                .ok_or_else(|| ExtractionError::SchemaViolation {
                    detail: format!("field {}: status filled with null value", spec.name),
                })?;
            let typed = FieldValue::from_json(spec, raw).map_err(|reason| {
                ExtractionError::SchemaViolation {
                    detail: format!("field {}: {reason}", spec.name),
                }
            })?;
            field.value = Some(typed.to_json());
        }
        FieldStatus::NotStarted => {
            field.value = None;
        }
        // invalid keeps whatever the model reported (forensics);
        // skipped may carry a leftover value that is simply ignored
        FieldStatus::Invalid | FieldStatus::Skipped => {}
    }
    Ok(field)
}
