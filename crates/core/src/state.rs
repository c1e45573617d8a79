//! Per-field fill state and the full form state.
//!
//! [`FormState`] is the authoritative record of one session's progress:
//! one [`FieldState`] per schema field, no more, no fewer keys, always.
//! It is created once at session start from the schema and mutated in
//! place by the merger after every turn.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::schema::FormSchema;

/// Lifecycle tag of a field's fill progress.
///
/// This vocabulary is closed: any other value coming back from the model
/// is rejected by the response validator, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldStatus {
    NotStarted,
    Filled,
    Invalid,
    Skipped,
}

impl FieldStatus {
    /// Wire name of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldStatus::NotStarted => "not_started",
            FieldStatus::Filled => "filled",
            FieldStatus::Invalid => "invalid",
            FieldStatus::Skipped => "skipped",
        }
    }

    /// A field is frozen once the user has settled it: the merger refuses
    /// to overwrite it unless the turn is an explicit correction.
    pub fn is_frozen(&self) -> bool {
        matches!(self, FieldStatus::Filled | FieldStatus::Skipped)
    }

    /// A field is open while it still needs user attention.
    pub fn is_open(&self) -> bool {
        matches!(self, FieldStatus::NotStarted | FieldStatus::Invalid)
    }
}

/// The mutable record for one field: value, status, optionality.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldState {
    /// The current value as a plain JSON scalar/array. `None` serializes
    /// as `null`. Guaranteed to conform to the field's declared type
    /// whenever `status` is `filled`.
    pub value: Option<Value>,

    /// Fill progress.
    pub status: FieldStatus,

    /// Derived as `!required` at initialization, never changed afterward.
    pub optional: bool,
}

impl FieldState {
    /// A fresh, untouched field.
    pub fn not_started(optional: bool) -> Self {
        Self {
            value: None,
            status: FieldStatus::NotStarted,
            optional,
        }
    }
}

/// The complete set of field states for one session, keyed by field name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormState {
    fields: BTreeMap<String, FieldState>,
}

impl FormState {
    /// Create the initial state from a schema: every field present,
    /// `not_started`, with `optional` derived from `required`.
    pub fn init(schema: &FormSchema) -> Self {
        let fields = schema
            .fields
            .iter()
            .map(|f| (f.name.clone(), FieldState::not_started(!f.required)))
            .collect();
        Self { fields }
    }

    /// Build from an already-validated map. The caller is responsible for
    /// the total-key invariant (the response validator restricts to the
    /// schema's key set before constructing one of these).
    pub fn from_fields(fields: BTreeMap<String, FieldState>) -> Self {
        Self { fields }
    }

    pub fn get(&self, name: &str) -> Option<&FieldState> {
        self.fields.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut FieldState> {
        self.fields.get_mut(name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Iterate in key order (deterministic).
    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldState)> {
        self.fields.iter()
    }

    pub fn field_names(&self) -> impl Iterator<Item = &String> {
        self.fields.keys()
    }

    /// First field in **schema order** whose status is open
    /// (not_started or invalid). This is the next field to ask about.
    pub fn next_open<'a>(&self, schema: &'a FormSchema) -> Option<&'a str> {
        schema
            .fields
            .iter()
            .map(|f| f.name.as_str())
            .find(|&name| self.get(name).is_some_and(|f| f.status.is_open()))
    }

    /// First field in schema order with status `invalid`.
    pub fn first_invalid<'a>(&self, schema: &'a FormSchema) -> Option<&'a str> {
        schema
            .fields
            .iter()
            .map(|f| f.name.as_str())
            .find(|&name| self.get(name).is_some_and(|f| f.status == FieldStatus::Invalid))
    }

    pub fn has_invalid(&self) -> bool {
        self.fields.values().any(|f| f.status == FieldStatus::Invalid)
    }

    /// Complete when no field is open: everything is filled or skipped.
    pub fn is_complete(&self) -> bool {
        self.fields.values().all(|f| f.status.is_frozen())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldSpec, FieldType};
    use serde_json::json;

    fn two_field_schema() -> FormSchema {
        FormSchema {
            id: "t".into(),
            title: String::new(),
            description: String::new(),
            fields: vec![
                FieldSpec {
                    name: "Фамилия".into(),
                    field_type: FieldType::Str,
                    required: true,
                    description: None,
                    options: None,
                    reference_type: None,
                },
                FieldSpec {
                    name: "Имя".into(),
                    field_type: FieldType::Str,
                    required: false,
                    description: None,
                    options: None,
                    reference_type: None,
                },
            ],
        }
    }

    #[test]
    fn init_covers_every_schema_field() {
        let schema = two_field_schema();
        let state = FormState::init(&schema);
        assert_eq!(state.len(), 2);
        for name in schema.field_names() {
            let field = state.get(name).unwrap();
            assert_eq!(field.status, FieldStatus::NotStarted);
            assert!(field.value.is_none());
        }
        assert!(!state.get("Фамилия").unwrap().optional);
        assert!(state.get("Имя").unwrap().optional);
    }

    #[test]
    fn next_open_follows_schema_order() {
        let schema = two_field_schema();
        let mut state = FormState::init(&schema);
        assert_eq!(state.next_open(&schema), Some("Фамилия"));

        state.get_mut("Фамилия").unwrap().status = FieldStatus::Filled;
        assert_eq!(state.next_open(&schema), Some("Имя"));

        state.get_mut("Имя").unwrap().status = FieldStatus::Skipped;
        assert_eq!(state.next_open(&schema), None);
        assert!(state.is_complete());
    }

    #[test]
    fn invalid_field_keeps_form_open() {
        let schema = two_field_schema();
        let mut state = FormState::init(&schema);
        state.get_mut("Фамилия").unwrap().status = FieldStatus::Invalid;
        state.get_mut("Имя").unwrap().status = FieldStatus::Filled;
        assert!(state.has_invalid());
        assert!(!state.is_complete());
        assert_eq!(state.first_invalid(&schema), Some("Фамилия"));
    }

    #[test]
    fn state_json_roundtrip_is_lossless() {
        let schema = two_field_schema();
        let mut state = FormState::init(&schema);
        let field = state.get_mut("Фамилия").unwrap();
        field.value = Some(json!("Иванов"));
        field.status = FieldStatus::Filled;

        let json = serde_json::to_string(&state).unwrap();
        let parsed: FormState = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, state);
    }

    #[test]
    fn status_wire_names() {
        assert_eq!(
            serde_json::to_string(&FieldStatus::NotStarted).unwrap(),
            "\"not_started\""
        );
        let parsed: FieldStatus = serde_json::from_str("\"skipped\"").unwrap();
        assert_eq!(parsed, FieldStatus::Skipped);
        assert!(serde_json::from_str::<FieldStatus>("\"bogus\"").is_err());
    }
}
