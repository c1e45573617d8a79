//! Form schema domain types.
//!
//! A [`FormSchema`] is the immutable description of one form: an ordered
//! set of named, typed fields. Loaded once per session by the external
//! template loader and never mutated afterward.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::SchemaError;

/// The declared type of a form field.
///
/// Drives value normalization: every raw value the model produces is
/// parsed against this tag before it may be stored (see
/// [`crate::value::FieldValue`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Str,
    Int,
    Float,
    Bool,
    Date,
    Email,
    Phone,
    Url,
    Enum,
    MultiEnum,
    ListStr,
    Reference,
}

impl FieldType {
    /// Whether this type requires a non-empty `options` list on the field.
    pub fn needs_options(&self) -> bool {
        matches!(self, FieldType::Enum | FieldType::MultiEnum)
    }
}

/// One named, typed slot in a form schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Unique key within the form.
    pub name: String,

    /// Declared value type.
    #[serde(rename = "type")]
    pub field_type: FieldType,

    /// Whether the field must be filled before the form is complete.
    pub required: bool,

    /// Human-readable description, shown to the user and to the model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Allowed values, present iff the type is enum or multi_enum.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,

    /// Kind of entity a reference field points at (e.g. "city").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_type: Option<String>,
}

/// An immutable form description: identifying metadata plus an ordered
/// sequence of field specs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormSchema {
    /// Unique template id, used to select the form on the command line.
    pub id: String,

    /// Display title.
    #[serde(default)]
    pub title: String,

    /// Display description.
    #[serde(default)]
    pub description: String,

    /// Ordered field specs. Order matters: the engine asks for fields in
    /// schema order.
    pub fields: Vec<FieldSpec>,
}

impl FormSchema {
    /// Check the schema-level invariants. Called eagerly by the template
    /// loader so a bad template fails before any dialog starts.
    ///
    /// - field names must be unique
    /// - enum/multi_enum fields must carry non-empty `options`
    /// - reference fields must carry `reference_type`
    pub fn validate(&self) -> Result<(), SchemaError> {
        let mut seen: HashSet<&str> = HashSet::new();
        for field in &self.fields {
            if field.name.is_empty() {
                return Err(SchemaError::Validation {
                    reason: "field with empty name".into(),
                });
            }
            if !seen.insert(field.name.as_str()) {
                return Err(SchemaError::Validation {
                    reason: format!("duplicate field name: {}", field.name),
                });
            }
            if field.field_type.needs_options() {
                match &field.options {
                    Some(options) if !options.is_empty() => {}
                    _ => {
                        return Err(SchemaError::Validation {
                            reason: format!(
                                "field {} requires non-empty options",
                                field.name
                            ),
                        });
                    }
                }
            }
            if field.field_type == FieldType::Reference && field.reference_type.is_none() {
                return Err(SchemaError::Validation {
                    reason: format!("reference field {} requires reference_type", field.name),
                });
            }
            if field.description.is_none() {
                tracing::warn!(
                    field = %field.name,
                    "field has no description; generated questions may be less precise"
                );
            }
        }
        Ok(())
    }

    /// Look up a field spec by name.
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// The ordered field names.
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }
}
