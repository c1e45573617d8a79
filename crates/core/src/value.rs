//! Typed field values.
//!
//! The model hands back raw JSON scalars and lists; [`FieldValue`] is the
//! tagged union that re-types them against the field's declared
//! [`FieldType`](crate::schema::FieldType). All normalization lives here,
//! one branch per type tag, so type checks never scatter across call
//! sites. On the wire (state JSON, answer files) a value stays a plain
//! JSON scalar/array; the declared schema type is what re-types it.

use chrono::NaiveDate;
use serde_json::Value;

use crate::schema::{FieldSpec, FieldType};

/// A schema-typed field value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Date(NaiveDate),
    Email(String),
    Phone(String),
    Url(String),
    Enum(String),
    MultiEnum(Vec<String>),
    ListStr(Vec<String>),
    Reference(String),
}

/// The canonical date format values are normalized to.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

impl FieldValue {
    /// Parse a raw JSON value against the field's declared type.
    ///
    /// Returns a human-readable reason on failure; the caller decides
    /// whether that is a contract violation (status claimed `filled`) or
    /// merely an un-normalizable value.
    pub fn from_json(spec: &FieldSpec, raw: &Value) -> Result<Self, String> {
        match spec.field_type {
            FieldType::Str => match raw.as_str() {
                Some(s) => Ok(FieldValue::Str(s.to_string())),
                None => Err(format!("expected a string, got {raw}")),
            },
            FieldType::Int => match raw {
                Value::Number(n) => n
                    .as_i64()
                    .map(FieldValue::Int)
                    .ok_or_else(|| format!("not an integer: {n}")),
                Value::String(s) => s
                    .trim()
                    .parse::<i64>()
                    .map(FieldValue::Int)
                    .map_err(|_| format!("not an integer: {s}")),
                _ => Err(format!("expected an integer, got {raw}")),
            },
            FieldType::Float => match raw {
                Value::Number(n) => n
                    .as_f64()
                    .map(FieldValue::Float)
                    .ok_or_else(|| format!("not a float: {n}")),
                Value::String(s) => s
                    .trim()
                    .parse::<f64>()
                    .map(FieldValue::Float)
                    .map_err(|_| format!("not a float: {s}")),
                _ => Err(format!("expected a number, got {raw}")),
            },
            FieldType::Bool => match raw {
                Value::Bool(b) => Ok(FieldValue::Bool(*b)),
                Value::String(s) => match s.trim().to_lowercase().as_str() {
                    "true" => Ok(FieldValue::Bool(true)),
                    "false" => Ok(FieldValue::Bool(false)),
                    other => Err(format!("not a boolean: {other}")),
                },
                _ => Err(format!("expected a boolean, got {raw}")),
            },
            FieldType::Date => {
                let s = raw.as_str().ok_or_else(|| format!("expected a date string, got {raw}"))?;
                NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
                    .map(FieldValue::Date)
                    .map_err(|_| format!("date not in {DATE_FORMAT} form: {s}"))
            }
            FieldType::Email => {
                let s = raw.as_str().ok_or_else(|| format!("expected an email string, got {raw}"))?;
                let s = s.trim();
                match s.split_once('@') {
                    Some((local, domain))
                        if !local.is_empty() && !domain.is_empty() && !domain.contains('@') =>
                    {
                        Ok(FieldValue::Email(s.to_string()))
                    }
                    _ => Err(format!("not an email address: {s}")),
                }
            }
            FieldType::Phone => {
                let s = raw.as_str().ok_or_else(|| format!("expected a phone string, got {raw}"))?;
                let digits: String = s
                    .chars()
                    .filter(|c| !matches!(c, ' ' | '-' | '(' | ')' | '.'))
                    .collect();
                let rest = digits.strip_prefix('+').unwrap_or(&digits);
                if rest.len() >= 5 && rest.chars().all(|c| c.is_ascii_digit()) {
                    Ok(FieldValue::Phone(s.trim().to_string()))
                } else {
                    Err(format!("not a phone number: {s}"))
                }
            }
            FieldType::Url => {
                let s = raw.as_str().ok_or_else(|| format!("expected a url string, got {raw}"))?;
                let s = s.trim();
                let rest = s
                    .strip_prefix("https://")
                    .or_else(|| s.strip_prefix("http://"));
                match rest {
                    Some(rest) if !rest.is_empty() => Ok(FieldValue::Url(s.to_string())),
                    _ => Err(format!("not an http(s) url: {s}")),
                }
            }
            FieldType::Enum => {
                let s = raw.as_str().ok_or_else(|| format!("expected a string option, got {raw}"))?;
                let options = spec.options.as_deref().unwrap_or_default();
                if options.iter().any(|o| o == s) {
                    Ok(FieldValue::Enum(s.to_string()))
                } else {
                    Err(format!("{s} is not one of the allowed options"))
                }
            }
            FieldType::MultiEnum => {
                let items = as_string_array(raw)?;
                let options = spec.options.as_deref().unwrap_or_default();
                for item in &items {
                    if !options.iter().any(|o| o == item) {
                        return Err(format!("{item} is not one of the allowed options"));
                    }
                }
                Ok(FieldValue::MultiEnum(items))
            }
            FieldType::ListStr => Ok(FieldValue::ListStr(as_string_array(raw)?)),
            FieldType::Reference => {
                let s = raw.as_str().ok_or_else(|| format!("expected a reference string, got {raw}"))?;
                if s.trim().is_empty() {
                    Err("empty reference".into())
                } else {
                    Ok(FieldValue::Reference(s.trim().to_string()))
                }
            }
        }
    }

    /// The canonical wire representation: a plain JSON scalar or array.
    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Str(s)
            | FieldValue::Email(s)
            | FieldValue::Phone(s)
            | FieldValue::Url(s)
            | FieldValue::Enum(s)
            | FieldValue::Reference(s) => Value::String(s.clone()),
            FieldValue::Int(i) => Value::from(*i),
            FieldValue::Float(f) => Value::from(*f),
            FieldValue::Bool(b) => Value::Bool(*b),
            FieldValue::Date(d) => Value::String(d.format(DATE_FORMAT).to_string()),
            FieldValue::MultiEnum(items) | FieldValue::ListStr(items) => {
                Value::Array(items.iter().cloned().map(Value::String).collect())
            }
        }
    }
}

fn as_string_array(raw: &Value) -> Result<Vec<String>, String> {
    let arr = raw.as_array().ok_or_else(|| format!("expected an array of strings, got {raw}"))?;
    arr.iter()
        .map(|v| {
            v.as_str()
                .map(str::to_string)
                .ok_or_else(|| format!("expected a string element, got {v}"))
        })
        .collect()
}
