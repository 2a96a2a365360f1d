//! Schema field descriptors
//!
//! Mirrors the JSON emitted by `bq show --schema --format=json`: an ordered
//! list of `{name, type, mode?, fields?}` records where RECORD fields nest
//! their children under `fields`.

use crate::{Error, Result};
use serde::Deserialize;
use serde_json::Value;

/// Declared column type
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(from = "String")]
pub enum FieldType {
    Integer,
    String,
    Boolean,
    Record,
    /// Any type the generators never aggregate (FLOAT, TIMESTAMP, ...)
    Other(String),
}

impl FieldType {
    pub fn as_str(&self) -> &str {
        match self {
            FieldType::Integer => "INTEGER",
            FieldType::String => "STRING",
            FieldType::Boolean => "BOOLEAN",
            FieldType::Record => "RECORD",
            FieldType::Other(name) => name,
        }
    }
}

impl From<String> for FieldType {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_uppercase().as_str() {
            "INTEGER" | "INT64" => FieldType::Integer,
            "STRING" => FieldType::String,
            "BOOLEAN" | "BOOL" => FieldType::Boolean,
            "RECORD" | "STRUCT" => FieldType::Record,
            _ => FieldType::Other(value),
        }
    }
}

/// A single column of the source table
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SchemaField {
    /// Column name
    pub name: String,
    /// Declared type
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// NULLABLE, REQUIRED or REPEATED
    #[serde(default)]
    pub mode: Option<String>,
    /// Nested columns for RECORD types
    #[serde(default)]
    pub fields: Vec<SchemaField>,
}

impl SchemaField {
    /// Create a leaf field
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            mode: None,
            fields: Vec::new(),
        }
    }

    /// Create a RECORD field with the given children
    pub fn record(name: impl Into<String>, fields: Vec<SchemaField>) -> Self {
        Self {
            name: name.into(),
            field_type: FieldType::Record,
            mode: None,
            fields,
        }
    }

    /// Set mode
    pub fn with_mode(mut self, mode: impl Into<String>) -> Self {
        self.mode = Some(mode.into());
        self
    }

    pub fn is_record(&self) -> bool {
        self.field_type == FieldType::Record
    }

    /// Look up a direct child by name
    pub fn child(&self, name: &str) -> Option<&SchemaField> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// The single nested field of a RECORD, if it has exactly one.
    pub fn only_child(&self) -> Option<&SchemaField> {
        match self.fields.as_slice() {
            [only] if self.is_record() => Some(only),
            _ => None,
        }
    }

    /// The `(key, value)` pair of a RECORD that has exactly two children.
    pub fn key_value_pair(&self) -> Option<(&SchemaField, &SchemaField)> {
        match self.fields.as_slice() {
            [key, value] if self.is_record() => Some((key, value)),
            _ => None,
        }
    }
}

/// Walk a path of nested field names from the top level of a schema.
pub fn find_path<'a>(fields: &'a [SchemaField], path: &[&str]) -> Option<&'a SchemaField> {
    let (first, rest) = path.split_first()?;
    let mut current = fields.iter().find(|f| f.name == *first)?;
    for name in rest {
        current = current.child(name)?;
    }
    Some(current)
}

/// Parse a schema payload.
///
/// Accepts either the bare array printed by `bq show --schema` or an object
/// wrapping it under `fields`. Anything else, including a field record
/// without `name` or `type` or a RECORD without children, is reported as
/// [`Error::MalformedSchema`].
pub fn parse_schema(raw: &str) -> Result<Vec<SchemaField>> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|e| Error::MalformedSchema(format!("schema is not valid JSON: {e}")))?;

    let fields = match value {
        Value::Array(_) => value,
        Value::Object(mut map) => match map.remove("fields") {
            Some(fields @ Value::Array(_)) => fields,
            _ => {
                return Err(Error::MalformedSchema(
                    "expected a JSON array of field descriptors or an object with a `fields` array"
                        .to_string(),
                ))
            }
        },
        other => {
            return Err(Error::MalformedSchema(format!(
                "expected a JSON array of field descriptors, got {}",
                json_kind(&other)
            )))
        }
    };

    let fields: Vec<SchemaField> =
        serde_json::from_value(fields).map_err(|e| Error::MalformedSchema(e.to_string()))?;
    check_records(&fields)?;
    Ok(fields)
}

/// Every RECORD must carry its nested `fields`.
fn check_records(fields: &[SchemaField]) -> Result<()> {
    for field in fields {
        if field.is_record() {
            if field.fields.is_empty() {
                return Err(Error::MalformedSchema(format!(
                    "RECORD field `{}` has no `fields`",
                    field.name
                )));
            }
            check_records(&field.fields)?;
        }
    }
    Ok(())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
