//! # Field Value Converter
//!
//! Converts a textual scalar into a typed [`Value`] matching a field's declared kind.
//!
//! Only the scalar kinds a human can reasonably type on one line are supported: strings,
//! 32/64-bit signed integers (all sign-variant encodings decode identically at this
//! layer), 64-bit floats and booleans. Anything else (nested messages, repeated fields,
//! bytes, enums, ...) is reported as an unsupported kind rather than guessed at.
use prost_reflect::{FieldDescriptor, Kind, Value};

#[derive(Debug, thiserror::Error)]
pub enum ConversionError {
    #[error("Field '{field}' has kind '{kind}' which does not accept scalar text input")]
    UnsupportedKind { field: String, kind: String },

    #[error("Invalid value for field '{field}' of kind '{kind}': {reason}")]
    InvalidValue {
        field: String,
        kind: String,
        reason: String,
    },
}

impl ConversionError {
    /// The name of the field the input was rejected for.
    pub fn field(&self) -> &str {
        match self {
            ConversionError::UnsupportedKind { field, .. } => field,
            ConversionError::InvalidValue { field, .. } => field,
        }
    }
}

/// Converts raw text into a typed value for `field`.
///
/// # Returns
///
/// * `Ok(Some(value))` - The text parsed as the field's declared kind.
/// * `Ok(None)` - The input was empty. An empty input is a deliberate skip (the field
///   stays at its zero value), never an error.
/// * `Err(ConversionError)` - The text did not parse, or the kind is unsupported.
pub fn convert(field: &FieldDescriptor, raw: &str) -> Result<Option<Value>, ConversionError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }

    if field.is_list() || field.is_map() {
        return Err(unsupported(field));
    }

    let value = match field.kind() {
        Kind::String => Value::String(raw.to_string()),
        Kind::Int32 | Kind::Sint32 | Kind::Sfixed32 => {
            Value::I32(raw.parse().map_err(|e| invalid(field, e))?)
        }
        Kind::Int64 | Kind::Sint64 | Kind::Sfixed64 => {
            Value::I64(raw.parse().map_err(|e| invalid(field, e))?)
        }
        Kind::Double => Value::F64(raw.parse().map_err(|e| invalid(field, e))?),
        Kind::Bool => Value::Bool(raw.parse().map_err(|e| invalid(field, e))?),
        _ => return Err(unsupported(field)),
    };

    Ok(Some(value))
}

fn kind_name(field: &FieldDescriptor) -> String {
    if field.is_map() {
        "map".to_string()
    } else if field.is_list() {
        format!("repeated {:?}", field.kind())
    } else {
        format!("{:?}", field.kind())
    }
}

fn unsupported(field: &FieldDescriptor) -> ConversionError {
    ConversionError::UnsupportedKind {
        field: field.name().to_string(),
        kind: kind_name(field),
    }
}

fn invalid(field: &FieldDescriptor, reason: impl std::fmt::Display) -> ConversionError {
    ConversionError::InvalidValue {
        field: field.name().to_string(),
        kind: kind_name(field),
        reason: reason.to_string(),
    }
}
