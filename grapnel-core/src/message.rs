//! # Dynamic Message Construction & Rendering
//!
//! Schema-driven message handling for methods whose types are known only at runtime.
//! No compiled struct exists for a discovered method, so every field is addressed
//! through its [`prost_reflect::FieldDescriptor`] rather than a named struct member.
//!
//! [`build_request`] turns ordered `(field name, raw text)` pairs into a populated
//! [`DynamicMessage`], running each value through the [`crate::convert`] layer.
//! [`render`] produces the protojson-style display form of any dynamic message:
//! verbatim proto field names, unset fields shown with their zero values, keys in
//! declaration order.
use crate::convert::{self, ConversionError};
use prost_reflect::{DynamicMessage, MethodDescriptor, SerializeOptions};

#[derive(Debug, thiserror::Error)]
pub enum BuildRequestError {
    #[error("Message '{message}' has no field named '{field}'")]
    UnknownField { message: String, field: String },
}

#[derive(Debug, thiserror::Error)]
#[error("Failed to render message as JSON: {0}")]
pub struct RenderError(#[from] serde_json::Error);

/// The result of building a request message from raw textual input.
///
/// Conversion failures do not abort the build: the offending field is left unset and
/// the error is collected in `rejected`, so the caller can report every bad input at
/// once and still decide to send the message.
#[derive(Debug)]
pub struct RequestOutcome {
    pub message: DynamicMessage,
    pub rejected: Vec<ConversionError>,
}

/// Creates an empty request message for `method`, all fields unset.
pub fn new_request(method: &MethodDescriptor) -> DynamicMessage {
    DynamicMessage::new(method.input())
}

/// Builds a request message for `method` from ordered `(field name, raw text)` pairs.
///
/// Empty raw values are deliberate skips and leave the field at its zero value. Values
/// that fail conversion are reported in [`RequestOutcome::rejected`] and also leave the
/// field unset.
///
/// # Errors
///
/// Returns [`BuildRequestError::UnknownField`] if an input names a field that does not
/// exist on the method's input type. Unlike a bad value, that is a caller bug.
pub fn build_request(
    method: &MethodDescriptor,
    inputs: &[(String, String)],
) -> Result<RequestOutcome, BuildRequestError> {
    let descriptor = method.input();
    let mut message = DynamicMessage::new(descriptor.clone());
    let mut rejected = Vec::new();

    for (name, raw) in inputs {
        let field =
            descriptor
                .get_field_by_name(name)
                .ok_or_else(|| BuildRequestError::UnknownField {
                    message: descriptor.full_name().to_string(),
                    field: name.clone(),
                })?;

        match convert::convert(&field, raw) {
            Ok(Some(value)) => {
                message.set_field(&field, value);
            }
            Ok(None) => {}
            Err(err) => rejected.push(err),
        }
    }

    Ok(RequestOutcome { message, rejected })
}

/// Renders a message in its display form: pretty protojson with verbatim proto field
/// names, unset fields emitted with their zero values, and keys in declaration order.
/// 64-bit integers are stringified, per the protojson convention.
pub fn render(message: &DynamicMessage) -> Result<String, RenderError> {
    let options = SerializeOptions::new()
        .use_proto_field_name(true)
        .skip_default_fields(false);

    let value = message.serialize_with_options(serde_json::value::Serializer, &options)?;
    Ok(serde_json::to_string_pretty(&value)?)
}
