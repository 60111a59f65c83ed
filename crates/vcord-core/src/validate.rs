//! # Structural Validation
//!
//! Runs on the JSON form of a credential so that a missing field is reported
//! by name, whatever the source of the value (a typed
//! [`IdentityCredential`], a raw JSON document, or a decoded payload).
//!
//! A field counts as missing when it is absent, `null`, an empty string, or
//! an empty array.

use serde::Deserialize;
use serde_json::Value;

use crate::credential::{DocumentType, IdentityCredential, VerificationLevel, W3C_VC_CONTEXT_V1};
use crate::error::ValidationError;

/// Top-level fields every credential must carry, in check order.
pub const REQUIRED_FIELDS: [&str; 6] = [
    "@context",
    "type",
    "issuer",
    "issuanceDate",
    "expirationDate",
    "credentialSubject",
];

/// `credentialSubject` fields every credential must carry, in check order.
pub const REQUIRED_SUBJECT_FIELDS: [&str; 9] = [
    "id",
    "fullName",
    "dateOfBirth",
    "nationality",
    "documentType",
    "documentNumber",
    "verificationLevel",
    "verificationDate",
    "expirationDate",
];

fn is_missing(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(Value::Array(a)) => a.is_empty(),
        Some(_) => false,
    }
}

fn context_has_w3c(context: &Value) -> bool {
    match context {
        Value::String(s) => s == W3C_VC_CONTEXT_V1,
        Value::Array(items) => items.iter().any(|c| c.as_str() == Some(W3C_VC_CONTEXT_V1)),
        _ => false,
    }
}

fn check_enum(
    subject: &serde_json::Map<String, Value>,
    field: &'static str,
    allowed: &[&str],
) -> Result<(), ValidationError> {
    match subject.get(field) {
        Some(Value::String(s)) if allowed.contains(&s.as_str()) => Ok(()),
        Some(other) => Err(ValidationError::InvalidEnum {
            field,
            value: other.as_str().map_or_else(|| other.to_string(), str::to_string),
        }),
        None => Err(ValidationError::MissingSubjectField {
            field: field.to_string(),
        }),
    }
}

/// Check the required fields, the W3C context, and the subject enums.
pub fn validate_structure(value: &Value) -> Result<(), ValidationError> {
    let obj = value.as_object().ok_or(ValidationError::NotAnObject)?;

    if let Some(field) = REQUIRED_FIELDS.iter().find(|f| is_missing(obj.get(**f))) {
        return Err(ValidationError::MissingField {
            field: (*field).to_string(),
        });
    }

    if !obj.get("@context").is_some_and(context_has_w3c) {
        return Err(ValidationError::MissingContext(W3C_VC_CONTEXT_V1));
    }

    let subject = obj
        .get("credentialSubject")
        .and_then(Value::as_object)
        .ok_or_else(|| ValidationError::Malformed("credentialSubject must be an object".into()))?;

    if let Some(field) = REQUIRED_SUBJECT_FIELDS
        .iter()
        .find(|f| is_missing(subject.get(**f)))
    {
        return Err(ValidationError::MissingSubjectField {
            field: (*field).to_string(),
        });
    }

    check_enum(subject, "documentType", &DocumentType::WIRE_NAMES)?;
    check_enum(subject, "verificationLevel", &VerificationLevel::WIRE_NAMES)?;
    Ok(())
}

/// Validate a JSON value and read it as a typed credential.
///
/// The value is borrowed so callers can keep framing the document they were
/// given; the typed view is lossless (see [`IdentityCredential`]).
pub fn parse_credential(value: &Value) -> Result<IdentityCredential, ValidationError> {
    validate_structure(value)?;
    IdentityCredential::deserialize(value).map_err(|e| ValidationError::Malformed(e.to_string()))
}
