//! # Error Hierarchy
//!
//! Codec and validation errors, built with `thiserror`.
//!
//! Decode-time corruption (`Integrity`, `UnsupportedVersion`, `Truncated`) is
//! kept apart from structural problems in the credential itself
//! (`Validation`) so callers can tell a damaged inscription from a
//! well-framed but malformed credential.

use thiserror::Error;

/// Errors from [`encode()`](crate::encode) and [`decode()`](crate::decode).
#[derive(Error, Debug)]
pub enum CodecError {
    /// The credential is structurally invalid.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The trailing CRC-32 is absent or does not match the framed bytes.
    #[error("integrity error: {}", describe_checksum(.stored, .computed))]
    Integrity {
        /// Checksum read from the last four bytes; `None` when the payload is
        /// shorter than a checksum.
        stored: Option<u32>,
        /// Checksum recomputed over the preceding bytes.
        computed: u32,
    },

    /// The leading version byte is not a supported format version.
    #[error("unsupported payload version {0:#04x}")]
    UnsupportedVersion(u8),

    /// The payload is shorter than its framing or declared length requires.
    #[error("truncated payload: {declared} bytes declared, {available} available")]
    Truncated {
        /// Byte count required by the frame header.
        declared: usize,
        /// Byte count actually present.
        available: usize,
    },

    /// The JSON body exceeds the `u32` length field.
    #[error("payload body of {0} bytes does not fit the 32-bit length field")]
    Oversized(usize),

    /// Canonical serialization of the credential failed.
    #[error("canonicalization error: {0}")]
    Canonicalization(#[from] CanonicalizationError),

    /// The framed body is not valid JSON.
    #[error("payload body is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

fn describe_checksum(stored: &Option<u32>, computed: &u32) -> String {
    match stored {
        Some(stored) => {
            format!("checksum mismatch (stored {stored:#010x}, computed {computed:#010x})")
        }
        None => "payload is shorter than its checksum".to_string(),
    }
}

/// Structural problems in a credential.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The value is not a JSON object.
    #[error("credential must be a JSON object")]
    NotAnObject,

    /// A required top-level field is absent or empty.
    #[error("missing required field: {field}")]
    MissingField {
        /// Name of the missing field.
        field: String,
    },

    /// A required `credentialSubject` field is absent or empty.
    #[error("missing required field in credentialSubject: {field}")]
    MissingSubjectField {
        /// Name of the missing subject field.
        field: String,
    },

    /// `@context` does not include the W3C VC v1 context URI.
    #[error("@context must include {0}")]
    MissingContext(&'static str),

    /// A field holds a value outside its enumerated set.
    #[error("invalid {field}: {value:?}")]
    InvalidEnum {
        /// Field name.
        field: &'static str,
        /// Offending value.
        value: String,
    },

    /// The value has every required field but does not match the credential
    /// shape (wrong types, bad date formats).
    #[error("malformed credential: {0}")]
    Malformed(String),
}

/// Errors during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// Float values have no stable canonical form.
    #[error("float values are not permitted in canonical credential JSON: {0}")]
    FloatRejected(f64),

    /// JSON serialization failed during canonicalization.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integrity_messages() {
        let mismatch = CodecError::Integrity {
            stored: Some(0xdead_beef),
            computed: 0x0000_0001,
        };
        assert_eq!(
            mismatch.to_string(),
            "integrity error: checksum mismatch (stored 0xdeadbeef, computed 0x00000001)"
        );
        let absent = CodecError::Integrity {
            stored: None,
            computed: 0,
        };
        assert_eq!(
            absent.to_string(),
            "integrity error: payload is shorter than its checksum"
        );
    }
}
