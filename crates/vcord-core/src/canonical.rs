//! # Canonical JSON: Deterministic Credential Bodies
//!
//! This module defines [`CanonicalJson`], the only construction path for the
//! JSON body framed by the codec.
//!
//! ## Invariant
//!
//! The inner `Vec<u8>` is private. `CanonicalJson` is built only by
//! [`CanonicalJson::new()`] or [`CanonicalJson::from_value()`], so two
//! encodings of the same document always frame the same bytes and carry the
//! same CRC. Values are reordered, never reformatted.
//!
//! ## Rules
//!
//! 1. Reject floats. Credential fields are strings, integers or booleans.
//! 2. Sort object keys lexicographically at every depth.
//! 3. Use compact separators (no whitespace).

use std::collections::BTreeMap;

use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use serde_json::Value;

use crate::error::CanonicalizationError;

/// UTF-8 JSON bytes produced by canonical serialization.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalJson(Vec<u8>);

impl CanonicalJson {
    /// Canonicalize any serializable value.
    pub fn new(obj: &impl Serialize) -> Result<Self, CanonicalizationError> {
        let value = serde_json::to_value(obj)?;
        Self::from_value(&value)
    }

    /// Canonicalize an already-built JSON value.
    pub fn from_value(value: &Value) -> Result<Self, CanonicalizationError> {
        reject_floats(value)?;
        Ok(Self(serde_json::to_vec(&Sorted(value))?))
    }

    /// Access the canonical bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Consume and return the inner byte vector.
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

impl AsRef<[u8]> for CanonicalJson {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

fn reject_floats(value: &Value) -> Result<(), CanonicalizationError> {
    match value {
        Value::Number(n) if !n.is_i64() && !n.is_u64() => Err(
            CanonicalizationError::FloatRejected(n.as_f64().unwrap_or(f64::NAN)),
        ),
        Value::Object(map) => map.values().try_for_each(reject_floats),
        Value::Array(arr) => arr.iter().try_for_each(reject_floats),
        _ => Ok(()),
    }
}

/// Serializes a JSON value with object keys in sorted order, independent of
/// whether `serde_json` was built with `preserve_order`.
struct Sorted<'a>(&'a Value);

impl Serialize for Sorted<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0 {
            Value::Object(map) => {
                let sorted: BTreeMap<&String, &Value> = map.iter().collect();
                let mut out = serializer.serialize_map(Some(sorted.len()))?;
                for (k, v) in sorted {
                    out.serialize_entry(k, &Sorted(v))?;
                }
                out.end()
            }
            Value::Array(arr) => {
                let mut out = serializer.serialize_seq(Some(arr.len()))?;
                for v in arr {
                    out.serialize_element(&Sorted(v))?;
                }
                out.end()
            }
            other => other.serialize(serializer),
        }
    }
}
