//! # Identity Verifiable Credential
//!
//! Defines [`IdentityCredential`], the W3C VC v1 shaped identity credential
//! carried by inscriptions.
//!
//! ## Field Naming
//!
//! Serde rename attributes map between Rust snake_case and the W3C VC JSON
//! field names (camelCase / `@`-prefixed).
//!
//! ## Lossless Model
//!
//! A credential is the issuer's document, and its proof covers the issuer's
//! bytes. The model therefore never rewrites what it reads:
//!
//! - Timestamps stay strings exactly as issued. [`parse_timestamp()`] reads
//!   them when a check needs a point in time.
//! - `@context` keeps its single-string or list form.
//! - Fields outside the model (`evidence`, `termsOfUse`, ...) are kept in
//!   `extensions` at every level and serialize back in place.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The W3C Verifiable Credentials v1 JSON-LD context URI.
pub const W3C_VC_CONTEXT_V1: &str = "https://www.w3.org/2018/credentials/v1";

/// Parse an issued timestamp: RFC 3339 (any offset, any fractional
/// precision) or a bare `YYYY-MM-DD` date, read as midnight UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Some(at.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// An identity credential issued after a document check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityCredential {
    /// JSON-LD context. Must include [`W3C_VC_CONTEXT_V1`].
    #[serde(rename = "@context")]
    pub context: Context,

    /// Credential identifier (URN or DID).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Credential type(s), e.g. `["VerifiableCredential", "IdentityCredential"]`.
    #[serde(rename = "type")]
    pub credential_type: Vec<String>,

    /// The verifying party that issued the credential.
    pub issuer: Issuer,

    /// When the credential was issued, as issued.
    #[serde(rename = "issuanceDate")]
    pub issuance_date: String,

    /// When the credential stops being valid, as issued.
    #[serde(rename = "expirationDate")]
    pub expiration_date: String,

    /// The identity holder and the document that was checked.
    #[serde(rename = "credentialSubject")]
    pub credential_subject: CredentialSubject,

    /// Issuer proof. Checked for shape only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proof: Option<Proof>,

    /// Revocation list entry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<CredentialStatus>,

    /// Top-level fields outside the model.
    #[serde(flatten)]
    pub extensions: Map<String, Value>,
}

impl IdentityCredential {
    /// Whether `"VerifiableCredential"` is among the credential types.
    pub fn contains_vc_type(&self) -> bool {
        self.credential_type.iter().any(|t| t == "VerifiableCredential")
    }

    /// Whether `@context` includes the W3C VC v1 context.
    pub fn has_w3c_context(&self) -> bool {
        self.context.contains(W3C_VC_CONTEXT_V1)
    }
}

/// JSON-LD `@context`: one URI, or a list of URIs and inline context objects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Context {
    /// `"@context": "https://..."`
    Single(String),
    /// `"@context": ["https://...", {...}]`
    List(Vec<Value>),
}

impl Context {
    /// Whether `uri` is the context or one of its string entries.
    pub fn contains(&self, uri: &str) -> bool {
        match self {
            Self::Single(s) => s == uri,
            Self::List(items) => items.iter().any(|c| c.as_str() == Some(uri)),
        }
    }
}

impl From<Vec<String>> for Context {
    fn from(uris: Vec<String>) -> Self {
        Self::List(uris.into_iter().map(Value::String).collect())
    }
}

/// The issuing verifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issuer {
    /// Issuer DID.
    pub id: String,
    /// Human-readable issuer name.
    pub name: String,
    /// Kind of verifying organisation.
    pub verifier_type: VerifierType,
    /// Issuer fields outside the model.
    #[serde(flatten)]
    pub extensions: Map<String, Value>,
}

/// Kind of organisation that verified the identity document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VerifierType {
    /// A government agency.
    Government,
    /// A regulated institution (bank, university).
    Institution,
    /// Any other organisation.
    Organization,
}

/// The credential subject: the holder and the checked document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialSubject {
    /// Holder DID.
    pub id: String,
    /// Full legal name.
    pub full_name: String,
    /// Date of birth, as issued (usually `YYYY-MM-DD`).
    pub date_of_birth: String,
    /// Nationality as printed on the document.
    pub nationality: String,
    /// Kind of identity document.
    pub document_type: DocumentType,
    /// Document number.
    pub document_number: String,
    /// Depth of the identity check.
    pub verification_level: VerificationLevel,
    /// When the document check happened, as issued.
    pub verification_date: String,
    /// When the document check expires, as issued.
    pub expiration_date: String,
    /// Subject fields outside the model.
    #[serde(flatten)]
    pub extensions: Map<String, Value>,
}

/// Identity document kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DocumentType {
    /// Passport.
    Passport,
    /// National identity card.
    NationalId,
    /// Driver's license.
    DriverLicense,
}

impl DocumentType {
    /// All accepted wire names.
    pub const WIRE_NAMES: [&'static str; 3] = ["passport", "nationalId", "driverLicense"];

    /// The JSON name of this document type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Passport => "passport",
            Self::NationalId => "nationalId",
            Self::DriverLicense => "driverLicense",
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity check depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationLevel {
    /// Document inspection only.
    Basic,
    /// Document plus liveness check.
    Advanced,
    /// In-person verification.
    Expert,
}

impl VerificationLevel {
    /// All accepted wire names.
    pub const WIRE_NAMES: [&'static str; 3] = ["basic", "advanced", "expert"];
}

/// Issuer proof block. Never cryptographically verified here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Proof {
    /// Proof suite, e.g. `EcdsaSecp256k1Signature2019`.
    #[serde(rename = "type")]
    pub proof_type: String,
    /// Creation timestamp as issued.
    pub created: String,
    /// DID URL of the verification key.
    pub verification_method: String,
    /// Usually `assertionMethod`.
    pub proof_purpose: String,
    /// Encoded signature.
    pub proof_value: String,
    /// Replay-protection nonce.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
    /// Suite-specific fields (`jws`, `challenge`, ...).
    #[serde(flatten)]
    pub extensions: Map<String, Value>,
}

/// Revocation list status entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialStatus {
    /// Status entry identifier.
    pub id: String,
    /// Status mechanism, `RevocationList2020Status`.
    #[serde(rename = "type")]
    pub status_type: String,
    /// Index of this credential in the revocation list.
    pub revocation_list_index: String,
    /// URL of the revocation list credential.
    pub revocation_list_credential: String,
    /// Status fields outside the model.
    #[serde(flatten)]
    pub extensions: Map<String, Value>,
}


#[cfg(test)]
mod tests {
    use super::fixtures::sample_credential;
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn serializes_with_w3c_field_names() {
        let v = serde_json::to_value(sample_credential()).unwrap();
        assert!(v.get("@context").is_some());
        assert!(v.get("issuanceDate").is_some());
        assert_eq!(v["credentialSubject"]["documentType"], "passport");
        assert_eq!(v["credentialSubject"]["verificationLevel"], "advanced");
        assert_eq!(v["credentialSubject"]["dateOfBirth"], "1990-01-01");
        assert_eq!(v["issuer"]["verifierType"], "government");
        assert!(v.get("proof").is_none());
        assert!(v.get("extensions").is_none());
    }

    #[test]
    fn enum_wire_names_match_serde() {
        for (dt, name) in [
            (DocumentType::Passport, "passport"),
            (DocumentType::NationalId, "nationalId"),
            (DocumentType::DriverLicense, "driverLicense"),
        ] {
            assert_eq!(serde_json::to_value(dt).unwrap(), name);
            assert_eq!(dt.as_str(), name);
            assert!(DocumentType::WIRE_NAMES.contains(&name));
        }
        for name in VerificationLevel::WIRE_NAMES {
            let lvl: VerificationLevel = serde_json::from_value(name.into()).unwrap();
            assert_eq!(serde_json::to_value(lvl).unwrap(), name);
        }
    }

    #[test]
    fn unknown_fields_kept_in_place() {
        let mut v = serde_json::to_value(sample_credential()).unwrap();
        v["evidence"] = json!([{"type": "DocumentVerification", "document": "passport"}]);
        v["credentialSubject"]["placeOfBirth"] = json!("Lisbon");
        v["issuer"]["image"] = json!("https://issuer.test/logo.png");

        let c: IdentityCredential = serde_json::from_value(v.clone()).unwrap();
        assert!(c.extensions.contains_key("evidence"));
        assert_eq!(c.credential_subject.extensions["placeOfBirth"], "Lisbon");
        assert_eq!(serde_json::to_value(&c).unwrap(), v);
    }

    #[test]
    fn timestamps_are_not_rewritten() {
        let mut v = serde_json::to_value(sample_credential()).unwrap();
        v["issuanceDate"] = json!("2024-01-01T00:00:00.000Z");
        v["expirationDate"] = json!("2030-01-01T02:00:00+02:00");
        let c: IdentityCredential = serde_json::from_value(v).unwrap();
        let back = serde_json::to_value(&c).unwrap();
        assert_eq!(back["issuanceDate"], "2024-01-01T00:00:00.000Z");
        assert_eq!(back["expirationDate"], "2030-01-01T02:00:00+02:00");
    }

    #[test]
    fn context_keeps_its_form() {
        let mut v = serde_json::to_value(sample_credential()).unwrap();
        v["@context"] = json!(W3C_VC_CONTEXT_V1);
        let c: IdentityCredential = serde_json::from_value(v).unwrap();
        assert_eq!(c.context, Context::Single(W3C_VC_CONTEXT_V1.into()));
        assert!(c.has_w3c_context());
        assert_eq!(serde_json::to_value(&c).unwrap()["@context"], W3C_VC_CONTEXT_V1);

        let inline = Context::List(vec![json!(W3C_VC_CONTEXT_V1), json!({"@vocab": "urn:x:"})]);
        assert!(inline.contains(W3C_VC_CONTEXT_V1));
    }

    #[test]
    fn timestamp_forms() {
        let midnight = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(parse_timestamp("2024-01-01T00:00:00Z"), Some(midnight));
        assert_eq!(parse_timestamp("2024-01-01T00:00:00.000Z"), Some(midnight));
        assert_eq!(parse_timestamp("2024-01-01T02:00:00+02:00"), Some(midnight));
        assert_eq!(parse_timestamp("2024-01-01"), Some(midnight));
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[test]
    fn vc_type_and_context_helpers() {
        let mut c = sample_credential();
        assert!(c.contains_vc_type());
        assert!(c.has_w3c_context());
        c.credential_type = vec!["IdentityCredential".into()];
        c.context = vec!["https://example.org/ctx".to_string()].into();
        assert!(!c.contains_vc_type());
        assert!(!c.has_w3c_context());
    }
}
