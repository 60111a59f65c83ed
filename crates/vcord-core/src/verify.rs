//! # Credential Verification
//!
//! Predicate checks on a parsed credential: W3C shape, validity window, and
//! the completeness of the proof block. This answers "is the credential
//! usable now", which is a different question from "is the transaction that
//! carries it confirmed" (see the pipeline's `verify_transaction`).
//!
//! The proof is checked for shape only; no signature is verified.

use chrono::{DateTime, Utc};

use crate::credential::{parse_timestamp, IdentityCredential, W3C_VC_CONTEXT_V1};

/// One failed verification check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationCheck {
    /// `@context` lacks the W3C VC v1 URI.
    MissingContext,
    /// `type` lacks `VerifiableCredential`.
    MissingVcType,
    /// The issuance date is after the verification time.
    IssuedInFuture(DateTime<Utc>),
    /// The credential expiration date has passed.
    Expired(DateTime<Utc>),
    /// The subject's document check has expired.
    SubjectCheckExpired(DateTime<Utc>),
    /// Expiration precedes issuance.
    InvertedValidity,
    /// A date field is neither RFC 3339 nor `YYYY-MM-DD`.
    UnreadableDate {
        /// Field name.
        field: &'static str,
        /// The value as issued.
        value: String,
    },
    /// A proof field is empty.
    IncompleteProof(&'static str),
}

impl std::fmt::Display for VerificationCheck {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingContext => write!(f, "@context must include {W3C_VC_CONTEXT_V1}"),
            Self::MissingVcType => f.write_str("type must include VerifiableCredential"),
            Self::IssuedInFuture(at) => write!(f, "issuance date {at} is in the future"),
            Self::Expired(at) => write!(f, "credential expired at {at}"),
            Self::SubjectCheckExpired(at) => write!(f, "document verification expired at {at}"),
            Self::InvertedValidity => f.write_str("expiration date precedes issuance date"),
            Self::UnreadableDate { field, value } => write!(f, "{field} {value:?} is not a date"),
            Self::IncompleteProof(field) => write!(f, "proof field {field} is empty"),
        }
    }
}

/// Outcome of [`verify_credential()`]: every failed check, in check order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerificationReport {
    failures: Vec<VerificationCheck>,
}

impl VerificationReport {
    /// True when no check failed.
    pub fn is_valid(&self) -> bool {
        self.failures.is_empty()
    }

    /// The failed checks.
    pub fn failures(&self) -> &[VerificationCheck] {
        &self.failures
    }
}

/// Run every credential check against `now`.
pub fn verify_credential(credential: &IdentityCredential, now: DateTime<Utc>) -> VerificationReport {
    let mut failures = Vec::new();

    if !credential.has_w3c_context() {
        failures.push(VerificationCheck::MissingContext);
    }
    if !credential.contains_vc_type() {
        failures.push(VerificationCheck::MissingVcType);
    }

    let mut read = |field: &'static str, raw: &str| {
        let at = parse_timestamp(raw);
        if at.is_none() {
            failures.push(VerificationCheck::UnreadableDate {
                field,
                value: raw.to_string(),
            });
        }
        at
    };
    let issued = read("issuanceDate", &credential.issuance_date);
    let expires = read("expirationDate", &credential.expiration_date);
    let subject_expires = read(
        "credentialSubject.expirationDate",
        &credential.credential_subject.expiration_date,
    );

    if let (Some(issued), Some(expires)) = (issued, expires) {
        if expires < issued {
            failures.push(VerificationCheck::InvertedValidity);
        }
    }
    if let Some(issued) = issued.filter(|at| *at > now) {
        failures.push(VerificationCheck::IssuedInFuture(issued));
    }
    if let Some(expires) = expires.filter(|at| *at < now) {
        failures.push(VerificationCheck::Expired(expires));
    }
    if let Some(subject_expires) = subject_expires.filter(|at| *at < now) {
        failures.push(VerificationCheck::SubjectCheckExpired(subject_expires));
    }

    if let Some(proof) = &credential.proof {
        let fields = [
            ("type", &proof.proof_type),
            ("created", &proof.created),
            ("verificationMethod", &proof.verification_method),
            ("proofPurpose", &proof.proof_purpose),
            ("proofValue", &proof.proof_value),
        ];
        failures.extend(
            fields
                .into_iter()
                .filter(|(_, v)| v.trim().is_empty())
                .map(|(name, _)| VerificationCheck::IncompleteProof(name)),
        );
    }

    if !failures.is_empty() {
        tracing::debug!(failures = failures.len(), "credential verification failed");
    }
    VerificationReport { failures }
}
