#![deny(missing_docs)]

//! # vcord-core: Identity Credentials and the Inscription Codec
//!
//! This crate defines the credential types every other crate in the workspace
//! consumes, and the byte format in which a credential travels inside an
//! inscription. It has no internal crate dependencies and performs no I/O.
//!
//! ## Design Principles
//!
//! 1. **Validate before framing.** [`encode()`] runs structural validation on
//!    the JSON form of the credential before a single byte is produced, and
//!    [`decode()`] runs the same validation after parsing. A payload that
//!    passes the checksum but was tampered with is still rejected.
//!
//! 2. **Canonical JSON is the only body format.** The framed body is the
//!    caller's document passed through [`CanonicalJson::from_value()`]:
//!    sorted keys, compact separators, no floats. Values are never rewritten,
//!    so timestamps and extension fields survive a round trip byte for byte.
//!
//! 3. **The checksum is not a proof.** CRC-32 catches accidental corruption.
//!    The credential `proof` block is checked for shape by
//!    [`verify_credential()`], never cryptographically.
//!
//! 4. **Structured errors.** [`CodecError`] and [`ValidationError`] carry the
//!    offending field or byte counts. No `.unwrap()` outside tests.

pub mod canonical;
pub mod codec;
pub mod credential;
pub mod error;
pub mod validate;
pub mod verify;

pub use canonical::CanonicalJson;
pub use codec::{crc32, decode, encode, FORMAT_VERSION, HEADER_LEN, TRAILER_LEN};
pub use credential::{
    parse_timestamp, Context, CredentialStatus, CredentialSubject, DocumentType,
    IdentityCredential, Issuer, Proof, VerificationLevel, VerifierType, W3C_VC_CONTEXT_V1,
};
pub use error::{CanonicalizationError, CodecError, ValidationError};
pub use validate::validate_structure;
pub use verify::{verify_credential, VerificationCheck, VerificationReport};
