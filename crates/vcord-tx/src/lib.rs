#![deny(missing_docs)]

//! # vcord-tx: Inscription Transactions
//!
//! Everything between an encoded credential and a signed transaction:
//!
//! - [`select`]: first-fit UTXO selection over a listing snapshot.
//! - [`envelope`]: the ord envelope script, and payload extraction from a
//!   transaction.
//! - [`size`]: size estimate, fee arithmetic and dust floors.
//! - [`signer`]: the signing capability and the HD key source behind it.
//! - [`assemble`]: PSBT-based assembly with all-or-nothing signature checks.
//!
//! Only [`select::UtxoSelector`] touches the ledger. The rest is pure and
//! synchronous.

pub mod assemble;
pub mod envelope;
pub mod error;
pub mod select;
pub mod signer;
pub mod size;

pub use assemble::{assemble, AssemblyRequest, SignedInscription};
pub use envelope::{build_inscription_script, extract_payload, InscriptionEnvelope};
pub use error::{SignerError, TxError};
pub use select::{select_for_inscription, select_prefix, FundingPlan, Selection, UtxoSelector};
pub use signer::{HashSigner, HdKeySource, KeySource, SecretKeySigner};
pub use size::{dust_floor, estimate_size, fee_for};
