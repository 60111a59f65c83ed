//! Transaction construction errors.

use bitcoin::script::PushBytesError;
use bitcoin::{Amount, ScriptBuf};
use thiserror::Error;
use vcord_ledger::LedgerError;

/// Errors from selection, script building, and assembly.
#[derive(Error, Debug)]
pub enum TxError {
    /// The spendable outputs do not cover fee plus inscription value.
    #[error("insufficient funds: need {required}, have {available}")]
    InsufficientFunds {
        /// Amount the transaction needs.
        required: Amount,
        /// Amount the listing provides.
        available: Amount,
    },

    /// A signature failed verification after signing. Nothing is finalized.
    #[error("signature for input {input} failed validation")]
    SignatureValidation {
        /// Index of the first failing input.
        input: usize,
    },

    /// The output being spent is neither P2WPKH nor P2PKH.
    #[error("input {input} spends unsupported script {script}")]
    UnsupportedInput {
        /// Input index.
        input: usize,
        /// Locking script of the spent output.
        script: ScriptBuf,
    },

    /// Sighash computation failed.
    #[error("sighash for input {input}: {reason}")]
    Sighash {
        /// Input index.
        input: usize,
        /// Failure description.
        reason: String,
    },

    /// The signing capability failed.
    #[error("signer error: {0}")]
    Signer(#[from] SignerError),

    /// Fee or value arithmetic overflowed.
    #[error("amount overflow while computing {0}")]
    AmountOverflow(&'static str),

    /// A script push exceeded push limits.
    #[error("script push error: {0}")]
    ScriptPush(#[from] PushBytesError),

    /// The PSBT working structure rejected the transaction.
    #[error("psbt error: {0}")]
    Psbt(#[from] bitcoin::psbt::Error),

    /// The ledger failed while listing outputs.
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

/// Errors from key derivation and signing.
#[derive(Error, Debug)]
pub enum SignerError {
    /// The seed is not 16 to 64 bytes, or not valid hex.
    #[error("invalid seed: {0}")]
    InvalidSeed(String),

    /// No seed is configured.
    #[error("no seed configured: set {0}")]
    MissingSeed(&'static str),

    /// The seed file could not be read.
    #[error("cannot read seed file {path}: {source}")]
    SeedFile {
        /// File path.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// BIP32 derivation failed.
    #[error("key derivation failed: {0}")]
    Derivation(#[from] bitcoin::bip32::Error),

    /// The signer could not produce a signature.
    #[error("signing failed: {0}")]
    Signing(String),
}
