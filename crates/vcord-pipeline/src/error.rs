//! Pipeline errors.
//!
//! One variant per failure kind a caller acts on differently. Ledger
//! failures carry the [`Stage`] they happened in and, once known, the txid,
//! so encode-time and ledger-time failures are never confused.

use std::fmt;

use bitcoin::{Amount, Txid};
use thiserror::Error;
use vcord_core::CodecError;
use vcord_ledger::{ConfigError, LedgerError};
use vcord_tx::{SignerError, TxError};

/// Pipeline step that issued a ledger call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// `getblockchaininfo`.
    BlockchainInfo,
    /// Fee estimation before selection.
    EstimateFee,
    /// Listing spendable outputs.
    ListUnspent,
    /// Submitting the signed transaction.
    Broadcast,
    /// Polling for confirmation depth.
    Confirm,
    /// Fetching a transaction for retrieval.
    Lookup,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::BlockchainInfo => "blockchain_info",
            Self::EstimateFee => "estimate_fee",
            Self::ListUnspent => "list_unspent",
            Self::Broadcast => "broadcast",
            Self::Confirm => "confirm",
            Self::Lookup => "lookup",
        })
    }
}

fn for_txid(txid: &Option<Txid>) -> String {
    txid.map(|t| format!(" for {t}")).unwrap_or_default()
}

/// Errors from inscription and retrieval.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The credential could not be encoded.
    #[error("encode failed: {0}")]
    Encode(#[source] CodecError),

    /// A ledger call failed.
    #[error("ledger {stage} failed{}: {source}", for_txid(.txid))]
    Ledger {
        /// Step that made the call.
        stage: Stage,
        /// Transaction concerned, when known.
        txid: Option<Txid>,
        /// Underlying ledger error.
        #[source]
        source: LedgerError,
    },

    /// The wallet cannot fund the inscription.
    #[error("insufficient funds: need {required}, have {available}")]
    InsufficientFunds {
        /// Fee plus inscription value.
        required: Amount,
        /// Sum of the listing.
        available: Amount,
    },

    /// Script building, signing or signature validation failed.
    #[error("assembly failed: {0}")]
    Assembly(#[source] TxError),

    /// The signing key could not be loaded or derived.
    #[error("signing key unavailable: {0}")]
    Signer(#[from] SignerError),

    /// The broadcast spends an output already spent or pending.
    /// Retry with a fresh selection.
    #[error("double-spend conflict at broadcast: {source}")]
    DoubleSpendConflict {
        /// The ledger's rejection.
        #[source]
        source: LedgerError,
    },

    /// The polling budget ran out before the target depth. The
    /// transaction may still confirm; re-check before re-inscribing.
    #[error("{txid} not confirmed after {attempts} attempts (last depth {last_depth})")]
    ConfirmationTimeout {
        /// Broadcast transaction.
        txid: Txid,
        /// Polls made.
        attempts: u32,
        /// Depth seen on the final poll.
        last_depth: u32,
    },

    /// The ledger does not know the transaction.
    #[error("transaction {0} not found")]
    TransactionNotFound(Txid),

    /// The transaction is known but has no confirmations.
    #[error("inscription {0} is unconfirmed")]
    UnconfirmedInscription(Txid),

    /// The transaction carries no inscription payload.
    #[error("transaction {0} carries no inscription data")]
    MissingInscriptionData(Txid),

    /// The inscribed payload does not decode.
    #[error("inscription {txid} does not decode: {source}")]
    Decode {
        /// Transaction the payload came from.
        txid: Txid,
        /// Codec failure.
        #[source]
        source: CodecError,
    },

    /// Pipeline configuration is invalid.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl PipelineError {
    pub(crate) fn ledger(stage: Stage, txid: Option<Txid>, source: LedgerError) -> Self {
        Self::Ledger {
            stage,
            txid,
            source,
        }
    }

    /// Lift a transaction-building error, keeping funding shortfalls distinct.
    pub(crate) fn from_tx(err: TxError) -> Self {
        match err {
            TxError::InsufficientFunds {
                required,
                available,
            } => Self::InsufficientFunds {
                required,
                available,
            },
            TxError::Signer(e) => Self::Signer(e),
            other => Self::Assembly(other),
        }
    }

    /// Ledger stage of a ledger failure.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::Ledger { stage, .. } => Some(*stage),
            Self::DoubleSpendConflict { .. } => Some(Stage::Broadcast),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitcoin::hashes::Hash;

    #[test]
    fn ledger_error_names_stage_and_txid() {
        let txid = Txid::from_byte_array([0xab; 32]);
        let err = PipelineError::ledger(
            Stage::Confirm,
            Some(txid),
            LedgerError::Unauthorized,
        );
        let msg = err.to_string();
        assert!(msg.contains("confirm"), "{msg}");
        assert!(msg.contains(&txid.to_string()), "{msg}");
        assert_eq!(err.stage(), Some(Stage::Confirm));

        let err = PipelineError::ledger(Stage::ListUnspent, None, LedgerError::Unauthorized);
        assert!(err.to_string().starts_with("ledger list_unspent failed:"));
    }

    #[test]
    fn funding_shortfall_stays_distinct_from_assembly() {
        let err = PipelineError::from_tx(TxError::InsufficientFunds {
            required: Amount::from_sat(10),
            available: Amount::from_sat(5),
        });
        assert!(matches!(err, PipelineError::InsufficientFunds { .. }));
        let err = PipelineError::from_tx(TxError::SignatureValidation { input: 2 });
        assert!(matches!(
            err,
            PipelineError::Assembly(TxError::SignatureValidation { input: 2 })
        ));
    }

    #[test]
    fn source_chain_is_preserved() {
        use std::error::Error as _;
        let err = PipelineError::DoubleSpendConflict {
            source: LedgerError::DoubleSpend {
                message: "txn-mempool-conflict".into(),
            },
        };
        assert!(err.source().is_some());
        assert_eq!(err.stage(), Some(Stage::Broadcast));
    }
}
