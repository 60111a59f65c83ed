#![deny(missing_docs)]

//! # vcord-ledger: The Ledger Capability
//!
//! The inscription pipeline consumes exactly five ledger operations. This
//! crate names them as the [`LedgerRpc`] trait and ships two
//! implementations:
//!
//! - [`BitcoinRpcClient`]: JSON-RPC over HTTP against a Bitcoin Core node.
//! - [`MockLedger`]: an in-memory ledger with a UTXO set, mempool and block
//!   height, for tests and offline demos.
//!
//! ## Crate Policy
//!
//! - No retries. Every call either returns or fails once; the only retry
//!   loop in the system is confirmation polling in `vcord-pipeline`.
//! - UTXO listings are never cached. Each `list_unspent` is a fresh read.
//! - Broadcast rejections caused by an input conflict surface as
//!   [`LedgerError::DoubleSpend`], distinct from other rejections.

pub mod config;
pub mod error;
pub mod mock;
pub mod rpc;
pub mod types;

use async_trait::async_trait;
use bitcoin::{FeeRate, Txid};

pub use config::{ConfigError, LedgerConfig};
pub use error::LedgerError;
pub use mock::MockLedger;
pub use rpc::BitcoinRpcClient;
pub use types::{BlockchainInfo, LedgerTransaction, Utxo};

/// The ledger operations the inscription pipeline depends on.
///
/// Implementations must be safe to share between concurrently running
/// pipelines.
#[async_trait]
pub trait LedgerRpc: Send + Sync {
    /// Chain name, height and sync progress.
    async fn blockchain_info(&self) -> Result<BlockchainInfo, LedgerError>;

    /// Spendable outputs with at least `min_confirmations`, in ledger order.
    async fn list_unspent(&self, min_confirmations: u32) -> Result<Vec<Utxo>, LedgerError>;

    /// Fee rate expected to confirm within `target_blocks`.
    async fn estimate_fee_rate(&self, target_blocks: u16) -> Result<FeeRate, LedgerError>;

    /// Submit a consensus-encoded transaction (hex) and return its txid.
    async fn broadcast(&self, raw_hex: &str) -> Result<Txid, LedgerError>;

    /// Look up a transaction. `Ok(None)` means the ledger does not know it.
    async fn get_transaction(&self, txid: &Txid) -> Result<Option<LedgerTransaction>, LedgerError>;
}
