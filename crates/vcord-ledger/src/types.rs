//! Values exchanged with the ledger.

use bitcoin::{Amount, BlockHash, OutPoint, ScriptBuf, Transaction, TxOut, Txid};
use serde::{Deserialize, Serialize};

/// A spendable output, with what is needed to sign a spend of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utxo {
    /// Transaction and output index.
    pub outpoint: OutPoint,
    /// Output value.
    pub value: Amount,
    /// Locking script of the output.
    pub script_pubkey: ScriptBuf,
    /// Confirmation depth at listing time.
    pub confirmations: u32,
}

impl Utxo {
    /// The output being spent, as sighash computation needs it.
    pub fn txout(&self) -> TxOut {
        TxOut {
            value: self.value,
            script_pubkey: self.script_pubkey.clone(),
        }
    }
}

/// A transaction as the ledger reports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerTransaction {
    /// Transaction id.
    pub txid: Txid,
    /// Blocks on top of (and including) the containing block; 0 in mempool.
    pub confirmations: u32,
    /// The full transaction, witness data included.
    pub transaction: Transaction,
}

/// Chain state summary from `getblockchaininfo`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockchainInfo {
    /// Chain name (`main`, `test`, `signet`, `regtest`).
    pub chain: String,
    /// Height of the best validated block.
    pub blocks: u64,
    /// Height of the best known header.
    pub headers: u64,
    /// Hash of the best validated block.
    #[serde(rename = "bestblockhash")]
    pub best_block_hash: BlockHash,
    /// Estimated sync progress in `[0, 1]`.
    #[serde(rename = "verificationprogress")]
    pub verification_progress: f64,
    /// Whether the node is still in initial block download.
    #[serde(rename = "initialblockdownload", default)]
    pub initial_block_download: bool,
}
