//! # In-Memory Mock Ledger
//!
//! A [`LedgerRpc`] implementation with a real UTXO set, mempool and block
//! height, for tests and offline demos. Broadcast transactions are decoded
//! and checked against the UTXO set, so double-spends and unknown inputs are
//! rejected the way a node rejects them.
//!
//! ## Warning
//!
//! No script or signature validation is performed. This ledger is suitable
//! only for development and testing.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use bitcoin::hashes::Hash;
use bitcoin::{Amount, BlockHash, FeeRate, OutPoint, ScriptBuf, Transaction, Txid};
use parking_lot::Mutex;

use crate::error::LedgerError;
use crate::types::{BlockchainInfo, LedgerTransaction, Utxo};
use crate::LedgerRpc;

/// Height of the mock chain when it is created.
const GENESIS_HEIGHT: u64 = 100;

#[derive(Debug)]
struct Entry {
    utxo: Utxo,
    height: u64,
}

#[derive(Debug)]
struct MockTx {
    tx: Transaction,
    mined_at: Option<u64>,
}

#[derive(Debug)]
struct State {
    height: u64,
    fee_rate: FeeRate,
    next_funding: u64,
    /// Unspent outputs in listing order.
    unspent: Vec<Entry>,
    /// Outputs consumed by accepted transactions.
    spent: HashSet<OutPoint>,
    /// Scripts whose outputs are tracked as wallet UTXOs once mined.
    wallet_scripts: HashSet<ScriptBuf>,
    txs: HashMap<Txid, MockTx>,
    broadcasts: Vec<Transaction>,
    rejection: Option<(i64, String)>,
}

/// In-memory ledger.
#[derive(Debug)]
pub struct MockLedger {
    state: Mutex<State>,
    auto_mine: AtomicBool,
}

impl Default for MockLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl MockLedger {
    /// Empty ledger at height 100 with a 1 sat/vB fee estimate.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                height: GENESIS_HEIGHT,
                fee_rate: FeeRate::BROADCAST_MIN,
                next_funding: 0,
                unspent: Vec::new(),
                spent: HashSet::new(),
                wallet_scripts: HashSet::new(),
                txs: HashMap::new(),
                broadcasts: Vec::new(),
                rejection: None,
            }),
            auto_mine: AtomicBool::new(false),
        }
    }

    /// Set the fee rate returned by `estimate_fee_rate`.
    pub fn with_fee_rate(self, rate: FeeRate) -> Self {
        self.state.lock().fee_rate = rate;
        self
    }

    /// Mine a block whenever a mempool transaction is looked up, so
    /// confirmation polling makes progress without an external miner.
    pub fn with_auto_mine(self) -> Self {
        self.auto_mine.store(true, Ordering::SeqCst);
        self
    }

    /// Add a confirmed output paying `value` to `script_pubkey` and track
    /// that script as part of the wallet.
    pub fn fund(&self, value: Amount, script_pubkey: ScriptBuf) -> OutPoint {
        let mut state = self.state.lock();
        state.next_funding += 1;
        let mut bytes = [0xfa_u8; 32];
        bytes[..8].copy_from_slice(&state.next_funding.to_le_bytes());
        let outpoint = OutPoint::new(Txid::from_byte_array(bytes), 0);
        let height = state.height;
        state.wallet_scripts.insert(script_pubkey.clone());
        state.unspent.push(Entry {
            utxo: Utxo {
                outpoint,
                value,
                script_pubkey,
                confirmations: 1,
            },
            height,
        });
        outpoint
    }

    /// Record a transaction as already mined with `confirmations` depth
    /// (0 leaves it in the mempool). Does not touch the UTXO set.
    pub fn insert_transaction(&self, tx: Transaction, confirmations: u32) -> Txid {
        let mut state = self.state.lock();
        let txid = tx.compute_txid();
        let mined_at = (confirmations > 0)
            .then(|| (state.height + 1).saturating_sub(u64::from(confirmations)));
        state.txs.insert(txid, MockTx { tx, mined_at });
        txid
    }

    /// Reject every broadcast with the given node error until cleared.
    pub fn reject_broadcasts(&self, rejection: Option<(i64, String)>) {
        self.state.lock().rejection = rejection;
    }

    /// Mine one block containing the whole mempool.
    pub fn mine_block(&self) {
        mine(&mut self.state.lock());
    }

    /// Current tip height.
    pub fn height(&self) -> u64 {
        self.state.lock().height
    }

    /// Every transaction accepted by `broadcast`, in order.
    pub fn broadcasts(&self) -> Vec<Transaction> {
        self.state.lock().broadcasts.clone()
    }

    /// Confirmation depth of a known transaction.
    pub fn confirmations(&self, txid: &Txid) -> Option<u32> {
        let state = self.state.lock();
        state.txs.get(txid).map(|t| depth(state.height, t.mined_at))
    }
}

fn depth(height: u64, mined_at: Option<u64>) -> u32 {
    mined_at.map_or(0, |h| {
        u32::try_from(height.saturating_sub(h) + 1).unwrap_or(u32::MAX)
    })
}

fn mine(state: &mut State) {
    state.height += 1;
    let height = state.height;
    let mut new_outputs = Vec::new();
    for (txid, entry) in state.txs.iter_mut() {
        if entry.mined_at.is_none() {
            entry.mined_at = Some(height);
            for (vout, out) in entry.tx.output.iter().enumerate() {
                if state.wallet_scripts.contains(&out.script_pubkey) {
                    new_outputs.push(Entry {
                        utxo: Utxo {
                            outpoint: OutPoint::new(*txid, vout as u32),
                            value: out.value,
                            script_pubkey: out.script_pubkey.clone(),
                            confirmations: 1,
                        },
                        height,
                    });
                }
            }
        }
    }
    state.unspent.extend(new_outputs);
    tracing::debug!(height, "mock ledger mined block");
}

#[async_trait]
impl LedgerRpc for MockLedger {
    async fn blockchain_info(&self) -> Result<BlockchainInfo, LedgerError> {
        let state = self.state.lock();
        let mut hash = [0u8; 32];
        hash[..8].copy_from_slice(&state.height.to_le_bytes());
        Ok(BlockchainInfo {
            chain: "regtest".to_string(),
            blocks: state.height,
            headers: state.height,
            best_block_hash: BlockHash::from_byte_array(hash),
            verification_progress: 1.0,
            initial_block_download: false,
        })
    }

    async fn list_unspent(&self, min_confirmations: u32) -> Result<Vec<Utxo>, LedgerError> {
        let state = self.state.lock();
        Ok(state
            .unspent
            .iter()
            .filter(|e| !state.spent.contains(&e.utxo.outpoint))
            .map(|e| Utxo {
                confirmations: depth(state.height, Some(e.height)),
                ..e.utxo.clone()
            })
            .filter(|u| u.confirmations >= min_confirmations)
            .collect())
    }

    async fn estimate_fee_rate(&self, _target_blocks: u16) -> Result<FeeRate, LedgerError> {
        Ok(self.state.lock().fee_rate)
    }

    async fn broadcast(&self, raw_hex: &str) -> Result<Txid, LedgerError> {
        let tx: Transaction = bitcoin::consensus::encode::deserialize_hex(raw_hex).map_err(|e| {
            LedgerError::Rejected {
                code: -22,
                message: format!("TX decode failed: {e}"),
            }
        })?;
        let txid = tx.compute_txid();

        let mut state = self.state.lock();
        if let Some((code, message)) = state.rejection.clone() {
            return Err(LedgerError::from_broadcast_rejection(code, message));
        }
        if state.txs.contains_key(&txid) {
            return Ok(txid);
        }

        let mut input_value = Amount::ZERO;
        for input in &tx.input {
            let prevout = input.previous_output;
            if state.spent.contains(&prevout) {
                return Err(LedgerError::from_broadcast_rejection(-26, "txn-mempool-conflict"));
            }
            let Some(entry) = state.unspent.iter().find(|e| e.utxo.outpoint == prevout) else {
                return Err(LedgerError::from_broadcast_rejection(
                    -25,
                    "bad-txns-inputs-missingorspent",
                ));
            };
            input_value += entry.utxo.value;
        }
        let output_value: Amount = tx.output.iter().map(|o| o.value).sum();
        if output_value > input_value {
            return Err(LedgerError::from_broadcast_rejection(-26, "bad-txns-in-belowout"));
        }

        for input in &tx.input {
            state.spent.insert(input.previous_output);
        }
        state.broadcasts.push(tx.clone());
        state.txs.insert(txid, MockTx { tx, mined_at: None });
        tracing::debug!(%txid, "mock ledger accepted transaction");
        Ok(txid)
    }

    async fn get_transaction(&self, txid: &Txid) -> Result<Option<LedgerTransaction>, LedgerError> {
        let mut state = self.state.lock();
        let in_mempool = matches!(state.txs.get(txid), Some(MockTx { mined_at: None, .. }));
        if in_mempool && self.auto_mine.load(Ordering::SeqCst) {
            mine(&mut state);
        }
        Ok(state.txs.get(txid).map(|t| LedgerTransaction {
            txid: *txid,
            confirmations: depth(state.height, t.mined_at),
            transaction: t.tx.clone(),
        }))
    }
}
