//! # Confirmation Tracking
//!
//! Fixed-interval polling for a transaction's confirmation depth. The
//! policy is an explicit value so tests can inject near-zero intervals.
//!
//! There is no backoff and no jitter. Polls are spaced `interval` apart and
//! the loop gives up after `max_attempts` with
//! [`PipelineError::ConfirmationTimeout`]. The returned future holds no
//! resources between polls; dropping it (a caller deadline, `select!`)
//! cancels tracking.

use std::sync::Arc;
use std::time::Duration;

use bitcoin::Txid;
use vcord_ledger::LedgerRpc;

use crate::error::{PipelineError, Stage};

/// Interval and attempt budget for confirmation polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Delay between consecutive polls.
    pub interval: Duration,
    /// Polls before giving up.
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    /// 30 polls, 30 seconds apart.
    fn default() -> Self {
        Self::fixed(Duration::from_secs(30), 30)
    }
}

impl PollPolicy {
    /// A policy with the given interval and budget.
    pub const fn fixed(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }
}

/// Confirmation state of a transaction at one point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmationStatus {
    /// The transaction checked.
    pub txid: Txid,
    /// Whether the ledger knows the transaction at all.
    pub found: bool,
    /// Depth; 0 in the mempool or when not found.
    pub confirmations: u32,
}

impl ConfirmationStatus {
    /// Known and at least one block deep.
    pub fn is_confirmed(&self) -> bool {
        self.found && self.confirmations > 0
    }
}

/// Polls a ledger for transaction depth.
#[derive(Clone)]
pub struct ConfirmationTracker {
    ledger: Arc<dyn LedgerRpc>,
    policy: PollPolicy,
}

impl ConfirmationTracker {
    /// Tracker over `ledger` using `policy`.
    pub fn new(ledger: Arc<dyn LedgerRpc>, policy: PollPolicy) -> Self {
        Self { ledger, policy }
    }

    /// The polling policy.
    pub fn policy(&self) -> PollPolicy {
        self.policy
    }

    /// One confirmation check, no polling.
    ///
    /// Reports whether the transaction exists and how deep it is. Says
    /// nothing about the credential it carries.
    pub async fn verify_transaction(&self, txid: Txid) -> Result<ConfirmationStatus, PipelineError> {
        self.check(txid, Stage::Lookup).await
    }

    async fn check(&self, txid: Txid, stage: Stage) -> Result<ConfirmationStatus, PipelineError> {
        let tx = self
            .ledger
            .get_transaction(&txid)
            .await
            .map_err(|e| PipelineError::ledger(stage, Some(txid), e))?;
        Ok(ConfirmationStatus {
            txid,
            found: tx.is_some(),
            confirmations: tx.map_or(0, |t| t.confirmations),
        })
    }

    /// Poll until `txid` is known and at least `depth` blocks deep.
    ///
    /// A transaction the ledger does not report yet counts as depth 0 and
    /// polling continues. A ledger error aborts immediately. No sleep
    /// follows the final attempt.
    pub async fn await_confirmation(
        &self,
        txid: Txid,
        depth: u32,
    ) -> Result<ConfirmationStatus, PipelineError> {
        let mut last_depth = 0;
        for attempt in 1..=self.policy.max_attempts {
            let status = self.check(txid, Stage::Confirm).await?;
            last_depth = status.confirmations;
            if status.found && status.confirmations >= depth {
                tracing::info!(%txid, depth = status.confirmations, attempt, "transaction confirmed");
                return Ok(status);
            }
            tracing::debug!(
                %txid,
                depth = status.confirmations,
                target = depth,
                attempt,
                max_attempts = self.policy.max_attempts,
                "awaiting confirmation"
            );
            if attempt < self.policy.max_attempts {
                tokio::time::sleep(self.policy.interval).await;
            }
        }
        tracing::warn!(
            %txid,
            last_depth,
            attempts = self.policy.max_attempts,
            "confirmation polling budget exhausted"
        );
        Err(PipelineError::ConfirmationTimeout {
            txid,
            attempts: self.policy.max_attempts,
            last_depth,
        })
    }
}
