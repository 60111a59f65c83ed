//! # Inscription Pipeline
//!
//! `inscribe`: encode → fee estimate → fresh listing → selection → envelope
//! → assemble and sign → broadcast → await confirmation.
//!
//! `retrieve`: lookup → confirmation check → payload extraction → decode.
//!
//! Stages run strictly in sequence and any failure aborts the call. Nothing
//! is persisted between stages; a failed inscription restarts from the
//! credential. Each call takes its own listing snapshot, so concurrent
//! inscriptions share no mutable state. Two calls that select the same
//! outputs race at broadcast and the loser fails with
//! [`PipelineError::DoubleSpendConflict`].

use std::sync::Arc;

use bitcoin::{ScriptBuf, Txid};
use serde::Serialize;
use vcord_core::IdentityCredential;
use vcord_ledger::{BlockchainInfo, LedgerError, LedgerRpc};
use vcord_tx::{
    assemble, build_inscription_script, dust_floor, extract_payload, select_for_inscription,
    AssemblyRequest, KeySource,
};

use crate::config::PipelineConfig;
use crate::confirm::{ConfirmationStatus, ConfirmationTracker};
use crate::error::{PipelineError, Stage};

/// Inscribes credentials and reads them back.
#[derive(Clone)]
pub struct InscriptionPipeline {
    ledger: Arc<dyn LedgerRpc>,
    keys: Arc<dyn KeySource>,
    config: PipelineConfig,
    tracker: ConfirmationTracker,
}

impl InscriptionPipeline {
    /// Build a pipeline over explicit dependencies.
    pub fn new(ledger: Arc<dyn LedgerRpc>, keys: Arc<dyn KeySource>, config: PipelineConfig) -> Self {
        let tracker = ConfirmationTracker::new(ledger.clone(), config.poll);
        Self {
            ledger,
            keys,
            config,
            tracker,
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// The confirmation tracker this pipeline polls with.
    pub fn tracker(&self) -> &ConfirmationTracker {
        &self.tracker
    }

    /// Inscribe `credential` and wait for it to confirm.
    ///
    /// Accepts a typed [`IdentityCredential`] or any serializable JSON
    /// shape; validation runs before anything touches the ledger.
    pub async fn inscribe<C>(&self, credential: &C) -> Result<Txid, PipelineError>
    where
        C: Serialize + Sync,
    {
        let payload = vcord_core::encode(credential).map_err(PipelineError::Encode)?;
        let script = build_inscription_script(&payload).map_err(PipelineError::from_tx)?;
        tracing::info!(
            payload_bytes = payload.len(),
            script_bytes = script.len(),
            "credential encoded"
        );

        let fee_rate = self
            .ledger
            .estimate_fee_rate(self.config.fee_target_blocks)
            .await
            .map_err(|e| PipelineError::ledger(Stage::EstimateFee, None, e))?;
        let snapshot = self
            .ledger
            .list_unspent(self.config.min_confirmations)
            .await
            .map_err(|e| PipelineError::ledger(Stage::ListUnspent, None, e))?;

        let witness = self.config.witness;
        let inscription_value = dust_floor(witness);
        let plan = select_for_inscription(&snapshot, script.len(), fee_rate, inscription_value, witness)
            .map_err(PipelineError::from_tx)?;
        tracing::info!(
            inputs = plan.selection.len(),
            fee_sat = plan.fee.to_sat(),
            sat_per_kwu = fee_rate.to_sat_per_kwu(),
            "inputs selected"
        );

        let signer = self.keys.derive(self.config.key_index)?;
        let change_script = match &self.config.change_address {
            Some(address) => address.script_pubkey(),
            None => ScriptBuf::new_p2wpkh(&signer.public_key().wpubkey_hash()),
        };
        let signed = assemble(
            &AssemblyRequest {
                utxos: plan.selection.utxos(&snapshot),
                script: &script,
                fee_rate,
                inscription_value,
                change_script: &change_script,
                witness,
            },
            signer.as_ref(),
        )
        .map_err(PipelineError::from_tx)?;

        let txid = match self.ledger.broadcast(&signed.raw_hex).await {
            Ok(txid) => txid,
            Err(source @ LedgerError::DoubleSpend { .. }) => {
                tracing::warn!(txid = %signed.txid, error = %source, "broadcast lost an input race");
                return Err(PipelineError::DoubleSpendConflict { source });
            }
            Err(e) => {
                tracing::warn!(txid = %signed.txid, error = %e, "broadcast rejected");
                return Err(PipelineError::ledger(Stage::Broadcast, Some(signed.txid), e));
            }
        };
        if txid != signed.txid {
            tracing::warn!(local = %signed.txid, ledger = %txid, "ledger reported a different txid");
        }
        tracing::info!(%txid, fee_sat = signed.fee.to_sat(), "inscription broadcast");

        self.tracker
            .await_confirmation(txid, self.config.confirmation_depth)
            .await?;
        Ok(txid)
    }

    /// Read back and decode the credential inscribed by `txid`.
    pub async fn retrieve(&self, txid: Txid) -> Result<IdentityCredential, PipelineError> {
        let found = self
            .ledger
            .get_transaction(&txid)
            .await
            .map_err(|e| PipelineError::ledger(Stage::Lookup, Some(txid), e))?
            .ok_or(PipelineError::TransactionNotFound(txid))?;
        if found.confirmations == 0 {
            return Err(PipelineError::UnconfirmedInscription(txid));
        }
        let payload = extract_payload(&found.transaction)
            .ok_or(PipelineError::MissingInscriptionData(txid))?;
        let credential = vcord_core::decode(&payload)
            .map_err(|source| PipelineError::Decode { txid, source })?;
        tracing::info!(%txid, depth = found.confirmations, "credential retrieved");
        Ok(credential)
    }

    /// Single confirmation check for `txid`.
    pub async fn verify_transaction(&self, txid: Txid) -> Result<ConfirmationStatus, PipelineError> {
        self.tracker.verify_transaction(txid).await
    }

    /// Chain name, height, best block and sync progress.
    pub async fn blockchain_status(&self) -> Result<BlockchainInfo, PipelineError> {
        self.ledger
            .blockchain_info()
            .await
            .map_err(|e| PipelineError::ledger(Stage::BlockchainInfo, None, e))
    }
}
