//! # Ledger Subcommands
//!
//! `status`, `inscribe`, `retrieve` and `confirm`. Each builds a pipeline
//! from the environment (`LedgerConfig::from_env`, `PipelineConfig::from_env`)
//! or, with `--mock`, against an in-process ledger funded for a demo run.
//!
//! Only `inscribe` needs signing keys. The other commands run watch-only and
//! never load a seed.
//!
//! The mock ledger lives only as long as one command, so `--mock` is
//! accepted by `status` and `inscribe` and refused by `retrieve` and
//! `confirm`, which could never find a transaction in it.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use bitcoin::{Amount, Network, ScriptBuf, Txid};
use clap::Args;

use vcord_ledger::{BitcoinRpcClient, LedgerConfig, LedgerRpc, MockLedger};
use vcord_pipeline::{InscriptionPipeline, PipelineConfig};
use vcord_tx::{HashSigner, HdKeySource, KeySource, SignerError};

use crate::credential::read_json;

/// Value funded to the wallet key in `--mock` runs.
const MOCK_FUNDING: Amount = Amount::from_sat(1_000_000);

/// Seed used in `--mock` runs when none is configured.
const MOCK_SEED: [u8; 32] = [0x42; 32];

/// Arguments for `vcord inscribe`.
#[derive(Args, Debug)]
pub struct InscribeArgs {
    /// Credential JSON document.
    #[arg(value_name = "FILE")]
    pub file: PathBuf,
}

/// Arguments for `vcord retrieve`.
#[derive(Args, Debug)]
pub struct RetrieveArgs {
    /// Inscription transaction id.
    pub txid: Txid,
    /// Write the credential here instead of stdout.
    #[arg(long, short)]
    pub out: Option<PathBuf>,
}

/// Arguments for `vcord confirm`.
#[derive(Args, Debug)]
pub struct ConfirmArgs {
    /// Transaction id.
    pub txid: Txid,
    /// Poll until confirmed (per `VCORD_POLL_*`) instead of checking once.
    #[arg(long)]
    pub wait: bool,
    /// Target depth when waiting. Default: `VCORD_CONFIRMATIONS`.
    #[arg(long)]
    pub depth: Option<u32>,
}

/// Key source for commands that never sign.
struct WatchOnly;

impl KeySource for WatchOnly {
    fn derive(&self, _index: u32) -> Result<Box<dyn HashSigner>, SignerError> {
        Err(SignerError::MissingSeed("VCORD_SEED_HEX or SEED_PATH"))
    }
}

/// Build a pipeline for one command.
pub fn connect(mock: bool, signing: bool) -> Result<InscriptionPipeline> {
    if mock {
        return connect_mock(signing);
    }
    let ledger_config = LedgerConfig::from_env().context("ledger configuration")?;
    let network = ledger_config.network;
    tracing::debug!(?ledger_config, "connecting to ledger");
    let ledger: Arc<dyn LedgerRpc> =
        Arc::new(BitcoinRpcClient::new(ledger_config).context("cannot build RPC client")?);
    let keys: Arc<dyn KeySource> = if signing {
        Arc::new(HdKeySource::from_env(network).context("cannot load wallet seed")?)
    } else {
        Arc::new(WatchOnly)
    };
    let config = PipelineConfig::from_env(network).context("pipeline configuration")?;
    Ok(InscriptionPipeline::new(ledger, keys, config))
}

fn connect_mock(signing: bool) -> Result<InscriptionPipeline> {
    let network = Network::Regtest;
    let ledger = Arc::new(MockLedger::new().with_auto_mine());
    let keys: Arc<dyn KeySource> = if signing {
        let hd = seed_or_demo(HdKeySource::from_env(network), network)?;
        let config = PipelineConfig::from_env(network)?;
        let key = hd.derive(config.key_index)?.public_key();
        let script = if config.witness {
            ScriptBuf::new_p2wpkh(&key.wpubkey_hash())
        } else {
            ScriptBuf::new_p2pkh(&key.pubkey_hash())
        };
        ledger.fund(MOCK_FUNDING, script);
        Arc::new(hd)
    } else {
        Arc::new(WatchOnly)
    };
    let config = PipelineConfig::from_env(network)?;
    tracing::info!("using in-process mock ledger");
    Ok(InscriptionPipeline::new(ledger, keys, config))
}

/// Fall back to the demo seed only when no seed is configured. A configured
/// seed that fails to load is an error.
fn seed_or_demo(
    loaded: Result<HdKeySource, SignerError>,
    network: Network,
) -> Result<HdKeySource, SignerError> {
    match loaded {
        Err(SignerError::MissingSeed(_)) => {
            tracing::warn!("no seed configured, using the built-in demo seed");
            HdKeySource::from_seed(&MOCK_SEED, network)
        }
        other => other,
    }
}

fn refuse_mock(mock: bool, command: &str) -> Result<()> {
    if mock {
        bail!("`{command}` cannot run with --mock: the mock ledger starts empty on every run");
    }
    Ok(())
}

/// Print chain name, height, best block and sync progress.
pub async fn run_status(mock: bool) -> Result<u8> {
    let pipeline = connect(mock, false)?;
    let info = pipeline.blockchain_status().await?;
    println!("chain:        {}", info.chain);
    println!("blocks:       {}", info.blocks);
    println!("headers:      {}", info.headers);
    println!("best block:   {}", info.best_block_hash);
    println!("progress:     {:.4}", info.verification_progress);
    Ok(0)
}

/// Inscribe a credential and print the txid once confirmed.
///
/// In `--mock` runs the credential is read back and printed too, since the
/// ledger does not outlive the process.
pub async fn run_inscribe(args: &InscribeArgs, mock: bool) -> Result<u8> {
    let doc = read_json(&args.file)?;
    let pipeline = connect(mock, true)?;
    let txid = pipeline.inscribe(&doc).await?;
    println!("{txid}");
    if mock {
        let credential = pipeline.retrieve(txid).await?;
        println!("{}", serde_json::to_string_pretty(&credential)?);
    }
    Ok(0)
}

/// Fetch and decode an inscribed credential.
pub async fn run_retrieve(args: &RetrieveArgs, mock: bool) -> Result<u8> {
    refuse_mock(mock, "retrieve")?;
    let pipeline = connect(false, false)?;
    let credential = pipeline.retrieve(args.txid).await?;
    let json = serde_json::to_string_pretty(&credential)?;
    match &args.out {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("OK: wrote {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(0)
}

/// Report confirmation depth. Exit code 1 when not confirmed.
pub async fn run_confirm(args: &ConfirmArgs, mock: bool) -> Result<u8> {
    refuse_mock(mock, "confirm")?;
    let pipeline = connect(false, false)?;
    let status = if args.wait {
        let depth = args.depth.unwrap_or(pipeline.config().confirmation_depth);
        pipeline.tracker().await_confirmation(args.txid, depth).await?
    } else {
        pipeline.verify_transaction(args.txid).await?
    };
    if !status.found {
        println!("{}: not found", status.txid);
        return Ok(1);
    }
    println!("{}: {} confirmation(s)", status.txid, status.confirmations);
    Ok(if status.is_confirmed() { 0 } else { 1 })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn watch_only_refuses_to_sign() {
        assert!(matches!(
            WatchOnly.derive(0),
            Err(SignerError::MissingSeed(_))
        ));
    }

    #[test]
    fn demo_seed_only_when_none_configured() {
        let missing = seed_or_demo(Err(SignerError::MissingSeed("VCORD_SEED_HEX")), Network::Regtest);
        let demo = HdKeySource::from_seed(&MOCK_SEED, Network::Regtest).unwrap();
        assert_eq!(
            missing.unwrap().derive(0).unwrap().public_key(),
            demo.derive(0).unwrap().public_key()
        );

        let malformed = seed_or_demo(
            Err(SignerError::InvalidSeed("VCORD_SEED_HEX: odd length".into())),
            Network::Regtest,
        );
        assert!(matches!(malformed, Err(SignerError::InvalidSeed(_))));

        let unreadable = seed_or_demo(
            Err(SignerError::SeedFile {
                path: "/nonexistent/seed".into(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            }),
            Network::Regtest,
        );
        assert!(matches!(unreadable, Err(SignerError::SeedFile { .. })));
    }

    #[tokio::test]
    async fn retrieve_and_confirm_refuse_mock() {
        let txid: Txid = "4a5e1e4baab89f3a32518a88c31bc87f618f76673e2cc77ab2127b7afdeda33b"
            .parse()
            .unwrap();
        let err = run_retrieve(&RetrieveArgs { txid, out: None }, true)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("--mock"), "{err}");

        let args = ConfirmArgs {
            txid,
            wait: false,
            depth: None,
        };
        let err = run_confirm(&args, true).await.unwrap_err();
        assert!(err.to_string().contains("`confirm`"), "{err}");
    }

    #[tokio::test]
    async fn mock_status_reports_regtest() {
        let pipeline = connect(true, false).unwrap();
        let info = pipeline.blockchain_status().await.unwrap();
        assert_eq!(info.chain, "regtest");
    }
}
