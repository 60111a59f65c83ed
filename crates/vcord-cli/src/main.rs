//! # vcord CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::process::ExitCode;

use clap::{Parser, Subcommand};

use vcord_cli::credential::{run_decode, run_encode, run_verify, DecodeArgs, EncodeArgs, VerifyArgs};
use vcord_cli::init_tracing;
use vcord_cli::ledger::{
    run_confirm, run_inscribe, run_retrieve, run_status, ConfirmArgs, InscribeArgs, RetrieveArgs,
};

/// vcord: identity credentials inscribed on Bitcoin.
///
/// Encodes W3C identity credentials into a checksummed binary payload,
/// embeds them in ord-style inscription envelopes, and reads them back.
#[derive(Parser, Debug)]
#[command(name = "vcord", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    json: bool,

    /// Run ledger commands against an in-process mock ledger.
    #[arg(long, global = true)]
    mock: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Encode a credential JSON document to a hex payload.
    Encode(EncodeArgs),

    /// Decode a hex payload back to credential JSON.
    Decode(DecodeArgs),

    /// Check a credential's structure, validity dates and proof shape.
    Verify(VerifyArgs),

    /// Show chain and sync state of the ledger node.
    Status,

    /// Inscribe a credential and wait for confirmation.
    Inscribe(InscribeArgs),

    /// Read back the credential inscribed by a transaction.
    Retrieve(RetrieveArgs),

    /// Show the confirmation depth of a transaction.
    Confirm(ConfirmArgs),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.json);
    tracing::debug!("vcord CLI v{} starting", env!("CARGO_PKG_VERSION"));

    let result = match &cli.command {
        Commands::Encode(args) => run_encode(args),
        Commands::Decode(args) => run_decode(args),
        Commands::Verify(args) => run_verify(args),
        Commands::Status => run_status(cli.mock).await,
        Commands::Inscribe(args) => run_inscribe(args, cli.mock).await,
        Commands::Retrieve(args) => run_retrieve(args, cli.mock).await,
        Commands::Confirm(args) => run_confirm(args, cli.mock).await,
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}
