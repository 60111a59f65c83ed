//! # vcord-cli: Command-Line Interface
//!
//! Provides the `vcord` binary.
//!
//! ## Subcommands
//!
//! - `vcord encode FILE`: credential JSON to hex payload.
//! - `vcord decode HEX|@FILE`: hex payload to credential JSON.
//! - `vcord verify FILE`: structure, validity dates and proof shape.
//! - `vcord status`: chain and sync state of the configured node.
//! - `vcord inscribe FILE`: inscribe and wait for confirmation.
//! - `vcord retrieve TXID [--out FILE]`: read an inscription back.
//! - `vcord confirm TXID [--wait]`: confirmation depth of a transaction.
//!
//! Ledger commands read `BITCOIN_*` and `VCORD_*` environment variables;
//! `--mock` runs them against an in-process ledger instead.
//!
//! ```bash
//! vcord encode credential.json > payload.hex
//! vcord decode @payload.hex
//! vcord --mock inscribe credential.json
//! ```

pub mod credential;
pub mod ledger;

use tracing_subscriber::EnvFilter;

/// Install the global subscriber. Logs go to stderr so stdout carries only
/// command output.
///
/// `RUST_LOG` wins when set and no `-v` is given; otherwise the filter
/// follows the `-v` count.
pub fn init_tracing(verbose: u8, json: bool) {
    let filter = match (verbose, EnvFilter::try_from_default_env()) {
        (0, Ok(from_env)) => from_env,
        (0, Err(_)) => EnvFilter::new("warn"),
        (1, _) => EnvFilter::new("info"),
        (2, _) => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
