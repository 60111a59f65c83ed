//! Ledger node connection configuration.
//!
//! Defaults point at a local testnet node. Override via environment
//! variables or explicit construction.

use bitcoin::Network;
use url::Url;
use zeroize::Zeroizing;

/// Connection settings for a Bitcoin Core JSON-RPC endpoint.
///
/// Custom `Debug` implementation redacts the RPC password.
#[derive(Clone)]
pub struct LedgerConfig {
    /// JSON-RPC endpoint. Default: <http://localhost:8332>
    pub rpc_url: Url,
    /// RPC user name.
    pub rpc_user: String,
    /// RPC password, wiped from memory on drop.
    pub rpc_password: Zeroizing<String>,
    /// Network the node runs on.
    pub network: Network,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl std::fmt::Debug for LedgerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerConfig")
            .field("rpc_url", &self.rpc_url)
            .field("rpc_user", &self.rpc_user)
            .field("rpc_password", &"[REDACTED]")
            .field("network", &self.network)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl LedgerConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `BITCOIN_NETWORK` (default: `testnet`)
    /// - `BITCOIN_NODE_URL` (default: `http://localhost:8332`)
    /// - `BITCOIN_RPC_USER` (default: empty)
    /// - `BITCOIN_RPC_PASSWORD` (default: empty)
    /// - `BITCOIN_RPC_TIMEOUT_SECS` (default: 30)
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            rpc_url: env_url("BITCOIN_NODE_URL", "http://localhost:8332")?,
            rpc_user: std::env::var("BITCOIN_RPC_USER").unwrap_or_default(),
            rpc_password: Zeroizing::new(std::env::var("BITCOIN_RPC_PASSWORD").unwrap_or_default()),
            network: parse_network(
                &std::env::var("BITCOIN_NETWORK").unwrap_or_else(|_| "testnet".to_string()),
            )?,
            timeout_secs: env_parse("BITCOIN_RPC_TIMEOUT_SECS", 30)?,
        })
    }

    /// Configuration for a local node (regtest or a test server).
    pub fn local(rpc_url: &str, user: &str, password: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            rpc_url: Url::parse(rpc_url)
                .map_err(|e| ConfigError::InvalidUrl(rpc_url.to_string(), e.to_string()))?,
            rpc_user: user.to_string(),
            rpc_password: Zeroizing::new(password.to_string()),
            network: Network::Regtest,
            timeout_secs: 5,
        })
    }
}

/// Parse a network name, accepting both rust-bitcoin and Bitcoin Core spellings.
pub fn parse_network(name: &str) -> Result<Network, ConfigError> {
    match name.to_ascii_lowercase().as_str() {
        "mainnet" | "main" | "bitcoin" => Ok(Network::Bitcoin),
        "testnet" | "test" | "testnet3" => Ok(Network::Testnet),
        "signet" => Ok(Network::Signet),
        "regtest" => Ok(Network::Regtest),
        _ => Err(ConfigError::InvalidNetwork(name.to_string())),
    }
}

fn env_url(var: &str, default: &str) -> Result<Url, ConfigError> {
    let raw = std::env::var(var).unwrap_or_else(|_| default.to_string());
    Url::parse(&raw).map_err(|e| ConfigError::InvalidUrl(var.to_string(), e.to_string()))
}

/// Read and parse an environment variable, falling back to `default` when unset.
pub fn env_parse<T: std::str::FromStr>(var: &str, default: T) -> Result<T, ConfigError> {
    match std::env::var(var) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
            var: var.to_string(),
            value: raw,
        }),
        Err(_) => Ok(default),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A URL variable does not parse.
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(String, String),
    /// Unknown network name.
    #[error("unknown bitcoin network {0:?} (expected mainnet, testnet, signet or regtest)")]
    InvalidNetwork(String),
    /// A variable is set but does not parse.
    #[error("invalid value {value:?} for {var}")]
    InvalidValue {
        /// Variable name.
        var: String,
        /// Raw value.
        value: String,
    },
}
