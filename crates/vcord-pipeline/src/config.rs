//! Pipeline configuration.
//!
//! An explicit struct handed to [`InscriptionPipeline::new`](crate::InscriptionPipeline::new);
//! there is no process-wide instance. Defaults suit a testnet node.

use std::str::FromStr;
use std::time::Duration;

use bitcoin::{Address, Network};
use vcord_ledger::config::env_parse;
use vcord_ledger::ConfigError;

use crate::confirm::PollPolicy;

/// Settings for one pipeline instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Network addresses are checked against.
    pub network: Network,
    /// Confirmation target passed to fee estimation. Default: 6.
    pub fee_target_blocks: u16,
    /// Minimum depth of outputs eligible for selection. Default: 1.
    pub min_confirmations: u32,
    /// Depth at which an inscription counts as confirmed. Default: 1.
    pub confirmation_depth: u32,
    /// Confirmation polling budget.
    pub poll: PollPolicy,
    /// Spend witness inputs (546 sat inscription) rather than legacy
    /// (1000 sat). Default: true.
    pub witness: bool,
    /// Child index of the wallet key. Default: 0.
    pub key_index: u32,
    /// Change destination. Default: the wallet key's P2WPKH script.
    pub change_address: Option<Address>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            network: Network::Testnet,
            fee_target_blocks: 6,
            min_confirmations: 1,
            confirmation_depth: 1,
            poll: PollPolicy::default(),
            witness: true,
            key_index: 0,
            change_address: None,
        }
    }
}

impl PipelineConfig {
    /// Defaults for `network`.
    pub fn for_network(network: Network) -> Self {
        Self {
            network,
            ..Self::default()
        }
    }

    /// Load overrides from environment variables.
    ///
    /// Variables:
    /// - `VCORD_FEE_TARGET_BLOCKS` (default: 6)
    /// - `VCORD_MIN_CONFIRMATIONS` (default: 1)
    /// - `VCORD_CONFIRMATIONS` (default: 1)
    /// - `VCORD_POLL_INTERVAL_SECS` (default: 30)
    /// - `VCORD_POLL_MAX_ATTEMPTS` (default: 30, at least 1)
    /// - `VCORD_LEGACY_INPUTS` (default: false)
    /// - `VCORD_KEY_INDEX` (default: 0)
    /// - `VCORD_CHANGE_ADDRESS` (default: unset)
    pub fn from_env(network: Network) -> Result<Self, ConfigError> {
        let defaults = PollPolicy::default();
        let change_address = match std::env::var("VCORD_CHANGE_ADDRESS") {
            Ok(raw) => Some(parse_address(&raw, network)?),
            Err(_) => None,
        };
        Ok(Self {
            network,
            fee_target_blocks: env_parse("VCORD_FEE_TARGET_BLOCKS", 6)?,
            min_confirmations: env_parse("VCORD_MIN_CONFIRMATIONS", 1)?,
            confirmation_depth: env_parse("VCORD_CONFIRMATIONS", 1)?,
            poll: PollPolicy::fixed(
                Duration::from_secs(env_parse(
                    "VCORD_POLL_INTERVAL_SECS",
                    defaults.interval.as_secs(),
                )?),
                at_least_one(
                    "VCORD_POLL_MAX_ATTEMPTS",
                    env_parse("VCORD_POLL_MAX_ATTEMPTS", defaults.max_attempts)?,
                )?,
            ),
            witness: !env_parse("VCORD_LEGACY_INPUTS", false)?,
            key_index: env_parse("VCORD_KEY_INDEX", 0)?,
            change_address,
        })
    }
}

/// A zero polling budget would time out without asking the ledger once.
fn at_least_one(var: &str, value: u32) -> Result<u32, ConfigError> {
    if value == 0 {
        return Err(ConfigError::InvalidValue {
            var: var.to_string(),
            value: value.to_string(),
        });
    }
    Ok(value)
}

/// Parse an address and require it to belong to `network`.
pub fn parse_address(raw: &str, network: Network) -> Result<Address, ConfigError> {
    let invalid = || ConfigError::InvalidValue {
        var: "VCORD_CHANGE_ADDRESS".to_string(),
        value: raw.to_string(),
    };
    Address::from_str(raw.trim())
        .map_err(|_| invalid())?
        .require_network(network)
        .map_err(|_| invalid())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = PipelineConfig::default();
        assert_eq!(cfg.fee_target_blocks, 6);
        assert_eq!(cfg.confirmation_depth, 1);
        assert_eq!(cfg.poll.interval, Duration::from_secs(30));
        assert_eq!(cfg.poll.max_attempts, 30);
        assert!(cfg.witness);
        assert!(cfg.change_address.is_none());
    }

    #[test]
    fn zero_poll_attempts_rejected() {
        assert!(matches!(
            at_least_one("VCORD_POLL_MAX_ATTEMPTS", 0),
            Err(ConfigError::InvalidValue { var, value }) if var == "VCORD_POLL_MAX_ATTEMPTS" && value == "0"
        ));
        assert_eq!(at_least_one("VCORD_POLL_MAX_ATTEMPTS", 1).unwrap(), 1);
    }

    #[test]
    fn address_network_is_enforced() {
        use bitcoin::secp256k1::{PublicKey, Secp256k1, SecretKey};
        let secp = Secp256k1::new();
        let key = bitcoin::CompressedPublicKey(PublicKey::from_secret_key(
            &secp,
            &SecretKey::from_slice(&[3u8; 32]).unwrap(),
        ));
        let regtest = Address::p2wpkh(&key, Network::Regtest).to_string();
        assert!(regtest.starts_with("bcrt1q"));
        assert!(parse_address(&regtest, Network::Regtest).is_ok());
        assert!(matches!(
            parse_address(&regtest, Network::Bitcoin),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(parse_address("not-an-address", Network::Regtest).is_err());
    }
}
