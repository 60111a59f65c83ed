//! # Bitcoin Core JSON-RPC Client
//!
//! Production [`LedgerRpc`] implementation speaking JSON-RPC 1.0 with HTTP
//! basic auth to a Bitcoin Core node.
//!
//! ## Method mapping
//!
//! | Capability            | RPC                               |
//! |-----------------------|-----------------------------------|
//! | `blockchain_info`     | `getblockchaininfo`               |
//! | `list_unspent`        | `listunspent <minconf>`           |
//! | `estimate_fee_rate`   | `estimatesmartfee <blocks>`       |
//! | `broadcast`           | `sendrawtransaction <hex>`        |
//! | `get_transaction`     | `getrawtransaction <txid> true`   |
//!
//! Bitcoin Core reports RPC errors with a non-2xx status *and* a JSON body,
//! so the body is parsed before the status is judged.

use async_trait::async_trait;
use bitcoin::{Amount, FeeRate, OutPoint, ScriptBuf, Transaction, Txid};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::config::LedgerConfig;
use crate::error::LedgerError;
use crate::types::{BlockchainInfo, LedgerTransaction, Utxo};
use crate::LedgerRpc;

/// `RPC_INVALID_ADDRESS_OR_KEY`: returned by `getrawtransaction` for unknown txids.
const RPC_NOT_FOUND: i64 = -5;

/// JSON-RPC client for a Bitcoin Core node.
#[derive(Debug, Clone)]
pub struct BitcoinRpcClient {
    client: reqwest::Client,
    config: LedgerConfig,
}

#[derive(Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

#[derive(Deserialize)]
struct RawUnspent {
    txid: Txid,
    vout: u32,
    #[serde(rename = "scriptPubKey")]
    script_pubkey: ScriptBuf,
    #[serde(with = "bitcoin::amount::serde::as_btc")]
    amount: Amount,
    confirmations: u32,
    #[serde(default = "default_true")]
    spendable: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Deserialize)]
struct RawFeeEstimate {
    feerate: Option<f64>,
    #[serde(default)]
    errors: Vec<String>,
}

#[derive(Deserialize)]
struct RawTransaction {
    hex: String,
    #[serde(default)]
    confirmations: u32,
}

impl BitcoinRpcClient {
    /// Build a client with the configured request timeout.
    pub fn new(config: LedgerConfig) -> Result<Self, LedgerError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|source| LedgerError::Transport {
                method: "client-init".to_string(),
                source,
            })?;
        Ok(Self { client, config })
    }

    /// Access the connection configuration.
    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Call `method` and deserialize its `result`.
    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, LedgerError> {
        let result = self.call_raw(method, params).await?;
        serde_json::from_value(result).map_err(|e| LedgerError::InvalidResponse {
            method: method.to_string(),
            reason: e.to_string(),
        })
    }

    async fn call_raw(&self, method: &str, params: Value) -> Result<Value, LedgerError> {
        let body = json!({
            "jsonrpc": "1.0",
            "id": "vcord",
            "method": method,
            "params": params,
        });
        tracing::debug!(method, "bitcoin rpc call");

        let resp = self
            .client
            .post(self.config.rpc_url.clone())
            .basic_auth(&self.config.rpc_user, Some(self.config.rpc_password.as_str()))
            .json(&body)
            .send()
            .await
            .map_err(|source| {
                if source.is_timeout() {
                    LedgerError::Timeout {
                        method: method.to_string(),
                    }
                } else {
                    LedgerError::Transport {
                        method: method.to_string(),
                        source,
                    }
                }
            })?;

        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(LedgerError::Unauthorized);
        }

        let text = resp.text().await.map_err(|source| LedgerError::Transport {
            method: method.to_string(),
            source,
        })?;

        let json: Value = match serde_json::from_str(&text) {
            Ok(v) => v,
            Err(e) if status.is_success() => {
                return Err(LedgerError::InvalidResponse {
                    method: method.to_string(),
                    reason: format!("invalid JSON: {e}"),
                })
            }
            Err(_) => {
                return Err(LedgerError::Http {
                    method: method.to_string(),
                    status: status.as_u16(),
                    body: text,
                })
            }
        };

        match json.get("error") {
            Some(Value::Null) | None => {}
            Some(err) => {
                let err: RpcErrorBody =
                    serde_json::from_value(err.clone()).map_err(|e| LedgerError::InvalidResponse {
                        method: method.to_string(),
                        reason: format!("malformed error object: {e}"),
                    })?;
                return Err(LedgerError::Rpc {
                    method: method.to_string(),
                    code: err.code,
                    message: err.message,
                });
            }
        }

        if !status.is_success() {
            return Err(LedgerError::Http {
                method: method.to_string(),
                status: status.as_u16(),
                body: text,
            });
        }

        json.get("result")
            .cloned()
            .ok_or_else(|| LedgerError::InvalidResponse {
                method: method.to_string(),
                reason: "missing 'result' field".to_string(),
            })
    }
}

/// Convert a BTC/kvB estimate into a fee rate, floored at the relay minimum.
pub fn fee_rate_from_btc_per_kvb(btc_per_kvb: f64) -> Option<FeeRate> {
    let sat_per_kvb = Amount::from_btc(btc_per_kvb).ok()?.to_sat();
    // 1 vB = 4 WU, so sat/kvB / 4 = sat/kwu.
    let rate = FeeRate::from_sat_per_kwu(sat_per_kvb / 4);
    Some(rate.max(FeeRate::BROADCAST_MIN))
}

#[async_trait]
impl LedgerRpc for BitcoinRpcClient {
    async fn blockchain_info(&self) -> Result<BlockchainInfo, LedgerError> {
        self.call("getblockchaininfo", json!([])).await
    }

    async fn list_unspent(&self, min_confirmations: u32) -> Result<Vec<Utxo>, LedgerError> {
        let raw: Vec<RawUnspent> = self.call("listunspent", json!([min_confirmations])).await?;
        Ok(raw
            .into_iter()
            .filter(|u| u.spendable)
            .map(|u| Utxo {
                outpoint: OutPoint::new(u.txid, u.vout),
                value: u.amount,
                script_pubkey: u.script_pubkey,
                confirmations: u.confirmations,
            })
            .collect())
    }

    async fn estimate_fee_rate(&self, target_blocks: u16) -> Result<FeeRate, LedgerError> {
        let raw: RawFeeEstimate = self.call("estimatesmartfee", json!([target_blocks])).await?;
        match raw.feerate.and_then(fee_rate_from_btc_per_kvb) {
            Some(rate) => Ok(rate),
            None => {
                tracing::warn!(
                    target_blocks,
                    errors = ?raw.errors,
                    "no fee estimate available, using relay minimum"
                );
                Ok(FeeRate::BROADCAST_MIN)
            }
        }
    }

    async fn broadcast(&self, raw_hex: &str) -> Result<Txid, LedgerError> {
        match self.call("sendrawtransaction", json!([raw_hex])).await {
            Ok(txid) => Ok(txid),
            Err(LedgerError::Rpc { code, message, .. }) => {
                let err = LedgerError::from_broadcast_rejection(code, message);
                tracing::warn!(error = %err, "broadcast rejected");
                Err(err)
            }
            Err(other) => Err(other),
        }
    }

    async fn get_transaction(&self, txid: &Txid) -> Result<Option<LedgerTransaction>, LedgerError> {
        let raw: RawTransaction =
            match self.call("getrawtransaction", json!([txid.to_string(), true])).await {
                Ok(raw) => raw,
                Err(LedgerError::Rpc {
                    code: RPC_NOT_FOUND, ..
                }) => return Ok(None),
                Err(other) => return Err(other),
            };
        let transaction: Transaction = bitcoin::consensus::encode::deserialize_hex(&raw.hex)
            .map_err(|e| LedgerError::InvalidResponse {
                method: "getrawtransaction".to_string(),
                reason: format!("undecodable transaction hex: {e}"),
            })?;
        Ok(Some(LedgerTransaction {
            txid: transaction.compute_txid(),
            confirmations: raw.confirmations,
            transaction,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fee_rate_conversion() {
        // 0.0001 BTC/kvB = 10_000 sat/kvB = 10 sat/vB = 2_500 sat/kwu.
        let rate = fee_rate_from_btc_per_kvb(0.0001).unwrap();
        assert_eq!(rate.to_sat_per_kwu(), 2_500);
        assert_eq!(rate.to_sat_per_vb_floor(), 10);
    }

    #[test]
    fn fee_rate_floored_at_relay_minimum() {
        let rate = fee_rate_from_btc_per_kvb(0.000_000_01).unwrap();
        assert_eq!(rate, FeeRate::BROADCAST_MIN);
    }

    #[test]
    fn negative_estimate_is_unusable() {
        assert!(fee_rate_from_btc_per_kvb(-1.0).is_none());
    }
}
