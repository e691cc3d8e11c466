//! Sui JSON-RPC client
//!
//! Thin wrapper over the fullnode's JSON-RPC 2.0 endpoint. The `SuiApi`
//! trait is the seam the orchestrator and resolver talk to, so tests can
//! substitute a mock without a network.
//!
//! SECURITY NOTE:
//! - Transaction building uses the node's `unsafe_paySui` builder, which
//!   needs only public inputs. No method here touches key material.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

/// Error type for RPC failures
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    #[error("invalid RPC URL: {0}")]
    InvalidUrl(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("node error {code}: {message}")]
    Node { code: i64, message: String },

    #[error("malformed response: {0}")]
    Malformed(String),
}

/// One coin object owned by an address
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoinInfo {
    pub coin_object_id: String,
    pub balance: String,
    #[serde(default)]
    pub coin_type: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CoinPage {
    data: Vec<CoinInfo>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransactionBytes {
    tx_bytes: String,
}

/// Execution status reported by the node
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionStatus {
    pub status: String,
    #[serde(default)]
    pub error: Option<String>,
}

/// Gas cost breakdown, all values in MIST as decimal strings
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GasCostSummary {
    pub computation_cost: String,
    pub storage_cost: String,
    pub storage_rebate: String,
    #[serde(default)]
    pub non_refundable_storage_fee: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionEffects {
    pub status: ExecutionStatus,
    pub gas_used: GasCostSummary,
}

/// Object owner in the wire format, e.g. `{"AddressOwner": "0x.."}`
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Owner {
    Address {
        #[serde(rename = "AddressOwner")]
        address_owner: String,
    },
    Object {
        #[serde(rename = "ObjectOwner")]
        object_owner: String,
    },
    Other(Value),
}

impl Owner {
    pub fn address(&self) -> Option<&str> {
        match self {
            Owner::Address { address_owner } => Some(address_owner),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceChange {
    pub owner: Owner,
    pub coin_type: String,
    pub amount: String,
}

/// Object change in the wire format; which id field is present depends on
/// the kind (`published` carries a `packageId` instead of an `objectId`)
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectChange {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub object_id: Option<String>,
    #[serde(default)]
    pub object_type: Option<String>,
    #[serde(default)]
    pub package_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuiEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub transaction_module: Option<String>,
    #[serde(default)]
    pub sender: Option<String>,
}

/// Response shape shared by dry runs and executed transaction blocks
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionBlockResponse {
    #[serde(default)]
    pub digest: Option<String>,
    pub effects: TransactionEffects,
    #[serde(default)]
    pub balance_changes: Vec<BalanceChange>,
    #[serde(default)]
    pub object_changes: Vec<ObjectChange>,
    #[serde(default)]
    pub events: Vec<SuiEvent>,
}

/// Network operations the transfer pipeline depends on
#[async_trait]
pub trait SuiApi: Send + Sync {
    /// SuiNS forward lookup; None when the name is unregistered or unbound
    async fn resolve_name_service_address(&self, name: &str) -> Result<Option<String>, RpcError>;

    /// SuiNS reverse lookup; names bound to an address, primary first
    async fn resolve_name_service_names(&self, address: &str) -> Result<Vec<String>, RpcError>;

    /// First page of SUI coin objects owned by `owner`
    async fn get_sui_coins(&self, owner: &str) -> Result<Vec<CoinInfo>, RpcError>;

    /// Build an unsigned paySui transaction; returns base64 tx bytes
    async fn build_pay_sui(
        &self,
        sender: &str,
        coin_ids: &[String],
        recipients: &[String],
        amounts: &[u64],
        gas_budget: u64,
    ) -> Result<String, RpcError>;

    /// Simulate without signing or committing
    async fn dry_run_transaction_block(
        &self,
        tx_bytes: &str,
    ) -> Result<TransactionBlockResponse, RpcError>;

    /// Submit a signed transaction and wait for local execution
    async fn execute_transaction_block(
        &self,
        tx_bytes: &str,
        signatures: &[String],
    ) -> Result<TransactionBlockResponse, RpcError>;
}

/// JSON-RPC client against a single fullnode endpoint
#[derive(Debug)]
pub struct SuiRpcClient {
    endpoint: url::Url,
    http: reqwest::Client,
}

impl SuiRpcClient {
    pub fn new(endpoint: &str) -> Result<Self, RpcError> {
        let endpoint: url::Url = endpoint
            .parse()
            .map_err(|e| RpcError::InvalidUrl(format!("{}: {}", endpoint, e)))?;
        Ok(Self {
            endpoint,
            http: reqwest::Client::new(),
        })
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, RpcError> {
        let payload = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });

        tracing::debug!(method, "sui rpc call");

        let response = self
            .http
            .post(self.endpoint.clone())
            .json(&payload)
            .send()
            .await
            .map_err(|e| RpcError::Transport(e.to_string()))?;

        let envelope: Value = response
            .json()
            .await
            .map_err(|e| RpcError::Transport(e.to_string()))?;

        if let Some(error) = envelope.get("error") {
            let code = error.get("code").and_then(Value::as_i64).unwrap_or(0);
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown node error")
                .to_string();
            return Err(RpcError::Node { code, message });
        }

        let result = envelope
            .get("result")
            .cloned()
            .ok_or_else(|| RpcError::Malformed("missing result field".to_string()))?;

        serde_json::from_value(result).map_err(|e| RpcError::Malformed(e.to_string()))
    }
}

#[async_trait]
impl SuiApi for SuiRpcClient {
    async fn resolve_name_service_address(&self, name: &str) -> Result<Option<String>, RpcError> {
        self.call("suix_resolveNameServiceAddress", json!([name]))
            .await
    }

    async fn resolve_name_service_names(&self, address: &str) -> Result<Vec<String>, RpcError> {
        #[derive(Deserialize)]
        struct NamePage {
            data: Vec<String>,
        }
        let page: NamePage = self
            .call("suix_resolveNameServiceNames", json!([address]))
            .await?;
        Ok(page.data)
    }

    async fn get_sui_coins(&self, owner: &str) -> Result<Vec<CoinInfo>, RpcError> {
        let page: CoinPage = self
            .call(
                "suix_getCoins",
                json!([owner, crate::config::SUI_COIN_TYPE, null, 10]),
            )
            .await?;
        Ok(page.data)
    }

    async fn build_pay_sui(
        &self,
        sender: &str,
        coin_ids: &[String],
        recipients: &[String],
        amounts: &[u64],
        gas_budget: u64,
    ) -> Result<String, RpcError> {
        // unsafe_paySui takes amounts and budget as decimal strings
        let amounts: Vec<String> = amounts.iter().map(u64::to_string).collect();
        let bytes: TransactionBytes = self
            .call(
                "unsafe_paySui",
                json!([sender, coin_ids, recipients, amounts, gas_budget.to_string()]),
            )
            .await?;
        Ok(bytes.tx_bytes)
    }

    async fn dry_run_transaction_block(
        &self,
        tx_bytes: &str,
    ) -> Result<TransactionBlockResponse, RpcError> {
        self.call("sui_dryRunTransactionBlock", json!([tx_bytes]))
            .await
    }

    async fn execute_transaction_block(
        &self,
        tx_bytes: &str,
        signatures: &[String],
    ) -> Result<TransactionBlockResponse, RpcError> {
        self.call(
            "sui_executeTransactionBlock",
            json!([
                tx_bytes,
                signatures,
                {
                    "showEffects": true,
                    "showBalanceChanges": true,
                    "showObjectChanges": true,
                    "showEvents": true,
                },
                "WaitForLocalExecution",
            ]),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_invalid_endpoint() {
        let err = SuiRpcClient::new("not a url").unwrap_err();
        assert!(matches!(err, RpcError::InvalidUrl(_)));
    }

    #[test]
    fn parses_transaction_block_response() {
        let value = json!({
            "digest": "9p6…",
            "effects": {
                "status": { "status": "success" },
                "gasUsed": {
                    "computationCost": "550000",
                    "storageCost": "1976000",
                    "storageRebate": "978000",
                    "nonRefundableStorageFee": "9879"
                }
            },
            "balanceChanges": [
                {
                    "owner": { "AddressOwner": "0xabc" },
                    "coinType": "0x2::sui::SUI",
                    "amount": "-501548000"
                }
            ],
            "objectChanges": [
                { "type": "mutated", "objectId": "0x1", "objectType": "0x2::coin::Coin<0x2::sui::SUI>" },
                { "type": "published", "packageId": "0x9" }
            ],
            "events": [
                { "type": "0x2::coin::CoinEvent", "transactionModule": "pay" }
            ]
        });

        let parsed: TransactionBlockResponse = serde_json::from_value(value).unwrap();
        assert_eq!(parsed.effects.status.status, "success");
        assert_eq!(parsed.effects.gas_used.storage_rebate, "978000");
        assert_eq!(parsed.balance_changes.len(), 1);
        assert_eq!(
            parsed.balance_changes[0].owner.address(),
            Some("0xabc")
        );
        assert_eq!(parsed.object_changes[1].package_id.as_deref(), Some("0x9"));
        assert_eq!(parsed.events[0].event_type, "0x2::coin::CoinEvent");
    }

    #[test]
    fn parses_failure_status_with_error() {
        let value = json!({
            "effects": {
                "status": { "status": "failure", "error": "InsufficientGas" },
                "gasUsed": {
                    "computationCost": "0",
                    "storageCost": "0",
                    "storageRebate": "0"
                }
            }
        });
        let parsed: TransactionBlockResponse = serde_json::from_value(value).unwrap();
        assert_eq!(parsed.effects.status.status, "failure");
        assert_eq!(parsed.effects.status.error.as_deref(), Some("InsufficientGas"));
        assert!(parsed.balance_changes.is_empty());
    }
}
