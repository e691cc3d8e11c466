//! Dry-run simulation of unsigned transactions
//!
//! Submits unsigned transaction bytes to the node's simulation endpoint and
//! turns the wire response into structured effects: status, balance deltas,
//! object deltas, events, and a gas breakdown.
//!
//! SECURITY NOTE:
//! - This module is read-only. It never signs, never submits for
//!   execution, and requires no key material.

use crate::rpc::{RpcError, SuiApi, TransactionBlockResponse};

/// Error type for simulation failures
#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    /// Transport-level failure; retryable
    #[error("simulation endpoint unreachable: {0}")]
    Unreachable(String),

    /// The node rejected the transaction input; not retryable
    #[error("invalid transaction: {0}")]
    InvalidTransaction(String),

    /// Simulation ran and the chain predicts the transaction will fail.
    /// Carries the chain-reported error verbatim.
    #[error("{0}")]
    PredictedFailure(String),

    #[error("malformed simulation response: {0}")]
    Malformed(String),
}

impl From<RpcError> for SimulationError {
    fn from(err: RpcError) -> Self {
        match err {
            RpcError::Transport(e) => SimulationError::Unreachable(e),
            RpcError::Node { message, .. } => SimulationError::InvalidTransaction(message),
            other => SimulationError::Malformed(other.to_string()),
        }
    }
}

/// Simulated execution outcome
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimulationStatus {
    Success,
    /// Chain-reported error message, propagated verbatim
    Failure { error: String },
}

/// One balance delta, amount in MIST (signed)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceDelta {
    pub owner: String,
    pub coin_type: String,
    pub amount: i128,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectChangeKind {
    Created,
    Mutated,
    Deleted,
    Wrapped,
    Published,
    Other(String),
}

impl ObjectChangeKind {
    fn parse(kind: &str) -> Self {
        match kind {
            "created" => ObjectChangeKind::Created,
            "mutated" => ObjectChangeKind::Mutated,
            "deleted" => ObjectChangeKind::Deleted,
            "wrapped" => ObjectChangeKind::Wrapped,
            "published" => ObjectChangeKind::Published,
            other => ObjectChangeKind::Other(other.to_string()),
        }
    }
}

impl std::fmt::Display for ObjectChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ObjectChangeKind::Created => f.write_str("created"),
            ObjectChangeKind::Mutated => f.write_str("mutated"),
            ObjectChangeKind::Deleted => f.write_str("deleted"),
            ObjectChangeKind::Wrapped => f.write_str("wrapped"),
            ObjectChangeKind::Published => f.write_str("published"),
            ObjectChangeKind::Other(kind) => f.write_str(kind),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectDelta {
    pub kind: ObjectChangeKind,
    pub object_id: String,
    pub object_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRecord {
    pub event_type: String,
    pub module: String,
}

/// Gas breakdown in MIST; integer units end to end, display conversion
/// happens only at format time
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GasSummary {
    pub computation_cost: u64,
    pub storage_cost: u64,
    pub storage_rebate: u64,
    pub non_refundable_storage_fee: u64,
}

impl GasSummary {
    /// Total fee: computation + storage − rebate + non-refundable fee.
    /// i128 so a rebate larger than the charges cannot wrap.
    pub fn total(&self) -> i128 {
        i128::from(self.computation_cost) + i128::from(self.storage_cost)
            - i128::from(self.storage_rebate)
            + i128::from(self.non_refundable_storage_fee)
    }
}

/// Structured result of one dry run; ordering of the change lists is
/// exactly the node's ordering and is never re-sorted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationResult {
    pub status: SimulationStatus,
    pub balance_changes: Vec<BalanceDelta>,
    pub object_changes: Vec<ObjectDelta>,
    pub events: Vec<EventRecord>,
    pub gas: GasSummary,
}

impl SimulationResult {
    pub fn is_success(&self) -> bool {
        self.status == SimulationStatus::Success
    }

    /// Chain-reported error, when the simulation predicts failure
    pub fn failure_message(&self) -> Option<&str> {
        match &self.status {
            SimulationStatus::Success => None,
            SimulationStatus::Failure { error } => Some(error),
        }
    }

    pub fn from_response(
        response: &TransactionBlockResponse,
    ) -> Result<Self, SimulationError> {
        let effects = &response.effects;
        let status = match effects.status.status.as_str() {
            "success" => SimulationStatus::Success,
            _ => SimulationStatus::Failure {
                error: effects
                    .status
                    .error
                    .clone()
                    .unwrap_or_else(|| effects.status.status.clone()),
            },
        };

        let gas = GasSummary {
            computation_cost: parse_mist(&effects.gas_used.computation_cost)?,
            storage_cost: parse_mist(&effects.gas_used.storage_cost)?,
            storage_rebate: parse_mist(&effects.gas_used.storage_rebate)?,
            non_refundable_storage_fee: effects
                .gas_used
                .non_refundable_storage_fee
                .as_deref()
                .map(parse_mist)
                .transpose()?
                .unwrap_or(0),
        };

        let balance_changes = response
            .balance_changes
            .iter()
            .map(|bc| {
                Ok(BalanceDelta {
                    owner: bc.owner.address().unwrap_or("?").to_string(),
                    coin_type: bc.coin_type.clone(),
                    amount: bc.amount.parse::<i128>().map_err(|_| {
                        SimulationError::Malformed(format!("bad amount: {}", bc.amount))
                    })?,
                })
            })
            .collect::<Result<Vec<_>, SimulationError>>()?;

        let object_changes = response
            .object_changes
            .iter()
            .map(|oc| ObjectDelta {
                kind: ObjectChangeKind::parse(&oc.kind),
                object_id: oc
                    .object_id
                    .clone()
                    .or_else(|| oc.package_id.clone())
                    .unwrap_or_default(),
                object_type: oc.object_type.clone().unwrap_or_default(),
            })
            .collect();

        let events = response
            .events
            .iter()
            .map(|ev| EventRecord {
                event_type: ev.event_type.clone(),
                module: ev.transaction_module.clone().unwrap_or_default(),
            })
            .collect();

        Ok(Self {
            status,
            balance_changes,
            object_changes,
            events,
            gas,
        })
    }
}

fn parse_mist(value: &str) -> Result<u64, SimulationError> {
    value
        .parse::<u64>()
        .map_err(|_| SimulationError::Malformed(format!("bad MIST value: {}", value)))
}

/// Dry-run simulator over the RPC seam
pub struct DryRunSimulator<'a> {
    api: &'a dyn SuiApi,
}

impl<'a> DryRunSimulator<'a> {
    pub fn new(api: &'a dyn SuiApi) -> Self {
        Self { api }
    }

    /// Simulate base64-encoded unsigned transaction bytes. Never mutates
    /// chain state. A non-success execution status is a valid result, not
    /// an error; the chain's message rides along verbatim.
    pub async fn simulate(&self, tx_bytes: &str) -> Result<SimulationResult, SimulationError> {
        let response = self.api.dry_run_transaction_block(tx_bytes).await?;
        SimulationResult::from_response(&response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(value: serde_json::Value) -> TransactionBlockResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn gas_total_is_exact_integer_arithmetic() {
        let gas = GasSummary {
            computation_cost: 550_000,
            storage_cost: 1_976_000,
            storage_rebate: 978_000,
            non_refundable_storage_fee: 0,
        };
        assert_eq!(gas.total(), 1_548_000);

        // Rebate can exceed the charges without wrapping
        let negative = GasSummary {
            computation_cost: 1,
            storage_cost: 2,
            storage_rebate: 10,
            non_refundable_storage_fee: 3,
        };
        assert_eq!(negative.total(), -4);

        // Large values stay exact (no float drift)
        let large = GasSummary {
            computation_cost: u64::MAX,
            storage_cost: u64::MAX,
            storage_rebate: 1,
            non_refundable_storage_fee: 1,
        };
        assert_eq!(
            large.total(),
            i128::from(u64::MAX) * 2 - 1 + 1
        );
    }

    #[test]
    fn success_response_maps_to_structured_result() {
        let resp = response(json!({
            "effects": {
                "status": { "status": "success" },
                "gasUsed": {
                    "computationCost": "550000",
                    "storageCost": "1976000",
                    "storageRebate": "978000"
                }
            },
            "balanceChanges": [
                { "owner": { "AddressOwner": "0xsender" }, "coinType": "0x2::sui::SUI", "amount": "-501548000" },
                { "owner": { "AddressOwner": "0xrecipient" }, "coinType": "0x2::sui::SUI", "amount": "500000000" }
            ],
            "objectChanges": [
                { "type": "mutated", "objectId": "0xc0", "objectType": "0x2::coin::Coin<0x2::sui::SUI>" }
            ],
            "events": []
        }));

        let result = SimulationResult::from_response(&resp).unwrap();
        assert!(result.is_success());
        assert_eq!(result.gas.total(), 1_548_000);
        assert_eq!(result.balance_changes[0].amount, -501_548_000);
        assert_eq!(result.balance_changes[1].amount, 500_000_000);
        assert_eq!(result.object_changes[0].kind, ObjectChangeKind::Mutated);
        // Missing non-refundable fee defaults to zero
        assert_eq!(result.gas.non_refundable_storage_fee, 0);
    }

    #[test]
    fn failure_propagates_chain_error_verbatim() {
        let resp = response(json!({
            "effects": {
                "status": { "status": "failure", "error": "InsufficientGas" },
                "gasUsed": {
                    "computationCost": "0",
                    "storageCost": "0",
                    "storageRebate": "0"
                }
            }
        }));

        let result = SimulationResult::from_response(&resp).unwrap();
        assert!(!result.is_success());
        assert_eq!(result.failure_message(), Some("InsufficientGas"));
    }

    #[test]
    fn transport_errors_map_to_unreachable() {
        let err: SimulationError = RpcError::Transport("connection refused".into()).into();
        assert!(matches!(err, SimulationError::Unreachable(_)));

        let err: SimulationError = RpcError::Node {
            code: -32002,
            message: "Invalid transaction bytes".into(),
        }
        .into();
        assert!(matches!(err, SimulationError::InvalidTransaction(_)));
    }

    #[test]
    fn published_change_uses_package_id() {
        let resp = response(json!({
            "effects": {
                "status": { "status": "success" },
                "gasUsed": {
                    "computationCost": "1",
                    "storageCost": "1",
                    "storageRebate": "0",
                    "nonRefundableStorageFee": "1"
                }
            },
            "objectChanges": [
                { "type": "published", "packageId": "0xdeadbeef" }
            ]
        }));

        let result = SimulationResult::from_response(&resp).unwrap();
        assert_eq!(result.object_changes[0].kind, ObjectChangeKind::Published);
        assert_eq!(result.object_changes[0].object_id, "0xdeadbeef");
        assert_eq!(result.gas.non_refundable_storage_fee, 1);
    }
}
