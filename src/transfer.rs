//! Transfer orchestration
//!
//! The state machine tying resolution, building, simulation, confirmation,
//! signing, and broadcast together:
//!
//! `Idle -> Resolving -> Built -> Simulated -> (PreviewOnly) |
//!  AwaitingConfirmation -> Signing -> Broadcasting -> (Success | Failed)`
//!
//! Two invariants shape the code:
//! - nothing is ever signed without a preceding successful simulation of
//!   the same built bytes (`SimulatedTransaction` is only constructible
//!   from a success, and the signing path takes that type)
//! - preview mode and the pre-confirmation leg never touch the key
//!   custodian; key material enters the picture only inside `Signing`
//!
//! A confirmed second invocation rebuilds from scratch - fresh coins,
//! fresh bytes, fresh simulation - rather than signing bytes whose gas and
//! balance snapshot may have gone stale since the preview.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use secrecy::ExposeSecret;

use crate::config::Config;
use crate::preview::{format_execution, format_preview, PreviewContext};
use crate::resolver::{NameResolver, RecipientToken, ResolvedAddress};
use crate::rpc::{SuiApi, TransactionBlockResponse};
use crate::simulator::{
    BalanceDelta, DryRunSimulator, GasSummary, SimulationError, SimulationResult, SimulationStatus,
};
use crate::wallet::{KeyCustodian, SecretStore, SuiKeyPair, WalletRegistry};
use crate::{Error, Result};

/// Pipeline states; used for tracing and audit, while the hard ordering
/// guarantees live in the types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferState {
    Idle,
    Resolving,
    Built,
    Simulated,
    PreviewOnly,
    AwaitingConfirmation,
    Signing,
    Broadcasting,
    Success,
    Failed,
}

impl std::fmt::Display for TransferState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TransferState::Idle => "idle",
            TransferState::Resolving => "resolving",
            TransferState::Built => "built",
            TransferState::Simulated => "simulated",
            TransferState::PreviewOnly => "preview_only",
            TransferState::AwaitingConfirmation => "awaiting_confirmation",
            TransferState::Signing => "signing",
            TransferState::Broadcasting => "broadcasting",
            TransferState::Success => "success",
            TransferState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// How far a transfer attempt is allowed to go
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferMode {
    /// Simulate and report; never requires authorization, safe to repeat
    Preview,
    /// Simulate, then sign and broadcast once `confirmed` is true
    Execute { confirmed: bool },
}

/// One transfer attempt's input; attempt-local, never persisted
#[derive(Debug, Clone)]
pub struct TransferRequest {
    pub wallet: String,
    pub recipient: RecipientToken,
    pub amount_mist: u64,
}

/// A built transaction that passed its dry run. The private constructor
/// plus the success check make "signed without a successful simulation"
/// unrepresentable.
pub struct SimulatedTransaction {
    tx_bytes: String,
    sender: String,
    result: SimulationResult,
}

impl SimulatedTransaction {
    fn try_new(
        tx_bytes: String,
        sender: String,
        result: SimulationResult,
    ) -> std::result::Result<Self, SimulationError> {
        match result.failure_message() {
            None => Ok(Self {
                tx_bytes,
                sender,
                result,
            }),
            Some(error) => Err(SimulationError::PredictedFailure(error.to_string())),
        }
    }

    pub fn tx_bytes(&self) -> &str {
        &self.tx_bytes
    }

    pub fn result(&self) -> &SimulationResult {
        &self.result
    }
}

/// Final on-chain result of a broadcast transaction
#[derive(Debug, Clone)]
pub struct ExecutionSummary {
    pub digest: String,
    pub status: SimulationStatus,
    pub gas: GasSummary,
    pub balance_changes: Vec<BalanceDelta>,
}

impl ExecutionSummary {
    pub fn is_success(&self) -> bool {
        self.status == SimulationStatus::Success
    }

    /// On-chain failure message, if the node executed the transaction but
    /// it aborted
    pub fn status_error(&self) -> Option<&str> {
        match &self.status {
            SimulationStatus::Success => None,
            SimulationStatus::Failure { error } => Some(error),
        }
    }

    fn from_response(response: TransactionBlockResponse) -> Result<Self> {
        let digest = response
            .digest
            .clone()
            .ok_or_else(|| Error::Broadcast("node response missing digest".to_string()))?;
        let parsed = SimulationResult::from_response(&response)
            .map_err(|e| Error::Broadcast(e.to_string()))?;
        Ok(Self {
            digest,
            status: parsed.status,
            gas: parsed.gas,
            balance_changes: parsed.balance_changes,
        })
    }
}

/// Terminal (or handed-back) outcome of one pipeline run
#[derive(Debug)]
pub enum TransferOutcome {
    /// Preview-only terminal state; no key access occurred
    Preview {
        resolved: ResolvedAddress,
        simulation: SimulationResult,
        report: String,
    },
    /// Simulation succeeded but the caller has not confirmed; no key
    /// access occurred. A confirmed re-invocation rebuilds from scratch.
    AwaitingConfirmation {
        resolved: ResolvedAddress,
        report: String,
    },
    /// Signed, broadcast, and executed by the node
    Executed {
        resolved: ResolvedAddress,
        summary: ExecutionSummary,
        report: String,
    },
}

impl TransferOutcome {
    pub fn state(&self) -> TransferState {
        match self {
            TransferOutcome::Preview { .. } => TransferState::PreviewOnly,
            TransferOutcome::AwaitingConfirmation { .. } => TransferState::AwaitingConfirmation,
            TransferOutcome::Executed { summary, .. } => {
                if summary.is_success() {
                    TransferState::Success
                } else {
                    TransferState::Failed
                }
            }
        }
    }

    pub fn resolved(&self) -> &ResolvedAddress {
        match self {
            TransferOutcome::Preview { resolved, .. }
            | TransferOutcome::AwaitingConfirmation { resolved, .. }
            | TransferOutcome::Executed { resolved, .. } => resolved,
        }
    }
}

/// The transfer pipeline. One sequential run per attempt; no internal
/// parallelism, no state shared across attempts.
pub struct TransferPipeline<'a, S: SecretStore> {
    api: &'a dyn SuiApi,
    custodian: &'a KeyCustodian<S>,
    registry: &'a WalletRegistry,
    config: &'a Config,
}

impl<'a, S: SecretStore> TransferPipeline<'a, S> {
    pub fn new(
        api: &'a dyn SuiApi,
        custodian: &'a KeyCustodian<S>,
        registry: &'a WalletRegistry,
        config: &'a Config,
    ) -> Self {
        Self {
            api,
            custodian,
            registry,
            config,
        }
    }

    /// Run one transfer attempt to its terminal state for `mode`
    pub async fn run(&self, request: &TransferRequest, mode: TransferMode) -> Result<TransferOutcome> {
        let mut state = TransferState::Idle;
        state = self.advance(state, TransferState::Resolving);

        let resolver = NameResolver::new(self.api);
        let resolved = resolver.resolve(&request.recipient).await?;

        // Sender comes from the registry: building and simulating must not
        // touch secure storage
        let record = self.registry.find(&request.wallet).ok_or_else(|| {
            Error::Wallet(format!(
                "no registered address for wallet '{}'; run `sui-agent wallet add {}` first",
                request.wallet, request.wallet
            ))
        })?;
        let sender = record.address.clone();

        let coins = self.api.get_sui_coins(&sender).await?;
        let coin = coins.first().ok_or_else(|| {
            Error::Wallet(format!("wallet '{}' has no SUI coins to spend", request.wallet))
        })?;
        tracing::debug!(coin = %coin.coin_object_id, balance = %coin.balance, "funding coin selected");

        let tx_bytes = self
            .api
            .build_pay_sui(
                &sender,
                &[coin.coin_object_id.clone()],
                &[resolved.address.clone()],
                &[request.amount_mist],
                self.config.gas_budget,
            )
            .await?;
        state = self.advance(state, TransferState::Built);

        // Hard invariant: the dry run happens here, before any mode split,
        // so no path below can sign unsimulated bytes
        let simulation = DryRunSimulator::new(self.api).simulate(&tx_bytes).await?;
        state = self.advance(state, TransferState::Simulated);

        let ctx = PreviewContext {
            sender: &sender,
            recipient: &resolved.address,
            recipient_label: resolved.domain.as_deref(),
            amount_mist: request.amount_mist,
        };
        let report = format_preview(&simulation, &ctx);

        match mode {
            TransferMode::Preview => {
                self.advance(state, TransferState::PreviewOnly);
                Ok(TransferOutcome::Preview {
                    resolved,
                    simulation,
                    report,
                })
            }
            TransferMode::Execute { confirmed } => {
                // Never execute a transaction the chain predicts will fail
                let simulated = SimulatedTransaction::try_new(tx_bytes, sender, simulation)?;

                if !confirmed {
                    self.advance(state, TransferState::AwaitingConfirmation);
                    return Ok(TransferOutcome::AwaitingConfirmation { resolved, report });
                }

                let summary = self.sign_and_broadcast(state, &request.wallet, simulated).await?;
                let report = format_execution(&summary, &self.config.explorer_tx_base);
                Ok(TransferOutcome::Executed {
                    resolved,
                    summary,
                    report,
                })
            }
        }
    }

    /// Sign exactly once inside a custodian scope, then broadcast.
    ///
    /// The key is fetched, used, and purged inside `with_key`; broadcast
    /// happens after the scope has closed, with only the signature in hand.
    async fn sign_and_broadcast(
        &self,
        state: TransferState,
        alias: &str,
        simulated: SimulatedTransaction,
    ) -> Result<ExecutionSummary> {
        let state = self.advance(state, TransferState::Signing);

        let tx_raw = BASE64.decode(simulated.tx_bytes()).map_err(|e| {
            Error::InvalidArgument(format!("transaction bytes are not valid base64: {}", e))
        })?;

        let sender = simulated.sender.clone();
        // Keyring access blocks on the platform prompt; keep it off the
        // async executor
        let signature = run_blocking(|| {
            self.custodian.with_key(alias, |key| {
                let keypair = SuiKeyPair::from_encoded(key.expose_secret())
                    .map_err(|e| Error::Wallet(e.to_string()))?;
                if keypair.address() != sender {
                    return Err(Error::Wallet(format!(
                        "key for wallet '{}' does not match the built transaction's sender",
                        alias
                    )));
                }
                Ok(keypair.sign_transaction(&tx_raw))
            })
        })?;

        let state = self.advance(state, TransferState::Broadcasting);

        // Never retried: resubmitting risks duplicate execution. A retry
        // must start over from a fresh build.
        let response = self
            .api
            .execute_transaction_block(simulated.tx_bytes(), &[signature])
            .await
            .map_err(|e| Error::Broadcast(e.to_string()))?;

        let summary = ExecutionSummary::from_response(response)?;
        self.advance(
            state,
            if summary.is_success() {
                TransferState::Success
            } else {
                TransferState::Failed
            },
        );
        Ok(summary)
    }

    fn advance(&self, from: TransferState, to: TransferState) -> TransferState {
        tracing::debug!(%from, %to, "transfer state");
        to
    }
}

/// Run a blocking section from async context. On a multi-thread runtime
/// the worker is parked via `block_in_place`; on a current-thread runtime
/// the section runs inline.
fn run_blocking<T>(f: impl FnOnce() -> T) -> T {
    use tokio::runtime::{Handle, RuntimeFlavor};
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(f)
        }
        _ => f(),
    }
}
