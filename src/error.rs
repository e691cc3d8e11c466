//! Error types for the transfer agent

use thiserror::Error;

use crate::resolver::ResolutionError;
use crate::rpc::RpcError;
use crate::simulator::SimulationError;
use crate::wallet::custody::CustodyError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("recipient resolution failed: {0}")]
    Resolution(#[from] ResolutionError),

    #[error("simulation failed: {0}")]
    Simulation(#[from] SimulationError),

    #[error("key access failed: {0}")]
    Custody(#[from] CustodyError),

    #[error("broadcast failed: {0}")]
    Broadcast(String),

    #[error("RPC error: {0}")]
    Rpc(#[from] RpcError),

    #[error("wallet error: {0}")]
    Wallet(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Process exit code for the CLI.
    ///
    /// Distinct codes let a caller tell "fix your input" (resolution),
    /// "the chain predicts failure" (simulation), "ask the user again"
    /// (custody), and "the node rejected it" (broadcast) apart.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Resolution(_) => 2,
            Error::Simulation(_) => 3,
            Error::Custody(_) => 4,
            Error::Broadcast(_) => 5,
            _ => 1,
        }
    }
}
