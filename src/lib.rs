//! Sui Transfer Agent
//!
//! Prepares, previews, and executes single-asset SUI transfers while
//! keeping the signing key behind per-use platform authorization:
//! - resolves recipients (raw addresses or SuiNS names)
//! - dry-runs every transfer and renders a balance/gas/object diff
//! - gates signing behind a two-phase confirm step
//! - fetches the key from secure storage, signs exactly once, purges
//!
//! # Security Model
//!
//! - Private keys live in the platform keychain; every access triggers a
//!   platform authorization prompt
//! - Key material exists in memory only inside a `KeyCustodian::with_key`
//!   scope and is zeroized when the scope ends, on every exit path
//! - Preview mode never touches the key store
//! - Nothing is signed without a successful dry run of the same bytes

pub mod audit;
pub mod config;
pub mod preview;
pub mod resolver;
pub mod rpc;
pub mod simulator;
pub mod transfer;
pub mod wallet;

mod error;

// Re-export commonly used types
pub use config::Config;
pub use error::{Error, Result};
pub use transfer::{TransferMode, TransferOutcome, TransferPipeline, TransferRequest};
