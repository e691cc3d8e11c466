//! Key custody, signing, and the public-address registry
//!
//! Private keys exist in process memory only inside a
//! [`custody::KeyCustodian::with_key`] scope and inside [`SuiKeyPair`],
//! neither of which serializes, logs, or returns raw key bytes.

pub mod custody;
pub mod registry;
mod signer;

pub use custody::{CustodyError, KeyCustodian, KeyringStore, SecretStore};
pub use registry::{WalletRecord, WalletRegistry};
pub use signer::{derive_address, SignerError, SuiKeyPair};
