//! Configuration for the transfer agent

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Environment variable overriding the fullnode endpoint
pub const SUI_RPC_URL_ENV: &str = "SUI_RPC_URL";

/// Default mainnet fullnode
pub const MAINNET_RPC_URL: &str = "https://fullnode.mainnet.sui.io:443";

/// Coin type funding every transfer in this agent
pub const SUI_COIN_TYPE: &str = "0x2::sui::SUI";

/// Smallest SUI denomination: 1 SUI = 10^9 MIST
pub const MIST_PER_SUI: u64 = 1_000_000_000;

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Fullnode JSON-RPC endpoint
    pub rpc_url: String,
    /// Service name under which keys are filed in platform secure storage
    pub keychain_service: String,
    /// Gas budget attached to built transactions (MIST)
    pub gas_budget: u64,
    /// Path to the public-address registry (JSON, no secrets)
    pub registry_path: PathBuf,
    /// Path to the audit log file (JSONL), None disables auditing
    pub audit_log_path: Option<PathBuf>,
    /// Explorer URL prefix for transaction digests
    pub explorer_tx_base: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rpc_url: std::env::var(SUI_RPC_URL_ENV).unwrap_or_else(|_| MAINNET_RPC_URL.to_string()),
            keychain_service: "sui-transfer-agent".to_string(),
            gas_budget: 5_000_000,
            registry_path: PathBuf::from("wallets.json"),
            audit_log_path: Some(PathBuf::from("audit.jsonl")),
            explorer_tx_base: "https://suiscan.xyz/mainnet/tx/".to_string(),
        }
    }
}

impl Config {
    /// Load from a JSON file, falling back to defaults for a missing path
    pub fn load(path: Option<&std::path::Path>) -> crate::Result<Self> {
        match path {
            Some(p) => {
                let content = std::fs::read_to_string(p)
                    .map_err(|e| crate::Error::Config(format!("{}: {}", p.display(), e)))?;
                serde_json::from_str(&content)
                    .map_err(|e| crate::Error::Config(format!("{}: {}", p.display(), e)))
            }
            None => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_roundtrips_through_json() {
        let config = Config::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.keychain_service, config.keychain_service);
        assert_eq!(parsed.gas_budget, config.gas_budget);
    }

    #[test]
    fn load_rejects_missing_file() {
        let err = Config::load(Some(std::path::Path::new("/nonexistent/agent.json"))).unwrap_err();
        assert!(matches!(err, crate::Error::Config(_)));
    }
}
