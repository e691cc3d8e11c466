//! Local registry of wallet aliases and public addresses
//!
//! A plain JSON file holding alias -> {chain, address}. No secrets live
//! here; the registry exists so previews and transaction building can look
//! up a sender address without ever touching secure storage.

use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WalletRecord {
    pub alias: String,
    #[serde(default = "default_chain")]
    pub chain: String,
    pub address: String,
}

fn default_chain() -> String {
    "sui".to_string()
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct WalletRegistry {
    wallets: Vec<WalletRecord>,
}

impl WalletRegistry {
    /// Load from a JSON file; a missing file is an empty registry
    pub fn load(path: &Path) -> crate::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, path: &Path) -> crate::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn find(&self, alias: &str) -> Option<&WalletRecord> {
        self.wallets.iter().find(|w| w.alias == alias)
    }

    /// Insert or replace the record for its alias
    pub fn upsert(&mut self, record: WalletRecord) {
        match self.wallets.iter_mut().find(|w| w.alias == record.alias) {
            Some(existing) => *existing = record,
            None => self.wallets.push(record),
        }
    }

    /// Returns true when a record was removed
    pub fn remove(&mut self, alias: &str) -> bool {
        let before = self.wallets.len();
        self.wallets.retain(|w| w.alias != alias);
        self.wallets.len() != before
    }

    pub fn iter(&self) -> impl Iterator<Item = &WalletRecord> {
        self.wallets.iter()
    }

    pub fn len(&self) -> usize {
        self.wallets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wallets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(alias: &str, address: &str) -> WalletRecord {
        WalletRecord {
            alias: alias.to_string(),
            chain: "sui".to_string(),
            address: address.to_string(),
        }
    }

    #[test]
    fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let registry = WalletRegistry::load(&dir.path().join("none.json")).unwrap();
        assert!(registry.is_empty());
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wallets.json");

        let mut registry = WalletRegistry::default();
        registry.upsert(record("sui1", "0xabc"));
        registry.upsert(record("sui2", "0xdef"));
        registry.save(&path).unwrap();

        let loaded = WalletRegistry::load(&path).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.find("sui1").unwrap().address, "0xabc");
    }

    #[test]
    fn upsert_replaces_by_alias() {
        let mut registry = WalletRegistry::default();
        registry.upsert(record("sui1", "0xold"));
        registry.upsert(record("sui1", "0xnew"));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.find("sui1").unwrap().address, "0xnew");
    }

    #[test]
    fn remove_reports_whether_anything_changed() {
        let mut registry = WalletRegistry::default();
        registry.upsert(record("sui1", "0xabc"));
        assert!(registry.remove("sui1"));
        assert!(!registry.remove("sui1"));
        assert!(registry.find("sui1").is_none());
    }

    #[test]
    fn chain_defaults_when_absent() {
        let parsed: WalletRegistry = serde_json::from_str(
            r#"{"wallets": [{"alias": "sui1", "address": "0xabc"}]}"#,
        )
        .unwrap();
        assert_eq!(parsed.find("sui1").unwrap().chain, "sui");
    }
}
