//! Audit log of transfer attempts
//!
//! Append-only JSONL, one entry per attempt. Entries carry public
//! information only: aliases, addresses, amounts, terminal states. Never
//! key material. A write failure is a warning, never a reason to fail the
//! transfer itself.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

#[derive(Debug, Serialize)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub wallet: String,
    pub recipient: String,
    pub resolved_address: Option<String>,
    pub amount_mist: u64,
    pub mode: &'static str,
    pub outcome: String,
    pub digest: Option<String>,
    pub error: Option<String>,
}

impl AuditEntry {
    pub fn new(wallet: &str, recipient: &str, amount_mist: u64, mode: &'static str) -> Self {
        Self {
            timestamp: Utc::now(),
            wallet: wallet.to_string(),
            recipient: recipient.to_string(),
            resolved_address: None,
            amount_mist,
            mode,
            outcome: String::new(),
            digest: None,
            error: None,
        }
    }
}

pub struct AuditLog {
    path: PathBuf,
}

impl AuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Append one entry; failures are logged and swallowed
    pub fn record(&self, entry: &AuditEntry) {
        if let Err(e) = self.append(entry) {
            tracing::warn!(error = %e, "failed to write audit log entry");
        }
    }

    fn append(&self, entry: &AuditEntry) -> std::io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let json = serde_json::to_string(entry)?;
        writeln!(file, "{}", json)?;
        Ok(())
    }
}
