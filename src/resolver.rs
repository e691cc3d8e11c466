//! Recipient resolution
//!
//! Maps a recipient token, either a raw `0x` address or a SuiNS name, to a
//! canonical on-chain address. Raw addresses resolve to themselves with no
//! network call; names go through the fullnode's name service. Results are
//! never cached across calls: a stale binding is a real risk for a
//! financial operation.

use crate::rpc::{RpcError, SuiApi};

/// Hex digits in a canonical Sui address (32 bytes)
pub const ADDRESS_HEX_LEN: usize = 64;

/// Suffix appended to names given without one
pub const DEFAULT_NS_SUFFIX: &str = "sui";

/// Raw recipient input, captured once and never mutated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipientToken(String);

impl RecipientToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RecipientToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Canonical address plus the domain it came from, if any
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAddress {
    pub address: String,
    pub domain: Option<String>,
}

/// Error type for resolution failures
#[derive(Debug, thiserror::Error)]
pub enum ResolutionError {
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid domain name: {0}")]
    InvalidDomainFormat(String),

    #[error("domain not resolved: {0}")]
    DomainNotResolved(String),

    #[error("name service query failed: {0}")]
    Lookup(#[from] RpcError),
}

/// Whether a token should be treated as a raw address rather than a name
pub fn looks_like_address(token: &str) -> bool {
    token.starts_with("0x")
}

/// Validate the raw-address shape: `0x` followed by exactly 64 hex digits
pub fn validate_address(token: &str) -> Result<(), ResolutionError> {
    let hex_part = token
        .strip_prefix("0x")
        .ok_or_else(|| ResolutionError::InvalidAddress(token.to_string()))?;

    if hex_part.len() != ADDRESS_HEX_LEN || !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ResolutionError::InvalidAddress(token.to_string()));
    }
    Ok(())
}

/// Normalize a name: lowercase, and append the default suffix when the
/// token carries no separator. Idempotent.
pub fn normalize_domain(token: &str) -> String {
    let lowered = token.to_ascii_lowercase();
    if lowered.contains('.') {
        lowered
    } else {
        format!("{}.{}", lowered, DEFAULT_NS_SUFFIX)
    }
}

/// Validate SuiNS grammar: dot-separated labels of lowercase alphanumerics
/// and interior hyphens, each 1..=63 characters
pub fn validate_domain(name: &str) -> Result<(), ResolutionError> {
    let labels: Vec<&str> = name.split('.').collect();
    if labels.len() < 2 {
        return Err(ResolutionError::InvalidDomainFormat(name.to_string()));
    }
    for label in labels {
        let valid_len = !label.is_empty() && label.len() <= 63;
        let valid_chars = label
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
        let valid_edges = !label.starts_with('-') && !label.ends_with('-');
        if !(valid_len && valid_chars && valid_edges) {
            return Err(ResolutionError::InvalidDomainFormat(name.to_string()));
        }
    }
    Ok(())
}

/// Resolves recipient tokens against the name service
pub struct NameResolver<'a> {
    api: &'a dyn SuiApi,
}

impl<'a> NameResolver<'a> {
    pub fn new(api: &'a dyn SuiApi) -> Self {
        Self { api }
    }

    /// Resolve a token to a canonical address.
    ///
    /// Raw addresses are the identity case and never hit the network;
    /// malformed ones fail before any network call is attempted.
    pub async fn resolve(&self, token: &RecipientToken) -> Result<ResolvedAddress, ResolutionError> {
        if looks_like_address(token.as_str()) {
            validate_address(token.as_str())?;
            return Ok(ResolvedAddress {
                address: token.as_str().to_string(),
                domain: None,
            });
        }

        let name = normalize_domain(token.as_str());
        validate_domain(&name)?;

        tracing::debug!(name = %name, "resolving name service address");
        match self.api.resolve_name_service_address(&name).await? {
            Some(address) => Ok(ResolvedAddress {
                address,
                domain: Some(name),
            }),
            None => Err(ResolutionError::DomainNotResolved(name)),
        }
    }

    /// Reverse-resolve an address to its primary name, for display only.
    /// Lookup failures are non-fatal and collapse to None.
    pub async fn reverse(&self, address: &str) -> Option<String> {
        match self.api.resolve_name_service_names(address).await {
            Ok(names) => names.into_iter().next(),
            Err(e) => {
                tracing::debug!(error = %e, "reverse lookup failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::{CoinInfo, TransactionBlockResponse};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Mock that counts network calls and resolves one fixed name
    struct FixedApi {
        bound: Option<(&'static str, &'static str)>,
        calls: AtomicUsize,
    }

    impl FixedApi {
        fn new(bound: Option<(&'static str, &'static str)>) -> Self {
            Self {
                bound,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl SuiApi for FixedApi {
        async fn resolve_name_service_address(
            &self,
            name: &str,
        ) -> Result<Option<String>, RpcError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self
                .bound
                .filter(|(n, _)| *n == name)
                .map(|(_, addr)| addr.to_string()))
        }

        async fn resolve_name_service_names(&self, _: &str) -> Result<Vec<String>, RpcError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec!["friend.sui".to_string()])
        }

        async fn get_sui_coins(&self, _: &str) -> Result<Vec<CoinInfo>, RpcError> {
            unreachable!("resolver never queries coins")
        }

        async fn build_pay_sui(
            &self,
            _: &str,
            _: &[String],
            _: &[String],
            _: &[u64],
            _: u64,
        ) -> Result<String, RpcError> {
            unreachable!("resolver never builds transactions")
        }

        async fn dry_run_transaction_block(
            &self,
            _: &str,
        ) -> Result<TransactionBlockResponse, RpcError> {
            unreachable!("resolver never simulates")
        }

        async fn execute_transaction_block(
            &self,
            _: &str,
            _: &[String],
        ) -> Result<TransactionBlockResponse, RpcError> {
            unreachable!("resolver never executes")
        }
    }

    fn valid_address() -> String {
        format!("0x{}", "a".repeat(ADDRESS_HEX_LEN))
    }

    #[tokio::test]
    async fn raw_address_is_identity_without_network() {
        let api = FixedApi::new(None);
        let resolver = NameResolver::new(&api);

        let token = RecipientToken::new(valid_address());
        let resolved = resolver.resolve(&token).await.unwrap();

        assert_eq!(resolved.address, valid_address());
        assert!(resolved.domain.is_none());
        assert_eq!(api.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn malformed_address_fails_without_network() {
        let api = FixedApi::new(None);
        let resolver = NameResolver::new(&api);

        // 40 hex digits: an EVM-length address, not a Sui one
        let token = RecipientToken::new(format!("0x{}", "1".repeat(40)));
        let err = resolver.resolve(&token).await.unwrap_err();

        assert!(matches!(err, ResolutionError::InvalidAddress(_)));
        assert_eq!(api.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn suffixless_name_is_normalized_and_resolved() {
        let api = FixedApi::new(Some(("friend.sui", "0xabc")));
        let resolver = NameResolver::new(&api);

        let resolved = resolver
            .resolve(&RecipientToken::new("friend"))
            .await
            .unwrap();

        assert_eq!(resolved.address, "0xabc");
        assert_eq!(resolved.domain.as_deref(), Some("friend.sui"));
    }

    #[tokio::test]
    async fn unregistered_name_fails_with_domain_not_resolved() {
        let api = FixedApi::new(None);
        let resolver = NameResolver::new(&api);

        let err = resolver
            .resolve(&RecipientToken::new("nobody.sui"))
            .await
            .unwrap_err();

        assert!(matches!(err, ResolutionError::DomainNotResolved(_)));
    }

    #[test]
    fn normalization_is_idempotent() {
        let once = normalize_domain("friend");
        let twice = normalize_domain(&once);
        assert_eq!(once, "friend.sui");
        assert_eq!(once, twice);
    }

    #[test]
    fn domain_grammar_rejects_bad_labels() {
        assert!(validate_domain("friend.sui").is_ok());
        assert!(validate_domain("my-name.sui").is_ok());
        assert!(validate_domain("-bad.sui").is_err());
        assert!(validate_domain("bad-.sui").is_err());
        assert!(validate_domain("UPPER.sui").is_err());
        assert!(validate_domain("sp ace.sui").is_err());
        assert!(validate_domain("noseparator").is_err());
        assert!(validate_domain("..sui").is_err());
    }

    #[test]
    fn address_shape_requires_exactly_64_hex() {
        assert!(validate_address(&format!("0x{}", "f".repeat(64))).is_ok());
        assert!(validate_address(&format!("0x{}", "f".repeat(63))).is_err());
        assert!(validate_address(&format!("0x{}", "f".repeat(65))).is_err());
        assert!(validate_address(&format!("0x{}g", "f".repeat(63))).is_err());
        assert!(validate_address("abc").is_err());
    }
}
