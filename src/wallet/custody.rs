//! Scoped private key access (fetch-sign-purge)
//!
//! The custodian is the only component allowed to pull a private key out of
//! platform secure storage. Access is scoped: the key is fetched fresh for
//! every call (each fetch is what triggers the platform's authorization
//! prompt), handed to a closure for exactly one use, and dropped - and
//! thereby zeroized - before `with_key` returns, on every exit path.
//!
//! Caching the key, or trusting a prior grant, defeats the security model;
//! `reset_access_control` exists to undo a store-side blanket grant.

use secrecy::SecretString;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Error type for custody failures
#[derive(Debug, thiserror::Error)]
pub enum CustodyError {
    /// User declined the platform prompt; fatal for this attempt
    #[error("authorization denied for wallet '{0}'")]
    AuthorizationDenied(String),

    /// Alias has no stored key; fatal
    #[error("no key registered for wallet '{0}'")]
    KeyNotFound(String),

    /// Platform service unreachable; retryable after operator intervention
    #[error("secure store unavailable: {0}")]
    StoreUnavailable(String),

    /// A `with_key` scope for this alias is already in flight
    #[error("key access already in progress for wallet '{0}'")]
    AccessInProgress(String),

    /// An access reset deleted the stored key and failed to restore it
    #[error("access reset for wallet '{alias}' removed the stored key and could not restore it ({cause}); re-add the key")]
    ResetIncomplete { alias: String, cause: String },
}

/// Platform secure storage operations. `get` is the authorization trigger:
/// implementations must request platform authorization on every call, never
/// from a cache.
pub trait SecretStore: Send + Sync {
    fn get(&self, alias: &str) -> Result<SecretString, CustodyError>;

    fn put(&self, alias: &str, secret: SecretString) -> Result<(), CustodyError>;

    fn exists(&self, alias: &str) -> Result<bool, CustodyError>;

    fn delete(&self, alias: &str) -> Result<(), CustodyError>;

    /// Remediation for a blanket trust grant: re-create the entry so the
    /// platform drops any trusted-application list and the next access
    /// prompts again. A `put` failure after the delete leaves the store
    /// without the key and surfaces as `ResetIncomplete`.
    fn reset_access_control(&self, alias: &str) -> Result<(), CustodyError> {
        let secret = self.get(alias)?;
        self.delete(alias)?;
        self.put(alias, secret)
            .map_err(|e| CustodyError::ResetIncomplete {
                alias: alias.to_string(),
                cause: e.to_string(),
            })
    }
}

/// Secret store over the platform keychain (macOS Keychain, Secret
/// Service, Windows Credential Manager) via the `keyring` crate
pub struct KeyringStore {
    service: String,
}

impl KeyringStore {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self, alias: &str) -> Result<keyring::Entry, CustodyError> {
        keyring::Entry::new(&self.service, alias)
            .map_err(|e| CustodyError::StoreUnavailable(e.to_string()))
    }
}

fn map_keyring_error(alias: &str, err: keyring::Error) -> CustodyError {
    match err {
        keyring::Error::NoEntry => CustodyError::KeyNotFound(alias.to_string()),
        keyring::Error::NoStorageAccess(_) => {
            CustodyError::AuthorizationDenied(alias.to_string())
        }
        other => CustodyError::StoreUnavailable(other.to_string()),
    }
}

impl SecretStore for KeyringStore {
    fn get(&self, alias: &str) -> Result<SecretString, CustodyError> {
        // This call is what raises the platform authorization prompt
        let password = self
            .entry(alias)?
            .get_password()
            .map_err(|e| map_keyring_error(alias, e))?;
        Ok(SecretString::from(password))
    }

    fn put(&self, alias: &str, secret: SecretString) -> Result<(), CustodyError> {
        use secrecy::ExposeSecret;
        self.entry(alias)?
            .set_password(secret.expose_secret())
            .map_err(|e| map_keyring_error(alias, e))
    }

    fn exists(&self, alias: &str) -> Result<bool, CustodyError> {
        match self.entry(alias)?.get_password() {
            Ok(_) => Ok(true),
            Err(keyring::Error::NoEntry) => Ok(false),
            Err(e) => Err(map_keyring_error(alias, e)),
        }
    }

    fn delete(&self, alias: &str) -> Result<(), CustodyError> {
        self.entry(alias)?
            .delete_credential()
            .map_err(|e| map_keyring_error(alias, e))
    }
}

/// Sole authority for handing key material to a signing scope
pub struct KeyCustodian<S: SecretStore> {
    store: S,
    in_flight: Mutex<HashSet<String>>,
    purges: AtomicUsize,
}

impl<S: SecretStore> KeyCustodian<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            in_flight: Mutex::new(HashSet::new()),
            purges: AtomicUsize::new(0),
        }
    }

    /// The backing store, for registration/remediation operations that do
    /// not involve a signing scope
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Number of scoped accesses whose key material has been dropped.
    /// Counted by the key holder's destructor, so inside a scope the
    /// count still excludes that scope's key.
    pub fn purge_count(&self) -> usize {
        self.purges.load(Ordering::SeqCst)
    }

    /// Fetch the key for `alias` and run `scope` with it exactly once.
    ///
    /// Guarantees:
    /// - a fresh store fetch (and therefore a fresh authorization check)
    ///   on every call
    /// - at most one in-flight scope per alias; overlap fails with
    ///   `AccessInProgress` instead of stacking prompts
    /// - the key is dropped (zeroized) before this returns, whether
    ///   `scope` succeeded or failed
    pub fn with_key<T>(
        &self,
        alias: &str,
        scope: impl FnOnce(&SecretString) -> crate::Result<T>,
    ) -> crate::Result<T> {
        let _guard = self.begin_access(alias)?;

        tracing::info!(wallet = alias, "requesting key authorization");
        let key = ScopedKey {
            secret: self.store.get(alias)?,
            purges: &self.purges,
        };
        let outcome = scope(&key.secret);
        drop(key); // zeroized here, on success and failure alike
        outcome
    }

    fn begin_access(&self, alias: &str) -> Result<AccessGuard<'_>, CustodyError> {
        let mut in_flight = self
            .in_flight
            .lock()
            .map_err(|_| CustodyError::StoreUnavailable("custodian lock poisoned".to_string()))?;
        if !in_flight.insert(alias.to_string()) {
            return Err(CustodyError::AccessInProgress(alias.to_string()));
        }
        Ok(AccessGuard {
            in_flight: &self.in_flight,
            alias: alias.to_string(),
        })
    }
}

/// Holds the fetched key for exactly one scope. Its destructor drops the
/// secret (zeroizing it) and records the purge in the same moment, so the
/// purge count moves only when the key material is actually gone.
struct ScopedKey<'a> {
    secret: SecretString,
    purges: &'a AtomicUsize,
}

impl Drop for ScopedKey<'_> {
    fn drop(&mut self) {
        self.purges.fetch_add(1, Ordering::SeqCst);
        tracing::debug!("key material purged");
    }
}

/// Releases the per-alias access slot when the scope ends, however it ends
struct AccessGuard<'a> {
    in_flight: &'a Mutex<HashSet<String>>,
    alias: String,
}

impl Drop for AccessGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut in_flight) = self.in_flight.lock() {
            in_flight.remove(&self.alias);
        }
    }
}
