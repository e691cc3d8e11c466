//! Sui ed25519 keypair: decoding, address derivation, intent signing
//!
//! SECURITY: this is the only place raw key bytes are handled.
//! - The seed lives in a `Zeroizing` buffer and the dalek signing key
//!   zeroizes itself on drop
//! - `SuiKeyPair` has no `Serialize` impl and its `Debug` redacts
//! - Keys are never logged

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use ed25519_dalek::{Signer as _, SigningKey};
use zeroize::{Zeroize, Zeroizing};

type Blake2b256 = Blake2b<U32>;

/// Signature scheme flag for ed25519, the only scheme this agent supports
pub const ED25519_FLAG: u8 = 0x00;

/// Bech32 human-readable part of Sui private key exports
pub const PRIVKEY_HRP: &str = "suiprivkey";

/// Intent prefix for user transaction data (scope, version, app)
const TRANSACTION_INTENT: [u8; 3] = [0, 0, 0];

/// Error type for key decoding failures
#[derive(Debug, thiserror::Error)]
pub enum SignerError {
    #[error("invalid private key encoding: {0}")]
    InvalidKeyEncoding(String),

    #[error("unsupported signature scheme flag: {0:#04x}")]
    UnsupportedScheme(u8),
}

/// An ed25519 keypair decoded from secure storage for one signing scope
pub struct SuiKeyPair {
    signing_key: SigningKey,
}

impl SuiKeyPair {
    /// Decode a stored secret: either a `suiprivkey1...` bech32 export
    /// (flag byte + 32-byte seed) or a raw 64-hex-digit ed25519 seed.
    pub fn from_encoded(secret: &str) -> Result<Self, SignerError> {
        let secret = secret.trim();
        if secret.starts_with(PRIVKEY_HRP) {
            Self::from_bech32(secret)
        } else {
            Self::from_hex(secret)
        }
    }

    fn from_bech32(secret: &str) -> Result<Self, SignerError> {
        let (hrp, data) = bech32::decode(secret)
            .map_err(|e| SignerError::InvalidKeyEncoding(e.to_string()))?;
        let mut data = Zeroizing::new(data);

        if hrp.as_str() != PRIVKEY_HRP {
            return Err(SignerError::InvalidKeyEncoding(format!(
                "unexpected prefix: {}",
                hrp
            )));
        }
        if data.len() != 33 {
            return Err(SignerError::InvalidKeyEncoding(format!(
                "expected 33 bytes (flag + seed), got {}",
                data.len()
            )));
        }
        let flag = data[0];
        if flag != ED25519_FLAG {
            return Err(SignerError::UnsupportedScheme(flag));
        }

        let mut seed = Zeroizing::new([0u8; 32]);
        seed.copy_from_slice(&data[1..33]);
        data.zeroize();
        Ok(Self {
            signing_key: SigningKey::from_bytes(&seed),
        })
    }

    fn from_hex(secret: &str) -> Result<Self, SignerError> {
        let hex_part = secret.strip_prefix("0x").unwrap_or(secret);
        if hex_part.len() != 64 {
            return Err(SignerError::InvalidKeyEncoding(format!(
                "expected 64 hex digits, got {}",
                hex_part.len()
            )));
        }
        let decoded = hex::decode(hex_part)
            .map_err(|e| SignerError::InvalidKeyEncoding(e.to_string()))?;
        let mut decoded = Zeroizing::new(decoded);

        let mut seed = Zeroizing::new([0u8; 32]);
        seed.copy_from_slice(&decoded);
        decoded.zeroize();
        Ok(Self {
            signing_key: SigningKey::from_bytes(&seed),
        })
    }

    /// Public key bytes (safe to share)
    pub fn public_key(&self) -> [u8; 32] {
        self.signing_key.verifying_key().to_bytes()
    }

    /// Sui address: `0x` + Blake2b-256(flag || pubkey)
    pub fn address(&self) -> String {
        let mut hasher = Blake2b256::new();
        hasher.update([ED25519_FLAG]);
        hasher.update(self.public_key());
        format!("0x{}", hex::encode(hasher.finalize()))
    }

    /// Sign base64-decoded transaction bytes with the transaction intent.
    ///
    /// digest = Blake2b-256([0,0,0] || tx_bytes); the serialized signature
    /// is base64(flag || sig(64) || pubkey(32)).
    pub fn sign_transaction(&self, tx_bytes: &[u8]) -> String {
        let mut hasher = Blake2b256::new();
        hasher.update(TRANSACTION_INTENT);
        hasher.update(tx_bytes);
        let digest = hasher.finalize();

        let signature = self.signing_key.sign(&digest);

        let mut serialized = Vec::with_capacity(1 + 64 + 32);
        serialized.push(ED25519_FLAG);
        serialized.extend_from_slice(&signature.to_bytes());
        serialized.extend_from_slice(&self.public_key());
        BASE64.encode(serialized)
    }
}

// Debug must never expose key bytes
impl std::fmt::Debug for SuiKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SuiKeyPair")
            .field("address", &self.address())
            .field("signing_key", &"[REDACTED]")
            .finish()
    }
}

/// Derive the public address for a stored secret without keeping the
/// keypair around. Used when registering a wallet.
pub fn derive_address(secret: &str) -> Result<String, SignerError> {
    Ok(SuiKeyPair::from_encoded(secret)?.address())
}
