//! The locally held signing key and its store.
//!
//! The wallet secret is read once at process start from a JSON credential
//! record (`{"privateKey": "<base58>"}`), lives in memory for the process
//! lifetime, and is never rewritten, never logged, and never serialized —
//! the only code that touches the raw key material is the signing step.
//! The underlying `SigningKey` zeroizes itself on drop, which is the
//! closest thing to "gone" that process memory offers.

use std::fmt;
use std::path::Path;

use ed25519_dalek::{Signer, SigningKey};
use serde::Deserialize;
use thiserror::Error;

use crate::config::{SECRET_KEY_LENGTH, SIGNATURE_LENGTH};

use super::types::Pubkey;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors loading the wallet secret.
///
/// Deliberately vague about *why* key material is bad — error messages
/// that describe secrets are a classic way to leak them.
#[derive(Debug, Error)]
pub enum WalletError {
    /// The credential file could not be read.
    #[error("failed to read wallet store: {0}")]
    Io(#[from] std::io::Error),

    /// The credential file is not the expected JSON record.
    #[error("failed to parse wallet store: {0}")]
    Parse(#[from] serde_json::Error),

    /// The encoded key is not valid key material.
    #[error("invalid secret key: wrong encoding or length")]
    InvalidSecretKey,
}

// ---------------------------------------------------------------------------
// WalletKeypair
// ---------------------------------------------------------------------------

/// The Ed25519 signing identity that authorizes every transfer.
///
/// Intentionally does NOT implement `Serialize`, `Deserialize`, or `Clone`.
/// There is exactly one of these per process, it is constructed once, and
/// every copy of a private key is another thing to protect.
pub struct WalletKeypair {
    signing_key: SigningKey,
}

/// On-disk credential record. Field name matches what wallet tooling
/// actually writes.
#[derive(Deserialize)]
struct WalletFile {
    #[serde(rename = "privateKey")]
    private_key: String,
}

impl WalletKeypair {
    /// Reconstructs the keypair from a base58-encoded secret.
    ///
    /// Accepts either the 32-byte seed or the 64-byte seed+public
    /// concatenation some tooling exports; in the latter case the public
    /// half is re-derived and the stored copy ignored.
    pub fn from_base58(encoded: &str) -> Result<Self, WalletError> {
        let decoded = bs58::decode(encoded.trim())
            .into_vec()
            .map_err(|_| WalletError::InvalidSecretKey)?;

        let seed: [u8; SECRET_KEY_LENGTH] = match decoded.len() {
            SECRET_KEY_LENGTH => decoded
                .try_into()
                .map_err(|_| WalletError::InvalidSecretKey)?,
            len if len == SECRET_KEY_LENGTH * 2 => decoded[..SECRET_KEY_LENGTH]
                .try_into()
                .map_err(|_| WalletError::InvalidSecretKey)?,
            _ => return Err(WalletError::InvalidSecretKey),
        };

        Ok(Self {
            signing_key: SigningKey::from_bytes(&seed),
        })
    }

    /// Loads the keypair from a wallet store file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, WalletError> {
        let raw = std::fs::read_to_string(path)?;
        let record: WalletFile = serde_json::from_str(&raw)?;
        let wallet = Self::from_base58(&record.private_key)?;
        tracing::info!(identity = %wallet.pubkey(), "wallet loaded");
        Ok(wallet)
    }

    /// The public identity derived from the secret. Safe to share, log,
    /// and echo into payloads.
    pub fn pubkey(&self) -> Pubkey {
        Pubkey::from_bytes(self.signing_key.verifying_key().to_bytes())
    }

    /// Signs a message. Ed25519 is deterministic — same key, same message,
    /// same signature, no RNG at signing time.
    pub fn sign(&self, message: &[u8]) -> [u8; SIGNATURE_LENGTH] {
        self.signing_key.sign(message).to_bytes()
    }
}

impl fmt::Debug for WalletKeypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print secret material, not even "partially".
        write!(f, "WalletKeypair(pub={})", self.pubkey())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signature, Verifier, VerifyingKey};
    use std::io::Write;

    fn seed_base58(seed: [u8; 32]) -> String {
        bs58::encode(seed).into_string()
    }

    #[test]
    fn loads_from_32_byte_seed() {
        let wallet = WalletKeypair::from_base58(&seed_base58([7u8; 32])).unwrap();
        assert_eq!(wallet.pubkey().as_bytes().len(), 32);
    }

    #[test]
    fn loads_from_64_byte_export() {
        // seed || public, the common wallet export shape.
        let seed = [9u8; 32];
        let derived = SigningKey::from_bytes(&seed).verifying_key().to_bytes();
        let mut full = Vec::new();
        full.extend_from_slice(&seed);
        full.extend_from_slice(&derived);

        let from_seed = WalletKeypair::from_base58(&seed_base58(seed)).unwrap();
        let from_full =
            WalletKeypair::from_base58(&bs58::encode(full).into_string()).unwrap();
        assert_eq!(from_seed.pubkey(), from_full.pubkey());
    }

    #[test]
    fn rejects_wrong_length() {
        let short = bs58::encode([1u8; 16]).into_string();
        assert!(matches!(
            WalletKeypair::from_base58(&short),
            Err(WalletError::InvalidSecretKey)
        ));
    }

    #[test]
    fn rejects_non_base58() {
        assert!(WalletKeypair::from_base58("!!definitely not base58!!").is_err());
    }

    #[test]
    fn signatures_verify_against_derived_pubkey() {
        let wallet = WalletKeypair::from_base58(&seed_base58([3u8; 32])).unwrap();
        let message = b"transfer 1.5 coins";
        let sig = wallet.sign(message);

        let verifying = VerifyingKey::from_bytes(wallet.pubkey().as_bytes()).unwrap();
        assert!(verifying
            .verify(message, &Signature::from_bytes(&sig))
            .is_ok());
    }

    #[test]
    fn signing_is_deterministic() {
        let wallet = WalletKeypair::from_base58(&seed_base58([5u8; 32])).unwrap();
        assert_eq!(wallet.sign(b"same message"), wallet.sign(b"same message"));
    }

    #[test]
    fn store_file_roundtrip() {
        let secret = seed_base58([11u8; 32]);
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"privateKey":"{}"}}"#, secret).unwrap();

        let loaded = WalletKeypair::load(file.path()).unwrap();
        let direct = WalletKeypair::from_base58(&secret).unwrap();
        assert_eq!(loaded.pubkey(), direct.pubkey());
    }

    #[test]
    fn store_with_bad_key_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"privateKey":"short"}}"#).unwrap();
        assert!(matches!(
            WalletKeypair::load(file.path()),
            Err(WalletError::InvalidSecretKey)
        ));
    }

    #[test]
    fn debug_does_not_leak_secret() {
        let wallet = WalletKeypair::from_base58(&seed_base58([13u8; 32])).unwrap();
        let dbg = format!("{:?}", wallet);
        assert!(dbg.starts_with("WalletKeypair(pub="));
        assert!(!dbg.contains("signing_key"));
    }
}
