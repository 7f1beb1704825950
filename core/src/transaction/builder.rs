//! Canonical transfer encoding, signing, and the artifact.
//!
//! A transfer is one instruction: move `lamports` from the wallet identity
//! (who is also the fee payer) to the recipient, scoped to a recent anchor.
//! The canonical byte layout is hand-rolled — fixed-width little-endian
//! integers, fixed-length keys, no serde — so the signature never depends
//! on a serializer's field ordering:
//!
//! ```text
//! version u8 | sender [32] | recipient [32] | lamports u64 LE | anchor [32]
//! ```
//!
//! The serialized signed form prepends the 64-byte signature to exactly
//! those bytes. [`build_and_sign`] performs the whole construction as a
//! unit: a caller gets a complete [`SignedArtifact`] or an error, never a
//! partially built transaction.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::config::{PUBKEY_LENGTH, SIGNATURE_LENGTH, WIRE_VERSION};
use crate::ledger::Anchor;

use super::types::{Pubkey, ValidRequest};
use super::wallet::WalletKeypair;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failures on the signing path. Not retried; the session surfaces them
/// verbatim as `SignFailed`.
#[derive(Debug, Error)]
pub enum SignError {
    /// The signing primitive (or a remote signer implementation) failed.
    #[error("signing failed: {0}")]
    SigningFailed(String),
}

// ---------------------------------------------------------------------------
// TransferTransaction
// ---------------------------------------------------------------------------

/// An unsigned single-instruction transfer. Construction is infallible
/// given validated inputs; signing happens through [`build_and_sign`] and
/// this type never leaves the module unsigned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferTransaction {
    /// Sender and fee payer, derived from the wallet secret.
    pub sender: Pubkey,
    /// Validated recipient.
    pub recipient: Pubkey,
    /// Amount in base units.
    pub lamports: u64,
    /// Freshness marker binding the transfer to a validity window.
    pub anchor: Anchor,
}

impl TransferTransaction {
    /// Canonical bytes covered by the signature.
    pub fn signable_bytes(&self) -> Vec<u8> {
        let mut buf =
            Vec::with_capacity(1 + 2 * PUBKEY_LENGTH + 8 + self.anchor.as_bytes().len());
        buf.push(WIRE_VERSION);
        buf.extend_from_slice(self.sender.as_bytes());
        buf.extend_from_slice(self.recipient.as_bytes());
        buf.extend_from_slice(&self.lamports.to_le_bytes());
        buf.extend_from_slice(self.anchor.as_bytes());
        buf
    }
}

// ---------------------------------------------------------------------------
// SignedArtifact
// ---------------------------------------------------------------------------

/// The immutable product of a successful signing: serialized bytes plus
/// their base58 text encoding for transport. Produced at most once per
/// session.
#[derive(Debug, Clone)]
pub struct SignedArtifact {
    /// `signature || signable_bytes`.
    pub bytes: Vec<u8>,
    /// Base58 encoding of `bytes`, the form that travels inside the
    /// output visual code.
    pub encoded: String,
    /// The recipient, echoed for the output payload.
    pub recipient: Pubkey,
    /// The transferred amount in base units.
    pub lamports: u64,
    /// When the artifact was produced (UTC).
    pub created_at: DateTime<Utc>,
}

impl SignedArtifact {
    /// Verifies the embedded signature against a sender identity.
    /// Exists for the verifier side and the tests; the signing path never
    /// needs it.
    pub fn verify(&self, sender: &Pubkey) -> bool {
        if self.bytes.len() <= SIGNATURE_LENGTH {
            return false;
        }
        let (sig_bytes, message) = self.bytes.split_at(SIGNATURE_LENGTH);
        let Ok(sig_arr) = <[u8; SIGNATURE_LENGTH]>::try_from(sig_bytes) else {
            return false;
        };
        let Ok(verifying) = ed25519_dalek::VerifyingKey::from_bytes(sender.as_bytes()) else {
            return false;
        };
        use ed25519_dalek::Verifier;
        verifying
            .verify(message, &ed25519_dalek::Signature::from_bytes(&sig_arr))
            .is_ok()
    }
}

// ---------------------------------------------------------------------------
// Signing
// ---------------------------------------------------------------------------

/// The signing capability the session depends on.
///
/// A seam, not a formality: the production implementation wraps the local
/// wallet, tests substitute spies to prove that failed sessions never
/// sign, and a future remote signer would slot in here unchanged.
pub trait TransactionSigner: Send + Sync {
    /// Builds, signs, serializes, and text-encodes a transfer as one
    /// atomic unit.
    fn build_and_sign(
        &self,
        request: &ValidRequest,
        anchor: &Anchor,
    ) -> Result<SignedArtifact, SignError>;
}

/// The production signer: the locally held wallet key.
pub struct WalletSigner<'a> {
    wallet: &'a WalletKeypair,
}

impl<'a> WalletSigner<'a> {
    /// Wraps the process wallet.
    pub fn new(wallet: &'a WalletKeypair) -> Self {
        Self { wallet }
    }
}

impl TransactionSigner for WalletSigner<'_> {
    fn build_and_sign(
        &self,
        request: &ValidRequest,
        anchor: &Anchor,
    ) -> Result<SignedArtifact, SignError> {
        Ok(build_and_sign(request, self.wallet, anchor))
    }
}

/// Constructs and signs a transfer with the wallet key.
///
/// The derived wallet identity is both sender and fee payer. Local Ed25519
/// signing is infallible once the key material exists, so this function
/// returns the artifact directly; fallible signer implementations wrap it
/// behind [`TransactionSigner`].
pub fn build_and_sign(
    request: &ValidRequest,
    wallet: &WalletKeypair,
    anchor: &Anchor,
) -> SignedArtifact {
    let tx = TransferTransaction {
        sender: wallet.pubkey(),
        recipient: request.recipient,
        lamports: request.lamports,
        anchor: *anchor,
    };

    let message = tx.signable_bytes();
    let signature = wallet.sign(&message);

    let mut bytes = Vec::with_capacity(SIGNATURE_LENGTH + message.len());
    bytes.extend_from_slice(&signature);
    bytes.extend_from_slice(&message);
    let encoded = bs58::encode(&bytes).into_string();

    tracing::debug!(
        recipient = %tx.recipient,
        lamports = tx.lamports,
        size = bytes.len(),
        "transfer signed"
    );

    SignedArtifact {
        bytes,
        encoded,
        recipient: tx.recipient,
        lamports: tx.lamports,
        created_at: Utc::now(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ANCHOR_LENGTH;

    fn wallet() -> WalletKeypair {
        WalletKeypair::from_base58(&bs58::encode([21u8; 32]).into_string()).unwrap()
    }

    fn request() -> ValidRequest {
        ValidRequest {
            recipient: Pubkey::from_bytes([4u8; PUBKEY_LENGTH]),
            lamports: 1_500_000_000,
        }
    }

    fn anchor() -> Anchor {
        Anchor::from_bytes([8u8; ANCHOR_LENGTH])
    }

    #[test]
    fn signable_bytes_layout() {
        let w = wallet();
        let tx = TransferTransaction {
            sender: w.pubkey(),
            recipient: request().recipient,
            lamports: 1_500_000_000,
            anchor: anchor(),
        };
        let bytes = tx.signable_bytes();

        assert_eq!(bytes.len(), 1 + 32 + 32 + 8 + 32);
        assert_eq!(bytes[0], WIRE_VERSION);
        assert_eq!(&bytes[1..33], w.pubkey().as_bytes());
        assert_eq!(&bytes[33..65], request().recipient.as_bytes());
        assert_eq!(&bytes[65..73], &1_500_000_000u64.to_le_bytes());
        assert_eq!(&bytes[73..105], anchor().as_bytes());
    }

    #[test]
    fn artifact_verifies_against_sender() {
        let w = wallet();
        let artifact = build_and_sign(&request(), &w, &anchor());
        assert!(artifact.verify(&w.pubkey()));
    }

    #[test]
    fn artifact_rejects_wrong_sender() {
        let w = wallet();
        let other = WalletKeypair::from_base58(&bs58::encode([22u8; 32]).into_string()).unwrap();
        let artifact = build_and_sign(&request(), &w, &anchor());
        assert!(!artifact.verify(&other.pubkey()));
    }

    #[test]
    fn tampered_artifact_fails_verification() {
        let w = wallet();
        let mut artifact = build_and_sign(&request(), &w, &anchor());
        // Nudge the lamports field inside the serialized message.
        let idx = SIGNATURE_LENGTH + 65;
        artifact.bytes[idx] ^= 0x01;
        assert!(!artifact.verify(&w.pubkey()));
    }

    #[test]
    fn encoded_form_matches_bytes() {
        let artifact = build_and_sign(&request(), &wallet(), &anchor());
        let decoded = bs58::decode(&artifact.encoded).into_vec().unwrap();
        assert_eq!(decoded, artifact.bytes);
    }

    #[test]
    fn signing_is_deterministic_per_anchor() {
        let w = wallet();
        let a = build_and_sign(&request(), &w, &anchor());
        let b = build_and_sign(&request(), &w, &anchor());
        assert_eq!(a.bytes, b.bytes);
    }

    #[test]
    fn different_anchor_different_signature() {
        let w = wallet();
        let a = build_and_sign(&request(), &w, &anchor());
        let b = build_and_sign(&request(), &w, &Anchor::from_bytes([99u8; ANCHOR_LENGTH]));
        assert_ne!(a.bytes, b.bytes);
    }

    #[test]
    fn wallet_signer_trait_matches_free_function() {
        let w = wallet();
        let via_trait = WalletSigner::new(&w)
            .build_and_sign(&request(), &anchor())
            .unwrap();
        let direct = build_and_sign(&request(), &w, &anchor());
        assert_eq!(via_trait.bytes, direct.bytes);
    }

    #[test]
    fn artifact_carries_request_details() {
        let artifact = build_and_sign(&request(), &wallet(), &anchor());
        assert_eq!(artifact.recipient, request().recipient);
        assert_eq!(artifact.lamports, 1_500_000_000);
    }
}
