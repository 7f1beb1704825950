//! # Ledger Collaborator
//!
//! The one thing the pipeline needs from the network: a recent anchor to
//! bind the transaction to a validity window and prevent replay. The
//! session fetches it immediately before signing and at no other time, so
//! a cancelled or failed session performs no network side effects at all.
//!
//! Broadcasting the signed artifact is the verifier's problem (or the
//! kiosk operator's); the core neither submits nor retries.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ANCHOR_LENGTH;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from the ledger collaborator.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The anchor could not be fetched. Not retried — the session surfaces
    /// this verbatim as its terminal outcome.
    #[error("anchor fetch failed: {0}")]
    AnchorFetchFailed(String),
}

// ---------------------------------------------------------------------------
// Anchor
// ---------------------------------------------------------------------------

/// A recent network-supplied marker (a blockhash, in ledger terms) that
/// scopes a signed transaction to a validity window.
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Anchor([u8; ANCHOR_LENGTH]);

impl Anchor {
    /// Wraps raw anchor bytes.
    pub fn from_bytes(bytes: [u8; ANCHOR_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Parses a base58-encoded anchor, as ledger RPC endpoints return it.
    pub fn from_base58(s: &str) -> Result<Self, AnchorParseError> {
        let decoded = bs58::decode(s)
            .into_vec()
            .map_err(|_| AnchorParseError::BadEncoding)?;
        let bytes: [u8; ANCHOR_LENGTH] = decoded
            .try_into()
            .map_err(|v: Vec<u8>| AnchorParseError::BadLength(v.len()))?;
        Ok(Self(bytes))
    }

    /// The raw anchor bytes.
    pub fn as_bytes(&self) -> &[u8; ANCHOR_LENGTH] {
        &self.0
    }

    /// Base58 representation.
    pub fn to_base58(&self) -> String {
        bs58::encode(self.0).into_string()
    }
}

/// A string that is not a valid anchor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnchorParseError {
    /// Not base58.
    #[error("anchor is not valid base58")]
    BadEncoding,
    /// Decoded to the wrong number of bytes.
    #[error("anchor decoded to {0} bytes, expected {ANCHOR_LENGTH}")]
    BadLength(usize),
}

impl TryFrom<String> for Anchor {
    type Error = AnchorParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::from_base58(&s)
    }
}

impl From<Anchor> for String {
    fn from(a: Anchor) -> Self {
        a.to_base58()
    }
}

impl fmt::Display for Anchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_base58())
    }
}

impl fmt::Debug for Anchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Anchor({})", &self.to_base58()[..8.min(self.to_base58().len())])
    }
}

// ---------------------------------------------------------------------------
// Capability Trait
// ---------------------------------------------------------------------------

/// The ledger RPC capability the session depends on.
///
/// One operation, consumed exactly once per successful session, right
/// before signing. Implementations live at the edge (the kiosk's blocking
/// JSON-RPC client) or in tests (canned anchors, injected failures).
pub trait LedgerRpc: Send + Sync {
    /// Fetches a recent anchor value.
    fn recent_anchor(&self) -> Result<Anchor, LedgerError>;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
