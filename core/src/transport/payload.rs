//! The JSON records carried inside a visual code.
//!
//! Inbound: a [`TransactionRequest`] with a string-encoded recipient and a
//! decimal amount (number or string — wallets in the wild emit both).
//! Unknown extra fields are ignored; missing required fields make the
//! payload malformed, which the scanning loop treats as "not yet received".
//!
//! Outbound: a [`SignedPayload`] carrying the text-encoded signed bytes and
//! the recipient echoed back for the verifier's convenience.
//!
//! Parsing here is *structural only*. Whether the amount is positive or the
//! recipient is a real 32-byte identifier is the validation step's business
//! (`transaction::request`), and failing *that* is a terminal `Invalid`,
//! not a reason to keep polling.

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// A payload that does not parse as the expected structured record.
#[derive(Debug, Error)]
pub enum PayloadError {
    /// Not UTF-8, not JSON, or missing a required field. While scanning,
    /// this means "keep polling", never a hard failure.
    #[error("malformed transport payload: {0}")]
    Malformed(String),
}

// ---------------------------------------------------------------------------
// Inbound: TransactionRequest
// ---------------------------------------------------------------------------

/// A payment request as decoded from a visual code. Structurally valid,
/// not yet validated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRequest {
    /// String-encoded public identifier of the recipient.
    pub recipient: String,

    /// Requested amount in whole coins, as a decimal.
    #[serde(deserialize_with = "decimal_number_or_string")]
    pub amount: f64,
}

impl TransactionRequest {
    /// Parses raw decoded bytes into a structurally valid request.
    pub fn parse(bytes: &[u8]) -> Result<Self, PayloadError> {
        let text =
            std::str::from_utf8(bytes).map_err(|e| PayloadError::Malformed(e.to_string()))?;
        serde_json::from_str(text).map_err(|e| PayloadError::Malformed(e.to_string()))
    }

    /// Serializes the request for transport. Used by tooling that renders
    /// request codes; the canonical direction for this type is inbound.
    pub fn to_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(self).unwrap_or_default()
    }
}

/// Accepts `1.5`, `"1.5"`, or `2` for the amount field.
fn decimal_number_or_string<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) => s.trim().parse::<f64>().map_err(serde::de::Error::custom),
    }
}

// ---------------------------------------------------------------------------
// Outbound: SignedPayload
// ---------------------------------------------------------------------------

/// The record rendered into the output code after a successful signing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignedPayload {
    /// Base58 text encoding of the serialized signed transaction.
    pub signed_transaction: String,

    /// The recipient identifier, echoed for the verifier.
    pub recipient: String,
}

impl SignedPayload {
    /// Serializes the record for encoding into a visual code.
    pub fn to_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(self).unwrap_or_default()
    }

    /// Parses an outbound record; exists so verifier-side tooling and the
    /// round-trip tests share one definition.
    pub fn parse(bytes: &[u8]) -> Result<Self, PayloadError> {
        serde_json::from_slice(bytes).map_err(|e| PayloadError::Malformed(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
