//! Addresses, amount validation, and the validated request.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{LAMPORTS_PER_COIN, MAX_COIN_AMOUNT, PUBKEY_LENGTH};
use crate::transport::TransactionRequest;

// ---------------------------------------------------------------------------
// Pubkey
// ---------------------------------------------------------------------------

/// A 32-byte public identifier, base58-encoded on every wire and screen.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Pubkey([u8; PUBKEY_LENGTH]);

impl Pubkey {
    /// Wraps raw key bytes.
    pub fn from_bytes(bytes: [u8; PUBKEY_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Parses a base58-encoded identifier, validating length.
    pub fn from_base58(s: &str) -> Result<Self, AddressError> {
        let decoded = bs58::decode(s)
            .into_vec()
            .map_err(|_| AddressError::BadEncoding)?;
        let bytes: [u8; PUBKEY_LENGTH] = decoded
            .try_into()
            .map_err(|v: Vec<u8>| AddressError::BadLength(v.len()))?;
        Ok(Self(bytes))
    }

    /// The raw bytes.
    pub fn as_bytes(&self) -> &[u8; PUBKEY_LENGTH] {
        &self.0
    }

    /// Base58 representation — what users and payloads see.
    pub fn to_base58(&self) -> String {
        bs58::encode(self.0).into_string()
    }
}

/// A string that is not a valid public identifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    /// Not valid base58.
    #[error("address is not valid base58")]
    BadEncoding,
    /// Decoded to the wrong number of bytes.
    #[error("address decoded to {0} bytes, expected {PUBKEY_LENGTH}")]
    BadLength(usize),
}

impl TryFrom<String> for Pubkey {
    type Error = AddressError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::from_base58(&s)
    }
}

impl From<Pubkey> for String {
    fn from(k: Pubkey) -> Self {
        k.to_base58()
    }
}

impl fmt::Display for Pubkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_base58())
    }
}

impl fmt::Debug for Pubkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b58 = self.to_base58();
        write!(f, "Pubkey({}…)", &b58[..8.min(b58.len())])
    }
}

// ---------------------------------------------------------------------------
// Amount Validation
// ---------------------------------------------------------------------------

/// Validation failures for a received payment request. These are terminal:
/// a structurally valid payload with bad values ends the session as
/// `Invalid`, with no retry.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RequestError {
    /// The amount is not a positive, representable quantity.
    #[error("invalid amount {amount}: {reason}")]
    InvalidAmount {
        /// The offending value, as received.
        amount: f64,
        /// Why it was refused.
        reason: &'static str,
    },

    /// The recipient is not a well-formed public identifier.
    #[error("invalid recipient: {0}")]
    InvalidRecipient(#[from] AddressError),
}

/// Converts a decimal coin amount to integer base units.
///
/// The scale is fixed at [`LAMPORTS_PER_COIN`] (10^9). For representable
/// values the result is exactly `round(amount * 10^9)`; non-finite,
/// non-positive, or absurdly large inputs are refused.
pub fn validate_amount(amount: f64) -> Result<u64, RequestError> {
    if !amount.is_finite() {
        return Err(RequestError::InvalidAmount {
            amount,
            reason: "not a finite number",
        });
    }
    if amount <= 0.0 {
        return Err(RequestError::InvalidAmount {
            amount,
            reason: "must be positive",
        });
    }
    if amount > MAX_COIN_AMOUNT {
        return Err(RequestError::InvalidAmount {
            amount,
            reason: "exceeds maximum transfer size",
        });
    }
    Ok((amount * LAMPORTS_PER_COIN as f64).round() as u64)
}

// ---------------------------------------------------------------------------
// ValidRequest
// ---------------------------------------------------------------------------

/// A payment request that has cleared validation: the recipient is a real
/// 32-byte identifier and the amount is a positive integer in base units.
/// This is the only request type the signing path accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidRequest {
    /// The recipient's public identifier.
    pub recipient: Pubkey,
    /// The amount in base units.
    pub lamports: u64,
}

impl ValidRequest {
    /// Validates a structurally parsed request.
    pub fn from_request(request: &TransactionRequest) -> Result<Self, RequestError> {
        let lamports = validate_amount(request.amount)?;
        let recipient = Pubkey::from_base58(&request.recipient)?;
        Ok(Self {
            recipient,
            lamports,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pubkey_base58_roundtrip() {
        let key = Pubkey::from_bytes([9u8; PUBKEY_LENGTH]);
        assert_eq!(Pubkey::from_base58(&key.to_base58()).unwrap(), key);
    }

    #[test]
    fn pubkey_rejects_short_input() {
        let short = bs58::encode([1u8; 16]).into_string();
        assert_eq!(
            Pubkey::from_base58(&short),
            Err(AddressError::BadLength(16))
        );
    }

    #[test]
    fn pubkey_rejects_non_base58() {
        assert_eq!(
            Pubkey::from_base58("0OIl-not-base58"),
            Err(AddressError::BadEncoding)
        );
    }

    #[test]
    fn one_and_a_half_coins_is_exact() {
        assert_eq!(validate_amount(1.5).unwrap(), 1_500_000_000);
    }

    #[test]
    fn whole_coin_amounts_are_exact() {
        assert_eq!(validate_amount(1.0).unwrap(), 1_000_000_000);
        assert_eq!(validate_amount(250.0).unwrap(), 250_000_000_000);
    }

    #[test]
    fn smallest_representable_fraction() {
        assert_eq!(validate_amount(0.000_000_001).unwrap(), 1);
    }

    #[test]
    fn zero_is_invalid() {
        assert!(matches!(
            validate_amount(0.0),
            Err(RequestError::InvalidAmount { .. })
        ));
    }

    #[test]
    fn negative_is_invalid() {
        assert!(matches!(
            validate_amount(-3.2),
            Err(RequestError::InvalidAmount { .. })
        ));
    }

    #[test]
    fn nan_and_infinity_are_invalid() {
        assert!(validate_amount(f64::NAN).is_err());
        assert!(validate_amount(f64::INFINITY).is_err());
    }

    #[test]
    fn over_ceiling_is_invalid() {
        assert!(validate_amount(MAX_COIN_AMOUNT * 2.0).is_err());
    }

    #[test]
    fn valid_request_from_good_payload() {
        let recipient = Pubkey::from_bytes([5u8; PUBKEY_LENGTH]);
        let request = TransactionRequest {
            recipient: recipient.to_base58(),
            amount: 1.5,
        };
        let valid = ValidRequest::from_request(&request).unwrap();
        assert_eq!(valid.recipient, recipient);
        assert_eq!(valid.lamports, 1_500_000_000);
    }

    #[test]
    fn bad_recipient_is_invalid_recipient() {
        let request = TransactionRequest {
            recipient: "tooshort".to_string(),
            amount: 1.0,
        };
        assert!(matches!(
            ValidRequest::from_request(&request),
            Err(RequestError::InvalidRecipient(_))
        ));
    }

    #[test]
    fn bad_amount_checked_before_recipient() {
        // Amount validation runs first; a doubly bad request reports the
        // amount problem.
        let request = TransactionRequest {
            recipient: "alsobad".to_string(),
            amount: -1.0,
        };
        assert!(matches!(
            ValidRequest::from_request(&request),
            Err(RequestError::InvalidAmount { .. })
        ));
    }
}
