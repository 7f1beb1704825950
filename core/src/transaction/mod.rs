//! # Transaction Module
//!
//! Addresses, amounts, the wallet key, and the signing path. Everything
//! that turns a validated payment request into a signed, serialized,
//! text-encoded transfer.
//!
//! ## Architecture
//!
//! ```text
//! types.rs   — Pubkey, amount validation, and the validated request
//! wallet.rs  — The locally held signing key and its store
//! builder.rs — Canonical transfer encoding, signing, and the artifact
//! ```
//!
//! ## Design Decisions
//!
//! - Amounts cross exactly one boundary from decimal to integer, at
//!   validation time, with a fixed 10^9 scale. Past that point everything
//!   is `u64` base units and no floating point touches money.
//! - The signable bytes are a hand-rolled canonical layout (fixed-width
//!   little-endian integers, no serde) so the signature never depends on
//!   a serializer's mood.
//! - `build_and_sign` is atomic as a unit: it either returns a complete
//!   [`SignedArtifact`] or an error, and no partially constructed
//!   transaction is ever exposed.

pub mod builder;
pub mod types;
pub mod wallet;

pub use builder::{SignError, SignedArtifact, TransactionSigner, TransferTransaction, WalletSigner};
pub use types::{validate_amount, AddressError, Pubkey, RequestError, ValidRequest};
pub use wallet::{WalletError, WalletKeypair};
