//! # Visual Transport
//!
//! The codec that carries bytes through the air on paper: payment requests
//! arrive as a 2-D visual code held up to the camera, and the signed
//! artifact leaves the same way for the verifier's reader.
//!
//! ## Architecture
//!
//! ```text
//! grid.rs    — The deterministic grid codec (encode to a frame, decode from one)
//! payload.rs — The JSON records carried inside a code, both directions
//! ```
//!
//! Two asymmetric temperaments, on purpose:
//!
//! - **Encoding is strict and deterministic.** Fixed geometry, fixed
//!   checksum, bit-identical output for equal payloads. The only failure
//!   is a payload above the size ceiling.
//! - **Decoding is forgiving.** A frame with no code, a half-visible code,
//!   a corrupted read — all of those are `None`, "not yet decoded", because
//!   a human is still positioning a piece of paper. Hard errors have no
//!   place in a polling loop.

pub mod grid;
pub mod payload;

pub use grid::{CodecError, GridCodec};
pub use payload::{PayloadError, SignedPayload, TransactionRequest};
