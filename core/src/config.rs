//! # Protocol Configuration & Constants
//!
//! Every magic number in Aperture lives here. If you're hardcoding a
//! constant somewhere else, you're doing it wrong and you owe the team
//! coffee.
//!
//! Most of these are policy, not physics. The match threshold and margin in
//! particular decide who gets to spend money, so any change to them should
//! come with a matching change to the boundary tests in `biometric`.

use std::time::Duration;

// ---------------------------------------------------------------------------
// Monetary Units
// ---------------------------------------------------------------------------

/// Base units per whole coin. Amounts arrive as decimals on the wire and are
/// converted exactly once, at validation time, into integers of this scale.
/// After that point no floating point touches money.
pub const LAMPORTS_PER_COIN: u64 = 1_000_000_000;

/// Largest whole-coin amount we accept from a payment request. Anything
/// above this is a typo, an attack, or both. Also keeps the decimal-to-base
/// conversion safely inside `u64` range.
pub const MAX_COIN_AMOUNT: f64 = 1_000_000_000.0;

// ---------------------------------------------------------------------------
// Biometric Parameters
// ---------------------------------------------------------------------------

/// Dimensionality of a face template. Fixed across the enrollment store,
/// the engine, and the matcher — a vector of any other length is rejected
/// at load time, not discovered at match time.
pub const TEMPLATE_DIM: usize = 128;

/// Default euclidean-distance threshold below which a template comparison
/// counts as a candidate match. The boundary is exclusive: a distance equal
/// to the threshold is NOT a match.
pub const DEFAULT_MATCH_THRESHOLD: f32 = 0.4;

/// Default ambiguity margin. The runner-up distance must exceed the winner
/// by at least this much, otherwise the frame is treated as no-match.
/// Two people who look alike get a refusal, not a coin flip.
pub const DEFAULT_MATCH_MARGIN: f32 = 0.1;

/// Frames are downsampled by this integer divisor before detection
/// (a 0.25x scale). Matching accuracy at quarter resolution is more than
/// enough for a template comparison, and the throughput win is large.
pub const DOWNSAMPLE_DIVISOR: u32 = 4;

/// How many frames the session will poll for a face before giving up
/// and declaring the authentication failed.
pub const DEFAULT_AUTH_ATTEMPTS: u32 = 30;

// ---------------------------------------------------------------------------
// Capture Timing
// ---------------------------------------------------------------------------

/// How long a single `next_frame` call may block before the attempt is
/// charged against the polling budget and the loop moves on.
pub const DEFAULT_FRAME_TIMEOUT: Duration = Duration::from_millis(500);

/// How many frames the session will poll for a decodable visual code.
/// Humans are slow at holding paper in front of cameras; the budget is
/// generous on purpose.
pub const DEFAULT_SCAN_ATTEMPTS: u32 = 60;

// ---------------------------------------------------------------------------
// Visual Code Geometry
// ---------------------------------------------------------------------------

/// Magic bytes at the head of every encoded code payload. "AP" — short,
/// unambiguous, and cheap to reject when a frame is just a frame.
pub const CODE_MAGIC: [u8; 2] = [0x41, 0x50];

/// Width of the code in modules. Fixed so that the decoder can hunt for the
/// sync row without knowing the payload length in advance.
pub const CODE_WIDTH_MODULES: u32 = 32;

/// Rendered size of one module in pixels.
pub const CODE_MODULE_PX: u32 = 4;

/// Quiet-zone border around the code, in modules. All white.
pub const CODE_QUIET_MODULES: u32 = 4;

/// Truncated checksum length appended to every payload, in bytes.
pub const CODE_CHECKSUM_LEN: usize = 4;

/// Payload size ceiling for the codec. A signed artifact wrapped in its
/// transport record fits comfortably; anything larger is a caller bug and
/// fails with `PayloadTooLarge`.
pub const MAX_CODE_PAYLOAD_BYTES: usize = 512;

// ---------------------------------------------------------------------------
// Wire Format
// ---------------------------------------------------------------------------

/// Version byte at the head of the canonical transaction encoding.
/// Bump on any change to the signable byte layout.
pub const WIRE_VERSION: u8 = 1;

/// Ed25519 secret keys are 32 bytes. The wallet store may also carry the
/// 64-byte secret+public concatenation some tooling emits; we accept both
/// and use the first 32.
pub const SECRET_KEY_LENGTH: usize = 32;

/// Public identifiers are 32 bytes, base58-encoded on the wire.
pub const PUBKEY_LENGTH: usize = 32;

/// Ed25519 signatures are 64 bytes. Always.
pub const SIGNATURE_LENGTH: usize = 64;

/// Anchors (recent ledger markers) are 32 bytes.
pub const ANCHOR_LENGTH: usize = 32;
