//! The deterministic grid codec.
//!
//! A code is a fixed-width grid of black/white modules: one sync row on
//! top (a solid four-module run, then alternation — locally unique enough
//! to anchor a scan), followed by data rows carrying a framed payload:
//!
//! ```text
//! magic (2) | length u16 LE (2) | payload | checksum (4)
//! ```
//!
//! The checksum is the first four bytes of `double_sha256(payload)`.
//! Bits are packed MSB-first, row-major; a set bit renders as a dark
//! module. Everything about the geometry is a constant in `config`, so
//! the same payload always renders to the same pixels — the decoder and
//! any cached render can rely on that.
//!
//! The decoder scans the frame for a sync row at every plausible anchor,
//! reads the header row (exactly 32 bits: magic and length), then the
//! computed number of data rows, and accepts only if magic and checksum
//! agree. Anything short of that is `None` — not yet decoded.

use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::capture::{CaptureError, Frame, PixelFormat};
use crate::config::{
    CODE_CHECKSUM_LEN, CODE_MAGIC, CODE_MODULE_PX, CODE_QUIET_MODULES, CODE_WIDTH_MODULES,
    MAX_CODE_PAYLOAD_BYTES,
};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from the encoding path. Decoding never errors — it declines.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The payload exceeds the codec's size ceiling.
    #[error("payload of {len} bytes exceeds the {max}-byte ceiling")]
    PayloadTooLarge {
        /// Offending payload length.
        len: usize,
        /// The configured ceiling.
        max: usize,
    },

    /// The rendered frame could not be constructed. Geometry constants
    /// guarantee this cannot happen for payloads under the ceiling.
    #[error("failed to render code frame: {0}")]
    Render(#[from] CaptureError),
}

// ---------------------------------------------------------------------------
// Codec
// ---------------------------------------------------------------------------

/// The grid codec. Stateless; geometry comes from `config`.
#[derive(Debug, Clone, Copy, Default)]
pub struct GridCodec;

/// Luma values for rendered modules.
const WHITE: u8 = 255;
const DARK: u8 = 0;

/// Sampling threshold: below this luma a module reads as dark.
const DARK_THRESHOLD: u8 = 128;

/// Header bytes preceding the payload: magic + u16 length.
const HEADER_LEN: usize = CODE_MAGIC.len() + 2;

impl GridCodec {
    /// Creates the codec.
    pub fn new() -> Self {
        Self
    }

    /// Encodes a payload into a renderable frame.
    ///
    /// Deterministic: the same payload produces bit-identical pixels.
    ///
    /// # Errors
    ///
    /// [`CodecError::PayloadTooLarge`] above
    /// [`MAX_CODE_PAYLOAD_BYTES`].
    pub fn encode(&self, payload: &[u8]) -> Result<Frame, CodecError> {
        if payload.len() > MAX_CODE_PAYLOAD_BYTES {
            return Err(CodecError::PayloadTooLarge {
                len: payload.len(),
                max: MAX_CODE_PAYLOAD_BYTES,
            });
        }

        let mut data = Vec::with_capacity(HEADER_LEN + payload.len() + CODE_CHECKSUM_LEN);
        data.extend_from_slice(&CODE_MAGIC);
        data.extend_from_slice(&(payload.len() as u16).to_le_bytes());
        data.extend_from_slice(payload);
        data.extend_from_slice(&checksum(payload));

        let width_mods = CODE_WIDTH_MODULES as usize;
        let data_rows = (data.len() * 8).div_ceil(width_mods);
        let rows = 1 + data_rows; // sync row on top

        let quiet = CODE_QUIET_MODULES as usize;
        let px = CODE_MODULE_PX as usize;
        let width_px = (width_mods + 2 * quiet) * px;
        let height_px = (rows + 2 * quiet) * px;

        let mut pixels = vec![WHITE; width_px * height_px];
        let mut paint = |col: usize, row: usize| {
            let x0 = (quiet + col) * px;
            let y0 = (quiet + row) * px;
            for dy in 0..px {
                for dx in 0..px {
                    pixels[(y0 + dy) * width_px + x0 + dx] = DARK;
                }
            }
        };

        for col in 0..width_mods {
            if sync_module(col) {
                paint(col, 0);
            }
        }

        for bit_idx in 0..data.len() * 8 {
            let byte = data[bit_idx / 8];
            let set = (byte >> (7 - (bit_idx % 8))) & 1 == 1;
            if set {
                paint(bit_idx % width_mods, 1 + bit_idx / width_mods);
            }
        }

        let frame = Frame::new(
            width_px as u32,
            height_px as u32,
            PixelFormat::Luma8,
            pixels,
        )?;
        Ok(frame)
    }

    /// Scans a frame for a code and returns its payload bytes if one
    /// validates. `None` means "not yet" — keep polling.
    pub fn decode(&self, frame: &Frame) -> Option<Vec<u8>> {
        let px = CODE_MODULE_PX;
        let span = CODE_WIDTH_MODULES * px;
        if frame.width() < span || frame.height() < 2 * px {
            return None;
        }

        for y0 in 0..=(frame.height() - 2 * px) {
            for x0 in 0..=(frame.width() - span) {
                if !sync_row_at(frame, x0, y0) {
                    continue;
                }
                if let Some(payload) = read_code_at(frame, x0, y0) {
                    return Some(payload);
                }
            }
        }
        None
    }
}

// ---------------------------------------------------------------------------
// Internals
// ---------------------------------------------------------------------------

/// Whether module `col` of the sync row is dark: a solid four-module run,
/// then alternation.
fn sync_module(col: usize) -> bool {
    col < 4 || col % 2 == 0
}

/// Samples the module at grid position `(col, row)` anchored at `(x0, y0)`.
fn sample(frame: &Frame, x0: u32, y0: u32, col: u32, row: u32) -> Option<bool> {
    let x = x0 + col * CODE_MODULE_PX + CODE_MODULE_PX / 2;
    let y = y0 + row * CODE_MODULE_PX + CODE_MODULE_PX / 2;
    if x >= frame.width() || y >= frame.height() {
        return None;
    }
    Some(frame.luma(x, y) < DARK_THRESHOLD)
}

/// Checks for a full sync row anchored at `(x0, y0)`. Bails on the first
/// mismatch, so random image content is rejected after a couple of samples.
fn sync_row_at(frame: &Frame, x0: u32, y0: u32) -> bool {
    for col in 0..CODE_WIDTH_MODULES {
        match sample(frame, x0, y0, col, 0) {
            Some(dark) if dark == sync_module(col as usize) => {}
            _ => return false,
        }
    }
    true
}

/// Reads `count` bytes from the data area, starting `bit_offset` bits in.
fn read_bytes(frame: &Frame, x0: u32, y0: u32, bit_offset: usize, count: usize) -> Option<Vec<u8>> {
    let width = CODE_WIDTH_MODULES as usize;
    let mut out = Vec::with_capacity(count);
    let mut acc = 0u8;
    for i in 0..count * 8 {
        let bit_idx = bit_offset + i;
        let col = (bit_idx % width) as u32;
        let row = 1 + (bit_idx / width) as u32;
        let dark = sample(frame, x0, y0, col, row)?;
        acc = (acc << 1) | u8::from(dark);
        if i % 8 == 7 {
            out.push(acc);
            acc = 0;
        }
    }
    Some(out)
}

/// Attempts a full read at a sync anchor. Magic and checksum are the
/// arbiters; any disagreement declines quietly.
fn read_code_at(frame: &Frame, x0: u32, y0: u32) -> Option<Vec<u8>> {
    let header = read_bytes(frame, x0, y0, 0, HEADER_LEN)?;
    if header[..CODE_MAGIC.len()] != CODE_MAGIC {
        return None;
    }
    let len = u16::from_le_bytes([header[2], header[3]]) as usize;
    if len > MAX_CODE_PAYLOAD_BYTES {
        return None;
    }

    let body = read_bytes(
        frame,
        x0,
        y0,
        HEADER_LEN * 8,
        len + CODE_CHECKSUM_LEN,
    )?;
    let (payload, check) = body.split_at(len);
    if check != checksum(payload).as_slice() {
        return None;
    }
    Some(payload.to_vec())
}

/// First four bytes of `double_sha256(payload)`. Double hashing costs
/// nothing here and keeps the construction aligned with the transaction
/// side of the house.
fn checksum(payload: &[u8]) -> [u8; CODE_CHECKSUM_LEN] {
    let first = Sha256::digest(payload);
    let second = Sha256::digest(first);
    let mut out = [0u8; CODE_CHECKSUM_LEN];
    out.copy_from_slice(&second[..CODE_CHECKSUM_LEN]);
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
