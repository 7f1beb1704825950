//! # PGM Image I/O
//!
//! Binary PGM (P5) reading and writing for replay frames and rendered
//! output codes. PGM is the simplest format a camera replay directory can
//! carry: a tiny text header, then raw grayscale bytes — exactly the shape
//! of a `Frame` in `Luma8`.
//!
//! Only 8-bit images (maxval 255) are supported. Comments (`#` to end of
//! line) are allowed anywhere whitespace is, per the format.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};

use aperture_core::capture::{Frame, PixelFormat};

/// Writes a frame as a binary PGM file. RGB frames are converted to
/// grayscale via the frame's own luma sampling.
pub fn write_frame(path: &Path, frame: &Frame) -> Result<()> {
    let (w, h) = (frame.width(), frame.height());
    let mut out = Vec::with_capacity(32 + (w * h) as usize);
    out.extend_from_slice(format!("P5\n{} {}\n255\n", w, h).as_bytes());
    match frame.format() {
        PixelFormat::Luma8 => out.extend_from_slice(frame.pixels()),
        PixelFormat::Rgb8 => {
            for y in 0..h {
                for x in 0..w {
                    out.push(frame.luma(x, y));
                }
            }
        }
    }
    fs::write(path, out).with_context(|| format!("failed to write {}", path.display()))
}

/// Reads a binary PGM file into a `Luma8` frame.
pub fn read_frame(path: &Path) -> Result<Frame> {
    let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    parse(&bytes).with_context(|| format!("failed to parse {}", path.display()))
}

fn parse(bytes: &[u8]) -> Result<Frame> {
    let mut pos = 0usize;

    let magic = token(bytes, &mut pos)?;
    if magic != b"P5" {
        bail!("not a binary PGM (magic {:?})", String::from_utf8_lossy(&magic));
    }

    let width: u32 = parse_number(&token(bytes, &mut pos)?)?;
    let height: u32 = parse_number(&token(bytes, &mut pos)?)?;
    let maxval: u32 = parse_number(&token(bytes, &mut pos)?)?;
    if maxval != 255 {
        bail!("unsupported maxval {maxval}, only 8-bit PGM is supported");
    }

    // One whitespace byte separates the header from pixel data; CRLF
    // writers emit two. Anything else means the header is malformed.
    match bytes.get(pos) {
        Some(b'\r') if bytes.get(pos + 1) == Some(&b'\n') => pos += 2,
        Some(b) if b.is_ascii_whitespace() => pos += 1,
        _ => bail!("missing whitespace between header and pixel data"),
    }
    let expected = width as usize * height as usize;
    let pixels = bytes
        .get(pos..pos + expected)
        .with_context(|| format!("truncated pixel data, expected {expected} bytes"))?
        .to_vec();

    Frame::new(width, height, PixelFormat::Luma8, pixels)
        .map_err(|e| anyhow::anyhow!("invalid frame geometry: {e}"))
}

/// Reads the next whitespace-delimited header token, skipping comments.
fn token(bytes: &[u8], pos: &mut usize) -> Result<Vec<u8>> {
    loop {
        while *pos < bytes.len() && bytes[*pos].is_ascii_whitespace() {
            *pos += 1;
        }
        if *pos < bytes.len() && bytes[*pos] == b'#' {
            while *pos < bytes.len() && bytes[*pos] != b'\n' {
                *pos += 1;
            }
            continue;
        }
        break;
    }
    let start = *pos;
    while *pos < bytes.len() && !bytes[*pos].is_ascii_whitespace() {
        *pos += 1;
    }
    if start == *pos {
        bail!("unexpected end of header");
    }
    Ok(bytes[start..*pos].to_vec())
}

fn parse_number(token: &[u8]) -> Result<u32> {
    std::str::from_utf8(token)
        .ok()
        .and_then(|s| s.parse().ok())
        .with_context(|| format!("bad header number {:?}", String::from_utf8_lossy(token)))
}
