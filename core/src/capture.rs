//! # Image Capture
//!
//! Frames and the camera capability. The actual hardware (a CSI camera, a
//! USB webcam, a directory of replayed frames in tests) lives behind
//! [`CaptureDevice`] and [`FrameSource`]; this module only pins down the
//! contract the rest of the pipeline relies on:
//!
//! - `next_frame` blocks until a frame is ready or the timeout elapses, in
//!   which case it fails with [`CaptureError::CaptureTimeout`].
//! - A camera has exactly one coherent reader. [`ExclusiveCamera`] enforces
//!   that: a second open while a handle is live fails fast with
//!   [`CaptureError::DeviceBusy`] instead of silently queueing.
//! - The handle releases the device on every exit path. Dropping the guard
//!   is the release — there is no way to leak the slot short of `mem::forget`.
//!
//! Frames are owned, immutable pixel buffers. They are produced by the
//! source and consumed-and-discarded by whichever step needed them; nothing
//! holds a frame past the step that processed it.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from the capture capability.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// No frame became available within the configured timeout. Transient —
    /// the polling loop charges an attempt and carries on.
    #[error("no frame available within {0:?}")]
    CaptureTimeout(Duration),

    /// Another session already holds the device. Fail fast; a camera has at
    /// most one coherent reader and queueing would only hide the conflict.
    #[error("capture device is busy")]
    DeviceBusy,

    /// The underlying device failed in a way that is not going to get better
    /// by retrying (unplugged, driver fault, end of a replay).
    #[error("capture device failed: {0}")]
    DeviceFailed(String),
}

// ---------------------------------------------------------------------------
// Frame
// ---------------------------------------------------------------------------

/// Pixel layout of a [`Frame`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// 8-bit grayscale, one byte per pixel.
    Luma8,
    /// 8-bit RGB, three bytes per pixel, row-major.
    Rgb8,
}

impl PixelFormat {
    /// Bytes per pixel for this format.
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Luma8 => 1,
            Self::Rgb8 => 3,
        }
    }
}

/// An owned, immutable pixel buffer.
///
/// Construction validates that the buffer length matches the declared
/// geometry, so every downstream consumer can index without re-checking.
#[derive(Clone, PartialEq, Eq)]
pub struct Frame {
    width: u32,
    height: u32,
    format: PixelFormat,
    pixels: Vec<u8>,
}

impl Frame {
    /// Creates a frame, validating the buffer against the geometry.
    pub fn new(
        width: u32,
        height: u32,
        format: PixelFormat,
        pixels: Vec<u8>,
    ) -> Result<Self, CaptureError> {
        let expected = width as usize * height as usize * format.bytes_per_pixel();
        if pixels.len() != expected {
            return Err(CaptureError::DeviceFailed(format!(
                "frame buffer length {} does not match {}x{} {:?} (expected {})",
                pixels.len(),
                width,
                height,
                format,
                expected,
            )));
        }
        Ok(Self {
            width,
            height,
            format,
            pixels,
        })
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Pixel layout.
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Raw pixel bytes, row-major.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Luminance of the pixel at `(x, y)`, in 0..=255.
    ///
    /// For RGB frames this is the integer Rec.601 luma approximation
    /// `(299 R + 587 G + 114 B) / 1000`, which is deterministic across
    /// platforms — no floating point in the sampling path.
    ///
    /// # Panics
    ///
    /// Panics if `(x, y)` is out of bounds. Callers index within the
    /// geometry they validated at construction.
    pub fn luma(&self, x: u32, y: u32) -> u8 {
        assert!(x < self.width && y < self.height, "pixel out of bounds");
        let idx = (y as usize * self.width as usize + x as usize) * self.format.bytes_per_pixel();
        match self.format {
            PixelFormat::Luma8 => self.pixels[idx],
            PixelFormat::Rgb8 => {
                let r = self.pixels[idx] as u32;
                let g = self.pixels[idx + 1] as u32;
                let b = self.pixels[idx + 2] as u32;
                ((299 * r + 587 * g + 114 * b) / 1000) as u8
            }
        }
    }

    /// Returns a grayscale copy downsampled by an integer divisor
    /// (nearest-neighbor). The matcher runs on quarter-resolution frames;
    /// see [`crate::config::DOWNSAMPLE_DIVISOR`].
    ///
    /// A divisor of 0 is treated as 1. Frames smaller than the divisor
    /// collapse to a single pixel rather than an empty buffer.
    pub fn downsample(&self, divisor: u32) -> Frame {
        let div = divisor.max(1);
        let w = (self.width / div).max(1);
        let h = (self.height / div).max(1);
        let mut pixels = Vec::with_capacity(w as usize * h as usize);
        for y in 0..h {
            for x in 0..w {
                let sx = (x * div).min(self.width - 1);
                let sy = (y * div).min(self.height - 1);
                pixels.push(self.luma(sx, sy));
            }
        }
        Frame {
            width: w,
            height: h,
            format: PixelFormat::Luma8,
            pixels,
        }
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never dump pixel data into logs; geometry is all anyone needs.
        write!(
            f,
            "Frame({}x{} {:?}, {} bytes)",
            self.width,
            self.height,
            self.format,
            self.pixels.len()
        )
    }
}

// ---------------------------------------------------------------------------
// Capability Traits
// ---------------------------------------------------------------------------

/// A live, exclusive stream of frames.
///
/// Dropping the source releases the underlying device. Implementations must
/// make `next_frame` block for at most `timeout` before returning
/// [`CaptureError::CaptureTimeout`].
pub trait FrameSource: Send {
    /// Blocks until a frame is available or `timeout` elapses.
    fn next_frame(&mut self, timeout: Duration) -> Result<Frame, CaptureError>;
}

/// A camera (or stand-in) that can be opened into a [`FrameSource`].
pub trait CaptureDevice: Send + Sync {
    /// Opens the device for exclusive reading.
    fn open(&self) -> Result<Box<dyn FrameSource>, CaptureError>;
}

// ---------------------------------------------------------------------------
// ExclusiveCamera
// ---------------------------------------------------------------------------

/// Wraps a [`CaptureDevice`] with single-reader enforcement.
///
/// The session opens the camera through this wrapper; a concurrent session
/// attempting the same gets [`CaptureError::DeviceBusy`] immediately. The
/// returned [`CameraHandle`] clears the slot on drop, which covers every
/// exit path — success, match failure, decode failure, cancellation.
pub struct ExclusiveCamera {
    device: Arc<dyn CaptureDevice>,
    in_use: Arc<AtomicBool>,
}

impl ExclusiveCamera {
    /// Wraps a device.
    pub fn new(device: Arc<dyn CaptureDevice>) -> Self {
        Self {
            device,
            in_use: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Opens the device, claiming the exclusive slot.
    ///
    /// # Errors
    ///
    /// [`CaptureError::DeviceBusy`] if a handle is already live, or whatever
    /// the underlying device reports on open failure (the slot is released
    /// again in that case).
    pub fn open(&self) -> Result<CameraHandle, CaptureError> {
        if self.in_use.swap(true, Ordering::AcqRel) {
            return Err(CaptureError::DeviceBusy);
        }
        match self.device.open() {
            Ok(source) => Ok(CameraHandle {
                source,
                slot: Arc::clone(&self.in_use),
            }),
            Err(e) => {
                self.in_use.store(false, Ordering::Release);
                Err(e)
            }
        }
    }

    /// Returns `true` if a handle is currently live.
    pub fn is_busy(&self) -> bool {
        self.in_use.load(Ordering::Acquire)
    }
}

/// An open, exclusive camera handle. Releases the device slot on drop.
pub struct CameraHandle {
    source: Box<dyn FrameSource>,
    slot: Arc<AtomicBool>,
}

impl FrameSource for CameraHandle {
    fn next_frame(&mut self, timeout: Duration) -> Result<Frame, CaptureError> {
        self.source.next_frame(timeout)
    }
}

impl Drop for CameraHandle {
    fn drop(&mut self) {
        self.slot.store(false, Ordering::Release);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
