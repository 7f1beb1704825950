//! # Development Face Engine
//!
//! [`LumaGridEngine`] is the kiosk's stand-in for a real face recognizer:
//! it detects "something is in front of the camera" by luminance spread
//! and embeds a region as a grid of cell averages. It is deterministic,
//! dependency-free, and good enough to exercise the whole pipeline with
//! recorded frames — enroll a template from a frame of a person, replay
//! frames of the same person, and the matcher behaves exactly as it would
//! with a production engine.
//!
//! It is not a biometric. Do not deploy it as one.

use aperture_core::biometric::{FaceEngine, FaceRegion, Template};
use aperture_core::capture::Frame;
use aperture_core::config::TEMPLATE_DIM;

/// Grid geometry: 16 columns by 8 rows of cells, one embedding component
/// per cell.
const GRID_COLS: u32 = 16;
const GRID_ROWS: u32 = 8;

/// Minimum luminance spread (max - min) for a frame to count as having a
/// subject. A blank wall or a lens cap never "detects".
const SPREAD_FLOOR: u8 = 24;

/// The development detection and embedding engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct LumaGridEngine;

impl LumaGridEngine {
    /// Creates the engine.
    pub fn new() -> Self {
        Self
    }

    /// Embeds a full frame, for building enrollment templates from
    /// recorded footage with the same code path the matcher uses.
    pub fn embed_frame(&self, frame: &Frame) -> Template {
        let region = FaceRegion {
            x: 0,
            y: 0,
            width: frame.width(),
            height: frame.height(),
        };
        self.embed(frame, &region)
    }
}

impl FaceEngine for LumaGridEngine {
    fn detect(&self, frame: &Frame) -> Vec<FaceRegion> {
        let mut min = u8::MAX;
        let mut max = u8::MIN;
        for y in 0..frame.height() {
            for x in 0..frame.width() {
                let l = frame.luma(x, y);
                min = min.min(l);
                max = max.max(l);
            }
        }
        if max - min < SPREAD_FLOOR {
            return vec![];
        }
        // One centered region covering the middle half of the frame.
        vec![FaceRegion {
            x: frame.width() / 4,
            y: frame.height() / 4,
            width: (frame.width() / 2).max(1),
            height: (frame.height() / 2).max(1),
        }]
    }

    fn embed(&self, frame: &Frame, region: &FaceRegion) -> Template {
        debug_assert_eq!((GRID_COLS * GRID_ROWS) as usize, TEMPLATE_DIM);

        let mut values = Vec::with_capacity(TEMPLATE_DIM);
        for row in 0..GRID_ROWS {
            for col in 0..GRID_COLS {
                // Cell bounds within the region, clamped to the frame.
                let cx0 = region.x + col * region.width / GRID_COLS;
                let cx1 = (region.x + (col + 1) * region.width / GRID_COLS).max(cx0 + 1);
                let cy0 = region.y + row * region.height / GRID_ROWS;
                let cy1 = (region.y + (row + 1) * region.height / GRID_ROWS).max(cy0 + 1);

                let mut sum = 0u64;
                let mut count = 0u64;
                for y in cy0..cy1.min(frame.height()) {
                    for x in cx0..cx1.min(frame.width()) {
                        sum += frame.luma(x, y) as u64;
                        count += 1;
                    }
                }
                let mean = if count == 0 { 0.0 } else { sum as f32 / count as f32 };
                values.push(mean / 255.0);
            }
        }

        Template::new(values).expect("grid geometry matches the template dimension")
    }
}
