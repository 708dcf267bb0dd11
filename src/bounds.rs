//! Bounding-region detector — tight rectangle around all drawn pixels.
//!
//! A full-buffer scan over the alpha channel, run once per recognition run
//! (never from the pointer-move path).  The center of the rectangle becomes
//! the placement anchor for the next batch of result overlays.

use egui::{Pos2, pos2};
use image::RgbaImage;

/// Tight bounds over all pixels with `alpha > 0`.
///
/// On a blank buffer the rectangle degenerates to the inverted
/// `{min=(w,h), max=(0,0)}` form; callers must check [`is_empty`] before
/// using [`center`].
///
/// [`is_empty`]: ContentBounds::is_empty
/// [`center`]: ContentBounds::center
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ContentBounds {
    pub min_x: u32,
    pub min_y: u32,
    pub max_x: u32,
    pub max_y: u32,
}

impl ContentBounds {
    /// Scan the whole buffer, O(width · height).
    pub fn scan(pixels: &RgbaImage) -> Self {
        let (width, height) = (pixels.width(), pixels.height());
        let mut bounds = Self {
            min_x: width,
            min_y: height,
            max_x: 0,
            max_y: 0,
        };
        for (x, y, px) in pixels.enumerate_pixels() {
            if px[3] > 0 {
                bounds.min_x = bounds.min_x.min(x);
                bounds.min_y = bounds.min_y.min(y);
                bounds.max_x = bounds.max_x.max(x);
                bounds.max_y = bounds.max_y.max(y);
            }
        }
        bounds
    }

    /// True for the degenerate inverted rectangle (no drawn pixels).
    pub fn is_empty(&self) -> bool {
        self.min_x > self.max_x || self.min_y > self.max_y
    }

    /// Exact midpoint of the rectangle.  Meaningless on an empty result —
    /// check [`Self::is_empty`] first.
    pub fn center(&self) -> Pos2 {
        pos2(
            (self.min_x + self.max_x) as f32 / 2.0,
            (self.min_y + self.max_y) as f32 / 2.0,
        )
    }
}
