//! Drawing surface — the pixel canvas and freehand stroke state machine.
//!
//! The bitmap itself is the authoritative stroke record: there is no vector
//! stroke log.  The buffer always matches the canvas widget's current size;
//! resizing reallocates a blank buffer (drawn content is not preserved, same
//! as the board being a fresh sheet — see DESIGN.md).

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use egui::{Color32, Pos2};
use image::codecs::png::PngEncoder;
use image::{ImageEncoder, Rgba, RgbaImage};

/// Half-width of the square brush stamp, in pixels (stamp is 2r+1 wide).
const BRUSH_RADIUS: i32 = 1;

/// Board background color baked into snapshots.  The working buffer keeps
/// drawn pixels on transparency so the bounding-box scan can key on alpha.
const BOARD_BACKGROUND: Rgba<u8> = Rgba([0, 0, 0, 255]);

pub struct DrawingSurface {
    pixels: RgbaImage,
    active_color: Color32,
    drawing: bool,
    last_point: Option<Pos2>,
}

impl DrawingSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            pixels: RgbaImage::new(width, height),
            active_color: Color32::WHITE,
            drawing: false,
            last_point: None,
        }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Raw pixel buffer, for the bounding-box scan and for display upload.
    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    /// True when the surface cannot accept strokes (not laid out yet).
    fn has_no_buffer(&self) -> bool {
        self.pixels.width() == 0 || self.pixels.height() == 0
    }

    // ---- stroke state machine ------------------------------------------

    /// Start a new path at `point`.  No-op while the buffer is zero-sized.
    pub fn begin_stroke(&mut self, point: Pos2) {
        if self.has_no_buffer() {
            return;
        }
        self.drawing = true;
        self.last_point = Some(point);
    }

    /// Extend the active path with a segment to `point`, rasterized in the
    /// active color.  No-op unless a stroke is in progress.
    pub fn extend_stroke(&mut self, point: Pos2) {
        if !self.drawing {
            return;
        }
        if let Some(last) = self.last_point {
            self.draw_segment(last, point);
        }
        self.last_point = Some(point);
    }

    /// Finish the active path.
    pub fn end_stroke(&mut self) {
        self.drawing = false;
        self.last_point = None;
    }

    pub fn is_drawing(&self) -> bool {
        self.drawing
    }

    /// Set the color used for subsequent segments.  Already-drawn pixels
    /// keep their color.
    pub fn set_color(&mut self, color: Color32) {
        self.active_color = color;
    }

    pub fn active_color(&self) -> Color32 {
        self.active_color
    }

    /// Erase all pixel content (back to full transparency).
    pub fn clear(&mut self) {
        for px in self.pixels.pixels_mut() {
            *px = Rgba([0, 0, 0, 0]);
        }
        self.drawing = false;
        self.last_point = None;
    }

    /// Match the buffer to a new widget size.  Content is **not** preserved:
    /// the buffer comes back blank, mirroring the board's fresh-sheet resize
    /// behavior.  No-op when the size is unchanged.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == self.pixels.width() && height == self.pixels.height() {
            return;
        }
        crate::log_info!(
            "surface resized {}x{} -> {}x{} (content dropped)",
            self.pixels.width(),
            self.pixels.height(),
            width,
            height
        );
        self.pixels = RgbaImage::new(width, height);
        self.drawing = false;
        self.last_point = None;
    }

    // ---- snapshot -------------------------------------------------------

    /// Encode the current content as a `data:image/png;base64,...` string,
    /// composited over the board background (the service receives an opaque
    /// image, the way the on-screen board looks).
    pub fn snapshot_data_url(&self) -> Result<String, image::ImageError> {
        let flat = self.composited();
        let mut png_bytes: Vec<u8> = Vec::new();
        let encoder = PngEncoder::new(&mut png_bytes);
        encoder.write_image(
            flat.as_raw(),
            flat.width(),
            flat.height(),
            image::ColorType::Rgba8,
        )?;
        Ok(format!("data:image/png;base64,{}", BASE64.encode(&png_bytes)))
    }

    /// Flatten onto the opaque board background.
    fn composited(&self) -> RgbaImage {
        let mut out = RgbaImage::new(self.pixels.width(), self.pixels.height());
        for (src, dst) in self.pixels.pixels().zip(out.pixels_mut()) {
            *dst = if src[3] == 0 { BOARD_BACKGROUND } else { *src };
        }
        out
    }

    // ---- rasterization --------------------------------------------------

    /// Bresenham's line from `start` to `end`, stamping the brush at every
    /// step.  Pixel-perfect and cheap — this runs on the pointer-move path.
    fn draw_segment(&mut self, start: Pos2, end: Pos2) {
        let mut x0 = start.x.floor() as i32;
        let mut y0 = start.y.floor() as i32;
        let x1 = end.x.floor() as i32;
        let y1 = end.y.floor() as i32;

        let dx = (x1 - x0).abs();
        let dy = (y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = dx - dy;

        loop {
            self.stamp(x0, y0);
            if x0 == x1 && y0 == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 > -dy {
                err -= dy;
                x0 += sx;
            }
            if e2 < dx {
                err += dx;
                y0 += sy;
            }
        }
    }

    /// Write a small opaque square of the active color centered on (x, y).
    fn stamp(&mut self, x: i32, y: i32) {
        let c = self.active_color;
        let px = Rgba([c.r(), c.g(), c.b(), 255]);
        let w = self.pixels.width() as i32;
        let h = self.pixels.height() as i32;
        for oy in -BRUSH_RADIUS..=BRUSH_RADIUS {
            for ox in -BRUSH_RADIUS..=BRUSH_RADIUS {
                let (ix, iy) = (x + ox, y + oy);
                if ix >= 0 && ix < w && iy >= 0 && iy < h {
                    self.pixels.put_pixel(ix as u32, iy as u32, px);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use egui::pos2;

    fn drawn_count(s: &DrawingSurface) -> usize {
        s.pixels().pixels().filter(|p| p[3] > 0).count()
    }

    #[test]
    fn stroke_rasterizes_along_segment() {
        let mut s = DrawingSurface::new(100, 100);
        s.begin_stroke(pos2(10.0, 10.0));
        s.extend_stroke(pos2(40.0, 10.0));
        s.end_stroke();
        assert!(drawn_count(&s) > 0);
        // Endpoints of the segment are covered
        assert!(s.pixels().get_pixel(10, 10)[3] > 0);
        assert!(s.pixels().get_pixel(40, 10)[3] > 0);
        // Far-away pixels are untouched
        assert_eq!(s.pixels().get_pixel(80, 80)[3], 0);
    }

    #[test]
    fn extend_without_begin_is_a_no_op() {
        let mut s = DrawingSurface::new(50, 50);
        s.extend_stroke(pos2(10.0, 10.0));
        assert_eq!(drawn_count(&s), 0);
    }

    #[test]
    fn zero_sized_surface_ignores_strokes() {
        let mut s = DrawingSurface::new(0, 0);
        s.begin_stroke(pos2(1.0, 1.0));
        assert!(!s.is_drawing());
        s.extend_stroke(pos2(5.0, 5.0));
        s.end_stroke();
    }

    #[test]
    fn set_color_only_affects_new_segments() {
        let mut s = DrawingSurface::new(50, 50);
        s.begin_stroke(pos2(5.0, 5.0));
        s.extend_stroke(pos2(10.0, 5.0));
        s.end_stroke();
        s.set_color(Color32::RED);
        s.begin_stroke(pos2(5.0, 30.0));
        s.extend_stroke(pos2(10.0, 30.0));
        s.end_stroke();
        let old = s.pixels().get_pixel(7, 5);
        let new = s.pixels().get_pixel(7, 30);
        assert_eq!(old.0[..3], [255, 255, 255]);
        assert_eq!(new.0[..3], [255, 0, 0]);
    }

    #[test]
    fn clear_erases_everything() {
        let mut s = DrawingSurface::new(50, 50);
        s.begin_stroke(pos2(5.0, 5.0));
        s.extend_stroke(pos2(20.0, 20.0));
        s.end_stroke();
        assert!(drawn_count(&s) > 0);
        s.clear();
        assert_eq!(drawn_count(&s), 0);
    }

    #[test]
    fn resize_drops_content_and_same_size_is_a_no_op() {
        let mut s = DrawingSurface::new(50, 50);
        s.begin_stroke(pos2(5.0, 5.0));
        s.extend_stroke(pos2(20.0, 20.0));
        s.end_stroke();
        let before = drawn_count(&s);
        assert!(before > 0);

        // Same dimensions: content survives
        s.resize(50, 50);
        assert_eq!(drawn_count(&s), before);

        // New dimensions: fresh blank buffer
        s.resize(80, 60);
        assert_eq!((s.width(), s.height()), (80, 60));
        assert_eq!(drawn_count(&s), 0);
    }

    #[test]
    fn snapshot_is_a_png_data_url() {
        let mut s = DrawingSurface::new(16, 16);
        s.begin_stroke(pos2(2.0, 2.0));
        s.extend_stroke(pos2(10.0, 10.0));
        s.end_stroke();
        let url = s.snapshot_data_url().unwrap();
        assert!(url.starts_with("data:image/png;base64,"));
        // Round-trip through the decoder to confirm a valid opaque PNG
        let b64 = url.trim_start_matches("data:image/png;base64,");
        let bytes = BASE64.decode(b64).unwrap();
        let img = image::load_from_memory(&bytes).unwrap().into_rgba8();
        assert_eq!((img.width(), img.height()), (16, 16));
        assert!(img.pixels().all(|p| p[3] == 255));
    }
}
