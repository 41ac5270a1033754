//! Software RGBA surface backed by `image` buffers.
//!
//! Stroking builds a coverage mask by stamping round discs along every
//! segment, which gives round caps and joins for free, then composites the
//! mask over the pixels once so overlapping stamps do not darken.

use std::io::Cursor;
use std::path::Path;

use base64::Engine;
use chronosketch_common::error::{SketchError, SketchResult};
use chronosketch_model::Point2D;
use image::{GrayImage, ImageFormat, Luma, Rgba, RgbaImage};
use imageproc::drawing::draw_filled_circle_mut;

use crate::surface::{Color, StrokeStyle, Surface};

const PNG_DATA_URL_PREFIX: &str = "data:image/png;base64,";

/// An off-screen raster surface.
#[derive(Debug, Clone)]
pub struct RasterSurface {
    image: RgbaImage,
    subpaths: Vec<Vec<Point2D>>,
}

impl RasterSurface {
    /// A fully transparent surface.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: RgbaImage::new(width.max(1), height.max(1)),
            subpaths: Vec::new(),
        }
    }

    /// A surface pre-filled with an opaque background.
    pub fn with_background(width: u32, height: u32, background: Color) -> Self {
        let mut surface = Self::new(width, height);
        surface.clear(background);
        surface
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }

    /// RGBA of one pixel; transparent black outside the surface.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        self.image
            .get_pixel_checked(x, y)
            .map(|p| p.0)
            .unwrap_or([0, 0, 0, 0])
    }

    /// Encode as PNG.
    pub fn to_png_bytes(&self) -> SketchResult<Vec<u8>> {
        let mut bytes = Vec::new();
        self.image
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .map_err(|e| SketchError::render(format!("PNG encoding failed: {e}")))?;
        Ok(bytes)
    }

    /// Encode as a `data:image/png;base64,` URL.
    pub fn to_data_url(&self) -> SketchResult<String> {
        let bytes = self.to_png_bytes()?;
        let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
        Ok(format!("{PNG_DATA_URL_PREFIX}{encoded}"))
    }

    /// Write a PNG file.
    pub fn save_png(&self, path: &Path) -> SketchResult<()> {
        let bytes = self.to_png_bytes()?;
        tracing::debug!(path = %path.display(), bytes = bytes.len(), "Writing PNG");
        std::fs::write(path, bytes)?;
        Ok(())
    }

    fn blend(&mut self, x: u32, y: u32, color: Color, alpha: f32) {
        let dst = self.image.get_pixel_mut(x, y);
        let [dr, dg, db, da] = dst.0;
        let da = da as f32 / 255.0;
        let out_a = alpha + da * (1.0 - alpha);
        if out_a <= 0.0 {
            return;
        }
        let mix = |s: u8, d: u8| {
            let v = (s as f32 * alpha + d as f32 * da * (1.0 - alpha)) / out_a;
            v.round().clamp(0.0, 255.0) as u8
        };
        *dst = Rgba([
            mix(color.r, dr),
            mix(color.g, dg),
            mix(color.b, db),
            (out_a * 255.0).round() as u8,
        ]);
    }
}

/// Pixel bounds touched by one stroke call.
struct Touched {
    min_x: i64,
    min_y: i64,
    max_x: i64,
    max_y: i64,
}

impl Touched {
    fn empty() -> Self {
        Self {
            min_x: i64::MAX,
            min_y: i64::MAX,
            max_x: i64::MIN,
            max_y: i64::MIN,
        }
    }

    fn include(&mut self, cx: i64, cy: i64, r: i64) {
        self.min_x = self.min_x.min(cx - r);
        self.min_y = self.min_y.min(cy - r);
        self.max_x = self.max_x.max(cx + r);
        self.max_y = self.max_y.max(cy + r);
    }

    /// Touched box clipped to a `width` x `height` surface, inclusive.
    fn clamp_to(&self, width: u32, height: u32) -> Option<(u32, u32, u32, u32)> {
        if self.max_x < 0 || self.max_y < 0 {
            return None;
        }
        let x1 = self.max_x.min(width as i64 - 1);
        let y1 = self.max_y.min(height as i64 - 1);
        let x0 = self.min_x.max(0);
        let y0 = self.min_y.max(0);
        if x1 < x0 || y1 < y0 {
            return None;
        }
        Some((x0 as u32, y0 as u32, x1 as u32, y1 as u32))
    }
}

impl Surface for RasterSurface {
    fn width(&self) -> u32 {
        self.image.width()
    }

    fn height(&self) -> u32 {
        self.image.height()
    }

    fn clear(&mut self, background: Color) {
        let px = Rgba([background.r, background.g, background.b, 255]);
        for p in self.image.pixels_mut() {
            *p = px;
        }
    }

    fn begin_path(&mut self) {
        self.subpaths.clear();
    }

    fn move_to(&mut self, p: Point2D) {
        self.subpaths.push(vec![p]);
    }

    fn line_to(&mut self, p: Point2D) {
        match self.subpaths.last_mut() {
            Some(subpath) => subpath.push(p),
            None => self.subpaths.push(vec![p]),
        }
    }

    fn stroke(&mut self, style: &StrokeStyle) {
        if style.alpha <= 0.0 {
            return;
        }
        let (w, h) = (self.width(), self.height());
        let radius = (style.width / 2.0).max(0.5);
        let r = radius.round() as i32;
        let step = (radius / 2.0).max(0.5);
        let mut stamps: Vec<(i32, i32)> = Vec::new();
        let mut touched = Touched::empty();

        let lo = Point2D::new(-radius, -radius);
        let hi = Point2D::new(w as f64 + radius, h as f64 + radius);
        for subpath in &self.subpaths {
            let mut travelled = 0.0;
            for pair in subpath.windows(2) {
                let (a, b) = (pair[0], pair[1]);
                let len = a.distance_to(&b);
                if let Some((t_in, t_out)) = clip_segment(a, b, lo, hi) {
                    let n = ((t_out - t_in) * len / step).ceil().max(1.0) as usize;
                    for k in 0..=n {
                        let t = t_in + (t_out - t_in) * k as f64 / n as f64;
                        if let Some(dash) = style.dash {
                            if !dash.is_on(travelled + t * len) {
                                continue;
                            }
                        }
                        let cx = (a.x + (b.x - a.x) * t).round() as i32;
                        let cy = (a.y + (b.y - a.y) * t).round() as i32;
                        stamps.push((cx, cy));
                        touched.include(cx as i64, cy as i64, r as i64);
                    }
                }
                travelled += len;
            }
        }

        let Some((x0, y0, x1, y1)) = touched.clamp_to(w, h) else {
            return;
        };

        // Mask covers only the touched box; stamps are shifted into it.
        let mut mask = GrayImage::new(x1 - x0 + 1, y1 - y0 + 1);
        for (cx, cy) in stamps {
            draw_filled_circle_mut(
                &mut mask,
                (cx - x0 as i32, cy - y0 as i32),
                r,
                Luma([255u8]),
            );
        }
        for (mx, my, px) in mask.enumerate_pixels() {
            if px[0] > 0 {
                self.blend(x0 + mx, y0 + my, style.color, style.alpha);
            }
        }
    }
}

/// Parametric range of segment `a -> b` inside the box `lo..=hi`
/// (Liang-Barsky). `None` when the segment misses the box.
fn clip_segment(a: Point2D, b: Point2D, lo: Point2D, hi: Point2D) -> Option<(f64, f64)> {
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    let mut t0 = 0.0f64;
    let mut t1 = 1.0f64;
    for (p, q) in [
        (-dx, a.x - lo.x),
        (dx, hi.x - a.x),
        (-dy, a.y - lo.y),
        (dy, hi.y - a.y),
    ] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
        } else {
            let r = q / p;
            if p < 0.0 {
                t0 = t0.max(r);
            } else {
                t1 = t1.min(r);
            }
        }
    }
    (t0 <= t1).then_some((t0, t1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::{stroke_polyline, DashPattern};

    #[test]
    fn test_solid_line_paints_pixels() {
        let mut surface = RasterSurface::with_background(40, 40, Color::WHITE);
        stroke_polyline(
            &mut surface,
            [Point2D::new(5.0, 20.0), Point2D::new(35.0, 20.0)],
            &StrokeStyle::solid(Color::BLACK, 2.0),
        );
        assert_eq!(surface.pixel(20, 20), [0, 0, 0, 255]);
        assert_eq!(surface.pixel(20, 5), [255, 255, 255, 255]);
    }

    #[test]
    fn test_alpha_blends_over_background() {
        let mut surface = RasterSurface::with_background(20, 20, Color::WHITE);
        stroke_polyline(
            &mut surface,
            [Point2D::new(2.0, 10.0), Point2D::new(18.0, 10.0)],
            &StrokeStyle::solid(Color::BLACK, 4.0).with_alpha(0.5),
        );
        let [r, _, _, a] = surface.pixel(10, 10);
        assert!((120..=135).contains(&r), "got {r}");
        assert_eq!(a, 255);
    }

    #[test]
    fn test_dashed_line_leaves_gaps() {
        let mut surface = RasterSurface::with_background(60, 10, Color::WHITE);
        stroke_polyline(
            &mut surface,
            [Point2D::new(0.0, 5.0), Point2D::new(60.0, 5.0)],
            &StrokeStyle::solid(Color::BLACK, 1.0).with_dash(DashPattern { on: 6.0, off: 14.0 }),
        );
        assert_eq!(surface.pixel(2, 5)[0], 0);
        assert_eq!(surface.pixel(13, 5)[0], 255);
    }

    #[test]
    fn test_offscreen_segments_are_clipped() {
        let mut surface = RasterSurface::new(10, 10);
        stroke_polyline(
            &mut surface,
            [Point2D::new(-1.0e9, -50.0), Point2D::new(1.0e9, -50.0)],
            &StrokeStyle::solid(Color::BLACK, 2.0),
        );
        assert!(surface.image().pixels().all(|p| p.0[3] == 0));
    }

    #[test]
    fn test_long_segment_through_surface() {
        let mut surface = RasterSurface::with_background(10, 10, Color::WHITE);
        stroke_polyline(
            &mut surface,
            [Point2D::new(-1.0e9, 5.0), Point2D::new(1.0e9, 5.0)],
            &StrokeStyle::solid(Color::BLACK, 2.0),
        );
        assert_eq!(surface.pixel(0, 5), [0, 0, 0, 255]);
        assert_eq!(surface.pixel(9, 5), [0, 0, 0, 255]);
    }

    #[test]
    fn test_short_stroke_paints_only_its_box() {
        let mut surface = RasterSurface::with_background(40, 40, Color::WHITE);
        stroke_polyline(
            &mut surface,
            [Point2D::new(30.0, 30.0), Point2D::new(34.0, 30.0)],
            &StrokeStyle::solid(Color::BLACK, 2.0),
        );
        assert_eq!(surface.pixel(30, 30), [0, 0, 0, 255]);
        assert_eq!(surface.pixel(34, 30), [0, 0, 0, 255]);
        assert_eq!(surface.pixel(27, 30), [255, 255, 255, 255]);
        assert_eq!(surface.pixel(32, 33), [255, 255, 255, 255]);
    }

    #[test]
    fn test_stroke_at_surface_corner() {
        let mut surface = RasterSurface::with_background(10, 10, Color::WHITE);
        stroke_polyline(
            &mut surface,
            [Point2D::new(-3.0, 9.0), Point2D::new(2.0, 9.0)],
            &StrokeStyle::solid(Color::BLACK, 2.0),
        );
        assert_eq!(surface.pixel(0, 9), [0, 0, 0, 255]);
        assert_eq!(surface.pixel(2, 9), [0, 0, 0, 255]);
        assert_eq!(surface.pixel(6, 9), [255, 255, 255, 255]);
    }

    #[test]
    fn test_touched_box_clamps_to_surface() {
        let mut touched = Touched::empty();
        assert_eq!(touched.clamp_to(10, 10), None);
        touched.include(-2, 8, 3);
        assert_eq!(touched.clamp_to(10, 10), Some((0, 5, 1, 9)));
        touched.include(50, 50, 1);
        assert_eq!(touched.clamp_to(10, 10), Some((0, 5, 9, 9)));
    }

    #[test]
    fn test_clip_segment() {
        let lo = Point2D::new(0.0, 0.0);
        let hi = Point2D::new(10.0, 10.0);
        let (t0, t1) =
            clip_segment(Point2D::new(-10.0, 5.0), Point2D::new(20.0, 5.0), lo, hi).unwrap();
        assert!((t0 - 1.0 / 3.0).abs() < 1e-9);
        assert!((t1 - 2.0 / 3.0).abs() < 1e-9);
        assert!(clip_segment(Point2D::new(-5.0, -5.0), Point2D::new(-1.0, 20.0), lo, hi).is_none());
    }

    #[test]
    fn test_data_url() {
        let surface = RasterSurface::with_background(4, 4, Color::WHITE);
        let url = surface.to_data_url().unwrap();
        assert!(url.starts_with("data:image/png;base64,iVBORw0KGgo"));
    }
}
