//! Minimal software raster canvas over an `image::RgbImage`.
//!
//! Pixel `(x, y)` covers `[x, x+1) x [y, y+1)`; shapes are tested against
//! pixel centers. No anti-aliasing, so output is exact and repeatable.

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, Rgb, RgbImage};

use super::color::Color;
use super::glyphs::{self, GLYPH_HEIGHT, GLYPH_WIDTH};
use crate::entities::ThumbnailFormat;
use crate::error::ThumbnailError;

pub struct Canvas {
    img: RgbImage,
}

impl Canvas {
    pub fn new(width: u32, height: u32, background: Color) -> Self {
        let mut canvas = Self {
            img: RgbImage::new(width, height),
        };
        canvas.fill_rect(0.0, 0.0, width as f32, height as f32, background, 1.0);
        canvas
    }

    pub fn width(&self) -> u32 {
        self.img.width()
    }

    pub fn height(&self) -> u32 {
        self.img.height()
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
        self.img.get_pixel(x, y).0
    }

    /// Source-over blend of `color` at `opacity` (multiplied by color alpha)
    fn blend(&mut self, x: u32, y: u32, color: Color, opacity: f32) {
        let alpha = (color.alpha() * opacity).clamp(0.0, 1.0);
        if alpha <= 0.0 {
            return;
        }
        let Rgb(dst) = *self.img.get_pixel(x, y);
        let mix = |src: u8, dst: u8| -> u8 {
            (src as f32 * alpha + dst as f32 * (1.0 - alpha)).round() as u8
        };
        self.img.put_pixel(
            x,
            y,
            Rgb([mix(color.r, dst[0]), mix(color.g, dst[1]), mix(color.b, dst[2])]),
        );
    }

    /// Pixel index range whose centers fall in `[lo, hi)` clamped to `0..limit`
    fn span(lo: f32, hi: f32, limit: u32) -> std::ops::Range<u32> {
        let start = (lo - 0.5).ceil().max(0.0);
        let end = (hi - 0.5).ceil().clamp(0.0, limit as f32);
        if start >= end {
            return 0..0;
        }
        start as u32..end as u32
    }

    pub fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Color, opacity: f32) {
        for py in Self::span(y, y + h, self.height()) {
            for px in Self::span(x, x + w, self.width()) {
                self.blend(px, py, color, opacity);
            }
        }
    }

    /// Thick segment with round caps (a capsule). Polylines drawn segment by
    /// segment get round joins for free.
    pub fn stroke_line(&mut self, x0: f32, y0: f32, x1: f32, y1: f32, width: f32, color: Color) {
        let r = (width / 2.0).max(0.5);
        let (dx, dy) = (x1 - x0, y1 - y0);
        let len_sq = dx * dx + dy * dy;

        let rows = Self::span(y0.min(y1) - r, y0.max(y1) + r, self.height());
        let cols = Self::span(x0.min(x1) - r, x0.max(x1) + r, self.width());
        for py in rows {
            for px in cols.clone() {
                let (cx, cy) = (px as f32 + 0.5, py as f32 + 0.5);
                let t = if len_sq == 0.0 {
                    0.0
                } else {
                    (((cx - x0) * dx + (cy - y0) * dy) / len_sq).clamp(0.0, 1.0)
                };
                let (nx, ny) = (x0 + t * dx - cx, y0 + t * dy - cy);
                if nx * nx + ny * ny <= r * r {
                    self.blend(px, py, color, 1.0);
                }
            }
        }
    }

    pub fn fill_circle(&mut self, cx: f32, cy: f32, radius: f32, color: Color) {
        self.ring(cx, cy, 0.0, radius, color);
    }

    /// Outline centered on the circle edge
    pub fn stroke_circle(&mut self, cx: f32, cy: f32, radius: f32, width: f32, color: Color) {
        let half = width / 2.0;
        self.ring(cx, cy, (radius - half).max(0.0), radius + half, color);
    }

    fn ring(&mut self, cx: f32, cy: f32, inner: f32, outer: f32, color: Color) {
        let rows = Self::span(cy - outer, cy + outer, self.height());
        let cols = Self::span(cx - outer, cx + outer, self.width());
        for py in rows {
            for px in cols.clone() {
                let (dx, dy) = (px as f32 + 0.5 - cx, py as f32 + 0.5 - cy);
                let d_sq = dx * dx + dy * dy;
                if d_sq <= outer * outer && d_sq >= inner * inner {
                    self.blend(px, py, color, 1.0);
                }
            }
        }
    }

    pub fn fill_triangle(&mut self, a: (f32, f32), b: (f32, f32), c: (f32, f32), color: Color) {
        let edge = |p: (f32, f32), q: (f32, f32), x: f32, y: f32| {
            (q.0 - p.0) * (y - p.1) - (q.1 - p.1) * (x - p.0)
        };
        let rows = Self::span(a.1.min(b.1).min(c.1), a.1.max(b.1).max(c.1), self.height());
        let cols = Self::span(a.0.min(b.0).min(c.0), a.0.max(b.0).max(c.0), self.width());
        for py in rows {
            for px in cols.clone() {
                let (x, y) = (px as f32 + 0.5, py as f32 + 0.5);
                let (e0, e1, e2) = (edge(a, b, x, y), edge(b, c, x, y), edge(c, a, x, y));
                let inside = (e0 >= 0.0 && e1 >= 0.0 && e2 >= 0.0)
                    || (e0 <= 0.0 && e1 <= 0.0 && e2 <= 0.0);
                if inside {
                    self.blend(px, py, color, 1.0);
                }
            }
        }
    }

    /// Draw the digits of `text` centered on `(cx, cy)`; other characters are skipped.
    pub fn draw_digits_centered(&mut self, text: &str, cx: f32, cy: f32, font_px: f32, color: Color) {
        let scale = ((font_px / 8.0).round() as u32).max(1);
        let glyphs: Vec<&[u8; 5]> = text.chars().filter_map(glyphs::digit).collect();
        if glyphs.is_empty() {
            return;
        }
        let advance = (GLYPH_WIDTH + 1) * scale;
        let total_w = advance * glyphs.len() as u32 - scale;
        let total_h = GLYPH_HEIGHT * scale;
        let left = (cx - total_w as f32 / 2.0).round();
        let top = (cy - total_h as f32 / 2.0).round();

        for (i, rows) in glyphs.into_iter().enumerate() {
            let gx = left + (i as u32 * advance) as f32;
            for row in 0..GLYPH_HEIGHT {
                for col in 0..GLYPH_WIDTH {
                    if glyphs::lit(rows, col, row) {
                        self.fill_rect(
                            gx + (col * scale) as f32,
                            top + (row * scale) as f32,
                            scale as f32,
                            scale as f32,
                            color,
                            1.0,
                        );
                    }
                }
            }
        }
    }

    /// Encode the canvas. `quality` is on the JPEG 1..=100 scale.
    pub fn encode(&self, format: ThumbnailFormat, quality: u8) -> Result<Vec<u8>, ThumbnailError> {
        let mut bytes = Vec::new();
        match format {
            ThumbnailFormat::Jpeg => {
                let mut encoder = JpegEncoder::new_with_quality(&mut bytes, quality);
                encoder
                    .encode_image(&self.img)
                    .map_err(|e| ThumbnailError::Encode(e.to_string()))?;
            }
            ThumbnailFormat::Png => {
                PngEncoder::new(&mut bytes)
                    .write_image(
                        self.img.as_raw(),
                        self.width(),
                        self.height(),
                        ExtendedColorType::Rgb8,
                    )
                    .map_err(|e| ThumbnailError::Encode(e.to_string()))?;
            }
        }
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Color = Color::rgb(255, 0, 0);

    #[test]
    fn test_background_fill() {
        let canvas = Canvas::new(4, 3, RED);
        assert_eq!(canvas.pixel(0, 0), [255, 0, 0]);
        assert_eq!(canvas.pixel(3, 2), [255, 0, 0]);
    }

    #[test]
    fn test_translucent_rect_blends() {
        let mut canvas = Canvas::new(2, 2, Color::BLACK);
        canvas.fill_rect(0.0, 0.0, 1.0, 1.0, Color::WHITE, 0.5);
        assert_eq!(canvas.pixel(0, 0), [128, 128, 128]);
        assert_eq!(canvas.pixel(1, 1), [0, 0, 0]);
    }

    #[test]
    fn test_shapes_clip_to_canvas() {
        let mut canvas = Canvas::new(10, 10, Color::BLACK);
        canvas.fill_circle(-5.0, -5.0, 8.0, RED);
        canvas.stroke_line(-20.0, 5.0, 40.0, 5.0, 2.0, RED);
        canvas.fill_triangle((0.0, 0.0), (30.0, 0.0), (0.0, 30.0), RED);
        assert_eq!(canvas.pixel(0, 0), [255, 0, 0]);
    }

    #[test]
    fn test_circle_center_is_filled() {
        let mut canvas = Canvas::new(20, 20, Color::BLACK);
        canvas.fill_circle(10.0, 10.0, 4.0, RED);
        assert_eq!(canvas.pixel(10, 10), [255, 0, 0]);
        assert_eq!(canvas.pixel(0, 0), [0, 0, 0]);
    }

    #[test]
    fn test_png_encoding_has_signature() {
        let canvas = Canvas::new(8, 8, RED);
        let bytes = canvas.encode(ThumbnailFormat::Png, 80).unwrap();
        assert_eq!(&bytes[..4], &[0x89, b'P', b'N', b'G']);
    }

    #[test]
    fn test_jpeg_encoding_has_soi_marker() {
        let canvas = Canvas::new(8, 8, RED);
        let bytes = canvas.encode(ThumbnailFormat::Jpeg, 80).unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
    }
}
