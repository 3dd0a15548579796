//! Play thumbnail rasterizer.
//!
//! `render_thumbnail` is a pure function of `(play, options)`: the same
//! inputs always produce the same encoded bytes.

pub mod canvas;
pub mod color;
pub mod glyphs;

pub use canvas::Canvas;
pub use color::Color;

use crate::entities::{FIELD_HEIGHT, FIELD_WIDTH, Play, PlayerMark, Point, Route, Thumbnail, ThumbnailOptions};
use crate::error::ThumbnailError;

/// Largest accepted edge, in pixels
pub const MAX_DIMENSION: u32 = 4096;

const END_ZONE_COLOR: Color = Color::rgb(0x3b, 0x82, 0xf6);
const END_ZONE_ALPHA: f32 = 0.13;
const END_ZONE_FRACTION: f32 = 0.1;
const YARD_LINES: u32 = 9;
const HASH_MARK_LENGTH: f32 = 5.0;
const ARROW_LENGTH: f32 = 8.0;
const ARROW_HALF_WIDTH: f32 = 4.0;

/// Rasterize and encode a play diagram.
pub fn render_thumbnail(play: &Play, options: &ThumbnailOptions) -> Result<Thumbnail, ThumbnailError> {
    let (width, height) = (options.width, options.height);
    if width == 0 || height == 0 || width > MAX_DIMENSION || height > MAX_DIMENSION {
        return Err(ThumbnailError::InvalidDimensions { width, height });
    }

    let mut canvas = Canvas::new(width, height, Color::parse_or_fallback(&options.background_color));
    let scale = Scale::new(width, height);

    if options.include_field {
        draw_field(&mut canvas, Color::parse_or_fallback(&options.field_color));
    }
    if options.include_routes {
        for route in &play.routes {
            draw_route(&mut canvas, route, &scale, options.route_width);
        }
    }
    if options.include_players {
        for player in &play.players {
            draw_player(&mut canvas, player, &scale, options.player_size);
        }
    }

    let bytes = canvas.encode(options.format, options.encoder_quality())?;
    log::trace!(
        "Rendered thumbnail for '{}' ({}x{}, {} bytes)",
        play.id,
        width,
        height,
        bytes.len()
    );
    Ok(Thumbnail::new(bytes, width, height, options.format))
}

/// Field space (600x300) to canvas pixels
struct Scale {
    sx: f32,
    sy: f32,
}

impl Scale {
    fn new(width: u32, height: u32) -> Self {
        Self {
            sx: width as f32 / FIELD_WIDTH,
            sy: height as f32 / FIELD_HEIGHT,
        }
    }

    fn apply(&self, p: Point) -> (f32, f32) {
        (p.x * self.sx, p.y * self.sy)
    }
}

fn draw_field(canvas: &mut Canvas, field: Color) {
    let (w, h) = (canvas.width() as f32, canvas.height() as f32);
    canvas.fill_rect(0.0, 0.0, w, h, field, 1.0);

    let end_zone = w * END_ZONE_FRACTION;
    canvas.fill_rect(0.0, 0.0, end_zone, h, END_ZONE_COLOR, END_ZONE_ALPHA);
    canvas.fill_rect(w - end_zone, 0.0, end_zone, h, END_ZONE_COLOR, END_ZONE_ALPHA);

    // Yard lines at 1px sit on whole columns; hash marks overdraw their ends
    let spacing = (w - 2.0 * end_zone) / (YARD_LINES + 1) as f32;
    for i in 1..=YARD_LINES {
        let x = end_zone + i as f32 * spacing;
        canvas.stroke_line(x, 0.0, x, h, 1.0, Color::WHITE);
        canvas.stroke_line(x, 0.0, x, HASH_MARK_LENGTH, 1.0, Color::WHITE);
        canvas.stroke_line(x, h - HASH_MARK_LENGTH, x, h, 1.0, Color::WHITE);
    }
}

fn draw_route(canvas: &mut Canvas, route: &Route, scale: &Scale, route_width: f32) {
    if route.points.len() < 2 {
        return;
    }
    let color = Color::parse_or_fallback(&route.color);
    let pts: Vec<(f32, f32)> = route.points.iter().map(|p| scale.apply(*p)).collect();

    for seg in pts.windows(2) {
        let ((x0, y0), (x1, y1)) = (seg[0], seg[1]);
        canvas.stroke_line(x0, y0, x1, y1, route_width, color);
    }

    // Arrow on the segment after the middle point, if there is one
    let mid = pts.len() / 2;
    let (Some(&(x1, y1)), Some(&(x2, y2))) = (pts.get(mid), pts.get(mid + 1)) else {
        return;
    };
    let angle = (y2 - y1).atan2(x2 - x1);
    let (sin, cos) = angle.sin_cos();
    let (mx, my) = ((x1 + x2) / 2.0, (y1 + y2) / 2.0);
    let place = |x: f32, y: f32| (mx + x * cos - y * sin, my + x * sin + y * cos);

    canvas.fill_triangle(
        place(0.0, 0.0),
        place(-ARROW_LENGTH, -ARROW_HALF_WIDTH),
        place(-ARROW_LENGTH, ARROW_HALF_WIDTH),
        color,
    );
}

fn draw_player(canvas: &mut Canvas, player: &PlayerMark, scale: &Scale, size: f32) {
    let (x, y) = scale.apply(Point::new(player.x, player.y));
    canvas.fill_circle(x, y, size, Color::parse_or_fallback(&player.color));
    canvas.stroke_circle(x, y, size, 1.0, Color::WHITE);

    if size > 3.0 {
        canvas.draw_digits_centered(&player.number, x, y, size.max(8.0), Color::WHITE);
    }
}
