//! Thumbnail render options and encoded thumbnail payloads.

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

/// Encoded raster format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThumbnailFormat {
    #[default]
    Jpeg,
    Png,
}

impl ThumbnailFormat {
    pub fn mime(&self) -> &'static str {
        match self {
            ThumbnailFormat::Jpeg => "image/jpeg",
            ThumbnailFormat::Png => "image/png",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ThumbnailFormat::Jpeg => "jpg",
            ThumbnailFormat::Png => "png",
        }
    }
}

/// Every recognized thumbnail rendering option with its default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ThumbnailOptions {
    pub width: u32,
    pub height: u32,
    /// Encoder quality in 0.0..=1.0 (JPEG only)
    pub quality: f32,
    pub include_routes: bool,
    pub include_players: bool,
    pub include_field: bool,
    pub background_color: String,
    pub field_color: String,
    pub player_size: f32,
    pub route_width: f32,
    pub format: ThumbnailFormat,
}

impl Default for ThumbnailOptions {
    fn default() -> Self {
        Self {
            width: 200,
            height: 120,
            quality: 0.8,
            include_routes: true,
            include_players: true,
            include_field: true,
            background_color: "#f8fafc".to_string(),
            field_color: "#15803d".to_string(),
            player_size: 4.0,
            route_width: 2.0,
            format: ThumbnailFormat::Jpeg,
        }
    }
}

impl ThumbnailOptions {
    /// Same options at different pixel dimensions
    pub fn sized(&self, width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..self.clone()
        }
    }

    /// JPEG quality on the encoder's 1..=100 scale
    pub fn encoder_quality(&self) -> u8 {
        let q = if self.quality.is_finite() { self.quality } else { 0.8 };
        ((q.clamp(0.0, 1.0) * 100.0).round() as u8).max(1)
    }
}

/// Encoded thumbnail. Cheap to clone (shared byte buffer).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thumbnail {
    bytes: Arc<[u8]>,
    width: u32,
    height: u32,
    format: ThumbnailFormat,
}

impl Thumbnail {
    pub fn new(bytes: Vec<u8>, width: u32, height: u32, format: ThumbnailFormat) -> Self {
        Self {
            bytes: bytes.into(),
            width,
            height,
            format,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> ThumbnailFormat {
        self.format
    }

    /// `data:` URL suitable for an `<img src>` or the play's `thumbnail` field
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.format.mime(), STANDARD.encode(&self.bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encoder_quality_mapping() {
        let mut options = ThumbnailOptions::default();
        assert_eq!(options.encoder_quality(), 80);
        options.quality = 0.0;
        assert_eq!(options.encoder_quality(), 1);
        options.quality = 7.5;
        assert_eq!(options.encoder_quality(), 100);
        options.quality = f32::NAN;
        assert_eq!(options.encoder_quality(), 80);
    }

    #[test]
    fn test_data_url_prefix() {
        let thumb = Thumbnail::new(vec![1, 2, 3], 2, 2, ThumbnailFormat::Png);
        assert_eq!(thumb.to_data_url(), "data:image/png;base64,AQID");
    }

    #[test]
    fn test_options_deserialize_with_defaults() {
        let options: ThumbnailOptions = serde_json::from_str(r#"{"width": 64}"#).unwrap();
        assert_eq!(options.width, 64);
        assert_eq!(options.height, 120);
        assert!(options.include_field);
    }
}
