//! Error types for the play library engine.
//!
//! Nothing here reaches the presentation layer during normal operation:
//! `EngineError` is a configuration-time failure, `ThumbnailError` is caught
//! per item and counted.

/// Configuration / programmer errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// A bounded structure was configured with capacity 0
    InvalidCapacity { what: &'static str },
    InvalidConfig(String),
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::InvalidCapacity { what } => {
                write!(f, "Invalid capacity for {}: must be at least 1", what)
            }
            EngineError::InvalidConfig(msg) => write!(f, "Invalid configuration: {}", msg),
        }
    }
}

impl std::error::Error for EngineError {}

/// Thumbnail rendering errors.
///
/// `Clone` because one render result is shared by every caller waiting on
/// the same cache key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThumbnailError {
    InvalidDimensions { width: u32, height: u32 },
    Encode(String),
}

impl std::fmt::Display for ThumbnailError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ThumbnailError::InvalidDimensions { width, height } => {
                write!(f, "Invalid thumbnail dimensions {}x{}", width, height)
            }
            ThumbnailError::Encode(e) => write!(f, "Thumbnail encoding failed: {}", e),
        }
    }
}

impl std::error::Error for ThumbnailError {}
