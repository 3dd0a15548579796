//! PLAYBOOK - play library engine
//!
//! Searchable, filterable, windowed views over football play collections
//! with cached, on-demand thumbnails. Re-exports all modules for use by the
//! binary target.

// Core engine (caches, query, window, coordinator)
pub mod core;

// Data model and thumbnail rasterizer
pub mod entities;
pub mod render;

// App modules
pub mod cli;
pub mod config;
pub mod error;
pub mod paths;
pub mod utils;

// Re-export commonly used types from core
pub use core::event_bus::{EventBus, LibraryEvent};
pub use core::library::PlayLibrary;
pub use core::thumbnail_cache::ThumbnailCache;

// Re-export entities
pub use config::LibraryConfig;
pub use entities::{Play, PlayPatch, QueryState, Thumbnail, ThumbnailOptions};
pub use error::{EngineError, ThumbnailError};
