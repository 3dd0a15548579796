//! Core engine modules - caches, query evaluation, windowing, coordination
//!
//! Nothing here spawns threads; async work runs on the caller's executor.

pub mod bounded_cache;
pub mod event_bus;
pub mod library;
pub mod metrics;
pub mod query_engine;
pub mod search_debouncer;
pub mod thumbnail_cache;
pub mod window;

// Re-exports for convenience
pub use bounded_cache::{BoundedCache, CacheStats, EvictionPolicy};
pub use event_bus::{EventBus, EventKind, LibraryEvent};
pub use library::PlayLibrary;
pub use metrics::{CacheEfficiency, Health, MemoryStatus, PerformanceMetrics};
pub use query_engine::{AvailableFilters, QueryEngine, QueryResult, QuerySettings, QueryStats};
pub use search_debouncer::SearchDebouncer;
pub use thumbnail_cache::{PreloadReport, ThumbnailCache, ThumbnailKey, ThumbnailStats};
pub use window::{LayoutConfig, LoadReport, ViewMode, WindowManager, WindowState};
