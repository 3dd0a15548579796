//! Library configuration (`playbook.json`).
//!
//! Every field is optional in the file; missing fields take their defaults.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::bounded_cache::EvictionPolicy;
use crate::core::query_engine::QuerySettings;
use crate::core::window::LayoutConfig;
use crate::entities::ThumbnailOptions;
use crate::error::EngineError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    pub enable_search: bool,
    pub enable_filtering: bool,
    pub enable_sorting: bool,
    pub enable_caching: bool,
    /// Results kept after sorting
    pub max_items: usize,
    pub debounce_ms: u64,
    pub thumbnail_cache_size: usize,
    pub query_cache_size: usize,
    /// Extra rows rendered on each side of the viewport
    pub overscan: usize,
    pub eviction_policy: EvictionPolicy,
    pub layout: LayoutConfig,
    pub preload_batch_size: usize,
    pub thumbnail: ThumbnailOptions,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            enable_search: true,
            enable_filtering: true,
            enable_sorting: true,
            enable_caching: true,
            max_items: 1000,
            debounce_ms: 300,
            thumbnail_cache_size: 100,
            query_cache_size: 100,
            overscan: 5,
            eviction_policy: EvictionPolicy::default(),
            layout: LayoutConfig::default(),
            preload_batch_size: 5,
            thumbnail: ThumbnailOptions::default(),
        }
    }
}

impl LibraryConfig {
    /// Read and validate a JSON config file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        let config: LibraryConfig = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse config: {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid config: {}", path.display()))?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// `load` if the file exists, defaults otherwise.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            log::info!("No config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        let checks = [
            (self.max_items, "max_items"),
            (self.thumbnail_cache_size, "thumbnail_cache_size"),
            (self.query_cache_size, "query_cache_size"),
            (self.preload_batch_size, "preload_batch_size"),
            (self.layout.chars_per_line, "layout.chars_per_line"),
            (self.layout.grid_columns, "layout.grid_columns"),
        ];
        if let Some((_, name)) = checks.iter().find(|(value, _)| *value == 0) {
            return Err(EngineError::InvalidConfig(format!("{} must be at least 1", name)));
        }
        Ok(())
    }

    pub fn query_settings(&self) -> QuerySettings {
        QuerySettings {
            enable_search: self.enable_search,
            enable_filtering: self.enable_filtering,
            enable_sorting: self.enable_sorting,
            enable_caching: self.enable_caching,
            max_items: self.max_items,
            cache_capacity: self.query_cache_size,
            eviction_policy: self.eviction_policy,
        }
    }
}
