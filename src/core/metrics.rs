//! Aggregated performance counters and a coarse health rating.

use std::fmt;

use serde::Serialize;

use crate::utils::{format_bytes, format_millis};

const MB: usize = 1024 * 1024;

/// Snapshot merging query engine, thumbnail cache and library counters
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceMetrics {
    pub render_count: u64,
    pub filter_count: u64,
    pub search_count: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub last_filter_time_ms: f64,
    pub average_filter_time_ms: f64,
    /// Query cache entries
    pub cache_size: usize,
    /// Query cache hit rate, 0 when there were no lookups
    pub cache_hit_rate: f64,
    /// Bytes held by cached thumbnails
    pub memory_usage: usize,
    pub scroll_events: u64,
    pub thumbnail_loads: u64,
    pub thumbnail_errors: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheEfficiency {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl CacheEfficiency {
    pub fn from_hit_rate(rate: f64) -> Self {
        if rate > 0.8 {
            CacheEfficiency::Excellent
        } else if rate > 0.6 {
            CacheEfficiency::Good
        } else if rate > 0.4 {
            CacheEfficiency::Fair
        } else {
            CacheEfficiency::Poor
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryStatus {
    Low,
    Moderate,
    High,
}

impl MemoryStatus {
    pub fn from_bytes(bytes: usize) -> Self {
        if bytes > 100 * MB {
            MemoryStatus::High
        } else if bytes > 50 * MB {
            MemoryStatus::Moderate
        } else {
            MemoryStatus::Low
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Health {
    pub cache_efficiency: CacheEfficiency,
    pub memory_status: MemoryStatus,
    pub alerts: Vec<String>,
}

impl PerformanceMetrics {
    pub fn health(&self) -> Health {
        let cache_efficiency = CacheEfficiency::from_hit_rate(self.cache_hit_rate);
        let memory_status = MemoryStatus::from_bytes(self.memory_usage);

        let mut alerts = Vec::new();
        if memory_status == MemoryStatus::High {
            alerts.push("High memory usage detected. Clear the cache.".to_string());
        }
        if self.thumbnail_errors > 0 {
            alerts.push(format!("{} thumbnail(s) failed to render", self.thumbnail_errors));
        }

        Health {
            cache_efficiency,
            memory_status,
            alerts,
        }
    }
}

impl fmt::Display for PerformanceMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "renders:          {}", self.render_count)?;
        writeln!(f, "filters:          {}", self.filter_count)?;
        writeln!(f, "searches:         {}", self.search_count)?;
        writeln!(
            f,
            "query cache:      {} entries, {} hits / {} misses ({:.0}%)",
            self.cache_size,
            self.cache_hits,
            self.cache_misses,
            self.cache_hit_rate * 100.0
        )?;
        writeln!(
            f,
            "filter time:      last {}, avg {}",
            format_millis(self.last_filter_time_ms),
            format_millis(self.average_filter_time_ms)
        )?;
        writeln!(f, "thumbnail memory: {}", format_bytes(self.memory_usage))?;
        writeln!(
            f,
            "thumbnails:       {} loaded, {} failed",
            self.thumbnail_loads, self.thumbnail_errors
        )?;
        write!(f, "scroll events:    {}", self.scroll_events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_efficiency_thresholds() {
        assert_eq!(CacheEfficiency::from_hit_rate(0.81), CacheEfficiency::Excellent);
        assert_eq!(CacheEfficiency::from_hit_rate(0.8), CacheEfficiency::Good);
        assert_eq!(CacheEfficiency::from_hit_rate(0.5), CacheEfficiency::Fair);
        assert_eq!(CacheEfficiency::from_hit_rate(0.0), CacheEfficiency::Poor);
    }

    #[test]
    fn test_memory_status_thresholds() {
        assert_eq!(MemoryStatus::from_bytes(0), MemoryStatus::Low);
        assert_eq!(MemoryStatus::from_bytes(50 * MB + 1), MemoryStatus::Moderate);
        assert_eq!(MemoryStatus::from_bytes(101 * MB), MemoryStatus::High);
    }

    #[test]
    fn test_health_alerts() {
        let metrics = PerformanceMetrics {
            memory_usage: 200 * MB,
            thumbnail_errors: 2,
            ..Default::default()
        };
        let health = metrics.health();
        assert_eq!(health.memory_status, MemoryStatus::High);
        assert_eq!(health.alerts.len(), 2);
        assert!(PerformanceMetrics::default().health().alerts.is_empty());
    }

    #[test]
    fn test_display_lists_counters() {
        let text = PerformanceMetrics::default().to_string();
        assert!(text.contains("thumbnail memory: 0 B"));
        assert!(text.contains("filter time:      last < 1ms"));
    }
}
