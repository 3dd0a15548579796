//! Search / filter / sort / truncate with memoized results.
//!
//! A result is keyed by the JSON signature of `(QueryState, collection
//! version)`. Any mutation of the collection bumps the version, so a cached
//! entry can never describe a collection that has since changed.

use std::sync::Arc;
use std::time::Instant;

use indexmap::IndexSet;
use log::{debug, trace};
use serde::Serialize;

use super::bounded_cache::{BoundedCache, EvictionPolicy};
use crate::entities::{Play, QueryState};
use crate::error::EngineError;

/// Shared, immutable result sequence
pub type QueryResult = Arc<[Arc<Play>]>;

/// Engine switches and limits
#[derive(Debug, Clone, PartialEq)]
pub struct QuerySettings {
    pub enable_search: bool,
    pub enable_filtering: bool,
    pub enable_sorting: bool,
    pub enable_caching: bool,
    pub max_items: usize,
    pub cache_capacity: usize,
    pub eviction_policy: EvictionPolicy,
}

impl Default for QuerySettings {
    fn default() -> Self {
        Self {
            enable_search: true,
            enable_filtering: true,
            enable_sorting: true,
            enable_caching: true,
            max_items: 1000,
            cache_capacity: 100,
            eviction_policy: EvictionPolicy::default(),
        }
    }
}

/// Evaluation counters. Times are in milliseconds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryStats {
    pub filter_count: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub last_filter_time_ms: f64,
    pub average_filter_time_ms: f64,
}

impl QueryStats {
    fn record_time(&mut self, elapsed_ms: f64) {
        self.filter_count += 1;
        self.last_filter_time_ms = elapsed_ms;
        let n = self.filter_count as f64;
        self.average_filter_time_ms = (self.average_filter_time_ms * (n - 1.0) + elapsed_ms) / n;
    }

    pub fn hit_rate(&self) -> f64 {
        let total = self.cache_hits + self.cache_misses;
        if total == 0 { 0.0 } else { self.cache_hits as f64 / total as f64 }
    }
}

/// Distinct filter values present in a collection, in first-seen order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AvailableFilters {
    pub phases: Vec<String>,
    pub types: Vec<String>,
    pub difficulties: Vec<String>,
    pub formations: Vec<String>,
    pub tags: Vec<String>,
}

#[derive(Serialize)]
struct Signature<'a> {
    query: &'a QueryState,
    version: u64,
}

pub struct QueryEngine {
    settings: QuerySettings,
    cache: BoundedCache<String, QueryResult>,
    stats: QueryStats,
}

impl QueryEngine {
    pub fn new(settings: QuerySettings) -> Result<Self, EngineError> {
        if settings.max_items == 0 {
            return Err(EngineError::InvalidConfig("max_items must be at least 1".into()));
        }
        let cache = BoundedCache::new(settings.cache_capacity, settings.eviction_policy)?;
        Ok(Self {
            settings,
            cache,
            stats: QueryStats::default(),
        })
    }

    pub fn settings(&self) -> &QuerySettings {
        &self.settings
    }

    pub fn stats(&self) -> &QueryStats {
        &self.stats
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    /// Filtered, sorted and truncated view of `plays` for `state`.
    ///
    /// `version` must change whenever `plays` changes.
    pub fn evaluate(&mut self, plays: &[Arc<Play>], state: &QueryState, version: u64) -> QueryResult {
        let started = Instant::now();

        let signature = if self.settings.enable_caching {
            let signature = Self::signature(state, version);
            if let Some(hit) = self.cache.get(&signature) {
                let hit = Arc::clone(hit);
                self.stats.cache_hits += 1;
                self.stats.record_time(elapsed_ms(started));
                trace!("Query cache hit ({} results)", hit.len());
                return hit;
            }
            self.stats.cache_misses += 1;
            Some(signature)
        } else {
            None
        };

        let result = self.compute(plays, state);

        if let Some(signature) = signature {
            let evicted = self.cache.insert(signature, Arc::clone(&result));
            if !evicted.is_empty() {
                debug!("Query cache evicted {} entries", evicted.len());
            }
        }

        self.stats.record_time(elapsed_ms(started));
        debug!(
            "Query recomputed: {} of {} plays in {:.3}ms",
            result.len(),
            plays.len(),
            self.stats.last_filter_time_ms
        );
        result
    }

    fn compute(&self, plays: &[Arc<Play>], state: &QueryState) -> QueryResult {
        let tokens = if self.settings.enable_search {
            state.search_tokens()
        } else {
            Vec::new()
        };
        let filter = self.settings.enable_filtering && !state.filters.is_empty();

        let mut out: Vec<Arc<Play>> = plays
            .iter()
            .filter(|play| {
                if !tokens.is_empty() {
                    let text = play.searchable_text();
                    if !tokens.iter().all(|t| text.contains(t.as_str())) {
                        return false;
                    }
                }
                !filter || state.filters.matches(play)
            })
            .cloned()
            .collect();

        if self.settings.enable_sorting {
            // Vec::sort_by is stable
            out.sort_by(|a, b| state.sorting.compare(a, b));
        }
        out.truncate(self.settings.max_items);
        out.into()
    }

    fn signature(state: &QueryState, version: u64) -> String {
        let sig = Signature { query: state, version };
        serde_json::to_string(&sig).unwrap_or_else(|_| format!("{:?}#{}", state, version))
    }

    /// Drop memoized results. Later evaluations return equal sequences.
    pub fn clear_cache(&mut self) {
        debug!("Query cache cleared ({} entries)", self.cache.len());
        self.cache.clear();
    }

    pub fn available_filters(plays: &[Arc<Play>]) -> AvailableFilters {
        let mut phases = IndexSet::new();
        let mut types = IndexSet::new();
        let mut difficulties = IndexSet::new();
        let mut formations = IndexSet::new();
        let mut tags = IndexSet::new();

        for play in plays {
            phases.insert(play.phase.clone());
            types.insert(play.play_type.clone());
            difficulties.insert(play.effective_difficulty().as_str().to_string());
            formations.insert(play.formation.clone());
            tags.extend(play.tags().iter().cloned());
        }

        AvailableFilters {
            phases: phases.into_iter().collect(),
            types: types.into_iter().collect(),
            difficulties: difficulties.into_iter().collect(),
            formations: formations.into_iter().collect(),
            tags: tags.into_iter().collect(),
        }
    }
}

fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}
