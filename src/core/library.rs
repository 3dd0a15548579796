//! PlayLibrary - coordinator over the play collection.
//!
//! Owns the collection, the current query, the window and the counters.
//! Every mutation bumps `collection_version`, which is part of the query
//! cache key, and emits a `LibraryEvent`.
//!
//! Data flow: mutation → QueryEngine (cached or recomputed view) →
//! WindowManager (visible slice) → ThumbnailCache (on `load_visible`).

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use log::{debug, info, trace};

use super::event_bus::{EventBus, LibraryEvent};
use super::metrics::PerformanceMetrics;
use super::query_engine::{AvailableFilters, QueryEngine, QueryResult};
use super::search_debouncer::SearchDebouncer;
use super::thumbnail_cache::ThumbnailCache;
use super::window::{LoadReport, ViewMode, WindowManager};
use crate::config::LibraryConfig;
use crate::entities::{
    DateRange, FilterField, FilterState, Play, PlayPatch, QueryState, SortDirection, SortField, SortState,
    ThumbnailOptions,
};
use crate::error::EngineError;

pub const DEFAULT_VIEWPORT_HEIGHT: f32 = 600.0;

#[derive(Debug, Clone, Copy, Default)]
struct Counters {
    render_count: u64,
    search_count: u64,
    scroll_events: u64,
    thumbnail_loads: u64,
    thumbnail_errors: u64,
}

pub struct PlayLibrary {
    config: LibraryConfig,
    plays: Vec<Arc<Play>>,
    collection_version: u64,
    query: QueryState,
    engine: QueryEngine,
    window: WindowManager,
    debouncer: SearchDebouncer,
    thumbnails: Arc<ThumbnailCache>,
    events: EventBus,
    selected: Option<String>,
    loading: bool,
    error: Option<String>,
    counters: Counters,
}

impl PlayLibrary {
    pub fn new(plays: Vec<Play>, config: LibraryConfig, thumbnails: Arc<ThumbnailCache>) -> Result<Self, EngineError> {
        config.validate()?;
        let engine = QueryEngine::new(config.query_settings())?;
        let window = WindowManager::new(config.layout.clone(), config.overscan, DEFAULT_VIEWPORT_HEIGHT);
        let debouncer = SearchDebouncer::new(config.debounce_ms);
        info!(
            "PlayLibrary: {} plays, max_items={}, debounce={}ms, eviction={:?}",
            plays.len(),
            config.max_items,
            config.debounce_ms,
            config.eviction_policy
        );

        Ok(Self {
            config,
            plays: plays.into_iter().map(Arc::new).collect(),
            collection_version: 0,
            query: QueryState::default(),
            engine,
            window,
            debouncer,
            thumbnails,
            events: EventBus::new(),
            selected: None,
            loading: false,
            error: None,
            counters: Counters::default(),
        })
    }

    // ========== Accessors ==========

    pub fn config(&self) -> &LibraryConfig {
        &self.config
    }

    pub fn plays(&self) -> &[Arc<Play>] {
        &self.plays
    }

    pub fn get(&self, id: &str) -> Option<&Arc<Play>> {
        self.plays.iter().find(|p| p.id == id)
    }

    pub fn collection_version(&self) -> u64 {
        self.collection_version
    }

    pub fn query(&self) -> &QueryState {
        &self.query
    }

    pub fn window(&self) -> &WindowManager {
        &self.window
    }

    pub fn window_mut(&mut self) -> &mut WindowManager {
        &mut self.window
    }

    pub fn thumbnails(&self) -> &Arc<ThumbnailCache> {
        &self.thumbnails
    }

    /// Handle for subscribing to or polling mutation events
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    // ========== Mutations ==========

    fn bump_version(&mut self) {
        self.collection_version += 1;
        trace!("Collection version {}", self.collection_version);
    }

    /// Insert at the front of the collection.
    pub fn add_play(&mut self, play: Play) {
        let play = Arc::new(play);
        debug!("Play added: {}", play.id);
        self.plays.insert(0, Arc::clone(&play));
        self.bump_version();
        self.events.emit(LibraryEvent::PlayAdded(play));
    }

    /// Apply `patch` to the play with `id`. Returns false if there is none.
    ///
    /// Its cached thumbnails are dropped and its row is reloaded on the next
    /// `load_visible`.
    pub fn update_play(&mut self, id: &str, patch: &PlayPatch) -> bool {
        let Some(slot) = self.plays.iter_mut().find(|p| p.id == id) else {
            return false;
        };
        patch.apply(Arc::make_mut(slot));
        let updated = Arc::clone(slot);
        debug!("Play updated: {}", id);
        if !patch.is_empty() {
            self.thumbnails.invalidate(id);
            self.window.invalidate(id);
        }
        self.bump_version();
        self.events.emit(LibraryEvent::PlayUpdated(updated));
        true
    }

    /// Remove the play with `id`, clearing the selection if it pointed there.
    pub fn remove_play(&mut self, id: &str) -> bool {
        let before = self.plays.len();
        self.plays.retain(|p| p.id != id);
        if self.plays.len() == before {
            return false;
        }
        if self.selected.as_deref() == Some(id) {
            self.selected = None;
        }
        self.thumbnails.invalidate(id);
        debug!("Play removed: {}", id);
        self.bump_version();
        self.events.emit(LibraryEvent::PlayRemoved { id: id.to_string() });
        true
    }

    // ========== Search ==========

    /// Schedule a debounced search commit, replacing any pending one.
    pub fn set_search_query(&mut self, text: impl Into<String>) {
        self.debouncer.schedule(text);
    }

    pub fn set_search_query_at(&mut self, text: impl Into<String>, now: Instant) {
        self.debouncer.schedule_at(text, now);
    }

    /// Commit the pending search if it is due. Returns whether it did.
    pub fn tick(&mut self) -> bool {
        self.tick_at(Instant::now())
    }

    pub fn tick_at(&mut self, now: Instant) -> bool {
        match self.debouncer.tick_at(now) {
            Some(query) => {
                self.apply_search(query);
                true
            }
            None => false,
        }
    }

    /// Apply `text` immediately, dropping any pending debounced query.
    pub fn commit_search_now(&mut self, text: impl Into<String>) {
        self.debouncer.cancel();
        self.apply_search(text.into());
    }

    pub fn cancel_pending_search(&mut self) {
        self.debouncer.cancel();
    }

    pub fn has_pending_search(&self) -> bool {
        self.debouncer.is_pending()
    }

    fn apply_search(&mut self, query: String) {
        self.counters.search_count += 1;
        debug!("Search committed: '{}'", query);
        self.query.search_query = query.clone();
        self.events.emit(LibraryEvent::SearchCommitted { query });
    }

    // ========== Filters & sorting ==========

    pub fn set_filters(&mut self, filters: FilterState) {
        self.query.filters = filters;
    }

    pub fn update_filter<I, S>(&mut self, field: FilterField, values: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.query.filters.set(field, values);
    }

    pub fn set_date_range(&mut self, start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) {
        self.query.filters.date_range = DateRange::new(start, end);
    }

    pub fn set_sorting(&mut self, sorting: SortState) {
        self.query.sorting = sorting;
    }

    /// Same field while ascending flips to descending; anything else sorts
    /// ascending on `field`.
    pub fn toggle_sorting(&mut self, field: SortField) {
        let current = &self.query.sorting;
        let direction = if current.field == field && current.direction == SortDirection::Asc {
            SortDirection::Desc
        } else {
            SortDirection::Asc
        };
        self.query.sorting = SortState::new(field, direction);
    }

    /// Clear filters and search, restore newest-first sorting.
    pub fn reset_filters(&mut self) {
        self.debouncer.cancel();
        self.query = QueryState::default();
    }

    // ========== Selection & flags ==========

    pub fn select(&mut self, id: Option<&str>) {
        self.selected = id.map(str::to_string);
    }

    pub fn reset_selection(&mut self) {
        self.selected = None;
    }

    pub fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
    }

    pub fn set_error(&mut self, error: Option<String>) {
        self.error = error;
    }

    // ========== Derived state ==========

    /// Current filtered and sorted view; the window follows it.
    pub fn filtered_plays(&mut self) -> QueryResult {
        let result = self.engine.evaluate(&self.plays, &self.query, self.collection_version);
        self.window.sync(&result);
        result
    }

    pub fn available_filters(&self) -> AvailableFilters {
        QueryEngine::available_filters(&self.plays)
    }

    /// `(index, play)` pairs inside the current window, overscan included
    pub fn visible_plays(&mut self) -> Vec<(usize, Arc<Play>)> {
        let result = self.filtered_plays();
        match self.window.current_range() {
            Some((start, end)) => (start..=end).map(|i| (i, Arc::clone(&result[i]))).collect(),
            None => Vec::new(),
        }
    }

    // ========== Window ==========

    pub fn on_scroll(&mut self, offset: f32) {
        self.counters.scroll_events += 1;
        self.window.scroll_to(offset);
    }

    pub fn scroll_to_top(&mut self) {
        self.window.scroll_to_top();
    }

    pub fn set_viewport_height(&mut self, height: f32) {
        self.window.set_viewport_height(height);
    }

    pub fn set_view_mode(&mut self, mode: ViewMode) {
        self.window.set_mode(mode);
    }

    pub fn toggle_expanded(&mut self, index: usize) {
        let expanded = self.window.state().expanded_indices.contains(&index);
        self.window.set_expanded(index, !expanded);
    }

    /// Resolve thumbnails for the current window.
    ///
    /// Each newly loaded play gets its `thumbnail` data URL in the
    /// collection. That field is not part of the query, so the collection
    /// version stays put and earlier query results keep their old copies.
    pub async fn load_visible(&mut self, options: &ThumbnailOptions) -> LoadReport {
        let result = self.filtered_plays();
        let Some((start, end)) = self.window.current_range() else {
            return LoadReport::default();
        };
        let report = self
            .window
            .request_load(&result, start, end, &self.thumbnails, options)
            .await;
        for &index in &report.loaded {
            self.attach_thumbnail(&result[index].id, options);
        }
        self.counters.thumbnail_loads += report.loaded.len() as u64;
        self.counters.thumbnail_errors += report.failed.len() as u64;
        report
    }

    fn attach_thumbnail(&mut self, id: &str, options: &ThumbnailOptions) {
        let Some(thumb) = self.thumbnails.peek(id, options) else {
            return;
        };
        if let Some(slot) = self.plays.iter_mut().find(|p| p.id == id) {
            Arc::make_mut(slot).thumbnail = Some(thumb.to_data_url());
        }
    }

    // ========== Metrics & cache ==========

    pub fn record_render(&mut self) {
        self.counters.render_count += 1;
    }

    pub fn performance_metrics(&self) -> PerformanceMetrics {
        let stats = self.engine.stats();
        PerformanceMetrics {
            render_count: self.counters.render_count,
            filter_count: stats.filter_count,
            search_count: self.counters.search_count,
            cache_hits: stats.cache_hits,
            cache_misses: stats.cache_misses,
            last_filter_time_ms: stats.last_filter_time_ms,
            average_filter_time_ms: stats.average_filter_time_ms,
            cache_size: self.engine.cache_len(),
            cache_hit_rate: stats.hit_rate(),
            memory_usage: self.thumbnails.stats().memory_estimate,
            scroll_events: self.counters.scroll_events,
            thumbnail_loads: self.counters.thumbnail_loads,
            thumbnail_errors: self.counters.thumbnail_errors,
        }
    }

    /// Clear the query cache and the thumbnail cache.
    pub fn clear_cache(&mut self) {
        self.engine.clear_cache();
        self.thumbnails.clear();
        self.events.emit(LibraryEvent::CacheCleared);
    }
}

impl Drop for PlayLibrary {
    fn drop(&mut self) {
        self.debouncer.cancel();
    }
}
