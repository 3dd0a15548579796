//! Virtualized window over the filtered play list.
//!
//! Layout is a list of rows: one item per row in list mode, `grid_columns`
//! items per fixed-height row in grid mode. Row offsets are kept as prefix
//! sums, so `index_at` and the visible range are binary searches.
//!
//! `request_load` is the only async operation: it resolves thumbnails for a
//! range through the shared `ThumbnailCache` and marks the indices loaded.

use std::collections::BTreeSet;
use std::sync::Arc;

use futures::future::join_all;
use log::{debug, trace, warn};
use serde::{Deserialize, Serialize};

use super::thumbnail_cache::ThumbnailCache;
use crate::entities::{Play, ThumbnailOptions};
use crate::error::ThumbnailError;

/// Item and row geometry, in pixels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub base_height: f32,
    /// Extra height per wrapped description line when an item is expanded
    pub line_height: f32,
    pub chars_per_line: usize,
    pub tag_row_height: f32,
    pub grid_row_height: f32,
    pub grid_columns: usize,
    /// Report one extra sentinel row so the presentation layer asks for more
    pub infinite_scroll: bool,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            base_height: 120.0,
            line_height: 20.0,
            chars_per_line: 50,
            tag_row_height: 30.0,
            grid_row_height: 200.0,
            grid_columns: 2,
            infinite_scroll: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    List,
    Grid,
}

/// Scroll position, viewport and per-index flags
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WindowState {
    pub scroll_offset: f32,
    pub viewport_height: f32,
    pub loaded_indices: BTreeSet<usize>,
    pub expanded_indices: BTreeSet<usize>,
}

/// Outcome of `request_load`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    pub loaded: Vec<usize>,
    pub failed: Vec<(usize, ThumbnailError)>,
    /// Indices in range that were already loaded
    pub skipped: usize,
}

/// What item height depends on, captured at `sync`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct ItemShape {
    description_chars: usize,
    has_tags: bool,
}

pub struct WindowManager {
    layout: LayoutConfig,
    mode: ViewMode,
    overscan: usize,
    state: WindowState,
    ids: Vec<String>,
    shapes: Vec<ItemShape>,
    /// `offsets[r]` = top of row `r`; one trailing entry for the total height
    offsets: Vec<f32>,
}

impl WindowManager {
    pub fn new(layout: LayoutConfig, overscan: usize, viewport_height: f32) -> Self {
        Self {
            layout,
            mode: ViewMode::default(),
            overscan,
            state: WindowState {
                viewport_height: viewport_height.max(0.0),
                ..Default::default()
            },
            ids: Vec::new(),
            shapes: Vec::new(),
            offsets: vec![0.0],
        }
    }

    pub fn state(&self) -> &WindowState {
        &self.state
    }

    pub fn layout(&self) -> &LayoutConfig {
        &self.layout
    }

    pub fn mode(&self) -> ViewMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: ViewMode) {
        if self.mode != mode {
            self.mode = mode;
            self.rebuild_offsets();
        }
    }

    pub fn overscan(&self) -> usize {
        self.overscan
    }

    /// Number of real results currently laid out
    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    /// Rows the presentation layer should reserve; includes the sentinel row
    /// in infinite mode.
    pub fn item_count(&self) -> usize {
        if self.layout.infinite_scroll {
            self.len() + 1
        } else {
            self.len()
        }
    }

    /// Whether the row at `index` has data. The sentinel is never loaded.
    pub fn is_item_loaded(&self, index: usize) -> bool {
        !self.layout.infinite_scroll || index < self.len()
    }

    /// Whether the thumbnail for `index` has been resolved
    pub fn is_thumbnail_loaded(&self, index: usize) -> bool {
        self.state.loaded_indices.contains(&index)
    }

    fn columns(&self) -> usize {
        match self.mode {
            ViewMode::List => 1,
            ViewMode::Grid => self.layout.grid_columns.max(1),
        }
    }

    fn row_count(&self) -> usize {
        self.len().div_ceil(self.columns())
    }

    /// Height of the item at `index` (0 when out of range). In grid mode
    /// every item takes the fixed row height.
    pub fn item_height(&self, index: usize) -> f32 {
        let Some(shape) = self.shapes.get(index) else {
            return 0.0;
        };
        if self.mode == ViewMode::Grid {
            return self.layout.grid_row_height;
        }

        let mut height = self.layout.base_height;
        if shape.description_chars > 0 && self.state.expanded_indices.contains(&index) {
            let lines = shape.description_chars.div_ceil(self.layout.chars_per_line.max(1));
            height += lines as f32 * self.layout.line_height;
        }
        if shape.has_tags {
            height += self.layout.tag_row_height;
        }
        height
    }

    fn row_height(&self, row: usize) -> f32 {
        match self.mode {
            ViewMode::List => self.item_height(row),
            ViewMode::Grid => self.layout.grid_row_height,
        }
    }

    fn rebuild_offsets(&mut self) {
        let rows = self.row_count();
        let mut offsets = Vec::with_capacity(rows + 1);
        let mut acc = 0.0;
        offsets.push(acc);
        for row in 0..rows {
            acc += self.row_height(row);
            offsets.push(acc);
        }
        self.offsets = offsets;
    }

    pub fn total_height(&self) -> f32 {
        self.offsets.last().copied().unwrap_or(0.0)
    }

    /// Top edge of the item at `index` (clamped to the end of the list)
    pub fn offset_of(&self, index: usize) -> f32 {
        let row = (index / self.columns()).min(self.row_count());
        self.offsets[row]
    }

    fn row_at(&self, offset: f32) -> usize {
        let rows = self.row_count();
        self.offsets[..rows]
            .partition_point(|&top| top <= offset)
            .saturating_sub(1)
    }

    /// First item of the row covering `offset`
    pub fn index_at(&self, offset: f32) -> usize {
        self.row_at(offset) * self.columns()
    }

    fn strict_rows(&self, scroll_offset: f32, viewport_height: f32) -> Option<(usize, usize)> {
        let rows = self.row_count();
        if rows == 0 {
            return None;
        }
        let scroll = sanitize(scroll_offset);
        let bottom = scroll + sanitize(viewport_height);
        let first = self.row_at(scroll);
        let last = self.offsets[..rows]
            .partition_point(|&top| top < bottom)
            .saturating_sub(1)
            .max(first);
        Some((first, last))
    }

    fn rows_to_items(&self, first_row: usize, last_row: usize) -> (usize, usize) {
        let cols = self.columns();
        let end = ((last_row + 1) * cols).min(self.len());
        (first_row * cols, end.saturating_sub(1))
    }

    /// Inclusive index range intersecting the viewport, without overscan.
    pub fn strict_range(&self, scroll_offset: f32, viewport_height: f32) -> Option<(usize, usize)> {
        self.strict_rows(scroll_offset, viewport_height)
            .map(|(first, last)| self.rows_to_items(first, last))
    }

    /// Inclusive index range to render: the strict range widened by
    /// `overscan` rows on both sides, clamped to the list.
    pub fn visible_range(&self, scroll_offset: f32, viewport_height: f32) -> Option<(usize, usize)> {
        let (first, last) = self.strict_rows(scroll_offset, viewport_height)?;
        let first = first.saturating_sub(self.overscan);
        let last = (last + self.overscan).min(self.row_count() - 1);
        Some(self.rows_to_items(first, last))
    }

    /// `visible_range` at the current scroll position and viewport
    pub fn current_range(&self) -> Option<(usize, usize)> {
        self.visible_range(self.state.scroll_offset, self.state.viewport_height)
    }

    pub fn set_viewport_height(&mut self, height: f32) {
        self.state.viewport_height = sanitize(height);
    }

    /// Move the scroll position. Loads nothing.
    pub fn scroll_to(&mut self, offset: f32) {
        self.state.scroll_offset = sanitize(offset);
    }

    pub fn scroll_to_top(&mut self) {
        self.scroll_to(0.0);
    }

    pub fn scroll_to_index(&mut self, index: usize) {
        self.scroll_to(self.offset_of(index));
    }

    pub fn set_expanded(&mut self, index: usize, expanded: bool) {
        let changed = if expanded {
            self.state.expanded_indices.insert(index)
        } else {
            self.state.expanded_indices.remove(&index)
        };
        if changed {
            self.rebuild_offsets();
        }
    }

    pub fn mark_loaded(&mut self, index: usize) {
        self.state.loaded_indices.insert(index);
    }

    /// Un-mark the row showing play `id` so the next load fetches it again.
    /// Returns its index, if the play is laid out.
    pub fn invalidate(&mut self, id: &str) -> Option<usize> {
        let index = self.ids.iter().position(|laid_out| laid_out == id)?;
        self.state.loaded_indices.remove(&index);
        Some(index)
    }

    /// Adopt a new result sequence. Per-index flags are dropped when the
    /// sequence of ids changed. Returns whether it did.
    pub fn sync(&mut self, plays: &[Arc<Play>]) -> bool {
        let identity_changed =
            self.ids.len() != plays.len() || self.ids.iter().zip(plays).any(|(id, p)| *id != p.id);

        if identity_changed {
            self.ids = plays.iter().map(|p| p.id.clone()).collect();
            self.state.loaded_indices.clear();
            self.state.expanded_indices.clear();
            trace!("Window reset for {} results", plays.len());
        }

        self.shapes = plays
            .iter()
            .map(|p| ItemShape {
                description_chars: p.description.as_deref().map_or(0, |d| d.chars().count()),
                has_tags: !p.tags().is_empty(),
            })
            .collect();
        self.rebuild_offsets();

        let max_scroll = (self.total_height() - self.state.viewport_height).max(0.0);
        if self.state.scroll_offset > max_scroll {
            self.state.scroll_offset = max_scroll;
        }
        identity_changed
    }

    /// Resolve thumbnails for `start..=end`, skipping indices already loaded.
    ///
    /// Successful indices are marked loaded. Failures are returned and the
    /// item stays a placeholder.
    pub async fn request_load(
        &mut self,
        plays: &[Arc<Play>],
        start: usize,
        end: usize,
        cache: &ThumbnailCache,
        options: &ThumbnailOptions,
    ) -> LoadReport {
        let mut report = LoadReport::default();
        let last = end.min(plays.len().saturating_sub(1));
        if plays.is_empty() || start > last {
            return report;
        }

        let pending: Vec<usize> = (start..=last)
            .filter(|i| {
                let loaded = self.state.loaded_indices.contains(i);
                if loaded {
                    report.skipped += 1;
                }
                !loaded
            })
            .collect();

        for chunk in pending.chunks(cache.batch_size()) {
            let results = join_all(chunk.iter().map(|&i| cache.get(&plays[i], options))).await;
            for (&index, result) in chunk.iter().zip(results) {
                match result {
                    Ok(_) => {
                        self.state.loaded_indices.insert(index);
                        report.loaded.push(index);
                    }
                    Err(e) => {
                        warn!("Thumbnail for row {} ({}) failed: {}", index, plays[index].id, e);
                        report.failed.push((index, e));
                    }
                }
            }
        }

        debug!(
            "Loaded rows {}..={}: {} new, {} failed, {} cached",
            start,
            last,
            report.loaded.len(),
            report.failed.len(),
            report.skipped
        );
        report
    }
}

/// Negative and NaN offsets become 0
fn sanitize(value: f32) -> f32 {
    if value.is_nan() { 0.0 } else { value.max(0.0) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::bounded_cache::EvictionPolicy;
    use chrono::{TimeZone, Utc};
    use futures::executor::block_on;

    fn plays(n: usize) -> Vec<Arc<Play>> {
        let created = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        (0..n)
            .map(|i| Arc::new(Play::new(format!("p{}", i), format!("Play {}", i), created)))
            .collect()
    }

    fn uniform(n: usize, overscan: usize) -> WindowManager {
        let mut window = WindowManager::new(LayoutConfig::default(), overscan, 600.0);
        window.sync(&plays(n));
        window
    }

    #[test]
    fn test_uniform_window_at_top() {
        let window = uniform(1000, 5);
        // ceil(600 / 120) = 5 rows, plus 5 overscan below
        assert_eq!(window.strict_range(0.0, 600.0), Some((0, 4)));
        assert_eq!(window.visible_range(0.0, 600.0), Some((0, 9)));
        assert_eq!(window.total_height(), 120_000.0);
    }

    #[test]
    fn test_uniform_window_mid_list() {
        let window = uniform(1000, 5);
        // scroll 1200 = row 10
        assert_eq!(window.strict_range(1200.0, 600.0), Some((10, 14)));
        assert_eq!(window.visible_range(1200.0, 600.0), Some((5, 19)));
        assert_eq!(window.index_at(1259.0), 10);
    }

    #[test]
    fn test_window_clamps_at_end() {
        let window = uniform(20, 5);
        let bottom = window.total_height() - 600.0;
        assert_eq!(window.visible_range(bottom, 600.0), Some((10, 19)));
        assert_eq!(window.visible_range(1e9, 600.0), Some((14, 19)));
        assert_eq!(uniform(0, 5).visible_range(0.0, 600.0), None);
    }

    #[test]
    fn test_variable_heights() {
        let created = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let list = vec![
            Arc::new(Play::new("a", "A", created)),
            Arc::new(Play::new("b", "B", created).with_tags(["x"])),
            Arc::new(Play::new("c", "C", created).with_description("d".repeat(120))),
        ];
        let mut window = WindowManager::new(LayoutConfig::default(), 0, 200.0);
        window.sync(&list);

        assert_eq!(window.item_height(0), 120.0);
        assert_eq!(window.item_height(1), 150.0);
        assert_eq!(window.item_height(2), 120.0);
        assert_eq!(window.offset_of(2), 270.0);

        // 120 chars at 50 per line = 3 extra lines
        window.set_expanded(2, true);
        assert_eq!(window.item_height(2), 180.0);
        assert_eq!(window.total_height(), 450.0);
        assert_eq!(window.index_at(269.9), 1);
        assert_eq!(window.index_at(270.0), 2);
        assert_eq!(window.strict_range(100.0, 200.0), Some((0, 2)));
    }

    #[test]
    fn test_expanding_without_description_adds_nothing() {
        let mut window = uniform(3, 0);
        window.set_expanded(1, true);
        assert_eq!(window.item_height(1), 120.0);
        assert_eq!(window.item_height(99), 0.0);
    }

    #[test]
    fn test_grid_mode_rows() {
        let mut window = uniform(9, 1);
        window.set_mode(ViewMode::Grid);
        // 5 rows of 200
        assert_eq!(window.total_height(), 1000.0);
        assert_eq!(window.item_height(3), 200.0);
        assert_eq!(window.offset_of(3), 200.0);
        assert_eq!(window.index_at(450.0), 4);
        assert_eq!(window.strict_range(200.0, 400.0), Some((2, 5)));
        assert_eq!(window.visible_range(200.0, 400.0), Some((0, 7)));
        // Last row holds a single item
        assert_eq!(window.visible_range(800.0, 400.0), Some((6, 8)));
    }

    #[test]
    fn test_infinite_sentinel() {
        let window = uniform(3, 0);
        assert_eq!(window.item_count(), 4);
        assert!(window.is_item_loaded(2));
        assert!(!window.is_item_loaded(3));

        let layout = LayoutConfig {
            infinite_scroll: false,
            ..Default::default()
        };
        let mut finite = WindowManager::new(layout, 0, 100.0);
        finite.sync(&plays(3));
        assert_eq!(finite.item_count(), 3);
        assert!(finite.is_item_loaded(3));
    }

    #[test]
    fn test_scroll_has_no_side_effects() {
        let mut window = uniform(50, 5);
        window.scroll_to(-40.0);
        assert_eq!(window.state().scroll_offset, 0.0);
        window.scroll_to_index(10);
        assert_eq!(window.state().scroll_offset, 1200.0);
        assert!(window.state().loaded_indices.is_empty());
        window.scroll_to_top();
        assert_eq!(window.current_range(), Some((0, 9)));
    }

    #[test]
    fn test_sync_resets_flags_on_identity_change() {
        let list = plays(30);
        let mut window = WindowManager::new(LayoutConfig::default(), 0, 600.0);
        window.sync(&list);
        window.mark_loaded(3);
        window.set_expanded(4, true);
        window.scroll_to(3000.0);

        assert!(!window.sync(&list));
        assert!(window.is_thumbnail_loaded(3));

        let shorter: Vec<Arc<Play>> = list[..5].to_vec();
        assert!(window.sync(&shorter));
        assert!(!window.is_thumbnail_loaded(3));
        assert!(window.state().expanded_indices.is_empty());
        // 5 * 120 = 600 fits the viewport
        assert_eq!(window.state().scroll_offset, 0.0);
    }

    #[test]
    fn test_request_load_marks_loaded_and_skips_known() {
        let list = plays(8);
        let mut window = WindowManager::new(LayoutConfig::default(), 0, 600.0);
        window.sync(&list);
        let cache = ThumbnailCache::new(20, EvictionPolicy::default(), 3).unwrap();
        let options = ThumbnailOptions::default().sized(20, 12);

        let report = block_on(window.request_load(&list, 0, 4, &cache, &options));
        assert_eq!(report.loaded, vec![0, 1, 2, 3, 4]);
        assert!(window.is_thumbnail_loaded(4));

        let again = block_on(window.request_load(&list, 3, 100, &cache, &options));
        assert_eq!(again.skipped, 2);
        assert_eq!(again.loaded, vec![5, 6, 7]);
        assert_eq!(cache.stats().renders, 8);
    }

    #[test]
    fn test_invalidate_unmarks_one_row() {
        let list = plays(4);
        let mut window = WindowManager::new(LayoutConfig::default(), 0, 600.0);
        window.sync(&list);
        (0..4).for_each(|i| window.mark_loaded(i));

        assert_eq!(window.invalidate("p2"), Some(2));
        assert!(!window.is_thumbnail_loaded(2));
        assert!(window.is_thumbnail_loaded(3));
        assert_eq!(window.invalidate("missing"), None);
    }

    #[test]
    fn test_request_load_failures_stay_placeholders() {
        let list = plays(2);
        let mut window = WindowManager::new(LayoutConfig::default(), 0, 600.0);
        window.sync(&list);
        let cache = ThumbnailCache::default();
        let bad = ThumbnailOptions::default().sized(0, 0);

        let report = block_on(window.request_load(&list, 0, 1, &cache, &bad));
        assert_eq!(report.failed.len(), 2);
        assert!(!window.is_thumbnail_loaded(0));
    }
}
