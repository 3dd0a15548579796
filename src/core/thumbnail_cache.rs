//! Bounded cache of rendered play thumbnails.
//!
//! Structure:
//! - `entries`: BoundedCache keyed by (play id, serialized options)
//! - `in_flight`: one shared render future per key currently being produced
//!
//! Concurrent `get`s for the same key await the same shared future, so a
//! thumbnail is rendered at most once at a time. The lock is never held
//! across an `.await`.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::future::{BoxFuture, FutureExt, Shared, join_all};
use log::{debug, trace, warn};

use super::bounded_cache::{BoundedCache, CacheStats, EvictionPolicy};
use crate::entities::{Play, Thumbnail, ThumbnailOptions};
use crate::error::{EngineError, ThumbnailError};
use crate::render::render_thumbnail;
use crate::utils::yield_now;

pub const DEFAULT_CAPACITY: usize = 100;
pub const DEFAULT_BATCH_SIZE: usize = 5;

type SharedRender = Shared<BoxFuture<'static, Result<Thumbnail, ThumbnailError>>>;

/// Cache key: play id plus the exact options the thumbnail was rendered with
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ThumbnailKey {
    play_id: String,
    options: String,
}

impl ThumbnailKey {
    pub fn new(play_id: &str, options: &ThumbnailOptions) -> Self {
        let options = serde_json::to_string(options).unwrap_or_else(|_| format!("{:?}", options));
        Self {
            play_id: play_id.to_string(),
            options,
        }
    }

    pub fn play_id(&self) -> &str {
        &self.play_id
    }
}

/// Snapshot of cache state and counters
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ThumbnailStats {
    pub size: usize,
    pub capacity: usize,
    /// Sum of encoded thumbnail sizes in bytes
    pub memory_estimate: usize,
    pub hits: u64,
    pub misses: u64,
    pub renders: u64,
    pub errors: u64,
    pub hit_rate: f64,
}

/// Outcome of a best-effort preload
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreloadReport {
    pub requested: usize,
    pub loaded: usize,
    pub failed: usize,
}

struct CacheInner {
    entries: BoundedCache<ThumbnailKey, Thumbnail>,
    in_flight: HashMap<ThumbnailKey, SharedRender>,
}

pub struct ThumbnailCache {
    inner: Mutex<CacheInner>,
    stats: CacheStats,
    renders: AtomicU64,
    errors: AtomicU64,
    batch_size: usize,
}

impl ThumbnailCache {
    pub fn new(capacity: usize, policy: EvictionPolicy, batch_size: usize) -> Result<Self, EngineError> {
        if batch_size == 0 {
            return Err(EngineError::InvalidCapacity { what: "thumbnail preload batch" });
        }
        Ok(Self {
            inner: Mutex::new(CacheInner {
                entries: BoundedCache::new(capacity, policy)?,
                in_flight: HashMap::new(),
            }),
            stats: CacheStats::new(),
            renders: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            batch_size,
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CacheInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Cached thumbnail for `play`, rendering it on a miss.
    pub async fn get(&self, play: &Play, options: &ThumbnailOptions) -> Result<Thumbnail, ThumbnailError> {
        let key = ThumbnailKey::new(&play.id, options);

        let render = {
            let mut inner = self.lock();
            if let Some(thumb) = inner.entries.get(&key) {
                self.stats.record_hit();
                trace!("Thumbnail cache hit: {}", key.play_id);
                return Ok(thumb.clone());
            }
            self.stats.record_miss();

            match inner.in_flight.get(&key) {
                Some(pending) => {
                    trace!("Joining in-flight render: {}", key.play_id);
                    pending.clone()
                }
                None => {
                    let render = self.spawn_render(play, options);
                    inner.in_flight.insert(key.clone(), render.clone());
                    render
                }
            }
        };

        let result = render.clone().await;
        self.finish(key, &render, &result);
        result
    }

    /// Thumbnail at custom pixel dimensions, otherwise using `options`
    pub async fn get_sized(
        &self,
        play: &Play,
        width: u32,
        height: u32,
        options: &ThumbnailOptions,
    ) -> Result<Thumbnail, ThumbnailError> {
        self.get(play, &options.sized(width, height)).await
    }

    fn spawn_render(&self, play: &Play, options: &ThumbnailOptions) -> SharedRender {
        self.renders.fetch_add(1, Ordering::Relaxed);
        let play = play.clone();
        let options = options.clone();
        async move {
            // Give concurrent requests for the same key a chance to join
            yield_now().await;
            render_thumbnail(&play, &options)
        }
        .boxed()
        .shared()
    }

    /// Retire the in-flight entry. Only the first waiter to get here stores
    /// the result, so each render is stored or counted as an error once.
    fn finish(&self, key: ThumbnailKey, render: &SharedRender, result: &Result<Thumbnail, ThumbnailError>) {
        let mut inner = self.lock();
        let owns_entry = inner
            .in_flight
            .get(&key)
            .map(|pending| pending.ptr_eq(render))
            .unwrap_or(false);
        if !owns_entry {
            return;
        }
        inner.in_flight.remove(&key);

        match result {
            Ok(thumb) => {
                if inner.entries.contains(&key) {
                    return;
                }
                debug!("Thumbnail cached: {} ({} bytes)", key.play_id, thumb.len());
                for (evicted, _) in inner.entries.insert(key, thumb.clone()) {
                    debug!("Thumbnail evicted: {}", evicted.play_id);
                }
            }
            Err(_) => {
                self.errors.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Best-effort warmup, `batch_size` plays at a time. Failures are logged
    /// and counted, never propagated.
    pub async fn preload(&self, plays: &[&Play], options: &ThumbnailOptions) -> PreloadReport {
        let mut report = PreloadReport {
            requested: plays.len(),
            ..Default::default()
        };
        for (i, chunk) in plays.chunks(self.batch_size).enumerate() {
            if i > 0 {
                yield_now().await;
            }
            let results = join_all(chunk.iter().map(|play| self.get(play, options))).await;
            for (play, result) in chunk.iter().zip(results) {
                match result {
                    Ok(_) => report.loaded += 1,
                    Err(e) => {
                        warn!("Failed to preload thumbnail for play {}: {}", play.id, e);
                        report.failed += 1;
                    }
                }
            }
        }
        debug!(
            "Preload done: {}/{} loaded, {} failed",
            report.loaded, report.requested, report.failed
        );
        report
    }

    /// Thumbnails for many plays, keyed by play id. Failed plays are omitted.
    pub async fn generate_batch(&self, plays: &[&Play], options: &ThumbnailOptions) -> HashMap<String, Thumbnail> {
        let mut out = HashMap::with_capacity(plays.len());
        for (i, chunk) in plays.chunks(self.batch_size).enumerate() {
            if i > 0 {
                yield_now().await;
            }
            let results = join_all(chunk.iter().map(|play| self.get(play, options))).await;
            for (play, result) in chunk.iter().zip(results) {
                match result {
                    Ok(thumb) => {
                        out.insert(play.id.clone(), thumb);
                    }
                    Err(e) => warn!("Failed to generate thumbnail for play {}: {}", play.id, e),
                }
            }
        }
        out
    }

    /// Lookup without touching counters or eviction order
    pub fn peek(&self, play_id: &str, options: &ThumbnailOptions) -> Option<Thumbnail> {
        self.lock().entries.peek(&ThumbnailKey::new(play_id, options)).cloned()
    }

    /// Drop every cached or in-flight thumbnail of `play_id`, whatever the
    /// options. A render still in flight is not stored when it completes.
    pub fn invalidate(&self, play_id: &str) -> usize {
        let mut inner = self.lock();
        let stale: Vec<ThumbnailKey> = inner
            .entries
            .keys()
            .filter(|key| key.play_id == play_id)
            .cloned()
            .collect();
        for key in &stale {
            inner.entries.remove(key);
        }
        inner.in_flight.retain(|key, _| key.play_id != play_id);
        if !stale.is_empty() {
            debug!("Thumbnails invalidated: {} ({} entries)", play_id, stale.len());
        }
        stale.len()
    }

    pub fn clear(&self) {
        let mut inner = self.lock();
        debug!("Thumbnail cache cleared ({} entries)", inner.entries.len());
        inner.entries.clear();
    }

    /// Change capacity at runtime; shrinking evicts immediately.
    pub fn set_capacity(&self, capacity: usize) -> Result<(), EngineError> {
        let evicted = self.lock().entries.set_capacity(capacity)?;
        debug!(
            "Thumbnail cache capacity set to {} ({} evicted)",
            capacity,
            evicted.len()
        );
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn stats(&self) -> ThumbnailStats {
        let inner = self.lock();
        ThumbnailStats {
            size: inner.entries.len(),
            capacity: inner.entries.capacity(),
            memory_estimate: inner.entries.values().map(Thumbnail::len).sum(),
            hits: self.stats.hits(),
            misses: self.stats.misses(),
            renders: self.renders.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            hit_rate: self.stats.hit_rate(),
        }
    }
}

impl Default for ThumbnailCache {
    fn default() -> Self {
        Self {
            inner: Mutex::new(CacheInner {
                entries: BoundedCache::with_capacity(
                    NonZeroUsize::new(DEFAULT_CAPACITY).unwrap_or(NonZeroUsize::MIN),
                    EvictionPolicy::default(),
                ),
                in_flight: HashMap::new(),
            }),
            stats: CacheStats::new(),
            renders: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}
