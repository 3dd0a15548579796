//! Debounced search commit.
//!
//! Keystrokes schedule a commit; only the last query survives once input has
//! been quiet for the configured delay:
//! 1. `schedule(query)` on every keystroke (replaces any pending query)
//! 2. `tick()` from the update loop returns the query once it is due
//!
//! Nothing fires on its own: no timers, no threads.

use std::time::{Duration, Instant};

/// Tick-driven debouncer for search text.
///
/// # Usage
/// ```ignore
/// // On input:
/// debouncer.schedule(text);
///
/// // In update loop:
/// if let Some(query) = debouncer.tick() {
///     apply_search(query);
/// }
/// ```
#[derive(Debug, Clone)]
pub struct SearchDebouncer {
    delay: Duration,
    /// Pending commit: (query, due time)
    pending: Option<(String, Instant)>,
}

impl Default for SearchDebouncer {
    fn default() -> Self {
        Self::new(300)
    }
}

impl SearchDebouncer {
    pub fn new(delay_ms: u64) -> Self {
        Self {
            delay: Duration::from_millis(delay_ms),
            pending: None,
        }
    }

    pub fn set_delay(&mut self, delay_ms: u64) {
        self.delay = Duration::from_millis(delay_ms);
    }

    pub fn delay_ms(&self) -> u64 {
        self.delay.as_millis() as u64
    }

    /// Schedule `query` for commit after the delay, replacing any pending one.
    pub fn schedule(&mut self, query: impl Into<String>) {
        self.schedule_at(query, Instant::now());
    }

    /// `schedule` with an explicit "now"
    pub fn schedule_at(&mut self, query: impl Into<String>, now: Instant) {
        let query = query.into();
        log::trace!(
            "SearchDebouncer: scheduled '{}' in {}ms",
            query,
            self.delay.as_millis()
        );
        self.pending = Some((query, now + self.delay));
    }

    pub fn cancel(&mut self) {
        if self.pending.take().is_some() {
            log::trace!("SearchDebouncer: cancelled pending search");
        }
    }

    /// Pending query if it is due now. Clears the pending state when it fires.
    pub fn tick(&mut self) -> Option<String> {
        self.tick_at(Instant::now())
    }

    pub fn tick_at(&mut self, now: Instant) -> Option<String> {
        let due = matches!(&self.pending, Some((_, due_at)) if now >= *due_at);
        if !due {
            return None;
        }
        let (query, _) = self.pending.take()?;
        log::trace!("SearchDebouncer: committing '{}'", query);
        Some(query)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn pending_query(&self) -> Option<&str> {
        self.pending.as_ref().map(|(query, _)| query.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_not_due_immediately() {
        let mut debouncer = SearchDebouncer::new(300);
        let t0 = Instant::now();
        debouncer.schedule_at("pass", t0);
        assert!(debouncer.is_pending());
        assert_eq!(debouncer.tick_at(t0 + ms(299)), None);
        assert_eq!(debouncer.tick_at(t0 + ms(300)), Some("pass".to_string()));
        assert!(!debouncer.is_pending());
        assert_eq!(debouncer.tick_at(t0 + ms(900)), None);
    }

    #[test]
    fn test_burst_commits_only_last_query() {
        let mut debouncer = SearchDebouncer::new(300);
        let t0 = Instant::now();
        let mut commits = Vec::new();

        for (i, text) in ["p", "pa", "pas", "pass"].iter().enumerate() {
            let now = t0 + ms(i as u64 * 50);
            commits.extend(debouncer.tick_at(now));
            debouncer.schedule_at(*text, now);
        }
        for step in 0..20 {
            commits.extend(debouncer.tick_at(t0 + ms(150 + step * 50)));
        }

        assert_eq!(commits, vec!["pass".to_string()]);
    }

    #[test]
    fn test_spaced_input_commits_each() {
        let mut debouncer = SearchDebouncer::new(300);
        let t0 = Instant::now();
        let mut commits = Vec::new();

        debouncer.schedule_at("run", t0);
        commits.extend(debouncer.tick_at(t0 + ms(301)));
        debouncer.schedule_at("run left", t0 + ms(400));
        commits.extend(debouncer.tick_at(t0 + ms(701)));

        assert_eq!(commits, vec!["run".to_string(), "run left".to_string()]);
    }

    #[test]
    fn test_cancel_drops_pending() {
        let mut debouncer = SearchDebouncer::new(10);
        debouncer.schedule("blitz");
        assert_eq!(debouncer.pending_query(), Some("blitz"));
        debouncer.cancel();
        std::thread::sleep(ms(15));
        assert_eq!(debouncer.tick(), None);
    }

    #[test]
    fn test_trigger_after_real_delay() {
        let mut debouncer = SearchDebouncer::new(10);
        debouncer.schedule("screen");
        std::thread::sleep(ms(15));
        assert_eq!(debouncer.tick(), Some("screen".to_string()));
    }
}
