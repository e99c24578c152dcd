//! Per-group metrics.
//!
//! Every [`Group`](crate::group::Group) owns a [`GroupMetrics`] made of atomic
//! counters that are bumped on the request path without locking.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                     GroupMetrics                        │
//! │  gets ─┬─ hot_hits                                      │
//! │        ├─ main_hits                                     │
//! │        └─ loads ─┬─ peer_loads   (peer_errors)          │
//! │                  └─ local_loads                         │
//! │  promotions, evictions                                  │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust
//! use macchiato::metrics::GroupMetrics;
//!
//! let metrics = GroupMetrics::new();
//! metrics.gets.inc();
//! metrics.main_hits.inc();
//!
//! let snapshot = metrics.snapshot();
//! assert_eq!(snapshot.hit_rate(), 1.0);
//! ```

mod counters;

pub use counters::Counter;

/// Request counters of a single group.
#[derive(Debug)]
pub struct GroupMetrics {
    /// Total `get` calls with a non-empty key.
    pub gets: Counter,
    /// Served from the hot tier.
    pub hot_hits: Counter,
    /// Served from the main tier.
    pub main_hits: Counter,
    /// Loads executed after coalescing.
    pub loads: Counter,
    /// Loads answered by a peer.
    pub peer_loads: Counter,
    /// Peer fetches that failed and fell back to the data source.
    pub peer_errors: Counter,
    /// Loads answered by the local data source.
    pub local_loads: Counter,
    /// Data source failures.
    pub local_errors: Counter,
    /// Keys promoted into the hot tier.
    pub promotions: Counter,
    /// Entries evicted from either tier.
    pub evictions: Counter,
}

impl GroupMetrics {
    pub fn new() -> Self {
        Self {
            gets: Counter::new("cache_gets_total", "Total get requests"),
            hot_hits: Counter::new("cache_hot_hits_total", "Hot tier hits"),
            main_hits: Counter::new("cache_main_hits_total", "Main tier hits"),
            loads: Counter::new("cache_loads_total", "Coalesced loads executed"),
            peer_loads: Counter::new("cache_peer_loads_total", "Loads served by a peer"),
            peer_errors: Counter::new("cache_peer_errors_total", "Failed peer fetches"),
            local_loads: Counter::new("cache_local_loads_total", "Loads served by the data source"),
            local_errors: Counter::new("cache_local_errors_total", "Failed data source calls"),
            promotions: Counter::new("cache_promotions_total", "Keys promoted to the hot tier"),
            evictions: Counter::new("cache_evictions_total", "Entries evicted from any tier"),
        }
    }

    /// Take a point-in-time snapshot.
    pub fn snapshot(&self) -> GroupStats {
        GroupStats {
            gets: self.gets.get(),
            hot_hits: self.hot_hits.get(),
            main_hits: self.main_hits.get(),
            loads: self.loads.get(),
            peer_loads: self.peer_loads.get(),
            peer_errors: self.peer_errors.get(),
            local_loads: self.local_loads.get(),
            local_errors: self.local_errors.get(),
            promotions: self.promotions.get(),
            evictions: self.evictions.get(),
        }
    }

    /// All counters in text exposition format, labelled with `group`.
    pub fn render(&self, group: &str) -> String {
        let mut out = String::new();
        for counter in self.counters() {
            counter.render(group, &mut out);
        }
        out
    }

    pub fn counters(&self) -> [&Counter; 10] {
        [
            &self.gets,
            &self.hot_hits,
            &self.main_hits,
            &self.loads,
            &self.peer_loads,
            &self.peer_errors,
            &self.local_loads,
            &self.local_errors,
            &self.promotions,
            &self.evictions,
        ]
    }
}

impl Default for GroupMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of a group's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GroupStats {
    pub gets: u64,
    pub hot_hits: u64,
    pub main_hits: u64,
    pub loads: u64,
    pub peer_loads: u64,
    pub peer_errors: u64,
    pub local_loads: u64,
    pub local_errors: u64,
    pub promotions: u64,
    pub evictions: u64,
}

impl GroupStats {
    /// Fraction of gets answered by either tier.
    pub fn hit_rate(&self) -> f64 {
        if self.gets == 0 {
            return 0.0;
        }
        (self.hot_hits + self.main_hits) as f64 / self.gets as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_and_hit_rate() {
        let metrics = GroupMetrics::new();
        assert_eq!(metrics.snapshot().hit_rate(), 0.0);

        for _ in 0..4 {
            metrics.gets.inc();
        }
        metrics.hot_hits.inc();
        metrics.main_hits.inc();
        metrics.loads.inc_by(2);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.gets, 4);
        assert_eq!(snapshot.loads, 2);
        assert!((snapshot.hit_rate() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_counter_names_unique() {
        let metrics = GroupMetrics::new();
        let mut names: Vec<_> = metrics.counters().iter().map(|c| c.name()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), 10);
    }

    #[test]
    fn test_render_lists_every_counter() {
        let metrics = GroupMetrics::new();
        metrics.gets.inc_by(2);
        metrics.promotions.inc();

        let text = metrics.render("scores");
        assert_eq!(text.lines().count(), 30);
        assert!(text.contains("cache_gets_total{group=\"scores\"} 2\n"));
        assert!(text.contains("cache_promotions_total{group=\"scores\"} 1\n"));
        assert!(text.contains("# HELP cache_evictions_total Entries evicted from any tier\n"));
    }
}
