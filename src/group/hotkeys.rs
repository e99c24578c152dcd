//! Remote-hit bookkeeping for hot-key promotion.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Tracked keys idle for this long are dropped on the next prune.
pub const IDLE_EXPIRY: Duration = Duration::from_secs(5 * 60);

/// Smallest map size that triggers a prune.
const MIN_PRUNE_AT: usize = 1024;

/// Statistics of one key fetched from peers.
#[derive(Debug, Clone, Copy)]
struct KeyStats {
    first_seen: Instant,
    last_seen: Instant,
    remote_calls: u64,
}

impl KeyStats {
    /// Remote calls per minute since the key was first seen. Elapsed time is
    /// rounded to whole minutes, with a floor of one.
    fn qps(&self, now: Instant) -> u64 {
        let elapsed = now.saturating_duration_since(self.first_seen).as_secs_f64();
        let minutes = ((elapsed / 60.0).round() as u64).max(1);
        self.remote_calls / minutes
    }
}

#[derive(Debug)]
struct Tracked {
    keys: HashMap<String, KeyStats>,
    /// Map size at which idle keys are pruned next.
    prune_at: usize,
}

/// Decides when a key fetched from a peer is hot enough to be kept locally.
///
/// Keys that never reach the threshold would otherwise stay tracked forever,
/// so once the map reaches a size bound, keys idle for [`IDLE_EXPIRY`] are
/// dropped. The bound doubles with the surviving entries, keeping pruning
/// amortized constant per hit. A pruned key starts counting from zero.
#[derive(Debug)]
pub struct HotKeyTracker {
    /// Remote calls per minute at which a key is promoted.
    threshold: u64,
    stats: Mutex<Tracked>,
}

impl HotKeyTracker {
    pub fn new(threshold: u64) -> Self {
        Self {
            threshold,
            stats: Mutex::new(Tracked {
                keys: HashMap::new(),
                prune_at: MIN_PRUNE_AT,
            }),
        }
    }

    pub fn threshold(&self) -> u64 {
        self.threshold
    }

    /// Record a successful peer fetch of `key`. Returns `true` when the key
    /// just crossed the threshold; its statistics are dropped in that case.
    pub fn record_remote_hit(&self, key: &str) -> bool {
        self.record_remote_hit_at(key, Instant::now())
    }

    pub(crate) fn record_remote_hit_at(&self, key: &str, now: Instant) -> bool {
        let mut stats = self.stats.lock();

        let qps = match stats.keys.get_mut(key) {
            Some(entry) => {
                entry.remote_calls += 1;
                entry.last_seen = now;
                entry.qps(now)
            }
            None => {
                if stats.keys.len() >= stats.prune_at {
                    Self::prune(&mut stats, now);
                }
                let entry = KeyStats {
                    first_seen: now,
                    last_seen: now,
                    remote_calls: 1,
                };
                stats.keys.insert(key.to_owned(), entry);
                entry.qps(now)
            }
        };

        if qps >= self.threshold {
            stats.keys.remove(key);
            return true;
        }
        false
    }

    fn prune(stats: &mut Tracked, now: Instant) {
        let before = stats.keys.len();
        stats
            .keys
            .retain(|_, s| now.saturating_duration_since(s.last_seen) < IDLE_EXPIRY);
        stats.prune_at = (stats.keys.len() * 2).max(MIN_PRUNE_AT);
        tracing::debug!(
            pruned = before - stats.keys.len(),
            remaining = stats.keys.len(),
            "Pruned idle hot-key statistics"
        );
    }

    /// Remote calls recorded for `key` since it was last promoted.
    pub fn remote_calls(&self, key: &str) -> u64 {
        self.stats.lock().keys.get(key).map_or(0, |s| s.remote_calls)
    }

    /// Number of keys being tracked.
    pub fn len(&self) -> usize {
        self.stats.lock().keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stats.lock().keys.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_promotes_at_threshold() {
        let tracker = HotKeyTracker::new(10);
        let now = Instant::now();

        for i in 1..10 {
            assert!(!tracker.record_remote_hit_at("Tom", now));
            assert_eq!(tracker.remote_calls("Tom"), i);
        }
        assert!(tracker.record_remote_hit_at("Tom", now));

        // Promotion resets the statistics.
        assert_eq!(tracker.remote_calls("Tom"), 0);
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_rate_is_per_minute() {
        let tracker = HotKeyTracker::new(10);
        let start = Instant::now();

        for _ in 0..9 {
            tracker.record_remote_hit_at("Tom", start);
        }
        // 10 calls over 2 minutes is 5 per minute.
        assert!(!tracker.record_remote_hit_at("Tom", start + Duration::from_secs(120)));

        // 20 calls over 2 minutes reaches the threshold.
        let later = start + Duration::from_secs(125);
        let promoted = (0..10)
            .map(|_| tracker.record_remote_hit_at("Tom", later))
            .any(|p| p);
        assert!(promoted);
    }

    #[test]
    fn test_elapsed_minutes_are_rounded() {
        let tracker = HotKeyTracker::new(10);
        let start = Instant::now();

        for _ in 0..9 {
            tracker.record_remote_hit_at("Tom", start);
        }
        // 89 seconds rounds to one minute.
        assert!(tracker.record_remote_hit_at("Tom", start + Duration::from_secs(89)));
    }

    #[test]
    fn test_threshold_of_one_promotes_first_hit() {
        let tracker = HotKeyTracker::new(1);
        assert!(tracker.record_remote_hit("Tom"));
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_keys_tracked_independently() {
        let tracker = HotKeyTracker::new(3);
        let now = Instant::now();

        tracker.record_remote_hit_at("Tom", now);
        tracker.record_remote_hit_at("Tom", now);
        tracker.record_remote_hit_at("Jack", now);

        assert_eq!(tracker.len(), 2);
        assert!(tracker.record_remote_hit_at("Tom", now));
        assert_eq!(tracker.remote_calls("Jack"), 1);
    }

    #[test]
    fn test_concurrent_hits_promote_once_per_threshold() {
        let tracker = Arc::new(HotKeyTracker::new(10));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let tracker = tracker.clone();
                std::thread::spawn(move || {
                    (0..25).filter(|_| tracker.record_remote_hit("Tom")).count()
                })
            })
            .collect();

        let promotions: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(promotions, 10);
    }

    #[test]
    fn test_idle_keys_pruned_when_map_grows() {
        let tracker = HotKeyTracker::new(10);
        let start = Instant::now();

        for i in 0..MIN_PRUNE_AT {
            tracker.record_remote_hit_at(&format!("cold-{}", i), start);
        }
        let warm = start + IDLE_EXPIRY - Duration::from_secs(1);
        tracker.record_remote_hit_at("cold-0", warm);
        assert_eq!(tracker.len(), MIN_PRUNE_AT);

        // The next new key finds the map at its bound; only cold-0 is recent.
        tracker.record_remote_hit_at("fresh", start + IDLE_EXPIRY + Duration::from_secs(1));
        assert_eq!(tracker.len(), 2);
        assert_eq!(tracker.remote_calls("cold-0"), 2);
        assert_eq!(tracker.remote_calls("cold-1"), 0);
        assert_eq!(tracker.remote_calls("fresh"), 1);
    }

    #[test]
    fn test_active_keys_survive_prune() {
        let tracker = HotKeyTracker::new(u64::MAX);
        let now = Instant::now();

        for i in 0..=MIN_PRUNE_AT {
            tracker.record_remote_hit_at(&format!("key-{}", i), now);
        }
        assert_eq!(tracker.len(), MIN_PRUNE_AT + 1);
    }
}
