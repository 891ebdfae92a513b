//! Approximate per-key access counting with bounded memory.
//!
//! Counts live in a single map. Once the number of tracked keys exceeds
//! `max_keys`, the map is compacted down to the `retain` most frequently
//! accessed keys; everything else is forgotten and starts again from zero.
//! A forgotten key is indistinguishable from a key that was never seen,
//! which the TTL policy maps to its lowest tier.

use parking_lot::Mutex;
use std::collections::HashMap;
use tracing::debug;
use waypoint_core::ShortKey;

use crate::config::TrackerConfig;

#[derive(Debug)]
pub struct FrequencyTracker {
    counts: Mutex<HashMap<ShortKey, u64>>,
    max_keys: usize,
    retain: usize,
}

impl FrequencyTracker {
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            counts: Mutex::new(HashMap::new()),
            max_keys: config.max_keys,
            retain: config.retain.min(config.max_keys).max(1),
        }
    }

    /// Counts one access to `key`.
    pub fn increment(&self, key: &ShortKey) {
        let mut counts = self.counts.lock();

        if let Some(count) = counts.get_mut(key) {
            *count = count.saturating_add(1);
            return;
        }

        counts.insert(key.clone(), 1);
        if counts.len() > self.max_keys {
            let before = counts.len();
            compact(&mut counts, self.retain);
            debug!(
                before,
                after = counts.len(),
                "Compacted access frequency tracker"
            );
        }
    }

    /// Returns the tracked access count for `key`, or 0 if it is not tracked.
    pub fn count(&self, key: &ShortKey) -> u64 {
        self.counts.lock().get(key).copied().unwrap_or(0)
    }

    /// Number of distinct keys currently tracked.
    pub fn len(&self) -> usize {
        self.counts.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for FrequencyTracker {
    fn default() -> Self {
        Self::new(TrackerConfig::default())
    }
}

/// Keeps the `retain` highest counts. Ties at the cut are broken arbitrarily.
fn compact(counts: &mut HashMap<ShortKey, u64>, retain: usize) {
    if counts.len() <= retain {
        return;
    }

    let mut entries: Vec<(ShortKey, u64)> = counts.drain().collect();
    entries.select_nth_unstable_by(retain - 1, |a, b| b.1.cmp(&a.1));
    entries.truncate(retain);
    counts.extend(entries);
}
