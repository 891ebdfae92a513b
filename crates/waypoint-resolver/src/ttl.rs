use std::sync::Arc;
use std::time::Duration;
use waypoint_core::ShortKey;

use crate::config::{TtlPolicyConfig, TtlTier};
use crate::frequency::FrequencyTracker;

/// Maps how often a key has been resolved to how long L2 should keep it.
///
/// Popular keys earn long lifetimes; cold keys expire quickly so an edit
/// that missed explicit invalidation heals on its own.
#[derive(Debug, Clone)]
pub struct AdaptiveTtlPolicy {
    tracker: Arc<FrequencyTracker>,
    /// Highest threshold first.
    tiers: Vec<TtlTier>,
    default_ttl: Duration,
}

impl AdaptiveTtlPolicy {
    pub fn new(tracker: Arc<FrequencyTracker>, config: &TtlPolicyConfig) -> Self {
        Self {
            tracker,
            tiers: config.sorted_tiers(),
            default_ttl: config.default_ttl,
        }
    }

    /// Cache lifetime for `key` given its current tracked access count.
    pub fn cache_ttl(&self, key: &ShortKey) -> Duration {
        self.ttl_for_count(self.tracker.count(key))
    }

    /// The lifetime a key with `count` tracked accesses receives.
    pub fn ttl_for_count(&self, count: u64) -> Duration {
        self.tiers
            .iter()
            .find(|tier| count > tier.above)
            .map_or(self.default_ttl, |tier| tier.ttl)
    }
}
