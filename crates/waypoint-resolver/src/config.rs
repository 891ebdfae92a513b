use std::num::NonZeroUsize;
use std::time::Duration;
use typed_builder::TypedBuilder;

use crate::error::ConfigError;

const HOUR: Duration = Duration::from_secs(60 * 60);
const DAY: Duration = Duration::from_secs(24 * 60 * 60);

/// One row of the adaptive TTL table: keys seen more than `above` times are
/// cached for `ttl`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TtlTier {
    pub above: u64,
    pub ttl: Duration,
}

impl TtlTier {
    pub const fn new(above: u64, ttl: Duration) -> Self {
        Self { above, ttl }
    }
}

/// Access-count thresholds mapped to L2 cache lifetimes.
#[derive(Debug, Clone, PartialEq, Eq, TypedBuilder)]
pub struct TtlPolicyConfig {
    #[builder(default = vec![
        TtlTier::new(10_000, DAY * 7),
        TtlTier::new(1_000, DAY),
        TtlTier::new(100, HOUR * 12),
        TtlTier::new(10, HOUR * 6),
    ])]
    pub tiers: Vec<TtlTier>,
    /// Lifetime for keys that clear no threshold, including unseen keys.
    #[builder(default = HOUR)]
    pub default_ttl: Duration,
}

impl Default for TtlPolicyConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl TtlPolicyConfig {
    /// Returns the tiers ordered from the highest threshold down.
    pub(crate) fn sorted_tiers(&self) -> Vec<TtlTier> {
        let mut tiers = self.tiers.clone();
        tiers.sort_by(|a, b| b.above.cmp(&a.above));
        tiers
    }

    /// A larger access count must never map to a shorter lifetime.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let tiers = self.sorted_tiers();

        for pair in tiers.windows(2) {
            let (upper, lower) = (pair[0], pair[1]);
            if upper.above == lower.above {
                return Err(ConfigError::NonMonotonicTiers(format!(
                    "threshold {} appears twice",
                    upper.above
                )));
            }
            if upper.ttl < lower.ttl {
                return Err(ConfigError::NonMonotonicTiers(format!(
                    "more than {} hits maps to {:?}, shorter than {:?} for more than {}",
                    upper.above, upper.ttl, lower.ttl, lower.above
                )));
            }
        }

        if let Some(lowest) = tiers.last() {
            if lowest.ttl < self.default_ttl {
                return Err(ConfigError::NonMonotonicTiers(format!(
                    "default {:?} is longer than {:?} for more than {} hits",
                    self.default_ttl, lowest.ttl, lowest.above
                )));
            }
        }

        if self.default_ttl.is_zero() {
            return Err(ConfigError::Zero("default_ttl"));
        }

        Ok(())
    }
}

/// Bounds for the frequency tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TypedBuilder)]
pub struct TrackerConfig {
    /// Compaction runs once more than this many keys are tracked.
    #[builder(default = 100_000)]
    pub max_keys: usize,
    /// How many of the most frequently accessed keys survive compaction.
    #[builder(default = 50_000)]
    pub retain: usize,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl TrackerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_keys == 0 {
            return Err(ConfigError::Zero("tracker.max_keys"));
        }
        if self.retain == 0 {
            return Err(ConfigError::Zero("tracker.retain"));
        }
        if self.retain > self.max_keys {
            return Err(ConfigError::RetainExceedsCap {
                retain: self.retain,
                max_keys: self.max_keys,
            });
        }
        Ok(())
    }
}

/// Settings for a [`ResolutionEngine`](crate::ResolutionEngine).
#[derive(Debug, Clone, TypedBuilder)]
pub struct ResolverConfig {
    /// Maximum number of entries held by the in-process cache.
    #[builder(default = waypoint_cache::lru::DEFAULT_CAPACITY)]
    pub l1_capacity: usize,
    #[builder(default)]
    pub tracker: TrackerConfig,
    #[builder(default)]
    pub ttl: TtlPolicyConfig,
    /// Budget for a single distributed cache call.
    #[builder(default = Duration::from_millis(250))]
    pub l2_timeout: Duration,
    /// Budget for a single durable store lookup.
    #[builder(default = Duration::from_secs(3))]
    pub store_timeout: Duration,
    /// Pending access events kept before the oldest are dropped.
    #[builder(default = 10_000)]
    pub access_queue_capacity: usize,
    /// Budget for a single access sink write.
    #[builder(default = Duration::from_secs(2))]
    pub sink_timeout: Duration,
    /// How long shutdown waits for queued access events to be written.
    #[builder(default = Duration::from_secs(5))]
    pub drain_timeout: Duration,
    /// Remember missing keys for this long. Disabled when `None`.
    #[builder(default, setter(strip_option))]
    pub negative_ttl: Option<Duration>,
    /// Upper bound on remembered missing keys.
    #[builder(default = 10_000)]
    pub negative_capacity: u64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl ResolverConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.l1_capacity()?;
        self.access_queue_capacity()?;
        self.tracker.validate()?;
        self.ttl.validate()?;

        if self.l2_timeout.is_zero() {
            return Err(ConfigError::Zero("l2_timeout"));
        }
        if self.store_timeout.is_zero() {
            return Err(ConfigError::Zero("store_timeout"));
        }
        if self.sink_timeout.is_zero() {
            return Err(ConfigError::Zero("sink_timeout"));
        }
        if self.drain_timeout.is_zero() {
            return Err(ConfigError::Zero("drain_timeout"));
        }
        if self.negative_ttl.is_some_and(|ttl| ttl.is_zero()) {
            return Err(ConfigError::Zero("negative_ttl"));
        }
        if self.negative_ttl.is_some() && self.negative_capacity == 0 {
            return Err(ConfigError::Zero("negative_capacity"));
        }
        Ok(())
    }

    pub(crate) fn l1_capacity(&self) -> Result<NonZeroUsize, ConfigError> {
        NonZeroUsize::new(self.l1_capacity).ok_or(ConfigError::Zero("l1_capacity"))
    }

    pub(crate) fn access_queue_capacity(&self) -> Result<NonZeroUsize, ConfigError> {
        NonZeroUsize::new(self.access_queue_capacity)
            .ok_or(ConfigError::Zero("access_queue_capacity"))
    }
}
