//! The lookup cascade: L1, then L2, then the durable store.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace, warn};
use waypoint_cache::LruCache;
use waypoint_core::{
    AccessEvent, AccessSink, DistributedCache, LinkStore, RequestMeta, ShortKey, StorageError,
};

use crate::config::ResolverConfig;
use crate::error::{ConfigError, ResolveError, Result};
use crate::frequency::FrequencyTracker;
use crate::invalidation::InvalidationCoordinator;
use crate::negative::NegativeCache;
use crate::recorder::AccessRecorder;
use crate::ttl::AdaptiveTtlPolicy;

/// Resolves short keys to destination URLs.
///
/// Every successful resolution, whichever tier served it, counts one access
/// in the frequency tracker and schedules exactly one access event for the
/// background sink writer. Cache tier failures and timeouts fall through
/// to the next tier and are only logged. The only errors returned are a
/// confirmed [`ResolveError::NotFound`] and a durable store failure.
///
/// Must be constructed inside a Tokio runtime.
pub struct ResolutionEngine {
    l1: Arc<LruCache>,
    l2: Arc<dyn DistributedCache>,
    store: Arc<dyn LinkStore>,
    tracker: Arc<FrequencyTracker>,
    ttl_policy: AdaptiveTtlPolicy,
    recorder: AccessRecorder,
    negative: Option<NegativeCache>,
    invalidator: InvalidationCoordinator,
    l2_timeout: Duration,
    store_timeout: Duration,
}

impl std::fmt::Debug for ResolutionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolutionEngine")
            .field("l1_len", &self.l1.len())
            .field("l1_capacity", &self.l1.capacity())
            .field("l2_timeout", &self.l2_timeout)
            .field("store_timeout", &self.store_timeout)
            .field("negative_cache", &self.negative.is_some())
            .finish_non_exhaustive()
    }
}

impl ResolutionEngine {
    /// Validates `config`, builds the in-process tiers and starts the
    /// access recorder worker.
    pub fn new(
        config: ResolverConfig,
        l2: Arc<dyn DistributedCache>,
        store: Arc<dyn LinkStore>,
        sink: Arc<dyn AccessSink>,
    ) -> std::result::Result<Self, ConfigError> {
        config.validate()?;

        let l1 = Arc::new(LruCache::new(config.l1_capacity()?));
        let tracker = Arc::new(FrequencyTracker::new(config.tracker));
        let ttl_policy = AdaptiveTtlPolicy::new(Arc::clone(&tracker), &config.ttl);
        let recorder = AccessRecorder::spawn(
            sink,
            config.access_queue_capacity()?,
            config.sink_timeout,
            config.drain_timeout,
        );
        let negative = config
            .negative_ttl
            .map(|ttl| NegativeCache::new(ttl, config.negative_capacity));
        let invalidator = InvalidationCoordinator::new(
            Arc::clone(&l1),
            Arc::clone(&l2),
            negative.clone(),
            config.l2_timeout,
        );

        Ok(Self {
            l1,
            l2,
            store,
            tracker,
            ttl_policy,
            recorder,
            negative,
            invalidator,
            l2_timeout: config.l2_timeout,
            store_timeout: config.store_timeout,
        })
    }

    /// Resolves `key` to its destination URL.
    pub async fn resolve(&self, key: &ShortKey, meta: RequestMeta) -> Result<String> {
        trace!(key = %key, "Resolving short key");

        if let Some(destination) = self.l1.get(key) {
            trace!(key = %key, "L1 hit");
            self.schedule_access(key, &destination, meta);
            return Ok(destination);
        }

        if self.negative.as_ref().is_some_and(|n| n.contains(key)) {
            debug!(key = %key, "Negative cache hit");
            return Err(ResolveError::NotFound(key.clone()));
        }

        if let Some(destination) = self.lookup_l2(key).await {
            debug!(key = %key, "L2 hit, backfilling L1");
            self.l1.set(key, destination.as_str());
            self.schedule_access(key, &destination, meta);
            return Ok(destination);
        }

        let record = match tokio::time::timeout(self.store_timeout, self.store.find_by_key(key))
            .await
        {
            Ok(Ok(record)) => record,
            Ok(Err(e)) => {
                warn!(key = %key, error = %e, "Durable store lookup failed");
                return Err(ResolveError::Storage(e));
            }
            Err(_) => {
                warn!(
                    key = %key,
                    timeout_ms = self.store_timeout.as_millis() as u64,
                    "Durable store lookup timed out"
                );
                return Err(ResolveError::Storage(StorageError::Timeout(format!(
                    "lookup of {key} exceeded {:?}",
                    self.store_timeout
                ))));
            }
        };

        let Some(record) = record else {
            debug!(key = %key, "Short key not found in durable store");
            if let Some(negative) = &self.negative {
                negative.insert(key).await;
            }
            return Err(ResolveError::NotFound(key.clone()));
        };

        let destination = record.destination_url;
        let ttl = self.ttl_policy.cache_ttl(key);
        debug!(key = %key, ttl_secs = ttl.as_secs(), "Store hit, backfilling caches");

        self.l1.set(key, destination.as_str());
        self.backfill_l2(key, &destination, ttl).await;
        self.schedule_access(key, &destination, meta);

        Ok(destination)
    }

    /// Purges `key` from every cache tier. See [`InvalidationCoordinator`].
    pub async fn invalidate(&self, key: &ShortKey) -> bool {
        self.invalidator.invalidate(key).await
    }

    /// A handle for mutation paths that need to invalidate keys.
    pub fn invalidator(&self) -> InvalidationCoordinator {
        self.invalidator.clone()
    }

    pub fn l1(&self) -> &LruCache {
        &self.l1
    }

    pub fn tracker(&self) -> &FrequencyTracker {
        &self.tracker
    }

    pub fn ttl_policy(&self) -> &AdaptiveTtlPolicy {
        &self.ttl_policy
    }

    pub fn recorder(&self) -> &AccessRecorder {
        &self.recorder
    }

    /// Drains pending access events and stops the recorder worker.
    pub async fn shutdown(&self) {
        self.recorder.shutdown().await;
    }

    async fn lookup_l2(&self, key: &ShortKey) -> Option<String> {
        match tokio::time::timeout(self.l2_timeout, self.l2.get(key)).await {
            Ok(Ok(hit)) => {
                if hit.is_none() {
                    trace!(key = %key, "L2 miss");
                }
                hit
            }
            Ok(Err(e)) => {
                warn!(key = %key, error = %e, "L2 lookup failed, falling through to store");
                None
            }
            Err(_) => {
                warn!(
                    key = %key,
                    timeout_ms = self.l2_timeout.as_millis() as u64,
                    "L2 lookup timed out, falling through to store"
                );
                None
            }
        }
    }

    async fn backfill_l2(&self, key: &ShortKey, destination: &str, ttl: Duration) {
        match tokio::time::timeout(self.l2_timeout, self.l2.set(key, destination, ttl)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(key = %key, error = %e, "Failed to backfill L2"),
            Err(_) => warn!(
                key = %key,
                timeout_ms = self.l2_timeout.as_millis() as u64,
                "L2 backfill timed out"
            ),
        }
    }

    fn schedule_access(&self, key: &ShortKey, destination: &str, meta: RequestMeta) {
        self.tracker.increment(key);
        self.recorder
            .record(AccessEvent::new(key.clone(), destination, meta));
    }
}
