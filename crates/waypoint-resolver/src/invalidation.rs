use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace, warn};
use waypoint_cache::LruCache;
use waypoint_core::{DistributedCache, ShortKey};

use crate::negative::NegativeCache;

/// Purges a key from every cache tier after its durable record changed.
///
/// Callers mutate the store first and invalidate afterwards, once for every
/// key whose mapping changed (both keys of a rename). The L2 delete is a
/// single best-effort attempt; an entry that survives it expires with its TTL.
#[derive(Clone)]
pub struct InvalidationCoordinator {
    l1: Arc<LruCache>,
    l2: Arc<dyn DistributedCache>,
    negative: Option<NegativeCache>,
    l2_timeout: Duration,
}

impl std::fmt::Debug for InvalidationCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InvalidationCoordinator")
            .field("l2_timeout", &self.l2_timeout)
            .field("negative_cache", &self.negative.is_some())
            .finish_non_exhaustive()
    }
}

impl InvalidationCoordinator {
    pub(crate) fn new(
        l1: Arc<LruCache>,
        l2: Arc<dyn DistributedCache>,
        negative: Option<NegativeCache>,
        l2_timeout: Duration,
    ) -> Self {
        Self {
            l1,
            l2,
            negative,
            l2_timeout,
        }
    }

    /// Removes `key` from L1 and the negative cache, then attempts the L2
    /// delete. Returns `true` if L2 confirmed the delete.
    pub async fn invalidate(&self, key: &ShortKey) -> bool {
        let was_cached = self.l1.delete(key);
        trace!(key = %key, was_cached, "Removed key from L1");

        if let Some(negative) = &self.negative {
            negative.remove(key).await;
        }

        match tokio::time::timeout(self.l2_timeout, self.l2.del(key)).await {
            Ok(Ok(())) => {
                debug!(key = %key, "Invalidated key in all cache tiers");
                true
            }
            Ok(Err(e)) => {
                warn!(key = %key, error = %e, "Failed to purge key from L2, relying on TTL");
                false
            }
            Err(_) => {
                warn!(
                    key = %key,
                    timeout_ms = self.l2_timeout.as_millis() as u64,
                    "Timed out purging key from L2, relying on TTL"
                );
                false
            }
        }
    }

    /// Invalidates each key in turn.
    pub async fn invalidate_all<'a, I>(&self, keys: I)
    where
        I: IntoIterator<Item = &'a ShortKey>,
    {
        for key in keys {
            self.invalidate(key).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::UnavailableCache;
    use waypoint_cache::MokaLinkCache;

    const HOUR: Duration = Duration::from_secs(3600);

    fn key(s: &str) -> ShortKey {
        ShortKey::new_unchecked(s)
    }

    #[tokio::test]
    async fn removes_key_from_both_tiers() {
        let l1 = Arc::new(LruCache::default());
        let l2 = Arc::new(MokaLinkCache::new());
        let coordinator =
            InvalidationCoordinator::new(l1.clone(), l2.clone(), None, Duration::from_secs(1));
        let k = key("abc123");

        l1.set(&k, "https://example.com");
        l2.set(&k, "https://example.com", HOUR).await.unwrap();

        assert!(coordinator.invalidate(&k).await);

        assert!(l1.get(&k).is_none());
        assert!(l2.get(&k).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unavailable_l2_still_clears_l1() {
        let l1 = Arc::new(LruCache::default());
        let coordinator = InvalidationCoordinator::new(
            l1.clone(),
            Arc::new(UnavailableCache),
            None,
            Duration::from_secs(1),
        );
        let k = key("abc123");
        l1.set(&k, "https://example.com");

        assert!(!coordinator.invalidate(&k).await);
        assert!(l1.get(&k).is_none());
    }

    #[tokio::test]
    async fn invalidate_all_covers_every_key() {
        let l1 = Arc::new(LruCache::default());
        let l2 = Arc::new(MokaLinkCache::new());
        let coordinator =
            InvalidationCoordinator::new(l1.clone(), l2.clone(), None, Duration::from_secs(1));
        let old = key("gen001");
        let new = key("promo");

        for k in [&old, &new] {
            l1.set(k, "https://example.com");
            l2.set(k, "https://example.com", HOUR).await.unwrap();
        }

        coordinator.invalidate_all([&old, &new]).await;

        assert!(l1.is_empty());
        assert!(l2.get(&old).await.unwrap().is_none());
        assert!(l2.get(&new).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn clears_negative_entry() {
        let l1 = Arc::new(LruCache::default());
        let negative = NegativeCache::new(HOUR, 100);
        let coordinator = InvalidationCoordinator::new(
            l1,
            Arc::new(MokaLinkCache::new()),
            Some(negative.clone()),
            Duration::from_secs(1),
        );
        let k = key("fresh1");
        negative.insert(&k).await;

        coordinator.invalidate(&k).await;

        assert!(!negative.contains(&k));
    }
}
