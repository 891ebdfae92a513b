use async_trait::async_trait;
use moka::future::Cache;
use moka::Expiry;
use std::time::{Duration, Instant};
use tracing::{debug, trace};
use waypoint_core::cache::Result;
use waypoint_core::{DistributedCache, ShortKey};

#[derive(Debug, Clone)]
struct Entry {
    destination_url: String,
    ttl: Duration,
}

/// Expires each entry after the TTL it was written with.
struct PerEntryTtl;

impl Expiry<ShortKey, Entry> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &ShortKey,
        value: &Entry,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &ShortKey,
        value: &Entry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// An in-memory implementation of [`DistributedCache`] using Moka.
///
/// Nothing is shared across processes, so this only stands in for the
/// distributed tier in single-node deployments and tests. Entries honour
/// the per-write TTL exactly like the Redis adapter.
#[derive(Debug, Clone)]
pub struct MokaLinkCache {
    cache: Cache<ShortKey, Entry>,
}

impl MokaLinkCache {
    /// Creates a new Moka link cache with the default capacity of 100,000 entries.
    pub fn new() -> Self {
        Self::with_capacity(100_000)
    }

    /// Creates a new Moka link cache with a custom maximum capacity.
    ///
    /// # Arguments
    ///
    /// * `max_capacity` - Maximum number of entries the cache can hold
    pub fn with_capacity(max_capacity: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .expire_after(PerEntryTtl)
            .build();
        Self { cache }
    }
}

impl Default for MokaLinkCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DistributedCache for MokaLinkCache {
    async fn get(&self, key: &ShortKey) -> Result<Option<String>> {
        trace!(key = %key, "Fetching destination from Moka cache");

        match self.cache.get(key).await {
            Some(entry) => {
                debug!(key = %key, "Cache hit in Moka");
                Ok(Some(entry.destination_url))
            }
            None => {
                trace!(key = %key, "Cache miss in Moka");
                Ok(None)
            }
        }
    }

    async fn set(&self, key: &ShortKey, destination_url: &str, ttl: Duration) -> Result<()> {
        trace!(key = %key, ttl_secs = ttl.as_secs(), "Storing destination in Moka cache");

        let entry = Entry {
            destination_url: destination_url.to_string(),
            ttl,
        };
        self.cache.insert(key.clone(), entry).await;
        debug!(key = %key, "Cached destination in Moka");
        Ok(())
    }

    async fn del(&self, key: &ShortKey) -> Result<()> {
        trace!(key = %key, "Removing destination from Moka cache");

        self.cache.invalidate(key).await;
        debug!(key = %key, "Removed destination from Moka cache (if present)");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> ShortKey {
        ShortKey::new_unchecked(s)
    }

    const HOUR: Duration = Duration::from_secs(3600);

    #[tokio::test]
    async fn cache_get_and_set() {
        let cache = MokaLinkCache::new();
        let k = key("abc123");

        assert!(cache.get(&k).await.unwrap().is_none());

        cache.set(&k, "https://example.com", HOUR).await.unwrap();

        assert_eq!(
            cache.get(&k).await.unwrap().as_deref(),
            Some("https://example.com")
        );
    }

    #[tokio::test]
    async fn cache_del_removes_entry() {
        let cache = MokaLinkCache::new();
        let k = key("abc123");

        cache.set(&k, "https://example.com", HOUR).await.unwrap();
        assert!(cache.get(&k).await.unwrap().is_some());

        cache.del(&k).await.unwrap();

        assert!(cache.get(&k).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn cache_del_is_idempotent() {
        let cache = MokaLinkCache::new();
        let k = key("abc123");

        cache.del(&k).await.unwrap();
        assert!(cache.get(&k).await.unwrap().is_none());
        cache.del(&k).await.unwrap();
    }

    #[tokio::test]
    async fn entry_expires_after_its_own_ttl() {
        let cache = MokaLinkCache::with_capacity(100);
        let short = key("short");
        let long = key("long1");

        cache
            .set(&short, "https://example.com/short", Duration::from_millis(50))
            .await
            .unwrap();
        cache
            .set(&long, "https://example.com/long", HOUR)
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(150)).await;

        assert!(cache.get(&short).await.unwrap().is_none());
        assert!(cache.get(&long).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn overwrite_resets_ttl() {
        let cache = MokaLinkCache::with_capacity(100);
        let k = key("abc123");

        cache
            .set(&k, "https://example.com/old", Duration::from_millis(50))
            .await
            .unwrap();
        cache.set(&k, "https://example.com/new", HOUR).await.unwrap();

        tokio::time::sleep(Duration::from_millis(150)).await;

        assert_eq!(
            cache.get(&k).await.unwrap().as_deref(),
            Some("https://example.com/new")
        );
    }
}
