use moka::future::Cache;
use std::time::Duration;
use waypoint_core::ShortKey;

/// Short-lived memory of keys the durable store reported as missing.
///
/// Process-local: a key created through another instance stays negative
/// here until its entry expires.
#[derive(Debug, Clone)]
pub struct NegativeCache {
    cache: Cache<ShortKey, ()>,
}

impl NegativeCache {
    pub fn new(ttl: Duration, max_capacity: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_live(ttl)
            .build();
        Self { cache }
    }

    pub fn contains(&self, key: &ShortKey) -> bool {
        self.cache.contains_key(key)
    }

    pub async fn insert(&self, key: &ShortKey) {
        self.cache.insert(key.clone(), ()).await;
    }

    pub async fn remove(&self, key: &ShortKey) {
        self.cache.invalidate(key).await;
    }
}
