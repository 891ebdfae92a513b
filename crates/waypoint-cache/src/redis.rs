use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};
use waypoint_core::cache::Result;
use waypoint_core::{CacheError, DistributedCache, ShortKey};

/// Operations slower than this are logged as slow.
const SLOW_OPERATION_THRESHOLD: Duration = Duration::from_millis(100);

/// A Redis-based implementation of [`DistributedCache`].
///
/// Destinations are stored as plain strings under a configurable key
/// prefix, each written with `SET ... EX` so Redis enforces the TTL.
#[derive(Clone)]
pub struct RedisLinkCache {
    conn: ConnectionManager,
    key_prefix: String,
}

impl std::fmt::Debug for RedisLinkCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisLinkCache")
            .field("key_prefix", &self.key_prefix)
            .finish_non_exhaustive()
    }
}

fn map_redis_error(operation: &str, err: redis::RedisError) -> CacheError {
    let message = format!("{operation}: {err}");
    let lowered = message.to_ascii_lowercase();
    if lowered.contains("timed out") {
        CacheError::Timeout(message)
    } else if err.is_io_error() || lowered.contains("connection") {
        CacheError::Unavailable(message)
    } else {
        CacheError::Operation(message)
    }
}

fn warn_if_slow(operation: &str, key: &ShortKey, started: Instant) {
    let elapsed = started.elapsed();
    if elapsed > SLOW_OPERATION_THRESHOLD {
        warn!(
            key = %key,
            operation,
            elapsed_ms = elapsed.as_millis() as u64,
            "Slow Redis operation"
        );
    }
}

impl RedisLinkCache {
    /// Creates a new Redis link cache over an existing connection manager.
    ///
    /// # Arguments
    ///
    /// * `conn` - A Redis connection manager (reconnects on its own)
    pub fn new(conn: ConnectionManager) -> Self {
        Self {
            conn,
            key_prefix: "wp:link:".to_string(),
        }
    }

    /// Creates a new Redis link cache with a custom key prefix.
    ///
    /// # Arguments
    ///
    /// * `conn` - A Redis connection manager
    /// * `key_prefix` - Custom prefix for cache keys (e.g., "myapp:link:")
    pub fn with_prefix(conn: ConnectionManager, key_prefix: impl Into<String>) -> Self {
        Self {
            conn,
            key_prefix: key_prefix.into(),
        }
    }

    /// Opens a client for `redis_url` and establishes a managed connection.
    pub async fn connect(redis_url: &str) -> Result<Self> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| CacheError::Initialization(format!("invalid redis url: {e}")))?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| CacheError::Initialization(format!("failed to connect to redis: {e}")))?;
        Ok(Self::new(conn))
    }

    /// Generates the cache key for a short key.
    fn cache_key(&self, key: &ShortKey) -> String {
        format!("{}{}", self.key_prefix, key.as_str())
    }
}

#[async_trait]
impl DistributedCache for RedisLinkCache {
    async fn get(&self, key: &ShortKey) -> Result<Option<String>> {
        let cache_key = self.cache_key(key);
        trace!(key = %key, "Fetching destination from Redis cache");

        let started = Instant::now();
        let mut conn = self.conn.clone();
        let result = conn.get::<_, Option<String>>(&cache_key).await;
        warn_if_slow("GET", key, started);

        match result {
            Ok(Some(destination)) => {
                debug!(key = %key, "Cache hit in Redis");
                Ok(Some(destination))
            }
            Ok(None) => {
                trace!(key = %key, "Cache miss in Redis");
                Ok(None)
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Redis error on get");
                Err(map_redis_error("failed to fetch value from Redis", e))
            }
        }
    }

    async fn set(&self, key: &ShortKey, destination_url: &str, ttl: Duration) -> Result<()> {
        let cache_key = self.cache_key(key);
        // EX takes whole seconds; a zero TTL would be rejected by Redis.
        let seconds = ttl.as_secs().max(1);
        trace!(key = %key, ttl_secs = seconds, "Storing destination in Redis cache");

        let started = Instant::now();
        let mut conn = self.conn.clone();
        let result = conn
            .set_ex::<_, _, ()>(&cache_key, destination_url, seconds)
            .await;
        warn_if_slow("SET", key, started);

        match result {
            Ok(()) => {
                debug!(key = %key, ttl_secs = seconds, "Cached destination in Redis");
                Ok(())
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to cache destination in Redis");
                Err(map_redis_error("failed to write value to Redis", e))
            }
        }
    }

    async fn del(&self, key: &ShortKey) -> Result<()> {
        let cache_key = self.cache_key(key);
        trace!(key = %key, "Removing destination from Redis cache");

        let started = Instant::now();
        let mut conn = self.conn.clone();
        let result = conn.del::<_, ()>(&cache_key).await;
        warn_if_slow("DEL", key, started);

        match result {
            Ok(()) => {
                debug!(key = %key, "Removed destination from Redis cache");
                Ok(())
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to remove destination from Redis cache");
                Err(map_redis_error("failed to delete value from Redis", e))
            }
        }
    }
}

// Tests that need a live Redis instance live in tests/redis_cache_integration.rs.
