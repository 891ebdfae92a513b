use crate::error::CacheError;
use crate::short_key::ShortKey;
use async_trait::async_trait;
use std::time::Duration;

/// Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;

/// A cache shared by every instance of the service.
///
/// Entries hold only the destination URL, never the full record, and every
/// entry carries its own TTL. Implementations report unreachable backends
/// as errors; callers on the redirect path treat any error as a miss.
#[async_trait]
pub trait DistributedCache: Send + Sync + 'static {
    /// Get the cached destination for a key.
    ///
    /// Returns `Ok(None)` if the key is not in the cache.
    async fn get(&self, key: &ShortKey) -> Result<Option<String>>;

    /// Store a destination with the given time-to-live.
    async fn set(&self, key: &ShortKey, destination_url: &str, ttl: Duration) -> Result<()>;

    /// Remove a cached destination.
    ///
    /// It is not an error if the key does not exist.
    async fn del(&self, key: &ShortKey) -> Result<()>;
}
