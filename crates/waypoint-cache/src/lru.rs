//! In-process least-recently-used cache (L1).
//!
//! A thin wrapper over [`lru::LruCache`](::lru::LruCache) behind one
//! `parking_lot` mutex that is never held across an `.await`. Every
//! operation is O(1).

use parking_lot::Mutex;
use std::num::NonZeroUsize;
use tracing::trace;
use waypoint_core::ShortKey;

/// Default number of entries, matching the `MEMORY_CACHE_CAPACITY` default.
pub const DEFAULT_CAPACITY: usize = 10_000;

/// A fixed-capacity, least-recently-used cache of destination URLs.
///
/// There is no expiry at this tier: entries stay until capacity pressure
/// evicts them or they are deleted explicitly by invalidation.
#[derive(Debug)]
pub struct LruCache {
    entries: Mutex<::lru::LruCache<ShortKey, String>>,
}

impl LruCache {
    /// Creates an empty cache that holds at most `capacity` entries.
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            entries: Mutex::new(::lru::LruCache::new(capacity)),
        }
    }

    /// Returns the cached destination and marks the key most recently used.
    pub fn get(&self, key: &ShortKey) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }

    /// Inserts or replaces a destination and marks the key most recently used.
    ///
    /// Inserting a new key into a full cache first evicts the single least
    /// recently used entry.
    pub fn set(&self, key: &ShortKey, value: impl Into<String>) {
        let displaced = self.entries.lock().push(key.clone(), value.into());
        if let Some((evicted, _)) = displaced {
            // push hands back the old pair on replacement too
            if evicted != *key {
                trace!(key = %evicted, "Evicted least recently used entry from L1");
            }
        }
    }

    /// Removes a key. Returns `true` if it was present.
    pub fn delete(&self, key: &ShortKey) -> bool {
        self.entries.lock().pop(key).is_some()
    }

    /// Returns the number of cached entries.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.entries.lock().cap().get()
    }

    /// Drops every entry.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

impl Default for LruCache {
    fn default() -> Self {
        Self::new(NonZeroUsize::new(DEFAULT_CAPACITY).unwrap_or(NonZeroUsize::MIN))
    }
}
