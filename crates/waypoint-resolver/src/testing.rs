//! Test doubles for the collaborator traits.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use waypoint_cache::MokaLinkCache;
use waypoint_core::repository::{LinkStore, Result as StoreResult, ShortLinkRecord};
use waypoint_core::{
    AccessEvent, AccessSink, CacheError, DistributedCache, ShortKey, SinkError, StorageError,
};

/// An L2 whose backend can never be reached.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableCache;

#[async_trait]
impl DistributedCache for UnavailableCache {
    async fn get(&self, _key: &ShortKey) -> Result<Option<String>, CacheError> {
        Err(CacheError::Unavailable("connection refused".to_string()))
    }

    async fn set(&self, _key: &ShortKey, _value: &str, _ttl: Duration) -> Result<(), CacheError> {
        Err(CacheError::Unavailable("connection refused".to_string()))
    }

    async fn del(&self, _key: &ShortKey) -> Result<(), CacheError> {
        Err(CacheError::Unavailable("connection refused".to_string()))
    }
}

/// An L2 that answers every call only after `delay`.
#[derive(Debug, Clone)]
pub struct SlowCache {
    pub delay: Duration,
    pub inner: MokaLinkCache,
}

#[async_trait]
impl DistributedCache for SlowCache {
    async fn get(&self, key: &ShortKey) -> Result<Option<String>, CacheError> {
        tokio::time::sleep(self.delay).await;
        self.inner.get(key).await
    }

    async fn set(&self, key: &ShortKey, value: &str, ttl: Duration) -> Result<(), CacheError> {
        tokio::time::sleep(self.delay).await;
        self.inner.set(key, value, ttl).await
    }

    async fn del(&self, key: &ShortKey) -> Result<(), CacheError> {
        tokio::time::sleep(self.delay).await;
        self.inner.del(key).await
    }
}

/// A working L2 that remembers the TTL of every write.
#[derive(Debug, Clone, Default)]
pub struct RecordingCache {
    inner: MokaLinkCache,
    writes: Arc<Mutex<Vec<(ShortKey, Duration)>>>,
}

impl RecordingCache {
    pub fn writes(&self) -> Vec<(ShortKey, Duration)> {
        self.writes.lock().clone()
    }
}

#[async_trait]
impl DistributedCache for RecordingCache {
    async fn get(&self, key: &ShortKey) -> Result<Option<String>, CacheError> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &ShortKey, value: &str, ttl: Duration) -> Result<(), CacheError> {
        self.writes.lock().push((key.clone(), ttl));
        self.inner.set(key, value, ttl).await
    }

    async fn del(&self, key: &ShortKey) -> Result<(), CacheError> {
        self.inner.del(key).await
    }
}

/// Wraps a store and counts lookups that reach it.
#[derive(Debug)]
pub struct CountingStore<S> {
    inner: S,
    lookups: AtomicUsize,
}

impl<S> CountingStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            lookups: AtomicUsize::new(0),
        }
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: LinkStore> LinkStore for CountingStore<S> {
    async fn find_by_key(&self, key: &ShortKey) -> StoreResult<Option<ShortLinkRecord>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.inner.find_by_key(key).await
    }
}

/// A store that is down, or merely slow when `delay` is set.
#[derive(Debug, Clone, Default)]
pub struct BrokenStore {
    pub delay: Option<Duration>,
}

#[async_trait]
impl LinkStore for BrokenStore {
    async fn find_by_key(&self, _key: &ShortKey) -> StoreResult<Option<ShortLinkRecord>> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Err(StorageError::Unavailable("database is down".to_string()))
    }
}

/// Keeps every event it receives.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<AccessEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<AccessEvent> {
        self.events.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }
}

#[async_trait]
impl AccessSink for RecordingSink {
    async fn record(&self, event: &AccessEvent) -> Result<(), SinkError> {
        self.events.lock().push(event.clone());
        Ok(())
    }
}

/// Rejects every event, counting the attempts.
#[derive(Debug, Default)]
pub struct FailingSink {
    attempts: AtomicUsize,
}

impl FailingSink {
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AccessSink for FailingSink {
    async fn record(&self, _event: &AccessEvent) -> Result<(), SinkError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(SinkError::Unavailable("analytics store is down".to_string()))
    }
}

/// Never completes a write, like a sink stuck waiting on its pool.
#[derive(Debug, Default)]
pub struct HangingSink {
    attempts: AtomicUsize,
}

impl HangingSink {
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AccessSink for HangingSink {
    async fn record(&self, _event: &AccessEvent) -> Result<(), SinkError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        std::future::pending().await
    }
}
