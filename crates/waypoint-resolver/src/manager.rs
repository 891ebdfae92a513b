use std::sync::Arc;
use tracing::info;
use waypoint_core::repository::{LinkRepository, Result, ShortLinkRecord};
use waypoint_core::ShortKey;

use crate::invalidation::InvalidationCoordinator;

/// The mutation path for short links.
///
/// Each operation changes the durable store first and then invalidates every
/// key whose mapping changed, so a resolution racing the two steps can serve
/// the old destination for at most one cache lifetime.
#[derive(Clone)]
pub struct LinkManager {
    repository: Arc<dyn LinkRepository>,
    invalidator: InvalidationCoordinator,
}

impl std::fmt::Debug for LinkManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkManager")
            .field("invalidator", &self.invalidator)
            .finish_non_exhaustive()
    }
}

impl LinkManager {
    pub fn new(repository: Arc<dyn LinkRepository>, invalidator: InvalidationCoordinator) -> Self {
        Self {
            repository,
            invalidator,
        }
    }

    /// Stores a new link. The key is invalidated as well, which clears a
    /// negative cache entry left by earlier lookups.
    pub async fn create(
        &self,
        short_key: ShortKey,
        destination_url: impl Into<String>,
        owner_id: impl Into<String>,
    ) -> Result<ShortLinkRecord> {
        let record = ShortLinkRecord::new(short_key, destination_url, owner_id);
        self.repository.insert(record.clone()).await?;
        self.invalidator.invalidate(&record.short_key).await;

        info!(key = %record.short_key, "Created short link");
        Ok(record)
    }

    pub async fn update_destination(
        &self,
        key: &ShortKey,
        destination_url: &str,
    ) -> Result<ShortLinkRecord> {
        let record = self
            .repository
            .update_destination(key, destination_url)
            .await?;
        self.invalidator.invalidate(key).await;

        info!(key = %key, "Updated short link destination");
        Ok(record)
    }

    /// Moves a link to a new key, invalidating both the old and the new one.
    pub async fn rename(&self, from: &ShortKey, to: &ShortKey) -> Result<ShortLinkRecord> {
        let record = self.repository.rename(from, to).await?;
        self.invalidator.invalidate_all([from, to]).await;

        info!(from = %from, to = %to, "Renamed short link");
        Ok(record)
    }

    /// Returns `true` if a link was deleted.
    pub async fn delete(&self, key: &ShortKey) -> Result<bool> {
        let deleted = self.repository.delete(key).await?;
        self.invalidator.invalidate(key).await;

        if deleted {
            info!(key = %key, "Deleted short link");
        }
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ResolverConfig;
    use crate::engine::ResolutionEngine;
    use crate::error::ResolveError;
    use crate::testing::RecordingSink;
    use std::time::Duration;
    use waypoint_cache::MokaLinkCache;
    use waypoint_core::{DistributedCache, RequestMeta, StorageError};
    use waypoint_storage::InMemoryRepository;

    struct Harness {
        engine: ResolutionEngine,
        manager: LinkManager,
        l2: Arc<MokaLinkCache>,
    }

    fn key(s: &str) -> ShortKey {
        ShortKey::new_unchecked(s)
    }

    fn harness_with(config: ResolverConfig) -> Harness {
        let repo = Arc::new(InMemoryRepository::new());
        let l2 = Arc::new(MokaLinkCache::new());
        let engine = ResolutionEngine::new(
            config,
            l2.clone(),
            repo.clone(),
            Arc::new(RecordingSink::default()),
        )
        .unwrap();
        let manager = LinkManager::new(repo, engine.invalidator());

        Harness {
            engine,
            manager,
            l2,
        }
    }

    fn harness() -> Harness {
        harness_with(ResolverConfig::default())
    }

    async fn resolve(engine: &ResolutionEngine, k: &str) -> std::result::Result<String, ResolveError> {
        engine.resolve(&key(k), RequestMeta::default()).await
    }

    #[tokio::test]
    async fn created_link_resolves() {
        let h = harness();

        let record = h
            .manager
            .create(key("abc123"), "https://example.com/page", "owner-1")
            .await
            .unwrap();

        assert_eq!(record.owner_id, "owner-1");
        assert_eq!(
            resolve(&h.engine, "abc123").await.unwrap(),
            "https://example.com/page"
        );
    }

    #[tokio::test]
    async fn duplicate_create_conflicts() {
        let h = harness();
        h.manager
            .create(key("abc123"), "https://one.example", "owner-1")
            .await
            .unwrap();

        let err = h
            .manager
            .create(key("abc123"), "https://two.example", "owner-2")
            .await
            .unwrap_err();

        assert!(matches!(err, StorageError::Conflict(_)));
    }

    #[tokio::test]
    async fn update_is_visible_immediately() {
        let h = harness();
        h.manager
            .create(key("abc123"), "https://example.com/page", "owner-1")
            .await
            .unwrap();
        resolve(&h.engine, "abc123").await.unwrap();

        h.manager
            .update_destination(&key("abc123"), "https://example.com/other")
            .await
            .unwrap();

        assert_eq!(
            resolve(&h.engine, "abc123").await.unwrap(),
            "https://example.com/other"
        );
    }

    #[tokio::test]
    async fn rename_invalidates_both_keys() {
        let h = harness();
        h.manager
            .create(key("gen001"), "https://example.com/page", "owner-1")
            .await
            .unwrap();
        resolve(&h.engine, "gen001").await.unwrap();

        h.manager
            .rename(&key("gen001"), &key("promo"))
            .await
            .unwrap();

        assert!(resolve(&h.engine, "gen001")
            .await
            .unwrap_err()
            .is_not_found());
        assert!(h.l2.get(&key("gen001")).await.unwrap().is_none());
        assert_eq!(
            resolve(&h.engine, "promo").await.unwrap(),
            "https://example.com/page"
        );
    }

    #[tokio::test]
    async fn delete_purges_cached_destination() {
        let h = harness();
        h.manager
            .create(key("abc123"), "https://example.com/page", "owner-1")
            .await
            .unwrap();
        resolve(&h.engine, "abc123").await.unwrap();

        assert!(h.manager.delete(&key("abc123")).await.unwrap());
        assert!(!h.manager.delete(&key("abc123")).await.unwrap());

        assert!(h.engine.l1().get(&key("abc123")).is_none());
        assert!(resolve(&h.engine, "abc123")
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test]
    async fn create_clears_negative_entry() {
        let h = harness_with(
            ResolverConfig::builder()
                .negative_ttl(Duration::from_secs(300))
                .build(),
        );
        assert!(resolve(&h.engine, "later1").await.is_err());

        h.manager
            .create(key("later1"), "https://example.com/later", "owner-1")
            .await
            .unwrap();

        assert_eq!(
            resolve(&h.engine, "later1").await.unwrap(),
            "https://example.com/later"
        );
    }

    #[tokio::test]
    async fn failed_mutation_leaves_caches_alone() {
        let h = harness();
        h.manager
            .create(key("abc123"), "https://example.com/page", "owner-1")
            .await
            .unwrap();
        resolve(&h.engine, "abc123").await.unwrap();

        let err = h
            .manager
            .update_destination(&key("nothere"), "https://example.com/x")
            .await
            .unwrap_err();

        assert!(matches!(err, StorageError::NotFound(_)));
        assert!(h.engine.l1().get(&key("abc123")).is_some());
    }
}
