use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use jiff::Timestamp;
use tracing::warn;
use waypoint_core::repository::{LinkRepository, LinkStore, Result, ShortLinkRecord};
use waypoint_core::{ShortKey, StorageError};

/// In-memory implementation of the store traits using DashMap.
///
/// Used for single-node deployments seeded at startup and for tests.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRepository {
    storage: DashMap<ShortKey, ShortLinkRecord>,
}

impl InMemoryRepository {
    /// Creates a new in-memory repository.
    pub fn new() -> Self {
        Self {
            storage: DashMap::new(),
        }
    }

    /// Creates a new in-memory repository with the specified capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            storage: DashMap::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.storage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }
}

#[async_trait]
impl LinkStore for InMemoryRepository {
    async fn find_by_key(&self, key: &ShortKey) -> Result<Option<ShortLinkRecord>> {
        Ok(self.storage.get(key).map(|entry| entry.value().clone()))
    }
}

#[async_trait]
impl LinkRepository for InMemoryRepository {
    async fn insert(&self, record: ShortLinkRecord) -> Result<()> {
        match self.storage.entry(record.short_key.clone()) {
            Entry::Occupied(_) => Err(StorageError::Conflict(record.short_key.to_string())),
            Entry::Vacant(slot) => {
                slot.insert(record);
                Ok(())
            }
        }
    }

    async fn update_destination(
        &self,
        key: &ShortKey,
        destination_url: &str,
    ) -> Result<ShortLinkRecord> {
        let mut entry = self
            .storage
            .get_mut(key)
            .ok_or_else(|| StorageError::NotFound(key.to_string()))?;

        entry.destination_url = destination_url.to_string();
        entry.updated_at = Timestamp::now();
        Ok(entry.clone())
    }

    async fn rename(&self, from: &ShortKey, to: &ShortKey) -> Result<ShortLinkRecord> {
        if from == to {
            return self
                .find_by_key(from)
                .await?
                .ok_or_else(|| StorageError::NotFound(from.to_string()));
        }

        // Never hold guards on both keys at once: they may share a shard.
        let (_, mut record) = self
            .storage
            .remove(from)
            .ok_or_else(|| StorageError::NotFound(from.to_string()))?;

        let record = match self.storage.entry(to.clone()) {
            Entry::Vacant(slot) => {
                record.short_key = to.clone();
                record.updated_at = Timestamp::now();
                slot.insert(record.clone());
                return Ok(record);
            }
            Entry::Occupied(_) => record,
        };

        // The source may have been claimed while it was out of the map.
        match self.storage.entry(from.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(record);
            }
            Entry::Occupied(_) => {
                warn!(key = %from, "Source key was re-created during a failed rename, keeping it");
            }
        }
        Err(StorageError::Conflict(to.to_string()))
    }

    async fn delete(&self, key: &ShortKey) -> Result<bool> {
        Ok(self.storage.remove(key).is_some())
    }
}
