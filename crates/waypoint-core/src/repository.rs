use crate::error::StorageError;
use crate::short_key::ShortKey;
use async_trait::async_trait;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};

/// Result type for repository operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// The authoritative mapping from a short key to its destination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShortLinkRecord {
    pub short_key: ShortKey,
    /// The URL to redirect to.
    pub destination_url: String,
    /// Opaque reference to the principal that created the link.
    pub owner_id: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl ShortLinkRecord {
    /// Creates a fresh record stamped with the current time.
    pub fn new(
        short_key: ShortKey,
        destination_url: impl Into<String>,
        owner_id: impl Into<String>,
    ) -> Self {
        let now = Timestamp::now();
        Self {
            short_key,
            destination_url: destination_url.into(),
            owner_id: owner_id.into(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// A read-only view of the durable store.
///
/// This is the only store operation the resolution cascade needs.
#[async_trait]
pub trait LinkStore: Send + Sync + 'static {
    /// Retrieves the record for a given short key.
    /// Returns `None` if the key does not exist.
    async fn find_by_key(&self, key: &ShortKey) -> Result<Option<ShortLinkRecord>>;
}

/// The mutating side of the durable store.
///
/// Uniqueness of short keys is enforced here, never by the cache tiers.
#[async_trait]
pub trait LinkRepository: LinkStore {
    /// Inserts a new record. Returns `Err(Conflict)` if the key already exists.
    async fn insert(&self, record: ShortLinkRecord) -> Result<()>;

    /// Points an existing key at a new destination.
    /// Returns `Err(NotFound)` if the key does not exist.
    async fn update_destination(
        &self,
        key: &ShortKey,
        destination_url: &str,
    ) -> Result<ShortLinkRecord>;

    /// Moves a record from one key to another (e.g. a custom alias replacing
    /// a generated key). Returns `Err(Conflict)` if `to` is already taken.
    async fn rename(&self, from: &ShortKey, to: &ShortKey) -> Result<ShortLinkRecord>;

    /// Deletes the record for a given short key.
    /// Returns `true` if the record existed and was removed.
    async fn delete(&self, key: &ShortKey) -> Result<bool>;
}
