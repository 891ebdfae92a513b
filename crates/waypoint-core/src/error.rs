use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum CoreError {
    #[error("invalid short key: {0}")]
    InvalidShortKey(String),
}

/// Failures of a cache tier.
///
/// Every variant means the same thing to the resolution cascade: the tier
/// could not answer, so the lookup falls through to the next one.
#[derive(Debug, Clone, Error)]
pub enum CacheError {
    #[error("cache backend unavailable: {0}")]
    Unavailable(String),
    #[error("cache operation timed out: {0}")]
    Timeout(String),
    #[error("cache initialization failed: {0}")]
    Initialization(String),
    #[error("cache operation failed: {0}")]
    Operation(String),
}

#[derive(Debug, Clone, Error)]
pub enum StorageError {
    #[error("short key already exists: {0}")]
    Conflict(String),
    #[error("short key not found: {0}")]
    NotFound(String),
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
    #[error("storage operation timed out: {0}")]
    Timeout(String),
    #[error("storage query failed: {0}")]
    Query(String),
    #[error("stored data is invalid: {0}")]
    InvalidData(String),
}

/// Failures of an access analytics sink.
#[derive(Debug, Clone, Error)]
pub enum SinkError {
    #[error("access sink unavailable: {0}")]
    Unavailable(String),
    #[error("access event rejected: {0}")]
    Rejected(String),
}
