use thiserror::Error;
use waypoint_core::{ShortKey, StorageError};

/// Result type for [`resolve`](crate::ResolutionEngine::resolve).
pub type Result<T> = std::result::Result<T, ResolveError>;

/// Outcomes of a resolution that did not produce a destination.
///
/// Cache tier failures never show up here; they are absorbed by the cascade.
#[derive(Debug, Clone, Error)]
pub enum ResolveError {
    /// The durable store has no record for the key.
    #[error("short key not found: {0}")]
    NotFound(ShortKey),
    /// The durable store could not answer, so absence cannot be confirmed.
    #[error("durable store failed: {0}")]
    Storage(#[from] StorageError),
}

impl ResolveError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ResolveError::NotFound(_))
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
    #[error("tracker retains {retain} keys but is capped at {max_keys}")]
    RetainExceedsCap { retain: usize, max_keys: usize },
    #[error("ttl tiers are not monotonic: {0}")]
    NonMonotonicTiers(String),
}
