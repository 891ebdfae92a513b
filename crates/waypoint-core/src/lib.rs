//! Core types and traits for the Waypoint redirect service.
//!
//! This crate provides the domain types shared by every tier of the
//! resolution cascade, and the collaborator traits that the cache,
//! storage and analytics adapters implement.

pub mod access;
pub mod cache;
pub mod error;
pub mod repository;
pub mod short_key;

pub use access::{AccessEvent, AccessSink, RequestMeta};
pub use cache::DistributedCache;
pub use error::{CacheError, CoreError, SinkError, StorageError};
pub use repository::{LinkRepository, LinkStore, ShortLinkRecord};
pub use short_key::ShortKey;
