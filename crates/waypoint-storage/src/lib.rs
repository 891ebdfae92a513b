//! Durable store (L3) implementations for Waypoint.

pub mod access;
pub mod memory;
pub mod mysql;

pub use access::MySqlAccessSink;
pub use memory::InMemoryRepository;
pub use mysql::MySqlRepository;
pub use waypoint_core::{LinkRepository, LinkStore, ShortLinkRecord, StorageError};
