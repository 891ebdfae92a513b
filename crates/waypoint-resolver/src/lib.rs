//! The Waypoint resolution engine.
//!
//! [`ResolutionEngine`] walks the cache cascade (in-process [`LruCache`],
//! then a [`DistributedCache`], then the durable [`LinkStore`]), backfills
//! the faster tiers on a slower-tier hit and picks the L2 lifetime from an
//! [`AdaptiveTtlPolicy`] fed by a [`FrequencyTracker`]. Access bookkeeping
//! is handed to an [`AccessRecorder`] and never delays the caller.
//!
//! [`LinkManager`] is the mutation path: it writes the store and then asks
//! the [`InvalidationCoordinator`] to purge every affected key.
//!
//! [`LruCache`]: waypoint_cache::LruCache
//! [`DistributedCache`]: waypoint_core::DistributedCache
//! [`LinkStore`]: waypoint_core::LinkStore

pub mod config;
pub mod engine;
pub mod error;
pub mod frequency;
pub mod invalidation;
pub mod manager;
pub mod negative;
pub mod recorder;
pub mod ttl;

#[cfg(test)]
mod testing;

pub use config::{ResolverConfig, TrackerConfig, TtlPolicyConfig, TtlTier};
pub use engine::ResolutionEngine;
pub use error::{ConfigError, ResolveError, Result};
pub use frequency::FrequencyTracker;
pub use invalidation::InvalidationCoordinator;
pub use manager::LinkManager;
pub use recorder::{AccessRecorder, TracingAccessSink};
pub use ttl::AdaptiveTtlPolicy;
