//! Cache tiers for the Waypoint resolution cascade.
//!
//! - [`LruCache`] is the in-process tier (L1): fixed capacity, strict
//!   least-recently-used eviction, no expiry.
//! - [`RedisLinkCache`] and [`MokaLinkCache`] implement
//!   [`DistributedCache`](waypoint_core::DistributedCache) (L2), where every
//!   entry carries its own TTL.

pub mod lru;
pub mod moka;
pub mod redis;

pub use self::lru::LruCache;
pub use self::moka::MokaLinkCache;
pub use self::redis::RedisLinkCache;
pub use waypoint_core::{CacheError, DistributedCache};
