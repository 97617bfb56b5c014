//! Bounded in-memory caches.
//!
//! [`AdaptiveCache`] combines three eviction signals:
//! - a TTL measured from the last write,
//! - LRU-K ranking (the K-th most recent access, not just the latest),
//! - an optional caller-supplied priority that skews the ranking.
//!
//! Time is read through a [`Clock`] so tests can drive expiry deterministically.

mod adaptive;
mod clock;

pub use adaptive::{AdaptiveCache, CacheConfig, CacheStats};
pub use clock::{Clock, ManualClock, SystemClock};

#[cfg(test)]
mod tests;
