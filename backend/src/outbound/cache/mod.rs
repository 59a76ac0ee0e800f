//! Cache adapters.
//!
//! The rate limiter cache is process-local: entries live in memory and expire
//! on a monotonic clock. Deployments with several processes would need a
//! shared store behind the same port.

mod in_memory_rate_limiter_cache;

pub use in_memory_rate_limiter_cache::InMemoryRateLimiterCache;
