//! Port for the expiring key/value store that gates squawk creation.
//!
//! A live entry under an author's key means the author is inside their rate
//! limit window. Entries are never deleted explicitly; they stop being
//! visible once their time-to-live elapses.
use std::time::Duration;

use async_trait::async_trait;

use super::define_port_error;

define_port_error! {
    /// Errors surfaced by rate limiter cache adapters.
    pub enum RateLimiterCacheError {
        /// Cache backend is unavailable or timing out.
        Backend { message: String } => "rate limiter cache backend failure: {message}",
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RateLimiterCache: Send + Sync {
    /// Read the value stored under `key`.
    ///
    /// Returns `Ok(None)` when the key is missing or its time-to-live has
    /// elapsed.
    async fn get(&self, key: &str) -> Result<Option<String>, RateLimiterCacheError>;

    /// Store `value` under `key`, visible for `ttl` from now.
    ///
    /// Overwrites any existing entry and restarts its expiry.
    async fn set(&self, key: &str, value: &str, ttl: Duration)
        -> Result<(), RateLimiterCacheError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_error_formats_message() {
        let err = RateLimiterCacheError::backend("connection reset");
        assert_eq!(
            err.to_string(),
            "rate limiter cache backend failure: connection reset"
        );
    }
}
