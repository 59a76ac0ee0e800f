//! In-memory [`RateLimiterCache`] with per-key expiry.
//!
//! Expiry uses `tokio::time::Instant`, so tests can pause and advance time.
//! Expired entries are dropped lazily when read, on every write, and by the
//! optional background purge task.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::debug;

use crate::domain::ports::{
    Attributes, ExceptionRecord, RateLimiterCache, RateLimiterCacheError, SpanGuard, SpanKind,
    SpanStatus, Telemetry,
};

/// Expiry used when `now + ttl` is not representable.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

const GET_SPAN: &str = "RateLimiterCache.Get";
const SET_SPAN: &str = "RateLimiterCache.Set";
pub const HIT_EVENT: &str = "rate_limiter_cache.hit";
pub const MISS_EVENT: &str = "rate_limiter_cache.miss";
pub const SET_EVENT: &str = "rate_limiter_cache.set";

fn expiry(now: Instant, ttl: Duration) -> Instant {
    now.checked_add(ttl)
        .or_else(|| now.checked_add(FAR_FUTURE))
        .unwrap_or(now)
}

#[derive(Debug)]
struct Entry {
    value: String,
    expires_at: Instant,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Process-local rate limiter cache.
pub struct InMemoryRateLimiterCache {
    entries: Mutex<HashMap<String, Entry>>,
    telemetry: Arc<dyn Telemetry>,
}

impl InMemoryRateLimiterCache {
    pub fn new(telemetry: Arc<dyn Telemetry>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            telemetry,
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, Entry>>, RateLimiterCacheError> {
        self.entries
            .lock()
            .map_err(|_| RateLimiterCacheError::backend("rate limiter cache lock poisoned"))
    }

    /// Drop every expired entry, returning how many were removed.
    pub fn purge_expired(&self) -> Result<usize, RateLimiterCacheError> {
        let now = Instant::now();
        let mut entries = self.lock()?;
        let before = entries.len();
        entries.retain(|_, entry| entry.is_live(now));
        Ok(before - entries.len())
    }

    /// Number of entries still live.
    pub fn live_entries(&self) -> Result<usize, RateLimiterCacheError> {
        let now = Instant::now();
        Ok(self.lock()?.values().filter(|entry| entry.is_live(now)).count())
    }

    /// Purge expired entries every `period` until the cache is dropped.
    pub fn spawn_purge_task(self: &Arc<Self>, period: Duration) -> JoinHandle<()> {
        let cache: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(cache) = cache.upgrade() else {
                    break;
                };
                match cache.purge_expired() {
                    Ok(removed) if removed > 0 => {
                        debug!(removed, "purged expired rate limiter entries");
                    }
                    Ok(_) => {}
                    Err(error) => {
                        debug!(%error, "rate limiter purge skipped");
                    }
                }
            }
        })
    }

    fn fail(guard: SpanGuard, error: RateLimiterCacheError) -> RateLimiterCacheError {
        guard
            .span()
            .record_exception(ExceptionRecord::from_error(&error));
        guard.complete(SpanStatus::error(error.to_string()));
        error
    }
}

#[async_trait]
impl RateLimiterCache for InMemoryRateLimiterCache {
    async fn get(&self, key: &str) -> Result<Option<String>, RateLimiterCacheError> {
        let guard = SpanGuard::start(self.telemetry.as_ref(), GET_SPAN, SpanKind::Internal);
        guard.span().set_attribute("cache.key", key);

        let now = Instant::now();
        let value = match self.lock() {
            Ok(mut entries) => match entries.get(key) {
                Some(entry) if entry.is_live(now) => Some(entry.value.clone()),
                Some(_) => {
                    entries.remove(key);
                    None
                }
                None => None,
            },
            Err(error) => return Err(Self::fail(guard, error)),
        };

        let hit = value.is_some();
        guard.span().set_attribute("cache.hit", hit);
        guard.span().record_event(
            if hit { HIT_EVENT } else { MISS_EVENT },
            Attributes::new().with("cache.key", key),
        );
        guard.complete(SpanStatus::Ok);
        Ok(value)
    }

    async fn set(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<(), RateLimiterCacheError> {
        let guard = SpanGuard::start(self.telemetry.as_ref(), SET_SPAN, SpanKind::Internal);
        let expiration_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);
        let attributes = Attributes::new()
            .with("cache.key", key)
            .with("cache.expiration_ms", expiration_ms);
        guard.span().add_attributes(attributes.clone());

        let now = Instant::now();
        match self.lock() {
            Ok(mut entries) => {
                entries.retain(|_, entry| entry.is_live(now));
                entries.insert(
                    key.to_owned(),
                    Entry {
                        value: value.to_owned(),
                        expires_at: expiry(now, ttl),
                    },
                );
            }
            Err(error) => return Err(Self::fail(guard, error)),
        }

        guard.span().record_event(SET_EVENT, attributes);
        guard.complete(SpanStatus::Ok);
        Ok(())
    }
}
