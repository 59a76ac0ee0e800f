//! Shared harness wiring the squawk service to its in-memory adapters.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use squawker::domain::pipeline::Instrumented;
use squawker::domain::SquawkService;
use squawker::outbound::cache::InMemoryRateLimiterCache;
use squawker::outbound::persistence::InMemorySquawkRepository;
use squawker::test_support::{MutableClock, RecordingTelemetry};

/// Service type under test.
pub type Service = Instrumented<SquawkService<InMemoryRateLimiterCache, InMemorySquawkRepository>>;

/// Wall-clock time at which every harness starts.
pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0)
        .single()
        .expect("valid timestamp")
}

/// Service plus handles on every collaborator.
pub struct Harness {
    pub telemetry: Arc<RecordingTelemetry>,
    pub clock: Arc<MutableClock>,
    pub cache: Arc<InMemoryRateLimiterCache>,
    pub repository: Arc<InMemorySquawkRepository>,
    pub service: Arc<Service>,
}

impl Harness {
    pub fn new() -> Self {
        let telemetry = Arc::new(RecordingTelemetry::new());
        let clock = Arc::new(MutableClock::new(start_time()));
        let cache = Arc::new(InMemoryRateLimiterCache::new(telemetry.clone()));
        let repository = Arc::new(InMemorySquawkRepository::new(telemetry.clone()));
        let service = Arc::new(
            SquawkService::new(
                cache.clone(),
                repository.clone(),
                telemetry.clone(),
                clock.clone(),
            )
            .instrumented(),
        );
        Self {
            telemetry,
            clock,
            cache,
            repository,
            service,
        }
    }

    /// Move both the wall clock and the paused Tokio clock forward.
    ///
    /// Requires a runtime started with `start_paused = true`.
    pub async fn advance(&self, by: Duration) {
        self.clock.advance(by);
        tokio::time::advance(by).await;
    }
}
