//! Domain ports and supporting types for the hexagonal boundary.

mod macros;
pub(crate) use macros::define_port_error;

mod rate_limiter_cache;
mod squawk_command;
mod squawk_query;
mod squawk_repository;
mod telemetry;

#[cfg(test)]
pub use rate_limiter_cache::MockRateLimiterCache;
pub use rate_limiter_cache::{RateLimiterCache, RateLimiterCacheError};
#[cfg(test)]
pub use squawk_command::MockSquawkCommand;
pub use squawk_command::{FixtureSquawkCommand, SquawkCommand};
#[cfg(test)]
pub use squawk_query::MockSquawkQuery;
pub use squawk_query::{FixtureSquawkQuery, SquawkQuery};
#[cfg(test)]
pub use squawk_repository::MockSquawkRepository;
pub use squawk_repository::{SquawkRepository, SquawkRepositoryError};
#[cfg(test)]
pub use telemetry::MockTelemetry;
pub use telemetry::{
    AttributeValue, Attributes, CANCELLED_DESCRIPTION, ExceptionRecord, InstrumentKind,
    NoOpTelemetry, Span, SpanGuard, SpanKind, SpanRecorder, SpanStatus, Telemetry, TelemetryError,
};
