//! Outbound adapters implementing domain ports for infrastructure.
//!
//! This module follows the hexagonal architecture pattern, providing concrete
//! implementations of domain port traits:
//!
//! - **cache**: in-memory rate limiter cache with time-to-live expiry
//! - **persistence**: in-memory squawk repository
//! - **telemetry**: `tracing`-backed spans and in-process instruments
//! - **metrics**: Prometheus-backed instrument exporter (feature-gated)
//!
//! Adapters are thin translators between domain types and their backing
//! stores. They contain no business logic.

pub mod cache;
#[cfg(feature = "metrics")]
pub mod metrics;
pub mod persistence;
pub mod telemetry;
