//! Telemetry adapters that turn domain spans and instruments into log
//! records.
//!
//! [`TracingTelemetry`] is the default sink: spans become structured
//! `tracing` events emitted when the span ends, and instruments keep their
//! running totals in process so they can be inspected without an exporter.

mod tracing_telemetry;

pub use tracing_telemetry::{HistogramSummary, TELEMETRY_TARGET, TracingTelemetry};
