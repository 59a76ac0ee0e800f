//! Outbound adapters for metrics exporting.
//!
//! This module provides a Prometheus-backed implementation of the telemetry
//! port. All adapters here are feature-gated behind the `metrics` feature.

mod prometheus_telemetry;

pub use prometheus_telemetry::{PrometheusTelemetry, metric_name};
