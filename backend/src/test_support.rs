//! Test doubles shared by unit tests (in `src/`) and integration tests (in
//! `tests/`).
//!
//! Compiled for `cfg(test)` and when the `test-support` feature is enabled.

mod clock;
mod telemetry;

pub use clock::MutableClock;
pub use telemetry::{RecordedEvent, RecordedMeasurement, RecordedSpan, RecordingTelemetry};
