//! In-memory telemetry sink that records spans and measurements for
//! assertions.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::domain::ports::{
    Attributes, ExceptionRecord, InstrumentKind, Span, SpanKind, SpanRecorder, SpanStatus,
    Telemetry, TelemetryError,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Event captured on a span.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedEvent {
    pub name: String,
    pub attributes: Attributes,
}

/// Snapshot of a span and everything recorded on it.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedSpan {
    pub name: String,
    pub kind: SpanKind,
    pub attributes: Attributes,
    pub status: SpanStatus,
    pub events: Vec<RecordedEvent>,
    pub exceptions: Vec<ExceptionRecord>,
    /// Number of times the span was ended.
    pub end_count: u32,
}

impl RecordedSpan {
    #[must_use]
    pub fn has_event(&self, name: &str) -> bool {
        self.events.iter().any(|event| event.name == name)
    }

    #[must_use]
    pub fn event(&self, name: &str) -> Option<&RecordedEvent> {
        self.events.iter().find(|event| event.name == name)
    }
}

/// One counter increment or histogram observation.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedMeasurement {
    pub name: String,
    pub value: f64,
    pub tags: Attributes,
}

struct RecordingSpan(Mutex<RecordedSpan>);

impl SpanRecorder for RecordingSpan {
    fn add_attributes(&self, attributes: Attributes) {
        lock(&self.0).attributes.merge(attributes);
    }

    fn set_status(&self, status: SpanStatus) {
        lock(&self.0).status = status;
    }

    fn record_exception(&self, exception: ExceptionRecord) {
        lock(&self.0).exceptions.push(exception);
    }

    fn record_event(&self, name: &str, attributes: Attributes) {
        lock(&self.0).events.push(RecordedEvent {
            name: name.to_owned(),
            attributes,
        });
    }

    fn end(&self) {
        lock(&self.0).end_count += 1;
    }
}

/// Telemetry sink that keeps every span and measurement in memory.
///
/// Instrument bookkeeping mirrors a real backend: creation is idempotent,
/// reusing a name for another kind fails, and writes to unknown instruments
/// fail.
#[derive(Default)]
pub struct RecordingTelemetry {
    spans: Mutex<Vec<Arc<RecordingSpan>>>,
    instruments: Mutex<HashMap<String, InstrumentKind>>,
    measurements: Mutex<Vec<RecordedMeasurement>>,
}

impl RecordingTelemetry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshots of every span started so far, in start order.
    #[must_use]
    pub fn spans(&self) -> Vec<RecordedSpan> {
        lock(&self.spans)
            .iter()
            .map(|span| lock(&span.0).clone())
            .collect()
    }

    /// Snapshots of spans with the given name, in start order.
    #[must_use]
    pub fn spans_named(&self, name: &str) -> Vec<RecordedSpan> {
        self.spans()
            .into_iter()
            .filter(|span| span.name == name)
            .collect()
    }

    /// Most recent span with the given name.
    #[must_use]
    pub fn last_span(&self, name: &str) -> Option<RecordedSpan> {
        self.spans_named(name).pop()
    }

    /// Every event with the given name across all spans.
    #[must_use]
    pub fn events_named(&self, name: &str) -> Vec<RecordedEvent> {
        self.spans()
            .into_iter()
            .flat_map(|span| span.events)
            .filter(|event| event.name == name)
            .collect()
    }

    /// Whether an instrument of `kind` exists under `name`.
    #[must_use]
    pub fn has_instrument(&self, name: &str, kind: InstrumentKind) -> bool {
        lock(&self.instruments).get(name) == Some(&kind)
    }

    /// Number of distinct instruments created.
    #[must_use]
    pub fn instrument_count(&self) -> usize {
        lock(&self.instruments).len()
    }

    /// Measurements recorded on `name`.
    #[must_use]
    pub fn measurements(&self, name: &str) -> Vec<RecordedMeasurement> {
        lock(&self.measurements)
            .iter()
            .filter(|measurement| measurement.name == name)
            .cloned()
            .collect()
    }

    /// Sum of every increment recorded on counter `name`.
    #[must_use]
    pub fn counter_total(&self, name: &str) -> u64 {
        lock(&self.measurements)
            .iter()
            .filter(|measurement| measurement.name == name)
            .map(|measurement| measurement.value as u64)
            .sum()
    }

    fn create(&self, name: &str, kind: InstrumentKind) -> Result<(), TelemetryError> {
        let mut instruments = lock(&self.instruments);
        match instruments.get(name) {
            Some(existing) if *existing == kind => Ok(()),
            Some(_) => Err(TelemetryError::kind_mismatch(name)),
            None => {
                instruments.insert(name.to_owned(), kind);
                Ok(())
            }
        }
    }

    fn record(
        &self,
        name: &str,
        kind: InstrumentKind,
        value: f64,
        tags: &Attributes,
    ) -> Result<(), TelemetryError> {
        match lock(&self.instruments).get(name) {
            Some(existing) if *existing == kind => {}
            Some(_) => return Err(TelemetryError::kind_mismatch(name)),
            None => return Err(TelemetryError::unknown_instrument(name)),
        }
        lock(&self.measurements).push(RecordedMeasurement {
            name: name.to_owned(),
            value,
            tags: tags.clone(),
        });
        Ok(())
    }
}

impl Telemetry for RecordingTelemetry {
    fn start_span(&self, name: &str, kind: SpanKind) -> Span {
        let span = Arc::new(RecordingSpan(Mutex::new(RecordedSpan {
            name: name.to_owned(),
            kind,
            attributes: Attributes::new(),
            status: SpanStatus::Unset,
            events: Vec::new(),
            exceptions: Vec::new(),
            end_count: 0,
        })));
        lock(&self.spans).push(span.clone());
        Span::new(span)
    }

    fn create_counter(&self, name: &str, _description: &str) -> Result<(), TelemetryError> {
        self.create(name, InstrumentKind::Counter)
    }

    fn create_histogram(&self, name: &str, _description: &str) -> Result<(), TelemetryError> {
        self.create(name, InstrumentKind::Histogram)
    }

    fn increment_counter(
        &self,
        name: &str,
        amount: u64,
        tags: &Attributes,
    ) -> Result<(), TelemetryError> {
        self.record(name, InstrumentKind::Counter, amount as f64, tags)
    }

    fn record_histogram(
        &self,
        name: &str,
        value: f64,
        tags: &Attributes,
    ) -> Result<(), TelemetryError> {
        self.record(name, InstrumentKind::Histogram, value, tags)
    }
}
