//! [`Telemetry`] implementation backed by `tracing`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::domain::TraceId;
use crate::domain::ports::{
    Attributes, ExceptionRecord, InstrumentKind, Span, SpanKind, SpanRecorder, SpanStatus,
    Telemetry, TelemetryError,
};

/// Log target for every record this adapter emits.
pub const TELEMETRY_TARGET: &str = "squawker::telemetry";

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn render(attributes: &Attributes) -> String {
    attributes
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Count and sum of the observations on one histogram.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct HistogramSummary {
    pub count: u64,
    pub sum: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Instrument {
    Counter(u64),
    Histogram(HistogramSummary),
}

impl Instrument {
    fn kind(&self) -> InstrumentKind {
        match self {
            Self::Counter(_) => InstrumentKind::Counter,
            Self::Histogram(_) => InstrumentKind::Histogram,
        }
    }
}

struct SpanState {
    attributes: Attributes,
    status: SpanStatus,
    ended: bool,
}

struct TracingSpan {
    name: String,
    kind: SpanKind,
    trace_id: Option<TraceId>,
    started: Instant,
    state: Mutex<SpanState>,
}

impl TracingSpan {
    fn trace_id(&self) -> String {
        self.trace_id.map(|id| id.to_string()).unwrap_or_default()
    }
}

impl SpanRecorder for TracingSpan {
    fn add_attributes(&self, attributes: Attributes) {
        lock(&self.state).attributes.merge(attributes);
    }

    fn set_status(&self, status: SpanStatus) {
        lock(&self.state).status = status;
    }

    fn record_exception(&self, exception: ExceptionRecord) {
        warn!(
            target: TELEMETRY_TARGET,
            span = %self.name,
            trace_id = %self.trace_id(),
            error.type = %exception.error_type,
            error.message = %exception.message,
            error.causes = %exception.causes.join(": "),
            "exception recorded"
        );
    }

    fn record_event(&self, name: &str, attributes: Attributes) {
        info!(
            target: TELEMETRY_TARGET,
            span = %self.name,
            trace_id = %self.trace_id(),
            event = name,
            attributes = %render(&attributes),
            "span event"
        );
    }

    fn end(&self) {
        let mut state = lock(&self.state);
        if state.ended {
            return;
        }
        state.ended = true;
        let duration_ms = self.started.elapsed().as_secs_f64() * 1000.0;
        let attributes = render(&state.attributes);
        match &state.status {
            SpanStatus::Error { description } => warn!(
                target: TELEMETRY_TARGET,
                span = %self.name,
                kind = self.kind.as_str(),
                trace_id = %self.trace_id(),
                duration_ms,
                status = "error",
                status.description = %description,
                attributes = %attributes,
                "span closed"
            ),
            SpanStatus::Ok | SpanStatus::Unset => info!(
                target: TELEMETRY_TARGET,
                span = %self.name,
                kind = self.kind.as_str(),
                trace_id = %self.trace_id(),
                duration_ms,
                status = if state.status == SpanStatus::Ok { "ok" } else { "unset" },
                attributes = %attributes,
                "span closed"
            ),
        }
    }
}

/// Telemetry sink writing spans as structured log records.
///
/// Instruments are tracked in memory; each write is also logged at debug
/// level under [`TELEMETRY_TARGET`].
#[derive(Default)]
pub struct TracingTelemetry {
    instruments: Mutex<HashMap<String, Instrument>>,
}

impl TracingTelemetry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Running total of a counter, if it exists.
    pub fn counter_value(&self, name: &str) -> Option<u64> {
        match lock(&self.instruments).get(name) {
            Some(Instrument::Counter(total)) => Some(*total),
            _ => None,
        }
    }

    /// Observations recorded on a histogram, if it exists.
    pub fn histogram_summary(&self, name: &str) -> Option<HistogramSummary> {
        match lock(&self.instruments).get(name) {
            Some(Instrument::Histogram(summary)) => Some(*summary),
            _ => None,
        }
    }

    fn create(&self, name: &str, description: &str, fresh: Instrument) -> Result<(), TelemetryError> {
        let mut instruments = lock(&self.instruments);
        match instruments.get(name) {
            Some(existing) if existing.kind() == fresh.kind() => Ok(()),
            Some(_) => Err(TelemetryError::kind_mismatch(name)),
            None => {
                debug!(target: TELEMETRY_TARGET, instrument = name, description, "instrument created");
                instruments.insert(name.to_owned(), fresh);
                Ok(())
            }
        }
    }
}

impl Telemetry for TracingTelemetry {
    fn start_span(&self, name: &str, kind: SpanKind) -> Span {
        Span::new(Arc::new(TracingSpan {
            name: name.to_owned(),
            kind,
            trace_id: TraceId::current(),
            started: Instant::now(),
            state: Mutex::new(SpanState {
                attributes: Attributes::new(),
                status: SpanStatus::Unset,
                ended: false,
            }),
        }))
    }

    fn create_counter(&self, name: &str, description: &str) -> Result<(), TelemetryError> {
        self.create(name, description, Instrument::Counter(0))
    }

    fn create_histogram(&self, name: &str, description: &str) -> Result<(), TelemetryError> {
        self.create(
            name,
            description,
            Instrument::Histogram(HistogramSummary::default()),
        )
    }

    fn increment_counter(
        &self,
        name: &str,
        amount: u64,
        tags: &Attributes,
    ) -> Result<(), TelemetryError> {
        let mut instruments = lock(&self.instruments);
        match instruments.get_mut(name) {
            Some(Instrument::Counter(total)) => {
                *total = total.saturating_add(amount);
                debug!(target: TELEMETRY_TARGET, counter = name, amount, tags = %render(tags), "counter incremented");
                Ok(())
            }
            Some(Instrument::Histogram(_)) => Err(TelemetryError::kind_mismatch(name)),
            None => Err(TelemetryError::unknown_instrument(name)),
        }
    }

    fn record_histogram(
        &self,
        name: &str,
        value: f64,
        tags: &Attributes,
    ) -> Result<(), TelemetryError> {
        let mut instruments = lock(&self.instruments);
        match instruments.get_mut(name) {
            Some(Instrument::Histogram(summary)) => {
                summary.count += 1;
                summary.sum += value;
                debug!(target: TELEMETRY_TARGET, histogram = name, value, tags = %render(tags), "histogram recorded");
                Ok(())
            }
            Some(Instrument::Counter(_)) => Err(TelemetryError::kind_mismatch(name)),
            None => Err(TelemetryError::unknown_instrument(name)),
        }
    }
}
