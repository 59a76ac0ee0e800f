//! Prometheus adapter for the telemetry port.
//!
//! Counters and histograms are exported through the `prometheus` crate and
//! exposed via the `/metrics` endpoint. Spans are not a Prometheus concept;
//! they are forwarded to a delegate sink.
//!
//! Prometheus fixes label names when a metric is registered, whereas the
//! port only learns tag keys on the first write. Registration is therefore
//! deferred: the first write binds the instrument to its (sorted) tag keys,
//! and later writes with a different key set are rejected.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use prometheus::{CounterVec, HistogramOpts, HistogramVec, Opts, Registry};

use crate::domain::ports::{
    Attributes, InstrumentKind, Span, SpanKind, Telemetry, TelemetryError,
};

/// Prometheus-safe form of an instrument name.
///
/// # Examples
/// ```
/// use squawker::outbound::metrics::metric_name;
///
/// assert_eq!(metric_name("squawk.banned_term.count"), "squawk_banned_term_count");
/// ```
#[must_use]
pub fn metric_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

enum Bound {
    Counter(CounterVec),
    Histogram(HistogramVec),
}

struct Instrument {
    kind: InstrumentKind,
    description: String,
    bound: Option<(Vec<String>, Bound)>,
}

/// Prometheus-backed telemetry sink.
///
/// # Metric naming
///
/// - **Name**: the instrument name with every character outside
///   `[A-Za-z0-9_]` replaced by `_`
/// - **Type**: Counter or Histogram, as created
/// - **Labels**: the tag keys supplied on the first write, sorted
pub struct PrometheusTelemetry {
    registry: Registry,
    spans: Arc<dyn Telemetry>,
    instruments: Mutex<HashMap<String, Instrument>>,
}

impl PrometheusTelemetry {
    /// Export instruments to `registry` and send spans to `spans`.
    pub fn new(registry: &Registry, spans: Arc<dyn Telemetry>) -> Self {
        Self {
            registry: registry.clone(),
            spans,
            instruments: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Instrument>> {
        self.instruments
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn create(
        &self,
        name: &str,
        description: &str,
        kind: InstrumentKind,
    ) -> Result<(), TelemetryError> {
        let mut instruments = self.lock();
        match instruments.get(name) {
            Some(existing) if existing.kind == kind => Ok(()),
            Some(_) => Err(TelemetryError::kind_mismatch(name)),
            None => {
                instruments.insert(
                    name.to_owned(),
                    Instrument {
                        kind,
                        description: description.to_owned(),
                        bound: None,
                    },
                );
                Ok(())
            }
        }
    }

    fn register(
        &self,
        name: &str,
        instrument: &Instrument,
        labels: &[&str],
    ) -> Result<Bound, TelemetryError> {
        let export = |error: prometheus::Error| TelemetryError::export(error.to_string());
        let metric = metric_name(name);
        let bound = match instrument.kind {
            InstrumentKind::Counter => {
                let vec = CounterVec::new(Opts::new(metric, &instrument.description), labels)
                    .map_err(export)?;
                self.registry
                    .register(Box::new(vec.clone()))
                    .map_err(export)?;
                Bound::Counter(vec)
            }
            InstrumentKind::Histogram => {
                let vec = HistogramVec::new(
                    HistogramOpts::new(metric, &instrument.description),
                    labels,
                )
                .map_err(export)?;
                self.registry
                    .register(Box::new(vec.clone()))
                    .map_err(export)?;
                Bound::Histogram(vec)
            }
        };
        Ok(bound)
    }

    /// Resolve the instrument for a write, binding its labels on first use.
    fn with_bound<T>(
        &self,
        name: &str,
        kind: InstrumentKind,
        tags: &Attributes,
        write: impl FnOnce(&Bound, &[String]) -> T,
    ) -> Result<T, TelemetryError> {
        let mut keys: Vec<&str> = tags.keys().collect();
        keys.sort_unstable();

        let mut instruments = self.lock();
        let instrument = instruments
            .get_mut(name)
            .ok_or_else(|| TelemetryError::unknown_instrument(name))?;
        if instrument.kind != kind {
            return Err(TelemetryError::kind_mismatch(name));
        }
        if instrument.bound.is_none() {
            let bound = self.register(name, instrument, &keys)?;
            instrument.bound = Some((keys.iter().map(|k| (*k).to_owned()).collect(), bound));
        }
        let Some((labels, bound)) = &instrument.bound else {
            return Err(TelemetryError::unknown_instrument(name));
        };
        if labels.iter().map(String::as_str).ne(keys.iter().copied()) {
            return Err(TelemetryError::label_mismatch(name, labels.join(", ")));
        }

        let values: Vec<String> = labels
            .iter()
            .map(|key| tags.get(key).map(ToString::to_string).unwrap_or_default())
            .collect();
        Ok(write(bound, &values))
    }
}

impl Telemetry for PrometheusTelemetry {
    fn start_span(&self, name: &str, kind: SpanKind) -> Span {
        self.spans.start_span(name, kind)
    }

    fn create_counter(&self, name: &str, description: &str) -> Result<(), TelemetryError> {
        self.create(name, description, InstrumentKind::Counter)
    }

    fn create_histogram(&self, name: &str, description: &str) -> Result<(), TelemetryError> {
        self.create(name, description, InstrumentKind::Histogram)
    }

    fn increment_counter(
        &self,
        name: &str,
        amount: u64,
        tags: &Attributes,
    ) -> Result<(), TelemetryError> {
        self.with_bound(name, InstrumentKind::Counter, tags, |bound, values| {
            if let Bound::Counter(counter) = bound {
                let values: Vec<&str> = values.iter().map(String::as_str).collect();
                counter
                    .with_label_values(values.as_slice())
                    .inc_by(amount as f64);
            }
        })
    }

    fn record_histogram(
        &self,
        name: &str,
        value: f64,
        tags: &Attributes,
    ) -> Result<(), TelemetryError> {
        self.with_bound(name, InstrumentKind::Histogram, tags, |bound, values| {
            if let Bound::Histogram(histogram) = bound {
                let values: Vec<&str> = values.iter().map(String::as_str).collect();
                histogram.with_label_values(values.as_slice()).observe(value);
            }
        })
    }
}
