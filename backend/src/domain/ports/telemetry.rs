//! Domain port for distributed tracing spans and metric instruments.
//!
//! Domain code opens spans and records counters through [`Telemetry`] without
//! knowing which backend receives them. A [`Span`] is a cheap, cloneable and
//! possibly absent handle: when no listener is attached every call on it is a
//! no-op, so callers never branch on whether telemetry is enabled.
//!
//! Spans are closed by a [`SpanGuard`], which ends its span exactly once when
//! dropped. A guard dropped before [`SpanGuard::complete`] marks its span as
//! cancelled, covering futures that are abandoned mid-flight.

use std::fmt;
use std::sync::Arc;

use super::define_port_error;

/// Status description applied to spans whose guard is dropped unfinished.
pub const CANCELLED_DESCRIPTION: &str = "operation cancelled";

define_port_error! {
    /// Errors raised by telemetry backends.
    pub enum TelemetryError {
        /// The instrument was used before being created.
        UnknownInstrument { name: String } => "instrument {name} has not been created",
        /// The name is already taken by an instrument of another kind.
        KindMismatch { name: String } => "instrument {name} already exists with a different kind",
        /// The tag keys differ from the ones the instrument was bound to.
        LabelMismatch { name: String, expected: String } =>
            "instrument {name} expects tags [{expected}]",
        /// Exporter rejected the write.
        Export { message: String } => "telemetry exporter failed: {message}",
    }
}

/// Role of a span within a trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpanKind {
    Internal,
    Server,
    Client,
    Producer,
    Consumer,
}

impl SpanKind {
    /// Lower-case name used by exporters.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Internal => "internal",
            Self::Server => "server",
            Self::Client => "client",
            Self::Producer => "producer",
            Self::Consumer => "consumer",
        }
    }
}

/// Kind of metric instrument registered under a name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstrumentKind {
    Counter,
    Histogram,
}

/// Outcome recorded on a span.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SpanStatus {
    #[default]
    Unset,
    Ok,
    Error { description: String },
}

impl SpanStatus {
    /// Error status with a description.
    pub fn error(description: impl Into<String>) -> Self {
        Self::Error {
            description: description.into(),
        }
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }
}

/// Scalar attribute value attached to spans, events, and metric tags.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(value) => f.write_str(value),
            Self::Int(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
            Self::Bool(value) => write!(f, "{value}"),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_owned())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<u64> for AttributeValue {
    fn from(value: u64) -> Self {
        Self::Int(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<usize> for AttributeValue {
    fn from(value: usize) -> Self {
        Self::Int(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// Ordered key/value attributes.
///
/// # Examples
/// ```
/// use squawker::domain::ports::{AttributeValue, Attributes};
///
/// let attrs = Attributes::new().with("cache.key", "rate-limit:1").with("cache.hit", true);
/// assert_eq!(attrs.get("cache.hit"), Some(&AttributeValue::Bool(true)));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attributes(Vec<(String, AttributeValue)>);

impl Attributes {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an attribute, replacing any earlier value for the same key.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert or replace an attribute in place.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<AttributeValue>) {
        let key = key.into();
        let value = value.into();
        match self.0.iter_mut().find(|(existing, _)| *existing == key) {
            Some(slot) => slot.1 = value,
            None => self.0.push((key, value)),
        }
    }

    /// Merge `other` into `self`; later values win.
    pub fn merge(&mut self, other: Self) {
        for (key, value) in other.0 {
            self.insert(key, value);
        }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&AttributeValue> {
        self.0
            .iter()
            .find_map(|(existing, value)| (existing == key).then_some(value))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttributeValue)> {
        self.0.iter().map(|(key, value)| (key.as_str(), value))
    }

    /// Attribute keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(key, _)| key.as_str())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }
}

/// Error details recorded on a span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExceptionRecord {
    /// Rust type name of the error.
    pub error_type: String,
    /// `Display` rendering of the error.
    pub message: String,
    /// `Display` renderings of the error's `source()` chain, outermost first.
    pub causes: Vec<String>,
}

impl ExceptionRecord {
    /// Capture an error's type, message, and source chain.
    pub fn from_error<E>(error: &E) -> Self
    where
        E: std::error::Error,
    {
        let mut causes = Vec::new();
        let mut source = error.source();
        while let Some(cause) = source {
            causes.push(cause.to_string());
            source = cause.source();
        }
        Self {
            error_type: std::any::type_name::<E>().to_owned(),
            message: error.to_string(),
            causes,
        }
    }
}

/// Backend half of a live span. Implemented by telemetry adapters.
pub trait SpanRecorder: Send + Sync {
    fn add_attributes(&self, attributes: Attributes);
    fn set_status(&self, status: SpanStatus);
    fn record_exception(&self, exception: ExceptionRecord);
    fn record_event(&self, name: &str, attributes: Attributes);
    /// Close the span. Called exactly once, by [`SpanGuard`].
    fn end(&self);
}

/// Possibly absent handle to one traced operation.
#[derive(Clone, Default)]
pub struct Span {
    recorder: Option<Arc<dyn SpanRecorder>>,
}

impl Span {
    /// A handle that ignores every call.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Wrap an adapter-provided recorder.
    pub fn new(recorder: Arc<dyn SpanRecorder>) -> Self {
        Self {
            recorder: Some(recorder),
        }
    }

    /// Whether calls on this handle reach a backend.
    #[must_use]
    pub fn is_recording(&self) -> bool {
        self.recorder.is_some()
    }

    pub fn add_attributes(&self, attributes: Attributes) {
        if let Some(recorder) = &self.recorder {
            recorder.add_attributes(attributes);
        }
    }

    pub fn set_attribute(&self, key: impl Into<String>, value: impl Into<AttributeValue>) {
        self.add_attributes(Attributes::new().with(key, value));
    }

    pub fn set_status(&self, status: SpanStatus) {
        if let Some(recorder) = &self.recorder {
            recorder.set_status(status);
        }
    }

    pub fn record_exception(&self, exception: ExceptionRecord) {
        if let Some(recorder) = &self.recorder {
            recorder.record_exception(exception);
        }
    }

    pub fn record_event(&self, name: &str, attributes: Attributes) {
        if let Some(recorder) = &self.recorder {
            recorder.record_event(name, attributes);
        }
    }

    fn end(&self) {
        if let Some(recorder) = &self.recorder {
            recorder.end();
        }
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Span")
            .field("recording", &self.is_recording())
            .finish()
    }
}

/// Owns a span and ends it exactly once on drop.
///
/// # Examples
/// ```
/// use squawker::domain::ports::{NoOpTelemetry, SpanGuard, SpanKind, SpanStatus};
///
/// let guard = SpanGuard::start(&NoOpTelemetry, "Example", SpanKind::Internal);
/// guard.span().set_attribute("example.key", 1_i64);
/// guard.complete(SpanStatus::Ok);
/// ```
#[derive(Debug)]
pub struct SpanGuard {
    span: Span,
    completed: bool,
}

impl SpanGuard {
    /// Create a new guard that ends `span` when dropped.
    pub fn new(span: Span) -> Self {
        Self {
            span,
            completed: false,
        }
    }

    /// Open a span on `telemetry` and guard it.
    pub fn start(telemetry: &dyn Telemetry, name: &str, kind: SpanKind) -> Self {
        Self::new(telemetry.start_span(name, kind))
    }

    #[must_use]
    pub fn span(&self) -> &Span {
        &self.span
    }

    /// Set the final status and end the span.
    pub fn complete(mut self, status: SpanStatus) {
        self.span.set_status(status);
        self.completed = true;
    }
}

impl Drop for SpanGuard {
    fn drop(&mut self) {
        if !self.completed {
            self.span.set_status(SpanStatus::error(CANCELLED_DESCRIPTION));
        }
        self.span.end();
    }
}

/// Tracing and metrics sink used by domain services and adapters.
///
/// Instrument creation is idempotent: creating an existing instrument of the
/// same kind succeeds without duplicating it.
#[cfg_attr(test, mockall::automock)]
pub trait Telemetry: Send + Sync {
    /// Open a span. May return [`Span::none`] when nothing is listening.
    fn start_span(&self, name: &str, kind: SpanKind) -> Span;

    /// Create a monotonically increasing counter.
    fn create_counter(&self, name: &str, description: &str) -> Result<(), TelemetryError>;

    /// Create a histogram.
    fn create_histogram(&self, name: &str, description: &str) -> Result<(), TelemetryError>;

    /// Add `amount` to a counter created earlier.
    fn increment_counter(
        &self,
        name: &str,
        amount: u64,
        tags: &Attributes,
    ) -> Result<(), TelemetryError>;

    /// Record one observation on a histogram created earlier.
    fn record_histogram(
        &self,
        name: &str,
        value: f64,
        tags: &Attributes,
    ) -> Result<(), TelemetryError>;
}

/// Telemetry sink that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpTelemetry;

impl Telemetry for NoOpTelemetry {
    fn start_span(&self, _name: &str, _kind: SpanKind) -> Span {
        Span::none()
    }

    fn create_counter(&self, _name: &str, _description: &str) -> Result<(), TelemetryError> {
        Ok(())
    }

    fn create_histogram(&self, _name: &str, _description: &str) -> Result<(), TelemetryError> {
        Ok(())
    }

    fn increment_counter(
        &self,
        _name: &str,
        _amount: u64,
        _tags: &Attributes,
    ) -> Result<(), TelemetryError> {
        Ok(())
    }

    fn record_histogram(
        &self,
        _name: &str,
        _value: f64,
        _tags: &Attributes,
    ) -> Result<(), TelemetryError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use rstest::rstest;

    #[derive(Default)]
    struct CallLog {
        statuses: Mutex<Vec<SpanStatus>>,
        ends: Mutex<u32>,
    }

    impl SpanRecorder for CallLog {
        fn add_attributes(&self, _attributes: Attributes) {}

        fn set_status(&self, status: SpanStatus) {
            self.statuses.lock().expect("statuses lock").push(status);
        }

        fn record_exception(&self, _exception: ExceptionRecord) {}

        fn record_event(&self, _name: &str, _attributes: Attributes) {}

        fn end(&self) {
            *self.ends.lock().expect("ends lock") += 1;
        }
    }

    #[rstest]
    fn absent_span_ignores_every_call() {
        let span = Span::none();
        span.set_attribute("k", "v");
        span.set_status(SpanStatus::Ok);
        span.record_event("evt", Attributes::new());
        span.record_exception(ExceptionRecord {
            error_type: "E".into(),
            message: "m".into(),
            causes: Vec::new(),
        });
        assert!(!span.is_recording());
        drop(SpanGuard::new(span));
    }

    #[rstest]
    fn completed_guard_ends_once_with_final_status() {
        let log = Arc::new(CallLog::default());
        let guard = SpanGuard::new(Span::new(log.clone()));
        guard.complete(SpanStatus::Ok);

        assert_eq!(*log.ends.lock().expect("ends lock"), 1);
        assert_eq!(
            *log.statuses.lock().expect("statuses lock"),
            vec![SpanStatus::Ok]
        );
    }

    #[rstest]
    fn dropped_guard_marks_span_cancelled() {
        let log = Arc::new(CallLog::default());
        drop(SpanGuard::new(Span::new(log.clone())));

        assert_eq!(*log.ends.lock().expect("ends lock"), 1);
        assert_eq!(
            *log.statuses.lock().expect("statuses lock"),
            vec![SpanStatus::error(CANCELLED_DESCRIPTION)]
        );
    }

    #[rstest]
    fn attributes_replace_existing_keys() {
        let mut attrs = Attributes::new().with("a", 1_i64).with("b", "x");
        attrs.merge(Attributes::new().with("a", 2_i64));

        assert_eq!(attrs.len(), 2);
        assert_eq!(attrs.get("a"), Some(&AttributeValue::Int(2)));
        assert_eq!(attrs.keys().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[derive(Debug, thiserror::Error)]
    #[error("outer failure")]
    struct Outer(#[source] std::io::Error);

    #[rstest]
    fn exception_record_captures_type_and_sources() {
        let error = Outer(std::io::Error::other("disk on fire"));
        let record = ExceptionRecord::from_error(&error);

        assert!(record.error_type.ends_with("Outer"));
        assert_eq!(record.message, "outer failure");
        assert_eq!(record.causes, vec!["disk on fire".to_owned()]);
    }

    #[rstest]
    fn noop_telemetry_accepts_everything() {
        let telemetry = NoOpTelemetry;
        assert!(!telemetry.start_span("x", SpanKind::Internal).is_recording());
        assert!(telemetry.create_counter("c", "d").is_ok());
        assert!(telemetry.increment_counter("c", 1, &Attributes::new()).is_ok());
        assert!(telemetry.record_histogram("h", 1.0, &Attributes::new()).is_ok());
    }

    #[rstest]
    fn error_constructors_accept_str() {
        let err = TelemetryError::label_mismatch("squawk.duplicate.count", "user_id");
        assert_eq!(
            err.to_string(),
            "instrument squawk.duplicate.count expects tags [user_id]"
        );
    }
}
