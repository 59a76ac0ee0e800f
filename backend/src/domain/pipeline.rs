//! Cross-cutting instrumentation applied to every request.
//!
//! [`instrument`] wraps one request/handler pair: it opens an internal span
//! named after the request type, runs the handler, and records the outcome.
//! Errors are observed and returned unchanged; the wrapper never classifies
//! or swallows them. The span is ended exactly once on every exit path,
//! including when the returned future is dropped before completion.
//!
//! [`RequestHandler`] and [`Instrumented`] let services register handlers per
//! request type and dispatch through the wrapper without repeating it.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::TraceId;
use crate::domain::ports::{
    Attributes, ExceptionRecord, Span, SpanGuard, SpanKind, SpanStatus, Telemetry,
};

/// Span attribute carrying the request type name.
pub const REQUEST_TYPE_ATTRIBUTE: &str = "request.type";
/// Span attribute carrying the request-scoped trace identifier.
pub const TRACE_ID_ATTRIBUTE: &str = "trace.id";

/// Unqualified name of `R`, without module path or generic arguments.
///
/// # Examples
/// ```
/// use squawker::domain::pipeline::request_type_name;
///
/// struct CreateThing;
/// assert_eq!(request_type_name::<CreateThing>(), "CreateThing");
/// assert_eq!(request_type_name::<Vec<CreateThing>>(), "Vec");
/// ```
#[must_use]
pub fn request_type_name<R: ?Sized>() -> &'static str {
    let full = std::any::type_name::<R>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

/// Run `next` inside a span named after `R`.
///
/// `next` receives the request and a handle to the span so it can add its
/// own attributes and events.
pub async fn instrument<R, T, E, F, Fut>(
    telemetry: &dyn Telemetry,
    request: R,
    next: F,
) -> Result<T, E>
where
    F: FnOnce(R, Span) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::error::Error,
{
    let request_type = request_type_name::<R>();
    let guard = SpanGuard::start(telemetry, request_type, SpanKind::Internal);

    let mut attributes = Attributes::new().with(REQUEST_TYPE_ATTRIBUTE, request_type);
    if let Some(trace_id) = TraceId::current() {
        attributes.insert(TRACE_ID_ATTRIBUTE, trace_id.to_string());
    }
    guard.span().add_attributes(attributes);

    match next(request, guard.span().clone()).await {
        Ok(response) => {
            guard.complete(SpanStatus::Ok);
            Ok(response)
        }
        Err(error) => {
            guard
                .span()
                .record_exception(ExceptionRecord::from_error(&error));
            guard.complete(SpanStatus::error(error.to_string()));
            Err(error)
        }
    }
}

/// Handler for one request type.
#[async_trait]
pub trait RequestHandler<R>: Send + Sync
where
    R: Send + 'static,
{
    type Response: Send;
    type Error: std::error::Error + Send;

    /// Handle `request`, recording details on `span`.
    async fn handle(&self, request: R, span: Span) -> Result<Self::Response, Self::Error>;
}

/// Decorator routing every request through [`instrument`].
///
/// # Examples
/// ```
/// use std::sync::Arc;
///
/// use async_trait::async_trait;
/// use squawker::domain::pipeline::{Instrumented, RequestHandler};
/// use squawker::domain::ports::{NoOpTelemetry, Span};
///
/// struct Ping;
/// struct Pong;
///
/// #[async_trait]
/// impl RequestHandler<Ping> for Pong {
///     type Response = &'static str;
///     type Error = std::io::Error;
///
///     async fn handle(&self, _request: Ping, _span: Span) -> Result<&'static str, std::io::Error> {
///         Ok("pong")
///     }
/// }
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let handler = Instrumented::new(Pong, Arc::new(NoOpTelemetry));
/// assert_eq!(handler.send(Ping).await.expect("pong"), "pong");
/// # });
/// ```
pub struct Instrumented<H> {
    inner: H,
    telemetry: Arc<dyn Telemetry>,
}

impl<H> Instrumented<H> {
    /// Create a new decorator sending spans to `telemetry`.
    pub fn new(inner: H, telemetry: Arc<dyn Telemetry>) -> Self {
        Self { inner, telemetry }
    }

    /// The wrapped handler.
    pub fn inner(&self) -> &H {
        &self.inner
    }

    /// Dispatch `request` to the matching handler inside a span.
    pub async fn send<R>(&self, request: R) -> Result<H::Response, H::Error>
    where
        H: RequestHandler<R>,
        R: Send + 'static,
    {
        instrument(self.telemetry.as_ref(), request, |request, span| {
            self.inner.handle(request, span)
        })
        .await
    }
}
