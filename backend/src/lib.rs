//! Squawker library modules.
//!
//! A short-message service whose create operation is gated by a per-author
//! rate limiter and a validation chain, with every request traced through a
//! telemetry port.

pub mod doc;
pub mod domain;
pub mod inbound;
pub mod middleware;
pub mod outbound;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use middleware::Trace;
/// Public OpenAPI surface used by Swagger UI and tooling.
pub use doc::ApiDoc;
