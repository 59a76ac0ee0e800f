//! Domain primitives, ports, and services.
//!
//! Purpose: hold the squawk admission rules independently of transport and
//! storage. Adapters in `inbound` and `outbound` depend on this module, never
//! the other way round.
//!
//! Public surface:
//! - Error / ErrorCode: transport-agnostic failure payload.
//! - Squawk, SquawkId, CreateSquawk, ListSquawks, GetSquawk: the aggregate and
//!   its requests.
//! - UserId: author identity with a nil sentinel.
//! - TraceId: request-scoped correlation identifier.
//! - SquawkService: admission-gated create and read queries.

pub mod error;
pub mod pipeline;
pub mod ports;
pub mod squawk;
pub mod squawk_service;
pub mod squawk_validation;
pub mod trace_id;
pub mod user;

pub use self::error::{Error, ErrorCode, ErrorValidationError, VALIDATION_FAILED_MESSAGE};
pub use self::squawk::{
    CreateSquawk, GetSquawk, ListSquawks, MAX_CONTENT_LENGTH, RATE_LIMIT_WINDOW, Squawk, SquawkId,
    rate_limit_key,
};
pub use self::squawk_service::SquawkService;
pub use self::squawk_validation::{SquawkValidator, ValidationFailure};
pub use self::trace_id::{TRACE_ID_HEADER, TraceId};
pub use self::user::UserId;
