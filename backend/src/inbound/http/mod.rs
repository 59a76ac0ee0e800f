//! HTTP inbound adapter exposing REST endpoints.

pub mod error;
pub mod health;
pub mod squawks;
pub mod state;

pub use error::{ApiResult, json_error_handler};
