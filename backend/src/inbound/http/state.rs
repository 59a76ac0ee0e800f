//! Shared HTTP adapter state.
//!
//! HTTP handlers accept this state via `actix_web::web::Data` so they only
//! depend on domain ports (use-cases) and remain testable without I/O.

use std::sync::Arc;

use crate::domain::ports::{SquawkCommand, SquawkQuery};

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    pub squawks: Arc<dyn SquawkCommand>,
    pub squawks_query: Arc<dyn SquawkQuery>,
}

impl HttpState {
    /// Construct state from the squawk ports.
    ///
    /// # Examples
    /// ```
    /// use std::sync::Arc;
    ///
    /// use squawker::domain::ports::{FixtureSquawkCommand, FixtureSquawkQuery};
    /// use squawker::inbound::http::state::HttpState;
    ///
    /// let state = HttpState::new(Arc::new(FixtureSquawkCommand), Arc::new(FixtureSquawkQuery));
    /// let _squawks = state.squawks.clone();
    /// ```
    pub fn new(squawks: Arc<dyn SquawkCommand>, squawks_query: Arc<dyn SquawkQuery>) -> Self {
        Self {
            squawks,
            squawks_query,
        }
    }
}
