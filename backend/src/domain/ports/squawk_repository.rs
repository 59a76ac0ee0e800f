//! Port abstraction for squawk persistence adapters and their errors.
use async_trait::async_trait;

use crate::domain::{Squawk, SquawkId, UserId};

use super::define_port_error;

define_port_error! {
    /// Persistence errors raised by squawk repository adapters.
    pub enum SquawkRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } => "squawk repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "squawk repository query failed: {message}",
        /// A squawk with the same identifier already exists.
        DuplicateId { id: String } => "squawk {id} already exists",
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SquawkRepository: Send + Sync {
    /// Append a squawk and return its identifier.
    async fn create(&self, squawk: &Squawk) -> Result<SquawkId, SquawkRepositoryError>;

    /// Fetch every squawk, in no particular order.
    async fn list_all(&self) -> Result<Vec<Squawk>, SquawkRepositoryError>;

    /// Fetch a squawk by identifier.
    async fn find_by_id(&self, id: &SquawkId) -> Result<Option<Squawk>, SquawkRepositoryError>;

    /// Remove a squawk. Returns `false` when nothing matched.
    async fn delete(&self, id: &SquawkId) -> Result<bool, SquawkRepositoryError>;

    /// Fetch the author's latest squawk.
    async fn most_recent_by_user(
        &self,
        author_id: &UserId,
    ) -> Result<Option<Squawk>, SquawkRepositoryError>;

    /// Whether the author has already posted exactly `content`.
    ///
    /// The comparison is exact and case-sensitive.
    async fn has_user_posted_content(
        &self,
        author_id: &UserId,
        content: &str,
    ) -> Result<bool, SquawkRepositoryError>;
}
