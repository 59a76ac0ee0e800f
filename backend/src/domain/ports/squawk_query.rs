//! Driving port for squawk read models.

use async_trait::async_trait;

use crate::domain::{Error, Squawk, SquawkId};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SquawkQuery: Send + Sync {
    /// Every squawk, newest first.
    async fn list_squawks(&self) -> Result<Vec<Squawk>, Error>;

    /// One squawk, or [`crate::domain::ErrorCode::NotFound`].
    async fn get_squawk(&self, id: SquawkId) -> Result<Squawk, Error>;
}

/// Fixture query backed by nothing; lists are empty and lookups miss.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureSquawkQuery;

#[async_trait]
impl SquawkQuery for FixtureSquawkQuery {
    async fn list_squawks(&self) -> Result<Vec<Squawk>, Error> {
        Ok(Vec::new())
    }

    async fn get_squawk(&self, id: SquawkId) -> Result<Squawk, Error> {
        Err(Error::not_found(format!("Squawk {id} was not found.")))
    }
}
