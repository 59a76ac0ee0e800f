//! Driving port for squawk creation.
//!
//! Inbound adapters call [`SquawkCommand`] to submit new squawks. The
//! production implementation enforces the per-author rate limit and the
//! validation rules before anything is stored.

use async_trait::async_trait;

use crate::domain::{CreateSquawk, Error, SquawkId};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SquawkCommand: Send + Sync {
    /// Admit and store a new squawk, returning its identifier.
    ///
    /// Fails with [`crate::domain::ErrorCode::RateLimited`] while the author
    /// is inside their window and [`crate::domain::ErrorCode::InvalidRequest`]
    /// when validation rejects the request.
    async fn create_squawk(&self, request: CreateSquawk) -> Result<SquawkId, Error>;
}

/// Fixture command that accepts every request without storing it.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureSquawkCommand;

impl FixtureSquawkCommand {
    /// Identifier returned for every accepted request.
    pub const SQUAWK_ID: uuid::Uuid = uuid::Uuid::from_u128(0x3fa8_5f64_5717_4562_b3fc_2c96_3f66_afa6);
}

#[async_trait]
impl SquawkCommand for FixtureSquawkCommand {
    async fn create_squawk(&self, _request: CreateSquawk) -> Result<SquawkId, Error> {
        Ok(SquawkId::from(Self::SQUAWK_ID))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::UserId;

    #[tokio::test]
    async fn fixture_command_returns_fixed_id() {
        let id = FixtureSquawkCommand
            .create_squawk(CreateSquawk::new("hello", UserId::random()))
            .await
            .expect("fixture accepts");
        assert_eq!(id.as_uuid(), &FixtureSquawkCommand::SQUAWK_ID);
    }
}
