//! Squawk aggregate and the request that creates one.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::UserId;

/// Longest accepted squawk body, counted in characters.
pub const MAX_CONTENT_LENGTH: usize = 400;

/// Minimum spacing between two admitted squawks from the same author.
pub const RATE_LIMIT_WINDOW: Duration = Duration::from_secs(20);

/// System-assigned squawk identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SquawkId(Uuid);

impl SquawkId {
    /// Allocate a fresh identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Access the underlying UUID.
    #[must_use]
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl From<Uuid> for SquawkId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl fmt::Display for SquawkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A stored squawk. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Squawk {
    id: SquawkId,
    content: String,
    author_id: UserId,
    created_at: DateTime<Utc>,
}

impl Squawk {
    /// Assemble a squawk from already-admitted parts.
    pub fn new(
        id: SquawkId,
        content: impl Into<String>,
        author_id: UserId,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            content: content.into(),
            author_id,
            created_at,
        }
    }

    #[must_use]
    pub fn id(&self) -> SquawkId {
        self.id
    }

    #[must_use]
    pub fn content(&self) -> &str {
        self.content.as_str()
    }

    #[must_use]
    pub fn author_id(&self) -> UserId {
        self.author_id
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Request to create a squawk.
///
/// Transient: it is validated and then turned into a [`Squawk`], never stored
/// as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateSquawk {
    pub content: String,
    pub user_id: UserId,
}

impl CreateSquawk {
    /// Create a new request for `user_id` to post `content`.
    pub fn new(content: impl Into<String>, user_id: UserId) -> Self {
        Self {
            content: content.into(),
            user_id,
        }
    }

    /// Length of the body in characters.
    #[must_use]
    pub fn content_length(&self) -> usize {
        self.content.chars().count()
    }
}

/// Request to list every squawk, newest first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListSquawks;

/// Request to fetch one squawk by identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GetSquawk {
    pub id: SquawkId,
}

/// Rate limiter key for an author.
#[must_use]
pub fn rate_limit_key(user_id: UserId) -> String {
    format!("rate-limit:{user_id}")
}
