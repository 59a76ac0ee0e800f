//! Validation rules applied to squawk creation requests.
//!
//! Every rule runs on every request and failures accumulate, so callers see
//! all problems at once. The duplicate rule consults the repository; its
//! errors are unexpected failures and propagate instead of becoming a
//! validation message.

use std::sync::Arc;

use tracing::warn;

use crate::domain::ports::{Attributes, Span, SquawkRepository, SquawkRepositoryError, Telemetry};
use crate::domain::{CreateSquawk, MAX_CONTENT_LENGTH, UserId};

pub const CONTENT_FIELD: &str = "Content";
pub const USER_ID_FIELD: &str = "UserId";

pub const CONTENT_REQUIRED_MESSAGE: &str = "Content is required.";
pub const CONTENT_TOO_LONG_MESSAGE: &str = "Content must not exceed 400 characters.";
pub const BANNED_TERM_MESSAGE: &str = "Content cannot contain references to 'Tweet' or 'Twitter'.";
pub const USER_ID_REQUIRED_MESSAGE: &str = "User ID is required.";
pub const DUPLICATE_MESSAGE: &str =
    "You've already posted this exact content. Duplicate squawks are not allowed.";

pub const BANNED_TERM_COUNTER: &str = "squawk.banned_term.count";
pub const DUPLICATE_COUNTER: &str = "squawk.duplicate.count";
pub const DUPLICATE_ATTEMPT_EVENT: &str = "duplicate_squawk_attempt";

/// Lower-cased terms that may not appear anywhere in a squawk.
const BANNED_TERMS: [&str; 2] = ["tweet", "twitter"];

/// One failed rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationFailure {
    pub field: String,
    pub message: String,
}

impl ValidationFailure {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Whether `content` mentions a banned term, ignoring case.
#[must_use]
pub fn contains_banned_term(content: &str) -> bool {
    let lowered = content.to_lowercase();
    BANNED_TERMS.iter().any(|term| lowered.contains(term))
}

/// Validation chain for [`CreateSquawk`].
pub struct SquawkValidator<R> {
    repository: Arc<R>,
    telemetry: Arc<dyn Telemetry>,
}

impl<R> SquawkValidator<R>
where
    R: SquawkRepository,
{
    /// Build the validator and register its counters.
    ///
    /// Counter registration failures are logged; validation still runs.
    pub fn new(repository: Arc<R>, telemetry: Arc<dyn Telemetry>) -> Self {
        let counters = [
            (
                BANNED_TERM_COUNTER,
                "Number of squawk attempts containing banned terms",
            ),
            (DUPLICATE_COUNTER, "Number of duplicate squawk attempts"),
        ];
        for (name, description) in counters {
            if let Err(error) = telemetry.create_counter(name, description) {
                warn!(%error, counter = name, "failed to create validation counter");
            }
        }
        Self {
            repository,
            telemetry,
        }
    }

    /// Run every rule and return the failures in rule order.
    ///
    /// An empty list means the request may be admitted.
    pub async fn validate(
        &self,
        request: &CreateSquawk,
        span: &Span,
    ) -> Result<Vec<ValidationFailure>, SquawkRepositoryError> {
        let mut failures = Vec::new();

        if request.content.trim().is_empty() {
            failures.push(ValidationFailure::new(CONTENT_FIELD, CONTENT_REQUIRED_MESSAGE));
        }
        if request.content_length() > MAX_CONTENT_LENGTH {
            failures.push(ValidationFailure::new(CONTENT_FIELD, CONTENT_TOO_LONG_MESSAGE));
        }
        if !self.passes_banned_terms(&request.content) {
            failures.push(ValidationFailure::new(CONTENT_FIELD, BANNED_TERM_MESSAGE));
        }
        if request.user_id.is_nil() {
            failures.push(ValidationFailure::new(USER_ID_FIELD, USER_ID_REQUIRED_MESSAGE));
        }
        if self.is_duplicate(request, span).await? {
            failures.push(ValidationFailure::new(CONTENT_FIELD, DUPLICATE_MESSAGE));
        }

        Ok(failures)
    }

    fn passes_banned_terms(&self, content: &str) -> bool {
        if !contains_banned_term(content) {
            return true;
        }
        let tags = Attributes::new().with("validation", "banned_term");
        if let Err(error) = self.telemetry.increment_counter(BANNED_TERM_COUNTER, 1, &tags) {
            warn!(%error, counter = BANNED_TERM_COUNTER, "failed to record banned term");
        }
        false
    }

    /// The sentinel author is never a duplicate; the user id rule reports it.
    async fn is_duplicate(
        &self,
        request: &CreateSquawk,
        span: &Span,
    ) -> Result<bool, SquawkRepositoryError> {
        if request.user_id.is_nil() {
            return Ok(false);
        }
        let duplicate = self
            .repository
            .has_user_posted_content(&request.user_id, &request.content)
            .await?;
        if duplicate {
            self.record_duplicate(request.user_id, request.content_length(), span);
        }
        Ok(duplicate)
    }

    fn record_duplicate(&self, user_id: UserId, content_length: usize, span: &Span) {
        let tags = Attributes::new().with("user_id", user_id.to_string());
        if let Err(error) = self.telemetry.increment_counter(DUPLICATE_COUNTER, 1, &tags) {
            warn!(%error, counter = DUPLICATE_COUNTER, "failed to record duplicate attempt");
        }
        span.record_event(
            DUPLICATE_ATTEMPT_EVENT,
            Attributes::new()
                .with("user_id", user_id.to_string())
                .with("content_length", content_length),
        );
    }
}

#[cfg(test)]
#[path = "squawk_validation_tests.rs"]
mod tests;
