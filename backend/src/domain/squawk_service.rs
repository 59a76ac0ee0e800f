//! Squawk domain service.
//!
//! Implements the admission-gated create operation and the read queries as
//! [`RequestHandler`]s. Callers reach them through [`Instrumented`], which
//! gives every request its own span; the driving ports are implemented for
//! any instrumented handler set with the right request/response types.
//!
//! Creation reserves the author's rate limit window *before* validating, so
//! a rejected request still spends the window. Concurrent requests from the
//! same author race on the cache; the check is best-effort.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mockable::Clock;
use tracing::{debug, info, warn};

use crate::domain::pipeline::{Instrumented, RequestHandler};
use crate::domain::ports::{
    Attributes, RateLimiterCache, RateLimiterCacheError, Span, SquawkCommand, SquawkQuery,
    SquawkRepository, SquawkRepositoryError, Telemetry,
};
use crate::domain::squawk_validation::SquawkValidator;
use crate::domain::{
    CreateSquawk, Error, GetSquawk, ListSquawks, RATE_LIMIT_WINDOW, Squawk, SquawkId,
    rate_limit_key,
};

/// Value stored under an author's rate limit key.
pub const RATE_LIMIT_SENTINEL: &str = "1";

pub const RATE_LIMIT_EXCEEDED_EVENT: &str = "squawk.rate_limit.exceeded";
pub const RATE_LIMIT_PASSED_EVENT: &str = "squawk.rate_limit.passed";
pub const SQUAWK_CREATED_EVENT: &str = "squawk.created";
pub const SQUAWK_NOT_FOUND_EVENT: &str = "squawk.not_found";
pub const CONTENT_LENGTH_HISTOGRAM: &str = "squawk.content_length";

/// Squawk use cases over a rate limiter cache `C` and repository `R`.
pub struct SquawkService<C, R> {
    cache: Arc<C>,
    repository: Arc<R>,
    validator: SquawkValidator<R>,
    telemetry: Arc<dyn Telemetry>,
    clock: Arc<dyn Clock>,
    rate_limit_window: Duration,
}

impl<C, R> SquawkService<C, R>
where
    C: RateLimiterCache,
    R: SquawkRepository,
{
    /// Create a service using the default rate limit window.
    pub fn new(
        cache: Arc<C>,
        repository: Arc<R>,
        telemetry: Arc<dyn Telemetry>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        if let Err(error) = telemetry.create_histogram(
            CONTENT_LENGTH_HISTOGRAM,
            "Length in characters of admitted squawks",
        ) {
            warn!(%error, histogram = CONTENT_LENGTH_HISTOGRAM, "failed to create histogram");
        }
        let validator = SquawkValidator::new(repository.clone(), telemetry.clone());
        Self {
            cache,
            repository,
            validator,
            telemetry,
            clock,
            rate_limit_window: RATE_LIMIT_WINDOW,
        }
    }

    /// Override how long an admitted squawk blocks its author.
    #[must_use]
    pub fn with_rate_limit_window(mut self, window: Duration) -> Self {
        self.rate_limit_window = window;
        self
    }

    /// Wrap the service so every request runs inside a span.
    #[must_use]
    pub fn instrumented(self) -> Instrumented<Self> {
        let telemetry = self.telemetry.clone();
        Instrumented::new(self, telemetry)
    }

    fn rate_limited_error(&self) -> Error {
        Error::rate_limited(format!(
            "You can only post one squawk every {} seconds. Please try again shortly.",
            self.rate_limit_window.as_secs()
        ))
    }

    fn map_cache_error(error: RateLimiterCacheError) -> Error {
        match error {
            RateLimiterCacheError::Backend { message } => {
                Error::internal(format!("rate limiter cache error: {message}"))
            }
        }
    }

    fn map_repository_error(error: SquawkRepositoryError) -> Error {
        match error {
            SquawkRepositoryError::Connection { message } => {
                Error::internal(format!("squawk repository unavailable: {message}"))
            }
            SquawkRepositoryError::Query { message } => {
                Error::internal(format!("squawk repository error: {message}"))
            }
            SquawkRepositoryError::DuplicateId { id } => {
                Error::internal(format!("squawk identifier collision: {id}"))
            }
        }
    }

    /// Reserve the author's window, or fail if it is already taken.
    async fn admit(&self, request: &CreateSquawk, span: &Span) -> Result<(), Error> {
        let key = rate_limit_key(request.user_id);
        let author = Attributes::new().with("user_id", request.user_id.to_string());

        let existing = self.cache.get(&key).await.map_err(Self::map_cache_error)?;
        if existing.is_some() {
            span.record_event(RATE_LIMIT_EXCEEDED_EVENT, author);
            info!(user_id = %request.user_id, "squawk rejected by rate limiter");
            return Err(self.rate_limited_error());
        }

        self.cache
            .set(&key, RATE_LIMIT_SENTINEL, self.rate_limit_window)
            .await
            .map_err(Self::map_cache_error)?;
        span.record_event(RATE_LIMIT_PASSED_EVENT, author);
        Ok(())
    }

    fn record_created(&self, squawk: &Squawk, span: &Span) {
        span.set_attribute("squawk.id", squawk.id().to_string());
        span.record_event(
            SQUAWK_CREATED_EVENT,
            Attributes::new()
                .with("squawk_id", squawk.id().to_string())
                .with("user_id", squawk.author_id().to_string()),
        );
        let length = u32::try_from(squawk.content().chars().count()).unwrap_or(u32::MAX);
        if let Err(error) = self.telemetry.record_histogram(
            CONTENT_LENGTH_HISTOGRAM,
            f64::from(length),
            &Attributes::new(),
        ) {
            warn!(%error, histogram = CONTENT_LENGTH_HISTOGRAM, "failed to record content length");
        }
    }
}

#[async_trait]
impl<C, R> RequestHandler<CreateSquawk> for SquawkService<C, R>
where
    C: RateLimiterCache,
    R: SquawkRepository,
{
    type Response = SquawkId;
    type Error = Error;

    async fn handle(&self, request: CreateSquawk, span: Span) -> Result<SquawkId, Error> {
        span.add_attributes(
            Attributes::new()
                .with("squawk.user_id", request.user_id.to_string())
                .with("squawk.content_length", request.content_length()),
        );

        self.admit(&request, &span).await?;

        let failures = self
            .validator
            .validate(&request, &span)
            .await
            .map_err(Self::map_repository_error)?;
        if !failures.is_empty() {
            debug!(
                user_id = %request.user_id,
                failures = failures.len(),
                "squawk rejected by validation"
            );
            return Err(Error::validation(&failures));
        }

        let CreateSquawk { content, user_id } = request;
        let squawk = Squawk::new(SquawkId::generate(), content, user_id, self.clock.utc());
        let id = self
            .repository
            .create(&squawk)
            .await
            .map_err(Self::map_repository_error)?;

        self.record_created(&squawk, &span);
        info!(squawk_id = %id, user_id = %user_id, "squawk created");
        Ok(id)
    }
}

#[async_trait]
impl<C, R> RequestHandler<ListSquawks> for SquawkService<C, R>
where
    C: RateLimiterCache,
    R: SquawkRepository,
{
    type Response = Vec<Squawk>;
    type Error = Error;

    async fn handle(&self, _request: ListSquawks, span: Span) -> Result<Vec<Squawk>, Error> {
        let mut squawks = self
            .repository
            .list_all()
            .await
            .map_err(Self::map_repository_error)?;
        squawks.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        span.set_attribute("squawk.count", squawks.len());
        Ok(squawks)
    }
}

#[async_trait]
impl<C, R> RequestHandler<GetSquawk> for SquawkService<C, R>
where
    C: RateLimiterCache,
    R: SquawkRepository,
{
    type Response = Squawk;
    type Error = Error;

    async fn handle(&self, request: GetSquawk, span: Span) -> Result<Squawk, Error> {
        span.set_attribute("squawk.id", request.id.to_string());
        let found = self
            .repository
            .find_by_id(&request.id)
            .await
            .map_err(Self::map_repository_error)?;
        found.ok_or_else(|| {
            span.record_event(
                SQUAWK_NOT_FOUND_EVENT,
                Attributes::new().with("squawk.id", request.id.to_string()),
            );
            Error::not_found(format!("Squawk {} was not found.", request.id))
        })
    }
}

#[async_trait]
impl<H> SquawkCommand for Instrumented<H>
where
    H: RequestHandler<CreateSquawk, Response = SquawkId, Error = Error>,
{
    async fn create_squawk(&self, request: CreateSquawk) -> Result<SquawkId, Error> {
        self.send(request).await
    }
}

#[async_trait]
impl<H> SquawkQuery for Instrumented<H>
where
    H: RequestHandler<ListSquawks, Response = Vec<Squawk>, Error = Error>
        + RequestHandler<GetSquawk, Response = Squawk, Error = Error>,
{
    async fn list_squawks(&self) -> Result<Vec<Squawk>, Error> {
        self.send(ListSquawks).await
    }

    async fn get_squawk(&self, id: SquawkId) -> Result<Squawk, Error> {
        self.send(GetSquawk { id }).await
    }
}

#[cfg(test)]
#[path = "squawk_service_tests.rs"]
mod tests;
