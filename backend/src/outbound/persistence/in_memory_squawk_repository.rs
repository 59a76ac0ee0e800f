//! In-memory [`SquawkRepository`].

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use crate::domain::ports::{
    Attributes, ExceptionRecord, Span, SpanGuard, SpanKind, SpanStatus, SquawkRepository,
    SquawkRepositoryError, Telemetry,
};
use crate::domain::{Squawk, SquawkId, UserId};

const TABLE: &str = "squawks";
pub const DELETED_EVENT: &str = "squawk.deleted";
pub const DELETE_NOT_FOUND_EVENT: &str = "squawk.delete.not_found";
pub const DUPLICATE_DETECTED_EVENT: &str = "squawk.duplicate_detected";

/// Squawks held in a vector behind a read/write lock.
///
/// Reads run concurrently; appends are serialised by the write lock, so two
/// creates never interleave.
pub struct InMemorySquawkRepository {
    squawks: RwLock<Vec<Squawk>>,
    telemetry: Arc<dyn Telemetry>,
}

impl InMemorySquawkRepository {
    pub fn new(telemetry: Arc<dyn Telemetry>) -> Self {
        Self {
            squawks: RwLock::new(Vec::new()),
            telemetry,
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Vec<Squawk>>, SquawkRepositoryError> {
        self.squawks
            .read()
            .map_err(|_| SquawkRepositoryError::connection("squawk store lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Vec<Squawk>>, SquawkRepositoryError> {
        self.squawks
            .write()
            .map_err(|_| SquawkRepositoryError::connection("squawk store lock poisoned"))
    }

    /// Run `op` inside a `SquawkRepository.<operation>` span.
    fn traced<T>(
        &self,
        operation: &str,
        db_operation: &str,
        op: impl FnOnce(&Span) -> Result<T, SquawkRepositoryError>,
    ) -> Result<T, SquawkRepositoryError> {
        let guard = SpanGuard::start(
            self.telemetry.as_ref(),
            &format!("SquawkRepository.{operation}"),
            SpanKind::Client,
        );
        guard.span().add_attributes(
            Attributes::new()
                .with("db.operation", db_operation)
                .with("db.table", TABLE),
        );
        match op(guard.span()) {
            Ok(value) => {
                guard.complete(SpanStatus::Ok);
                Ok(value)
            }
            Err(error) => {
                guard
                    .span()
                    .record_exception(ExceptionRecord::from_error(&error));
                guard.complete(SpanStatus::error(error.to_string()));
                Err(error)
            }
        }
    }
}

#[async_trait]
impl SquawkRepository for InMemorySquawkRepository {
    async fn create(&self, squawk: &Squawk) -> Result<SquawkId, SquawkRepositoryError> {
        self.traced("Create", "INSERT", |span| {
            span.set_attribute("squawk.id", squawk.id().to_string());
            let mut squawks = self.write()?;
            if squawks.iter().any(|existing| existing.id() == squawk.id()) {
                return Err(SquawkRepositoryError::duplicate_id(squawk.id().to_string()));
            }
            squawks.push(squawk.clone());
            Ok(squawk.id())
        })
    }

    async fn list_all(&self) -> Result<Vec<Squawk>, SquawkRepositoryError> {
        self.traced("GetAll", "SELECT", |span| {
            let squawks = self.read()?.clone();
            span.set_attribute("db.rows", squawks.len());
            Ok(squawks)
        })
    }

    async fn find_by_id(&self, id: &SquawkId) -> Result<Option<Squawk>, SquawkRepositoryError> {
        self.traced("GetById", "SELECT", |span| {
            span.set_attribute("squawk.id", id.to_string());
            Ok(self.read()?.iter().find(|squawk| squawk.id() == *id).cloned())
        })
    }

    async fn delete(&self, id: &SquawkId) -> Result<bool, SquawkRepositoryError> {
        self.traced("Delete", "DELETE", |span| {
            span.set_attribute("squawk.id", id.to_string());
            let mut squawks = self.write()?;
            let Some(index) = squawks.iter().position(|squawk| squawk.id() == *id) else {
                span.record_event(
                    DELETE_NOT_FOUND_EVENT,
                    Attributes::new().with("squawk.id", id.to_string()),
                );
                return Ok(false);
            };
            squawks.remove(index);
            span.record_event(
                DELETED_EVENT,
                Attributes::new().with("squawk.id", id.to_string()),
            );
            Ok(true)
        })
    }

    async fn most_recent_by_user(
        &self,
        author_id: &UserId,
    ) -> Result<Option<Squawk>, SquawkRepositoryError> {
        self.traced("GetMostRecentByUser", "SELECT", |span| {
            span.set_attribute("squawk.user_id", author_id.to_string());
            Ok(self
                .read()?
                .iter()
                .filter(|squawk| squawk.author_id() == *author_id)
                .max_by_key(|squawk| squawk.created_at())
                .cloned())
        })
    }

    async fn has_user_posted_content(
        &self,
        author_id: &UserId,
        content: &str,
    ) -> Result<bool, SquawkRepositoryError> {
        self.traced("HasUserPostedDuplicateContent", "SELECT", |span| {
            span.set_attribute("squawk.user_id", author_id.to_string());
            let duplicate = self
                .read()?
                .iter()
                .any(|squawk| squawk.author_id() == *author_id && squawk.content() == content);
            if duplicate {
                span.record_event(
                    DUPLICATE_DETECTED_EVENT,
                    Attributes::new().with("squawk.user_id", author_id.to_string()),
                );
            }
            Ok(duplicate)
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, TimeDelta, TimeZone, Utc};
    use rstest::{fixture, rstest};

    use super::*;
    use crate::test_support::RecordingTelemetry;

    #[fixture]
    fn telemetry() -> Arc<RecordingTelemetry> {
        Arc::new(RecordingTelemetry::new())
    }

    fn at(seconds: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0)
            .single()
            .expect("valid timestamp")
            + TimeDelta::seconds(seconds)
    }

    fn squawk(author: UserId, content: &str, seconds: i64) -> Squawk {
        Squawk::new(SquawkId::generate(), content, author, at(seconds))
    }

    #[rstest]
    #[tokio::test]
    async fn create_then_find_round_trips(telemetry: Arc<RecordingTelemetry>) {
        let repo = InMemorySquawkRepository::new(telemetry.clone());
        let stored = squawk(UserId::random(), "hello", 0);

        let id = repo.create(&stored).await.expect("create");

        assert_eq!(id, stored.id());
        assert_eq!(repo.find_by_id(&id).await.expect("find"), Some(stored));
        let span = telemetry
            .last_span("SquawkRepository.Create")
            .expect("create span");
        assert_eq!(span.kind, SpanKind::Client);
        assert_eq!(span.attributes.get("db.operation"), Some(&"INSERT".into()));
        assert_eq!(span.attributes.get("db.table"), Some(&TABLE.into()));
    }

    #[rstest]
    #[tokio::test]
    async fn create_rejects_reused_identifier(telemetry: Arc<RecordingTelemetry>) {
        let repo = InMemorySquawkRepository::new(telemetry.clone());
        let stored = squawk(UserId::random(), "hello", 0);
        repo.create(&stored).await.expect("first create");

        let result = repo.create(&stored).await;

        assert!(matches!(
            result,
            Err(SquawkRepositoryError::DuplicateId { .. })
        ));
        let span = telemetry
            .last_span("SquawkRepository.Create")
            .expect("create span");
        assert!(span.status.is_error());
        assert_eq!(span.exceptions.len(), 1);
    }

    #[rstest]
    #[tokio::test]
    async fn delete_reports_whether_anything_was_removed(telemetry: Arc<RecordingTelemetry>) {
        let repo = InMemorySquawkRepository::new(telemetry.clone());
        let stored = squawk(UserId::random(), "bye", 0);
        repo.create(&stored).await.expect("create");

        assert!(repo.delete(&stored.id()).await.expect("delete"));
        assert!(!repo.delete(&stored.id()).await.expect("second delete"));
        assert_eq!(repo.find_by_id(&stored.id()).await.expect("find"), None);
        assert_eq!(telemetry.events_named(DELETED_EVENT).len(), 1);
        assert_eq!(telemetry.events_named(DELETE_NOT_FOUND_EVENT).len(), 1);
    }

    #[rstest]
    #[tokio::test]
    async fn most_recent_by_user_picks_latest_for_author(telemetry: Arc<RecordingTelemetry>) {
        let repo = InMemorySquawkRepository::new(telemetry);
        let author = UserId::random();
        let other = UserId::random();
        let latest = squawk(author, "third", 30);
        for entry in [
            squawk(author, "first", 10),
            latest.clone(),
            squawk(author, "second", 20),
            squawk(other, "someone else", 40),
        ] {
            repo.create(&entry).await.expect("create");
        }

        assert_eq!(
            repo.most_recent_by_user(&author).await.expect("lookup"),
            Some(latest)
        );
        assert_eq!(
            repo.most_recent_by_user(&UserId::random())
                .await
                .expect("lookup"),
            None
        );
    }

    #[rstest]
    #[case("same words", true)]
    #[case("Same words", false)]
    #[case("same words ", false)]
    #[tokio::test]
    async fn duplicate_check_is_exact_and_per_author(
        telemetry: Arc<RecordingTelemetry>,
        #[case] candidate: &str,
        #[case] expected: bool,
    ) {
        let repo = InMemorySquawkRepository::new(telemetry.clone());
        let author = UserId::random();
        repo.create(&squawk(author, "same words", 0))
            .await
            .expect("create");

        assert_eq!(
            repo.has_user_posted_content(&author, candidate)
                .await
                .expect("check"),
            expected
        );
        assert!(!repo
            .has_user_posted_content(&UserId::random(), "same words")
            .await
            .expect("check"));
        assert_eq!(
            telemetry.events_named(DUPLICATE_DETECTED_EVENT).len(),
            usize::from(expected)
        );
    }

    #[rstest]
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_creates_are_all_kept(telemetry: Arc<RecordingTelemetry>) {
        let repo = Arc::new(InMemorySquawkRepository::new(telemetry));
        let author = UserId::random();
        let tasks: Vec<_> = (0..16)
            .map(|n| {
                let repo = repo.clone();
                tokio::spawn(async move {
                    repo.create(&squawk(author, &format!("post {n}"), n))
                        .await
                        .expect("create")
                })
            })
            .collect();
        for task in tasks {
            task.await.expect("task completes");
        }

        assert_eq!(repo.list_all().await.expect("list").len(), 16);
    }
}
