//! Tests for the squawk validation chain.

use std::sync::Arc;

use super::*;
use crate::domain::ports::{InstrumentKind, MockSquawkRepository, SpanGuard, SpanKind};
use crate::test_support::RecordingTelemetry;
use rstest::rstest;

fn validator(
    repo: MockSquawkRepository,
    telemetry: &Arc<RecordingTelemetry>,
) -> SquawkValidator<MockSquawkRepository> {
    SquawkValidator::new(Arc::new(repo), telemetry.clone())
}

fn never_duplicate() -> MockSquawkRepository {
    let mut repo = MockSquawkRepository::new();
    repo.expect_has_user_posted_content()
        .returning(|_, _| Ok(false));
    repo
}

fn messages(failures: &[ValidationFailure]) -> Vec<&str> {
    failures.iter().map(|f| f.message.as_str()).collect()
}

async fn run(
    validator: &SquawkValidator<MockSquawkRepository>,
    telemetry: &RecordingTelemetry,
    request: &CreateSquawk,
) -> Vec<ValidationFailure> {
    let guard = SpanGuard::start(telemetry, "Validate", SpanKind::Internal);
    let failures = validator
        .validate(request, guard.span())
        .await
        .expect("validation runs");
    drop(guard);
    failures
}

#[rstest]
#[tokio::test]
async fn constructor_registers_counters() {
    let telemetry = Arc::new(RecordingTelemetry::new());
    let _validator = validator(MockSquawkRepository::new(), &telemetry);

    assert!(telemetry.has_instrument(BANNED_TERM_COUNTER, InstrumentKind::Counter));
    assert!(telemetry.has_instrument(DUPLICATE_COUNTER, InstrumentKind::Counter));
}

#[rstest]
#[tokio::test]
async fn accepts_well_formed_request() {
    let telemetry = Arc::new(RecordingTelemetry::new());
    let validator = validator(never_duplicate(), &telemetry);
    let request = CreateSquawk::new("Hello, flock!", UserId::random());

    assert!(run(&validator, &telemetry, &request).await.is_empty());
}

#[rstest]
#[case::empty(String::new(), CONTENT_REQUIRED_MESSAGE)]
#[case::whitespace("   \n\t".into(), CONTENT_REQUIRED_MESSAGE)]
#[case::too_long("a".repeat(401), CONTENT_TOO_LONG_MESSAGE)]
#[tokio::test]
async fn rejects_bad_content_length(#[case] content: String, #[case] expected: &str) {
    let telemetry = Arc::new(RecordingTelemetry::new());
    let validator = validator(never_duplicate(), &telemetry);
    let request = CreateSquawk::new(content, UserId::random());

    let failures = run(&validator, &telemetry, &request).await;

    assert_eq!(messages(&failures), vec![expected]);
    assert_eq!(failures[0].field, CONTENT_FIELD);
}

#[rstest]
#[tokio::test]
async fn accepts_content_at_the_limit() {
    let telemetry = Arc::new(RecordingTelemetry::new());
    let validator = validator(never_duplicate(), &telemetry);
    let request = CreateSquawk::new("é".repeat(MAX_CONTENT_LENGTH), UserId::random());

    assert!(run(&validator, &telemetry, &request).await.is_empty());
}

#[rstest]
#[case("I saw a Tweet today")]
#[case("TWITTER is down")]
#[case("tweeting away")]
#[case("my twItTeR handle")]
#[tokio::test]
async fn rejects_banned_terms_in_any_case(#[case] content: &str) {
    let telemetry = Arc::new(RecordingTelemetry::new());
    let validator = validator(never_duplicate(), &telemetry);
    let request = CreateSquawk::new(content, UserId::random());

    let failures = run(&validator, &telemetry, &request).await;

    assert_eq!(messages(&failures), vec![BANNED_TERM_MESSAGE]);
    assert_eq!(telemetry.counter_total(BANNED_TERM_COUNTER), 1);
    let increment = telemetry
        .measurements(BANNED_TERM_COUNTER)
        .pop()
        .expect("increment recorded");
    assert_eq!(
        increment.tags.get("validation"),
        Some(&"banned_term".into())
    );
}

#[rstest]
#[tokio::test]
async fn rejects_sentinel_author_without_querying_duplicates() {
    let telemetry = Arc::new(RecordingTelemetry::new());
    let mut repo = MockSquawkRepository::new();
    repo.expect_has_user_posted_content().times(0);
    let validator = validator(repo, &telemetry);
    let request = CreateSquawk::new("Hello", UserId::nil());

    let failures = run(&validator, &telemetry, &request).await;

    assert_eq!(failures, vec![ValidationFailure::new(USER_ID_FIELD, USER_ID_REQUIRED_MESSAGE)]);
    assert_eq!(telemetry.counter_total(DUPLICATE_COUNTER), 0);
}

#[rstest]
#[tokio::test]
async fn rejects_duplicate_and_records_telemetry() {
    let telemetry = Arc::new(RecordingTelemetry::new());
    let author = UserId::random();
    let mut repo = MockSquawkRepository::new();
    repo.expect_has_user_posted_content()
        .withf(move |user, content| *user == author && content == "same again")
        .times(1)
        .return_once(|_, _| Ok(true));
    let validator = validator(repo, &telemetry);
    let request = CreateSquawk::new("same again", author);

    let failures = run(&validator, &telemetry, &request).await;

    assert_eq!(messages(&failures), vec![DUPLICATE_MESSAGE]);
    assert_eq!(telemetry.counter_total(DUPLICATE_COUNTER), 1);
    let event = telemetry
        .events_named(DUPLICATE_ATTEMPT_EVENT)
        .pop()
        .expect("duplicate event recorded");
    assert_eq!(
        event.attributes.get("user_id"),
        Some(&author.to_string().into())
    );
    assert_eq!(event.attributes.get("content_length"), Some(&10_usize.into()));
}

#[rstest]
#[tokio::test]
async fn accumulates_every_failure_in_rule_order() {
    let telemetry = Arc::new(RecordingTelemetry::new());
    let validator = validator(MockSquawkRepository::new(), &telemetry);
    let request = CreateSquawk::new(format!("Twitter {}", "x".repeat(400)), UserId::nil());

    let failures = run(&validator, &telemetry, &request).await;

    assert_eq!(
        messages(&failures),
        vec![
            CONTENT_TOO_LONG_MESSAGE,
            BANNED_TERM_MESSAGE,
            USER_ID_REQUIRED_MESSAGE
        ]
    );
}

#[rstest]
#[tokio::test]
async fn propagates_repository_errors() {
    let telemetry = Arc::new(RecordingTelemetry::new());
    let mut repo = MockSquawkRepository::new();
    repo.expect_has_user_posted_content()
        .return_once(|_, _| Err(SquawkRepositoryError::connection("refused")));
    let validator = validator(repo, &telemetry);
    let request = CreateSquawk::new("Hello", UserId::random());

    let result = validator.validate(&request, &Span::none()).await;

    assert_eq!(result, Err(SquawkRepositoryError::connection("refused")));
}

#[rstest]
#[case("Tweet", true)]
#[case("a sweet tweet", true)]
#[case("tw eet", false)]
#[case("", false)]
fn banned_term_detection(#[case] content: &str, #[case] expected: bool) {
    assert_eq!(contains_banned_term(content), expected);
}
