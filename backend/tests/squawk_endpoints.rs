//! HTTP behaviour of the squawk endpoints over the real service.
//!
//! Requests go through the trace middleware and the JSON error handler, so
//! status codes, error payloads and trace correlation are checked exactly as
//! clients see them.

use actix_web::http::{StatusCode, header};
use actix_web::{App, test, web};
use rstest::{fixture, rstest};
use serde_json::{Value, json};
use squawker::Trace;
use squawker::domain::{Error, ErrorCode, TRACE_ID_HEADER, VALIDATION_FAILED_MESSAGE};
use squawker::inbound::http::json_error_handler;
use squawker::inbound::http::squawks::{create_squawk, get_squawk, list_squawks};
use squawker::inbound::http::state::HttpState;
use uuid::Uuid;

mod support;

use support::Harness;

#[fixture]
fn harness() -> Harness {
    Harness::new()
}

async fn app_for(
    harness: &Harness,
) -> impl actix_web::dev::Service<
    actix_http::Request,
    Response = actix_web::dev::ServiceResponse,
    Error = actix_web::Error,
> {
    let state = HttpState::new(harness.service.clone(), harness.service.clone());
    test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .app_data(web::JsonConfig::default().error_handler(json_error_handler))
            .wrap(Trace)
            .service(
                web::scope("/api/v1")
                    .service(create_squawk)
                    .service(list_squawks)
                    .service(get_squawk),
            ),
    )
    .await
}

fn post(body: Value) -> actix_http::Request {
    test::TestRequest::post()
        .uri("/api/v1/squawks")
        .set_json(body)
        .to_request()
}

#[rstest]
#[actix_web::test]
async fn created_squawk_is_served_back(harness: Harness) {
    let app = app_for(&harness).await;
    let author = Uuid::new_v4();

    let created = test::call_service(
        &app,
        post(json!({ "content": "Hello, flock!", "userId": author })),
    )
    .await;
    assert_eq!(created.status(), StatusCode::CREATED);
    let location = created
        .headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .expect("location header")
        .to_owned();
    let body: Value = test::read_body_json(created).await;
    let id = body["id"].as_str().expect("id").to_owned();
    assert_eq!(location, format!("/api/v1/squawks/{id}"));

    let fetched = test::call_service(&app, test::TestRequest::get().uri(&location).to_request()).await;
    assert_eq!(fetched.status(), StatusCode::OK);
    let squawk: Value = test::read_body_json(fetched).await;
    assert_eq!(squawk["content"], "Hello, flock!");
    assert_eq!(squawk["createdBy"], author.to_string());

    let listed = test::call_service(
        &app,
        test::TestRequest::get().uri("/api/v1/squawks").to_request(),
    )
    .await;
    let all: Vec<Value> = test::read_body_json(listed).await;
    assert_eq!(all.len(), 1);
    assert_eq!(all[0]["id"], id.as_str());
}

#[rstest]
#[actix_web::test]
async fn second_post_inside_window_is_429(harness: Harness) {
    let app = app_for(&harness).await;
    let author = Uuid::new_v4();

    let first = test::call_service(&app, post(json!({ "content": "one", "userId": author }))).await;
    assert_eq!(first.status(), StatusCode::CREATED);
    let second = test::call_service(&app, post(json!({ "content": "two", "userId": author }))).await;

    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    let error: Error = test::read_body_json(second).await;
    assert_eq!(error.code(), ErrorCode::RateLimited);
}

#[rstest]
#[actix_web::test]
async fn validation_failures_are_listed_in_rule_order(harness: Harness) {
    let app = app_for(&harness).await;

    let res = test::call_service(&app, post(json!({ "content": "Twitter ".repeat(60) }))).await;

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["code"], "invalid_request");
    assert_eq!(body["message"], VALIDATION_FAILED_MESSAGE);
    let fields: Vec<&str> = body["details"]["errors"]
        .as_array()
        .expect("errors array")
        .iter()
        .filter_map(|entry| entry["field"].as_str())
        .collect();
    assert_eq!(fields, vec!["Content", "Content", "UserId"]);
}

#[rstest]
#[actix_web::test]
async fn malformed_json_is_400(harness: Harness) {
    let app = app_for(&harness).await;

    let res = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/squawks")
            .insert_header((header::CONTENT_TYPE, "application/json"))
            .set_payload("{\"content\":")
            .to_request(),
    )
    .await;

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert!(harness.telemetry.spans_named("CreateSquawk").is_empty());
}

#[rstest]
#[actix_web::test]
async fn unknown_squawk_is_404(harness: Harness) {
    let app = app_for(&harness).await;

    let res = test::call_service(
        &app,
        test::TestRequest::get()
            .uri(&format!("/api/v1/squawks/{}", Uuid::new_v4()))
            .to_request(),
    )
    .await;

    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let span = harness
        .telemetry
        .last_span("GetSquawk")
        .expect("pipeline span");
    assert!(span.has_event("squawk.not_found"));
}

#[rstest]
#[actix_web::test]
async fn response_trace_id_matches_pipeline_span(harness: Harness) {
    let app = app_for(&harness).await;

    let res = test::call_service(
        &app,
        post(json!({ "content": "correlate me", "userId": Uuid::new_v4() })),
    )
    .await;

    let header_value = res
        .headers()
        .get(TRACE_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .expect("trace-id header")
        .to_owned();
    let span = harness
        .telemetry
        .last_span("CreateSquawk")
        .expect("pipeline span");
    assert_eq!(span.attributes.get("trace.id"), Some(&header_value.into()));
}
