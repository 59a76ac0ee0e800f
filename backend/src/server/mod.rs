//! Server construction and middleware wiring.

mod config;
mod settings;

pub use config::ServerConfig;
pub use settings::ServerSettings;

use std::sync::Arc;
use std::time::Duration;

use actix_web::dev::{Server, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, HttpServer, web};
#[cfg(feature = "metrics")]
use actix_web_prom::{PrometheusMetrics, PrometheusMetricsBuilder};
use mockable::DefaultClock;
use tracing::info;
#[cfg(debug_assertions)]
use utoipa::OpenApi;
#[cfg(debug_assertions)]
use utoipa_swagger_ui::SwaggerUi;

use squawker::Trace;
#[cfg(debug_assertions)]
use squawker::doc::ApiDoc;
use squawker::domain::SquawkService;
use squawker::domain::ports::Telemetry;
use squawker::inbound::http::health::{HealthState, live, ready};
use squawker::inbound::http::json_error_handler;
use squawker::inbound::http::squawks::{create_squawk, get_squawk, list_squawks};
use squawker::inbound::http::state::HttpState;
use squawker::outbound::cache::InMemoryRateLimiterCache;
#[cfg(feature = "metrics")]
use squawker::outbound::metrics::PrometheusTelemetry;
use squawker::outbound::persistence::InMemorySquawkRepository;
use squawker::outbound::telemetry::TracingTelemetry;

/// Wire the in-memory adapters into an instrumented squawk service.
///
/// The returned cache handle lets the caller schedule its expiry sweep.
fn build_http_state(
    telemetry: Arc<dyn Telemetry>,
    rate_limit_window: Duration,
) -> (web::Data<HttpState>, Arc<InMemoryRateLimiterCache>) {
    let cache = Arc::new(InMemoryRateLimiterCache::new(telemetry.clone()));
    let repository = Arc::new(InMemorySquawkRepository::new(telemetry.clone()));
    let service = Arc::new(
        SquawkService::new(cache.clone(), repository, telemetry, Arc::new(DefaultClock))
            .with_rate_limit_window(rate_limit_window)
            .instrumented(),
    );
    let state = HttpState::new(service.clone(), service);
    (web::Data::new(state), cache)
}

#[cfg(feature = "metrics")]
fn build_metrics() -> std::io::Result<PrometheusMetrics> {
    PrometheusMetricsBuilder::new("squawker")
        .endpoint("/metrics")
        .build()
        .map_err(|e| std::io::Error::other(format!("configure Prometheus metrics: {e}")))
}

#[derive(Clone)]
struct AppDependencies {
    health_state: web::Data<HealthState>,
    http_state: web::Data<HttpState>,
}

fn build_app(
    deps: AppDependencies,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let AppDependencies {
        health_state,
        http_state,
    } = deps;

    let api = web::scope("/api/v1")
        .service(create_squawk)
        .service(list_squawks)
        .service(get_squawk);

    let app = App::new()
        .app_data(health_state)
        .app_data(http_state)
        .app_data(web::JsonConfig::default().error_handler(json_error_handler))
        .wrap(Trace)
        .service(api)
        .service(ready)
        .service(live);

    #[cfg(debug_assertions)]
    let app = app.service(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()));
    #[cfg(not(debug_assertions))]
    let app = app;

    app
}

/// Construct an Actix HTTP server using the provided health state and configuration.
///
/// Must be called from within a Tokio runtime: the rate limiter cache's
/// expiry sweep is spawned here and runs until the server's state is dropped.
///
/// # Parameters
/// - `health_state`: shared readiness state updated once the server is initialised.
/// - `config`: pre-built [`ServerConfig`] containing binding and admission settings.
///
/// With the `metrics` feature the app also serves `/metrics`, and the squawk
/// counters and histograms are exported through the same registry.
///
/// # Returns
/// A spawned [`Server`] that must be awaited to drive the listener.
///
/// # Errors
/// Propagates [`std::io::Error`] when binding the socket or starting the server fails.
pub fn create_server(
    health_state: web::Data<HealthState>,
    config: ServerConfig,
) -> std::io::Result<Server> {
    let server_health_state = health_state.clone();
    let ServerConfig {
        bind_addr,
        rate_limit_window,
        cache_purge_interval,
    } = config;

    #[cfg(feature = "metrics")]
    let prometheus = build_metrics()?;
    #[cfg(feature = "metrics")]
    let telemetry: Arc<dyn Telemetry> = Arc::new(PrometheusTelemetry::new(
        &prometheus.registry,
        Arc::new(TracingTelemetry::new()),
    ));
    #[cfg(not(feature = "metrics"))]
    let telemetry: Arc<dyn Telemetry> = Arc::new(TracingTelemetry::new());

    let (http_state, cache) = build_http_state(telemetry, rate_limit_window);
    // Detached: the sweep stops by itself once the cache is dropped.
    let _purge_task = cache.spawn_purge_task(cache_purge_interval);

    let server = HttpServer::new(move || {
        let app = build_app(AppDependencies {
            health_state: server_health_state.clone(),
            http_state: http_state.clone(),
        });

        #[cfg(feature = "metrics")]
        let app = app.wrap(prometheus.clone());

        app
    })
    .bind(bind_addr)?
    .run();

    health_state.mark_ready();
    info!(
        %bind_addr,
        rate_limit_window_secs = rate_limit_window.as_secs(),
        "squawker listening"
    );
    Ok(server)
}

#[cfg(test)]
mod tests {
    //! Wiring tests driving the assembled app through its HTTP surface.

    use actix_web::http::StatusCode;
    use actix_web::test;
    use rstest::{fixture, rstest};
    use serde_json::{Value, json};
    use uuid::Uuid;

    use super::*;
    use squawker::domain::ports::NoOpTelemetry;

    #[fixture]
    fn deps() -> AppDependencies {
        let health_state = web::Data::new(HealthState::new());
        health_state.mark_ready();
        let (http_state, _cache) =
            build_http_state(Arc::new(NoOpTelemetry), Duration::from_secs(20));
        AppDependencies {
            health_state,
            http_state,
        }
    }

    fn post(content: &str, user_id: Uuid) -> actix_http::Request {
        test::TestRequest::post()
            .uri("/api/v1/squawks")
            .set_json(json!({ "content": content, "userId": user_id }))
            .to_request()
    }

    #[rstest]
    #[actix_web::test]
    async fn second_squawk_inside_window_is_rate_limited(deps: AppDependencies) {
        let app = test::init_service(build_app(deps)).await;
        let author = Uuid::new_v4();

        let first = test::call_service(&app, post("first!", author)).await;
        assert_eq!(first.status(), StatusCode::CREATED);
        let second = test::call_service(&app, post("second!", author)).await;
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
        let other = test::call_service(&app, post("first!", Uuid::new_v4())).await;
        assert_eq!(other.status(), StatusCode::CREATED);
    }

    #[rstest]
    #[actix_web::test]
    async fn created_squawk_is_readable_at_its_location(deps: AppDependencies) {
        let app = test::init_service(build_app(deps)).await;

        let created = test::call_service(&app, post("Hello, flock!", Uuid::new_v4())).await;
        let location = created
            .headers()
            .get("location")
            .and_then(|value| value.to_str().ok())
            .expect("location header")
            .to_owned();
        let fetched = test::call_service(
            &app,
            test::TestRequest::get().uri(&location).to_request(),
        )
        .await;

        assert_eq!(fetched.status(), StatusCode::OK);
        let body: Value = test::read_body_json(fetched).await;
        assert_eq!(body["content"], "Hello, flock!");
    }

    #[rstest]
    #[actix_web::test]
    async fn health_probes_are_mounted(deps: AppDependencies) {
        let app = test::init_service(build_app(deps)).await;

        for uri in ["/health/ready", "/health/live"] {
            let res = test::call_service(&app, test::TestRequest::get().uri(uri).to_request()).await;
            assert_eq!(res.status(), StatusCode::OK, "{uri}");
        }
    }
}
