//! Persona manages user records behind a small HTTP API.
#![forbid(unsafe_code)]

pub mod config;
pub mod crypto;
mod database;
pub mod error;
mod router;
pub mod telemetry;
pub mod user;

use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::http::{Method, StatusCode, header};
use axum::routing::get;
use axum::{Router, middleware as AxumMiddleware};
use metrics_exporter_prometheus::PrometheusHandle;
use tower::ServiceBuilder;
use tower_http::LatencyUnit;
use tower_http::cors::{Any, CorsLayer};
use tower_http::sensitive_headers::SetSensitiveHeadersLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{
    DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer,
};

pub use error::ServerError;

use crate::config::{Configuration, Storage};
use crate::crypto::{DefaultPolicy, PasswordManager};
use crate::user::{MemoryUserStore, PgUserStore, UserService, UserStore, UserValidator};

/// MUST NEVER be used in production.
#[cfg(test)]
pub async fn make_request(
    app: Router,
    method: Method,
    path: &str,
    body: String,
) -> axum::http::Response<axum::body::Body> {
    use axum::extract::Request;
    use tower::util::ServiceExt;

    app.oneshot(
        Request::builder()
            .method(method)
            .uri(path)
            .header(header::CONTENT_TYPE, "application/json")
            .body(axum::body::Body::from(body))
            .unwrap(),
    )
    .await
    .unwrap()
}

/// State sharing between routes.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Configuration>,
    pub users: UserService,
    pub metrics: Option<PrometheusHandle>,
}

/// Create router.
pub fn app(state: AppState) -> Router {
    let middleware = ServiceBuilder::new()
        // Add high level tracing/logging to all requests.
        .layer(
            TraceLayer::new_for_http()
                .on_body_chunk(|chunk: &Bytes, latency: Duration, _span: &tracing::Span| {
                    tracing::trace!(size_bytes = chunk.len(), latency = ?latency, "sending body chunk")
                })
                .make_span_with(DefaultMakeSpan::new().include_headers(true).level(tracing::Level::INFO))
                .on_request(DefaultOnRequest::new())
                .on_response(DefaultOnResponse::new().include_headers(true).latency_unit(LatencyUnit::Micros)),
        )
        // Set a timeout.
        .layer(TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, Duration::from_secs(10)))
        // Remove senstive headers from trace.
        .layer(SetSensitiveHeadersLayer::new([header::AUTHORIZATION, header::COOKIE]))
        // Add CORS preflight support.
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
                .allow_headers(Any),
        );

    let mut router = Router::new()
        // `GET /status.json` goes to `status`.
        .route("/status.json", get(router::status::status))
        .merge(router::users::router())
        .with_state(state.clone());

    if let Some(handle) = state.metrics {
        // `GET /metrics` renders Prometheus exposition.
        router = router.route("/metrics", get(move || std::future::ready(handle.render())));
    }

    router
        .route_layer(AxumMiddleware::from_fn(telemetry::track))
        .layer(middleware)
}

/// Initialize the application state.
pub async fn initialize_state(
    config: Arc<Configuration>,
) -> Result<AppState, Box<dyn std::error::Error>> {
    let store: Arc<dyn UserStore> = match config.storage {
        Storage::Postgres => {
            let Some(cfg) = &config.postgres else {
                tracing::error!("missing `postgres` entry on `config.yaml` file");
                return Err("`postgres` storage requires a `postgres` entry".into());
            };

            let db = database::Database::new(
                &cfg.address,
                cfg.username.as_deref().unwrap_or(database::DEFAULT_CREDENTIALS),
                cfg.password.as_deref().unwrap_or(database::DEFAULT_CREDENTIALS),
                cfg.database.as_deref().unwrap_or(database::DEFAULT_DATABASE_NAME),
                cfg.pool_size.unwrap_or(database::DEFAULT_POOL_SIZE),
            )
            .await?;

            Arc::new(PgUserStore::new(db.postgres))
        },
        Storage::Memory => {
            tracing::warn!("users are kept in memory and lost on restart");
            Arc::new(MemoryUserStore::new())
        },
    };

    let crypto = Arc::new(PasswordManager::new(config.argon2.clone())?);

    let rules = config.validation.user.clone();
    let policy = Arc::new(DefaultPolicy::new(rules.password.clone()));
    let validator = UserValidator::new(rules, policy);

    let metrics = if config.metrics {
        Some(telemetry::setup_metrics_recorder()?)
    } else {
        None
    };

    Ok(AppState {
        config,
        users: UserService::new(store, validator, crypto),
        metrics,
    })
}
