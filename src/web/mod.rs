// Web server: Axum-based inference endpoint plus the static UI.
//
// The UI in static/ is embedded at compile time via include_dir!, so the
// binary is the whole deployment apart from the model artifact. POST /predict
// is the only API route; GET /health exists for platform health checks.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use axum::body::Body;
use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use include_dir::{include_dir, Dir};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use crate::classifier::{AiClassifier, Detector};
use crate::config::Config;
use crate::rate_limit::RateLimiter;

pub mod error;
pub mod handlers;
pub mod identity;

static ASSETS: Dir<'static> = include_dir!("$CARGO_MANIFEST_DIR/static");

/// Shared application state threaded through all Axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub limiter: Arc<RateLimiter>,
    pub detector: Detector,
}

impl AppState {
    pub fn new(config: Config, classifier: Arc<dyn AiClassifier>) -> Self {
        let limiter = RateLimiter::new(
            config.rate_limit,
            config.rate_window,
            config.max_tracked_clients,
        );
        let detector = Detector::new(classifier, config.threshold);

        Self {
            config: Arc::new(config),
            limiter: Arc::new(limiter),
            detector,
        }
    }
}

/// Start the Axum web server and block until it exits.
pub async fn run_server(state: AppState) -> Result<()> {
    let addr = format!("{}:{}", state.config.bind, state.config.port);
    spawn_limiter_sweep(state.limiter.clone());

    let app = build_router(state);

    info!("Listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;
    Ok(())
}

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/", get(serve_index))
        .route("/health", get(health))
        .route("/predict", post(handlers::predict::predict))
        .fallback(serve_asset)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(
            CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods([
                    axum::http::Method::GET,
                    axum::http::Method::POST,
                    axum::http::Method::OPTIONS,
                ])
                .allow_headers([header::CONTENT_TYPE]),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Periodically drop clients whose requests have all left the window, so
/// one-off visitors don't accumulate between lazy evictions.
fn spawn_limiter_sweep(limiter: Arc<RateLimiter>) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(limiter.window());
        // The first tick completes immediately; nothing to sweep yet.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let removed = limiter.sweep(Instant::now());
            if removed > 0 {
                debug!(
                    removed,
                    remaining = limiter.tracked_clients(),
                    "Swept idle rate-limit clients"
                );
            }
        }
    });
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown signal received");
    }
}

/// Health check, always returns 200 OK.
async fn health() -> impl IntoResponse {
    (
        StatusCode::OK,
        axum::Json(serde_json::json!({ "status": "ok" })),
    )
}

async fn serve_index() -> Response {
    match ASSETS.get_file("index.html") {
        Some(index) => asset_response(index.contents(), "index.html"),
        None => api_error(StatusCode::NOT_FOUND, "UI not found"),
    }
}

/// Serve other files from the embedded static directory.
async fn serve_asset(uri: Uri) -> Response {
    let path = uri.path().trim_start_matches('/');
    match ASSETS.get_file(path) {
        Some(file) => asset_response(file.contents(), path),
        None => api_error(StatusCode::NOT_FOUND, "Not found"),
    }
}

fn asset_response(contents: &'static [u8], path: &str) -> Response {
    let mime = mime_type(path);
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, HeaderValue::from_static(mime))
        .body(Body::from(contents))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

fn mime_type(path: &str) -> &'static str {
    let ext = path.rsplit('.').next().unwrap_or("");
    match ext {
        "html" => "text/html; charset=utf-8",
        "js" | "mjs" => "application/javascript",
        "css" => "text/css",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "ico" => "image/x-icon",
        "json" => "application/json",
        "txt" => "text/plain",
        _ => "application/octet-stream",
    }
}

/// Typed JSON error response helper.
pub fn api_error(status: StatusCode, message: &str) -> Response {
    (status, axum::Json(serde_json::json!({ "error": message }))).into_response()
}
