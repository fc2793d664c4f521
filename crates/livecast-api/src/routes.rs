//! API routes.

use std::time::Duration;

use axum::http::StatusCode;
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;

use crate::handlers::admin::{
    create_stream, delete_stream, get_stream, list_streams as admin_list_streams, parse_video_ref, patch_stream,
    replace_stream,
};
use crate::handlers::auth::{login, me, signup_account};
use crate::handlers::signups::create_signup;
use crate::handlers::streams::{get_active_stream, list_streams};
use crate::handlers::{health, ready};
use crate::metrics::metrics_middleware;
use crate::middleware::{cors_layer, request_id, request_logging, security_headers};
use crate::state::AppState;
use crate::ws::ws_streams;

/// Admin writes that outlive `timeout` are answered with 408.
fn admin_timeout(timeout: Duration) -> TimeoutLayer {
    TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, timeout)
}

/// Create the API router.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let public_routes = Router::new()
        .route("/streams", get(list_streams))
        .route("/streams/active", get(get_active_stream))
        .route("/signups", post(create_signup));

    let auth_routes = Router::new()
        .route("/auth/login", post(login))
        .route("/auth/signup", post(signup_account))
        .route("/auth/me", get(me));

    let admin_routes = Router::new()
        .route("/admin/video-ref", post(parse_video_ref))
        .route("/admin/streams", get(admin_list_streams).post(create_stream))
        .route(
            "/admin/streams/:id",
            get(get_stream)
                .put(replace_stream)
                .patch(patch_stream)
                .delete(delete_stream),
        )
        .layer(admin_timeout(state.config.request_timeout));

    let api_routes = Router::new()
        .merge(public_routes)
        .merge(auth_routes)
        .merge(admin_routes);

    let ws_routes = Router::new().route("/ws/streams", get(ws_streams));

    let health_routes = Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route("/ready", get(ready));

    // Metrics endpoint (if enabled)
    let metrics_routes = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    Router::new()
        .nest("/api", api_routes)
        .merge(ws_routes)
        .merge(health_routes)
        .merge(metrics_routes)
        .layer(RequestBodyLimitLayer::new(state.config.max_body_size))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(security_headers))
        .layer(middleware::from_fn(request_id))
        .layer(middleware::from_fn(request_logging))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}
