use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::Request;
use axum::http::Response;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::Router;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::Span;

use super::handlers::login::login;
use super::handlers::ApiError;
use super::handlers::refresh_tokens::refresh_tokens;
use super::handlers::register::register;
use crate::domain::session::ports::AuthServicePort;

pub struct AppState<AS: AuthServicePort> {
    pub auth_service: Arc<AS>,
}

impl<AS: AuthServicePort> Clone for AppState<AS> {
    fn clone(&self) -> Self {
        Self {
            auth_service: Arc::clone(&self.auth_service),
        }
    }
}

/// Build the HTTP router.
///
/// Requests still running after `request_timeout` are answered with
/// `408 Request Timeout`; their handler future is dropped, which rolls back
/// any open transaction. A panicking handler is answered with a 500.
pub fn create_router<AS: AuthServicePort>(
    auth_service: Arc<AS>,
    request_timeout: Duration,
) -> Router {
    let state = AppState { auth_service };

    let auth_routes = Router::new()
        .route("/auth/register", post(register::<AS>))
        .route("/auth/login", post(login::<AS>))
        .route("/auth/refresh", post(refresh_tokens::<AS>));

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(|request: &Request<Body>| {
            tracing::info_span!(
                "http_request",
                method = %request.method(),
                uri = %request.uri(),
                version = ?request.version(),
            )
        })
        .on_request(|request: &Request<Body>, _span: &Span| {
            tracing::info!(
                method = %request.method(),
                uri = %request.uri(),
                "Request started"
            );
        })
        .on_response(
            |response: &Response<Body>, latency: Duration, _span: &Span| {
                tracing::info!(
                    status = response.status().as_u16(),
                    latency_ms = latency.as_millis(),
                    "Request completed"
                );
            },
        );

    Router::new()
        .merge(auth_routes)
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(trace_layer)
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn handle_panic(panic: Box<dyn Any + Send + 'static>) -> Response<Body> {
    let detail = if let Some(message) = panic.downcast_ref::<String>() {
        message.as_str()
    } else if let Some(message) = panic.downcast_ref::<&str>() {
        message
    } else {
        "non-string panic payload"
    };
    tracing::error!(panic = %detail, "Request handler panicked");

    ApiError::InternalServerError("Internal server error".to_string()).into_response()
}
