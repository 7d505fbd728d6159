//! HTTP API handlers and routing.

mod auth;
pub mod error;
mod events;
pub mod guard;
mod health;
pub mod tokens;

use axum::{
    body::Body,
    http::{header, HeaderName, HeaderValue, Method, Request},
    Router,
};
use rsvp_id::RequestId;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestId, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::state::AppState;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Assigns `req_{ulid}` ids to requests that arrive without one.
#[derive(Debug, Clone, Copy, Default)]
struct MakeRequestUlid;

impl MakeRequestId for MakeRequestUlid {
    fn make_request_id<B>(
        &mut self,
        _request: &Request<B>,
    ) -> Option<tower_http::request_id::RequestId> {
        HeaderValue::from_str(&RequestId::new().to_string())
            .ok()
            .map(tower_http::request_id::RequestId::new)
    }
}

/// Create the main API router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_origin(Any);

    // Spans carry the request id assigned by `SetRequestIdLayer`.
    let trace = TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
        let request_id = request
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown");
        tracing::info_span!(
            "http_request",
            method = %request.method(),
            uri = %request.uri(),
            request_id = %request_id,
        )
    });

    Router::new()
        // Health endpoints (no auth required)
        .merge(health::routes())
        .nest("/api/auth", auth::routes())
        .nest("/api/events", events::routes())
        // Middleware; the last layer added runs first
        .layer(PropagateRequestIdLayer::new(HeaderName::from_static(REQUEST_ID_HEADER)))
        .layer(trace)
        .layer(SetRequestIdLayer::new(
            HeaderName::from_static(REQUEST_ID_HEADER),
            MakeRequestUlid,
        ))
        .layer(cors)
        .with_state(state)
}
