//! Health check endpoints.
//!
//! These endpoints are used by load balancers and orchestration systems
//! to determine if the service is healthy and ready to receive traffic.

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

use crate::state::AppState;

const SERVICE_NAME: &str = "rsvp-api";

/// Health check response.
#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct HealthResponse {
    /// Service status: "ok" or "degraded".
    pub status: String,

    pub service: String,

    pub version: String,

    /// Current timestamp (ISO 8601).
    pub timestamp: String,

    /// Store status, only reported by the readiness check.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store: Option<ComponentStatus>,
}

/// Individual component status.
#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct ComponentStatus {
    /// Status: "ok" or "unavailable".
    pub status: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Create health check routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/livez", get(livez))
}

async fn root() -> &'static str {
    "API is running..."
}

/// Liveness of the process itself; dependencies are not checked.
async fn healthz() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        service: SERVICE_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now().to_rfc3339(),
        store: None,
    })
}

/// Readiness check - is the store reachable?
///
/// Returns 503 if it is not.
async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
    let result = state.store().health_check().await;
    let ok = result.is_ok();

    let response = HealthResponse {
        status: if ok { "ok" } else { "degraded" }.to_string(),
        service: SERVICE_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now().to_rfc3339(),
        store: Some(ComponentStatus {
            status: if ok { "ok" } else { "unavailable" }.to_string(),
            message: result.err().map(|e| e.to_string()),
        }),
    };

    if ok {
        (StatusCode::OK, Json(response))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(response))
    }
}

async fn livez() -> impl IntoResponse {
    StatusCode::OK
}
