//! Account endpoints.
//!
//! Endpoints:
//! - POST /api/auth/register - Create an account
//! - POST /api/auth/login - Exchange credentials for a bearer token

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::db::DbError;
use crate::model::{NewUser, UserProfile};
use crate::passwords;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            message: message.into(),
        })
    }
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserProfile,
}

/// Emails are matched case-insensitively.
fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

// =============================================================================
// Handlers
// =============================================================================

/// Create an account.
///
/// POST /api/auth/register
async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;

    let name = req.name.trim().to_string();
    let email = normalize_email(&req.email);
    if name.is_empty() || email.is_empty() || req.password.is_empty() {
        return Err(ApiError::bad_request("Name, email and password are required"));
    }

    if state.store().find_user_by_email(&email).await?.is_some() {
        return Err(ApiError::bad_request("User already exists"));
    }

    let password_hash = passwords::hash_password(req.password).await?;

    let user = match state
        .store()
        .insert_user(NewUser {
            name,
            email,
            password_hash,
        })
        .await
    {
        Ok(user) => user,
        // lost a race with a concurrent sign-up for the same email
        Err(DbError::EmailTaken(_)) => return Err(ApiError::bad_request("User already exists")),
        Err(e) => return Err(e.into()),
    };

    tracing::info!(user_id = %user.id, "User registered");

    Ok((
        StatusCode::CREATED,
        MessageResponse::new("User registered successfully"),
    ))
}

/// Log in.
///
/// POST /api/auth/login
async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    let email = normalize_email(&req.email);

    let Some(user) = state.store().find_user_by_email(&email).await? else {
        return Err(ApiError::invalid_credentials());
    };

    if !passwords::verify_password(req.password, user.password_hash.clone()).await? {
        return Err(ApiError::invalid_credentials());
    }

    let token = state.tokens().issue(user.id)?;

    tracing::info!(user_id = %user.id, "User logged in");

    Ok(Json(LoginResponse {
        token,
        user: user.profile(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Alice@Example.COM "), "alice@example.com");
    }

    #[test]
    fn test_register_request_tolerates_missing_fields() {
        let req: RegisterRequest = serde_json::from_str(r#"{"email":"a@b.c"}"#).unwrap();
        assert!(req.name.is_empty());
        assert!(req.password.is_empty());
    }
}
