//! HTTP error responses.
//!
//! Every failure is rendered as `{ "message": "..." }` with the status line
//! carrying the category. Internal failures are logged here and reach the
//! client only as a generic message.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::api::tokens::TokenError;
use crate::db::DbError;
use crate::passwords::PasswordError;
use crate::registration::RegistrationError;

/// Message returned for every 500.
pub const INTERNAL_MESSAGE: &str = "Server Error";

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub message: String,
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_MESSAGE)
    }

    pub fn event_not_found() -> Self {
        Self::not_found("Event not found")
    }

    pub fn invalid_credentials() -> Self {
        Self::bad_request("Invalid credentials")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorBody {
                message: self.message,
            }),
        )
            .into_response()
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        tracing::error!(error = %err, "Store operation failed");
        Self::internal()
    }
}

impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        tracing::error!(error = %err, "Password operation failed");
        Self::internal()
    }
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        tracing::error!(error = %err, "Token operation failed");
        Self::internal()
    }
}

impl From<RegistrationError> for ApiError {
    fn from(err: RegistrationError) -> Self {
        match err {
            RegistrationError::EventNotFound(_) => Self::event_not_found(),
            RegistrationError::UserNotFound(user_id) => {
                tracing::warn!(user_id = %user_id, "Authenticated user no longer exists");
                Self::not_found("User not found")
            }
            RegistrationError::CapacityExceeded(_) => Self::bad_request("Event is full"),
            RegistrationError::AlreadyRegistered { .. } => Self::bad_request("Already registered"),
            RegistrationError::Store(err) => err.into(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}
