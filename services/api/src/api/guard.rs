//! Bearer-token authentication for protected routes.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use rsvp_id::UserId;

use crate::api::error::ApiError;
use crate::state::AppState;

const BEARER_PREFIX: &str = "Bearer ";

/// The caller's verified identity.
///
/// Extracting this rejects the request with 401 unless it carries
/// `Authorization: Bearer <token>` with a valid, unexpired token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: UserId,
}

/// Pull the token out of an `Authorization` header value.
fn bearer_token(value: Option<&str>) -> Option<&str> {
    value?.strip_prefix(BEARER_PREFIX).map(str::trim)
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok());

        let Some(token) = bearer_token(header) else {
            return Err(ApiError::unauthorized("Not authorized"));
        };

        // Never log the token itself.
        let claims = state.tokens().verify(token).map_err(|e| {
            tracing::debug!(error = %e, "Rejected bearer token");
            ApiError::unauthorized("Invalid token")
        })?;

        Ok(Self { user_id: claims.id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(None, None)]
    #[case(Some("Basic dXNlcjpwYXNz"), None)]
    #[case(Some("bearer abc"), None)]
    #[case(Some("Bearerabc"), None)]
    #[case(Some("Bearer abc"), Some("abc"))]
    #[case(Some("Bearer  abc "), Some("abc"))]
    #[case(Some("Bearer "), Some(""))]
    fn test_bearer_token(#[case] header: Option<&str>, #[case] expected: Option<&str>) {
        assert_eq!(bearer_token(header), expected);
    }
}
