//! Signed identity tokens.
//!
//! Tokens are HS256 JWTs whose payload is `{ id, iat, exp }`, where `id` is
//! the user id. Nothing is stored server-side; a token is valid until it
//! expires.

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rsvp_id::UserId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default token lifetime.
pub const TOKEN_LIFETIME_DAYS: i64 = 7;

/// Token payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub id: UserId,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("failed to sign token: {0}")]
    Sign(#[source] jsonwebtoken::errors::Error),

    #[error("invalid token: {0}")]
    Invalid(#[source] jsonwebtoken::errors::Error),
}

/// Issues and verifies identity tokens with a shared secret.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    lifetime: Duration,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("lifetime", &self.lifetime)
            .finish_non_exhaustive()
    }
}

impl TokenService {
    pub fn new(secret: &[u8], lifetime: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            lifetime,
        }
    }

    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    /// Issue a token for `user_id`, valid for the configured lifetime.
    pub fn issue(&self, user_id: UserId) -> Result<String, TokenError> {
        let now = Utc::now();
        let claims = Claims {
            id: user_id,
            iat: now.timestamp(),
            exp: (now + self.lifetime).timestamp(),
        };

        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(TokenError::Sign)
    }

    /// Check signature and expiry, returning the embedded claims.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        jsonwebtoken::decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(TokenError::Invalid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> TokenService {
        TokenService::new(b"test-secret", Duration::days(TOKEN_LIFETIME_DAYS))
    }

    #[test]
    fn test_issue_then_verify() {
        let tokens = service();
        let user_id = UserId::new();

        let token = tokens.issue(user_id).unwrap();
        let claims = tokens.verify(&token).unwrap();

        assert_eq!(claims.id, user_id);
        assert_eq!(claims.exp - claims.iat, 7 * 24 * 60 * 60);
    }

    #[test]
    fn test_other_secret_is_rejected() {
        let token = service().issue(UserId::new()).unwrap();
        let other = TokenService::new(b"another-secret", Duration::days(1));
        assert!(other.verify(&token).is_err());
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let tokens = TokenService::new(b"test-secret", Duration::seconds(-10));
        let token = tokens.issue(UserId::new()).unwrap();
        assert!(matches!(tokens.verify(&token), Err(TokenError::Invalid(_))));
    }

    #[test]
    fn test_tampered_token_is_rejected() {
        let tokens = service();
        let genuine = tokens.issue(UserId::new()).unwrap();
        let other = tokens.issue(UserId::new()).unwrap();

        // swap in another user's payload but keep the first token's signature
        let genuine: Vec<&str> = genuine.split('.').collect();
        let other: Vec<&str> = other.split('.').collect();
        let forged = format!("{}.{}.{}", genuine[0], other[1], genuine[2]);

        assert!(tokens.verify(&forged).is_err());
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert!(service().verify("not.a.jwt").is_err());
        assert!(service().verify("").is_err());
    }
}
