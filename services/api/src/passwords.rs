//! Password hashing (bcrypt).
//!
//! bcrypt is deliberately slow, so both operations run on the blocking pool.

use thiserror::Error;

/// bcrypt work factor.
pub const HASH_COST: u32 = 10;

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("password hashing failed: {0}")]
    Hash(#[from] bcrypt::BcryptError),

    #[error("password task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

pub async fn hash_password(password: String) -> Result<String, PasswordError> {
    let hash = tokio::task::spawn_blocking(move || bcrypt::hash(password, HASH_COST)).await??;
    Ok(hash)
}

/// Check `password` against a stored hash.
///
/// A stored value that is not a bcrypt hash never matches.
pub async fn verify_password(password: String, hash: String) -> Result<bool, PasswordError> {
    let verified = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash)).await?;
    match verified {
        Ok(matches) => Ok(matches),
        Err(e) => {
            tracing::warn!(error = %e, "Stored password hash could not be parsed");
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hash_then_verify() {
        let hash = hash_password("hunter22".to_string()).await.unwrap();
        assert_ne!(hash, "hunter22");
        assert!(verify_password("hunter22".to_string(), hash.clone()).await.unwrap());
        assert!(!verify_password("hunter23".to_string(), hash).await.unwrap());
    }

    #[tokio::test]
    async fn test_garbage_hash_never_matches() {
        let ok = verify_password("anything".to_string(), "not-a-hash".to_string())
            .await
            .unwrap();
        assert!(!ok);
    }
}
