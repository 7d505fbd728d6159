//! Database error types.

use thiserror::Error;

/// Store operation errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// Failed to connect to the database.
    #[error("failed to connect to database: {0}")]
    Connect(#[source] sqlx::Error),

    /// Failed to execute a query.
    #[error("query failed: {0}")]
    Query(#[source] sqlx::Error),

    /// Failed to run migrations.
    #[error("migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),

    /// Migration directory not found in the current environment.
    #[error("migration directory not found; tried {tried}. Last error: {last_error}. Run from repo root or services/api.")]
    MigrationDirNotFound { tried: String, last_error: String },

    /// Another user already owns this email.
    #[error("email already registered: {0}")]
    EmailTaken(String),
}

impl DbError {
    /// Maps a query error, turning unique violations on the email index into
    /// [`DbError::EmailTaken`].
    pub(crate) fn from_insert_user(err: sqlx::Error, email: &str) -> Self {
        match &err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                DbError::EmailTaken(email.to_string())
            }
            _ => DbError::Query(err),
        }
    }
}
