//! Persistence for users, events and registrations.
//!
//! This module provides:
//! - The [`Store`] trait the rest of the service is written against
//! - [`PgStore`], the Postgres implementation (SQLx)
//! - [`MemoryStore`], an in-process implementation for tests and local runs
//! - Connection pool management and migrations

mod error;
mod memory;
mod postgres;

pub use error::DbError;
pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use rsvp_id::{EventId, UserId};
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::info;

use crate::model::{Event, NewEvent, NewUser, User};
use crate::query::{EventFilter, EventPage, PageRequest};
use crate::registration::{CancelOutcome, RegisterOutcome};

/// Credential and event storage.
///
/// `register_attendee` and `cancel_attendee` are the only writers of
/// `Event::registered_count` and `User::registered_events`. Each applies both
/// sides of the change as one atomic unit and re-checks capacity and
/// membership while holding it.
#[async_trait]
pub trait Store: Send + Sync {
    /// Check that the backing storage is reachable.
    async fn health_check(&self) -> Result<(), DbError>;

    /// Insert a user. Fails with [`DbError::EmailTaken`] on a duplicate email.
    async fn insert_user(&self, user: NewUser) -> Result<User, DbError>;

    async fn find_user(&self, id: &UserId) -> Result<Option<User>, DbError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, DbError>;

    /// Insert an event. Administrative path; not reachable over HTTP.
    async fn insert_event(&self, event: NewEvent) -> Result<Event, DbError>;

    async fn find_event(&self, id: &EventId) -> Result<Option<Event>, DbError>;

    /// Fetch every event whose id is in `ids`, ordered by `datetime`.
    /// Unknown ids are skipped.
    async fn find_events(&self, ids: &[EventId]) -> Result<Vec<Event>, DbError>;

    async fn list_events(
        &self,
        filter: &EventFilter,
        page: PageRequest,
    ) -> Result<EventPage, DbError>;

    /// Take a seat at `event_id` for `user_id`.
    async fn register_attendee(
        &self,
        user_id: &UserId,
        event_id: &EventId,
    ) -> Result<RegisterOutcome, DbError>;

    /// Give up the seat `user_id` holds at `event_id`, if any.
    async fn cancel_attendee(
        &self,
        user_id: &UserId,
        event_id: &EventId,
    ) -> Result<CancelOutcome, DbError>;
}

/// Database configuration.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Database connection URL.
    pub database_url: String,

    /// Maximum number of connections in the pool.
    pub max_connections: u32,

    /// Minimum number of idle connections.
    pub min_connections: u32,

    /// Connection acquire timeout.
    pub acquire_timeout: Duration,

    /// Idle connection timeout.
    pub idle_timeout: Duration,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            database_url: "postgres://localhost/rsvp".to_string(),
            max_connections: 10,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(600),
        }
    }
}

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool.
    pub async fn connect(config: &DbConfig) -> Result<Self, DbError> {
        info!(
            max_connections = config.max_connections,
            min_connections = config.min_connections,
            "Connecting to database"
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.acquire_timeout)
            .idle_timeout(Some(config.idle_timeout))
            .connect(&config.database_url)
            .await
            .map_err(DbError::Connect)?;

        info!("Database connection pool established");

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run pending migrations from the first migrations directory found.
    pub async fn run_migrations(&self) -> Result<(), DbError> {
        info!("Running database migrations");

        let candidates = vec![
            std::path::PathBuf::from("./migrations"),
            std::path::PathBuf::from("services/api/migrations"),
            std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("migrations"),
        ];
        let mut last_error: Option<sqlx::migrate::MigrateError> = None;

        for dir in &candidates {
            match sqlx::migrate::Migrator::new(dir.clone()).await {
                Ok(migrator) => {
                    info!(migrations_dir = %dir.display(), "Loaded migrations");
                    migrator.run(&self.pool).await.map_err(DbError::Migration)?;
                    info!("Database migrations complete");
                    return Ok(());
                }
                Err(e) => {
                    last_error = Some(e);
                }
            }
        }

        let tried = candidates
            .iter()
            .map(|dir| dir.display().to_string())
            .collect::<Vec<_>>()
            .join(", ");

        Err(DbError::MigrationDirNotFound {
            tried,
            last_error: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "unknown error".to_string()),
        })
    }

    /// Get a store handle backed by this pool.
    pub fn store(&self) -> PgStore {
        PgStore::new(self.pool.clone())
    }
}
