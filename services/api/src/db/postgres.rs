//! Postgres-backed store.
//!
//! Registrations live in their own table keyed by `(user_id, event_id)`;
//! `events.registered_count` is kept in step with it inside the same
//! transaction, with the event row locked `FOR UPDATE`.

use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rsvp_id::{EventId, UserId};
use sqlx::{postgres::PgRow, PgPool, Row};
use tracing::debug;

use super::{DbError, Store};
use crate::model::{Event, NewEvent, NewUser, User};
use crate::query::{EventFilter, EventPage, PageRequest};
use crate::registration::{CancelOutcome, RegisterOutcome};

const USER_COLUMNS: &str = r#"
    u.user_id, u.name, u.email, u.password_hash, u.created_at, u.updated_at,
    COALESCE(
        array_agg(r.event_id) FILTER (WHERE r.event_id IS NOT NULL),
        '{}'
    ) AS registered_events
"#;

const EVENT_COLUMNS: &str = r#"
    event_id, name, organizer, location, datetime, description,
    capacity, registered_count, category, created_at, updated_at
"#;

/// Store backed by a Postgres pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn find_user_where(
        &self,
        predicate: &str,
        value: String,
    ) -> Result<Option<User>, DbError> {
        let sql = format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users u
            LEFT JOIN registrations r ON r.user_id = u.user_id
            WHERE {predicate}
            GROUP BY u.user_id
            "#
        );

        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await
            .map_err(DbError::Query)?;

        Ok(row.map(|r| r.0))
    }
}

fn decode_err<E>(err: E) -> sqlx::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    sqlx::Error::Decode(Box::new(err))
}

fn to_i32(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

#[async_trait]
impl Store for PgStore {
    async fn health_check(&self) -> Result<(), DbError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(DbError::Query)?;
        Ok(())
    }

    async fn insert_user(&self, user: NewUser) -> Result<User, DbError> {
        let user_id = UserId::new();

        let (created_at, updated_at): (DateTime<Utc>, DateTime<Utc>) = sqlx::query_as(
            r#"
            INSERT INTO users (user_id, name, email, password_hash)
            VALUES ($1, $2, $3, $4)
            RETURNING created_at, updated_at
            "#,
        )
        .bind(user_id.to_string())
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DbError::from_insert_user(e, &user.email))?;

        Ok(User {
            id: user_id,
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            registered_events: BTreeSet::new(),
            created_at,
            updated_at,
        })
    }

    async fn find_user(&self, id: &UserId) -> Result<Option<User>, DbError> {
        self.find_user_where("u.user_id = $1", id.to_string()).await
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, DbError> {
        self.find_user_where("u.email = $1", email.to_string()).await
    }

    async fn insert_event(&self, event: NewEvent) -> Result<Event, DbError> {
        let sql = format!(
            r#"
            INSERT INTO events (
                event_id, name, organizer, location, datetime, description, capacity, category
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {EVENT_COLUMNS}
            "#
        );

        let row = sqlx::query_as::<_, EventRow>(&sql)
            .bind(EventId::new().to_string())
            .bind(&event.name)
            .bind(&event.organizer)
            .bind(&event.location)
            .bind(event.datetime)
            .bind(&event.description)
            .bind(to_i32(event.capacity))
            .bind(&event.category)
            .fetch_one(&self.pool)
            .await
            .map_err(DbError::Query)?;

        Ok(row.0)
    }

    async fn find_event(&self, id: &EventId) -> Result<Option<Event>, DbError> {
        let sql = format!("SELECT {EVENT_COLUMNS} FROM events WHERE event_id = $1");

        let row = sqlx::query_as::<_, EventRow>(&sql)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(DbError::Query)?;

        Ok(row.map(|r| r.0))
    }

    async fn find_events(&self, ids: &[EventId]) -> Result<Vec<Event>, DbError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            r#"
            SELECT {EVENT_COLUMNS}
            FROM events
            WHERE event_id = ANY($1)
            ORDER BY datetime ASC, event_id ASC
            "#
        );
        let ids: Vec<String> = ids.iter().map(ToString::to_string).collect();

        let rows = sqlx::query_as::<_, EventRow>(&sql)
            .bind(ids)
            .fetch_all(&self.pool)
            .await
            .map_err(DbError::Query)?;

        Ok(rows.into_iter().map(|r| r.0).collect())
    }

    async fn list_events(
        &self,
        filter: &EventFilter,
        page: PageRequest,
    ) -> Result<EventPage, DbError> {
        const PREDICATE: &str = r#"
            ($1::TEXT IS NULL OR strpos(lower(name), $1) > 0)
            AND ($2::TEXT IS NULL OR category = $2)
            AND ($3::TEXT IS NULL OR location = $3)
            AND ($4::TIMESTAMPTZ IS NULL OR (datetime >= $4 AND datetime < $5::TIMESTAMPTZ))
        "#;

        let needle = filter.search_needle();
        let (day_start, day_end) = match filter.day_bounds() {
            Some((start, end)) => (Some(start), Some(end)),
            None => (None, None),
        };

        let count_sql = format!("SELECT COUNT(*) FROM events WHERE {PREDICATE}");
        let total: i64 = sqlx::query_scalar(&count_sql)
            .bind(&needle)
            .bind(&filter.category)
            .bind(&filter.location)
            .bind(day_start)
            .bind(day_end)
            .fetch_one(&self.pool)
            .await
            .map_err(DbError::Query)?;

        let sql = format!(
            r#"
            SELECT {EVENT_COLUMNS}
            FROM events
            WHERE {PREDICATE}
            ORDER BY datetime ASC, event_id ASC
            LIMIT $6 OFFSET $7
            "#
        );

        let rows = sqlx::query_as::<_, EventRow>(&sql)
            .bind(&needle)
            .bind(&filter.category)
            .bind(&filter.location)
            .bind(day_start)
            .bind(day_end)
            .bind(i64::from(page.page_size))
            .bind(i64::try_from(page.offset()).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await
            .map_err(DbError::Query)?;

        let events = rows.into_iter().map(|r| r.0).collect();
        Ok(EventPage::new(page, u64::try_from(total).unwrap_or(0), events))
    }

    async fn register_attendee(
        &self,
        user_id: &UserId,
        event_id: &EventId,
    ) -> Result<RegisterOutcome, DbError> {
        let user_id = user_id.to_string();
        let event_id = event_id.to_string();

        let mut tx = self.pool.begin().await.map_err(DbError::Query)?;

        let seats: Option<(i32, i32)> = sqlx::query_as(
            r#"
            SELECT capacity, registered_count
            FROM events
            WHERE event_id = $1
            FOR UPDATE
            "#,
        )
        .bind(&event_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(DbError::Query)?;

        let Some((capacity, registered_count)) = seats else {
            return Ok(RegisterOutcome::EventMissing);
        };

        let user_exists: Option<i32> = sqlx::query_scalar("SELECT 1 FROM users WHERE user_id = $1")
            .bind(&user_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(DbError::Query)?;

        if user_exists.is_none() {
            return Ok(RegisterOutcome::UserMissing);
        }

        if registered_count >= capacity {
            return Ok(RegisterOutcome::EventFull);
        }

        let inserted = sqlx::query(
            r#"
            INSERT INTO registrations (user_id, event_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(&user_id)
        .bind(&event_id)
        .execute(&mut *tx)
        .await
        .map_err(DbError::Query)?
        .rows_affected();

        if inserted == 0 {
            return Ok(RegisterOutcome::AlreadyRegistered);
        }

        sqlx::query(
            r#"
            UPDATE events
            SET registered_count = registered_count + 1, updated_at = now()
            WHERE event_id = $1
            "#,
        )
        .bind(&event_id)
        .execute(&mut *tx)
        .await
        .map_err(DbError::Query)?;

        sqlx::query("UPDATE users SET updated_at = now() WHERE user_id = $1")
            .bind(&user_id)
            .execute(&mut *tx)
            .await
            .map_err(DbError::Query)?;

        tx.commit().await.map_err(DbError::Query)?;
        debug!(user_id = %user_id, event_id = %event_id, "Registration committed");

        Ok(RegisterOutcome::Registered)
    }

    async fn cancel_attendee(
        &self,
        user_id: &UserId,
        event_id: &EventId,
    ) -> Result<CancelOutcome, DbError> {
        let user_id = user_id.to_string();
        let event_id = event_id.to_string();

        let mut tx = self.pool.begin().await.map_err(DbError::Query)?;

        let locked: Option<String> =
            sqlx::query_scalar("SELECT event_id FROM events WHERE event_id = $1 FOR UPDATE")
                .bind(&event_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(DbError::Query)?;

        if locked.is_none() {
            return Ok(CancelOutcome::EventMissing);
        }

        let removed = sqlx::query("DELETE FROM registrations WHERE user_id = $1 AND event_id = $2")
            .bind(&user_id)
            .bind(&event_id)
            .execute(&mut *tx)
            .await
            .map_err(DbError::Query)?
            .rows_affected();

        if removed == 0 {
            return Ok(CancelOutcome::NotRegistered);
        }

        sqlx::query(
            r#"
            UPDATE events
            SET registered_count = GREATEST(registered_count - 1, 0), updated_at = now()
            WHERE event_id = $1
            "#,
        )
        .bind(&event_id)
        .execute(&mut *tx)
        .await
        .map_err(DbError::Query)?;

        sqlx::query("UPDATE users SET updated_at = now() WHERE user_id = $1")
            .bind(&user_id)
            .execute(&mut *tx)
            .await
            .map_err(DbError::Query)?;

        tx.commit().await.map_err(DbError::Query)?;
        debug!(user_id = %user_id, event_id = %event_id, "Cancellation committed");

        Ok(CancelOutcome::Cancelled)
    }
}

// Database row types

struct UserRow(User);

impl<'r> sqlx::FromRow<'r, PgRow> for UserRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let user_id: String = row.try_get("user_id")?;
        let registered: Vec<String> = row.try_get("registered_events")?;

        let registered_events = registered
            .iter()
            .map(|id| EventId::parse(id).map_err(decode_err))
            .collect::<Result<BTreeSet<_>, _>>()?;

        Ok(Self(User {
            id: UserId::parse(&user_id).map_err(decode_err)?,
            name: row.try_get("name")?,
            email: row.try_get("email")?,
            password_hash: row.try_get("password_hash")?,
            registered_events,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        }))
    }
}

struct EventRow(Event);

impl<'r> sqlx::FromRow<'r, PgRow> for EventRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let event_id: String = row.try_get("event_id")?;
        let capacity: i32 = row.try_get("capacity")?;
        let registered_count: i32 = row.try_get("registered_count")?;

        Ok(Self(Event {
            id: EventId::parse(&event_id).map_err(decode_err)?,
            name: row.try_get("name")?,
            organizer: row.try_get("organizer")?,
            location: row.try_get("location")?,
            datetime: row.try_get("datetime")?,
            description: row.try_get("description")?,
            capacity: u32::try_from(capacity).map_err(decode_err)?,
            registered_count: u32::try_from(registered_count).map_err(decode_err)?,
            category: row.try_get("category")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        }))
    }
}
