//! Event browsing and registration endpoints.
//!
//! Endpoints:
//! - GET  /api/events - List events (public)
//! - GET  /api/events/my/registered - Events the caller is registered for
//! - GET  /api/events/{event_id} - One event, with the caller's registration state
//! - POST /api/events/{event_id}/register - Take a seat
//! - POST /api/events/{event_id}/cancel - Give up a seat

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use rsvp_id::EventId;
use serde::{Deserialize, Serialize};

use crate::api::auth::MessageResponse;
use crate::api::error::ApiError;
use crate::api::guard::AuthUser;
use crate::model::Event;
use crate::query::{EventFilter, PageRequest};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_events))
        .route("/my/registered", get(my_registrations))
        .route("/{event_id}", get(get_event))
        .route("/{event_id}/register", post(register))
        .route("/{event_id}/cancel", post(cancel))
}

// =============================================================================
// Request/Response Types
// =============================================================================

/// Query parameters for listing events.
///
/// Kept as raw strings so malformed paging values fall back to defaults
/// instead of rejecting the request.
#[derive(Debug, Default, Deserialize)]
pub struct ListEventsQuery {
    pub search: Option<String>,
    pub category: Option<String>,
    pub location: Option<String>,
    /// `YYYY-MM-DD`, interpreted as a UTC day.
    pub date: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

impl ListEventsQuery {
    fn into_parts(self) -> Result<(EventFilter, PageRequest), ApiError> {
        // empty parameters (`?category=`) constrain nothing
        fn present(value: Option<String>) -> Option<String> {
            value.filter(|v| !v.is_empty())
        }

        let page = PageRequest::from_raw(self.page.as_deref(), self.limit.as_deref());

        let date = match present(self.date) {
            Some(raw) => {
                Some(parse_day(&raw).ok_or_else(|| ApiError::bad_request("Invalid date"))?)
            }
            None => None,
        };

        let filter = EventFilter {
            search: present(self.search),
            category: present(self.category),
            location: present(self.location),
            date,
        };

        Ok((filter, page))
    }
}

/// Accepts `2026-03-10` or a timestamp starting with one (`2026-03-10T...`).
fn parse_day(raw: &str) -> Option<NaiveDate> {
    let day = raw.trim().get(..10)?;
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

/// A single event plus whether the caller holds a seat.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDetailResponse {
    #[serde(flatten)]
    pub event: Event,
    pub is_registered: bool,
}

/// Ids that do not parse cannot name an existing event.
fn parse_event_id(raw: &str) -> Result<EventId, ApiError> {
    raw.parse().map_err(|_| ApiError::event_not_found())
}

// =============================================================================
// Handlers
// =============================================================================

/// List events.
///
/// GET /api/events?search=&category=&location=&date=&page=&limit=
async fn list_events(
    State(state): State<AppState>,
    Query(query): Query<ListEventsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let (filter, page) = query.into_parts()?;
    let page = state.store().list_events(&filter, page).await?;
    Ok(Json(page))
}

/// Get one event.
///
/// GET /api/events/{event_id}
async fn get_event(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(event_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let event_id = parse_event_id(&event_id)?;

    let event = state
        .store()
        .find_event(&event_id)
        .await?
        .ok_or_else(ApiError::event_not_found)?;

    let is_registered = state
        .store()
        .find_user(&auth.user_id)
        .await?
        .is_some_and(|user| user.is_registered_for(&event_id));

    Ok(Json(EventDetailResponse {
        event,
        is_registered,
    }))
}

/// Register the caller for an event.
///
/// POST /api/events/{event_id}/register
async fn register(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(event_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let event_id = parse_event_id(&event_id)?;
    state.registrations().register(&auth.user_id, &event_id).await?;
    Ok(MessageResponse::new("Registered successfully"))
}

/// Cancel the caller's registration.
///
/// POST /api/events/{event_id}/cancel
async fn cancel(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(event_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let event_id = parse_event_id(&event_id)?;
    state.registrations().cancel(&auth.user_id, &event_id).await?;
    Ok(MessageResponse::new("Registration cancelled"))
}

/// Events the caller is registered for.
///
/// GET /api/events/my/registered
async fn my_registrations(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .store()
        .find_user(&auth.user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    let ids: Vec<EventId> = user.registered_events.into_iter().collect();
    let events = state.store().find_events(&ids).await?;
    Ok(Json(events))
}
