//! Registration engine: decides whether a user may take or give up a seat at
//! an event, and applies the change through the [`Store`].
//!
//! The seat count on the event and the user's set of registered events are
//! two views of one relationship. A user holds a seat exactly when the event
//! is in their set, so both are written together by a single store call.
//! Stores repeat [`admit`] while holding their lock or row lock; the checks
//! made here first only pick the error to report.

use std::sync::Arc;

use rsvp_id::{EventId, UserId};
use thiserror::Error;
use tracing::{debug, info};

use crate::db::{DbError, Store};
use crate::model::{Event, User};

/// Result of asking a store to take a seat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterOutcome {
    Registered,
    EventMissing,
    UserMissing,
    EventFull,
    AlreadyRegistered,
}

/// Result of asking a store to release a seat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    /// The user held a seat and released it.
    Cancelled,
    /// The user held no seat; nothing changed.
    NotRegistered,
    EventMissing,
}

/// Reasons a registration change is refused.
#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("event not found: {0}")]
    EventNotFound(EventId),

    #[error("user not found: {0}")]
    UserNotFound(UserId),

    #[error("event {0} is full")]
    CapacityExceeded(EventId),

    #[error("user {user_id} is already registered for event {event_id}")]
    AlreadyRegistered { user_id: UserId, event_id: EventId },

    #[error(transparent)]
    Store(#[from] DbError),
}

/// Whether `user` may take a seat at `event`.
///
/// Capacity is checked before membership, so a registered user asking again
/// for a full event is told the event is full.
pub fn admit(event: &Event, user: &User) -> RegisterOutcome {
    if event.is_full() {
        RegisterOutcome::EventFull
    } else if user.is_registered_for(&event.id) {
        RegisterOutcome::AlreadyRegistered
    } else {
        RegisterOutcome::Registered
    }
}

/// Applies register/cancel transitions.
#[derive(Clone)]
pub struct RegistrationEngine {
    store: Arc<dyn Store>,
}

impl RegistrationEngine {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    async fn load(
        &self,
        user_id: &UserId,
        event_id: &EventId,
    ) -> Result<(Event, User), RegistrationError> {
        let event = self
            .store
            .find_event(event_id)
            .await?
            .ok_or(RegistrationError::EventNotFound(*event_id))?;

        let user = self
            .store
            .find_user(user_id)
            .await?
            .ok_or(RegistrationError::UserNotFound(*user_id))?;

        Ok((event, user))
    }

    /// Take a seat at `event_id` for `user_id`.
    pub async fn register(
        &self,
        user_id: &UserId,
        event_id: &EventId,
    ) -> Result<(), RegistrationError> {
        let (event, user) = self.load(user_id, event_id).await?;

        outcome_to_result(admit(&event, &user), user_id, event_id)?;

        // The store re-checks under its lock; a concurrent registration may
        // have taken the last seat in between.
        let outcome = self.store.register_attendee(user_id, event_id).await?;
        outcome_to_result(outcome, user_id, event_id)?;

        info!(user_id = %user_id, event_id = %event_id, "Registered for event");
        Ok(())
    }

    /// Release the seat `user_id` holds at `event_id`.
    ///
    /// Cancelling without a registration succeeds and leaves the event as is.
    pub async fn cancel(
        &self,
        user_id: &UserId,
        event_id: &EventId,
    ) -> Result<(), RegistrationError> {
        self.load(user_id, event_id).await?;

        match self.store.cancel_attendee(user_id, event_id).await? {
            CancelOutcome::Cancelled => {
                info!(user_id = %user_id, event_id = %event_id, "Registration cancelled");
                Ok(())
            }
            CancelOutcome::NotRegistered => {
                debug!(user_id = %user_id, event_id = %event_id, "Cancel without registration");
                Ok(())
            }
            CancelOutcome::EventMissing => Err(RegistrationError::EventNotFound(*event_id)),
        }
    }
}

fn outcome_to_result(
    outcome: RegisterOutcome,
    user_id: &UserId,
    event_id: &EventId,
) -> Result<(), RegistrationError> {
    match outcome {
        RegisterOutcome::Registered => Ok(()),
        RegisterOutcome::EventMissing => Err(RegistrationError::EventNotFound(*event_id)),
        RegisterOutcome::UserMissing => Err(RegistrationError::UserNotFound(*user_id)),
        RegisterOutcome::EventFull => Err(RegistrationError::CapacityExceeded(*event_id)),
        RegisterOutcome::AlreadyRegistered => Err(RegistrationError::AlreadyRegistered {
            user_id: *user_id,
            event_id: *event_id,
        }),
    }
}
