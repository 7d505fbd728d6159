//! In-process store backed by hash maps.
//!
//! All tables sit behind one `RwLock`, so a registration change updates the
//! event and the user under the same write guard.

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use rsvp_id::{EventId, UserId};
use tokio::sync::RwLock;

use super::{DbError, Store};
use crate::model::{Event, NewEvent, NewUser, User};
use crate::query::{self, EventFilter, EventPage, PageRequest};
use crate::registration::{admit, CancelOutcome, RegisterOutcome};

#[derive(Default)]
struct Tables {
    users: HashMap<UserId, User>,
    /// email -> owner
    emails: HashMap<String, UserId>,
    events: HashMap<EventId, Event>,
}

/// Store that keeps everything in memory. Contents are lost on drop.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn health_check(&self) -> Result<(), DbError> {
        Ok(())
    }

    async fn insert_user(&self, user: NewUser) -> Result<User, DbError> {
        let mut tables = self.tables.write().await;

        if tables.emails.contains_key(&user.email) {
            return Err(DbError::EmailTaken(user.email));
        }

        let now = Utc::now();
        let user = User {
            id: UserId::new(),
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            registered_events: BTreeSet::new(),
            created_at: now,
            updated_at: now,
        };

        tables.emails.insert(user.email.clone(), user.id);
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user(&self, id: &UserId) -> Result<Option<User>, DbError> {
        Ok(self.tables.read().await.users.get(id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, DbError> {
        let tables = self.tables.read().await;
        Ok(tables
            .emails
            .get(email)
            .and_then(|id| tables.users.get(id))
            .cloned())
    }

    async fn insert_event(&self, event: NewEvent) -> Result<Event, DbError> {
        let now = Utc::now();
        let event = Event {
            id: EventId::new(),
            name: event.name,
            organizer: event.organizer,
            location: event.location,
            datetime: event.datetime,
            description: event.description,
            capacity: event.capacity,
            registered_count: 0,
            category: event.category,
            created_at: now,
            updated_at: now,
        };

        self.tables.write().await.events.insert(event.id, event.clone());
        Ok(event)
    }

    async fn find_event(&self, id: &EventId) -> Result<Option<Event>, DbError> {
        Ok(self.tables.read().await.events.get(id).cloned())
    }

    async fn find_events(&self, ids: &[EventId]) -> Result<Vec<Event>, DbError> {
        let tables = self.tables.read().await;
        let mut events: Vec<Event> = ids
            .iter()
            .filter_map(|id| tables.events.get(id))
            .cloned()
            .collect();
        events.sort_by(|a, b| a.datetime.cmp(&b.datetime).then_with(|| a.id.cmp(&b.id)));
        Ok(events)
    }

    async fn list_events(
        &self,
        filter: &EventFilter,
        page: PageRequest,
    ) -> Result<EventPage, DbError> {
        let tables = self.tables.read().await;
        Ok(query::paginate(tables.events.values(), filter, page))
    }

    async fn register_attendee(
        &self,
        user_id: &UserId,
        event_id: &EventId,
    ) -> Result<RegisterOutcome, DbError> {
        let mut guard = self.tables.write().await;
        let tables = &mut *guard;

        let Some(event) = tables.events.get_mut(event_id) else {
            return Ok(RegisterOutcome::EventMissing);
        };
        let Some(user) = tables.users.get_mut(user_id) else {
            return Ok(RegisterOutcome::UserMissing);
        };

        let outcome = admit(event, user);
        if outcome == RegisterOutcome::Registered {
            let now = Utc::now();
            event.registered_count += 1;
            event.updated_at = now;
            user.registered_events.insert(*event_id);
            user.updated_at = now;
        }

        Ok(outcome)
    }

    async fn cancel_attendee(
        &self,
        user_id: &UserId,
        event_id: &EventId,
    ) -> Result<CancelOutcome, DbError> {
        let mut guard = self.tables.write().await;
        let tables = &mut *guard;

        let Some(event) = tables.events.get_mut(event_id) else {
            return Ok(CancelOutcome::EventMissing);
        };

        let held = tables
            .users
            .get_mut(user_id)
            .is_some_and(|user| user.registered_events.remove(event_id));

        if !held {
            return Ok(CancelOutcome::NotRegistered);
        }

        event.registered_count = event.registered_count.saturating_sub(1);
        event.updated_at = Utc::now();
        Ok(CancelOutcome::Cancelled)
    }
}
