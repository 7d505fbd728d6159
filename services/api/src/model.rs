//! Domain records shared by the stores, the registration engine and the API.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use rsvp_id::{EventId, UserId};
use serde::Serialize;

/// A registered account.
///
/// `password_hash` never leaves the service; the type is deliberately not
/// `Serialize`. Use [`UserProfile`] for responses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub registered_events: BTreeSet<EventId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Whether this user currently holds a seat at `event_id`.
    pub fn is_registered_for(&self, event_id: &EventId) -> bool {
        self.registered_events.contains(event_id)
    }

    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
        }
    }
}

/// Public view of a user.
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    pub id: UserId,
    pub name: String,
    pub email: String,
}

/// Input for creating a user. The password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
}

/// An event accepting registrations up to `capacity`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: EventId,
    pub name: String,
    pub organizer: String,
    pub location: String,
    pub datetime: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub capacity: u32,
    pub registered_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    pub fn is_full(&self) -> bool {
        self.registered_count >= self.capacity
    }

    /// Seats still available.
    pub fn remaining(&self) -> u32 {
        self.capacity.saturating_sub(self.registered_count)
    }
}

/// Input for creating an event.
///
/// Events are created by administrative tooling, not through the HTTP API.
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub name: String,
    pub organizer: String,
    pub location: String,
    pub datetime: DateTime<Utc>,
    pub description: Option<String>,
    pub capacity: u32,
    pub category: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(capacity: u32, registered_count: u32) -> Event {
        let now = Utc::now();
        Event {
            id: EventId::new(),
            name: "MERN Stack Workshop".to_string(),
            organizer: "NXtwave".to_string(),
            location: "Hyderabad".to_string(),
            datetime: now,
            description: None,
            capacity,
            registered_count,
            category: Some("Tech".to_string()),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_is_full_at_capacity() {
        assert!(!event(2, 1).is_full());
        assert!(event(2, 2).is_full());
        assert_eq!(event(2, 1).remaining(), 1);
    }

    #[test]
    fn test_event_serializes_camel_case() {
        let json = serde_json::to_value(event(5, 1)).unwrap();
        assert_eq!(json["registeredCount"], 1);
        assert_eq!(json["category"], "Tech");
        assert!(json.get("description").is_none());
        assert!(json["id"].as_str().unwrap().starts_with("evt_"));
    }
}
