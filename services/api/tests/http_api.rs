//! End-to-end HTTP tests against an in-memory store.

use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use rsvp_api::{
    api::{self, tokens::TokenService},
    db::{MemoryStore, Store},
    model::{Event, NewEvent},
    state::AppState,
};
use tokio::net::TcpListener;

const SECRET: &[u8] = b"http-api-test-secret";

struct ApiFixture {
    base_url: String,
    store: Arc<MemoryStore>,
    client: reqwest::Client,
}

async fn start_api() -> ApiFixture {
    let store = Arc::new(MemoryStore::new());
    let tokens = TokenService::new(SECRET, Duration::days(7));
    let state = AppState::new(store.clone(), tokens);
    let app = api::create_router(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let base_url = format!("http://{addr}");

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    ApiFixture {
        base_url,
        store,
        client: reqwest::Client::new(),
    }
}

impl ApiFixture {
    async fn seed_event(&self, name: &str, category: &str, capacity: u32, day: u32) -> Event {
        self.store
            .insert_event(NewEvent {
                name: name.to_string(),
                organizer: "NXtwave".to_string(),
                location: "Hyderabad".to_string(),
                datetime: Utc.with_ymd_and_hms(2026, 3, day, 18, 0, 0).unwrap(),
                description: Some(format!("{name} description")),
                capacity,
                category: Some(category.to_string()),
            })
            .await
            .unwrap()
    }

    async fn sign_up(&self, name: &str, email: &str, password: &str) -> reqwest::Response {
        self.client
            .post(format!("{}/api/auth/register", self.base_url))
            .json(&serde_json::json!({ "name": name, "email": email, "password": password }))
            .send()
            .await
            .unwrap()
    }

    async fn log_in(&self, email: &str, password: &str) -> reqwest::Response {
        self.client
            .post(format!("{}/api/auth/login", self.base_url))
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await
            .unwrap()
    }

    /// Register a fresh account and return its token.
    async fn token_for(&self, name: &str) -> String {
        let email = format!("{name}@example.com");
        let resp = self.sign_up(name, &email, "pw-123456").await;
        assert_eq!(resp.status().as_u16(), 201);

        let body: serde_json::Value = self.log_in(&email, "pw-123456").await.json().await.unwrap();
        body["token"].as_str().expect("missing token").to_string()
    }

    async fn post_as(&self, token: &str, path: &str) -> reqwest::Response {
        self.client
            .post(format!("{}{path}", self.base_url))
            .bearer_auth(token)
            .send()
            .await
            .unwrap()
    }

    async fn get_as(&self, token: &str, path: &str) -> reqwest::Response {
        self.client
            .get(format!("{}{path}", self.base_url))
            .bearer_auth(token)
            .send()
            .await
            .unwrap()
    }
}

async fn message(resp: reqwest::Response) -> String {
    let body: serde_json::Value = resp.json().await.unwrap();
    body["message"].as_str().unwrap_or_default().to_string()
}

#[tokio::test]
async fn health_endpoints_respond() {
    let fixture = start_api().await;

    let resp = fixture.client.get(&fixture.base_url).send().await.unwrap();
    assert!(resp.status().is_success());
    assert_eq!(resp.text().await.unwrap(), "API is running...");

    for path in ["/healthz", "/readyz", "/livez"] {
        let resp = fixture
            .client
            .get(format!("{}{path}", fixture.base_url))
            .send()
            .await
            .unwrap();
        assert!(resp.status().is_success(), "{path} failed");
    }
}

#[tokio::test]
async fn responses_carry_a_request_id() {
    let fixture = start_api().await;

    let resp = fixture.client.get(&fixture.base_url).send().await.unwrap();
    let request_id = resp.headers()["x-request-id"].to_str().unwrap();
    assert!(request_id.starts_with("req_"));

    let resp = fixture
        .client
        .get(&fixture.base_url)
        .header("x-request-id", "client-chosen")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.headers()["x-request-id"], "client-chosen");
}

#[tokio::test]
async fn sign_up_and_log_in() {
    let fixture = start_api().await;

    let resp = fixture.sign_up("Alice", "Alice@Example.com", "hunter22").await;
    assert_eq!(resp.status().as_u16(), 201);
    assert_eq!(message(resp).await, "User registered successfully");

    // same address, different case
    let resp = fixture.sign_up("Alice 2", "alice@example.com", "other").await;
    assert_eq!(resp.status().as_u16(), 400);
    assert_eq!(message(resp).await, "User already exists");

    let resp = fixture.log_in("alice@example.com", "hunter22").await;
    assert_eq!(resp.status().as_u16(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert!(body["token"].as_str().is_some_and(|t| !t.is_empty()));
    assert_eq!(body["user"]["name"], "Alice");
    assert_eq!(body["user"]["email"], "alice@example.com");
    assert!(body["user"]["id"].as_str().unwrap().starts_with("usr_"));
    assert!(body["user"].get("password_hash").is_none());

    let resp = fixture.log_in("alice@example.com", "wrong").await;
    assert_eq!(resp.status().as_u16(), 400);
    assert_eq!(message(resp).await, "Invalid credentials");

    let resp = fixture.log_in("nobody@example.com", "hunter22").await;
    assert_eq!(resp.status().as_u16(), 400);
    assert_eq!(message(resp).await, "Invalid credentials");
}

#[tokio::test]
async fn sign_up_validates_input() {
    let fixture = start_api().await;

    let resp = fixture.sign_up("", "bob@example.com", "pw").await;
    assert_eq!(resp.status().as_u16(), 400);
    assert_eq!(message(resp).await, "Name, email and password are required");

    let resp = fixture
        .client
        .post(format!("{}/api/auth/register", fixture.base_url))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);
    assert!(!message(resp).await.is_empty());
}

#[tokio::test]
async fn list_events_filters_and_paginates() {
    let fixture = start_api().await;
    fixture.seed_event("MERN Stack Workshop", "Tech", 50, 10).await;
    fixture.seed_event("React Meetup", "Tech", 50, 12).await;
    fixture.seed_event("Jazz Night", "Music", 50, 11).await;

    let resp = fixture
        .client
        .get(format!("{}/api/events", fixture.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["totalEvents"], 3);
    assert_eq!(body["currentPage"], 1);
    assert_eq!(body["totalPages"], 1);
    let names: Vec<&str> = body["events"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["MERN Stack Workshop", "Jazz Night", "React Meetup"]);

    let body: serde_json::Value = fixture
        .client
        .get(format!("{}/api/events?category=Tech&limit=1&page=2", fixture.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["totalEvents"], 2);
    assert_eq!(body["totalPages"], 2);
    assert_eq!(body["currentPage"], 2);
    assert_eq!(body["events"][0]["name"], "React Meetup");

    let body: serde_json::Value = fixture
        .client
        .get(format!("{}/api/events?search=mern", fixture.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["totalEvents"], 1);

    let body: serde_json::Value = fixture
        .client
        .get(format!("{}/api/events?date=2026-03-11", fixture.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["totalEvents"], 1);
    assert_eq!(body["events"][0]["name"], "Jazz Night");

    let resp = fixture
        .client
        .get(format!("{}/api/events?date=someday", fixture.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);
}

#[tokio::test]
async fn event_detail_requires_a_valid_token() {
    let fixture = start_api().await;
    let event = fixture.seed_event("React Meetup", "Tech", 10, 12).await;
    let path = format!("{}/api/events/{}", fixture.base_url, event.id);

    let resp = fixture.client.get(&path).send().await.unwrap();
    assert_eq!(resp.status().as_u16(), 401);
    assert_eq!(message(resp).await, "Not authorized");

    let resp = fixture.client.get(&path).bearer_auth("garbage").send().await.unwrap();
    assert_eq!(resp.status().as_u16(), 401);
    assert_eq!(message(resp).await, "Invalid token");

    // signed with a different secret
    let forged = TokenService::new(b"someone-else", Duration::days(1))
        .issue(rsvp_id::UserId::new())
        .unwrap();
    let resp = fixture.client.get(&path).bearer_auth(forged).send().await.unwrap();
    assert_eq!(resp.status().as_u16(), 401);
}

#[tokio::test]
async fn register_and_cancel_roundtrip() {
    let fixture = start_api().await;
    let event = fixture.seed_event("React Meetup", "Tech", 10, 12).await;
    let token = fixture.token_for("carol").await;
    let detail = format!("/api/events/{}", event.id);

    let body: serde_json::Value = fixture.get_as(&token, &detail).await.json().await.unwrap();
    assert_eq!(body["isRegistered"], false);
    assert_eq!(body["registeredCount"], 0);
    assert_eq!(body["name"], "React Meetup");

    let resp = fixture.post_as(&token, &format!("{detail}/register")).await;
    assert_eq!(resp.status().as_u16(), 200);
    assert_eq!(message(resp).await, "Registered successfully");

    let body: serde_json::Value = fixture.get_as(&token, &detail).await.json().await.unwrap();
    assert_eq!(body["isRegistered"], true);
    assert_eq!(body["registeredCount"], 1);

    let resp = fixture.post_as(&token, &format!("{detail}/register")).await;
    assert_eq!(resp.status().as_u16(), 400);
    assert_eq!(message(resp).await, "Already registered");

    let mine: serde_json::Value = fixture
        .get_as(&token, "/api/events/my/registered")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(mine.as_array().unwrap().len(), 1);
    assert_eq!(mine[0]["id"], event.id.to_string());

    // cancelling twice is fine and only releases one seat
    for _ in 0..2 {
        let resp = fixture.post_as(&token, &format!("{detail}/cancel")).await;
        assert_eq!(resp.status().as_u16(), 200);
        assert_eq!(message(resp).await, "Registration cancelled");
    }

    let body: serde_json::Value = fixture.get_as(&token, &detail).await.json().await.unwrap();
    assert_eq!(body["isRegistered"], false);
    assert_eq!(body["registeredCount"], 0);

    let mine: serde_json::Value = fixture
        .get_as(&token, "/api/events/my/registered")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(mine, serde_json::json!([]));
}

#[tokio::test]
async fn capacity_is_enforced() {
    let fixture = start_api().await;
    let event = fixture.seed_event("Small Room", "Tech", 2, 10).await;
    let register = format!("/api/events/{}/register", event.id);

    let first = fixture.token_for("u1").await;
    let second = fixture.token_for("u2").await;
    let third = fixture.token_for("u3").await;

    assert_eq!(fixture.post_as(&first, &register).await.status().as_u16(), 200);
    assert_eq!(fixture.post_as(&second, &register).await.status().as_u16(), 200);

    let resp = fixture.post_as(&third, &register).await;
    assert_eq!(resp.status().as_u16(), 400);
    assert_eq!(message(resp).await, "Event is full");

    // a freed seat can be taken again
    let cancel = format!("/api/events/{}/cancel", event.id);
    assert_eq!(fixture.post_as(&first, &cancel).await.status().as_u16(), 200);
    assert_eq!(fixture.post_as(&third, &register).await.status().as_u16(), 200);

    let stored = fixture.store.find_event(&event.id).await.unwrap().unwrap();
    assert_eq!(stored.registered_count, 2);
}

#[tokio::test]
async fn unknown_events_are_not_found() {
    let fixture = start_api().await;
    let token = fixture.token_for("dave").await;

    for id in [rsvp_id::EventId::new().to_string(), "not-an-id".to_string()] {
        let resp = fixture.get_as(&token, &format!("/api/events/{id}")).await;
        assert_eq!(resp.status().as_u16(), 404);
        assert_eq!(message(resp).await, "Event not found");

        let resp = fixture.post_as(&token, &format!("/api/events/{id}/register")).await;
        assert_eq!(resp.status().as_u16(), 404);

        let resp = fixture.post_as(&token, &format!("/api/events/{id}/cancel")).await;
        assert_eq!(resp.status().as_u16(), 404);
    }
}
