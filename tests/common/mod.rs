// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use async_trait::async_trait;
use chrono::{Duration, Utc};
use mentor_meetings::config::Config;
use mentor_meetings::db::{FirestoreDb, MemoryStore, PartyDirectory};
use mentor_meetings::error::AppError;
use mentor_meetings::models::{OAuthCredential, PartyRecord};
use mentor_meetings::routes::create_router;
use mentor_meetings::services::google::{
    CalendarProvider, CreatedEvent, EventRequest, OAuthProvider, RefreshedToken,
};
use mentor_meetings::AppState;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Unique suffix for test isolation against a shared emulator.
#[allow(dead_code)]
pub fn unique_suffix() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// OAuth provider that hands out a fixed token, counting calls.
#[derive(Default)]
pub struct FakeOAuth {
    pub calls: AtomicUsize,
}

#[async_trait]
impl OAuthProvider for FakeOAuth {
    async fn refresh_access_token(&self, _refresh_token: &str) -> Result<RefreshedToken, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(RefreshedToken {
            access_token: "refreshed-token".to_string(),
            expiry_date: Utc::now() + Duration::hours(1),
        })
    }
}

/// Calendar provider that records every insert and returns a Meet link
/// derived from the access token.
#[derive(Default)]
pub struct FakeCalendar {
    pub events: Mutex<Vec<(String, EventRequest)>>,
}

#[allow(dead_code)]
impl FakeCalendar {
    pub fn insert_count(&self) -> usize {
        self.events.lock().unwrap().len()
    }
}

#[async_trait]
impl CalendarProvider for FakeCalendar {
    async fn insert_event(
        &self,
        credential: &OAuthCredential,
        event: &EventRequest,
    ) -> Result<CreatedEvent, AppError> {
        let mut events = self.events.lock().unwrap();
        events.push((credential.access_token.clone(), event.clone()));
        Ok(CreatedEvent {
            event_id: format!("event-{}", events.len()),
            meet_link: Some(format!(
                "https://meet.google.com/fake-{}",
                credential.access_token
            )),
        })
    }
}

/// Everything a test may want to poke at behind the router.
#[allow(dead_code)]
pub struct TestApp {
    pub router: axum::Router,
    pub state: Arc<AppState>,
    pub store: MemoryStore,
    pub oauth: Arc<FakeOAuth>,
    pub calendar: Arc<FakeCalendar>,
}

/// Create a test app over an in-memory store and fake Google providers.
#[allow(dead_code)]
pub fn create_test_app() -> TestApp {
    let store = MemoryStore::new();
    let oauth = Arc::new(FakeOAuth::default());
    let calendar = Arc::new(FakeCalendar::default());

    let state = Arc::new(AppState::new(
        Config::default(),
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        oauth.clone(),
        calendar.clone(),
    ));

    TestApp {
        router: create_router(state.clone()),
        state,
        store,
        oauth,
        calendar,
    }
}

/// Store a party with a Google grant.
#[allow(dead_code)]
pub async fn seed_party(store: &MemoryStore, id: &str, email: &str, token: &str, expired: bool) {
    let offset = if expired {
        -Duration::minutes(5)
    } else {
        Duration::hours(1)
    };
    store
        .set_party(
            id,
            &PartyRecord {
                id: None,
                email: Some(email.to_string()),
                name: None,
                google_oauth: Some(OAuthCredential {
                    access_token: token.to_string(),
                    refresh_token: format!("refresh-{}", token),
                    scope: "https://www.googleapis.com/auth/calendar".to_string(),
                    token_type: "Bearer".to_string(),
                    expiry_date: Utc::now() + offset,
                }),
            },
        )
        .await
        .expect("seed party");
}

/// A meeting date a few days out, in the form the frontend sends.
#[allow(dead_code)]
pub fn upcoming_date() -> String {
    (Utc::now() + Duration::days(3))
        .date_naive()
        .format("%Y-%m-%d")
        .to_string()
}

#[allow(dead_code)]
pub fn new_meeting_json(date: &str) -> serde_json::Value {
    serde_json::json!({
        "menteeId": "mentee-1",
        "mentorId": "mentor-1",
        "menteeEmail": "ada@example.com",
        "mentorEmail": "grace@example.com",
        "menteeName": "Ada",
        "mentorName": "Grace",
        "meetingDate": date,
        "meetingTime": "1:00 PM - 2:00 PM",
    })
}
