// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Mentor-Meetings API Server
//!
//! Negotiates mentorship meeting times, confirms them with a Google Calendar
//! event once both parties approve, and retires them after they end.

use mentor_meetings::{
    config::{Config, StoreBackend},
    db::{FirestoreDb, MeetingStore, MemoryStore, PartyDirectory},
    services::{GoogleCalendarClient, GoogleOAuthClient},
    AppState,
};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Structured JSON logging for GCP
    init_logging();

    let config = Config::from_env()?;
    tracing::info!(
        port = config.port,
        timezone = %config.meeting_timezone,
        "Starting Mentor-Meetings API"
    );

    let (store, directory) = match config.store_backend {
        StoreBackend::Firestore => shared_backend(FirestoreDb::new(&config.gcp_project_id).await?),
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store; data is lost on restart");
            shared_backend(MemoryStore::new())
        }
    };

    let oauth = Arc::new(GoogleOAuthClient::new(
        config.google_client_id.clone(),
        config.google_client_secret.clone(),
    ));
    let calendar = Arc::new(GoogleCalendarClient::new());

    let state = Arc::new(AppState::new(
        config.clone(),
        store,
        directory,
        oauth,
        calendar,
    ));

    if config.sweep_interval_secs > 0 {
        state
            .sweeper
            .clone()
            .spawn_periodic(Duration::from_secs(config.sweep_interval_secs));
        tracing::info!(
            interval_secs = config.sweep_interval_secs,
            "Expired meeting sweeper started"
        );
    }

    let app = mentor_meetings::routes::create_router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// One backend serving both the meeting partitions and the party directory.
fn shared_backend<B>(backend: B) -> (Arc<dyn MeetingStore>, Arc<dyn PartyDirectory>)
where
    B: MeetingStore + PartyDirectory + 'static,
{
    let backend = Arc::new(backend);
    (backend.clone(), backend)
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("mentor_meetings=debug,info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(format)
        .init();
}
