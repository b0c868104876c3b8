// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Mentor-Meetings: schedule mentorship sessions between mentees and mentors
//!
//! This crate provides the backend API for negotiating meeting times,
//! confirming them once both parties approve (creating a Google Calendar
//! event with a Meet link), and retiring meetings after they end.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::{MeetingStore, PartyDirectory};
use services::{
    CalendarOrchestrator, CalendarProvider, CredentialResolver, ExpirySweeper, MeetingService,
    OAuthProvider, TimeNormalizer,
};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub meetings: MeetingService,
    pub sweeper: ExpirySweeper,
}

impl AppState {
    /// Wire services on top of the given store and Google collaborators.
    pub fn new(
        config: Config,
        store: Arc<dyn MeetingStore>,
        directory: Arc<dyn PartyDirectory>,
        oauth: Arc<dyn OAuthProvider>,
        calendar: Arc<dyn CalendarProvider>,
    ) -> Self {
        let normalizer = TimeNormalizer::new(config.meeting_timezone);
        let resolver = CredentialResolver::new(directory, oauth);
        let orchestrator = CalendarOrchestrator::new(
            resolver,
            calendar,
            normalizer,
            config.meet_link_host.clone(),
        );

        Self {
            meetings: MeetingService::new(store.clone(), orchestrator),
            sweeper: ExpirySweeper::new(store, normalizer),
            config,
        }
    }
}
