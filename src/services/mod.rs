// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod calendar;
pub mod credentials;
pub mod google;
pub mod meetings;
pub mod sweeper;
pub mod time_window;

pub use calendar::{CalendarOrchestrator, LinkSource, MeetingLink};
pub use credentials::CredentialResolver;
pub use google::{CalendarProvider, GoogleCalendarClient, GoogleOAuthClient, OAuthProvider};
pub use meetings::{ApprovalOutcome, MeetingService, NewMeeting};
pub use sweeper::{ExpirySweeper, SweepReport};
pub use time_window::TimeNormalizer;
