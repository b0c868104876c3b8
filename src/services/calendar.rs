// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Calendar event creation and meeting-link acquisition.
//!
//! Exactly one calendar event is created per meeting, with both parties as
//! attendees. [`LINK_ATTEMPTS`] lists whose calendar is tried, and how the
//! party is identified, in order. When every attempt fails a synthetic link
//! is returned instead, so finalization never blocks on OAuth problems.

use crate::error::AppError;
use crate::models::{Meeting, PartyRole};
use crate::services::credentials::CredentialResolver;
use crate::services::google::{CalendarProvider, CreatedEvent, EventRequest};
use crate::services::time_window::TimeNormalizer;
use rand::Rng;
use std::sync::Arc;

/// Length of each random base-36 token in a synthetic link.
const SYNTHETIC_TOKEN_LEN: usize = 11;
const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Which identity key of a party to resolve credentials with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityKey {
    Id,
    Email,
}

/// One calendar the link chain will try.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkAttempt {
    pub role: PartyRole,
    pub key: IdentityKey,
}

/// Mentee first, then mentor; id before email for each.
pub const LINK_ATTEMPTS: [LinkAttempt; 4] = [
    LinkAttempt {
        role: PartyRole::Mentee,
        key: IdentityKey::Id,
    },
    LinkAttempt {
        role: PartyRole::Mentee,
        key: IdentityKey::Email,
    },
    LinkAttempt {
        role: PartyRole::Mentor,
        key: IdentityKey::Id,
    },
    LinkAttempt {
        role: PartyRole::Mentor,
        key: IdentityKey::Email,
    },
];

impl LinkAttempt {
    fn identity<'a>(&self, meeting: &'a Meeting) -> &'a str {
        let (id, email) = meeting.identities(self.role);
        match self.key {
            IdentityKey::Id => id,
            IdentityKey::Email => email,
        }
    }
}

/// Where a meeting link came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkSource {
    Calendar(LinkAttempt),
    Synthetic,
}

/// Link chosen for a meeting, plus the calendar event if one was created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeetingLink {
    pub url: String,
    pub event_id: Option<String>,
    pub source: LinkSource,
}

/// Builds calendar events for meetings.
#[derive(Clone)]
pub struct CalendarOrchestrator {
    resolver: CredentialResolver,
    calendar: Arc<dyn CalendarProvider>,
    normalizer: TimeNormalizer,
    meet_link_host: String,
}

impl CalendarOrchestrator {
    pub fn new(
        resolver: CredentialResolver,
        calendar: Arc<dyn CalendarProvider>,
        normalizer: TimeNormalizer,
        meet_link_host: impl Into<String>,
    ) -> Self {
        Self {
            resolver,
            calendar,
            normalizer,
            meet_link_host: meet_link_host.into(),
        }
    }

    /// Create one event on `identity`'s calendar with both parties invited.
    ///
    /// Errors (missing credential, refresh failure, unparseable schedule,
    /// calendar API failure) are returned as-is.
    pub async fn create_event(
        &self,
        identity: &str,
        meeting: &Meeting,
        want_link: bool,
    ) -> Result<CreatedEvent, AppError> {
        let resolved = self.resolver.usable_credential(identity).await?;
        let window = self
            .normalizer
            .parse_meeting_window(&meeting.meeting_date, &meeting.meeting_time)?;

        let mentee = meeting.display_name(PartyRole::Mentee);
        let mentor = meeting.display_name(PartyRole::Mentor);

        let event = EventRequest {
            summary: format!("Mentorship Session: {} & {}", mentee, mentor),
            description: format!(
                "Mentorship session between {} (mentee) and {} (mentor).",
                mentee, mentor
            ),
            start: window.start,
            end: window.end,
            time_zone: self.normalizer.timezone().name().to_string(),
            attendees: vec![meeting.mentee_email.clone(), meeting.mentor_email.clone()],
            conference_request_id: want_link.then(|| uuid::Uuid::new_v4().to_string()),
        };

        self.calendar.insert_event(&resolved.credential, &event).await
    }

    /// Return a link for the meeting. Never fails.
    pub async fn generate_meeting_link(&self, meeting: &Meeting) -> String {
        self.obtain_meeting_link(meeting).await.url
    }

    /// Walk [`LINK_ATTEMPTS`], stopping at the first created event.
    pub async fn obtain_meeting_link(&self, meeting: &Meeting) -> MeetingLink {
        for attempt in LINK_ATTEMPTS {
            let identity = attempt.identity(meeting);
            if identity.trim().is_empty() {
                continue;
            }

            match self.create_event(identity, meeting, true).await {
                Ok(CreatedEvent {
                    event_id,
                    meet_link: Some(url),
                }) => {
                    tracing::info!(
                        role = ?attempt.role,
                        key = ?attempt.key,
                        event_id = %event_id,
                        "Meeting link generated from calendar event"
                    );
                    return MeetingLink {
                        url,
                        event_id: Some(event_id),
                        source: LinkSource::Calendar(attempt),
                    };
                }
                Ok(CreatedEvent {
                    event_id,
                    meet_link: None,
                }) => {
                    // The event exists now; another attempt would duplicate it.
                    tracing::warn!(
                        role = ?attempt.role,
                        event_id = %event_id,
                        "Calendar event created without a conference link"
                    );
                    return MeetingLink {
                        url: self.synthetic_link(),
                        event_id: Some(event_id),
                        source: LinkSource::Synthetic,
                    };
                }
                Err(err) if err.is_calendar_chain_error() => {
                    tracing::warn!(
                        role = ?attempt.role,
                        key = ?attempt.key,
                        error = %err,
                        "Calendar attempt failed, trying next"
                    );
                }
                Err(err) => {
                    tracing::error!(
                        role = ?attempt.role,
                        key = ?attempt.key,
                        error = %err,
                        "Calendar attempt failed unexpectedly, trying next"
                    );
                }
            }
        }

        tracing::warn!("All calendar attempts failed, using synthetic meeting link");
        MeetingLink {
            url: self.synthetic_link(),
            event_id: None,
            source: LinkSource::Synthetic,
        }
    }

    /// `https://<host>/<token><token>` with two random base-36 tokens.
    pub fn synthetic_link(&self) -> String {
        format!(
            "https://{}/{}{}",
            self.meet_link_host,
            random_base36(SYNTHETIC_TOKEN_LEN),
            random_base36(SYNTHETIC_TOKEN_LEN)
        )
    }
}

fn random_base36(len: usize) -> String {
    let mut rng = rand::rng();
    (0..len)
        .map(|_| BASE36[rng.random_range(0..BASE36.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{MemoryStore, PartyDirectory};
    use crate::models::{OAuthCredential, PartyRecord};
    use crate::services::google::{OAuthProvider, RefreshedToken};
    use async_trait::async_trait;
    use chrono::{Duration, Utc};
    use std::sync::Mutex;

    struct NoRefresh;

    #[async_trait]
    impl OAuthProvider for NoRefresh {
        async fn refresh_access_token(&self, _: &str) -> Result<RefreshedToken, AppError> {
            Err(AppError::Refresh("refresh disabled in test".into()))
        }
    }

    /// Records inserts; fails for tokens listed in `failing_tokens`.
    #[derive(Default)]
    struct RecordingCalendar {
        inserts: Mutex<Vec<(String, EventRequest)>>,
        failing_tokens: Vec<String>,
        omit_link: bool,
    }

    #[async_trait]
    impl CalendarProvider for RecordingCalendar {
        async fn insert_event(
            &self,
            credential: &OAuthCredential,
            event: &EventRequest,
        ) -> Result<CreatedEvent, AppError> {
            if self.failing_tokens.contains(&credential.access_token) {
                return Err(AppError::CalendarApi("HTTP 500".into()));
            }
            let mut inserts = self.inserts.lock().unwrap();
            inserts.push((credential.access_token.clone(), event.clone()));
            Ok(CreatedEvent {
                event_id: format!("evt-{}", inserts.len()),
                meet_link: (!self.omit_link)
                    .then(|| format!("https://meet.google.com/{}", credential.access_token)),
            })
        }
    }

    fn grant(token: &str, expired: bool) -> OAuthCredential {
        let offset = if expired {
            -Duration::hours(1)
        } else {
            Duration::hours(1)
        };
        OAuthCredential {
            access_token: token.into(),
            refresh_token: format!("refresh-{}", token),
            scope: "calendar".into(),
            token_type: "Bearer".into(),
            expiry_date: Utc::now() + offset,
        }
    }

    fn meeting() -> Meeting {
        let date = (Utc::now() + Duration::days(3))
            .date_naive()
            .format("%Y-%m-%d")
            .to_string();
        Meeting {
            mentee_id: "mentee-1".into(),
            mentor_id: "mentor-1".into(),
            mentee_email: "ada@example.com".into(),
            mentor_email: "grace@example.com".into(),
            mentee_name: Some("Ada".into()),
            mentor_name: Some("Grace".into()),
            meeting_date: date,
            meeting_time: "1:00 PM - 2:00 PM".into(),
            ..Default::default()
        }
    }

    fn orchestrator(store: MemoryStore, calendar: Arc<RecordingCalendar>) -> CalendarOrchestrator {
        let resolver = CredentialResolver::new(Arc::new(store), Arc::new(NoRefresh));
        CalendarOrchestrator::new(resolver, calendar, TimeNormalizer::default(), "meet.google.com")
    }

    fn assert_synthetic(url: &str) {
        let token = url
            .strip_prefix("https://meet.google.com/")
            .expect("synthetic host");
        assert_eq!(token.len(), 2 * SYNTHETIC_TOKEN_LEN);
        assert!(token
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
    }

    #[test]
    fn test_attempt_order() {
        let order: Vec<_> = LINK_ATTEMPTS.iter().map(|a| (a.role, a.key)).collect();
        assert_eq!(
            order,
            vec![
                (PartyRole::Mentee, IdentityKey::Id),
                (PartyRole::Mentee, IdentityKey::Email),
                (PartyRole::Mentor, IdentityKey::Id),
                (PartyRole::Mentor, IdentityKey::Email),
            ]
        );
    }

    #[tokio::test]
    async fn test_mentee_calendar_used_first() {
        let store = MemoryStore::new();
        for (id, token) in [("mentee-1", "mentee-token"), ("mentor-1", "mentor-token")] {
            store
                .set_party(
                    id,
                    &PartyRecord {
                        google_oauth: Some(grant(token, false)),
                        ..Default::default()
                    },
                )
                .await
                .unwrap();
        }
        let calendar = Arc::new(RecordingCalendar::default());
        let link = orchestrator(store, calendar.clone())
            .obtain_meeting_link(&meeting())
            .await;

        assert_eq!(link.url, "https://meet.google.com/mentee-token");
        assert_eq!(link.event_id.as_deref(), Some("evt-1"));
        assert_eq!(
            link.source,
            LinkSource::Calendar(LINK_ATTEMPTS[0])
        );

        let inserts = calendar.inserts.lock().unwrap();
        assert_eq!(inserts.len(), 1);
        let event = &inserts[0].1;
        assert_eq!(event.summary, "Mentorship Session: Ada & Grace");
        assert_eq!(event.attendees, vec!["ada@example.com", "grace@example.com"]);
        assert!(event.conference_request_id.is_some());
        assert_eq!(event.end - event.start, Duration::hours(1));
    }

    #[tokio::test]
    async fn test_falls_through_to_mentor_email() {
        let store = MemoryStore::new();
        // Mentee grant expired and refresh fails; mentor only known by email.
        store
            .set_party(
                "mentee-1",
                &PartyRecord {
                    email: Some("ada@example.com".into()),
                    google_oauth: Some(grant("mentee-token", true)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        store
            .set_party(
                "mentor-record",
                &PartyRecord {
                    email: Some("grace@example.com".into()),
                    google_oauth: Some(grant("mentor-token", false)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let calendar = Arc::new(RecordingCalendar::default());
        let link = orchestrator(store, calendar.clone())
            .obtain_meeting_link(&meeting())
            .await;

        assert_eq!(link.url, "https://meet.google.com/mentor-token");
        assert_eq!(link.source, LinkSource::Calendar(LINK_ATTEMPTS[3]));
        assert_eq!(calendar.inserts.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_all_attempts_failing_yields_synthetic_link() {
        let store = MemoryStore::new();
        store
            .set_party(
                "mentor-1",
                &PartyRecord {
                    google_oauth: Some(grant("broken", false)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let calendar = Arc::new(RecordingCalendar {
            failing_tokens: vec!["broken".into()],
            ..Default::default()
        });

        let orchestrator = orchestrator(store, calendar.clone());
        let url = orchestrator.generate_meeting_link(&meeting()).await;

        assert_synthetic(&url);
        assert!(calendar.inserts.lock().unwrap().is_empty());
        assert_ne!(url, orchestrator.synthetic_link());
    }

    #[tokio::test]
    async fn test_event_without_link_is_not_duplicated() {
        let store = MemoryStore::new();
        for id in ["mentee-1", "mentor-1"] {
            store
                .set_party(
                    id,
                    &PartyRecord {
                        google_oauth: Some(grant(id, false)),
                        ..Default::default()
                    },
                )
                .await
                .unwrap();
        }
        let calendar = Arc::new(RecordingCalendar {
            omit_link: true,
            ..Default::default()
        });

        let link = orchestrator(store, calendar.clone())
            .obtain_meeting_link(&meeting())
            .await;

        assert_synthetic(&link.url);
        assert_eq!(link.event_id.as_deref(), Some("evt-1"));
        assert_eq!(calendar.inserts.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_create_event_propagates_errors() {
        let orchestrator = orchestrator(
            MemoryStore::new(),
            Arc::new(RecordingCalendar::default()),
        );
        let err = orchestrator
            .create_event("mentee-1", &meeting(), true)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
