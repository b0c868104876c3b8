// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Google OAuth and Calendar API clients.
//!
//! Handles:
//! - Access token refresh (the refresh token itself is never rotated here)
//! - Calendar event insertion with an optional Meet conference request

use crate::error::AppError;
use crate::models::OAuthCredential;
use crate::time_utils::format_utc_rfc3339;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const CALENDAR_BASE_URL: &str = "https://www.googleapis.com/calendar/v3";

/// New access token issued by a refresh.
#[derive(Debug, Clone, PartialEq)]
pub struct RefreshedToken {
    pub access_token: String,
    pub expiry_date: DateTime<Utc>,
}

/// Exchanges refresh tokens for access tokens.
#[async_trait]
pub trait OAuthProvider: Send + Sync {
    async fn refresh_access_token(&self, refresh_token: &str) -> Result<RefreshedToken, AppError>;
}

/// Calendar event to create on a party's primary calendar.
#[derive(Debug, Clone, PartialEq)]
pub struct EventRequest {
    pub summary: String,
    pub description: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// IANA zone name shown on the event
    pub time_zone: String,
    pub attendees: Vec<String>,
    /// Idempotency token for a generated conference link; `None` skips the link
    pub conference_request_id: Option<String>,
}

/// Result of a successful insert.
#[derive(Debug, Clone, PartialEq)]
pub struct CreatedEvent {
    pub event_id: String,
    pub meet_link: Option<String>,
}

/// Inserts events into a party's calendar.
#[async_trait]
pub trait CalendarProvider: Send + Sync {
    async fn insert_event(
        &self,
        credential: &OAuthCredential,
        event: &EventRequest,
    ) -> Result<CreatedEvent, AppError>;
}

// ─────────────────────────────────────────────────────────────────────────────
// OAuth
// ─────────────────────────────────────────────────────────────────────────────

/// Google OAuth token endpoint client.
#[derive(Clone)]
pub struct GoogleOAuthClient {
    http: reqwest::Client,
    token_url: String,
    client_id: String,
    client_secret: String,
}

impl GoogleOAuthClient {
    pub fn new(client_id: String, client_secret: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            token_url: TOKEN_URL.to_string(),
            client_id,
            client_secret,
        }
    }
}

/// Token refresh response from Google.
#[derive(Debug, Clone, Deserialize)]
struct TokenRefreshResponse {
    access_token: String,
    expires_in: i64,
}

#[async_trait]
impl OAuthProvider for GoogleOAuthClient {
    async fn refresh_access_token(&self, refresh_token: &str) -> Result<RefreshedToken, AppError> {
        let response = self
            .http
            .post(&self.token_url)
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await
            .map_err(|e| AppError::Refresh(format!("Token refresh request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = %status, "Google token refresh rejected");
            return Err(AppError::Refresh(format!("HTTP {}: {}", status, body)));
        }

        let token: TokenRefreshResponse = response
            .json()
            .await
            .map_err(|e| AppError::Refresh(format!("Failed to parse token response: {}", e)))?;

        Ok(RefreshedToken {
            access_token: token.access_token,
            expiry_date: Utc::now() + Duration::seconds(token.expires_in),
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Calendar
// ─────────────────────────────────────────────────────────────────────────────

/// Google Calendar v3 client.
#[derive(Clone)]
pub struct GoogleCalendarClient {
    http: reqwest::Client,
    base_url: String,
    calendar_id: String,
}

impl Default for GoogleCalendarClient {
    fn default() -> Self {
        Self::new()
    }
}

impl GoogleCalendarClient {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: CALENDAR_BASE_URL.to_string(),
            calendar_id: "primary".to_string(),
        }
    }

    fn events_url(&self) -> String {
        format!(
            "{}/calendars/{}/events",
            self.base_url,
            urlencoding::encode(&self.calendar_id)
        )
    }

    /// Check response and parse JSON body.
    async fn check_response_json<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, AppError> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();

            if status.as_u16() == 401 {
                return Err(AppError::CalendarApi(
                    "Calendar rejected access token (401)".to_string(),
                ));
            }

            return Err(AppError::CalendarApi(format!("HTTP {}: {}", status, body)));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::CalendarApi(format!("JSON parse error: {}", e)))
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GoogleEventBody {
    summary: String,
    description: String,
    start: GoogleEventTime,
    end: GoogleEventTime,
    attendees: Vec<GoogleAttendee>,
    #[serde(skip_serializing_if = "Option::is_none")]
    conference_data: Option<GoogleConferenceData>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GoogleEventTime {
    date_time: String,
    time_zone: String,
}

#[derive(Debug, Serialize)]
struct GoogleAttendee {
    email: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GoogleConferenceData {
    create_request: GoogleCreateConferenceRequest,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GoogleCreateConferenceRequest {
    request_id: String,
    conference_solution_key: GoogleConferenceSolutionKey,
}

#[derive(Debug, Serialize)]
struct GoogleConferenceSolutionKey {
    #[serde(rename = "type")]
    kind: String,
}

impl From<&EventRequest> for GoogleEventBody {
    fn from(event: &EventRequest) -> Self {
        let time = |at: DateTime<Utc>| GoogleEventTime {
            date_time: format_utc_rfc3339(at),
            time_zone: event.time_zone.clone(),
        };

        Self {
            summary: event.summary.clone(),
            description: event.description.clone(),
            start: time(event.start),
            end: time(event.end),
            attendees: event
                .attendees
                .iter()
                .filter(|email| !email.is_empty())
                .map(|email| GoogleAttendee {
                    email: email.clone(),
                })
                .collect(),
            conference_data: event.conference_request_id.as_ref().map(|request_id| {
                GoogleConferenceData {
                    create_request: GoogleCreateConferenceRequest {
                        request_id: request_id.clone(),
                        conference_solution_key: GoogleConferenceSolutionKey {
                            kind: "hangoutsMeet".to_string(),
                        },
                    },
                }
            }),
        }
    }
}

/// Event insert response (only the fields we use).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleEventResponse {
    id: String,
    hangout_link: Option<String>,
    conference_data: Option<GoogleConferenceInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleConferenceInfo {
    #[serde(default)]
    entry_points: Vec<GoogleEntryPoint>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleEntryPoint {
    entry_point_type: String,
    uri: String,
}

impl GoogleEventResponse {
    /// Meet link, preferring `hangoutLink` over the video entry point.
    fn meet_link(&self) -> Option<String> {
        self.hangout_link.clone().or_else(|| {
            self.conference_data.as_ref().and_then(|data| {
                data.entry_points
                    .iter()
                    .find(|ep| ep.entry_point_type == "video")
                    .map(|ep| ep.uri.clone())
            })
        })
    }
}

#[async_trait]
impl CalendarProvider for GoogleCalendarClient {
    async fn insert_event(
        &self,
        credential: &OAuthCredential,
        event: &EventRequest,
    ) -> Result<CreatedEvent, AppError> {
        let body = GoogleEventBody::from(event);
        let conference_version = if event.conference_request_id.is_some() {
            "1"
        } else {
            "0"
        };

        let response = self
            .http
            .post(self.events_url())
            .bearer_auth(&credential.access_token)
            .query(&[
                ("conferenceDataVersion", conference_version),
                ("sendUpdates", "all"),
            ])
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::CalendarApi(e.to_string()))?;

        let created: GoogleEventResponse = self.check_response_json(response).await?;
        let meet_link = created.meet_link();

        tracing::info!(
            event_id = %created.id,
            has_link = meet_link.is_some(),
            "Calendar event created"
        );

        Ok(CreatedEvent {
            event_id: created.id,
            meet_link,
        })
    }
}
