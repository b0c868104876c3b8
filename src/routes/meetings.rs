// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Meeting API routes.
//!
//! Each handler wraps one service operation and answers with
//! `{ "success": true, ... }`; failures go through [`AppError`]'s response.

use crate::error::{AppError, Result};
use crate::models::{Meeting, MeetingStatus, PartyRole};
use crate::services::{ApprovalOutcome, NewMeeting};
use crate::AppState;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/meetings", post(create_meeting))
        .route("/api/meetings/move-expired", post(move_expired))
        .route("/api/meetings/mentee/{id}", get(list_pending))
        .route("/api/meetings/mentee/{id}/past", get(list_past))
        .route("/api/meetings/confirmed/{id}", get(list_confirmed))
        .route("/api/meetings/{id}/accept", post(accept))
        .route("/api/meetings/{id}/mentor-approve", post(mentor_approve))
        .route("/api/meetings/{id}/propose", post(propose))
}

/// Unwrap a JSON body, reporting malformed input as a 400 in our envelope.
fn json_body<T>(body: std::result::Result<Json<T>, JsonRejection>) -> Result<T> {
    body.map(|Json(value)| value)
        .map_err(|rejection| AppError::BadRequest(rejection.body_text()))
}

// ─── Listings ────────────────────────────────────────────────

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct MeetingsResponse {
    pub success: bool,
    pub meetings: Vec<Meeting>,
}

impl From<Vec<Meeting>> for MeetingsResponse {
    fn from(meetings: Vec<Meeting>) -> Self {
        Self {
            success: true,
            meetings,
        }
    }
}

async fn list_pending(
    State(state): State<Arc<AppState>>,
    Path(mentee_id): Path<String>,
) -> Result<Json<MeetingsResponse>> {
    let meetings = state.meetings.list_pending_for_mentee(&mentee_id).await?;
    Ok(Json(meetings.into()))
}

async fn list_confirmed(
    State(state): State<Arc<AppState>>,
    Path(party_id): Path<String>,
) -> Result<Json<MeetingsResponse>> {
    let meetings = state.meetings.list_confirmed_for_party(&party_id).await?;
    Ok(Json(meetings.into()))
}

async fn list_past(
    State(state): State<Arc<AppState>>,
    Path(mentee_id): Path<String>,
) -> Result<Json<MeetingsResponse>> {
    let meetings = state.meetings.list_past_for_mentee(&mentee_id).await?;
    Ok(Json(meetings.into()))
}

// ─── Creation ────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct CreateMeetingResponse {
    pub success: bool,
    pub meeting_id: String,
}

async fn create_meeting(
    State(state): State<Arc<AppState>>,
    body: std::result::Result<Json<NewMeeting>, JsonRejection>,
) -> Result<Json<CreateMeetingResponse>> {
    let request = json_body(body)?;
    let meeting_id = state.meetings.create(request).await?;
    Ok(Json(CreateMeetingResponse {
        success: true,
        meeting_id,
    }))
}

// ─── Approval ────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ApprovalResponse {
    pub success: bool,
    pub status: MeetingStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meet_link: Option<String>,
}

impl From<ApprovalOutcome> for ApprovalResponse {
    fn from(outcome: ApprovalOutcome) -> Self {
        match outcome {
            ApprovalOutcome::StillPending => Self {
                success: true,
                status: MeetingStatus::Pending,
                meet_link: None,
            },
            ApprovalOutcome::Confirmed { meet_link } => Self {
                success: true,
                status: MeetingStatus::Confirmed,
                meet_link: Some(meet_link),
            },
        }
    }
}

/// Mentee approval.
async fn accept(
    State(state): State<Arc<AppState>>,
    Path(meeting_id): Path<String>,
) -> Result<Json<ApprovalResponse>> {
    let outcome = state.meetings.approve(&meeting_id, PartyRole::Mentee).await?;
    Ok(Json(outcome.into()))
}

async fn mentor_approve(
    State(state): State<Arc<AppState>>,
    Path(meeting_id): Path<String>,
) -> Result<Json<ApprovalResponse>> {
    let outcome = state.meetings.approve(&meeting_id, PartyRole::Mentor).await?;
    Ok(Json(outcome.into()))
}

// ─── Rescheduling ────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposeRequest {
    #[serde(default)]
    pub meeting_date: String,
    #[serde(default)]
    pub meeting_time: String,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

async fn propose(
    State(state): State<Arc<AppState>>,
    Path(meeting_id): Path<String>,
    body: std::result::Result<Json<ProposeRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>> {
    let request = json_body(body)?;
    state
        .meetings
        .propose(&meeting_id, &request.meeting_date, &request.meeting_time)
        .await?;
    Ok(Json(MessageResponse {
        success: true,
        message: "New time proposed; awaiting mentor approval".to_string(),
    }))
}

// ─── Sweep ───────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct MoveExpiredResponse {
    pub success: bool,
    pub moved_count: usize,
}

async fn move_expired(State(state): State<Arc<AppState>>) -> Result<Json<MoveExpiredResponse>> {
    let report = state.sweeper.sweep().await?;
    Ok(Json(MoveExpiredResponse {
        success: true,
        moved_count: report.moved_count,
    }))
}
