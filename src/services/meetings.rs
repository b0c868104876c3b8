// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Meeting approval lifecycle.
//!
//! A meeting stays in the pending partition until both parties approve, at
//! which point it is finalized: a link is obtained, the record is written to
//! the confirmed partition and removed from pending.
//!
//! Finalization is not guarded against two approvals racing each other;
//! the store's per-document writes keep both flags, but two concurrent
//! approvals may each observe the other's flag and finalize twice.
//! TODO: move the flag update and finalize trigger into a Firestore
//! transaction so exactly one caller finalizes.

use crate::db::{MeetingField, MeetingStore};
use crate::error::AppError;
use crate::models::{Meeting, MeetingPatch, MeetingStatus, Partition, PartyRole};
use crate::services::calendar::CalendarOrchestrator;
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

/// Request body for creating a meeting.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewMeeting {
    #[validate(length(min = 1, message = "menteeId is required"))]
    pub mentee_id: String,
    #[validate(length(min = 1, message = "mentorId is required"))]
    pub mentor_id: String,
    #[serde(default)]
    #[validate(email(message = "menteeEmail must be an email address"))]
    pub mentee_email: Option<String>,
    #[serde(default)]
    #[validate(email(message = "mentorEmail must be an email address"))]
    pub mentor_email: Option<String>,
    #[serde(default)]
    pub mentee_name: Option<String>,
    #[serde(default)]
    pub mentor_name: Option<String>,
    #[validate(length(min = 1, message = "meetingDate is required"))]
    pub meeting_date: String,
    #[validate(length(min = 1, message = "meetingTime is required"))]
    pub meeting_time: String,
}

/// What an approval led to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApprovalOutcome {
    /// The other party has not approved yet.
    StillPending,
    /// Both approved; the meeting moved to the confirmed partition.
    Confirmed { meet_link: String },
}

/// Flatten validator errors into one message.
pub fn validation_message(errors: &validator::ValidationErrors) -> String {
    let mut messages: Vec<String> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| {
                e.message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("{} is invalid", field))
            })
        })
        .collect();
    messages.sort();
    messages.join("; ")
}

/// Approval state machine over the meeting partitions.
#[derive(Clone)]
pub struct MeetingService {
    store: Arc<dyn MeetingStore>,
    calendar: CalendarOrchestrator,
}

impl MeetingService {
    pub fn new(store: Arc<dyn MeetingStore>, calendar: CalendarOrchestrator) -> Self {
        Self { store, calendar }
    }

    /// Add a new pending meeting with no approvals.
    pub async fn create(&self, request: NewMeeting) -> Result<String, AppError> {
        request
            .validate()
            .map_err(|e| AppError::BadRequest(validation_message(&e)))?;

        let now = Utc::now();
        let meeting = Meeting {
            id: None,
            mentee_id: request.mentee_id.trim().to_string(),
            mentor_id: request.mentor_id.trim().to_string(),
            mentee_email: request.mentee_email.unwrap_or_default(),
            mentor_email: request.mentor_email.unwrap_or_default(),
            mentee_name: request.mentee_name,
            mentor_name: request.mentor_name,
            meeting_date: request.meeting_date.trim().to_string(),
            meeting_time: request.meeting_time.trim().to_string(),
            mentee_approved: false,
            mentor_approved: false,
            status: MeetingStatus::Pending,
            meet_link: None,
            calendar_event_id: None,
            created_at: Some(now),
            updated_at: Some(now),
            confirmed_at: None,
            completed_at: None,
        };

        let id = self.store.add_meeting(Partition::Pending, &meeting).await?;
        tracing::info!(meeting_id = %id, mentee_id = %meeting.mentee_id, mentor_id = %meeting.mentor_id, "Meeting created");
        Ok(id)
    }

    /// Read a meeting from the pending partition, rejecting anything whose
    /// recorded status cannot move to `next`.
    async fn load_pending(&self, meeting_id: &str, next: MeetingStatus) -> Result<Meeting, AppError> {
        let meeting = self
            .store
            .get_meeting(Partition::Pending, meeting_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Meeting {}", meeting_id)))?;

        if !meeting.status.can_transition_to(next) {
            return Err(AppError::InvalidTransition {
                from: meeting.status,
                to: next,
            });
        }
        Ok(meeting)
    }

    /// Record `role`'s approval; finalize if the other party already approved.
    pub async fn approve(
        &self,
        meeting_id: &str,
        role: PartyRole,
    ) -> Result<ApprovalOutcome, AppError> {
        let mut meeting = self.load_pending(meeting_id, MeetingStatus::Pending).await?;

        let patch = MeetingPatch::approval(role, Utc::now());
        self.store
            .update_meeting(Partition::Pending, meeting_id, &patch)
            .await?;
        patch.apply_to(&mut meeting);

        tracing::info!(meeting_id, party = ?role, "Approval recorded");

        if !meeting.is_approved_by(role.other()) {
            return Ok(ApprovalOutcome::StillPending);
        }

        let confirmed = self.finalize(meeting, meeting_id).await?;
        Ok(ApprovalOutcome::Confirmed {
            meet_link: confirmed.meet_link.unwrap_or_default(),
        })
    }

    /// Reschedule: the proposer (mentee) approves, the mentor must re-approve.
    pub async fn propose(
        &self,
        meeting_id: &str,
        new_date: &str,
        new_time: &str,
    ) -> Result<(), AppError> {
        let (new_date, new_time) = (new_date.trim(), new_time.trim());
        if new_date.is_empty() || new_time.is_empty() {
            return Err(AppError::BadRequest(
                "meetingDate and meetingTime are required".to_string(),
            ));
        }

        self.load_pending(meeting_id, MeetingStatus::Pending).await?;

        let patch = MeetingPatch {
            meeting_date: Some(new_date.to_string()),
            meeting_time: Some(new_time.to_string()),
            mentee_approved: Some(true),
            mentor_approved: Some(false),
            status: Some(MeetingStatus::Pending),
            updated_at: Some(Utc::now()),
        };
        self.store
            .update_meeting(Partition::Pending, meeting_id, &patch)
            .await?;

        tracing::info!(meeting_id, date = new_date, time = new_time, "New schedule proposed");
        Ok(())
    }

    /// Move a fully approved meeting from pending to confirmed.
    ///
    /// Callers invoke this once, right after setting the second approval.
    pub async fn finalize(&self, meeting: Meeting, meeting_id: &str) -> Result<Meeting, AppError> {
        if !meeting.status.can_transition_to(MeetingStatus::Confirmed) {
            return Err(AppError::InvalidTransition {
                from: meeting.status,
                to: MeetingStatus::Confirmed,
            });
        }
        if !meeting.both_approved() {
            return Err(AppError::BadRequest(format!(
                "Meeting {} is not approved by both parties",
                meeting_id
            )));
        }

        let link = self.calendar.obtain_meeting_link(&meeting).await;

        let now = Utc::now();
        let confirmed = Meeting {
            id: Some(meeting_id.to_string()),
            status: MeetingStatus::Confirmed,
            meet_link: Some(link.url),
            calendar_event_id: link.event_id,
            confirmed_at: Some(now),
            updated_at: Some(now),
            ..meeting
        };

        self.store
            .set_meeting(confirmed.status.partition(), meeting_id, &confirmed)
            .await?;
        self.store
            .delete_meeting(Partition::Pending, meeting_id)
            .await?;

        tracing::info!(
            meeting_id,
            link_source = ?link.source,
            "Meeting confirmed"
        );
        Ok(confirmed)
    }

    /// Pending meetings for a mentee, newest first.
    pub async fn list_pending_for_mentee(&self, mentee_id: &str) -> Result<Vec<Meeting>, AppError> {
        let meetings = self
            .store
            .query_meetings(Partition::Pending, MeetingField::MenteeId, mentee_id)
            .await?;
        Ok(newest_first(meetings))
    }

    /// Confirmed meetings where the party is mentee or mentor.
    pub async fn list_confirmed_for_party(
        &self,
        party_id: &str,
    ) -> Result<Vec<Meeting>, AppError> {
        let mut meetings = self
            .store
            .query_meetings(Partition::Confirmed, MeetingField::MenteeId, party_id)
            .await?;
        let as_mentor = self
            .store
            .query_meetings(Partition::Confirmed, MeetingField::MentorId, party_id)
            .await?;

        for meeting in as_mentor {
            if !meetings.iter().any(|m| m.id.is_some() && m.id == meeting.id) {
                meetings.push(meeting);
            }
        }
        Ok(newest_first(meetings))
    }

    /// Completed meetings for a mentee, newest first.
    pub async fn list_past_for_mentee(&self, mentee_id: &str) -> Result<Vec<Meeting>, AppError> {
        let meetings = self
            .store
            .query_meetings(Partition::Done, MeetingField::MenteeId, mentee_id)
            .await?;
        Ok(newest_first(meetings))
    }
}

fn newest_first(mut meetings: Vec<Meeting>) -> Vec<Meeting> {
    meetings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    meetings
}
