// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Meeting model and its lifecycle states.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Lifecycle state of a meeting.
///
/// Each state lives in its own storage partition; see [`Partition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum MeetingStatus {
    #[default]
    Pending,
    Confirmed,
    Done,
}

impl MeetingStatus {
    /// Whether `self -> next` is a legal lifecycle step.
    pub fn can_transition_to(self, next: MeetingStatus) -> bool {
        matches!(
            (self, next),
            (MeetingStatus::Pending, MeetingStatus::Pending)
                | (MeetingStatus::Pending, MeetingStatus::Confirmed)
                | (MeetingStatus::Confirmed, MeetingStatus::Done)
        )
    }

    /// Storage partition holding records in this state.
    pub fn partition(self) -> Partition {
        match self {
            MeetingStatus::Pending => Partition::Pending,
            MeetingStatus::Confirmed => Partition::Confirmed,
            MeetingStatus::Done => Partition::Done,
        }
    }
}

impl fmt::Display for MeetingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MeetingStatus::Pending => "pending",
            MeetingStatus::Confirmed => "confirmed",
            MeetingStatus::Done => "done",
        };
        f.write_str(s)
    }
}

/// Logical storage partition. A meeting is in exactly one at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Partition {
    Pending,
    Confirmed,
    Done,
}

impl Partition {
    /// Firestore collection backing this partition.
    pub fn collection(self) -> &'static str {
        match self {
            Partition::Pending => crate::db::collections::PENDING_MEETINGS,
            Partition::Confirmed => crate::db::collections::CONFIRMED_MEETINGS,
            Partition::Done => crate::db::collections::DONE_MEETINGS,
        }
    }
}

/// Which side of the mentoring pair an action belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartyRole {
    Mentee,
    Mentor,
}

impl PartyRole {
    pub fn other(self) -> PartyRole {
        match self {
            PartyRole::Mentee => PartyRole::Mentor,
            PartyRole::Mentor => PartyRole::Mentee,
        }
    }
}

/// One scheduling negotiation between a mentee and a mentor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Meeting {
    /// Document ID (assigned by the store)
    #[serde(
        default,
        alias = "_firestore_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,
    pub mentee_id: String,
    pub mentor_id: String,
    #[serde(default)]
    pub mentee_email: String,
    #[serde(default)]
    pub mentor_email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mentee_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mentor_name: Option<String>,
    /// Free-form date ("2025-09-02", "Sep 02", "September 2, 2025", ...)
    pub meeting_date: String,
    /// "1:00 PM" or "1:00 PM - 2:00 PM"
    pub meeting_time: String,
    #[serde(default)]
    pub mentee_approved: bool,
    #[serde(default)]
    pub mentor_approved: bool,
    #[serde(default)]
    pub status: MeetingStatus,
    #[serde(default)]
    pub meet_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calendar_event_id: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Meeting {
    pub fn is_approved_by(&self, role: PartyRole) -> bool {
        match role {
            PartyRole::Mentee => self.mentee_approved,
            PartyRole::Mentor => self.mentor_approved,
        }
    }

    pub fn both_approved(&self) -> bool {
        self.mentee_approved && self.mentor_approved
    }

    /// Identity keys for a party, id first, email second.
    pub fn identities(&self, role: PartyRole) -> (&str, &str) {
        match role {
            PartyRole::Mentee => (&self.mentee_id, &self.mentee_email),
            PartyRole::Mentor => (&self.mentor_id, &self.mentor_email),
        }
    }

    /// Display name for a party, falling back to email, then id.
    pub fn display_name(&self, role: PartyRole) -> &str {
        let (id, email) = self.identities(role);
        let name = match role {
            PartyRole::Mentee => self.mentee_name.as_deref(),
            PartyRole::Mentor => self.mentor_name.as_deref(),
        };
        name.filter(|n| !n.trim().is_empty())
            .or_else(|| (!email.is_empty()).then_some(email))
            .unwrap_or(id)
    }

    /// A confirmed record must carry both approvals and a link.
    pub fn satisfies_confirmed_invariant(&self) -> bool {
        self.both_approved() && self.meet_link.as_deref().is_some_and(|l| !l.is_empty())
    }
}

/// Partial field update for a stored meeting.
///
/// Only fields set to `Some` are written; everything else on the stored
/// document is left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeetingPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meeting_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meeting_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mentee_approved: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mentor_approved: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<MeetingStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl MeetingPatch {
    /// Patch setting one party's approval flag.
    pub fn approval(role: PartyRole, now: DateTime<Utc>) -> Self {
        let mut patch = Self {
            updated_at: Some(now),
            ..Default::default()
        };
        match role {
            PartyRole::Mentee => patch.mentee_approved = Some(true),
            PartyRole::Mentor => patch.mentor_approved = Some(true),
        }
        patch
    }

    /// Stored field names written by this patch (Firestore update mask).
    pub fn field_paths(&self) -> Vec<String> {
        [
            ("meetingDate", self.meeting_date.is_some()),
            ("meetingTime", self.meeting_time.is_some()),
            ("menteeApproved", self.mentee_approved.is_some()),
            ("mentorApproved", self.mentor_approved.is_some()),
            ("status", self.status.is_some()),
            ("updatedAt", self.updated_at.is_some()),
        ]
        .into_iter()
        .filter(|(_, set)| *set)
        .map(|(name, _)| name.to_string())
        .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.field_paths().is_empty()
    }

    /// Apply the patch to an in-memory copy.
    pub fn apply_to(&self, meeting: &mut Meeting) {
        if let Some(date) = &self.meeting_date {
            meeting.meeting_date = date.clone();
        }
        if let Some(time) = &self.meeting_time {
            meeting.meeting_time = time.clone();
        }
        if let Some(v) = self.mentee_approved {
            meeting.mentee_approved = v;
        }
        if let Some(v) = self.mentor_approved {
            meeting.mentor_approved = v;
        }
        if let Some(status) = self.status {
            meeting.status = status;
        }
        if let Some(at) = self.updated_at {
            meeting.updated_at = Some(at);
        }
    }
}
