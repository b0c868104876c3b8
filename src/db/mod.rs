//! Database layer (Firestore, plus an in-memory backend).
//!
//! Services only see the [`MeetingStore`] and [`PartyDirectory`] traits, so
//! the backend is chosen once at startup.

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::MemoryStore;

use crate::error::AppError;
use crate::models::{Meeting, MeetingPatch, Partition, PartyRecord};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Collection names as constants.
pub mod collections {
    pub const PENDING_MEETINGS: &str = "pendingMeetings";
    pub const CONFIRMED_MEETINGS: &str = "confirmedMeeting";
    pub const DONE_MEETINGS: &str = "endMeeting";
    /// Party directory holding `googleOAuth` grants
    pub const PARTIES: &str = "mentees";
}

/// Meeting fields that can be queried by equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeetingField {
    MenteeId,
    MentorId,
}

impl MeetingField {
    pub fn as_str(self) -> &'static str {
        match self {
            MeetingField::MenteeId => "menteeId",
            MeetingField::MentorId => "mentorId",
        }
    }

    pub fn value_of(self, meeting: &Meeting) -> &str {
        match self {
            MeetingField::MenteeId => &meeting.mentee_id,
            MeetingField::MentorId => &meeting.mentor_id,
        }
    }
}

/// Document operations on the three meeting partitions.
///
/// Returned meetings always carry their document id in `Meeting::id`.
#[async_trait]
pub trait MeetingStore: Send + Sync {
    async fn get_meeting(&self, partition: Partition, id: &str)
        -> Result<Option<Meeting>, AppError>;

    async fn meeting_exists(&self, partition: Partition, id: &str) -> Result<bool, AppError> {
        Ok(self.get_meeting(partition, id).await?.is_some())
    }

    async fn query_meetings(
        &self,
        partition: Partition,
        field: MeetingField,
        value: &str,
    ) -> Result<Vec<Meeting>, AppError>;

    async fn list_meetings(&self, partition: Partition) -> Result<Vec<Meeting>, AppError>;

    /// Create or overwrite the document at `id`.
    async fn set_meeting(
        &self,
        partition: Partition,
        id: &str,
        meeting: &Meeting,
    ) -> Result<(), AppError>;

    /// Merge the patch's fields into an existing document.
    async fn update_meeting(
        &self,
        partition: Partition,
        id: &str,
        patch: &MeetingPatch,
    ) -> Result<(), AppError>;

    async fn delete_meeting(&self, partition: Partition, id: &str) -> Result<(), AppError>;

    /// Insert with a store-generated id, returning it.
    async fn add_meeting(&self, partition: Partition, meeting: &Meeting)
        -> Result<String, AppError>;
}

/// Party lookups and OAuth grant updates.
#[async_trait]
pub trait PartyDirectory: Send + Sync {
    async fn get_party(&self, id: &str) -> Result<Option<PartyRecord>, AppError>;

    /// Indexed equality query on `email`.
    async fn find_parties_by_email(&self, email: &str) -> Result<Vec<PartyRecord>, AppError>;

    async fn list_parties(&self) -> Result<Vec<PartyRecord>, AppError>;

    /// Persist a refreshed access token. The refresh token is never rewritten.
    async fn update_access_token(
        &self,
        party_id: &str,
        access_token: &str,
        expiry_date: DateTime<Utc>,
    ) -> Result<(), AppError>;

    async fn set_party(&self, id: &str, party: &PartyRecord) -> Result<(), AppError>;
}
