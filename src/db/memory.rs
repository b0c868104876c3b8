//! In-memory store backed by `DashMap`.
//!
//! Used by the test suite and by `STORE_BACKEND=memory` for local runs.
//! Per-document updates are atomic, matching Firestore's single-document
//! write semantics.

use crate::db::{MeetingField, MeetingStore, PartyDirectory};
use crate::error::AppError;
use crate::models::{Meeting, MeetingPatch, Partition, PartyRecord};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Default)]
struct Inner {
    pending: DashMap<String, Meeting>,
    confirmed: DashMap<String, Meeting>,
    done: DashMap<String, Meeting>,
    parties: DashMap<String, PartyRecord>,
    /// When set, `find_parties_by_email` fails as if the index were missing.
    email_index_disabled: AtomicBool,
}

/// Cloneable handle to a shared in-memory database.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn partition(&self, partition: Partition) -> &DashMap<String, Meeting> {
        match partition {
            Partition::Pending => &self.inner.pending,
            Partition::Confirmed => &self.inner.confirmed,
            Partition::Done => &self.inner.done,
        }
    }

    /// Number of documents in a partition.
    pub fn count(&self, partition: Partition) -> usize {
        self.partition(partition).len()
    }

    /// Make the email index unavailable (exercises the full-scan lookup).
    pub fn disable_email_index(&self) {
        self.inner.email_index_disabled.store(true, Ordering::SeqCst);
    }
}

fn with_id(meeting: &Meeting, id: &str) -> Meeting {
    let mut meeting = meeting.clone();
    meeting.id = Some(id.to_string());
    meeting
}

#[async_trait]
impl MeetingStore for MemoryStore {
    async fn get_meeting(
        &self,
        partition: Partition,
        id: &str,
    ) -> Result<Option<Meeting>, AppError> {
        Ok(self
            .partition(partition)
            .get(id)
            .map(|entry| with_id(entry.value(), id)))
    }

    async fn query_meetings(
        &self,
        partition: Partition,
        field: MeetingField,
        value: &str,
    ) -> Result<Vec<Meeting>, AppError> {
        Ok(self
            .partition(partition)
            .iter()
            .filter(|entry| field.value_of(entry.value()) == value)
            .map(|entry| with_id(entry.value(), entry.key()))
            .collect())
    }

    async fn list_meetings(&self, partition: Partition) -> Result<Vec<Meeting>, AppError> {
        Ok(self
            .partition(partition)
            .iter()
            .map(|entry| with_id(entry.value(), entry.key()))
            .collect())
    }

    async fn set_meeting(
        &self,
        partition: Partition,
        id: &str,
        meeting: &Meeting,
    ) -> Result<(), AppError> {
        self.partition(partition)
            .insert(id.to_string(), with_id(meeting, id));
        Ok(())
    }

    async fn update_meeting(
        &self,
        partition: Partition,
        id: &str,
        patch: &MeetingPatch,
    ) -> Result<(), AppError> {
        let mut entry = self
            .partition(partition)
            .get_mut(id)
            .ok_or_else(|| AppError::NotFound(format!("Meeting {}", id)))?;
        patch.apply_to(entry.value_mut());
        Ok(())
    }

    async fn delete_meeting(&self, partition: Partition, id: &str) -> Result<(), AppError> {
        self.partition(partition).remove(id);
        Ok(())
    }

    async fn add_meeting(
        &self,
        partition: Partition,
        meeting: &Meeting,
    ) -> Result<String, AppError> {
        let id = uuid::Uuid::new_v4().simple().to_string();
        self.partition(partition)
            .insert(id.clone(), with_id(meeting, &id));
        Ok(id)
    }
}

#[async_trait]
impl PartyDirectory for MemoryStore {
    async fn get_party(&self, id: &str) -> Result<Option<PartyRecord>, AppError> {
        Ok(self.inner.parties.get(id).map(|entry| entry.value().clone()))
    }

    async fn find_parties_by_email(&self, email: &str) -> Result<Vec<PartyRecord>, AppError> {
        if self.inner.email_index_disabled.load(Ordering::SeqCst) {
            return Err(AppError::Database(
                "email index unavailable".to_string(),
            ));
        }
        Ok(self
            .inner
            .parties
            .iter()
            .filter(|entry| entry.value().email.as_deref() == Some(email))
            .map(|entry| entry.value().clone())
            .collect())
    }

    async fn list_parties(&self) -> Result<Vec<PartyRecord>, AppError> {
        Ok(self
            .inner
            .parties
            .iter()
            .map(|entry| entry.value().clone())
            .collect())
    }

    async fn update_access_token(
        &self,
        party_id: &str,
        access_token: &str,
        expiry_date: DateTime<Utc>,
    ) -> Result<(), AppError> {
        let mut entry = self
            .inner
            .parties
            .get_mut(party_id)
            .ok_or_else(|| AppError::NotFound(format!("Party {}", party_id)))?;

        let party = entry.value_mut();
        let credential = party.google_oauth.take().ok_or_else(|| {
            AppError::CredentialMissing(party_id.to_string())
        })?;
        party.google_oauth = Some(credential.with_access_token(access_token, expiry_date));
        Ok(())
    }

    async fn set_party(&self, id: &str, party: &PartyRecord) -> Result<(), AppError> {
        let mut party = party.clone();
        party.id = Some(id.to_string());
        self.inner.parties.insert(id.to_string(), party);
        Ok(())
    }
}
