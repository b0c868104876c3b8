// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Meetings, across the pending / confirmed / done collections
//! - Parties (directory records holding Google OAuth grants)

use crate::db::{collections, MeetingField, MeetingStore, PartyDirectory};
use crate::error::AppError;
use crate::models::{Meeting, MeetingPatch, Partition, PartyRecord};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use firestore::errors::FirestoreError;
use firestore::FirestoreWritePrecondition;
use serde::{Deserialize, Serialize};

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }
}

/// Stamp the document id onto records read back from a collection.
fn with_id(mut meeting: Meeting, id: &str) -> Meeting {
    meeting.id = Some(id.to_string());
    meeting
}

/// Copy of a meeting as written to a document. The id lives in the
/// document name; reads inject it as `_firestore_id`, so a stored `id`
/// field would collide with it.
fn stored_meeting(meeting: &Meeting) -> Meeting {
    Meeting {
        id: None,
        ..meeting.clone()
    }
}

fn stored_party(party: &PartyRecord) -> PartyRecord {
    PartyRecord {
        id: None,
        ..party.clone()
    }
}

/// Map a write error, treating a failed exists precondition as a missing
/// document.
fn write_error(err: FirestoreError, what: impl FnOnce() -> String) -> AppError {
    match err {
        FirestoreError::DataNotFoundError(_) => AppError::NotFound(what()),
        other => AppError::Database(other.to_string()),
    }
}

// ─── Meeting Operations ──────────────────────────────────────────

#[async_trait]
impl MeetingStore for FirestoreDb {
    async fn get_meeting(
        &self,
        partition: Partition,
        id: &str,
    ) -> Result<Option<Meeting>, AppError> {
        let meeting: Option<Meeting> = self
            .get_client()?
            .fluent()
            .select()
            .by_id_in(partition.collection())
            .obj()
            .one(id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(meeting.map(|m| with_id(m, id)))
    }

    async fn query_meetings(
        &self,
        partition: Partition,
        field: MeetingField,
        value: &str,
    ) -> Result<Vec<Meeting>, AppError> {
        let value = value.to_string();
        self.get_client()?
            .fluent()
            .select()
            .from(partition.collection())
            .filter(move |q| q.for_all([q.field(field.as_str()).eq(value.clone())]))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn list_meetings(&self, partition: Partition) -> Result<Vec<Meeting>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(partition.collection())
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn set_meeting(
        &self,
        partition: Partition,
        id: &str,
        meeting: &Meeting,
    ) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(partition.collection())
            .document_id(id)
            .object(&stored_meeting(meeting))
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn update_meeting(
        &self,
        partition: Partition,
        id: &str,
        patch: &MeetingPatch,
    ) -> Result<(), AppError> {
        if patch.is_empty() {
            return Ok(());
        }

        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .fields(patch.field_paths())
            .in_col(partition.collection())
            .precondition(FirestoreWritePrecondition::Exists(true))
            .document_id(id)
            .object(patch)
            .execute()
            .await
            .map_err(|e| write_error(e, || format!("Meeting {}", id)))?;
        Ok(())
    }

    async fn delete_meeting(&self, partition: Partition, id: &str) -> Result<(), AppError> {
        self.get_client()?
            .fluent()
            .delete()
            .from(partition.collection())
            .document_id(id)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn add_meeting(
        &self,
        partition: Partition,
        meeting: &Meeting,
    ) -> Result<String, AppError> {
        let created: Meeting = self
            .get_client()?
            .fluent()
            .insert()
            .into(partition.collection())
            .generate_document_id()
            .object(&stored_meeting(meeting))
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        created
            .id
            .ok_or_else(|| AppError::Database("Insert returned no document id".to_string()))
    }
}

// ─── Party Operations ────────────────────────────────────────────

/// Field mask write of a refreshed grant.
#[derive(Serialize, Deserialize)]
struct GoogleOAuthUpdate {
    #[serde(rename = "googleOAuth")]
    google_oauth: AccessTokenFields,
}

#[derive(Serialize, Deserialize)]
struct AccessTokenFields {
    access_token: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    expiry_date: DateTime<Utc>,
}

#[async_trait]
impl PartyDirectory for FirestoreDb {
    async fn get_party(&self, id: &str) -> Result<Option<PartyRecord>, AppError> {
        let party: Option<PartyRecord> = self
            .get_client()?
            .fluent()
            .select()
            .by_id_in(collections::PARTIES)
            .obj()
            .one(id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(party.map(|mut p| {
            p.id = Some(id.to_string());
            p
        }))
    }

    async fn find_parties_by_email(&self, email: &str) -> Result<Vec<PartyRecord>, AppError> {
        let email = email.to_string();
        self.get_client()?
            .fluent()
            .select()
            .from(collections::PARTIES)
            .filter(move |q| q.for_all([q.field("email").eq(email.clone())]))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn list_parties(&self) -> Result<Vec<PartyRecord>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::PARTIES)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn update_access_token(
        &self,
        party_id: &str,
        access_token: &str,
        expiry_date: DateTime<Utc>,
    ) -> Result<(), AppError> {
        let update = GoogleOAuthUpdate {
            google_oauth: AccessTokenFields {
                access_token: access_token.to_string(),
                expiry_date,
            },
        };

        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .fields(["googleOAuth.access_token", "googleOAuth.expiry_date"])
            .in_col(collections::PARTIES)
            .precondition(FirestoreWritePrecondition::Exists(true))
            .document_id(party_id)
            .object(&update)
            .execute()
            .await
            .map_err(|e| write_error(e, || format!("Party {}", party_id)))?;
        Ok(())
    }

    async fn set_party(&self, id: &str, party: &PartyRecord) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::PARTIES)
            .document_id(id)
            .object(&stored_party(party))
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_offline_mock_reports_database_error() {
        let db = FirestoreDb::new_mock();
        let err = db
            .get_meeting(Partition::Pending, "any")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Database(_)));

        let err = db.list_parties().await.unwrap_err();
        assert!(matches!(err, AppError::Database(_)));
    }

    #[test]
    fn test_confirmed_meeting_reads_back_from_document() {
        let confirmed = Meeting {
            id: Some("abc123".to_string()),
            mentee_id: "mentee-1".to_string(),
            mentor_id: "mentor-1".to_string(),
            meeting_date: "2025-09-02".to_string(),
            meeting_time: "1:00 PM".to_string(),
            status: crate::models::MeetingStatus::Confirmed,
            ..Default::default()
        };

        let document = firestore::firestore_document_from_serializable(
            "projects/test/databases/(default)/documents/confirmedMeeting/abc123",
            &stored_meeting(&confirmed),
        )
        .unwrap();
        assert!(!document.fields.contains_key("id"));

        let read: Meeting = firestore::firestore_document_to_serializable(&document).unwrap();
        assert_eq!(read.id.as_deref(), Some("abc123"));
        assert_eq!(read.status, crate::models::MeetingStatus::Confirmed);
    }

    #[test]
    fn test_party_reads_back_from_document() {
        let party = PartyRecord {
            id: Some("mentee-1".to_string()),
            email: Some("ada@example.com".to_string()),
            ..Default::default()
        };
        let document = firestore::firestore_document_from_serializable(
            "projects/test/databases/(default)/documents/mentees/mentee-1",
            &stored_party(&party),
        )
        .unwrap();

        let read: PartyRecord = firestore::firestore_document_to_serializable(&document).unwrap();
        assert_eq!(read.id.as_deref(), Some("mentee-1"));
    }

    #[test]
    fn test_patches_read_back_from_document() {
        let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let document = firestore::firestore_document_from_serializable(
            "projects/test/databases/(default)/documents/pendingMeeting/abc123",
            &MeetingPatch::approval(crate::models::PartyRole::Mentee, now),
        )
        .unwrap();
        let read: MeetingPatch = firestore::firestore_document_to_serializable(&document).unwrap();
        assert_eq!(read.mentee_approved, Some(true));
        assert_eq!(read.mentor_approved, None);
        assert_eq!(read.updated_at, Some(now));

        let update = GoogleOAuthUpdate {
            google_oauth: AccessTokenFields {
                access_token: "new".to_string(),
                expiry_date: now,
            },
        };
        let document = firestore::firestore_document_from_serializable(
            "projects/test/databases/(default)/documents/mentees/mentee-1",
            &update,
        )
        .unwrap();
        let read: GoogleOAuthUpdate =
            firestore::firestore_document_to_serializable(&document).unwrap();
        assert_eq!(read.google_oauth.access_token, "new");
        assert_eq!(read.google_oauth.expiry_date, now);
    }

    #[test]
    fn test_access_token_update_shape() {
        let update = GoogleOAuthUpdate {
            google_oauth: AccessTokenFields {
                access_token: "new".to_string(),
                expiry_date: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
            },
        };
        let value = serde_json::to_value(&update).unwrap();
        assert_eq!(value["googleOAuth"]["access_token"], "new");
        assert_eq!(value["googleOAuth"]["expiry_date"], 1_700_000_000_000_i64);
        assert!(value["googleOAuth"].get("refresh_token").is_none());
    }
}
