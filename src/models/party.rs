//! Party directory records and their stored OAuth grants.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A party record in the `mentees` directory collection.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PartyRecord {
    /// Document ID (party identity)
    #[serde(
        default,
        alias = "_firestore_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    /// Stored Google OAuth grant, if the party connected a calendar
    #[serde(rename = "googleOAuth", default)]
    pub google_oauth: Option<OAuthCredential>,
}

impl PartyRecord {
    pub fn has_email(&self, email: &str) -> bool {
        self.email
            .as_deref()
            .is_some_and(|e| e.eq_ignore_ascii_case(email))
    }
}

/// OAuth grant held on behalf of a party.
///
/// Only `access_token` and `expiry_date` change after issue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OAuthCredential {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub scope: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    /// Absolute expiry (epoch milliseconds in storage)
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub expiry_date: DateTime<Utc>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

impl OAuthCredential {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expiry_date
    }

    /// Copy with a refreshed access token; the refresh token is kept.
    pub fn with_access_token(mut self, access_token: &str, expiry_date: DateTime<Utc>) -> Self {
        self.access_token = access_token.to_string();
        self.expiry_date = expiry_date;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_google_oauth_record_shape() {
        let record: PartyRecord = serde_json::from_value(serde_json::json!({
            "_firestore_id": "mentee-7",
            "email": "Ada@Example.com",
            "googleOAuth": {
                "access_token": "ya29.a",
                "refresh_token": "1//r",
                "scope": "https://www.googleapis.com/auth/calendar",
                "expiry_date": 1_756_818_000_000_i64,
            }
        }))
        .unwrap();

        assert_eq!(record.id.as_deref(), Some("mentee-7"));
        assert!(record.has_email("ada@example.com"));
        let cred = record.google_oauth.unwrap();
        assert_eq!(cred.token_type, "Bearer");
        assert_eq!(cred.expiry_date.timestamp_millis(), 1_756_818_000_000);
    }

    #[test]
    fn test_expiry_is_strict() {
        let now = Utc::now();
        let cred = OAuthCredential {
            access_token: "a".into(),
            refresh_token: "r".into(),
            scope: String::new(),
            token_type: "Bearer".into(),
            expiry_date: now,
        };
        assert!(!cred.is_expired_at(now));
        assert!(cred.is_expired_at(now + chrono::Duration::milliseconds(1)));
    }
}
