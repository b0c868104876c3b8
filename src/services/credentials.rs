// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Party OAuth credential lookup and refresh.
//!
//! A party may be identified by its directory id or by email. Lookups try
//! each strategy in [`LOOKUP_ORDER`] and stop at the first one that finds a
//! record.

use crate::db::PartyDirectory;
use crate::error::AppError;
use crate::models::{OAuthCredential, PartyRecord};
use crate::services::google::OAuthProvider;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// One way of finding a party record for an identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupStrategy {
    /// Identity is the directory document id.
    ById,
    /// Identity is an email; use the indexed email query.
    ByEmailIndex,
    /// Identity is an email; scan the whole directory.
    ByEmailScan,
}

/// Order in which lookups are attempted.
pub const LOOKUP_ORDER: [LookupStrategy; 3] = [
    LookupStrategy::ById,
    LookupStrategy::ByEmailIndex,
    LookupStrategy::ByEmailScan,
];

/// A stored grant together with the directory id it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedCredential {
    pub party_id: String,
    pub credential: OAuthCredential,
}

pub fn is_email_shaped(identity: &str) -> bool {
    match identity.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.')
        }
        None => false,
    }
}

/// Resolves and refreshes party credentials.
#[derive(Clone)]
pub struct CredentialResolver {
    directory: Arc<dyn PartyDirectory>,
    oauth: Arc<dyn OAuthProvider>,
}

impl CredentialResolver {
    pub fn new(directory: Arc<dyn PartyDirectory>, oauth: Arc<dyn OAuthProvider>) -> Self {
        Self { directory, oauth }
    }

    /// Find the stored grant for a party id or email.
    pub async fn resolve(&self, identity: &str) -> Result<ResolvedCredential, AppError> {
        let identity = identity.trim();
        if identity.is_empty() {
            return Err(AppError::NotFound("Party with empty identity".to_string()));
        }

        for strategy in LOOKUP_ORDER {
            let Some(record) = self.lookup(strategy, identity).await else {
                continue;
            };

            tracing::debug!(identity, ?strategy, "Party record located");

            let party_id = record.id.clone().unwrap_or_else(|| identity.to_string());
            return match record.google_oauth {
                Some(credential) => Ok(ResolvedCredential {
                    party_id,
                    credential,
                }),
                None => Err(AppError::CredentialMissing(identity.to_string())),
            };
        }

        Err(AppError::NotFound(format!("Party {}", identity)))
    }

    /// Run a single lookup strategy. Store errors count as "not found here"
    /// so the next strategy still gets a chance.
    async fn lookup(&self, strategy: LookupStrategy, identity: &str) -> Option<PartyRecord> {
        let result = match strategy {
            LookupStrategy::ById => self.directory.get_party(identity).await,
            LookupStrategy::ByEmailIndex if is_email_shaped(identity) => self
                .directory
                .find_parties_by_email(identity)
                .await
                .map(|records| records.into_iter().next()),
            LookupStrategy::ByEmailScan if is_email_shaped(identity) => {
                self.directory.list_parties().await.map(|records| {
                    records.into_iter().find(|record| record.has_email(identity))
                })
            }
            LookupStrategy::ByEmailIndex | LookupStrategy::ByEmailScan => return None,
        };

        match result {
            Ok(record) => record,
            Err(err) => {
                tracing::warn!(identity, ?strategy, error = %err, "Party lookup failed");
                None
            }
        }
    }

    pub async fn refresh_if_expired(
        &self,
        resolved: ResolvedCredential,
    ) -> Result<ResolvedCredential, AppError> {
        self.refresh_if_expired_at(resolved, Utc::now()).await
    }

    /// Refresh the access token when `now` is past its expiry and persist
    /// the new token. Refresh failures are returned as [`AppError::Refresh`].
    pub async fn refresh_if_expired_at(
        &self,
        resolved: ResolvedCredential,
        now: DateTime<Utc>,
    ) -> Result<ResolvedCredential, AppError> {
        if !resolved.credential.is_expired_at(now) {
            return Ok(resolved);
        }

        tracing::info!(party_id = %resolved.party_id, "Access token expired, refreshing");

        let refreshed = self
            .oauth
            .refresh_access_token(&resolved.credential.refresh_token)
            .await
            .map_err(|e| match e {
                AppError::Refresh(_) => e,
                other => AppError::Refresh(other.to_string()),
            })?;

        self.directory
            .update_access_token(
                &resolved.party_id,
                &refreshed.access_token,
                refreshed.expiry_date,
            )
            .await?;

        tracing::info!(party_id = %resolved.party_id, "Access token refreshed");

        Ok(ResolvedCredential {
            party_id: resolved.party_id,
            credential: resolved
                .credential
                .with_access_token(&refreshed.access_token, refreshed.expiry_date),
        })
    }

    /// Resolve and refresh in one step.
    pub async fn usable_credential(&self, identity: &str) -> Result<ResolvedCredential, AppError> {
        let resolved = self.resolve(identity).await?;
        self.refresh_if_expired(resolved).await
    }
}
