// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use crate::models::MeetingStatus;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Unparseable meeting schedule: {0}")]
    Parse(String),

    #[error("Meeting cannot move from {from} to {to}")]
    InvalidTransition {
        from: MeetingStatus,
        to: MeetingStatus,
    },

    #[error("No stored calendar credential for {0}")]
    CredentialMissing(String),

    #[error("OAuth refresh failed: {0}")]
    Refresh(String),

    #[error("Calendar API error: {0}")]
    CalendarApi(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Errors raised by the OAuth/calendar chain. These are absorbed by the
    /// meeting-link fallback and never reach an HTTP caller from there.
    pub fn is_calendar_chain_error(&self) -> bool {
        matches!(
            self,
            AppError::NotFound(_)
                | AppError::CredentialMissing(_)
                | AppError::Refresh(_)
                | AppError::CalendarApi(_)
        )
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error) = match &self {
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            AppError::BadRequest(_) | AppError::Parse(_) | AppError::InvalidTransition { .. } => {
                (StatusCode::BAD_REQUEST, self.to_string())
            }
            AppError::CredentialMissing(_) | AppError::Refresh(_) | AppError::CalendarApi(_) => {
                tracing::error!(error = %self, "Calendar integration error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "calendar_error".to_string(),
                )
            }
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "database_error".to_string(),
                )
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error".to_string(),
                )
            }
        };

        let body = ErrorResponse {
            success: false,
            error,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
