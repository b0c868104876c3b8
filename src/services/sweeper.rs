// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Moves confirmed meetings whose scheduled end has passed into the done
//! partition.

use crate::db::MeetingStore;
use crate::error::AppError;
use crate::models::{Meeting, MeetingStatus, Partition};
use crate::services::time_window::TimeNormalizer;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Result of one sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepReport {
    pub moved_count: usize,
    /// Ended meetings that could not be moved this run
    pub failed: usize,
}

#[derive(Clone)]
pub struct ExpirySweeper {
    store: Arc<dyn MeetingStore>,
    normalizer: TimeNormalizer,
}

impl ExpirySweeper {
    pub fn new(store: Arc<dyn MeetingStore>, normalizer: TimeNormalizer) -> Self {
        Self { store, normalizer }
    }

    pub async fn sweep(&self) -> Result<SweepReport, AppError> {
        self.sweep_at(Utc::now()).await
    }

    /// Move every confirmed meeting that ended before `now`.
    ///
    /// Only listing the confirmed partition can fail the sweep; a failure
    /// on a single record is logged and counted, and the rest continue.
    /// Records whose schedule does not parse are left in place.
    pub async fn sweep_at(&self, now: DateTime<Utc>) -> Result<SweepReport, AppError> {
        let confirmed = self.store.list_meetings(Partition::Confirmed).await?;
        let mut report = SweepReport::default();

        for meeting in confirmed {
            let Some(id) = meeting.id.clone() else {
                tracing::warn!("Confirmed meeting without an id, skipping");
                continue;
            };

            if !self
                .normalizer
                .is_ended_at(&meeting.meeting_date, &meeting.meeting_time, now)
            {
                continue;
            }

            match self.move_to_done(&id, meeting, now).await {
                Ok(()) => report.moved_count += 1,
                Err(e) => {
                    tracing::error!(meeting_id = %id, error = %e, "Failed to move expired meeting");
                    report.failed += 1;
                }
            }
        }

        if report.moved_count > 0 || report.failed > 0 {
            tracing::info!(
                moved = report.moved_count,
                failed = report.failed,
                "Expired meeting sweep finished"
            );
        }
        Ok(report)
    }

    async fn move_to_done(
        &self,
        id: &str,
        meeting: Meeting,
        now: DateTime<Utc>,
    ) -> Result<(), AppError> {
        if !meeting.status.can_transition_to(MeetingStatus::Done) {
            return Err(AppError::InvalidTransition {
                from: meeting.status,
                to: MeetingStatus::Done,
            });
        }

        let done = Meeting {
            status: MeetingStatus::Done,
            completed_at: Some(now),
            updated_at: Some(now),
            ..meeting
        };

        // Done first: an interrupted move leaves a duplicate, never a loss.
        self.store.set_meeting(done.status.partition(), id, &done).await?;
        self.store.delete_meeting(Partition::Confirmed, id).await?;
        Ok(())
    }

    /// Run [`sweep`](Self::sweep) every `interval` on the tokio runtime.
    pub fn spawn_periodic(self, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(e) = self.sweep().await {
                    tracing::error!(error = %e, "Expired meeting sweep failed");
                }
            }
        })
    }
}
