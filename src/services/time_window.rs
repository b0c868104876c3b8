// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Meeting date/time normalization.
//!
//! Meeting dates and times arrive as loosely formatted strings written by
//! people ("Sep 02", "2025-09-02", "1:00 PM - 2:00 PM"). This module turns
//! them into an unambiguous UTC window, interpreting wall-clock values in
//! the configured meeting timezone.

use crate::error::AppError;
use chrono::{
    DateTime, Datelike, Duration, Months, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc,
};
use chrono_tz::Tz;

/// Resolved dates further out than this are rejected as misparses.
const MAX_MONTHS_AHEAD: u32 = 24;

/// Duration of a meeting given as a single start time.
const DEFAULT_MEETING_MINUTES: i64 = 60;

/// Formats carrying an explicit year, tried in order after ISO forms.
const FULL_DATE_FORMATS: &[&str] = &[
    "%B %d, %Y",
    "%B %d %Y",
    "%A, %B %d, %Y",
    "%A %B %d %Y",
    "%d %B %Y",
    "%m/%d/%Y",
    "%Y/%m/%d",
];

/// Month-and-day formats; the year is supplied during disambiguation.
const MONTH_DAY_FORMATS: &[&str] = &["%B %d", "%d %B", "%m/%d"];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimeParseError {
    #[error("meeting date is empty")]
    EmptyDate,

    #[error("unrecognized meeting date '{0}'")]
    UnrecognizedDate(String),

    #[error("meeting date {0} is more than two years away")]
    TooFarAhead(NaiveDate),

    #[error("unrecognized meeting time '{0}'")]
    UnrecognizedTime(String),

    #[error("local time {0} does not exist in {1}")]
    NonexistentLocalTime(NaiveDateTime, Tz),
}

impl From<TimeParseError> for AppError {
    fn from(err: TimeParseError) -> Self {
        AppError::Parse(err.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Meridiem {
    Am,
    Pm,
}

/// Convert a 12-hour clock hour (1..=12) to 24-hour.
pub fn to_24_hour(hour: u32, meridiem: Meridiem) -> u32 {
    match (meridiem, hour) {
        (Meridiem::Am, 12) => 0,
        (Meridiem::Pm, 12) => 12,
        (Meridiem::Pm, h) => h + 12,
        (Meridiem::Am, h) => h,
    }
}

/// Concrete start/end of a meeting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeetingWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Parses meeting schedules in a fixed timezone.
#[derive(Debug, Clone, Copy)]
pub struct TimeNormalizer {
    tz: Tz,
}

impl Default for TimeNormalizer {
    fn default() -> Self {
        Self::new(Tz::UTC)
    }
}

impl TimeNormalizer {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    pub fn parse_meeting_window(
        &self,
        date: &str,
        time: &str,
    ) -> Result<MeetingWindow, TimeParseError> {
        self.parse_meeting_window_at(date, time, Utc::now())
    }

    /// Parse relative to `now` (which anchors month-day and range checks).
    pub fn parse_meeting_window_at(
        &self,
        date: &str,
        time: &str,
        now: DateTime<Utc>,
    ) -> Result<MeetingWindow, TimeParseError> {
        let date = self.parse_date(date, now)?;
        let (start_time, end_time) = parse_time_range(time)?;

        let start_local = date.and_time(start_time);
        let mut end_local = match end_time {
            Some(end) => date.and_time(end),
            None => start_local + Duration::minutes(DEFAULT_MEETING_MINUTES),
        };
        if end_local <= start_local {
            end_local += Duration::days(1);
        }

        Ok(MeetingWindow {
            start: self.to_utc(start_local)?,
            end: self.to_utc(end_local)?,
        })
    }

    pub fn is_ended(&self, date: &str, time: &str) -> bool {
        self.is_ended_at(date, time, Utc::now())
    }

    /// True iff the meeting's end is before `now`. Unparseable schedules are
    /// never considered ended.
    pub fn is_ended_at(&self, date: &str, time: &str, now: DateTime<Utc>) -> bool {
        match self.parse_meeting_window_at(date, time, now) {
            Ok(window) => now > window.end,
            Err(err) => {
                tracing::debug!(date, time, error = %err, "Schedule not parseable, treating as not ended");
                false
            }
        }
    }

    /// Resolve a free-form date string to a calendar date in this zone.
    pub fn parse_date(&self, raw: &str, now: DateTime<Utc>) -> Result<NaiveDate, TimeParseError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(TimeParseError::EmptyDate);
        }

        let today = now.with_timezone(&self.tz).date_naive();
        let date = self
            .parse_explicit_date(raw)
            .or_else(|| parse_month_day(raw, today))
            .ok_or_else(|| TimeParseError::UnrecognizedDate(raw.to_string()))?;

        let limit = today
            .checked_add_months(Months::new(MAX_MONTHS_AHEAD))
            .unwrap_or(NaiveDate::MAX);
        if date > limit {
            return Err(TimeParseError::TooFarAhead(date));
        }

        Ok(date)
    }

    /// Dates that carry their own year.
    fn parse_explicit_date(&self, raw: &str) -> Option<NaiveDate> {
        if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            return Some(date);
        }
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&self.tz).date_naive());
        }
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
            return Some(dt.date());
        }

        let normalized = normalize_whitespace(raw);
        FULL_DATE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDate::parse_from_str(&normalized, fmt).ok())
    }

    fn to_utc(&self, local: NaiveDateTime) -> Result<DateTime<Utc>, TimeParseError> {
        self.tz
            .from_local_datetime(&local)
            .earliest()
            .map(|dt| dt.with_timezone(&Utc))
            .ok_or(TimeParseError::NonexistentLocalTime(local, self.tz))
    }
}

fn normalize_whitespace(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// "Sep 02" style dates: this year, unless that day has already passed.
fn parse_month_day(raw: &str, today: NaiveDate) -> Option<NaiveDate> {
    let normalized = normalize_whitespace(raw);
    let with_year = |year: i32| -> Option<NaiveDate> {
        let candidate = format!("{} {}", normalized, year);
        MONTH_DAY_FORMATS.iter().find_map(|fmt| {
            NaiveDate::parse_from_str(&candidate, &format!("{} %Y", fmt)).ok()
        })
    };

    match with_year(today.year()) {
        Some(date) if date < today => with_year(today.year() + 1),
        Some(date) => Some(date),
        // Feb 29 outside a leap year
        None => with_year(today.year() + 1),
    }
}

/// Parse "H:MM am/pm" or "H:MM am/pm - H:MM am/pm".
fn parse_time_range(raw: &str) -> Result<(NaiveTime, Option<NaiveTime>), TimeParseError> {
    let unrecognized = || TimeParseError::UnrecognizedTime(raw.to_string());

    match raw.split_once('-') {
        Some((start, end)) => {
            let start = parse_clock(start.trim()).ok_or_else(unrecognized)?;
            let end = parse_clock(end.trim()).ok_or_else(unrecognized)?;
            Ok((start, Some(end)))
        }
        None => {
            let start = parse_clock(raw.trim()).ok_or_else(unrecognized)?;
            Ok((start, None))
        }
    }
}

fn parse_clock(raw: &str) -> Option<NaiveTime> {
    let lower = raw.to_ascii_lowercase();
    let (clock, meridiem) = if let Some(clock) = lower.strip_suffix("am") {
        (clock, Meridiem::Am)
    } else if let Some(clock) = lower.strip_suffix("pm") {
        (clock, Meridiem::Pm)
    } else {
        return None;
    };

    let (hour, minute) = clock.trim().split_once(':')?;
    if hour.is_empty() || hour.len() > 2 || minute.len() != 2 {
        return None;
    }
    let hour: u32 = hour.parse().ok()?;
    let minute: u32 = minute.parse().ok()?;
    if !(1..=12).contains(&hour) {
        return None;
    }

    NaiveTime::from_hms_opt(to_24_hour(hour, meridiem), minute, 0)
}
