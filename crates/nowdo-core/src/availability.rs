//! Available-minutes derivation from calendar state.
//!
//! Availability is always computable. A tiered fallback applies, in order:
//!
//! 1. calendar lookup fails: 120 minutes
//! 2. no events before end of day: min(480, minutes left in the day)
//! 3. events exist but the next one cannot be determined: min(240, minutes left)
//! 4. otherwise: minutes until the next event starts, clamped to [0, 240]

use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Offset, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::sources::CalendarSource;

/// Returned when the calendar cannot be read.
pub const CALENDAR_FAILURE_MINUTES: u32 = 120;
/// Cap for a day with no remaining events.
pub const FREE_DAY_CAP_MINUTES: u32 = 480;
/// Cap for a day with remaining events.
pub const BUSY_DAY_CAP_MINUTES: u32 = 240;

/// Calendar event for free/busy computation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

impl CalendarEvent {
    /// Create a new calendar event
    pub fn new(
        user_id: impl Into<String>,
        title: impl Into<String>,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            title: title.into(),
            start_time,
            end_time,
        }
    }

    /// Check if this event overlaps with a time range
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.start_time < end && self.end_time > start
    }

    pub fn duration_minutes(&self) -> i64 {
        (self.end_time - self.start_time).num_minutes()
    }
}

/// Derives a user's available minutes at a given instant.
pub struct AvailabilityCalculator {
    calendar: Arc<dyn CalendarSource>,
    offset: FixedOffset,
}

impl AvailabilityCalculator {
    /// Create a calculator whose day ends at 23:59:59 UTC.
    pub fn new(calendar: Arc<dyn CalendarSource>) -> Self {
        Self {
            calendar,
            offset: Utc.fix(),
        }
    }

    /// Use a fixed UTC offset for "end of day".
    pub fn with_offset(mut self, offset: FixedOffset) -> Self {
        self.offset = offset;
        self
    }

    /// Build from an offset expressed in minutes east of UTC.
    ///
    /// Offsets of a day or more, or that overflow, fall back to UTC.
    pub fn with_offset_minutes(self, minutes: i32) -> Self {
        let offset = minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .unwrap_or_else(|| Utc.fix());
        self.with_offset(offset)
    }

    /// Minutes available to `user_id` starting at `at`.
    pub fn compute(&self, user_id: &str, at: DateTime<Utc>) -> u32 {
        let end_of_day = self.end_of_day(at);
        let remaining = minutes_between(at, end_of_day);

        let events = match self.calendar.events_between(user_id, at, end_of_day) {
            Ok(events) => events,
            Err(e) => {
                warn!(user_id, error = %e, "calendar lookup failed, using fallback availability");
                return CALENDAR_FAILURE_MINUTES;
            }
        };

        if events.is_empty() {
            let minutes = remaining.min(FREE_DAY_CAP_MINUTES);
            debug!(user_id, minutes, "no events before end of day");
            return minutes;
        }

        match self.calendar.next_event_after(user_id, at) {
            Ok(Some(next)) => {
                let minutes = minutes_between(at, next.start_time).min(BUSY_DAY_CAP_MINUTES);
                debug!(user_id, minutes, next_event = %next.title, "free until next event");
                minutes
            }
            Ok(None) => remaining.min(BUSY_DAY_CAP_MINUTES),
            Err(e) => {
                warn!(user_id, error = %e, "next-event lookup failed");
                remaining.min(BUSY_DAY_CAP_MINUTES)
            }
        }
    }

    /// 23:59:59 of `at`'s local day.
    pub fn end_of_day(&self, at: DateTime<Utc>) -> DateTime<Utc> {
        let local = at.with_timezone(&self.offset);
        local
            .date_naive()
            .and_hms_opt(23, 59, 59)
            .and_then(|naive| self.offset.from_local_datetime(&naive).single())
            .map(|eod| eod.with_timezone(&Utc))
            .unwrap_or(at)
    }
}

/// Whole minutes from `from` to `to`, zero if `to` is earlier.
fn minutes_between(from: DateTime<Utc>, to: DateTime<Utc>) -> u32 {
    let minutes = (to - from).num_minutes();
    u32::try_from(minutes.max(0)).unwrap_or(u32::MAX)
}
