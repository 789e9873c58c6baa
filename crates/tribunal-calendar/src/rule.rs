//! Scheduling rules for hearing time negotiation.
//!
//! A [`ScheduleRule`] bundles the working calendar (hours, days, lunch
//! break), spacing requirements, and negotiation limits that the allocator
//! and negotiator consult. The default mirrors a standard office calendar;
//! deployments override fields through configuration.

use chrono::{DateTime, Datelike, Timelike, Utc, Weekday};
use serde::{Deserialize, Serialize};

/// Minute-of-day for a timestamp, in UTC.
fn minute_of_day(at: DateTime<Utc>) -> u32 {
    at.hour() * 60 + at.minute()
}

/// The rules governing slot search and reschedule negotiation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleRule {
    /// Start of the working day, minutes from midnight UTC.
    pub working_start_minute: u32,
    /// End of the working day, minutes from midnight UTC.
    pub working_end_minute: u32,
    /// Days of the week on which hearings may be held.
    pub working_days: Vec<Weekday>,
    /// Clearance required between a candidate slot and adjacent busy
    /// intervals, in minutes.
    pub buffer_minutes: i64,
    /// Start of the lunch window, minutes from midnight UTC.
    pub lunch_start_minute: u32,
    /// End of the lunch window, minutes from midnight UTC.
    pub lunch_end_minute: u32,
    /// Whether candidates overlapping lunch are excluded from search.
    pub avoid_lunch: bool,
    /// Maximum hearings a moderator takes on per day.
    pub max_events_per_staff_per_day: usize,
    /// Ceiling on the share of the working day a moderator may have
    /// committed, counting the candidate slot. In `(0, 1]`.
    pub max_staff_utilization_rate: f64,
    /// Candidate start times are aligned to this grid, in minutes.
    pub step_minutes: i64,
    /// At most this many candidates are returned per search.
    pub max_candidates: usize,
    /// How many times a hearing chain may be rescheduled.
    pub max_reschedule_count: u32,
    /// Minimum notice for a reschedule request, in hours.
    pub min_reschedule_notice_hours: i64,
    /// How far ahead the allocator searches, in days.
    pub window_days: i64,
    /// Duration assumed when a request does not state one, in minutes.
    pub default_duration_minutes: i64,
    /// Whether requester-preferred slots receive a ranking bonus.
    pub respect_preferred_slots: bool,
}

impl Default for ScheduleRule {
    fn default() -> Self {
        Self {
            working_start_minute: 8 * 60,
            working_end_minute: 18 * 60,
            working_days: vec![
                Weekday::Mon,
                Weekday::Tue,
                Weekday::Wed,
                Weekday::Thu,
                Weekday::Fri,
            ],
            buffer_minutes: 15,
            lunch_start_minute: 11 * 60 + 30,
            lunch_end_minute: 13 * 60,
            avoid_lunch: true,
            max_events_per_staff_per_day: 5,
            max_staff_utilization_rate: 0.8,
            step_minutes: 15,
            max_candidates: 30,
            max_reschedule_count: 3,
            min_reschedule_notice_hours: 2,
            window_days: 7,
            default_duration_minutes: 60,
            respect_preferred_slots: true,
        }
    }
}

impl ScheduleRule {
    /// Whether hearings may be held on this weekday.
    pub fn is_working_day(&self, day: Weekday) -> bool {
        self.working_days.contains(&day)
    }

    /// Length of the working day in minutes.
    pub fn workday_minutes(&self) -> i64 {
        i64::from(self.working_end_minute - self.working_start_minute)
    }

    /// Whether the `[start, end)` interval falls entirely inside working
    /// hours on a working day.
    pub fn within_working_hours(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        if !self.is_working_day(start.weekday()) {
            return false;
        }
        if start.date_naive() != end.date_naive() && minute_of_day(end) != 0 {
            return false;
        }
        let start_minute = minute_of_day(start);
        let end_minute = if start.date_naive() == end.date_naive() {
            minute_of_day(end)
        } else {
            24 * 60
        };
        start_minute >= self.working_start_minute && end_minute <= self.working_end_minute
    }

    /// Whether the `[start, end)` interval intersects the lunch window.
    pub fn overlaps_lunch(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        let start_minute = minute_of_day(start);
        let end_minute = if start.date_naive() == end.date_naive() {
            minute_of_day(end)
        } else {
            24 * 60
        };
        start_minute < self.lunch_end_minute && end_minute > self.lunch_start_minute
    }

    /// Basic sanity checks for rules loaded from configuration.
    pub fn validate(&self) -> Result<(), crate::error::ScheduleError> {
        use crate::error::ScheduleError;
        if self.working_start_minute >= self.working_end_minute {
            return Err(ScheduleError::InvalidValue(
                "working hours must be a non-empty range".to_string(),
            ));
        }
        if self.working_days.is_empty() {
            return Err(ScheduleError::InvalidValue(
                "at least one working day is required".to_string(),
            ));
        }
        if self.step_minutes <= 0 {
            return Err(ScheduleError::InvalidValue(
                "step_minutes must be positive".to_string(),
            ));
        }
        if self.default_duration_minutes <= 0 {
            return Err(ScheduleError::InvalidValue(
                "default_duration_minutes must be positive".to_string(),
            ));
        }
        if !(self.max_staff_utilization_rate > 0.0 && self.max_staff_utilization_rate <= 1.0) {
            return Err(ScheduleError::InvalidValue(
                "max_staff_utilization_rate must be in (0, 1]".to_string(),
            ));
        }
        Ok(())
    }
}
