//! # Attendance Classification
//!
//! Derives a per-participant attendance verdict from the presence history
//! accumulated while a hearing was live. Classification is a pure function
//! of the participant record and the session timeline; the hearing aggregate
//! invokes it once, at conclusion.

use chrono::{DateTime, Utc};

use crate::participant::{AttendanceStatus, Participant};
use crate::policy::{LATE_THRESHOLD_MINUTES, MIN_ATTENDANCE_RATIO};

/// Minutes a participant must have been online to count as present.
///
/// Ceiling of `duration × MIN_ATTENDANCE_RATIO`, so a 90-minute hearing
/// requires 45 minutes and a 61-minute hearing requires 31.
pub fn required_online_minutes(duration_minutes: i64) -> i64 {
    let required = (duration_minutes as f64) * MIN_ATTENDANCE_RATIO;
    required.ceil() as i64
}

/// Classify one participant's attendance for a finished session.
///
/// `started_at` is `None` when the hearing never reached `IN_PROGRESS`, in
/// which case every participant is `NotStarted`. A participant who never
/// joined, or whose accumulated online time falls below the required
/// fraction of the hearing duration, is a `NoShow`. Otherwise lateness
/// relative to the session start picks the bucket.
pub fn classify(
    participant: &Participant,
    started_at: Option<DateTime<Utc>>,
    duration_minutes: i64,
) -> AttendanceStatus {
    let Some(started_at) = started_at else {
        return AttendanceStatus::NotStarted;
    };
    let Some(joined_at) = participant.joined_at else {
        return AttendanceStatus::NoShow;
    };
    if participant.total_online_minutes < required_online_minutes(duration_minutes) {
        return AttendanceStatus::NoShow;
    }

    let late_minutes = (joined_at - started_at).num_minutes();
    if late_minutes <= 0 {
        AttendanceStatus::OnTime
    } else if late_minutes <= LATE_THRESHOLD_MINUTES {
        AttendanceStatus::Late
    } else {
        AttendanceStatus::VeryLate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use uuid::Uuid;

    use crate::participant::ParticipantRole;

    fn participant_with(
        joined_offset_minutes: Option<i64>,
        started_at: DateTime<Utc>,
        online_minutes: i64,
    ) -> Participant {
        let mut p = Participant::new(Uuid::new_v4(), ParticipantRole::Witness);
        p.joined_at = joined_offset_minutes.map(|m| started_at + Duration::minutes(m));
        p.total_online_minutes = online_minutes;
        p
    }

    #[test]
    fn required_minutes_rounds_up() {
        assert_eq!(required_online_minutes(90), 45);
        assert_eq!(required_online_minutes(61), 31);
        assert_eq!(required_online_minutes(1), 1);
        assert_eq!(required_online_minutes(0), 0);
    }

    #[test]
    fn never_started_hearing_is_not_started_for_everyone() {
        let now = Utc::now();
        let p = participant_with(Some(0), now, 60);
        assert_eq!(classify(&p, None, 60), AttendanceStatus::NotStarted);
    }

    #[test]
    fn never_joined_is_no_show() {
        let started = Utc::now();
        let p = participant_with(None, started, 0);
        assert_eq!(classify(&p, Some(started), 60), AttendanceStatus::NoShow);
    }

    #[test]
    fn insufficient_online_time_is_no_show() {
        let started = Utc::now();
        // Joined on time but stayed for 20 of the required 30 minutes.
        let p = participant_with(Some(0), started, 20);
        assert_eq!(classify(&p, Some(started), 60), AttendanceStatus::NoShow);
    }

    #[test]
    fn joined_at_start_is_on_time() {
        let started = Utc::now();
        let p = participant_with(Some(0), started, 60);
        assert_eq!(classify(&p, Some(started), 60), AttendanceStatus::OnTime);
    }

    #[test]
    fn joined_before_start_is_on_time() {
        let started = Utc::now();
        let p = participant_with(Some(-10), started, 60);
        assert_eq!(classify(&p, Some(started), 60), AttendanceStatus::OnTime);
    }

    #[test]
    fn joined_within_threshold_is_late() {
        let started = Utc::now();
        let p = participant_with(Some(15), started, 45);
        assert_eq!(classify(&p, Some(started), 60), AttendanceStatus::Late);
    }

    #[test]
    fn joined_beyond_threshold_is_very_late() {
        let started = Utc::now();
        let p = participant_with(Some(16), started, 44);
        assert_eq!(classify(&p, Some(started), 60), AttendanceStatus::VeryLate);
    }
}
