//! Availability search over moderator calendars.
//!
//! The allocator walks the search window on a fixed minute grid and emits
//! candidate slots per staff member. Working days, buffer clearance around
//! busy intervals, the lunch window (when the rule avoids it), the per-day
//! event cap, and the daily utilization ceiling are hard constraints;
//! requester preference only moves a candidate's rank. Results are ordered
//! best-first: score descending, then earliest start, then the less-loaded
//! staff member.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ScheduleError;
use crate::rule::ScheduleRule;

/// Ranking penalty for a slot outside working hours.
pub const SCORE_OUTSIDE_HOURS: i64 = -100;
/// Ranking penalty for a slot overlapping the lunch window.
pub const SCORE_LUNCH_OVERLAP: i64 = -50;
/// Ranking bonus for a slot starting at a requester-preferred time.
pub const SCORE_PREFERRED: i64 = 50;

// ── Inputs ─────────────────────────────────────────────────────────────

/// An interval during which a staff member is unavailable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusyInterval {
    /// The committed staff member.
    pub staff_id: Uuid,
    /// Interval start.
    pub start: DateTime<Utc>,
    /// Interval end.
    pub end: DateTime<Utc>,
}

/// Parameters of one availability search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotQuery {
    /// Earliest acceptable start.
    pub from: DateTime<Utc>,
    /// Desired duration in minutes. Zero falls back to the rule default.
    pub duration_minutes: i64,
    /// Start times the requester would prefer.
    pub preferred_starts: Vec<DateTime<Utc>>,
}

// ── Output ─────────────────────────────────────────────────────────────

/// A ranked candidate slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotCandidate {
    /// Slot start.
    pub start: DateTime<Utc>,
    /// Slot end.
    pub end: DateTime<Utc>,
    /// The staff member free for the slot.
    pub staff_id: Uuid,
    /// Ranking score. Higher is better.
    pub score: i64,
}

// ── Scoring ────────────────────────────────────────────────────────────

/// Score an arbitrary `[start, end)` slot against the rules.
///
/// Used both for ranking generated candidates and for judging slots a
/// requester proposed directly, which is why the outside-hours case is a
/// penalty here rather than an error.
pub fn score_slot(
    rule: &ScheduleRule,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    preferred_starts: &[DateTime<Utc>],
) -> i64 {
    let mut score = 0;
    if !rule.within_working_hours(start, end) {
        score += SCORE_OUTSIDE_HOURS;
    }
    if rule.avoid_lunch && rule.overlaps_lunch(start, end) {
        score += SCORE_LUNCH_OVERLAP;
    }
    if rule.respect_preferred_slots && preferred_starts.contains(&start) {
        score += SCORE_PREFERRED;
    }
    score
}

// ── Search ─────────────────────────────────────────────────────────────

/// Whether the slot keeps the required clearance from every busy interval
/// of the given staff member.
fn clear_of_busy(
    busy: &[BusyInterval],
    staff_id: Uuid,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    buffer: Duration,
) -> bool {
    busy.iter()
        .filter(|b| b.staff_id == staff_id)
        .all(|b| end + buffer <= b.start || start >= b.end + buffer)
}

/// How many commitments the staff member already has on the slot's day.
fn events_on_day(busy: &[BusyInterval], staff_id: Uuid, day: chrono::NaiveDate) -> usize {
    busy.iter()
        .filter(|b| b.staff_id == staff_id && b.start.date_naive() == day)
        .count()
}

/// Minutes the staff member has committed on the given day.
fn busy_minutes_on_day(busy: &[BusyInterval], staff_id: Uuid, day: chrono::NaiveDate) -> i64 {
    busy.iter()
        .filter(|b| b.staff_id == staff_id && b.start.date_naive() == day)
        .map(|b| (b.end - b.start).num_minutes())
        .sum()
}

/// Round a timestamp up to the allocator's minute grid.
fn align_to_grid(at: DateTime<Utc>, step_minutes: i64) -> DateTime<Utc> {
    let step = step_minutes * 60;
    let ts = at.timestamp();
    let aligned = ts.div_euclid(step) * step + if ts.rem_euclid(step) == 0 { 0 } else { step };
    DateTime::from_timestamp(aligned, 0).unwrap_or(at)
}

/// Search the window for free, rule-respecting slots.
///
/// Walks the grid from the query start through `rule.window_days`, keeping
/// slots on working days, fully inside working hours, clear of the lunch
/// window when `rule.avoid_lunch` is set, clear of busy intervals by the
/// configured buffer, under the per-day event cap, and under the daily
/// utilization ceiling. Survivors are ranked by
/// [`score_slot`] and capped at `rule.max_candidates`.
///
/// # Errors
///
/// [`ScheduleError::InvalidValue`] for a broken rule set, an empty staff
/// list, or a negative duration; [`ScheduleError::NoSlotAvailable`] when
/// the window holds no valid slot.
pub fn find_slots(
    rule: &ScheduleRule,
    staff: &[Uuid],
    busy: &[BusyInterval],
    query: &SlotQuery,
) -> Result<Vec<SlotCandidate>, ScheduleError> {
    rule.validate()?;
    if staff.is_empty() {
        return Err(ScheduleError::InvalidValue(
            "at least one staff member is required".to_string(),
        ));
    }
    if query.duration_minutes < 0 {
        return Err(ScheduleError::InvalidValue(
            "duration_minutes cannot be negative".to_string(),
        ));
    }
    let duration_minutes = if query.duration_minutes > 0 {
        query.duration_minutes
    } else {
        rule.default_duration_minutes
    };
    let duration = Duration::minutes(duration_minutes);
    let buffer = Duration::minutes(rule.buffer_minutes);
    let step = Duration::minutes(rule.step_minutes);
    let window_end = query.from + Duration::days(rule.window_days);
    let utilization_cap = rule.max_staff_utilization_rate * rule.workday_minutes() as f64;

    // Candidates carry the staff member's committed minutes on the slot's
    // day so ties can fall to the less-loaded moderator.
    let mut candidates: Vec<(SlotCandidate, i64)> = Vec::new();
    let mut cursor = align_to_grid(query.from, rule.step_minutes);
    while cursor + duration <= window_end {
        let end = cursor + duration;
        if rule.within_working_hours(cursor, end)
            && !(rule.avoid_lunch && rule.overlaps_lunch(cursor, end))
        {
            for &staff_id in staff {
                if !clear_of_busy(busy, staff_id, cursor, end, buffer) {
                    continue;
                }
                let day = cursor.date_naive();
                if events_on_day(busy, staff_id, day) >= rule.max_events_per_staff_per_day {
                    continue;
                }
                let committed = busy_minutes_on_day(busy, staff_id, day);
                if (committed + duration_minutes) as f64 > utilization_cap {
                    continue;
                }
                candidates.push((
                    SlotCandidate {
                        start: cursor,
                        end,
                        staff_id,
                        score: score_slot(rule, cursor, end, &query.preferred_starts),
                    },
                    committed,
                ));
            }
        }
        cursor += step;
    }

    if candidates.is_empty() {
        return Err(ScheduleError::NoSlotAvailable);
    }
    candidates.sort_by(|(a, a_load), (b, b_load)| {
        b.score
            .cmp(&a.score)
            .then(a.start.cmp(&b.start))
            .then(a_load.cmp(b_load))
            .then(a.staff_id.cmp(&b.staff_id))
    });
    candidates.truncate(rule.max_candidates);
    Ok(candidates.into_iter().map(|(c, _)| c).collect())
}

/// Whether `start` begins a slot the search currently offers for `staff_id`.
///
/// Used when approving a reschedule against a directly proposed time: the
/// proposal must match a candidate start exactly and cover the duration.
pub fn slot_is_offered(candidates: &[SlotCandidate], staff_id: Uuid, start: DateTime<Utc>) -> bool {
    candidates
        .iter()
        .any(|c| c.staff_id == staff_id && c.start == start)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn at(d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        // March 2026: the 9th through 13th are Monday through Friday.
        Utc.with_ymd_and_hms(2026, 3, d, h, mi, 0).unwrap()
    }

    fn query(from: DateTime<Utc>) -> SlotQuery {
        SlotQuery {
            from,
            duration_minutes: 60,
            preferred_starts: vec![],
        }
    }

    #[test]
    fn first_slot_starts_at_working_hours() {
        let rule = ScheduleRule::default();
        let staff = [Uuid::new_v4()];
        let slots = find_slots(&rule, &staff, &[], &query(at(9, 0, 0))).unwrap();
        assert_eq!(slots[0].start, at(9, 8, 0));
        assert_eq!(slots[0].end, at(9, 9, 0));
    }

    #[test]
    fn busy_interval_blocks_slots_within_buffer() {
        let rule = ScheduleRule {
            max_candidates: 500,
            window_days: 1,
            avoid_lunch: false,
            ..ScheduleRule::default()
        };
        let staff_id = Uuid::new_v4();
        let busy = vec![BusyInterval {
            staff_id,
            start: at(9, 10, 0),
            end: at(9, 11, 0),
        }];
        let slots = find_slots(&rule, &[staff_id], &busy, &query(at(9, 8, 0))).unwrap();

        // 08:45 would end at 09:45, exactly the buffer before the busy start.
        assert!(slots.iter().any(|s| s.start == at(9, 8, 45)));
        // 09:00 ends at 10:00, inside the 15-minute clearance.
        assert!(!slots.iter().any(|s| s.start == at(9, 9, 0)));
        // 11:00 starts at the busy end, still inside the clearance.
        assert!(!slots.iter().any(|s| s.start == at(9, 11, 0)));
        // 11:15 keeps the full buffer.
        assert!(slots.iter().any(|s| s.start == at(9, 11, 15)));
    }

    #[test]
    fn lunch_window_excludes_overlapping_slots() {
        let rule = ScheduleRule {
            max_candidates: 500,
            window_days: 1,
            ..ScheduleRule::default()
        };
        let staff = [Uuid::new_v4()];
        let slots = find_slots(&rule, &staff, &[], &query(at(9, 10, 0))).unwrap();

        // The default lunch window runs 11:30 to 13:00. A 10:30 start ends
        // exactly at the lunch start and survives; anything later that still
        // touches the window is gone until 13:00.
        assert!(slots.iter().any(|s| s.start == at(9, 10, 30)));
        assert!(!slots.iter().any(|s| s.start == at(9, 10, 45)));
        assert!(!slots.iter().any(|s| s.start == at(9, 12, 0)));
        assert!(slots.iter().any(|s| s.start == at(9, 13, 0)));
        assert!(!slots
            .iter()
            .any(|s| rule.overlaps_lunch(s.start, s.end)));
    }

    #[test]
    fn buffer_and_lunch_bound_the_post_meeting_candidates() {
        // An office calendar with lunch 12:00 to 13:00 and an existing
        // 10:00 to 11:00 commitment: a same-day 60-minute search must not
        // offer anything between the meeting and 11:15, and nothing that
        // touches the lunch hour.
        let rule = ScheduleRule {
            lunch_start_minute: 12 * 60,
            lunch_end_minute: 13 * 60,
            max_candidates: 500,
            window_days: 1,
            ..ScheduleRule::default()
        };
        let staff_id = Uuid::new_v4();
        let busy = vec![BusyInterval {
            staff_id,
            start: at(9, 10, 0),
            end: at(9, 11, 0),
        }];
        let slots = find_slots(&rule, &[staff_id], &busy, &query(at(9, 10, 0))).unwrap();

        let first = slots.iter().map(|s| s.start).min().unwrap();
        assert!(first >= at(9, 11, 15));
        assert!(!slots
            .iter()
            .any(|s| s.start < at(9, 13, 0) && s.end > at(9, 12, 0)));
        // 11:00 ends clear of lunch but sits inside the buffer; 11:15 would
        // clear the buffer yet runs into lunch, so the day resumes at 13:00.
        assert_eq!(first, at(9, 13, 0));
    }

    #[test]
    fn preferred_start_ranks_first() {
        let rule = ScheduleRule::default();
        let staff = [Uuid::new_v4()];
        let preferred = at(9, 14, 0);
        let q = SlotQuery {
            from: at(9, 8, 0),
            duration_minutes: 60,
            preferred_starts: vec![preferred],
        };
        let slots = find_slots(&rule, &staff, &[], &q).unwrap();
        assert_eq!(slots[0].start, preferred);
        assert_eq!(slots[0].score, SCORE_PREFERRED);
    }

    #[test]
    fn per_day_event_cap_excludes_loaded_staff() {
        let rule = ScheduleRule::default();
        let staff_id = Uuid::new_v4();
        // Five short commitments on Monday the 9th hit the cap.
        let busy: Vec<BusyInterval> = (0..5)
            .map(|i| BusyInterval {
                staff_id,
                start: at(9, 8 + i, 0),
                end: at(9, 8 + i, 30),
            })
            .collect();
        let q = SlotQuery {
            from: at(9, 8, 0),
            duration_minutes: 60,
            preferred_starts: vec![],
        };
        let slots = find_slots(&rule, &[staff_id], &busy, &q).unwrap();
        assert!(slots.iter().all(|s| s.start.date_naive() != at(9, 8, 0).date_naive()));
        // Tuesday is open.
        assert!(slots.iter().any(|s| s.start.date_naive() == at(10, 8, 0).date_naive()));
    }

    #[test]
    fn utilization_cap_excludes_overcommitted_staff() {
        let rule = ScheduleRule {
            max_events_per_staff_per_day: 10,
            ..ScheduleRule::default()
        };
        let staff_id = Uuid::new_v4();
        // 450 committed minutes on Monday; one more hour would push the day
        // past 80% of the 600-minute workday.
        let busy = vec![BusyInterval {
            staff_id,
            start: at(9, 8, 0),
            end: at(9, 15, 30),
        }];
        let slots = find_slots(&rule, &[staff_id], &busy, &query(at(9, 8, 0))).unwrap();
        assert!(slots
            .iter()
            .all(|s| s.start.date_naive() != at(9, 8, 0).date_naive()));
        assert!(slots
            .iter()
            .any(|s| s.start.date_naive() == at(10, 8, 0).date_naive()));
    }

    #[test]
    fn less_loaded_staff_breaks_score_ties() {
        let rule = ScheduleRule::default();
        let free_staff = Uuid::new_v4();
        let loaded_staff = Uuid::new_v4();
        let busy = vec![BusyInterval {
            staff_id: loaded_staff,
            start: at(9, 8, 0),
            end: at(9, 9, 0),
        }];
        // Afternoon start keeps both staff clear and scores equal.
        let slots =
            find_slots(&rule, &[free_staff, loaded_staff], &busy, &query(at(9, 13, 0))).unwrap();
        let free_pos = slots
            .iter()
            .position(|s| s.start == at(9, 13, 0) && s.staff_id == free_staff)
            .unwrap();
        let loaded_pos = slots
            .iter()
            .position(|s| s.start == at(9, 13, 0) && s.staff_id == loaded_staff)
            .unwrap();
        assert!(free_pos < loaded_pos);
    }

    #[test]
    fn weekend_yields_no_slots() {
        let rule = ScheduleRule {
            window_days: 1,
            ..ScheduleRule::default()
        };
        let staff = [Uuid::new_v4()];
        // 2026-03-07 is a Saturday; a one-day window never reaches Monday.
        let err = find_slots(&rule, &staff, &[], &query(at(7, 8, 0))).unwrap_err();
        assert_eq!(err, ScheduleError::NoSlotAvailable);
    }

    #[test]
    fn candidate_count_is_capped() {
        let rule = ScheduleRule::default();
        let staff = [Uuid::new_v4(), Uuid::new_v4()];
        let slots = find_slots(&rule, &staff, &[], &query(at(9, 8, 0))).unwrap();
        assert_eq!(slots.len(), rule.max_candidates);
    }

    #[test]
    fn empty_staff_is_invalid() {
        let rule = ScheduleRule::default();
        let err = find_slots(&rule, &[], &[], &query(at(9, 8, 0))).unwrap_err();
        assert!(matches!(err, ScheduleError::InvalidValue(_)));
    }

    #[test]
    fn zero_duration_uses_rule_default() {
        let rule = ScheduleRule::default();
        let staff = [Uuid::new_v4()];
        let q = SlotQuery {
            from: at(9, 8, 0),
            duration_minutes: 0,
            preferred_starts: vec![],
        };
        let slots = find_slots(&rule, &staff, &[], &q).unwrap();
        assert_eq!(slots[0].end - slots[0].start, Duration::minutes(60));
    }

    #[test]
    fn score_slot_penalizes_outside_hours() {
        let rule = ScheduleRule::default();
        let score = score_slot(&rule, at(9, 19, 0), at(9, 20, 0), &[]);
        assert_eq!(score, SCORE_OUTSIDE_HOURS);
    }

    #[test]
    fn score_slot_penalizes_proposed_lunch_overlap() {
        // Directly proposed times bypass the search filter, so the lunch
        // overlap still shows up as a penalty when judging them.
        let rule = ScheduleRule::default();
        let score = score_slot(&rule, at(9, 12, 0), at(9, 13, 0), &[]);
        assert_eq!(score, SCORE_LUNCH_OVERLAP);
    }

    #[test]
    fn slot_is_offered_requires_exact_match() {
        let staff_id = Uuid::new_v4();
        let candidates = vec![SlotCandidate {
            start: at(9, 9, 0),
            end: at(9, 10, 0),
            staff_id,
            score: 0,
        }];
        assert!(slot_is_offered(&candidates, staff_id, at(9, 9, 0)));
        assert!(!slot_is_offered(&candidates, staff_id, at(9, 9, 15)));
        assert!(!slot_is_offered(&candidates, Uuid::new_v4(), at(9, 9, 0)));
    }

    proptest! {
        /// Every returned slot respects the hard constraints.
        #[test]
        fn found_slots_respect_hard_constraints(
            start_hour in 8u32..18,
            busy_hour in 8u32..17,
        ) {
            let rule = ScheduleRule::default();
            let staff_id = Uuid::new_v4();
            let busy = vec![BusyInterval {
                staff_id,
                start: at(9, busy_hour, 0),
                end: at(9, busy_hour + 1, 0),
            }];
            let q = query(at(9, start_hour, 0));
            if let Ok(slots) = find_slots(&rule, &[staff_id], &busy, &q) {
                let buffer = Duration::minutes(rule.buffer_minutes);
                for s in &slots {
                    prop_assert!(rule.within_working_hours(s.start, s.end));
                    prop_assert!(!rule.overlaps_lunch(s.start, s.end));
                    prop_assert!(s.start.timestamp() % (rule.step_minutes * 60) == 0);
                    for b in &busy {
                        prop_assert!(
                            s.end + buffer <= b.start || s.start >= b.end + buffer
                        );
                    }
                }
                // Best-first ordering.
                for pair in slots.windows(2) {
                    prop_assert!(pair[0].score >= pair[1].score);
                }
            }
        }
    }
}
