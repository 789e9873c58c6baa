//! The reschedule request lifecycle.
//!
//! A participant who cannot attend opens a request against a scheduled
//! hearing, optionally proposing a new start. The request is resolved
//! exactly once: approved or rejected by an authorized approver, resolved
//! automatically by the allocator, or withdrawn by the requester. Approval
//! never moves the hearing in place; the resolver records the successor
//! hearing the approval created.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use tribunal_hearing::HearingId;

use crate::error::ScheduleError;
use crate::rule::ScheduleRule;

// ── Identifiers ────────────────────────────────────────────────────────

/// A unique identifier for a reschedule request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RescheduleRequestId(Uuid);

impl RescheduleRequestId {
    /// Create a new random request identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a request identifier from an existing UUID.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Access the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RescheduleRequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RescheduleRequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "reschedule:{}", self.0)
    }
}

// ── Status ─────────────────────────────────────────────────────────────

/// Resolution state of a reschedule request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RescheduleStatus {
    /// Awaiting resolution.
    Pending,
    /// Granted by an approver. Terminal.
    Approved,
    /// Declined by an approver. Terminal.
    Rejected,
    /// Granted automatically by the allocator. Terminal.
    AutoResolved,
    /// Withdrawn by the requester. Terminal.
    Withdrawn,
}

impl RescheduleStatus {
    /// The canonical string name of this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
            Self::AutoResolved => "AUTO_RESOLVED",
            Self::Withdrawn => "WITHDRAWN",
        }
    }

    /// Whether this status is terminal.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl std::fmt::Display for RescheduleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ── The request ────────────────────────────────────────────────────────

/// A request to move a scheduled hearing to a new time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RescheduleRequest {
    /// Unique request identifier.
    pub id: RescheduleRequestId,
    /// The hearing the request targets.
    pub hearing_id: HearingId,
    /// The participant who opened the request.
    pub requested_by: Uuid,
    /// Why the current time does not work.
    pub reason: String,
    /// A start the requester proposes directly, if any.
    pub proposed_start: Option<DateTime<Utc>>,
    /// Additional starts the requester would accept.
    pub preferred_starts: Vec<DateTime<Utc>>,
    /// Let the allocator pick a slot when no proposal is workable.
    pub auto_schedule: bool,
    /// Resolution state.
    pub status: RescheduleStatus,
    /// When the request was opened.
    pub created_at: DateTime<Utc>,
    /// Who resolved it. None for automatic resolution.
    pub processed_by: Option<Uuid>,
    /// When it was resolved.
    pub processed_at: Option<DateTime<Utc>>,
    /// Resolver's note, such as a rejection reason.
    pub process_note: Option<String>,
    /// The start the resolution settled on.
    pub selected_start: Option<DateTime<Utc>>,
    /// The successor hearing an approval created.
    pub new_hearing_id: Option<HearingId>,
}

impl RescheduleRequest {
    /// Check that a hearing may take a reschedule request at all.
    ///
    /// Admins are exempt from the notice cutoff; the chain limit binds
    /// everyone.
    ///
    /// # Errors
    ///
    /// [`ScheduleError::RescheduleLimit`] when the chain is exhausted;
    /// [`ScheduleError::NoticeTooShort`] inside the cutoff window.
    pub fn check_admissible(
        rule: &ScheduleRule,
        scheduled_at: DateTime<Utc>,
        reschedule_count: u32,
        is_admin: bool,
        now: DateTime<Utc>,
    ) -> Result<(), ScheduleError> {
        if reschedule_count >= rule.max_reschedule_count {
            return Err(ScheduleError::RescheduleLimit {
                count: reschedule_count,
                max: rule.max_reschedule_count,
            });
        }
        if !is_admin && scheduled_at - now < Duration::hours(rule.min_reschedule_notice_hours) {
            return Err(ScheduleError::NoticeTooShort {
                required_hours: rule.min_reschedule_notice_hours,
            });
        }
        Ok(())
    }

    /// Open a request in the [`Pending`](RescheduleStatus::Pending) state.
    ///
    /// # Errors
    ///
    /// [`ScheduleError::InvalidValue`] for an empty reason, or when the
    /// request neither proposes a start nor asks for automatic scheduling.
    pub fn open(
        hearing_id: HearingId,
        requested_by: Uuid,
        reason: &str,
        proposed_start: Option<DateTime<Utc>>,
        preferred_starts: Vec<DateTime<Utc>>,
        auto_schedule: bool,
        now: DateTime<Utc>,
    ) -> Result<Self, ScheduleError> {
        if reason.trim().is_empty() {
            return Err(ScheduleError::InvalidValue(
                "a reschedule reason is required".to_string(),
            ));
        }
        if proposed_start.is_none() && preferred_starts.is_empty() && !auto_schedule {
            return Err(ScheduleError::InvalidValue(
                "propose at least one start or request automatic scheduling".to_string(),
            ));
        }
        Ok(Self {
            id: RescheduleRequestId::new(),
            hearing_id,
            requested_by,
            reason: reason.to_string(),
            proposed_start,
            preferred_starts,
            auto_schedule,
            status: RescheduleStatus::Pending,
            created_at: now,
            processed_by: None,
            processed_at: None,
            process_note: None,
            selected_start: None,
            new_hearing_id: None,
        })
    }

    /// Whether `start` is one of the instants the requester put forward.
    pub fn proposes(&self, start: DateTime<Utc>) -> bool {
        self.proposed_start == Some(start) || self.preferred_starts.contains(&start)
    }

    /// Approve the request, recording the successor hearing.
    ///
    /// # Errors
    ///
    /// [`ScheduleError::AlreadyProcessed`] once terminal.
    pub fn approve(
        &mut self,
        processed_by: Uuid,
        selected_start: DateTime<Utc>,
        new_hearing_id: HearingId,
        note: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(), ScheduleError> {
        self.require_pending()?;
        self.status = RescheduleStatus::Approved;
        self.processed_by = Some(processed_by);
        self.processed_at = Some(now);
        self.process_note = note;
        self.selected_start = Some(selected_start);
        self.new_hearing_id = Some(new_hearing_id);
        Ok(())
    }

    /// Resolve the request automatically with an allocator-chosen slot.
    ///
    /// # Errors
    ///
    /// [`ScheduleError::AlreadyProcessed`] once terminal.
    pub fn auto_resolve(
        &mut self,
        selected_start: DateTime<Utc>,
        new_hearing_id: HearingId,
        note: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(), ScheduleError> {
        self.require_pending()?;
        self.status = RescheduleStatus::AutoResolved;
        self.processed_by = None;
        self.processed_at = Some(now);
        self.process_note = note;
        self.selected_start = Some(selected_start);
        self.new_hearing_id = Some(new_hearing_id);
        Ok(())
    }

    /// Decline the request with a reason.
    ///
    /// # Errors
    ///
    /// [`ScheduleError::AlreadyProcessed`] once terminal;
    /// [`ScheduleError::InvalidValue`] for an empty note.
    pub fn reject(
        &mut self,
        processed_by: Uuid,
        note: &str,
        now: DateTime<Utc>,
    ) -> Result<(), ScheduleError> {
        if note.trim().is_empty() {
            return Err(ScheduleError::InvalidValue(
                "a rejection note is required".to_string(),
            ));
        }
        self.require_pending()?;
        self.status = RescheduleStatus::Rejected;
        self.processed_by = Some(processed_by);
        self.processed_at = Some(now);
        self.process_note = Some(note.to_string());
        Ok(())
    }

    /// Withdraw the request. Only the requester may do this.
    ///
    /// # Errors
    ///
    /// [`ScheduleError::NotPermitted`] for anyone else;
    /// [`ScheduleError::AlreadyProcessed`] once terminal.
    pub fn withdraw(&mut self, user_id: Uuid, now: DateTime<Utc>) -> Result<(), ScheduleError> {
        if user_id != self.requested_by {
            return Err(ScheduleError::NotPermitted {
                actor_id: user_id,
                action: "withdraw another participant's request".to_string(),
            });
        }
        self.require_pending()?;
        self.status = RescheduleStatus::Withdrawn;
        self.processed_by = Some(user_id);
        self.processed_at = Some(now);
        Ok(())
    }

    fn require_pending(&self) -> Result<(), ScheduleError> {
        if self.status != RescheduleStatus::Pending {
            return Err(ScheduleError::AlreadyProcessed {
                status: self.status.as_str().to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opened() -> (RescheduleRequest, Uuid, DateTime<Utc>) {
        let requester = Uuid::new_v4();
        let now = Utc::now();
        let request = RescheduleRequest::open(
            HearingId::new(),
            requester,
            "travel conflict",
            Some(now + Duration::days(3)),
            vec![],
            false,
            now,
        )
        .unwrap();
        (request, requester, now)
    }

    #[test]
    fn open_creates_pending_request() {
        let (request, requester, now) = opened();
        assert_eq!(request.status, RescheduleStatus::Pending);
        assert_eq!(request.requested_by, requester);
        assert_eq!(request.created_at, now);
        assert!(request.processed_at.is_none());
    }

    #[test]
    fn open_requires_reason() {
        let err = RescheduleRequest::open(
            HearingId::new(),
            Uuid::new_v4(),
            "",
            None,
            vec![],
            true,
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, ScheduleError::InvalidValue(_)));
    }

    #[test]
    fn open_requires_a_proposal_or_auto_schedule() {
        let err = RescheduleRequest::open(
            HearingId::new(),
            Uuid::new_v4(),
            "travel conflict",
            None,
            vec![],
            false,
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, ScheduleError::InvalidValue(_)));

        let request = RescheduleRequest::open(
            HearingId::new(),
            Uuid::new_v4(),
            "travel conflict",
            None,
            vec![],
            true,
            Utc::now(),
        )
        .unwrap();
        assert!(request.auto_schedule);
    }

    #[test]
    fn proposes_matches_direct_and_preferred_starts() {
        let now = Utc::now();
        let preferred = now + Duration::days(4);
        let request = RescheduleRequest::open(
            HearingId::new(),
            Uuid::new_v4(),
            "travel conflict",
            Some(now + Duration::days(3)),
            vec![preferred],
            false,
            now,
        )
        .unwrap();
        assert!(request.proposes(now + Duration::days(3)));
        assert!(request.proposes(preferred));
        assert!(!request.proposes(now + Duration::days(5)));
    }

    #[test]
    fn approve_records_resolution() {
        let (mut request, _, now) = opened();
        let approver = Uuid::new_v4();
        let successor = HearingId::new();
        let start = now + Duration::days(3);
        request
            .approve(approver, start, successor.clone(), None, now)
            .unwrap();
        assert_eq!(request.status, RescheduleStatus::Approved);
        assert_eq!(request.processed_by, Some(approver));
        assert_eq!(request.selected_start, Some(start));
        assert_eq!(request.new_hearing_id, Some(successor));
    }

    #[test]
    fn auto_resolve_has_no_processor() {
        let (mut request, _, now) = opened();
        let start = now + Duration::days(2);
        request
            .auto_resolve(start, HearingId::new(), Some("allocator pick".to_string()), now)
            .unwrap();
        assert_eq!(request.status, RescheduleStatus::AutoResolved);
        assert!(request.processed_by.is_none());
        assert_eq!(request.process_note.as_deref(), Some("allocator pick"));
    }

    #[test]
    fn reject_requires_note() {
        let (mut request, _, now) = opened();
        let err = request.reject(Uuid::new_v4(), " ", now).unwrap_err();
        assert!(matches!(err, ScheduleError::InvalidValue(_)));
        assert_eq!(request.status, RescheduleStatus::Pending);
    }

    #[test]
    fn double_resolution_is_rejected() {
        let (mut request, _, now) = opened();
        request
            .reject(Uuid::new_v4(), "slot is no longer available", now)
            .unwrap();
        let err = request
            .approve(Uuid::new_v4(), now, HearingId::new(), None, now)
            .unwrap_err();
        assert_eq!(
            err,
            ScheduleError::AlreadyProcessed {
                status: "REJECTED".to_string()
            }
        );
    }

    #[test]
    fn only_requester_may_withdraw() {
        let (mut request, requester, now) = opened();
        let err = request.withdraw(Uuid::new_v4(), now).unwrap_err();
        assert!(matches!(err, ScheduleError::NotPermitted { .. }));
        request.withdraw(requester, now).unwrap();
        assert_eq!(request.status, RescheduleStatus::Withdrawn);
    }

    #[test]
    fn admissibility_enforces_limit_and_cutoff() {
        let rule = ScheduleRule::default();
        let now = Utc::now();
        let scheduled = now + Duration::days(3);

        assert!(RescheduleRequest::check_admissible(&rule, scheduled, 0, false, now).is_ok());
        assert_eq!(
            RescheduleRequest::check_admissible(&rule, scheduled, 3, false, now).unwrap_err(),
            ScheduleError::RescheduleLimit { count: 3, max: 3 }
        );
        assert_eq!(
            RescheduleRequest::check_admissible(&rule, now + Duration::hours(1), 0, false, now)
                .unwrap_err(),
            ScheduleError::NoticeTooShort { required_hours: 2 }
        );
    }

    #[test]
    fn admins_bypass_the_notice_cutoff_but_not_the_limit() {
        let rule = ScheduleRule::default();
        let now = Utc::now();
        let imminent = now + Duration::hours(1);

        assert!(RescheduleRequest::check_admissible(&rule, imminent, 0, true, now).is_ok());
        assert_eq!(
            RescheduleRequest::check_admissible(&rule, imminent, 3, true, now).unwrap_err(),
            ScheduleError::RescheduleLimit { count: 3, max: 3 }
        );
    }

    #[test]
    fn request_serializes_round_trip() {
        let (request, _, _) = opened();
        let json = serde_json::to_string(&request).unwrap();
        let back: RescheduleRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(request, back);
    }

    #[test]
    fn status_strings_are_canonical() {
        assert_eq!(RescheduleStatus::Pending.as_str(), "PENDING");
        assert_eq!(RescheduleStatus::AutoResolved.as_str(), "AUTO_RESOLVED");
        assert!(!RescheduleStatus::Pending.is_terminal());
        assert!(RescheduleStatus::Withdrawn.is_terminal());
    }
}
