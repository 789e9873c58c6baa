//! Moderator questions with answer deadlines.
//!
//! During a live session the moderator can pose a directed question to any
//! participant, optionally with a response deadline. The deadline is advisory
//! at answer time: a late answer is accepted but flagged as overdue rather
//! than rejected, so the record shows who answered late without losing
//! testimony.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::HearingError;
use crate::lifecycle::HearingId;
use crate::policy::{QUESTION_DEADLINE_MAX_MINUTES, QUESTION_DEADLINE_MIN_MINUTES};

// ── Identifiers ────────────────────────────────────────────────────────

/// A unique identifier for a posed question.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuestionId(Uuid);

impl QuestionId {
    /// Create a new random question identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a question identifier from an existing UUID.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Access the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for QuestionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for QuestionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "question:{}", self.0)
    }
}

// ── Status ─────────────────────────────────────────────────────────────

/// Lifecycle status of a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuestionStatus {
    /// Awaiting an answer from the addressee.
    Pending,
    /// Answered (possibly late, see [`Question::overdue`]). Terminal.
    Answered,
    /// Withdrawn by the moderator or closed with the session. Terminal.
    Cancelled,
}

impl QuestionStatus {
    /// The canonical string name of this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Answered => "ANSWERED",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// Whether this status is terminal.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl std::fmt::Display for QuestionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ── The question ───────────────────────────────────────────────────────

/// A directed question with an optional answer deadline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    /// Unique question identifier.
    pub id: QuestionId,
    /// The hearing this question was posed in.
    pub hearing_id: HearingId,
    /// The moderator (or admin) who posed it.
    pub asked_by: Uuid,
    /// The participant who must answer.
    pub addressee: Uuid,
    /// The question text.
    pub text: String,
    /// Effective deadline in minutes, after clamping. `None` means the
    /// question carries no deadline at all.
    pub deadline_minutes: Option<i64>,
    /// When the question was posed.
    pub asked_at: DateTime<Utc>,
    /// The instant the answer is due, when a deadline was set.
    pub deadline_at: Option<DateTime<Utc>>,
    /// Current status.
    pub status: QuestionStatus,
    /// The answer text, once given.
    pub answer: Option<String>,
    /// When the answer arrived.
    pub answered_at: Option<DateTime<Utc>>,
    /// Why the question was cancelled, when it was.
    pub cancel_reason: Option<String>,
    /// Set when the answer arrived after the deadline.
    pub overdue: bool,
}

impl Question {
    /// Pose a question to a participant.
    ///
    /// A supplied `deadline_minutes` is clamped into the allowed range rather
    /// than rejected, so a caller asking for 0 gets the 1-minute floor and one
    /// asking for 120 gets the 60-minute ceiling. `None` leaves the question
    /// without a deadline. The caller verifies that the asker holds moderator
    /// powers and that the addressee is on the roster before constructing the
    /// question.
    ///
    /// # Errors
    ///
    /// [`HearingError::InvalidValue`] for empty question text.
    pub fn pose(
        hearing_id: HearingId,
        asked_by: Uuid,
        addressee: Uuid,
        text: &str,
        deadline_minutes: Option<i64>,
        now: DateTime<Utc>,
    ) -> Result<Self, HearingError> {
        if text.trim().is_empty() {
            return Err(HearingError::InvalidValue(
                "question text cannot be empty".to_string(),
            ));
        }
        let deadline_minutes = deadline_minutes
            .map(|m| m.clamp(QUESTION_DEADLINE_MIN_MINUTES, QUESTION_DEADLINE_MAX_MINUTES));
        Ok(Self {
            id: QuestionId::new(),
            hearing_id,
            asked_by,
            addressee,
            text: text.to_string(),
            deadline_minutes,
            asked_at: now,
            deadline_at: deadline_minutes.map(|m| now + Duration::minutes(m)),
            status: QuestionStatus::Pending,
            answer: None,
            answered_at: None,
            cancel_reason: None,
            overdue: false,
        })
    }

    /// Record the addressee's answer.
    ///
    /// An answer arriving after the deadline is still accepted; the question
    /// is marked [`overdue`](Self::overdue) so reports can single it out.
    ///
    /// # Errors
    ///
    /// [`HearingError::NotPermitted`] when someone other than the addressee
    /// answers; [`HearingError::QuestionNotPending`] once terminal;
    /// [`HearingError::InvalidValue`] for an empty answer.
    pub fn answer(
        &mut self,
        user_id: Uuid,
        text: &str,
        now: DateTime<Utc>,
    ) -> Result<(), HearingError> {
        if user_id != self.addressee {
            return Err(HearingError::NotPermitted {
                actor_id: user_id,
                action: "answer a question addressed to someone else".to_string(),
            });
        }
        if text.trim().is_empty() {
            return Err(HearingError::InvalidValue(
                "answer text cannot be empty".to_string(),
            ));
        }
        self.require_pending("answer")?;

        self.answer = Some(text.to_string());
        self.answered_at = Some(now);
        self.overdue = self.deadline_at.is_some_and(|due| now > due);
        self.status = QuestionStatus::Answered;
        Ok(())
    }

    /// Withdraw the question, or close it out with the session.
    ///
    /// # Errors
    ///
    /// [`HearingError::QuestionNotPending`] once terminal.
    pub fn cancel(
        &mut self,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(), HearingError> {
        self.require_pending("cancel")?;
        self.answered_at = None;
        self.cancel_reason = reason;
        self.overdue = self.deadline_at.is_some_and(|due| now > due);
        self.status = QuestionStatus::Cancelled;
        Ok(())
    }

    /// Whether a still-pending question has passed its deadline.
    pub fn is_past_deadline(&self, now: DateTime<Utc>) -> bool {
        self.status == QuestionStatus::Pending && self.deadline_at.is_some_and(|due| now > due)
    }

    fn require_pending(&self, action: &str) -> Result<(), HearingError> {
        if self.status != QuestionStatus::Pending {
            return Err(HearingError::QuestionNotPending {
                status: self.status.as_str().to_string(),
                reason: format!("cannot {action} a {} question", self.status),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn posed(deadline_minutes: Option<i64>) -> (Question, Uuid, DateTime<Utc>) {
        let addressee = Uuid::new_v4();
        let now = Utc::now();
        let question = Question::pose(
            HearingId::new(),
            Uuid::new_v4(),
            addressee,
            "where was the shipment on the 4th?",
            deadline_minutes,
            now,
        )
        .unwrap();
        (question, addressee, now)
    }

    #[test]
    fn pose_sets_deadline_from_minutes() {
        let (q, _, now) = posed(Some(10));
        assert_eq!(q.status, QuestionStatus::Pending);
        assert_eq!(q.deadline_minutes, Some(10));
        assert_eq!(q.deadline_at, Some(now + Duration::minutes(10)));
    }

    #[test]
    fn pose_without_deadline_leaves_it_unset() {
        let (q, _, _) = posed(None);
        assert_eq!(q.deadline_minutes, None);
        assert_eq!(q.deadline_at, None);
    }

    #[test]
    fn deadline_clamps_to_floor() {
        let (q, _, _) = posed(Some(0));
        assert_eq!(q.deadline_minutes, Some(1));
    }

    #[test]
    fn deadline_clamps_to_ceiling() {
        let (q, _, _) = posed(Some(120));
        assert_eq!(q.deadline_minutes, Some(60));
    }

    #[test]
    fn pose_rejects_empty_text() {
        let err = Question::pose(
            HearingId::new(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            "   ",
            Some(5),
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, HearingError::InvalidValue(_)));
    }

    #[test]
    fn answer_on_time_is_not_overdue() {
        let (mut q, addressee, now) = posed(Some(10));
        q.answer(addressee, "in the customs yard", now + Duration::minutes(5))
            .unwrap();
        assert_eq!(q.status, QuestionStatus::Answered);
        assert!(!q.overdue);
        assert_eq!(q.answer.as_deref(), Some("in the customs yard"));
    }

    #[test]
    fn late_answer_is_accepted_and_flagged() {
        let (mut q, addressee, now) = posed(Some(10));
        q.answer(addressee, "in transit", now + Duration::minutes(11))
            .unwrap();
        assert_eq!(q.status, QuestionStatus::Answered);
        assert!(q.overdue);
    }

    #[test]
    fn answer_without_deadline_is_never_overdue() {
        let (mut q, addressee, now) = posed(None);
        q.answer(addressee, "eventually", now + Duration::days(3))
            .unwrap();
        assert!(!q.overdue);
    }

    #[test]
    fn only_addressee_may_answer() {
        let (mut q, _, now) = posed(Some(10));
        let err = q.answer(Uuid::new_v4(), "not mine", now).unwrap_err();
        assert!(matches!(err, HearingError::NotPermitted { .. }));
        assert_eq!(q.status, QuestionStatus::Pending);
    }

    #[test]
    fn answer_rejects_empty_text() {
        let (mut q, addressee, now) = posed(Some(10));
        let err = q.answer(addressee, "", now).unwrap_err();
        assert!(matches!(err, HearingError::InvalidValue(_)));
    }

    #[test]
    fn double_answer_is_rejected() {
        let (mut q, addressee, now) = posed(Some(10));
        q.answer(addressee, "first", now).unwrap();
        let err = q.answer(addressee, "second", now).unwrap_err();
        assert!(matches!(err, HearingError::QuestionNotPending { .. }));
    }

    #[test]
    fn cancel_pending_question_keeps_the_reason() {
        let (mut q, _, now) = posed(Some(10));
        q.cancel(Some("withdrawn by moderator".to_string()), now)
            .unwrap();
        assert_eq!(q.status, QuestionStatus::Cancelled);
        assert_eq!(q.cancel_reason.as_deref(), Some("withdrawn by moderator"));
    }

    #[test]
    fn cancel_answered_question_is_rejected() {
        let (mut q, addressee, now) = posed(Some(10));
        q.answer(addressee, "done", now).unwrap();
        let err = q.cancel(None, now).unwrap_err();
        assert!(matches!(err, HearingError::QuestionNotPending { .. }));
    }

    #[test]
    fn pending_past_deadline_is_detected() {
        let (q, _, now) = posed(Some(10));
        assert!(!q.is_past_deadline(now + Duration::minutes(9)));
        assert!(q.is_past_deadline(now + Duration::minutes(11)));
    }

    #[test]
    fn pending_without_deadline_is_never_past_due() {
        let (q, _, now) = posed(None);
        assert!(!q.is_past_deadline(now + Duration::days(30)));
    }

    #[test]
    fn question_serializes_round_trip() {
        let (q, _, _) = posed(Some(10));
        let json = serde_json::to_string(&q).unwrap();
        let back: Question = serde_json::from_str(&json).unwrap();
        assert_eq!(q, back);
    }
}
