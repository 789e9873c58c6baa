//! Statements posted to the hearing record.
//!
//! The record is append-only. A statement is never deleted; moderator
//! redaction hides the body while keeping the entry and its authorship in
//! the transcript. Posting rights are gated by the floor setting, which the
//! API layer checks via `Hearing::ensure_may_post` inside the same critical
//! section that serializes floor changes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::HearingError;
use crate::lifecycle::HearingId;
use crate::participant::ParticipantRole;
use crate::policy::MAX_STATEMENTS_PER_TYPE;

// ── Identifiers ────────────────────────────────────────────────────────

/// A unique identifier for a statement.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StatementId(Uuid);

impl StatementId {
    /// Create a new random statement identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a statement identifier from an existing UUID.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Access the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for StatementId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for StatementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "statement:{}", self.0)
    }
}

// ── Statement type ─────────────────────────────────────────────────────

/// The kind of contribution a statement makes to the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatementType {
    /// Opening position statement.
    Opening,
    /// Evidence submission or reference.
    Evidence,
    /// Response to another party's statement.
    Rebuttal,
    /// Closing argument.
    Closing,
    /// General remark outside the formal sequence.
    Comment,
}

impl StatementType {
    /// All statement types.
    pub fn all() -> [StatementType; 5] {
        [
            Self::Opening,
            Self::Evidence,
            Self::Rebuttal,
            Self::Closing,
            Self::Comment,
        ]
    }

    /// The canonical string name of this type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Opening => "OPENING",
            Self::Evidence => "EVIDENCE",
            Self::Rebuttal => "REBUTTAL",
            Self::Closing => "CLOSING",
            Self::Comment => "COMMENT",
        }
    }
}

impl std::fmt::Display for StatementType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Check a per-author, per-type posting quota before accepting a statement.
///
/// `existing` is how many non-draft statements of this type the author has
/// already posted to the hearing (redacted ones still count, drafts do not).
///
/// # Errors
///
/// [`HearingError::StatementLimit`] when the quota is exhausted.
pub fn ensure_within_limit(
    statement_type: StatementType,
    existing: usize,
) -> Result<(), HearingError> {
    if existing >= MAX_STATEMENTS_PER_TYPE {
        return Err(HearingError::StatementLimit {
            statement_type: statement_type.as_str().to_string(),
            limit: MAX_STATEMENTS_PER_TYPE,
        });
    }
    Ok(())
}

// ── The statement ──────────────────────────────────────────────────────

/// One entry in a hearing's transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    /// Unique statement identifier.
    pub id: StatementId,
    /// The hearing this statement belongs to.
    pub hearing_id: HearingId,
    /// The posting participant.
    pub author_id: Uuid,
    /// The author's hearing role when the statement was accepted.
    pub author_role: ParticipantRole,
    /// Contribution kind.
    pub statement_type: StatementType,
    /// The statement text. Retained verbatim even after redaction.
    pub body: String,
    /// Drafts are visible only to their author and do not count against
    /// the posting quota until published.
    pub draft: bool,
    /// When the statement was accepted.
    pub posted_at: DateTime<Utc>,
    /// Whether a moderator redacted the statement.
    pub redacted: bool,
    /// Who redacted it.
    pub redacted_by: Option<Uuid>,
    /// When it was redacted.
    pub redacted_at: Option<DateTime<Utc>>,
    /// Why it was redacted. Stays visible in transcript views.
    pub redaction_reason: Option<String>,
}

impl Statement {
    /// Accept a new statement into the record.
    ///
    /// # Errors
    ///
    /// [`HearingError::InvalidValue`] for an empty body.
    pub fn post(
        hearing_id: HearingId,
        author_id: Uuid,
        author_role: ParticipantRole,
        statement_type: StatementType,
        body: &str,
        draft: bool,
        now: DateTime<Utc>,
    ) -> Result<Self, HearingError> {
        if body.trim().is_empty() {
            return Err(HearingError::InvalidValue(
                "statement body cannot be empty".to_string(),
            ));
        }
        Ok(Self {
            id: StatementId::new(),
            hearing_id,
            author_id,
            author_role,
            statement_type,
            body: body.to_string(),
            draft,
            posted_at: now,
            redacted: false,
            redacted_by: None,
            redacted_at: None,
            redaction_reason: None,
        })
    }

    /// Publish a draft, making it part of the visible record.
    ///
    /// The caller re-checks the posting quota first; a published draft counts
    /// like a fresh post.
    ///
    /// # Errors
    ///
    /// [`HearingError::NotPermitted`] when anyone but the author publishes;
    /// [`HearingError::InvalidValue`] when the statement is not a draft.
    pub fn publish(&mut self, user_id: Uuid, now: DateTime<Utc>) -> Result<(), HearingError> {
        if user_id != self.author_id {
            return Err(HearingError::NotPermitted {
                actor_id: user_id,
                action: "publish someone else's draft".to_string(),
            });
        }
        if !self.draft {
            return Err(HearingError::InvalidValue(
                "statement is not a draft".to_string(),
            ));
        }
        self.draft = false;
        self.posted_at = now;
        Ok(())
    }

    /// Redact the statement, hiding its body from transcript views.
    ///
    /// The caller verifies moderator powers before invoking this. The reason
    /// is required and remains visible where the body is not.
    ///
    /// # Errors
    ///
    /// [`HearingError::AlreadyRedacted`] on a second redaction;
    /// [`HearingError::InvalidValue`] for an empty reason.
    pub fn redact(
        &mut self,
        redacted_by: Uuid,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<(), HearingError> {
        if reason.trim().is_empty() {
            return Err(HearingError::InvalidValue(
                "a redaction reason is required".to_string(),
            ));
        }
        if self.redacted {
            return Err(HearingError::AlreadyRedacted);
        }
        self.redacted = true;
        self.redacted_by = Some(redacted_by);
        self.redacted_at = Some(now);
        self.redaction_reason = Some(reason.to_string());
        Ok(())
    }

    /// The body as it should appear in transcript views.
    pub fn visible_body(&self) -> Option<&str> {
        if self.redacted {
            None
        } else {
            Some(&self.body)
        }
    }
}
