//! Per-hearing session event fan-out.
//!
//! Every accepted mutation publishes a [`SessionEvent`] on the hearing's
//! broadcast channel. Channels are created lazily on first use and publish
//! never blocks: with no live subscriber the event is dropped, matching
//! fire-and-forget notification semantics.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Buffered events per hearing channel before lagged subscribers drop.
const CHANNEL_CAPACITY: usize = 64;

/// What happened inside a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionEventKind {
    /// A hearing was scheduled.
    HearingScheduled,
    /// The session went live.
    HearingStarted,
    /// The session concluded.
    HearingConcluded,
    /// The hearing was cancelled.
    HearingCancelled,
    /// The hearing was superseded by a reschedule.
    HearingRescheduled,
    /// The floor setting changed.
    SpeakerControlChanged,
    /// A participant confirmed attendance.
    AttendanceConfirmed,
    /// A participant joined or left.
    PresenceChanged,
    /// A statement entered the transcript.
    StatementPosted,
    /// A statement was redacted.
    StatementRedacted,
    /// The moderator posed a question.
    QuestionPosed,
    /// A question was answered.
    QuestionAnswered,
    /// A question was cancelled.
    QuestionCancelled,
    /// A reschedule request was opened.
    RescheduleRequested,
    /// A reschedule request was resolved.
    RescheduleResolved,
}

impl SessionEventKind {
    /// The canonical string name of this event kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HearingScheduled => "HEARING_SCHEDULED",
            Self::HearingStarted => "HEARING_STARTED",
            Self::HearingConcluded => "HEARING_CONCLUDED",
            Self::HearingCancelled => "HEARING_CANCELLED",
            Self::HearingRescheduled => "HEARING_RESCHEDULED",
            Self::SpeakerControlChanged => "SPEAKER_CONTROL_CHANGED",
            Self::AttendanceConfirmed => "ATTENDANCE_CONFIRMED",
            Self::PresenceChanged => "PRESENCE_CHANGED",
            Self::StatementPosted => "STATEMENT_POSTED",
            Self::StatementRedacted => "STATEMENT_REDACTED",
            Self::QuestionPosed => "QUESTION_POSED",
            Self::QuestionAnswered => "QUESTION_ANSWERED",
            Self::QuestionCancelled => "QUESTION_CANCELLED",
            Self::RescheduleRequested => "RESCHEDULE_REQUESTED",
            Self::RescheduleResolved => "RESCHEDULE_RESOLVED",
        }
    }
}

impl std::fmt::Display for SessionEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One session event, addressed to a hearing's channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionEvent {
    /// What happened.
    pub kind: SessionEventKind,
    /// The hearing the event belongs to.
    pub hearing_id: Uuid,
    /// Kind-specific details.
    pub payload: serde_json::Value,
    /// When the event was published.
    pub occurred_at: DateTime<Utc>,
}

impl SessionEvent {
    /// Build an event stamped with the current time.
    pub fn now(kind: SessionEventKind, hearing_id: Uuid, payload: serde_json::Value) -> Self {
        Self {
            kind,
            hearing_id,
            payload,
            occurred_at: Utc::now(),
        }
    }
}

/// Lazily-created broadcast channels, one per hearing.
#[derive(Debug, Default)]
pub struct EventBus {
    channels: DashMap<Uuid, broadcast::Sender<SessionEvent>>,
}

impl EventBus {
    /// Create an empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish an event to the hearing's channel.
    ///
    /// Returns the number of subscribers that received it. Zero when the
    /// channel does not exist yet or nobody is listening.
    pub fn publish(&self, event: SessionEvent) -> usize {
        match self.channels.get(&event.hearing_id) {
            Some(sender) => sender.send(event).unwrap_or(0),
            None => 0,
        }
    }

    /// Subscribe to a hearing's events, creating the channel if needed.
    pub fn subscribe(&self, hearing_id: Uuid) -> broadcast::Receiver<SessionEvent> {
        self.channels
            .entry(hearing_id)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }

    /// Drop a hearing's channel once the hearing reaches a terminal state.
    pub fn close(&self, hearing_id: &Uuid) {
        self.channels.remove(hearing_id);
    }

    /// Number of hearings with an open channel.
    pub fn open_channels(&self) -> usize {
        self.channels.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn subscriber_receives_published_event() {
        let bus = EventBus::new();
        let hearing_id = Uuid::new_v4();
        let mut rx = bus.subscribe(hearing_id);

        let delivered = bus.publish(SessionEvent::now(
            SessionEventKind::HearingStarted,
            hearing_id,
            json!({}),
        ));
        assert_eq!(delivered, 1);

        let event = rx.recv().await.unwrap();
        assert_eq!(event.kind, SessionEventKind::HearingStarted);
        assert_eq!(event.hearing_id, hearing_id);
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_dropped() {
        let bus = EventBus::new();
        let delivered = bus.publish(SessionEvent::now(
            SessionEventKind::StatementPosted,
            Uuid::new_v4(),
            json!({}),
        ));
        assert_eq!(delivered, 0);
    }

    #[tokio::test]
    async fn channels_are_isolated_per_hearing() {
        let bus = EventBus::new();
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        let mut rx = bus.subscribe(first);
        bus.subscribe(second);

        bus.publish(SessionEvent::now(
            SessionEventKind::QuestionPosed,
            second,
            json!({}),
        ));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn close_removes_channel() {
        let bus = EventBus::new();
        let hearing_id = Uuid::new_v4();
        bus.subscribe(hearing_id);
        assert_eq!(bus.open_channels(), 1);
        bus.close(&hearing_id);
        assert_eq!(bus.open_channels(), 0);
    }

    #[test]
    fn event_kind_strings_are_canonical() {
        assert_eq!(
            SessionEventKind::SpeakerControlChanged.as_str(),
            "SPEAKER_CONTROL_CHANGED"
        );
        assert_eq!(
            SessionEventKind::RescheduleResolved.to_string(),
            "RESCHEDULE_RESOLVED"
        );
    }
}
