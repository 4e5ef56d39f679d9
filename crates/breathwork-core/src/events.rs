use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::breathing::{BreathingPhase, VibrationPattern};

/// Every state change of a session produces an Event.
/// Hosts poll the status handle for progress; lifecycle consumers subscribe here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    SessionStarted {
        session_id: Uuid,
        total_reps: u32,
        pattern: VibrationPattern,
        intensity: f32,
        pulse_duration_ms: f32,
        at: DateTime<Utc>,
    },
    RepStarted {
        session_id: Uuid,
        rep: u32,
        total_reps: u32,
        at: DateTime<Utc>,
    },
    PhaseStarted {
        session_id: Uuid,
        rep: u32,
        phase: BreathingPhase,
        duration_secs: u64,
        at: DateTime<Utc>,
    },
    PhaseCompleted {
        session_id: Uuid,
        rep: u32,
        phase: BreathingPhase,
        at: DateTime<Utc>,
    },
    /// All reps ran; the flourish played and the settle delay elapsed.
    SessionCompleted {
        session_id: Uuid,
        total_reps: u32,
        at: DateTime<Utc>,
    },
    /// The session was stopped before completing.
    SessionStopped {
        session_id: Uuid,
        /// Rep that was in progress when the stop landed.
        rep: u32,
        phase: BreathingPhase,
        at: DateTime<Utc>,
    },
    StateSnapshot {
        is_running: bool,
        phase: BreathingPhase,
        current_rep: u32,
        total_reps: u32,
        phase_progress: f32,
        phase_seconds_remaining: u32,
        at: DateTime<Utc>,
    },
}

impl Event {
    pub fn session_id(&self) -> Option<Uuid> {
        match self {
            Event::SessionStarted { session_id, .. }
            | Event::RepStarted { session_id, .. }
            | Event::PhaseStarted { session_id, .. }
            | Event::PhaseCompleted { session_id, .. }
            | Event::SessionCompleted { session_id, .. }
            | Event::SessionStopped { session_id, .. } => Some(*session_id),
            Event::StateSnapshot { .. } => None,
        }
    }
}

/// Fan-out of session events to any number of subscribers.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<Event>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Receive every event emitted after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }

    /// Emit, ignoring the case where nobody is listening.
    pub fn emit_lossy(&self, event: Event) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialize_with_type_tag() {
        let event = Event::PhaseStarted {
            session_id: Uuid::nil(),
            rep: 1,
            phase: BreathingPhase::Inhale,
            duration_secs: 4,
            at: Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "PhaseStarted");
        assert_eq!(json["phase"], "inhale");
    }

    #[test]
    fn emit_without_subscribers_is_harmless() {
        let bus = EventBus::default();
        bus.emit_lossy(Event::SessionCompleted {
            session_id: Uuid::nil(),
            total_reps: 1,
            at: Utc::now(),
        });
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn subscribers_receive_events() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();
        let id = Uuid::new_v4();
        bus.emit_lossy(Event::RepStarted {
            session_id: id,
            rep: 2,
            total_reps: 3,
            at: Utc::now(),
        });
        let event = rx.recv().await.unwrap();
        assert_eq!(event.session_id(), Some(id));
    }
}
