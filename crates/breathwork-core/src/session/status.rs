//! Observable session status.
//!
//! One [`StatusPublisher`] per session engine writes; any number of
//! [`StatusHandle`]s read. Built on a `tokio::sync::watch` channel so readers
//! can either poll the latest snapshot or await the next change.

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::breathing::BreathingPhase;

/// Published state of the exercise.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SessionStatus {
    pub is_running: bool,
    pub phase: BreathingPhase,
    /// 1-based while running, 0 when idle.
    pub current_rep: u32,
    pub total_reps: u32,
    /// 0.0 .. 1.0 within the current phase.
    pub phase_progress: f32,
    pub phase_seconds_remaining: u32,
}

impl SessionStatus {
    /// The state at construction and after every stop.
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn is_idle(&self) -> bool {
        *self == Self::idle()
    }
}

/// Write side. Owned by the session engine only.
#[derive(Debug)]
pub(crate) struct StatusPublisher {
    tx: watch::Sender<SessionStatus>,
}

impl StatusPublisher {
    pub(crate) fn new() -> Self {
        let (tx, _) = watch::channel(SessionStatus::idle());
        Self { tx }
    }

    pub(crate) fn handle(&self) -> StatusHandle {
        StatusHandle {
            rx: self.tx.subscribe(),
        }
    }

    pub(crate) fn current(&self) -> SessionStatus {
        *self.tx.borrow()
    }

    pub(crate) fn begin(&self, total_reps: u32) {
        self.tx.send_modify(|s| {
            s.is_running = true;
            s.total_reps = total_reps;
            s.current_rep = 0;
        });
    }

    pub(crate) fn set_rep(&self, rep: u32) {
        self.tx.send_modify(|s| s.current_rep = rep);
    }

    /// Enter `phase` with progress reset to 0.
    pub(crate) fn enter_phase(&self, phase: BreathingPhase) {
        self.tx.send_modify(|s| {
            s.phase = phase;
            s.phase_progress = 0.0;
            s.phase_seconds_remaining = phase.duration_secs() as u32;
        });
    }

    /// Publish progress; never moves backwards within a phase.
    pub(crate) fn progress(&self, progress: f32, seconds_remaining: u32) {
        self.tx.send_if_modified(|s| {
            let progress = progress.clamp(s.phase_progress, 1.0);
            let changed =
                progress != s.phase_progress || seconds_remaining != s.phase_seconds_remaining;
            s.phase_progress = progress;
            s.phase_seconds_remaining = seconds_remaining;
            changed
        });
    }

    pub(crate) fn finish_phase(&self) {
        self.progress(1.0, 0);
    }

    pub(crate) fn complete(&self) {
        self.tx.send_modify(|s| {
            s.phase = BreathingPhase::Complete;
            s.phase_progress = 1.0;
            s.phase_seconds_remaining = 0;
        });
    }

    pub(crate) fn reset(&self) {
        self.tx.send_if_modified(|s| {
            let changed = !s.is_idle();
            *s = SessionStatus::idle();
            changed
        });
    }
}

/// Read-only view of the session status. Cheap to clone.
#[derive(Debug, Clone)]
pub struct StatusHandle {
    rx: watch::Receiver<SessionStatus>,
}

impl StatusHandle {
    /// Latest published status.
    pub fn snapshot(&self) -> SessionStatus {
        *self.rx.borrow()
    }

    /// Wait for the next change and return it.
    ///
    /// Returns `None` once the session engine has been dropped.
    pub async fn changed(&mut self) -> Option<SessionStatus> {
        self.rx.changed().await.ok()?;
        Some(*self.rx.borrow_and_update())
    }

    /// Wait until `predicate` holds, returning the matching status.
    pub async fn wait_for(
        &mut self,
        mut predicate: impl FnMut(&SessionStatus) -> bool,
    ) -> Option<SessionStatus> {
        self.rx.wait_for(|s| predicate(s)).await.ok().map(|s| *s)
    }
}
