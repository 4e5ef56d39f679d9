//! Session engine.
//!
//! Drives one exercise as a single sequential Tokio task. Every timed wait
//! is a cancellable sleep followed by a check of the session's cancellation
//! token, so a stop lands at the next suspension point and unwinds the whole
//! rep/phase loop through `?`.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Running -> (Inhale -> Hold -> Exhale) x reps -> Complete -> Idle
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let session = BreathingSession::new(actuator, Arc::new(NullHost));
//! session.start(SessionConfig::default());
//! let status = session.status();
//! // later
//! session.stop().await;
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::config::SessionConfig;
use super::host::{SessionHost, StopHandle};
use super::status::{StatusHandle, StatusPublisher};
use crate::breathing::BreathingPhase;
use crate::events::{Event, EventBus};
use crate::haptics::{synthesize, HapticActuator};

pub const TICK_INTERVAL: Duration = Duration::from_millis(50);
pub const TRANSITION_PAUSE: Duration = Duration::from_millis(100);
pub const SETTLE_DELAY: Duration = Duration::from_millis(2000);
pub const DEFAULT_KEEP_AWAKE: Duration = Duration::from_secs(10 * 60);

/// Wait lengths used by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTiming {
    /// Progress publication interval.
    pub tick: Duration,
    /// Gap between the transition cue and the phase waveform.
    pub transition_pause: Duration,
    /// Time the completion flourish gets before teardown.
    pub settle_delay: Duration,
    /// Upper bound requested for the keep-awake hold.
    pub keep_awake_max: Duration,
}

impl Default for SessionTiming {
    fn default() -> Self {
        Self {
            tick: TICK_INTERVAL,
            transition_pause: TRANSITION_PAUSE,
            settle_delay: SETTLE_DELAY,
            keep_awake_max: DEFAULT_KEEP_AWAKE,
        }
    }
}

/// Cancellation observed at a suspension point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Interrupted;

struct ActiveRun {
    id: Uuid,
    token: CancellationToken,
    task: Option<JoinHandle<Event>>,
}

struct Engine {
    actuator: HapticActuator,
    host: Arc<dyn SessionHost>,
    status: StatusPublisher,
    events: EventBus,
    timing: SessionTiming,
    active: Mutex<Option<ActiveRun>>,
}

/// The breathing session controller.
///
/// A host builds exactly one of these; clones share the same engine and the
/// same status.
#[derive(Clone)]
pub struct BreathingSession {
    engine: Arc<Engine>,
}

impl BreathingSession {
    pub fn new(actuator: HapticActuator, host: Arc<dyn SessionHost>) -> Self {
        Self::with_timing(actuator, host, SessionTiming::default())
    }

    pub fn with_timing(
        actuator: HapticActuator,
        host: Arc<dyn SessionHost>,
        timing: SessionTiming,
    ) -> Self {
        Self {
            engine: Arc::new(Engine {
                actuator,
                host,
                status: StatusPublisher::new(),
                events: EventBus::default(),
                timing,
                active: Mutex::new(None),
            }),
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    /// Read-only view of the live status.
    pub fn status(&self) -> StatusHandle {
        self.engine.status.handle()
    }

    /// Lifecycle events emitted after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.engine.events.subscribe()
    }

    pub fn is_running(&self) -> bool {
        self.engine.slot().is_some()
    }

    /// Handle that stops the current session, if one is running.
    pub fn stop_handle(&self) -> Option<StopHandle> {
        self.engine
            .slot()
            .as_ref()
            .map(|run| StopHandle::new(run.token.clone()))
    }

    /// Build a full state snapshot event.
    pub fn snapshot(&self) -> Event {
        let s = self.engine.status.current();
        Event::StateSnapshot {
            is_running: s.is_running,
            phase: s.phase,
            current_rep: s.current_rep,
            total_reps: s.total_reps,
            phase_progress: s.phase_progress,
            phase_seconds_remaining: s.phase_seconds_remaining,
            at: Utc::now(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Begin a session on the current Tokio runtime.
    ///
    /// Returns `None` without touching the running session when one is
    /// already active. Host callbacks run on the session task, never under
    /// the session lock.
    pub fn start(&self, config: SessionConfig) -> Option<Event> {
        let engine = &self.engine;
        let mut slot = engine.slot();
        if slot.is_some() {
            debug!("start ignored: a session is already running");
            return None;
        }

        let session_id = Uuid::new_v4();
        let token = CancellationToken::new();
        *slot = Some(ActiveRun {
            id: session_id,
            token: token.clone(),
            task: None,
        });

        engine.status.begin(config.repetitions());

        let event = Event::SessionStarted {
            session_id,
            total_reps: config.repetitions(),
            pattern: config.pattern(),
            intensity: config.intensity(),
            pulse_duration_ms: config.pulse_duration_ms(),
            at: Utc::now(),
        };
        engine.events.emit_lossy(event.clone());
        info!(
            %session_id,
            reps = config.repetitions(),
            pattern = config.pattern().key(),
            intensity = config.intensity(),
            "breathing session started"
        );

        let task = tokio::spawn(Arc::clone(engine).run(session_id, config, token));
        if let Some(run) = slot.as_mut() {
            run.task = Some(task);
        }
        Some(event)
    }

    /// End the current session, if any, and wait for its teardown.
    ///
    /// Returns the session's final event, or `None` when nothing was
    /// running. Idle defaults are restored either way.
    pub async fn stop(&self) -> Option<Event> {
        let pending = {
            let mut slot = self.engine.slot();
            slot.as_mut().map(|run| {
                run.token.cancel();
                (run.id, run.task.take())
            })
        };

        match pending {
            Some((id, Some(task))) => match task.await {
                Ok(event) => Some(event),
                Err(err) => {
                    warn!(session_id = %id, error = %err, "session task failed");
                    self.engine.finish_run(id);
                    None
                }
            },
            // Another caller is already waiting on the task.
            Some((_, None)) => None,
            None => {
                self.engine.teardown();
                None
            }
        }
    }
}

impl std::fmt::Debug for BreathingSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BreathingSession")
            .field("status", &self.engine.status.current())
            .field("timing", &self.engine.timing)
            .finish()
    }
}

impl Engine {
    fn slot(&self) -> MutexGuard<'_, Option<ActiveRun>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Release host resources, then free the slot and publish idle together
    /// so an observer that sees idle can always start again.
    fn finish_run(&self, id: Uuid) {
        self.release_resources();
        let mut slot = self.slot();
        if slot.as_ref().is_some_and(|run| run.id == id) {
            *slot = None;
        }
        self.status.reset();
    }

    async fn run(self: Arc<Self>, session_id: Uuid, config: SessionConfig, token: CancellationToken) -> Event {
        self.host
            .acquire_keep_awake(self.timing.keep_awake_max, StopHandle::new(token.clone()));
        self.host.show_status("Starting breathing exercise...");

        let outcome = self.run_session(session_id, &config, &token).await;
        let event = match outcome {
            Ok(()) => {
                if let Err(err) = self.host.lock_screen() {
                    debug!(error = %err, "screen lock skipped");
                }
                info!(%session_id, "breathing session completed");
                Event::SessionCompleted {
                    session_id,
                    total_reps: config.repetitions(),
                    at: Utc::now(),
                }
            }
            Err(Interrupted) => {
                let s = self.status.current();
                info!(%session_id, rep = s.current_rep, phase = %s.phase, "breathing session stopped");
                Event::SessionStopped {
                    session_id,
                    rep: s.current_rep,
                    phase: s.phase,
                    at: Utc::now(),
                }
            }
        };
        self.events.emit_lossy(event.clone());
        self.finish_run(session_id);
        event
    }

    async fn run_session(
        &self,
        session_id: Uuid,
        config: &SessionConfig,
        token: &CancellationToken,
    ) -> Result<(), Interrupted> {
        let total = config.repetitions();
        for rep in 1..=total {
            checkpoint(token)?;
            self.status.set_rep(rep);
            self.events.emit_lossy(Event::RepStarted {
                session_id,
                rep,
                total_reps: total,
                at: Utc::now(),
            });
            for phase in BreathingPhase::CYCLE {
                self.run_phase(session_id, rep, phase, config, token).await?;
            }
        }

        self.status.complete();
        self.actuator.cancel();
        self.actuator.play_completion_flourish(config.intensity());
        pause(token, self.timing.settle_delay).await
    }

    async fn run_phase(
        &self,
        session_id: Uuid,
        rep: u32,
        phase: BreathingPhase,
        config: &SessionConfig,
        token: &CancellationToken,
    ) -> Result<(), Interrupted> {
        checkpoint(token)?;
        self.status.enter_phase(phase);
        self.events.emit_lossy(Event::PhaseStarted {
            session_id,
            rep,
            phase,
            duration_secs: phase.duration_secs(),
            at: Utc::now(),
        });
        debug!(rep, %phase, "phase started");

        self.actuator.play_transient(config.intensity());
        pause(token, self.timing.transition_pause).await?;

        let waveform = synthesize(
            phase,
            config.pattern(),
            config.intensity(),
            config.pulse_duration_ms(),
        );
        self.actuator.play_waveform(&waveform);
        self.host
            .show_status(&format!("Rep {rep}/{} - {phase}", config.repetitions()));

        let duration = phase.duration();
        let started = Instant::now();
        loop {
            let elapsed = started.elapsed();
            if elapsed >= duration {
                break;
            }
            self.status
                .progress(phase_progress(elapsed, duration), seconds_remaining(elapsed, duration));
            pause(token, self.timing.tick).await?;
        }

        self.status.finish_phase();
        // The waveform's own length need not match the phase clock.
        self.actuator.cancel();
        self.events.emit_lossy(Event::PhaseCompleted {
            session_id,
            rep,
            phase,
            at: Utc::now(),
        });
        Ok(())
    }

    /// Cancel playback and release host resources. Idempotent.
    fn release_resources(&self) {
        self.actuator.cancel();
        self.host.release_keep_awake();
        self.host.dismiss_status();
    }

    /// Restore idle defaults when no session task is alive.
    fn teardown(&self) {
        self.release_resources();
        self.status.reset();
    }
}

fn checkpoint(token: &CancellationToken) -> Result<(), Interrupted> {
    if token.is_cancelled() {
        Err(Interrupted)
    } else {
        Ok(())
    }
}

/// Sleep for `duration` unless cancelled first; re-checks before resuming.
async fn pause(token: &CancellationToken, duration: Duration) -> Result<(), Interrupted> {
    tokio::select! {
        biased;
        _ = token.cancelled() => return Err(Interrupted),
        _ = tokio::time::sleep(duration) => {}
    }
    checkpoint(token)
}

fn phase_progress(elapsed: Duration, duration: Duration) -> f32 {
    if duration.is_zero() {
        return 1.0;
    }
    (elapsed.as_secs_f64() / duration.as_secs_f64()).clamp(0.0, 1.0) as f32
}

fn seconds_remaining(elapsed: Duration, duration: Duration) -> u32 {
    let remaining_ms = duration.saturating_sub(elapsed).as_millis() as u64;
    remaining_ms.div_ceil(1000) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::breathing::VibrationPattern;
    use crate::error::HostError;
    use crate::haptics::{DeviceCall, RecordingDevice};
    use crate::session::host::WakeLease;
    use crate::session::status::SessionStatus;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct RecordingHost {
        texts: Mutex<Vec<String>>,
        dismissed: AtomicUsize,
        released: AtomicUsize,
        lock_calls: AtomicUsize,
        lease: WakeLease,
    }

    impl RecordingHost {
        fn texts(&self) -> Vec<String> {
            self.texts.lock().unwrap().clone()
        }
    }

    impl SessionHost for RecordingHost {
        fn show_status(&self, text: &str) {
            self.texts.lock().unwrap().push(text.to_string());
        }

        fn dismiss_status(&self) {
            self.dismissed.fetch_add(1, Ordering::SeqCst);
        }

        fn acquire_keep_awake(&self, max_hold: Duration, expiry: StopHandle) {
            self.lease.hold(max_hold, expiry);
        }

        fn release_keep_awake(&self) {
            self.released.fetch_add(1, Ordering::SeqCst);
            self.lease.release();
        }

        fn lock_screen(&self) -> Result<(), HostError> {
            self.lock_calls.fetch_add(1, Ordering::SeqCst);
            Err(HostError::Unavailable("screen lock", "no device admin".into()))
        }
    }

    struct Rig {
        session: BreathingSession,
        device: Arc<RecordingDevice>,
        host: Arc<RecordingHost>,
    }

    fn rig_with(timing: SessionTiming) -> Rig {
        let device = Arc::new(RecordingDevice::new());
        let host = Arc::new(RecordingHost::default());
        let session =
            BreathingSession::with_timing(HapticActuator::new(device.clone()), host.clone(), timing);
        Rig {
            session,
            device,
            host,
        }
    }

    fn rig() -> Rig {
        rig_with(SessionTiming::default())
    }

    fn config(reps: u32) -> SessionConfig {
        SessionConfig::new(reps, VibrationPattern::Standard, 0.7, 80.0).unwrap()
    }

    fn drain(rx: &mut broadcast::Receiver<Event>) -> Vec<Event> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    fn phases_started(events: &[Event]) -> Vec<(u32, BreathingPhase)> {
        events
            .iter()
            .filter_map(|e| match e {
                Event::PhaseStarted { rep, phase, .. } => Some((*rep, *phase)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn remaining_seconds_round_up() {
        let d = Duration::from_secs(4);
        assert_eq!(seconds_remaining(Duration::ZERO, d), 4);
        assert_eq!(seconds_remaining(Duration::from_millis(50), d), 4);
        assert_eq!(seconds_remaining(Duration::from_millis(1000), d), 3);
        assert_eq!(seconds_remaining(Duration::from_millis(3950), d), 1);
        assert_eq!(seconds_remaining(d, d), 0);
    }

    #[test]
    fn progress_is_clamped() {
        let d = Duration::from_secs(8);
        assert_eq!(phase_progress(Duration::ZERO, d), 0.0);
        assert_eq!(phase_progress(Duration::from_secs(4), d), 0.5);
        assert_eq!(phase_progress(Duration::from_secs(9), d), 1.0);
        assert_eq!(phase_progress(Duration::ZERO, Duration::ZERO), 1.0);
    }

    #[tokio::test(start_paused = true)]
    async fn single_rep_runs_all_phases_then_returns_to_idle() {
        let rig = rig();
        let mut events = rig.session.subscribe();
        let mut status = rig.session.status();
        let began = Instant::now();

        assert!(rig.session.start(config(1)).is_some());
        assert!(status.snapshot().is_running);
        assert_eq!(status.snapshot().total_reps, 1);

        status.wait_for(|s| !s.is_running).await.unwrap();
        let elapsed = began.elapsed();

        // 4 + 7 + 8 seconds of breathing, three 100ms cues, 2s settle.
        assert_eq!(elapsed, Duration::from_millis(19_000 + 300 + 2_000));
        assert_eq!(status.snapshot(), SessionStatus::idle());

        let events = drain(&mut events);
        assert_eq!(
            phases_started(&events),
            vec![
                (1, BreathingPhase::Inhale),
                (1, BreathingPhase::Hold),
                (1, BreathingPhase::Exhale),
            ]
        );
        assert!(matches!(events.last(), Some(Event::SessionCompleted { total_reps: 1, .. })));
        assert!(!rig.session.is_running());

        assert_eq!(
            rig.host.texts(),
            vec![
                "Starting breathing exercise...",
                "Rep 1/1 - Inhale",
                "Rep 1/1 - Hold",
                "Rep 1/1 - Exhale",
            ]
        );
        assert_eq!(rig.host.lock_calls.load(Ordering::SeqCst), 1);
        assert_eq!(rig.host.dismissed.load(Ordering::SeqCst), 1);
        assert!(!rig.host.lease.is_held());
    }

    #[tokio::test(start_paused = true)]
    async fn device_sees_cue_waveform_cancel_per_phase_then_flourish() {
        let rig = rig();
        let mut status = rig.session.status();
        rig.session.start(config(1));
        status.wait_for(|s| !s.is_running).await.unwrap();

        let waves = rig.device.waveforms();
        // cue + phase waveform for each of three phases, then the flourish
        assert_eq!(waves.len(), 7);
        assert_eq!(waves[0], crate::haptics::transient(0.7));
        assert_eq!(
            waves[1],
            synthesize(BreathingPhase::Inhale, VibrationPattern::Standard, 0.7, 80.0)
        );
        assert_eq!(waves[6], crate::haptics::completion_flourish(0.7));

        let calls = rig.device.calls();
        // no cancel between a cue and the waveform that replaces it
        assert!(matches!(
            (&calls[0], &calls[1]),
            (DeviceCall::Vibrate(_), DeviceCall::Vibrate(_))
        ));
        assert_eq!(calls[2], DeviceCall::Cancel);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_mid_hold_of_second_rep_halts_everything() {
        let rig = rig();
        let mut events = rig.session.subscribe();
        let mut status = rig.session.status();
        rig.session.start(config(3));

        status
            .wait_for(|s| {
                s.current_rep == 2 && s.phase == BreathingPhase::Hold && s.phase_progress >= 0.5
            })
            .await
            .unwrap();
        let final_event = rig.session.stop().await;

        assert!(matches!(
            final_event,
            Some(Event::SessionStopped {
                rep: 2,
                phase: BreathingPhase::Hold,
                ..
            })
        ));
        assert_eq!(status.snapshot(), SessionStatus::idle());
        assert!(!rig.session.is_running());

        let calls_at_stop = rig.device.calls().len();
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(rig.device.calls().len(), calls_at_stop);

        let started = phases_started(&drain(&mut events));
        assert_eq!(started.last(), Some(&(2, BreathingPhase::Hold)));
        assert_eq!(started.len(), 5);
        assert_eq!(rig.host.lock_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_during_transition_pause_never_plays_the_phase_waveform() {
        let rig = rig();
        let mut status = rig.session.status();
        let began = Instant::now();
        rig.session.start(config(1));

        status
            .wait_for(|s| s.phase == BreathingPhase::Inhale)
            .await
            .unwrap();
        let final_event = rig.session.stop().await;

        assert!(matches!(
            final_event,
            Some(Event::SessionStopped {
                rep: 1,
                phase: BreathingPhase::Inhale,
                ..
            })
        ));
        assert!(began.elapsed() < TRANSITION_PAUSE);
        assert_eq!(rig.device.waveforms(), vec![crate::haptics::transient(0.7)]);
        assert!(!rig.host.texts().iter().any(|t| t.starts_with("Rep ")));
        assert!(status.snapshot().is_idle());
    }

    #[tokio::test(start_paused = true)]
    async fn stop_during_settle_skips_screen_lock() {
        let rig = rig();
        let mut status = rig.session.status();
        let began = Instant::now();
        rig.session.start(config(1));

        status
            .wait_for(|s| s.phase == BreathingPhase::Complete)
            .await
            .unwrap();
        let final_event = rig.session.stop().await;

        assert_eq!(began.elapsed(), Duration::from_millis(19_000 + 300));
        assert!(matches!(
            final_event,
            Some(Event::SessionStopped {
                phase: BreathingPhase::Complete,
                ..
            })
        ));
        assert_eq!(
            rig.device.waveforms().last(),
            Some(&crate::haptics::completion_flourish(0.7))
        );
        assert_eq!(rig.host.lock_calls.load(Ordering::SeqCst), 0);
        assert!(status.snapshot().is_idle());
    }

    /// Host whose notification teardown blocks for a while.
    struct SlowDismissHost;

    impl SessionHost for SlowDismissHost {
        fn dismiss_status(&self) {
            std::thread::sleep(Duration::from_millis(200));
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn idle_status_always_accepts_a_new_start() {
        let session = BreathingSession::new(HapticActuator::absent(), Arc::new(SlowDismissHost));
        let mut status = session.status();

        for round in 0..3 {
            assert!(session.start(config(2)).is_some(), "round {round}");
            session.stop_handle().unwrap().stop();
            let seen = status.wait_for(|s| !s.is_running).await.unwrap();
            assert!(seen.is_idle());
            assert!(!session.is_running(), "round {round}");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn host_may_query_the_session_from_its_callbacks() {
        struct ReentrantHost {
            session: Mutex<Option<BreathingSession>>,
            saw_running: AtomicUsize,
        }

        impl SessionHost for ReentrantHost {
            fn show_status(&self, _text: &str) {
                if let Some(session) = self.session.lock().unwrap().as_ref() {
                    if session.is_running() && session.stop_handle().is_some() {
                        self.saw_running.fetch_add(1, Ordering::SeqCst);
                    }
                }
            }
        }

        let host = Arc::new(ReentrantHost {
            session: Mutex::new(None),
            saw_running: AtomicUsize::new(0),
        });
        let session = BreathingSession::new(HapticActuator::absent(), host.clone());
        *host.session.lock().unwrap() = Some(session.clone());

        session.start(config(1));
        tokio::time::sleep(Duration::from_secs(1)).await;
        session.stop().await;

        assert!(host.saw_running.load(Ordering::SeqCst) >= 2);
        host.session.lock().unwrap().take();
    }

    #[tokio::test(start_paused = true)]
    async fn stop_is_idempotent() {
        let rig = rig();
        let status = rig.session.status();
        rig.session.start(config(2));
        tokio::time::sleep(Duration::from_secs(3)).await;

        assert!(rig.session.stop().await.is_some());
        let once = status.snapshot();
        assert!(rig.session.stop().await.is_none());
        let twice = status.snapshot();

        assert_eq!(once, twice);
        assert_eq!(twice, SessionStatus::idle());
    }

    #[tokio::test(start_paused = true)]
    async fn stop_while_idle_is_harmless() {
        let rig = rig();
        assert!(rig.session.stop().await.is_none());
        assert!(rig.session.status().snapshot().is_idle());
    }

    #[tokio::test(start_paused = true)]
    async fn start_while_running_is_rejected() {
        let rig = rig();
        let status = rig.session.status();
        assert!(rig.session.start(config(2)).is_some());
        tokio::time::sleep(Duration::from_secs(1)).await;

        let before = status.snapshot();
        assert!(rig.session.start(config(5)).is_none());
        assert_eq!(status.snapshot().total_reps, 2);
        assert_eq!(status.snapshot().current_rep, before.current_rep);

        rig.session.stop().await;
        assert!(rig.session.start(config(1)).is_some());
        rig.session.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn progress_never_moves_backwards_within_a_phase() {
        let rig = rig();
        let mut status = rig.session.status();
        rig.session.start(config(1));

        let mut seen = vec![status.snapshot()];
        while let Some(s) = status.changed().await {
            seen.push(s);
            if !s.is_running {
                break;
            }
        }

        let running: Vec<_> = seen.iter().filter(|s| s.phase.is_active()).collect();
        for pair in running.windows(2) {
            if pair[0].phase == pair[1].phase {
                assert!(pair[1].phase_progress >= pair[0].phase_progress);
                assert!(pair[1].phase_seconds_remaining <= pair[0].phase_seconds_remaining);
            }
        }
        for phase in BreathingPhase::CYCLE {
            let last = running.iter().rev().find(|s| s.phase == phase).unwrap();
            assert!(last.phase_progress >= 0.98, "{phase:?} ended at {}", last.phase_progress);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn expired_keep_awake_tears_the_session_down() {
        let rig = rig_with(SessionTiming {
            keep_awake_max: Duration::from_secs(10),
            ..SessionTiming::default()
        });
        let mut events = rig.session.subscribe();
        let mut status = rig.session.status();
        let began = Instant::now();
        rig.session.start(config(3));

        status.wait_for(|s| !s.is_running).await.unwrap();
        assert_eq!(began.elapsed(), Duration::from_secs(10));
        assert!(!rig.session.is_running());

        let events = drain(&mut events);
        assert!(matches!(
            events.last(),
            Some(Event::SessionStopped {
                rep: 1,
                phase: BreathingPhase::Hold,
                ..
            })
        ));
        assert_eq!(rig.host.released.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_handle_behaves_like_stop() {
        let rig = rig();
        let mut status = rig.session.status();
        rig.session.start(config(2));
        let handle = rig.session.stop_handle().unwrap();

        tokio::time::sleep(Duration::from_secs(5)).await;
        handle.stop();
        status.wait_for(|s| !s.is_running).await.unwrap();
        assert!(status.snapshot().is_idle());
        assert!(handle.is_stopped());
    }

    #[tokio::test(start_paused = true)]
    async fn missing_motor_keeps_the_clock_running() {
        let host = Arc::new(RecordingHost::default());
        let session = BreathingSession::new(HapticActuator::absent(), host.clone());
        let mut status = session.status();
        let began = Instant::now();

        session.start(config(1));
        status.wait_for(|s| !s.is_running).await.unwrap();

        assert_eq!(began.elapsed(), Duration::from_millis(21_300));
        assert_eq!(host.texts().len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn snapshot_reflects_status() {
        let rig = rig();
        rig.session.start(config(2));
        tokio::time::sleep(Duration::from_secs(5)).await;
        match rig.session.snapshot() {
            Event::StateSnapshot {
                is_running,
                phase,
                current_rep,
                total_reps,
                ..
            } => {
                assert!(is_running);
                assert_eq!(phase, BreathingPhase::Hold);
                assert_eq!(current_rep, 1);
                assert_eq!(total_reps, 2);
            }
            _ => panic!("Expected StateSnapshot"),
        }
        rig.session.stop().await;
    }
}
