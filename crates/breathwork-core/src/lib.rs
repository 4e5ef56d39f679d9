//! # Breathwork Core Library
//!
//! This library provides the core logic for a haptic 4-7-8 breathing guide.
//! It follows a CLI-first layout: every operation is available through the
//! standalone CLI binary, and any other host (a phone app, a watch face) is a
//! thin layer over the same session engine.
//!
//! ## Architecture
//!
//! - **Breathing**: The phase cycle (inhale 4s, hold 7s, exhale 8s) and the
//!   selectable vibration patterns
//! - **Haptics**: Pure waveform synthesis plus the actuator adapter that owns
//!   the motor
//! - **Session**: A cancellable Tokio task that sequences phases, publishes
//!   observable status and talks to the platform host
//! - **Storage**: TOML-based settings
//!
//! ## Key Components
//!
//! - [`BreathingSession`]: Session state machine
//! - [`synthesize`]: Phase and pattern to waveform
//! - [`HapticActuator`]: Single point of contact with the motor
//! - [`Config`]: Persisted exercise preferences
//! - [`SessionHost`]: Trait for platform services (status, keep-awake, lock)

pub mod breathing;
pub mod error;
pub mod events;
pub mod haptics;
pub mod session;
pub mod storage;

pub use breathing::{BreathingPhase, VibrationPattern, CYCLE_DURATION_SECS};
pub use error::{ConfigError, CoreError, HostError, ValidationError};
pub use events::{Event, EventBus};
pub use haptics::{synthesize, HapticActuator, VibrationDevice, Waveform, WaveformSegment};
pub use session::{
    BreathingSession, NullHost, SessionConfig, SessionHost, SessionStatus, SessionTiming,
    StatusHandle, StopHandle, WakeLease,
};
pub use storage::Config;
