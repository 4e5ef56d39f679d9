//! The 4-7-8 session state machine and its host-facing surface.

mod config;
mod host;
mod runner;
mod status;

pub use config::SessionConfig;
pub use host::{NullHost, SessionHost, StopHandle, WakeLease};
pub use runner::{
    BreathingSession, SessionTiming, DEFAULT_KEEP_AWAKE, SETTLE_DELAY, TICK_INTERVAL,
    TRANSITION_PAUSE,
};
pub use status::{SessionStatus, StatusHandle};
