mod pattern;
mod phase;

pub use pattern::VibrationPattern;
pub use phase::{BreathingPhase, CYCLE_DURATION_SECS};
