use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Length of one inhale-hold-exhale cycle in seconds.
pub const CYCLE_DURATION_SECS: u64 = 4 + 7 + 8;

/// One stage of the 4-7-8 breathing protocol.
///
/// Durations are fixed by the protocol and are not user-configurable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BreathingPhase {
    #[default]
    Idle,
    Inhale,
    Hold,
    Exhale,
    Complete,
}

impl BreathingPhase {
    /// The phases of a single rep, in the order they run.
    pub const CYCLE: [BreathingPhase; 3] = [Self::Inhale, Self::Hold, Self::Exhale];

    pub fn display_name(self) -> &'static str {
        match self {
            Self::Idle => "Ready",
            Self::Inhale => "Inhale",
            Self::Hold => "Hold",
            Self::Exhale => "Exhale",
            Self::Complete => "Complete",
        }
    }

    /// Nominal duration in seconds. Zero for `Idle` and `Complete`.
    pub fn duration_secs(self) -> u64 {
        match self {
            Self::Inhale => 4,
            Self::Hold => 7,
            Self::Exhale => 8,
            Self::Idle | Self::Complete => 0,
        }
    }

    pub fn duration_ms(self) -> u64 {
        self.duration_secs().saturating_mul(1000)
    }

    pub fn duration(self) -> Duration {
        Duration::from_secs(self.duration_secs())
    }

    /// Whether the phase belongs to the breathing cycle (inhale, hold, exhale).
    pub fn is_active(self) -> bool {
        matches!(self, Self::Inhale | Self::Hold | Self::Exhale)
    }
}

impl fmt::Display for BreathingPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl std::str::FromStr for BreathingPhase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "idle" | "ready" => Ok(Self::Idle),
            "inhale" => Ok(Self::Inhale),
            "hold" => Ok(Self::Hold),
            "exhale" => Ok(Self::Exhale),
            "complete" => Ok(Self::Complete),
            other => Err(format!("unknown breathing phase: {other}")),
        }
    }
}
