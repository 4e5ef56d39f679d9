use std::fmt;

use serde::{Deserialize, Serialize};

/// A named waveform-generation strategy selectable by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VibrationPattern {
    /// Soft ticks with low amplitude.
    Gentle,
    /// Smooth ramps with medium amplitude.
    #[default]
    Standard,
    /// High amplitude ramps and a full-strength hold.
    Strong,
    /// Rhythmic on/off trains that accelerate and decelerate.
    Pulse,
    /// Counted buzzes: 1 on inhale, 2 on hold, 3 on exhale.
    #[serde(rename = "simple_1")]
    Simple1,
    /// Counted buzzes: 1 on inhale, 1 on hold, 2 on exhale.
    #[serde(rename = "simple_2")]
    Simple2,
}

impl VibrationPattern {
    pub const ALL: [VibrationPattern; 6] = [
        Self::Gentle,
        Self::Standard,
        Self::Strong,
        Self::Pulse,
        Self::Simple1,
        Self::Simple2,
    ];

    pub fn display_name(self) -> &'static str {
        match self {
            Self::Gentle => "Gentle",
            Self::Standard => "Standard",
            Self::Strong => "Strong",
            Self::Pulse => "Pulse",
            Self::Simple1 => "Simple I",
            Self::Simple2 => "Simple II",
        }
    }

    /// Stable identifier used in settings files and on the command line.
    pub fn key(self) -> &'static str {
        match self {
            Self::Gentle => "gentle",
            Self::Standard => "standard",
            Self::Strong => "strong",
            Self::Pulse => "pulse",
            Self::Simple1 => "simple_1",
            Self::Simple2 => "simple_2",
        }
    }

    /// Counted-buzz patterns whose length follows the pulse duration rather
    /// than the phase clock.
    pub fn is_counted(self) -> bool {
        matches!(self, Self::Simple1 | Self::Simple2)
    }
}

impl fmt::Display for VibrationPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl std::str::FromStr for VibrationPattern {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "gentle" => Ok(Self::Gentle),
            "standard" => Ok(Self::Standard),
            "strong" => Ok(Self::Strong),
            "pulse" => Ok(Self::Pulse),
            "simple1" | "simplei" => Ok(Self::Simple1),
            "simple2" | "simpleii" => Ok(Self::Simple2),
            _ => Err(format!("unknown vibration pattern: {}", s.trim())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_spelling_of_simple_patterns() {
        for name in ["simple-1", "simple_1", "Simple1", "SIMPLE I"] {
            assert_eq!(name.parse::<VibrationPattern>(), Ok(VibrationPattern::Simple1));
        }
        assert_eq!("simple-2".parse::<VibrationPattern>(), Ok(VibrationPattern::Simple2));
    }

    #[test]
    fn rejects_unknown_pattern() {
        assert!("heartbeat".parse::<VibrationPattern>().is_err());
    }

    #[test]
    fn key_round_trips_through_from_str() {
        for pattern in VibrationPattern::ALL {
            assert_eq!(pattern.key().parse::<VibrationPattern>(), Ok(pattern));
        }
    }

    #[test]
    fn serde_uses_settings_keys() {
        let json = serde_json::to_string(&VibrationPattern::Simple2).unwrap();
        assert_eq!(json, "\"simple_2\"");
        let parsed: VibrationPattern = serde_json::from_str("\"gentle\"").unwrap();
        assert_eq!(parsed, VibrationPattern::Gentle);
    }
}
