use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::breathing::{VibrationPattern, CYCLE_DURATION_SECS};
use crate::error::ValidationError;

/// Parameters of one exercise session. Immutable once the session starts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    repetitions: u32,
    pattern: VibrationPattern,
    intensity: f32,
    pulse_duration_ms: f32,
}

impl SessionConfig {
    /// Validate and build a session config.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] if `repetitions` is zero, `intensity`
    /// is outside `(0, 1]`, or `pulse_duration_ms` is not a positive number.
    pub fn new(
        repetitions: u32,
        pattern: VibrationPattern,
        intensity: f32,
        pulse_duration_ms: f32,
    ) -> Result<Self, ValidationError> {
        if repetitions == 0 {
            return Err(ValidationError::InvalidValue {
                field: "repetitions",
                message: "must be at least 1".into(),
            });
        }
        if !(intensity > 0.0 && intensity <= 1.0) {
            return Err(ValidationError::OutOfRange {
                field: "intensity",
                min: 0.0,
                max: 1.0,
                value: f64::from(intensity),
            });
        }
        if !(pulse_duration_ms.is_finite() && pulse_duration_ms > 0.0) {
            return Err(ValidationError::InvalidValue {
                field: "pulse_duration_ms",
                message: format!("must be a positive number of milliseconds, got {pulse_duration_ms}"),
            });
        }
        Ok(Self {
            repetitions,
            pattern,
            intensity,
            pulse_duration_ms,
        })
    }

    pub fn repetitions(&self) -> u32 {
        self.repetitions
    }

    pub fn pattern(&self) -> VibrationPattern {
        self.pattern
    }

    pub fn intensity(&self) -> f32 {
        self.intensity
    }

    pub fn pulse_duration_ms(&self) -> f32 {
        self.pulse_duration_ms
    }

    /// Breathing time for all reps, excluding cues and the completion settle.
    pub fn total_duration(&self) -> Duration {
        Duration::from_secs(u64::from(self.repetitions) * CYCLE_DURATION_SECS)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            repetitions: 4,
            pattern: VibrationPattern::Standard,
            intensity: 0.7,
            pulse_duration_ms: 80.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_typical_values() {
        let cfg = SessionConfig::new(3, VibrationPattern::Pulse, 0.5, 120.0).unwrap();
        assert_eq!(cfg.repetitions(), 3);
        assert_eq!(cfg.total_duration(), Duration::from_secs(57));
    }

    #[test]
    fn rejects_zero_repetitions() {
        assert!(SessionConfig::new(0, VibrationPattern::Gentle, 0.5, 80.0).is_err());
    }

    #[test]
    fn rejects_intensity_outside_unit_interval() {
        for intensity in [0.0, -0.1, 1.01, f32::NAN] {
            let err = SessionConfig::new(1, VibrationPattern::Gentle, intensity, 80.0);
            assert!(matches!(err, Err(ValidationError::OutOfRange { .. })), "{intensity}");
        }
        assert!(SessionConfig::new(1, VibrationPattern::Gentle, 1.0, 80.0).is_ok());
    }

    #[test]
    fn rejects_non_positive_pulse() {
        assert!(SessionConfig::new(1, VibrationPattern::Simple1, 0.5, 0.0).is_err());
        assert!(SessionConfig::new(1, VibrationPattern::Simple1, 0.5, f32::INFINITY).is_err());
    }
}
