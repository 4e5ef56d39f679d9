//! TOML-based settings.
//!
//! Stores the exercise preferences the session starts from (repetitions,
//! vibration pattern, intensity, pulse length) and host behavior such as the
//! keep-awake bound.
//!
//! Configuration is stored at `~/.config/breathwork/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::data_dir;
use crate::breathing::VibrationPattern;
use crate::error::{ConfigError, CoreError, ValidationError};
use crate::session::SessionConfig;

pub const REPETITIONS_RANGE: (u32, u32) = (1, 30);
pub const INTENSITY_RANGE: (f64, f64) = (0.1, 1.0);
pub const PULSE_MS_RANGE: (f64, f64) = (20.0, 200.0);

/// Exercise preferences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseSettings {
    #[serde(default = "default_repetitions")]
    pub repetitions: u32,
    /// Stored by name; unknown names read back as Standard.
    #[serde(default = "default_pattern")]
    pub pattern: String,
    #[serde(default = "default_intensity")]
    pub intensity: f64,
    #[serde(default = "default_pulse_duration_ms")]
    pub pulse_duration_ms: f64,
}

/// Session host behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSettings {
    #[serde(default = "default_keep_awake_minutes")]
    pub keep_awake_minutes: u32,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/breathwork/config.toml`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub exercise: ExerciseSettings,
    #[serde(default)]
    pub session: SessionSettings,
}

fn default_repetitions() -> u32 {
    4
}
fn default_pattern() -> String {
    VibrationPattern::Standard.key().into()
}
fn default_intensity() -> f64 {
    0.7
}
fn default_pulse_duration_ms() -> f64 {
    80.0
}
fn default_keep_awake_minutes() -> u32 {
    10
}

impl Default for ExerciseSettings {
    fn default() -> Self {
        Self {
            repetitions: default_repetitions(),
            pattern: default_pattern(),
            intensity: default_intensity(),
            pulse_duration_ms: default_pulse_duration_ms(),
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            keep_awake_minutes: default_keep_awake_minutes(),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };
        let mut parts = key.split('.').peekable();
        if key.is_empty() {
            return Err(ConfigError::UnknownKey(key.to_string()));
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_none() {
                let obj = current
                    .as_object_mut()
                    .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
                let existing = obj
                    .get(part)
                    .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value.parse::<bool>().map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => {
                        if let Ok(n) = value.parse::<u64>() {
                            serde_json::Value::Number(n.into())
                        } else if let Ok(n) = value.parse::<f64>() {
                            serde_json::Number::from_f64(n)
                                .map(serde_json::Value::Number)
                                .ok_or_else(|| invalid(format!("cannot parse '{value}' as number")))?
                        } else {
                            return Err(invalid(format!("cannot parse '{value}' as number")));
                        }
                    }
                    serde_json::Value::Object(_) => {
                        return Err(ConfigError::UnknownKey(key.to_string()));
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current
                .get_mut(part)
                .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
        }

        Err(ConfigError::UnknownKey(key.to_string()))
    }

    /// Default location of the settings file.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings directory cannot be created.
    pub fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the default location, writing defaults if the file is missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed or
    /// holds out-of-range values, or if the defaults cannot be written.
    pub fn load() -> Result<Self, CoreError> {
        let path = Self::path()?;
        if path.exists() {
            Self::load_from(&path)
        } else {
            let cfg = Self::default();
            cfg.save_to(&path)?;
            Ok(cfg)
        }
    }

    /// Load and validate a settings file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn load_from(path: &Path) -> Result<Self, CoreError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::LoadFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let cfg: Config = toml::from_str(&content).map_err(ConfigError::from)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Persist to the default location.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), CoreError> {
        self.save_to(&Self::path()?)
    }

    /// Persist to `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save_to(&self, path: &Path) -> Result<(), CoreError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))?;
        Ok(())
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Object(_) => None,
            other => Some(other.to_string()),
        }
    }

    /// Every leaf setting as `(dot.key, value)`, sorted by key.
    pub fn list(&self) -> Vec<(String, String)> {
        let mut out = Vec::new();
        if let Ok(serde_json::Value::Object(sections)) = serde_json::to_value(self) {
            for (section, fields) in sections {
                if let serde_json::Value::Object(fields) = fields {
                    for (field, value) in fields {
                        let value = match value {
                            serde_json::Value::String(s) => s,
                            other => other.to_string(),
                        };
                        out.push((format!("{section}.{field}"), value));
                    }
                }
            }
        }
        out
    }

    /// Update a value in memory, re-validating the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed,
    /// or the new value is out of range. `self` is unchanged on error.
    pub fn apply(&mut self, key: &str, value: &str) -> Result<(), CoreError> {
        if key == "exercise.pattern" {
            value.parse::<VibrationPattern>().map_err(|message| {
                ValidationError::InvalidValue {
                    field: "pattern",
                    message,
                }
            })?;
        }
        let mut json = serde_json::to_value(&*self)?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Set a value by key and persist. Returns error if key is unknown.
    ///
    /// # Errors
    ///
    /// Returns an error if [`Config::apply`] rejects the value or the
    /// config cannot be saved.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), CoreError> {
        self.apply(key, value)?;
        self.save()
    }

    /// Check every numeric setting against its accepted range.
    ///
    /// # Errors
    ///
    /// Returns the first out-of-range field.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let ex = &self.exercise;
        let (lo, hi) = REPETITIONS_RANGE;
        if !(lo..=hi).contains(&ex.repetitions) {
            return Err(ValidationError::OutOfRange {
                field: "repetitions",
                min: f64::from(lo),
                max: f64::from(hi),
                value: f64::from(ex.repetitions),
            });
        }
        for (field, (lo, hi), value) in [
            ("intensity", INTENSITY_RANGE, ex.intensity),
            ("pulse_duration_ms", PULSE_MS_RANGE, ex.pulse_duration_ms),
        ] {
            if !(lo..=hi).contains(&value) {
                return Err(ValidationError::OutOfRange {
                    field,
                    min: lo,
                    max: hi,
                    value,
                });
            }
        }
        if self.session.keep_awake_minutes == 0 {
            return Err(ValidationError::InvalidValue {
                field: "keep_awake_minutes",
                message: "must be at least 1".into(),
            });
        }
        Ok(())
    }

    /// The stored pattern, falling back to Standard for unknown names.
    pub fn pattern(&self) -> VibrationPattern {
        self.exercise.pattern.parse().unwrap_or_default()
    }

    /// Build the session parameters these settings describe.
    ///
    /// # Errors
    ///
    /// Returns an error if a stored value is out of range.
    pub fn session_config(&self) -> Result<SessionConfig, ValidationError> {
        self.validate()?;
        SessionConfig::new(
            self.exercise.repetitions,
            self.pattern(),
            self.exercise.intensity as f32,
            self.exercise.pulse_duration_ms as f32,
        )
    }

    pub fn keep_awake(&self) -> Duration {
        Duration::from_secs(u64::from(self.session.keep_awake_minutes) * 60)
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }
}
