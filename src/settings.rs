//! Run settings
//!
//! Loaded from a JSON file by the host. Missing keys fall back to defaults,
//! so a file can override just the values it cares about.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::consts::{GRID_REVEAL_RATE, PLAYER_START_LIVES};

/// Difficulty preset levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Difficulty {
    Easy,
    #[default]
    Normal,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Normal => "Normal",
            Difficulty::Hard => "Hard",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "easy" => Some(Difficulty::Easy),
            "normal" | "med" => Some(Difficulty::Normal),
            "hard" => Some(Difficulty::Hard),
            _ => None,
        }
    }

    /// Scalar handed to alien ships (fire rate, aim)
    pub fn alien_difficulty(&self) -> f32 {
        match self {
            Difficulty::Easy => 0.75,
            Difficulty::Normal => 1.0,
            Difficulty::Hard => 1.4,
        }
    }

    /// Ticks between alien spawn attempts
    pub fn alien_spawn_interval_ticks(&self) -> u32 {
        match self {
            Difficulty::Easy => 1200,
            Difficulty::Normal => 900,
            Difficulty::Hard => 600,
        }
    }

    /// Concurrent alien ship limit
    pub fn max_aliens(&self) -> usize {
        match self {
            Difficulty::Easy => 1,
            Difficulty::Normal => 2,
            Difficulty::Hard => 4,
        }
    }
}

/// Errors surfaced while loading settings from disk
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("failed to read settings file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid settings JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Run configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub difficulty: Difficulty,
    /// Swap left/right rotation
    pub reversed_controls: bool,
    /// Grid-scan cells revealed per second
    pub grid_reveal_rate: f32,
    /// First stage number (1-based)
    pub starting_stage: u32,
    pub starting_lives: u32,
    /// Spawn alien ships on a timer
    pub aliens_enabled: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            difficulty: Difficulty::Normal,
            reversed_controls: false,
            grid_reveal_rate: GRID_REVEAL_RATE,
            starting_stage: 1,
            starting_lives: PLAYER_START_LIVES,
            aliens_enabled: true,
        }
    }
}

impl Settings {
    /// Create settings from a difficulty preset
    pub fn from_difficulty(difficulty: Difficulty) -> Self {
        Self {
            difficulty,
            ..Self::default()
        }
    }

    /// Parse settings from JSON text
    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        let settings: Self = serde_json::from_str(json)?;
        Ok(settings.sanitized())
    }

    pub fn to_json(&self) -> Result<String, SettingsError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load settings from a JSON file
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let json = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&json)
    }

    /// Load settings, falling back to defaults on any error
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::load_from_path(path.as_ref()) {
            Ok(settings) => {
                log::info!("Loaded settings from {}", path.as_ref().display());
                settings
            }
            Err(e) => {
                log::warn!("{e}; using default settings");
                Self::default()
            }
        }
    }

    /// Clamp out-of-range values to safe ones
    pub fn sanitized(mut self) -> Self {
        if !self.grid_reveal_rate.is_finite() || self.grid_reveal_rate <= 0.0 {
            self.grid_reveal_rate = GRID_REVEAL_RATE;
        }
        self.starting_stage = self.starting_stage.max(1);
        self.starting_lives = self.starting_lives.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let settings = Settings::from_json(r#"{ "difficulty": "Hard" }"#).unwrap();
        assert_eq!(settings.difficulty, Difficulty::Hard);
        assert_eq!(settings.grid_reveal_rate, GRID_REVEAL_RATE);
        assert!(settings.aliens_enabled);
    }

    #[test]
    fn test_bad_values_are_clamped() {
        let settings =
            Settings::from_json(r#"{ "grid_reveal_rate": -3.0, "starting_stage": 0 }"#).unwrap();
        assert_eq!(settings.grid_reveal_rate, GRID_REVEAL_RATE);
        assert_eq!(settings.starting_stage, 1);
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        assert!(matches!(
            Settings::from_json("{ nope"),
            Err(SettingsError::Parse(_))
        ));
    }

    #[test]
    fn test_missing_file_falls_back() {
        let settings = Settings::load_or_default("/definitely/not/here.json");
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_json_round_trip() {
        let settings = Settings::from_difficulty(Difficulty::Easy);
        let json = settings.to_json().unwrap();
        assert_eq!(Settings::from_json(&json).unwrap(), settings);
    }

    #[test]
    fn test_difficulty_from_str() {
        assert_eq!(Difficulty::from_str("HARD"), Some(Difficulty::Hard));
        assert_eq!(Difficulty::from_str("nightmare"), None);
        assert_eq!(Difficulty::Easy.as_str(), "Easy");
    }
}
