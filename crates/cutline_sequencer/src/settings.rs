// SPDX-License-Identifier: MIT OR Apache-2.0
//! Sequencer settings stored as RON.

use crate::error::SequencerError;
use crate::time::Rational;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default settings file name
pub const SETTINGS_FILE: &str = "cutline.ron";

/// Error loading or saving settings and sequences
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    /// File system error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed RON
    #[error("Parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// Value could not be written as RON
    #[error("Serialization error: {0}")]
    Serialize(#[from] ron::Error),

    /// Sequence file parsed but its block chains are inconsistent
    #[error("Invalid sequence: {0}")]
    Invalid(#[from] SequencerError),

    /// Frame rate must be positive
    #[error("Invalid frame rate: {0}")]
    InvalidFrameRate(Rational),

    /// Playback speed must be positive
    #[error("Invalid playback speed: {0}")]
    InvalidPlaybackSpeed(Rational),
}

/// Tunable sequencer defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequencerSettings {
    /// Frames per second for new sequences
    pub frame_rate: Rational,
    /// Whether new sequences loop
    pub looping: bool,
    /// Playback speed multiplier
    pub playback_speed: Rational,
    /// Default `tracing` filter directive
    pub log_filter: String,
}

impl Default for SequencerSettings {
    fn default() -> Self {
        Self {
            frame_rate: Rational::from_integer(30),
            looping: false,
            playback_speed: Rational::from_integer(1),
            log_filter: "cutline=info".to_string(),
        }
    }
}

impl SequencerSettings {
    /// Load settings from a file
    pub fn load(path: &Path) -> Result<Self, PersistError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_ron_str(&content)
    }

    /// Load settings from a file, falling back to defaults if it is missing
    pub fn load_or_default(path: &Path) -> Result<Self, PersistError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no settings file, using defaults");
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Parse and validate settings from RON
    pub fn from_ron_str(content: &str) -> Result<Self, PersistError> {
        let settings: Self = ron::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Save settings to a file
    pub fn save(&self, path: &Path) -> Result<(), PersistError> {
        let config = ron::ser::PrettyConfig::default()
            .depth_limit(4)
            .indentor("  ".to_string());
        let content = ron::ser::to_string_pretty(self, config)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    fn validate(&self) -> Result<(), PersistError> {
        if self.frame_rate <= Rational::ZERO {
            return Err(PersistError::InvalidFrameRate(self.frame_rate));
        }
        if self.playback_speed <= Rational::ZERO {
            return Err(PersistError::InvalidPlaybackSpeed(self.playback_speed));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = SequencerSettings::default();
        assert_eq!(settings.frame_rate, Rational::from_integer(30));
        assert!(!settings.looping);
        assert_eq!(settings.log_filter, "cutline=info");
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let settings = SequencerSettings::from_ron_str("(looping: true, frame_rate: (24000, 1001))").unwrap();
        assert!(settings.looping);
        assert_eq!(settings.frame_rate, Rational::new(24000, 1001));
        assert_eq!(settings.playback_speed, Rational::from_integer(1));
    }

    #[test]
    fn test_rejects_invalid_values() {
        assert!(matches!(
            SequencerSettings::from_ron_str("(frame_rate: (0, 1))"),
            Err(PersistError::InvalidFrameRate(_))
        ));
        assert!(matches!(
            SequencerSettings::from_ron_str("(playback_speed: (-1, 1))"),
            Err(PersistError::InvalidPlaybackSpeed(_))
        ));
        assert!(matches!(
            SequencerSettings::from_ron_str("(frame_rate: 12"),
            Err(PersistError::Parse(_))
        ));
    }

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir().join(format!("cutline-settings-{}.ron", uuid::Uuid::new_v4()));
        let settings = SequencerSettings {
            looping: true,
            ..SequencerSettings::default()
        };

        settings.save(&path).unwrap();
        let loaded = SequencerSettings::load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(loaded, settings);
        assert_eq!(SequencerSettings::load_or_default(&path).unwrap(), SequencerSettings::default());
    }
}
