// SPDX-License-Identifier: MIT OR Apache-2.0
//! Timeline settings and their RON file format.

use crate::time::{Rational, TimeBase};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Settings file name
pub const SETTINGS_FILE_NAME: &str = "timeline.ron";

/// Settings errors
#[derive(Debug, Error)]
pub enum SettingsError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// File could not be parsed
    #[error("Parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// Settings could not be serialized
    #[error("Serialization error: {0}")]
    Serialize(#[from] ron::Error),
}

/// Time base and frame rate of a timeline; fixed once the timeline exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineSettings {
    /// Length of one tick
    pub time_base: TimeBase,
    /// Frames per second
    pub frame_rate: Rational,
}

impl Default for TimelineSettings {
    fn default() -> Self {
        Self {
            time_base: TimeBase::default(),
            frame_rate: Rational::from_int(30),
        }
    }
}

impl TimelineSettings {
    /// Create settings
    pub fn new(time_base: TimeBase, frame_rate: Rational) -> Self {
        Self {
            time_base,
            frame_rate,
        }
    }

    /// Parse settings from RON
    pub fn from_ron_str(content: &str) -> Result<Self, SettingsError> {
        Ok(ron::from_str(content)?)
    }

    /// Serialize settings to pretty RON
    pub fn to_ron_string(&self) -> Result<String, SettingsError> {
        Ok(ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())?)
    }

    /// Load settings from a file
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path)?;
        let settings = Self::from_ron_str(&content)?;
        tracing::debug!("Loaded timeline settings from {:?}", path);
        Ok(settings)
    }

    /// Save settings to a file
    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        std::fs::write(path, self.to_ron_string()?)?;
        tracing::debug!("Saved timeline settings to {:?}", path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = TimelineSettings::default();
        assert_eq!(settings.time_base, TimeBase::new(1, 600_000));
        assert_eq!(settings.frame_rate, Rational::from_int(30));
    }

    #[test]
    fn test_serialization() {
        let settings = TimelineSettings::new(TimeBase::MPEG, Rational::new(30_000, 1001));
        let ron_str = settings.to_ron_string().unwrap();
        let loaded = TimelineSettings::from_ron_str(&ron_str).unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(
            TimelineSettings::from_ron_str("(time_base: oops)"),
            Err(SettingsError::Parse(_))
        ));
    }

    #[test]
    fn test_save_and_load() {
        let file_name = format!("{}-{}", std::process::id(), SETTINGS_FILE_NAME);
        let path = std::env::temp_dir().join(file_name);
        let settings = TimelineSettings::new(TimeBase::new(1, 48_000), Rational::from_int(25));
        settings.save(&path).unwrap();
        let loaded = TimelineSettings::load(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        assert_eq!(loaded, settings);
    }
}
