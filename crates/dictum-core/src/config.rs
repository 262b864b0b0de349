use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{DictumError, Result};
use crate::types::Pronunciation;

/// Top-level configuration for the Dictum application.
///
/// Loaded from `~/.dictum/config.toml` by default. Each section corresponds
/// to one concern of the drill.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DictumConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub speech: SpeechConfig,
    #[serde(default)]
    pub playback: PlaybackConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub dictionary: DictionaryConfig,
}

impl DictumConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: DictumConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Build the validated settings consumed by a drill session.
    pub fn drill_settings(&self) -> Result<DrillSettings> {
        let settings = DrillSettings {
            pronunciation: self.speech.pronunciation,
            cue_count: self.playback.cue_count,
            interval_secs: self.playback.interval_secs,
            random_order: self.session.random_order,
            auto_submit: self.session.auto_submit,
        };
        settings.validate()?;
        Ok(settings)
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Data directory for the SQLite database.
    pub data_dir: String,
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: "~/.dictum/data".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Speech synthesis configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    /// Accent of the spoken cues.
    pub pronunciation: Pronunciation,
    /// Whether cues are spoken at all.
    pub enabled: bool,
    /// External text-to-speech program.
    pub command: String,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            pronunciation: Pronunciation::American,
            enabled: true,
            command: "espeak-ng".to_string(),
        }
    }
}

/// Repeated-cue pacing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Cues spoken per word (at least 1).
    pub cue_count: u32,
    /// Delay between the end of one cue and the start of the next.
    pub interval_secs: f64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            cue_count: 3,
            interval_secs: 1.0,
        }
    }
}

/// Drill behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Shuffle the queue every time it is derived.
    pub random_order: bool,
    /// Advance as soon as the typed input matches the current word.
    ///
    /// Applies to front ends that forward keystrokes. The line-based
    /// `dictum drill` always submits on Enter.
    pub auto_submit: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            random_order: false,
            auto_submit: true,
        }
    }
}

/// Translation dictionary source.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DictionaryConfig {
    /// CSV file with a `word,translation` header. Empty means none.
    pub path: String,
}

// =============================================================================
// Drill settings
// =============================================================================

/// The explicit, validated settings a drill session reads.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DrillSettings {
    pub pronunciation: Pronunciation,
    pub cue_count: u32,
    pub interval_secs: f64,
    pub random_order: bool,
    pub auto_submit: bool,
}

impl Default for DrillSettings {
    fn default() -> Self {
        Self {
            pronunciation: Pronunciation::American,
            cue_count: 3,
            interval_secs: 1.0,
            random_order: false,
            auto_submit: true,
        }
    }
}

impl DrillSettings {
    /// Reject settings the playback scheduler cannot honour.
    pub fn validate(&self) -> Result<()> {
        if self.cue_count == 0 {
            return Err(DictumError::Config(
                "playback.cue_count must be at least 1".to_string(),
            ));
        }
        if !self.interval_secs.is_finite() || self.interval_secs < 0.0 {
            return Err(DictumError::Config(format!(
                "playback.interval_secs must be a non-negative number, got {}",
                self.interval_secs
            )));
        }
        Ok(())
    }

    /// Inter-cue delay. Invalid intervals collapse to zero.
    pub fn interval(&self) -> Duration {
        Duration::try_from_secs_f64(self.interval_secs).unwrap_or(Duration::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_default_config() {
        let config = DictumConfig::default();
        assert_eq!(config.general.data_dir, "~/.dictum/data");
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.speech.pronunciation, Pronunciation::American);
        assert!(config.speech.enabled);
        assert_eq!(config.speech.command, "espeak-ng");
        assert_eq!(config.playback.cue_count, 3);
        assert_eq!(config.playback.interval_secs, 1.0);
        assert!(!config.session.random_order);
        assert!(config.session.auto_submit);
        assert!(config.dictionary.path.is_empty());
    }

    #[test]
    fn test_load_valid_config() {
        let content = r#"
[general]
data_dir = "/custom/data"
log_level = "debug"

[speech]
pronunciation = "british"
enabled = false

[playback]
cue_count = 2
interval_secs = 0.5

[session]
random_order = true
auto_submit = false

[dictionary]
path = "/words/EnWords.csv"
"#;
        let file = create_temp_config(content);
        let config = DictumConfig::load(file.path()).unwrap();
        assert_eq!(config.general.data_dir, "/custom/data");
        assert_eq!(config.speech.pronunciation, Pronunciation::British);
        assert!(!config.speech.enabled);
        assert_eq!(config.playback.cue_count, 2);
        assert_eq!(config.playback.interval_secs, 0.5);
        assert!(config.session.random_order);
        assert!(!config.session.auto_submit);
        assert_eq!(config.dictionary.path, "/words/EnWords.csv");
    }

    #[test]
    fn test_load_partial_config_uses_defaults() {
        let content = r#"
[playback]
cue_count = 5
"#;
        let file = create_temp_config(content);
        let config = DictumConfig::load(file.path()).unwrap();
        assert_eq!(config.playback.cue_count, 5);
        assert_eq!(config.playback.interval_secs, 1.0);
        assert_eq!(config.general.log_level, "info");
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = DictumConfig::load_or_default(Path::new("/nonexistent/config.toml"));
        assert_eq!(config.general.data_dir, "~/.dictum/data");
    }

    #[test]
    fn test_load_invalid_toml() {
        let file = create_temp_config("[playback\ncue_count = ");
        let result = DictumConfig::load(file.path());
        assert!(matches!(result, Err(DictumError::Config(_))));
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = DictumConfig::default();
        config.playback.cue_count = 4;
        config.speech.pronunciation = Pronunciation::British;
        config.save(&path).unwrap();

        let reloaded = DictumConfig::load(&path).unwrap();
        assert_eq!(reloaded.playback.cue_count, 4);
        assert_eq!(reloaded.speech.pronunciation, Pronunciation::British);
    }

    #[test]
    fn test_drill_settings_from_config() {
        let mut config = DictumConfig::default();
        config.playback.cue_count = 2;
        config.session.random_order = true;

        let settings = config.drill_settings().unwrap();
        assert_eq!(settings.cue_count, 2);
        assert!(settings.random_order);
        assert_eq!(settings.interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_drill_settings_rejects_zero_cues() {
        let settings = DrillSettings {
            cue_count: 0,
            ..DrillSettings::default()
        };
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("cue_count"));
    }

    #[test]
    fn test_drill_settings_rejects_bad_interval() {
        for interval_secs in [-1.0, f64::NAN, f64::INFINITY] {
            let settings = DrillSettings {
                interval_secs,
                ..DrillSettings::default()
            };
            assert!(settings.validate().is_err(), "accepted {}", interval_secs);
        }
    }

    #[test]
    fn test_drill_settings_zero_interval_is_valid() {
        let settings = DrillSettings {
            interval_secs: 0.0,
            ..DrillSettings::default()
        };
        assert!(settings.validate().is_ok());
        assert_eq!(settings.interval(), Duration::ZERO);
    }
}
