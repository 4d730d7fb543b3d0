//! Monitor settings.
//!
//! Every field is optional in the file; missing ones take their defaults.
//! Command-line flags override whatever is loaded here.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use hl7_output::write_atomic;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Directories, active rule set and sizing for `monitor`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorSettings {
    pub input_dir: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub backup_dir: Option<PathBuf>,
    /// Name of the rule set applied when none is given on the command line.
    pub active_config: Option<String>,
    /// Message file extension, without the dot.
    pub extension: String,
    pub workers: usize,
    pub queue_capacity: usize,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            input_dir: None,
            output_dir: None,
            backup_dir: None,
            active_config: None,
            extension: "hl7".to_string(),
            workers: 1,
            queue_capacity: 64,
        }
    }
}

/// Load settings from `path`.
///
/// Returns defaults if the file is missing, unreadable or cannot be parsed.
pub fn load_settings(path: &Path) -> MonitorSettings {
    match fs::read_to_string(path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(settings) => {
                tracing::info!(path = %path.display(), "loaded settings");
                settings
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to parse settings, using defaults");
                MonitorSettings::default()
            }
        },
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "no settings file, using defaults");
            MonitorSettings::default()
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to read settings, using defaults");
            MonitorSettings::default()
        }
    }
}

/// Save settings to `path`, creating the parent directory if needed.
pub fn save_settings(settings: &MonitorSettings, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(settings).map_err(ConfigError::SettingsSerialize)?;
    write_atomic(path, &content)?;
    tracing::info!(path = %path.display(), "saved settings");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_fills_defaults() {
        let settings: MonitorSettings = toml::from_str(
            r#"
            input_dir = "/data/in"
            workers = 4
            "#,
        )
        .unwrap();
        assert_eq!(settings.input_dir, Some(PathBuf::from("/data/in")));
        assert_eq!(settings.workers, 4);
        assert_eq!(settings.extension, "hl7");
        assert_eq!(settings.queue_capacity, 64);
        assert_eq!(settings.output_dir, None);
    }

    #[test]
    fn settings_round_trip() {
        let settings = MonitorSettings {
            input_dir: Some(PathBuf::from("/data/in")),
            active_config: Some("lab".to_string()),
            ..MonitorSettings::default()
        };
        let text = toml::to_string_pretty(&settings).unwrap();
        let parsed: MonitorSettings = toml::from_str(&text).unwrap();
        assert_eq!(parsed, settings);
    }
}
