//! Platform locations for configuration files.
//!
//! - macOS: ~/Library/Application Support/org.hl7-interface-manager.HL7 Interface Manager/
//! - Windows: %APPDATA%/hl7-interface-manager/HL7 Interface Manager/config/
//! - Linux: ~/.config/hl7interfacemanager/

use std::path::PathBuf;

use directories::ProjectDirs;

const APP_QUALIFIER: &str = "org";
const APP_ORG: &str = "hl7-interface-manager";
const APP_NAME: &str = "HL7 Interface Manager";
const SETTINGS_FILENAME: &str = "settings.toml";
const STORE_FILENAME: &str = "configurations.json";

/// Platform configuration directory, if one can be determined.
pub fn config_dir() -> Option<PathBuf> {
    ProjectDirs::from(APP_QUALIFIER, APP_ORG, APP_NAME).map(|dirs| dirs.config_dir().to_path_buf())
}

pub fn default_settings_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join(SETTINGS_FILENAME))
}

/// Rule-set store, kept next to the settings file.
pub fn default_store_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join(STORE_FILENAME))
}
