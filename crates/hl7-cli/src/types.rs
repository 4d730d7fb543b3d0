use std::path::PathBuf;

use hl7_config::MonitorSettings;

/// Locations and settings shared by every command.
#[derive(Debug)]
pub struct AppContext {
    pub store_path: PathBuf,
    pub settings_path: Option<PathBuf>,
    pub settings: MonitorSettings,
}

/// One row of the `configs` listing.
#[derive(Debug)]
pub struct ConfigSummary {
    pub name: String,
    pub rules: usize,
    pub conditional: usize,
    pub actions: usize,
}
