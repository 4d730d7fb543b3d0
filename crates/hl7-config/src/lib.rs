//! Persistent configuration for the HL7 interface manager.
//!
//! - **settings**: monitor directories and sizing, stored as TOML
//! - **store**: named rule sets, stored as one JSON object

pub mod error;
pub mod paths;
pub mod settings;
pub mod store;

pub use error::{ConfigError, Result};
pub use paths::{config_dir, default_settings_path, default_store_path};
pub use settings::{MonitorSettings, load_settings, save_settings};
pub use store::ConfigStore;
