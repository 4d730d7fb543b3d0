//! Configuration error types.

use std::path::PathBuf;

use hl7_model::ModelError;
use hl7_output::OutputError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to {operation} {path}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {path}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Store file is valid JSON but not an object of named rule sets.
    #[error("expected an object of named rule sets in {path}, found {found}")]
    StoreShape { path: PathBuf, found: &'static str },

    #[error("failed to serialize rule sets")]
    Serialize(#[source] serde_json::Error),

    #[error("failed to serialize settings")]
    SettingsSerialize(#[source] toml::ser::Error),

    #[error("no configuration named '{name}'")]
    UnknownConfig { name: String },

    /// Stored configuration is not a rule array.
    #[error("configuration '{name}' is not a rule set")]
    InvalidConfig {
        name: String,
        #[source]
        source: ModelError,
    },

    #[error("could not determine the platform configuration directory")]
    NoConfigDir,

    #[error(transparent)]
    Output(#[from] OutputError),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
