//! Output error types.

use std::path::PathBuf;
use thiserror::Error;

/// Output operation error.
#[derive(Debug, Error)]
pub enum OutputError {
    /// File I/O error.
    #[error("failed to {operation} {path}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Temp file was written but could not be renamed into place.
    #[error("failed to replace {target_path}")]
    AtomicWriteFailed {
        temp_path: PathBuf,
        target_path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A backup with the same name already exists.
    #[error("backup already exists: {path}")]
    BackupCollision { path: PathBuf },

    /// Path has no final component to reuse as an output name.
    #[error("path has no file name: {path}")]
    MissingFileName { path: PathBuf },
}

impl OutputError {
    /// Short description for end-of-run summaries.
    pub fn user_message(&self) -> String {
        match self {
            Self::Io {
                operation, path, ..
            } => format!("Could not {} {}", operation, path.display()),
            Self::AtomicWriteFailed { target_path, .. } => format!(
                "Could not write {}. Check disk space and permissions.",
                target_path.display()
            ),
            Self::BackupCollision { path } => format!(
                "A backup named {} already exists; the original was left in place.",
                path.display()
            ),
            Self::MissingFileName { path } => {
                format!("{} does not name a file", path.display())
            }
        }
    }
}

/// Result type alias for output operations.
pub type Result<T> = std::result::Result<T, OutputError>;
