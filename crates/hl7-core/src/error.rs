//! Orchestration error types.

use std::path::PathBuf;

use hl7_ingest::IngestError;
use hl7_output::OutputError;
use thiserror::Error;

/// Failure processing one file. The file is left where it was.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("failed to read {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Output(#[from] OutputError),
}

impl ProcessError {
    /// Short description for end-of-run summaries.
    pub fn user_message(&self) -> String {
        match self {
            Self::Read { path, source } => format!("Could not read {}: {}", path.display(), source),
            Self::Output(error) => error.user_message(),
        }
    }
}

/// Failure that prevents the monitor from running at all.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error("failed to {operation} {path}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Output or backup directory resolves to the input directory.
    #[error("{role} directory must differ from the input directory: {path}")]
    OverlappingDirectories { role: &'static str, path: PathBuf },

    #[error("failed to spawn worker thread")]
    Spawn(#[source] std::io::Error),
}

/// Result type alias for monitor setup.
pub type Result<T> = std::result::Result<T, CoreError>;
