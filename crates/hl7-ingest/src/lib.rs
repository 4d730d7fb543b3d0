//! Input discovery for HL7 message files.
//!
//! - **discovery**: one-time listing of message files already in a directory
//! - **watch**: live feed of files created in or moved into a directory

pub mod discovery;
pub mod error;
pub mod watch;

pub use discovery::{DEFAULT_EXTENSION, has_extension, list_message_files};
pub use error::{IngestError, Result};
pub use watch::DirectoryWatcher;
