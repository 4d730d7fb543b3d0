//! Pipeline orchestration for HL7 message files.
//!
//! [`process_file`] is the single per-file routine: read, transform, write
//! the output atomically, then move the original to backup. [`Monitor`]
//! feeds it from a directory backlog and a live watch through one work queue.

pub mod context;
pub mod error;
pub mod monitor;
pub mod processor;

pub use context::ProcessingContext;
pub use error::{CoreError, ProcessError, Result};
pub use monitor::{
    DEFAULT_QUEUE_CAPACITY, DEFAULT_WORKERS, FailedFile, FileResult, Monitor, MonitorConfig,
    MonitorHandle, MonitorSummary,
};
pub use processor::{FileOutcome, process_file, process_single};
