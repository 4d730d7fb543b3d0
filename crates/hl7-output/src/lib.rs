//! Output side of the pipeline.
//!
//! - **writer**: atomic replacement of an output file
//! - **backup**: relocation of a processed original

pub mod backup;
pub mod error;
pub mod writer;

pub use backup::{backup_path, move_to_backup};
pub use error::{OutputError, Result};
pub use writer::{StagedWrite, file_name_of, write_atomic};
