//! Per-run processing context.

use std::path::PathBuf;
use std::sync::Arc;

use hl7_model::RuleSet;

/// Everything [`crate::process_file`] needs besides the input path.
///
/// The rule set is shared read-only between workers.
#[derive(Debug, Clone)]
pub struct ProcessingContext {
    pub output_dir: PathBuf,
    /// Where originals go once their output is written; `None` leaves them.
    pub backup_dir: Option<PathBuf>,
    pub rules: Arc<RuleSet>,
}

impl ProcessingContext {
    pub fn new(output_dir: impl Into<PathBuf>, rules: Arc<RuleSet>) -> Self {
        Self {
            output_dir: output_dir.into(),
            backup_dir: None,
            rules,
        }
    }

    #[must_use]
    pub fn with_backup_dir(mut self, backup_dir: impl Into<PathBuf>) -> Self {
        self.backup_dir = Some(backup_dir.into());
        self
    }
}
