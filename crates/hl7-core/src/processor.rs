//! Per-file processing.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use hl7_model::{Record, RuleSet};
use hl7_output::{StagedWrite, backup_path, file_name_of, move_to_backup, write_atomic};
use hl7_transform::{TransformReport, apply_rules};
use tracing::{debug, error, info, info_span};

use crate::context::ProcessingContext;
use crate::error::ProcessError;

/// What happened to one successfully processed file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileOutcome {
    pub input: PathBuf,
    pub output: PathBuf,
    /// Where the original ended up, when a backup directory was set.
    pub backup: Option<PathBuf>,
    pub segments: usize,
    pub report: TransformReport,
}

/// Transform one message file.
///
/// Steps, in order: refuse if the backup name is taken, read, parse, apply
/// the rules, serialize, write `output_dir/<name>` atomically, move the
/// original to `backup_dir/<name>`. The original is only moved after its
/// output is in place; on any error it stays where it was.
///
/// When the output path is the input path itself, the output is staged next
/// to the original, the original is moved to backup, and the staged output
/// is then renamed into place. If that rename fails the original is moved
/// back.
pub fn process_file(path: &Path, ctx: &ProcessingContext) -> Result<FileOutcome, ProcessError> {
    let name = file_name_of(path)?;
    let span = info_span!("process_file", file = %name.to_string_lossy());
    let _guard = span.enter();

    let output = ctx.output_dir.join(name);
    if let Some(backup_dir) = &ctx.backup_dir {
        backup_path(path, backup_dir)?;
    }

    let text = fs::read_to_string(path).map_err(|source| ProcessError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let mut record = Record::parse(&text);
    debug!(segments = record.segment_count(), "parsed");

    let report = apply_rules(&mut record, &ctx.rules);
    let serialized = record.serialize();

    let backup = match &ctx.backup_dir {
        Some(backup_dir) if is_same_directory(&parent_dir(path), &ctx.output_dir) => {
            let staged = StagedWrite::stage(&output, &serialized)?;
            let moved = move_to_backup(path, backup_dir)?;
            if let Err(e) = staged.commit() {
                if let Err(restore) = fs::rename(&moved, path) {
                    error!(backup = %moved.display(), error = %restore, "could not restore original from backup");
                }
                return Err(e.into());
            }
            Some(moved)
        }
        Some(backup_dir) => {
            write_atomic(&output, &serialized)?;
            Some(move_to_backup(path, backup_dir)?)
        }
        None => {
            write_atomic(&output, &serialized)?;
            None
        }
    };

    info!(
        output = %output.display(),
        segments = record.segment_count(),
        rules_applied = report.rules_applied,
        rules_skipped = report.rules_skipped,
        actions_applied = report.actions_applied,
        actions_skipped = report.actions_skipped,
        "processed"
    );

    Ok(FileOutcome {
        input: path.to_path_buf(),
        output,
        backup,
        segments: record.segment_count(),
        report,
    })
}

/// One-shot processing of a single file.
///
/// The output directory defaults to the file's own directory, which
/// overwrites the file in place. Without a backup directory the original is
/// left alone.
pub fn process_single(
    path: &Path,
    output_dir: Option<&Path>,
    backup_dir: Option<&Path>,
    rules: Arc<RuleSet>,
) -> Result<FileOutcome, ProcessError> {
    let output_dir = output_dir.map_or_else(|| parent_dir(path), Path::to_path_buf);
    let mut ctx = ProcessingContext::new(output_dir, rules);
    if let Some(backup_dir) = backup_dir {
        ctx = ctx.with_backup_dir(backup_dir);
    }
    process_file(path, &ctx)
}

pub(crate) fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Compare directories by canonical path, falling back to the literal path
/// when either does not exist yet.
pub(crate) fn is_same_directory(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hl7_model::{Action, Rule};
    use tempfile::tempdir;

    fn rename_rule() -> Arc<RuleSet> {
        Arc::new(RuleSet::new(vec![Rule::Single(Action::ModifyField {
            segment: "PID".to_string(),
            field_index: 2,
            new_value: "Jane".to_string(),
        })]))
    }

    #[test]
    fn parent_dir_of_bare_name_is_current_dir() {
        assert_eq!(parent_dir(Path::new("a.hl7")), PathBuf::from("."));
        assert_eq!(parent_dir(Path::new("/in/a.hl7")), PathBuf::from("/in"));
    }

    #[test]
    fn in_place_with_backup_keeps_original_in_backup() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("adt.hl7");
        fs::write(&input, "PID|1|John\n").unwrap();
        let backup_dir = dir.path().join("backup");

        let outcome = process_single(&input, None, Some(&backup_dir), rename_rule()).unwrap();

        assert_eq!(outcome.output, input);
        assert_eq!(fs::read_to_string(&input).unwrap(), "PID|1|Jane\n");
        assert_eq!(
            fs::read_to_string(backup_dir.join("adt.hl7")).unwrap(),
            "PID|1|John\n"
        );
    }

    #[test]
    fn in_place_write_failure_leaves_original_in_place() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("adt.hl7");
        fs::write(&input, "PID|1|John\n").unwrap();
        // A directory where the temp file would go makes staging fail.
        fs::create_dir(dir.path().join(".adt.hl7.tmp")).unwrap();
        let backup_dir = dir.path().join("backup");

        let err = process_single(&input, None, Some(&backup_dir), rename_rule()).unwrap_err();

        assert!(matches!(err, ProcessError::Output(_)));
        assert_eq!(fs::read_to_string(&input).unwrap(), "PID|1|John\n");
        assert!(!backup_dir.join("adt.hl7").exists());
    }

    #[test]
    fn in_place_without_backup_overwrites() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("adt.hl7");
        fs::write(&input, "PID|1|John\n").unwrap();

        let outcome = process_single(&input, None, None, rename_rule()).unwrap();
        assert_eq!(outcome.backup, None);
        assert_eq!(fs::read_to_string(&input).unwrap(), "PID|1|Jane\n");
    }
}
