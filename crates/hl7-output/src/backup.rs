//! Backup relocation of processed originals.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::{OutputError, Result};
use crate::writer::file_name_of;

/// Where `original` lands inside `backup_dir`.
///
/// # Errors
///
/// [`OutputError::BackupCollision`] if a file with that name is already
/// there.
pub fn backup_path(original: &Path, backup_dir: &Path) -> Result<PathBuf> {
    let target = backup_dir.join(file_name_of(original)?);
    if target.exists() {
        return Err(OutputError::BackupCollision { path: target });
    }
    Ok(target)
}

/// Move `original` into `backup_dir` under its own name.
///
/// Tries a rename first and falls back to copy then remove when the backup
/// directory is on another filesystem. An existing backup is never
/// overwritten. Returns the backup path.
pub fn move_to_backup(original: &Path, backup_dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(backup_dir).map_err(|e| OutputError::Io {
        operation: "create directory",
        path: backup_dir.to_path_buf(),
        source: e,
    })?;
    let target = backup_path(original, backup_dir)?;

    match fs::rename(original, &target) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::CrossesDevices => {
            tracing::debug!(
                from = %original.display(),
                to = %target.display(),
                "rename crosses filesystems, copying"
            );
            copy_then_remove(original, &target)?;
        }
        Err(e) => {
            return Err(OutputError::Io {
                operation: "move",
                path: original.to_path_buf(),
                source: e,
            });
        }
    }

    tracing::debug!(from = %original.display(), to = %target.display(), "moved to backup");
    Ok(target)
}

fn copy_then_remove(original: &Path, target: &Path) -> Result<()> {
    fs::copy(original, target).map_err(|e| OutputError::Io {
        operation: "copy",
        path: original.to_path_buf(),
        source: e,
    })?;
    fs::remove_file(original).map_err(|e| OutputError::Io {
        operation: "remove",
        path: original.to_path_buf(),
        source: e,
    })
}
