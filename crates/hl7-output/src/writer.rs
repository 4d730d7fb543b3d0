//! Atomic output writing.

use std::ffi::OsStr;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{OutputError, Result};

/// Final path component of `path`.
pub fn file_name_of(path: &Path) -> Result<&OsStr> {
    path.file_name().ok_or_else(|| OutputError::MissingFileName {
        path: path.to_path_buf(),
    })
}

/// Hidden sibling used while `target` is being written.
///
/// The `.tmp` suffix keeps it out of any message-extension filter.
fn temp_path_for(target: &Path) -> Result<PathBuf> {
    let mut name = std::ffi::OsString::from(".");
    name.push(file_name_of(target)?);
    name.push(".tmp");
    Ok(target.with_file_name(name))
}

/// Output written to its temp sibling and synced, but not yet in place.
///
/// [`StagedWrite::commit`] renames it over the target. Dropping an
/// uncommitted write removes the temp file.
#[derive(Debug)]
pub struct StagedWrite {
    temp_path: PathBuf,
    target: PathBuf,
    bytes: usize,
    committed: bool,
}

impl StagedWrite {
    /// Write `contents` next to `target` without touching `target` itself.
    /// Parent directories are created as needed.
    pub fn stage(target: &Path, contents: &str) -> Result<Self> {
        if let Some(parent) = target.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| OutputError::Io {
                operation: "create directory",
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let temp_path = temp_path_for(target)?;

        let mut file = File::create(&temp_path).map_err(|e| OutputError::Io {
            operation: "create",
            path: temp_path.clone(),
            source: e,
        })?;
        let staged = Self {
            temp_path,
            target: target.to_path_buf(),
            bytes: contents.len(),
            committed: false,
        };

        let written = file
            .write_all(contents.as_bytes())
            .map_err(|e| ("write", e))
            .and_then(|()| file.sync_all().map_err(|e| ("sync", e)));
        drop(file);
        if let Err((operation, source)) = written {
            return Err(OutputError::Io {
                operation,
                path: staged.temp_path.clone(),
                source,
            });
        }
        Ok(staged)
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Rename the staged file over the target.
    pub fn commit(mut self) -> Result<()> {
        fs::rename(&self.temp_path, &self.target).map_err(|e| OutputError::AtomicWriteFailed {
            temp_path: self.temp_path.clone(),
            target_path: self.target.clone(),
            source: e,
        })?;
        self.committed = true;
        tracing::debug!(path = %self.target.display(), bytes = self.bytes, "wrote output");
        Ok(())
    }
}

impl Drop for StagedWrite {
    fn drop(&mut self) {
        if !self.committed {
            let _ = fs::remove_file(&self.temp_path);
        }
    }
}

/// Write `contents` to `target`, replacing any existing file.
///
/// The data goes to a temp file in the same directory, is synced, then
/// renamed over `target`, so readers never observe a partial file. Parent
/// directories are created as needed.
pub fn write_atomic(target: &Path, contents: &str) -> Result<()> {
    StagedWrite::stage(target, contents)?.commit()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn temp_name_is_hidden_sibling() {
        let temp = temp_path_for(Path::new("/out/a.hl7")).unwrap();
        assert_eq!(temp, PathBuf::from("/out/.a.hl7.tmp"));
    }

    #[test]
    fn write_creates_parents_and_replaces() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("nested").join("a.hl7");

        write_atomic(&target, "MSH|A\n").unwrap();
        assert_eq!(fs::read_to_string(&target).unwrap(), "MSH|A\n");

        write_atomic(&target, "MSH|B\n").unwrap();
        assert_eq!(fs::read_to_string(&target).unwrap(), "MSH|B\n");

        let leftovers: Vec<_> = fs::read_dir(target.parent().unwrap())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn dropped_stage_leaves_target_alone() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("a.hl7");
        fs::write(&target, "MSH|old\n").unwrap();

        let staged = StagedWrite::stage(&target, "MSH|new\n").unwrap();
        assert_eq!(fs::read_to_string(&target).unwrap(), "MSH|old\n");
        assert!(dir.path().join(".a.hl7.tmp").is_file());
        drop(staged);

        assert!(!dir.path().join(".a.hl7.tmp").exists());
        assert_eq!(fs::read_to_string(&target).unwrap(), "MSH|old\n");
    }

    #[test]
    fn root_path_has_no_file_name() {
        assert!(matches!(
            write_atomic(Path::new("/"), ""),
            Err(OutputError::MissingFileName { .. })
        ));
    }
}
