//! Backlog discovery.

use std::path::{Path, PathBuf};

use crate::error::{IngestError, Result};

/// Extension of message files picked up when none is configured.
pub const DEFAULT_EXTENSION: &str = "hl7";

/// Whether `path` ends in `.{extension}`, compared case-insensitively.
pub fn has_extension(path: &Path, extension: &str) -> bool {
    let extension = extension.trim_start_matches('.');
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
}

/// Lists the message files directly inside `dir`.
///
/// Only regular files whose extension matches are returned, sorted by file
/// name. Sub-directories are not descended into.
pub fn list_message_files(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(IngestError::DirectoryNotFound {
            path: dir.to_path_buf(),
        });
    }

    let entries = std::fs::read_dir(dir).map_err(|e| IngestError::DirectoryRead {
        path: dir.to_path_buf(),
        source: e,
    })?;

    let mut files = Vec::new();
    for entry_result in entries {
        let entry = entry_result.map_err(|e| IngestError::DirectoryRead {
            path: dir.to_path_buf(),
            source: e,
        })?;
        let path = entry.path();
        if path.is_file() && has_extension(&path, extension) {
            files.push(path);
        }
    }

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_match_ignores_case_and_dot() {
        assert!(has_extension(Path::new("/in/a.HL7"), "hl7"));
        assert!(has_extension(Path::new("/in/a.hl7"), ".hl7"));
        assert!(!has_extension(Path::new("/in/a.hl7.tmp"), "hl7"));
        assert!(!has_extension(Path::new("/in/hl7"), "hl7"));
    }
}
