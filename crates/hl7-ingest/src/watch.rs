//! Live directory feed.
//!
//! Reports message files that appear in a directory after the watch is armed,
//! whether written there or moved in from elsewhere. Files already present are
//! not reported; list them with [`crate::list_message_files`].
//!
//! On Linux a file written in place is reported when its writer closes it,
//! not when it is created. Other platforms have no close event and report it
//! on creation.

use std::path::{Path, PathBuf};

#[cfg(target_os = "linux")]
use notify::event::{AccessKind, AccessMode};
use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, warn};

use crate::discovery::has_extension;
use crate::error::{IngestError, Result};

/// Keeps a non-recursive watch on one directory alive.
///
/// Dropping the watcher stops the feed.
pub struct DirectoryWatcher {
    dir: PathBuf,
    _inner: RecommendedWatcher,
}

impl std::fmt::Debug for DirectoryWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryWatcher")
            .field("dir", &self.dir)
            .finish_non_exhaustive()
    }
}

impl DirectoryWatcher {
    /// Start watching `dir`, calling `on_file` for every arriving file whose
    /// extension matches.
    ///
    /// The callback runs on the watcher's own thread and may be invoked more
    /// than once for the same path; callers de-duplicate.
    pub fn watch<F>(dir: &Path, extension: &str, on_file: F) -> Result<Self>
    where
        F: Fn(PathBuf) + Send + 'static,
    {
        if !dir.is_dir() {
            return Err(IngestError::DirectoryNotFound {
                path: dir.to_path_buf(),
            });
        }

        let extension = extension.to_string();
        let mut inner = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if let Some(path) = arrived_path(&event)
                    && path.is_file()
                    && has_extension(&path, &extension)
                {
                    debug!(path = %path.display(), kind = ?event.kind, "file arrived");
                    on_file(path);
                }
            }
            Err(error) => warn!(%error, "watch error"),
        })
        .map_err(|source| IngestError::Watch {
            path: dir.to_path_buf(),
            source,
        })?;

        inner
            .watch(dir, RecursiveMode::NonRecursive)
            .map_err(|source| IngestError::Watch {
                path: dir.to_path_buf(),
                source,
            })?;

        Ok(Self {
            dir: dir.to_path_buf(),
            _inner: inner,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

/// The path a file now lives at, for events that mean "a file showed up".
fn arrived_path(event: &Event) -> Option<PathBuf> {
    match event.kind {
        #[cfg(target_os = "linux")]
        EventKind::Access(AccessKind::Close(AccessMode::Write)) => event.paths.first().cloned(),
        #[cfg(not(target_os = "linux"))]
        EventKind::Create(_) => event.paths.first().cloned(),
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => event.paths.first().cloned(),
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => event.paths.get(1).cloned(),
        // Platforms that cannot tell rename sides apart report both paths
        // separately; only the one that exists is the destination.
        EventKind::Modify(ModifyKind::Name(RenameMode::Any)) => {
            event.paths.iter().find(|p| p.exists()).cloned()
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::CreateKind;

    fn event(kind: EventKind, paths: &[&str]) -> Event {
        let mut event = Event::new(kind);
        for path in paths {
            event = event.add_path(PathBuf::from(path));
        }
        event
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn closed_after_write_is_an_arrival_but_create_is_not() {
        let created = event(EventKind::Create(CreateKind::File), &["/in/a.hl7"]);
        assert_eq!(arrived_path(&created), None);

        let closed = event(
            EventKind::Access(AccessKind::Close(AccessMode::Write)),
            &["/in/a.hl7"],
        );
        assert_eq!(arrived_path(&closed), Some(PathBuf::from("/in/a.hl7")));

        let read = event(
            EventKind::Access(AccessKind::Close(AccessMode::Read)),
            &["/in/a.hl7"],
        );
        assert_eq!(arrived_path(&read), None);
    }

    #[cfg(not(target_os = "linux"))]
    #[test]
    fn create_is_an_arrival() {
        let created = event(EventKind::Create(CreateKind::File), &["/in/a.hl7"]);
        assert_eq!(arrived_path(&created), Some(PathBuf::from("/in/a.hl7")));
    }

    #[test]
    fn rename_destinations_are_arrivals() {
        let renamed_to = event(
            EventKind::Modify(ModifyKind::Name(RenameMode::To)),
            &["/in/b.hl7"],
        );
        assert_eq!(arrived_path(&renamed_to), Some(PathBuf::from("/in/b.hl7")));

        let both = event(
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)),
            &["/tmp/c.hl7", "/in/c.hl7"],
        );
        assert_eq!(arrived_path(&both), Some(PathBuf::from("/in/c.hl7")));
    }

    #[test]
    fn other_events_are_ignored() {
        let renamed_from = event(
            EventKind::Modify(ModifyKind::Name(RenameMode::From)),
            &["/in/a.hl7"],
        );
        assert_eq!(arrived_path(&renamed_from), None);

        let data = event(
            EventKind::Modify(ModifyKind::Data(notify::event::DataChange::Content)),
            &["/in/a.hl7"],
        );
        assert_eq!(arrived_path(&data), None);
        assert_eq!(
            arrived_path(&event(EventKind::Remove(notify::event::RemoveKind::File), &["/in/a.hl7"])),
            None
        );
    }
}
