//! Directory monitoring.
//!
//! Two producers feed one bounded FIFO queue:
//!
//! 1. **Backlog**: files already in the input directory, sorted by name,
//!    queued before the watch is armed so they are dequeued first.
//! 2. **Watch**: files created in or moved into the directory afterwards.
//!
//! A claim set keeps a path from being queued twice while it is pending, and
//! a rescan right after arming the watch catches files that landed between
//! the backlog listing and the watch becoming active. The rescan skips files
//! that already failed in this run; a fresh arrival at a failed path is
//! processed again.
//!
//! Workers wait for a file's size and modification time to hold still for one
//! poll interval before reading it, so a file picked up while its writer is
//! still going is not processed half written.
//!
//! Stopping is cooperative. Workers check a stop flag before each dequeue,
//! so a file being processed always finishes; files still queued stay in the
//! input directory for the next run.

use std::collections::HashSet;
use std::error::Error as StdError;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, SystemTime};

use crossbeam_channel::{Receiver, RecvTimeoutError, SendTimeoutError, Sender};
use hl7_ingest::{DEFAULT_EXTENSION, DirectoryWatcher, IngestError, list_message_files};
use hl7_model::RuleSet;
use hl7_transform::TransformReport;
use tracing::{Span, debug, error, info, info_span, warn};

use crate::context::ProcessingContext;
use crate::error::{CoreError, ProcessError, Result};
use crate::processor::{FileOutcome, is_same_directory, process_file};

pub const DEFAULT_WORKERS: usize = 1;
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// How often blocked producers and idle workers re-check the stop flag.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Directories and sizing for one monitor run.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub backup_dir: PathBuf,
    /// Message file extension, matched case-insensitively.
    pub extension: String,
    pub workers: usize,
    pub queue_capacity: usize,
}

impl MonitorConfig {
    pub fn new(
        input_dir: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
        backup_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            input_dir: input_dir.into(),
            output_dir: output_dir.into(),
            backup_dir: backup_dir.into(),
            extension: DEFAULT_EXTENSION.to_string(),
            workers: DEFAULT_WORKERS,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }

    #[must_use]
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    #[must_use]
    pub fn with_queue_capacity(mut self, queue_capacity: usize) -> Self {
        self.queue_capacity = queue_capacity;
        self
    }
}

/// Result of one file, published on [`MonitorHandle::outcomes`].
#[derive(Debug)]
pub struct FileResult {
    pub path: PathBuf,
    pub result: std::result::Result<FileOutcome, ProcessError>,
}

/// A file that could not be processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedFile {
    pub path: PathBuf,
    pub message: String,
}

/// Totals for a monitor run, returned by [`MonitorHandle::stop`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MonitorSummary {
    pub processed: usize,
    pub failed: usize,
    /// Queued files that were gone by the time a worker picked them up.
    pub vanished: usize,
    /// Files still queued when the monitor stopped, left in the input
    /// directory.
    pub left_queued: usize,
    pub report: TransformReport,
    pub failures: Vec<FailedFile>,
}

impl MonitorSummary {
    fn merge(&mut self, other: Self) {
        self.processed += other.processed;
        self.failed += other.failed;
        self.vanished += other.vanished;
        self.left_queued += other.left_queued;
        self.report.merge(&other.report);
        self.failures.extend(other.failures);
    }
}

/// State shared by producers, workers and the handle.
#[derive(Debug, Default)]
struct Shared {
    claims: Mutex<HashSet<PathBuf>>,
    /// Paths that failed this run, kept out of the post-arm rescan.
    failed: Mutex<HashSet<PathBuf>>,
    stop: AtomicBool,
}

impl Shared {
    fn claims(&self) -> MutexGuard<'_, HashSet<PathBuf>> {
        self.claims.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns `false` if the path is already pending.
    fn claim(&self, path: &Path) -> bool {
        self.claims().insert(path.to_path_buf())
    }

    fn release(&self, path: &Path) {
        self.claims().remove(path);
    }

    fn failed(&self) -> MutexGuard<'_, HashSet<PathBuf>> {
        self.failed.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Like [`Shared::claim`], but also refuses paths that failed this run.
    fn claim_unless_failed(&self, path: &Path) -> bool {
        let failed = self.failed();
        !failed.contains(path) && self.claim(path)
    }

    /// Record a failure and release the claim so a later arrival at the same
    /// path is queued again.
    fn fail(&self, path: &Path) {
        let mut failed = self.failed();
        failed.insert(path.to_path_buf());
        self.release(path);
    }

    fn succeed(&self, path: &Path) {
        self.failed().remove(path);
        self.release(path);
    }

    fn is_stopped(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }
}

/// Producer side of the work queue.
#[derive(Debug, Clone)]
struct Feeder {
    queue: Sender<PathBuf>,
    shared: Arc<Shared>,
}

impl Feeder {
    /// Queue `path` unless it is already pending. Blocks while the queue is
    /// full, giving up once the monitor stops.
    fn offer(&self, path: PathBuf) -> bool {
        if !self.shared.claim(&path) {
            debug!(path = %path.display(), "already pending");
            return false;
        }
        self.send(path)
    }

    /// Queue `path` unless it is pending or already failed this run.
    fn offer_unless_failed(&self, path: PathBuf) -> bool {
        if !self.shared.claim_unless_failed(&path) {
            return false;
        }
        self.send(path)
    }

    fn send(&self, path: PathBuf) -> bool {
        let mut pending = path;
        loop {
            if self.shared.is_stopped() {
                self.shared.release(&pending);
                return false;
            }
            match self.queue.send_timeout(pending, POLL_INTERVAL) {
                Ok(()) => return true,
                Err(SendTimeoutError::Timeout(path)) => pending = path,
                Err(SendTimeoutError::Disconnected(path)) => {
                    self.shared.release(&path);
                    return false;
                }
            }
        }
    }
}

/// Entry point for directory monitoring.
#[derive(Debug)]
pub struct Monitor;

impl Monitor {
    /// Start workers, queue the backlog, and arm the watch.
    ///
    /// Returns once the backlog is queued and the watch is live.
    ///
    /// # Errors
    ///
    /// Fails if the input directory is missing, if the output or backup
    /// directory is the input directory or cannot be created, or if the
    /// watch cannot be armed.
    pub fn start(config: &MonitorConfig, rules: Arc<RuleSet>) -> Result<MonitorHandle> {
        let span = info_span!("monitor", input = %config.input_dir.display());
        let _guard = span.enter();

        if !config.input_dir.is_dir() {
            return Err(IngestError::DirectoryNotFound {
                path: config.input_dir.clone(),
            }
            .into());
        }
        for (role, dir) in [("output", &config.output_dir), ("backup", &config.backup_dir)] {
            fs::create_dir_all(dir).map_err(|source| CoreError::Io {
                operation: "create directory",
                path: dir.clone(),
                source,
            })?;
            if is_same_directory(dir, &config.input_dir) {
                return Err(CoreError::OverlappingDirectories {
                    role,
                    path: dir.clone(),
                });
            }
        }

        let ctx = ProcessingContext::new(&config.output_dir, rules)
            .with_backup_dir(&config.backup_dir);
        let (queue_tx, queue_rx) = crossbeam_channel::bounded(config.queue_capacity.max(1));
        let (outcome_tx, outcome_rx) = crossbeam_channel::unbounded();
        let shared = Arc::new(Shared::default());

        let mut handle = MonitorHandle {
            input_dir: config.input_dir.clone(),
            shared: Arc::clone(&shared),
            watcher: None,
            feeder: Some(Feeder {
                queue: queue_tx,
                shared: Arc::clone(&shared),
            }),
            queue: queue_rx.clone(),
            workers: Vec::new(),
            outcomes: outcome_rx,
            span: span.clone(),
        };

        let worker_count = config.workers.max(1);
        for id in 0..worker_count {
            let worker = Worker {
                queue: queue_rx.clone(),
                ctx: ctx.clone(),
                shared: Arc::clone(&shared),
                outcomes: outcome_tx.clone(),
                span: span.clone(),
            };
            let spawned = thread::Builder::new()
                .name(format!("hl7-worker-{id}"))
                .spawn(move || worker.run());
            match spawned {
                Ok(join) => handle.workers.push(join),
                Err(e) => {
                    handle.shutdown();
                    return Err(CoreError::Spawn(e));
                }
            }
        }

        if let Err(e) = handle.arm(config) {
            handle.shutdown();
            return Err(e);
        }

        info!(
            output = %config.output_dir.display(),
            backup = %config.backup_dir.display(),
            extension = %config.extension,
            workers = worker_count,
            "monitoring started"
        );
        Ok(handle)
    }
}

/// A running monitor. Dropping it stops the monitor.
#[derive(Debug)]
pub struct MonitorHandle {
    input_dir: PathBuf,
    shared: Arc<Shared>,
    watcher: Option<DirectoryWatcher>,
    feeder: Option<Feeder>,
    queue: Receiver<PathBuf>,
    workers: Vec<JoinHandle<MonitorSummary>>,
    outcomes: Receiver<FileResult>,
    span: Span,
}

impl MonitorHandle {
    pub fn input_dir(&self) -> &Path {
        &self.input_dir
    }

    /// Per-file results as workers finish them.
    pub fn outcomes(&self) -> &Receiver<FileResult> {
        &self.outcomes
    }

    pub fn is_running(&self) -> bool {
        !self.shared.is_stopped()
    }

    /// Stop watching, let in-flight files finish, and join the workers.
    pub fn stop(mut self) -> MonitorSummary {
        self.shutdown()
    }

    fn arm(&mut self, config: &MonitorConfig) -> Result<()> {
        let Some(feeder) = self.feeder.clone() else {
            return Ok(());
        };

        let backlog = list_message_files(&config.input_dir, &config.extension)?;
        info!(count = backlog.len(), "queueing backlog");
        for path in backlog {
            feeder.offer(path);
        }

        let watch_feeder = feeder.clone();
        let span = self.span.clone();
        let watcher = DirectoryWatcher::watch(&config.input_dir, &config.extension, move |path| {
            let _guard = span.enter();
            info!(path = %path.display(), "file detected");
            watch_feeder.offer(path);
        })?;
        self.watcher = Some(watcher);

        let late = list_message_files(&config.input_dir, &config.extension)?;
        let mut caught = 0;
        for path in late {
            if feeder.offer_unless_failed(path) {
                caught += 1;
            }
        }
        if caught > 0 {
            debug!(count = caught, "queued files that arrived while arming the watch");
        }
        Ok(())
    }

    fn shutdown(&mut self) -> MonitorSummary {
        let _guard = self.span.enter();
        self.shared.stop.store(true, Ordering::SeqCst);
        self.watcher = None;
        self.feeder = None;

        let mut summary = MonitorSummary::default();
        for worker in self.workers.drain(..) {
            match worker.join() {
                Ok(partial) => summary.merge(partial),
                Err(_) => error!("worker thread panicked"),
            }
        }
        summary.left_queued += self.queue.len();
        if summary.left_queued > 0 {
            warn!(count = summary.left_queued, "files left queued in the input directory");
        }

        info!(
            processed = summary.processed,
            failed = summary.failed,
            "monitoring stopped"
        );
        summary
    }
}

impl Drop for MonitorHandle {
    fn drop(&mut self) {
        if !self.workers.is_empty() {
            self.shutdown();
        }
    }
}

struct Worker {
    queue: Receiver<PathBuf>,
    ctx: ProcessingContext,
    shared: Arc<Shared>,
    outcomes: Sender<FileResult>,
    span: Span,
}

impl Worker {
    fn run(self) -> MonitorSummary {
        let _guard = self.span.enter();
        let mut summary = MonitorSummary::default();

        while !self.shared.is_stopped() {
            let path = match self.queue.recv_timeout(POLL_INTERVAL) {
                Ok(path) => path,
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => break,
            };
            if self.shared.is_stopped() {
                self.shared.release(&path);
                summary.left_queued += 1;
                break;
            }
            if !self.wait_until_settled(&path) {
                if self.shared.is_stopped() {
                    self.shared.release(&path);
                    summary.left_queued += 1;
                    break;
                }
                debug!(path = %path.display(), "file no longer present, skipping");
                self.shared.release(&path);
                summary.vanished += 1;
                continue;
            }

            let result = process_file(&path, &self.ctx);
            match &result {
                Ok(outcome) => {
                    summary.processed += 1;
                    summary.report.merge(&outcome.report);
                    self.shared.succeed(&path);
                }
                Err(e) => {
                    let message = error_chain(e);
                    error!(path = %path.display(), error = %message, "processing failed, file left in place");
                    summary.failed += 1;
                    summary.failures.push(FailedFile {
                        path: path.clone(),
                        message,
                    });
                    self.shared.fail(&path);
                }
            }
            let _ = self.outcomes.send(FileResult { path, result });
        }

        summary
    }

    /// Block until `path` stops changing for one poll interval. Returns
    /// `false` if the file disappears or the monitor stops first.
    fn wait_until_settled(&self, path: &Path) -> bool {
        let Some(mut last) = file_state(path) else {
            return false;
        };
        loop {
            thread::sleep(POLL_INTERVAL);
            if self.shared.is_stopped() {
                return false;
            }
            let Some(current) = file_state(path) else {
                return false;
            };
            if current == last {
                return true;
            }
            debug!(path = %path.display(), "file still being written");
            last = current;
        }
    }
}

/// Size and modification time of a regular file.
fn file_state(path: &Path) -> Option<(u64, Option<SystemTime>)> {
    let metadata = fs::metadata(path).ok().filter(fs::Metadata::is_file)?;
    Some((metadata.len(), metadata.modified().ok()))
}

/// Render an error with its source chain, `outer: inner: ...`.
fn error_chain(error: &dyn StdError) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claims_reject_pending_paths() {
        let shared = Shared::default();
        let path = Path::new("/in/a.hl7");
        assert!(shared.claim(path));
        assert!(!shared.claim(path));
        shared.release(path);
        assert!(shared.claim(path));
    }

    #[test]
    fn failed_paths_are_released_but_remembered() {
        let shared = Shared::default();
        let path = Path::new("/in/a.hl7");
        assert!(shared.claim(path));
        shared.fail(path);
        assert!(!shared.claim_unless_failed(path));
        assert!(shared.claim(path));
        shared.succeed(path);
        assert!(shared.claim_unless_failed(path));
    }

    #[test]
    fn feeder_gives_up_when_stopped() {
        let shared = Arc::new(Shared::default());
        let (tx, rx) = crossbeam_channel::bounded(1);
        let feeder = Feeder {
            queue: tx,
            shared: Arc::clone(&shared),
        };
        assert!(feeder.offer(PathBuf::from("/in/a.hl7")));
        shared.stop.store(true, Ordering::SeqCst);
        assert!(!feeder.offer(PathBuf::from("/in/b.hl7")));
        assert!(!shared.claim(Path::new("/in/a.hl7")));
        assert!(shared.claim(Path::new("/in/b.hl7")));
        assert_eq!(rx.len(), 1);
    }

    #[test]
    fn error_chain_includes_sources() {
        let error = ProcessError::Read {
            path: PathBuf::from("/in/a.hl7"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        assert_eq!(error_chain(&error), "failed to read /in/a.hl7: gone");
    }
}
