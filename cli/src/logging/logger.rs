//! The [`Log`] implementation used by the binary.
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use super::subscriber::{DRY_RUN_TARGET, STAGE_TARGET};
use super::types::{Log, TaskEntry, TaskStatus};
use super::utils::log_file_path;

/// Sends messages through [`tracing`] and keeps every [`TaskEntry`] for the
/// end-of-run summary.
///
/// Rendering is left to the subscriber from
/// [`init_subscriber`](super::subscriber::init_subscriber): the console in
/// the `==>` style, and `$XDG_CACHE_HOME/hostsetup/<command>.log`.
#[derive(Debug)]
pub struct Logger {
    entries: Mutex<Vec<TaskEntry>>,
    log_file: Option<PathBuf>,
}

impl Logger {
    /// Logger for `command`, pointing its summary at that command's log file.
    #[must_use]
    pub fn new(command: &str) -> Self {
        Self::with_log_file(log_file_path(command))
    }

    /// Logger whose summary names `log_file`.
    #[must_use]
    pub const fn with_log_file(log_file: Option<PathBuf>) -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            log_file,
        }
    }

    /// Log file named in the summary.
    #[must_use]
    pub const fn log_path(&self) -> Option<&PathBuf> {
        self.log_file.as_ref()
    }

    /// Entries recorded so far, in order.
    #[must_use]
    pub fn task_entries(&self) -> Vec<TaskEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of entries with [`TaskStatus::Failed`].
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|e| e.status == TaskStatus::Failed)
            .count()
    }

    /// At least one task failed.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.failure_count() > 0
    }

    /// One line per task, then the totals and the log file location.
    /// Prints nothing when no task was recorded.
    pub fn print_summary(&self) {
        let entries = self.task_entries();
        if entries.is_empty() {
            return;
        }
        self.stage("Summary");

        let mut counts: BTreeMap<TaskStatus, usize> = BTreeMap::new();
        for entry in &entries {
            *counts.entry(entry.status).or_default() += 1;
            let status = entry.status;
            self.info(&format!(
                "\x1b[{}m{} {}\x1b[0m",
                status.colour(),
                status.glyph(),
                entry.describe()
            ));
        }
        self.info(&totals_line(entries.len(), &counts));

        if let Some(path) = &self.log_file {
            self.info(&format!("\x1b[2mlog: {}\x1b[0m", path.display()));
        }
    }
}

/// `N task(s): 2 done, 1 failed` with zero counts left out.
fn totals_line(total: usize, counts: &BTreeMap<TaskStatus, usize>) -> String {
    let parts: Vec<String> = TaskStatus::ALL
        .into_iter()
        .filter_map(|status| {
            let n = counts.get(&status).copied().unwrap_or(0);
            (n > 0).then(|| format!("\x1b[{}m{n} {}\x1b[0m", status.colour(), status.label()))
        })
        .collect();
    format!("{total} task(s): {}", parts.join(", "))
}

impl Log for Logger {
    fn stage(&self, msg: &str) {
        tracing::info!(target: STAGE_TARGET, "{msg}");
    }

    fn info(&self, msg: &str) {
        tracing::info!("{msg}");
    }

    fn debug(&self, msg: &str) {
        tracing::debug!("{msg}");
    }

    fn warn(&self, msg: &str) {
        tracing::warn!("{msg}");
    }

    fn error(&self, msg: &str) {
        tracing::error!("{msg}");
    }

    fn dry_run(&self, msg: &str) {
        tracing::info!(target: DRY_RUN_TARGET, "{msg}");
    }

    fn record_task(&self, entry: TaskEntry) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry);
    }
}
