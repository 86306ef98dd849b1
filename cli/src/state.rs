//! Step tracker: one marker file per completed setup step.
//!
//! A step is done when `<state_dir>/<name>` exists. The marker body holds
//! the RFC 3339 completion time; an unreadable body still counts as done.
//! The tracker enforces no ordering between steps.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::error::StateError;

/// A completed step as reported by [`StepTracker::completed_steps`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepRecord {
    /// Step name.
    pub name: String,
    /// When the step was marked, if the marker body could be parsed.
    pub completed_at: Option<DateTime<Local>>,
}

/// File-backed store of completed step names.
#[derive(Debug, Clone)]
pub struct StepTracker {
    dir: PathBuf,
}

impl StepTracker {
    /// Create a tracker rooted at `dir`. The directory is created lazily.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory holding the marker files.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Whether `name` has been marked completed.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::InvalidStepName`] for names that cannot be
    /// marker file names.
    pub fn is_step_completed(&self, name: &str) -> Result<bool, StateError> {
        let marker = self.marker_path(name)?;
        Ok(marker.is_file())
    }

    /// Mark `name` completed, recording the current time.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is invalid or the marker cannot be written.
    pub fn mark_step_completed(&self, name: &str) -> Result<(), StateError> {
        let marker = self.marker_path(name)?;
        std::fs::create_dir_all(&self.dir).map_err(|source| io_error(&self.dir, source))?;
        let stamp = Local::now().to_rfc3339();
        std::fs::write(&marker, format!("{stamp}\n")).map_err(|source| io_error(&marker, source))
    }

    /// Forget `name`. Returns whether a marker existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is invalid or the marker cannot be removed.
    pub fn reset_step(&self, name: &str) -> Result<bool, StateError> {
        let marker = self.marker_path(name)?;
        match std::fs::remove_file(&marker) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(io_error(&marker, source)),
        }
    }

    /// Forget every step. Returns how many markers were removed.
    ///
    /// Entries that are not markers (directories, dotfiles) are left alone.
    ///
    /// # Errors
    ///
    /// Returns an error if the state directory cannot be read or a marker
    /// cannot be removed.
    pub fn reset_all_steps(&self) -> Result<usize, StateError> {
        let mut removed = 0;
        for name in self.marker_names()? {
            if self.reset_step(&name)? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// All completed steps, sorted by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the state directory cannot be read.
    pub fn completed_steps(&self) -> Result<Vec<StepRecord>, StateError> {
        Ok(self
            .marker_names()?
            .into_iter()
            .map(|name| {
                let completed_at = std::fs::read_to_string(self.dir.join(&name))
                    .ok()
                    .and_then(|body| DateTime::parse_from_rfc3339(body.trim()).ok())
                    .map(|t| t.with_timezone(&Local));
                StepRecord { name, completed_at }
            })
            .collect())
    }

    fn marker_path(&self, name: &str) -> Result<PathBuf, StateError> {
        validate_step_name(name)?;
        Ok(self.dir.join(name))
    }

    fn marker_names(&self) -> Result<Vec<String>, StateError> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(io_error(&self.dir, source)),
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| io_error(&self.dir, source))?;
            if !entry.file_type().is_ok_and(|t| t.is_file()) {
                continue;
            }
            if let Some(name) = entry.file_name().to_str()
                && validate_step_name(name).is_ok()
            {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }
}

/// Check that `name` is usable as a marker file name.
///
/// # Errors
///
/// Returns [`StateError::InvalidStepName`] describing the first problem.
pub fn validate_step_name(name: &str) -> Result<(), StateError> {
    let reject = |reason| {
        Err(StateError::InvalidStepName {
            name: name.to_string(),
            reason,
        })
    };
    if name.is_empty() {
        return reject("is empty");
    }
    if name.starts_with('.') {
        return reject("starts with '.'");
    }
    if name.contains('/') || name.contains('\\') {
        return reject("contains a path separator");
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
    {
        return reject("may only contain letters, digits, '.', '_' and '-'");
    }
    Ok(())
}

fn io_error(path: &Path, source: std::io::Error) -> StateError {
    StateError::Io {
        path: path.display().to_string(),
        source,
    }
}
