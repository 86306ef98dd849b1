//! Timestamped backups of system files.
//!
//! Layout: `<root>/<YYYYMMDD-HHMMSS>/<path relative to sysroot>`. A second
//! backup of the same file within one second goes to `<stamp>-1/`, then
//! `<stamp>-2/`, so nothing already on disk is overwritten. Backups are
//! never pruned.

use std::path::{Component, Path, PathBuf};

use serde::Serialize;

use crate::error::SysmodError;
use crate::exec::Executor;

/// One backup file found under the backup root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackupEntry {
    /// Location of the backup copy.
    pub path: PathBuf,
    /// System path the copy was taken from.
    pub original: PathBuf,
    /// Name of the timestamp directory (`YYYYMMDD-HHMMSS[-N]`).
    pub taken_at: String,
}

/// Backup root paired with the system root it mirrors.
#[derive(Debug, Clone)]
pub struct BackupStore {
    root: PathBuf,
    sysroot: PathBuf,
}

/// Current local time in backup directory format.
#[must_use]
pub fn timestamp() -> String {
    chrono::Local::now().format("%Y%m%d-%H%M%S").to_string()
}

impl BackupStore {
    /// Create a store writing under `root` for files below `sysroot`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, sysroot: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            sysroot: sysroot.into(),
        }
    }

    /// Backup root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// System root the backed-up paths are relative to.
    #[must_use]
    pub fn sysroot(&self) -> &Path {
        &self.sysroot
    }

    /// `destination` expressed relative to the sysroot, with `..` and the
    /// root component dropped so it can never escape the backup root.
    #[must_use]
    pub fn relative_to_sysroot(&self, destination: &Path) -> PathBuf {
        let relative = destination
            .strip_prefix(&self.sysroot)
            .unwrap_or(destination);
        relative
            .components()
            .filter(|c| matches!(c, Component::Normal(_)))
            .collect()
    }

    /// First free backup slot for `destination` under `stamp`.
    #[must_use]
    pub fn planned_path(&self, destination: &Path, stamp: &str) -> PathBuf {
        let relative = self.relative_to_sysroot(destination);
        let mut candidate = self.root.join(stamp).join(&relative);
        let mut n = 1u32;
        while candidate.symlink_metadata().is_ok() {
            candidate = self.root.join(format!("{stamp}-{n}")).join(&relative);
            n += 1;
        }
        candidate
    }

    /// Copy `destination` into a new timestamped slot and return its path.
    ///
    /// Falls back to `sudo cp -p` when the file is not readable by the
    /// current user.
    ///
    /// # Errors
    ///
    /// Returns an error if the copy fails.
    pub fn backup(
        &self,
        destination: &Path,
        executor: &dyn Executor,
    ) -> Result<PathBuf, SysmodError> {
        let target = self.planned_path(destination, &timestamp());
        copy_preserving(destination, &target, executor)?;
        tracing::info!(
            "backed up {} -> {}",
            destination.display(),
            target.display()
        );
        Ok(target)
    }

    /// All backups, newest first, then by original path.
    ///
    /// # Errors
    ///
    /// Returns an error if the backup tree cannot be walked.
    pub fn list(&self) -> Result<Vec<BackupEntry>, SysmodError> {
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }

        let mut entries = Vec::new();
        for entry in walkdir::WalkDir::new(&self.root).min_depth(2) {
            let entry = entry.map_err(|e| SysmodError::Io {
                path: self.root.display().to_string(),
                source: e.into(),
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(&self.root) else {
                continue;
            };
            let mut components = relative.components();
            let Some(Component::Normal(stamp)) = components.next() else {
                continue;
            };
            let taken_at = stamp.to_string_lossy().to_string();
            if taken_at.starts_with('.') {
                continue;
            }
            entries.push(BackupEntry {
                path: entry.path().to_path_buf(),
                original: self.sysroot.join(components.as_path()),
                taken_at,
            });
        }
        entries.sort_by(|a, b| {
            slot_order(&b.taken_at)
                .cmp(&slot_order(&a.taken_at))
                .then_with(|| a.original.cmp(&b.original))
        });
        Ok(entries)
    }

    /// Most recent backup of `destination`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the backup tree cannot be walked.
    pub fn latest_for(&self, destination: &Path) -> Result<Option<BackupEntry>, SysmodError> {
        let original = self.sysroot.join(self.relative_to_sysroot(destination));
        Ok(self.list()?.into_iter().find(|e| e.original == original))
    }
}

/// Ordering key for a slot name: the timestamp, then the numeric collision
/// suffix (`<stamp>-10` is newer than `<stamp>-9`).
fn slot_order(taken_at: &str) -> (&str, u32) {
    match taken_at.rsplit_once('-') {
        Some((stamp, suffix)) if stamp.contains('-') => (stamp, suffix.parse().unwrap_or(0)),
        _ => (taken_at, 0),
    }
}

/// Copy `src` to `dst` keeping permissions, creating `dst`'s parents.
///
/// When `src` cannot be read and `sudo` is available the copy is retried
/// as `sudo cp -p`.
pub(crate) fn copy_preserving(
    src: &Path,
    dst: &Path,
    executor: &dyn Executor,
) -> Result<(), SysmodError> {
    if let Some(parent) = dst.parent() {
        std::fs::create_dir_all(parent).map_err(|source| SysmodError::Io {
            path: parent.display().to_string(),
            source,
        })?;
    }
    match std::fs::copy(src, dst) {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied && executor.which("sudo") => {
            let src_str = src.to_string_lossy();
            let dst_str = dst.to_string_lossy();
            executor
                .run("sudo", &["cp", "-p", &src_str, &dst_str])
                .map(|_| ())
                .map_err(|e| SysmodError::PrivilegedWrite {
                    path: dst.display().to_string(),
                    reason: format!("{e:#}"),
                })
        }
        Err(source) => Err(SysmodError::Io {
            path: src.display().to_string(),
            source,
        }),
    }
}
