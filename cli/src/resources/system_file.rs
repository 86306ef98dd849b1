//! Guarded system file resource: compare, back up, overwrite.
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};

use super::helpers::fs::{is_real_dir, read_if_exists, short_digest};
use super::{Applicable, Resource, ResourceChange, ResourceState};
use crate::error::SysmodError;
use crate::exec::Executor;
use crate::sysmod::BackupStore;
use crate::sysmod::diff::unified_diff;

/// Mode used for privileged installs when the source carries none.
const DEFAULT_MODE: u32 = 0o644;

/// Where the desired content of a system file comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileSource {
    /// Content of a file in the repository (or a backup).
    Path(PathBuf),
    /// Literal content.
    Inline(Vec<u8>),
}

impl FileSource {
    /// Read the desired content. `None` when a path source does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the source exists but cannot be read.
    pub fn read(&self) -> Result<Option<Vec<u8>>> {
        match self {
            Self::Path(path) => {
                read_if_exists(path).with_context(|| format!("read source: {}", path.display()))
            }
            Self::Inline(bytes) => Ok(Some(bytes.clone())),
        }
    }

    /// Label used in diffs and log messages.
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::Path(path) => path.display().to_string(),
            Self::Inline(_) => "(inline)".to_string(),
        }
    }

    #[cfg(unix)]
    fn mode(&self) -> u32 {
        use std::os::unix::fs::PermissionsExt as _;
        match self {
            Self::Path(path) => std::fs::metadata(path)
                .map_or(DEFAULT_MODE, |m| m.permissions().mode() & 0o7777),
            Self::Inline(_) => DEFAULT_MODE,
        }
    }

    #[cfg(not(unix))]
    const fn mode(&self) -> u32 {
        DEFAULT_MODE
    }
}

/// A file under the system root whose content is managed by the repository.
///
/// Identical content is left untouched. Different content is backed up into
/// the [`BackupStore`] and then overwritten.
#[derive(Debug)]
pub struct SystemFileResource<'a> {
    /// Desired content.
    pub source: FileSource,
    /// Managed path on the system.
    pub destination: PathBuf,
    backups: &'a BackupStore,
    executor: &'a dyn Executor,
}

impl<'a> SystemFileResource<'a> {
    /// Create a resource writing `source` to `destination`.
    #[must_use]
    pub const fn new(
        source: FileSource,
        destination: PathBuf,
        backups: &'a BackupStore,
        executor: &'a dyn Executor,
    ) -> Self {
        Self {
            source,
            destination,
            backups,
            executor,
        }
    }

    /// Resource that puts the most recent backup of `destination` back.
    ///
    /// # Errors
    ///
    /// Returns [`SysmodError::NoBackup`] if no backup of `destination` exists.
    pub fn restore_latest(
        destination: &Path,
        backups: &'a BackupStore,
        executor: &'a dyn Executor,
    ) -> Result<Self, SysmodError> {
        let entry = backups
            .latest_for(destination)?
            .ok_or_else(|| SysmodError::NoBackup(destination.display().to_string()))?;
        Ok(Self::new(
            FileSource::Path(entry.path),
            entry.original,
            backups,
            executor,
        ))
    }

    /// Unified diff from the current destination to the desired content.
    ///
    /// Empty when both are equal. An absent destination diffs as empty.
    ///
    /// # Errors
    ///
    /// Returns an error if either side cannot be read.
    pub fn diff(&self) -> Result<String> {
        let desired = self
            .source
            .read()?
            .ok_or_else(|| SysmodError::SourceMissing(self.source.label()))?;
        let current = read_if_exists(&self.destination)
            .with_context(|| format!("read destination: {}", self.destination.display()))?
            .unwrap_or_default();
        Ok(unified_diff(
            &current,
            &desired,
            &self.destination.display().to_string(),
            &self.source.label(),
        ))
    }

    fn write_destination(&self, content: &[u8]) -> Result<(), SysmodError> {
        let direct = self
            .destination
            .parent()
            .map_or(Ok(()), std::fs::create_dir_all)
            .and_then(|()| std::fs::write(&self.destination, content));

        match direct {
            Ok(()) => Ok(()),
            Err(e)
                if e.kind() == std::io::ErrorKind::PermissionDenied
                    && self.executor.which("sudo") =>
            {
                self.write_privileged(content)
            }
            Err(source) => Err(SysmodError::Io {
                path: self.destination.display().to_string(),
                source,
            }),
        }
    }

    /// Stage `content` under the backup root and `sudo install` it.
    fn write_privileged(&self, content: &[u8]) -> Result<(), SysmodError> {
        let staging_dir = self.backups.root().join(".staging");
        std::fs::create_dir_all(&staging_dir).map_err(|source| SysmodError::Io {
            path: staging_dir.display().to_string(),
            source,
        })?;
        let file_name = self
            .destination
            .file_name()
            .map_or_else(|| "file".to_string(), |n| n.to_string_lossy().to_string());
        let staged = staging_dir.join(format!("{file_name}.{}", std::process::id()));
        std::fs::write(&staged, content).map_err(|source| SysmodError::Io {
            path: staged.display().to_string(),
            source,
        })?;

        let mode = format!("{:o}", self.source.mode());
        let staged_str = staged.to_string_lossy();
        let dest_str = self.destination.to_string_lossy();
        let result = self.executor.run(
            "sudo",
            &["install", "-D", "-m", &mode, &staged_str, &dest_str],
        );
        let _ = std::fs::remove_file(&staged);
        result.map(|_| ()).map_err(|e| SysmodError::PrivilegedWrite {
            path: self.destination.display().to_string(),
            reason: format!("{e:#}"),
        })
    }
}

impl Applicable for SystemFileResource<'_> {
    fn description(&self) -> String {
        self.destination.display().to_string()
    }

    fn apply(&self) -> Result<ResourceChange> {
        let desired = self
            .source
            .read()?
            .ok_or_else(|| SysmodError::SourceMissing(self.source.label()))?;
        if is_real_dir(&self.destination) {
            return Err(
                SysmodError::DestinationIsDirectory(self.destination.display().to_string()).into(),
            );
        }

        // Unreadable destinations are treated as different and backed up via sudo.
        let current = read_if_exists(&self.destination);
        if let Ok(Some(ref bytes)) = current
            && *bytes == desired
        {
            return Ok(ResourceChange::AlreadyCorrect);
        }
        if !matches!(current, Ok(None)) {
            self.backups.backup(&self.destination, self.executor)?;
        }

        self.write_destination(&desired)?;
        tracing::info!(
            "wrote {} from {}",
            self.destination.display(),
            self.source.label()
        );
        Ok(ResourceChange::Applied)
    }

    fn preview(&self) -> Option<String> {
        let mut out = String::new();
        if self.destination.exists() {
            let planned = self
                .backups
                .planned_path(&self.destination, &crate::sysmod::backup::timestamp());
            out.push_str(&format!(
                "back up {} -> {}\n",
                self.destination.display(),
                planned.display()
            ));
        }
        match self.diff() {
            Ok(diff) => out.push_str(&diff),
            Err(e) => out.push_str(&format!("diff unavailable: {e:#}\n")),
        }
        (!out.is_empty()).then_some(out)
    }
}

impl Resource for SystemFileResource<'_> {
    fn current_state(&self) -> Result<ResourceState> {
        let Some(desired) = self.source.read()? else {
            return Ok(ResourceState::Invalid {
                reason: format!("source does not exist: {}", self.source.label()),
            });
        };
        if is_real_dir(&self.destination) {
            return Ok(ResourceState::Invalid {
                reason: "destination is a directory".to_string(),
            });
        }
        match read_if_exists(&self.destination) {
            Ok(None) => Ok(ResourceState::Missing),
            Ok(Some(current)) if current == desired => Ok(ResourceState::Correct),
            Ok(Some(current)) => Ok(ResourceState::Incorrect {
                current: format!("sha256 {}", short_digest(&current)),
            }),
            Err(e) => Ok(ResourceState::Incorrect {
                current: format!("unreadable: {e}"),
            }),
        }
    }
}
