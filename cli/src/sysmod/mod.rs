//! Guarded system mutation: diff before overwrite, timestamped backups,
//! dry-run, and the host `etc/` overlay.
//!
//! The resource that performs the actual check-and-write lives in
//! [`crate::resources::system_file`]; this module holds the pieces it and
//! the `sysmod` command share.

pub mod backup;
pub mod diff;

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};

use crate::config::settings::EnvLookup;

pub use backup::{BackupEntry, BackupStore};

/// Environment variable that forces dry-run for every mutating command.
pub const DRY_RUN_ENV: &str = "SYSMOD_DRY_RUN";

/// Interpret a flag-style environment value (`1`, `true`, `yes`, `on`).
#[must_use]
pub fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Whether [`DRY_RUN_ENV`] requests a dry run.
#[must_use]
pub fn dry_run_requested(env: EnvLookup<'_>) -> bool {
    env(DRY_RUN_ENV).is_some_and(|v| is_truthy(&v))
}

/// A file in a host overlay and the system path it is installed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayEntry {
    /// File inside `hosts/<host>/etc/`.
    pub source: PathBuf,
    /// Destination under `<sysroot>/etc/`.
    pub destination: PathBuf,
}

/// Map every regular file under `overlay_dir` to `<sysroot>/etc/<relative>`.
///
/// Entries are sorted by destination. A missing overlay directory yields no
/// entries.
///
/// # Errors
///
/// Returns an error if the overlay tree cannot be walked.
pub fn overlay_entries(overlay_dir: &Path, sysroot: &Path) -> Result<Vec<OverlayEntry>> {
    if !overlay_dir.is_dir() {
        return Ok(Vec::new());
    }

    let etc = sysroot.join("etc");
    let mut entries = Vec::new();
    for entry in walkdir::WalkDir::new(overlay_dir).follow_links(true) {
        let entry =
            entry.with_context(|| format!("walking overlay {}", overlay_dir.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(overlay_dir)
            .with_context(|| format!("overlay entry outside root: {}", entry.path().display()))?;
        entries.push(OverlayEntry {
            source: entry.path().to_path_buf(),
            destination: etc.join(relative),
        });
    }
    entries.sort_by(|a, b| a.destination.cmp(&b.destination));
    Ok(entries)
}
