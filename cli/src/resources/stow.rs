//! Stow package resource.
use anyhow::{Context as _, Result};
use std::path::{Path, PathBuf};

use super::{Applicable, Resource, ResourceChange, ResourceState};
use crate::exec::Executor;

/// Names GNU Stow skips anywhere in a package.
const IGNORED_NAMES: &[&str] = &[".git", ".gitignore", ".gitmodules", ".stow-local-ignore"];

/// Top-level name prefixes GNU Stow skips.
const IGNORED_TOP_LEVEL: &[&str] = &["README", "LICENSE", "COPYING"];

/// A stow package deployed into a target directory as symlinks.
///
/// State is computed natively by resolving every file of the package in
/// the target; `apply` shells out to `stow --restow`.
#[derive(Debug)]
pub struct StowPackageResource<'a> {
    /// Package name (a directory under `stow_dir`).
    pub package: String,
    /// Directory holding all stow packages.
    pub stow_dir: PathBuf,
    /// Directory the package is linked into (usually `$HOME`).
    pub target: PathBuf,
    executor: &'a dyn Executor,
}

impl<'a> StowPackageResource<'a> {
    /// Create a new stow package resource.
    #[must_use]
    pub const fn new(
        package: String,
        stow_dir: PathBuf,
        target: PathBuf,
        executor: &'a dyn Executor,
    ) -> Self {
        Self {
            package,
            stow_dir,
            target,
            executor,
        }
    }

    fn package_dir(&self) -> PathBuf {
        self.stow_dir.join(&self.package)
    }

    /// Package files (relative paths) that stow would link.
    ///
    /// # Errors
    ///
    /// Returns an error if the package directory cannot be walked.
    pub fn files(&self) -> Result<Vec<PathBuf>> {
        let dir = self.package_dir();
        let mut files = Vec::new();
        let walker = walkdir::WalkDir::new(&dir)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !e.path().strip_prefix(&dir).is_ok_and(is_ignored));
        for entry in walker {
            let entry = entry.with_context(|| format!("walk {}", dir.display()))?;
            if entry.file_type().is_dir() {
                continue;
            }
            if let Ok(rel) = entry.path().strip_prefix(&dir) {
                files.push(rel.to_path_buf());
            }
        }
        Ok(files)
    }
}

/// Whether stow's default ignore list covers `rel`.
fn is_ignored(rel: &Path) -> bool {
    let top_level = rel.components().count() == 1;
    rel.file_name().is_some_and(|name| {
        let name = name.to_string_lossy();
        IGNORED_NAMES.contains(&name.as_ref())
            || name.ends_with('~')
            || (top_level && IGNORED_TOP_LEVEL.iter().any(|p| name.starts_with(p)))
    })
}

/// Whether `target` resolves to the same file as `source`.
///
/// Resolution follows folded directory links as well as file links.
fn resolves_to(target: &Path, source: &Path) -> bool {
    match (std::fs::canonicalize(target), std::fs::canonicalize(source)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

impl Applicable for StowPackageResource<'_> {
    fn description(&self) -> String {
        format!("{} -> {}", self.package, self.target.display())
    }

    fn apply(&self) -> Result<ResourceChange> {
        let stow_dir = self.stow_dir.to_string_lossy();
        let target = self.target.to_string_lossy();
        self.executor.run(
            "stow",
            &[
                "--restow",
                "--dir",
                &stow_dir,
                "--target",
                &target,
                &self.package,
            ],
        )?;
        Ok(ResourceChange::Applied)
    }
}

impl Resource for StowPackageResource<'_> {
    fn current_state(&self) -> Result<ResourceState> {
        let dir = self.package_dir();
        if !dir.is_dir() {
            return Ok(ResourceState::Invalid {
                reason: format!("package does not exist: {}", dir.display()),
            });
        }

        let files = self.files()?;
        let linked = files
            .iter()
            .filter(|rel| resolves_to(&self.target.join(rel), &dir.join(rel)))
            .count();

        if linked == files.len() {
            Ok(ResourceState::Correct)
        } else if linked == 0
            && files
                .iter()
                .all(|rel| self.target.join(rel).symlink_metadata().is_err())
        {
            Ok(ResourceState::Missing)
        } else {
            Ok(ResourceState::Incorrect {
                current: format!("{linked} of {} files linked", files.len()),
            })
        }
    }
}
