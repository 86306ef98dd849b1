//! One-off migration script resource.
use anyhow::{Context as _, Result};
use std::path::{Path, PathBuf};

use super::{Applicable, Resource, ResourceChange, ResourceState};
use crate::exec::Executor;
use crate::state::{StepTracker, validate_step_name};

/// Prefix of the step name tracking each migration.
pub const STEP_PREFIX: &str = "migration-";

/// A script under `migrations/` that runs once and is then recorded.
#[derive(Debug)]
pub struct MigrationResource<'a> {
    /// Script path.
    pub script: PathBuf,
    /// Directory the script runs in (the repository root).
    pub workdir: PathBuf,
    tracker: &'a StepTracker,
    executor: &'a dyn Executor,
}

impl<'a> MigrationResource<'a> {
    /// Create a migration resource for `script`.
    #[must_use]
    pub const fn new(
        script: PathBuf,
        workdir: PathBuf,
        tracker: &'a StepTracker,
        executor: &'a dyn Executor,
    ) -> Self {
        Self {
            script,
            workdir,
            tracker,
            executor,
        }
    }

    /// Step name recorded once the script succeeds: `migration-<stem>`.
    #[must_use]
    pub fn step_name(&self) -> String {
        let stem = self
            .script
            .file_stem()
            .map_or_else(String::new, |s| s.to_string_lossy().to_string());
        format!("{STEP_PREFIX}{stem}")
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt as _;
    std::fs::metadata(path).is_ok_and(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Migration scripts in `dir`, sorted by file name. Dotfiles are skipped.
///
/// # Errors
///
/// Returns an error if `dir` exists but cannot be read.
pub fn discover(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut scripts = Vec::new();
    for entry in std::fs::read_dir(dir).with_context(|| format!("read {}", dir.display()))? {
        let entry = entry.with_context(|| format!("read entry in {}", dir.display()))?;
        let path = entry.path();
        let hidden = entry.file_name().to_string_lossy().starts_with('.');
        if path.is_file() && !hidden {
            scripts.push(path);
        }
    }
    scripts.sort();
    Ok(scripts)
}

impl Applicable for MigrationResource<'_> {
    fn description(&self) -> String {
        self.step_name()
    }

    fn apply(&self) -> Result<ResourceChange> {
        let script = self.script.to_string_lossy();
        self.executor
            .run_in(&self.workdir, &script, &[])
            .with_context(|| format!("migration {} failed", self.step_name()))?;
        self.tracker.mark_step_completed(&self.step_name())?;
        Ok(ResourceChange::Applied)
    }
}

impl Resource for MigrationResource<'_> {
    fn current_state(&self) -> Result<ResourceState> {
        let step = self.step_name();
        if let Err(e) = validate_step_name(&step) {
            return Ok(ResourceState::Invalid {
                reason: e.to_string(),
            });
        }
        if self.tracker.is_step_completed(&step)? {
            return Ok(ResourceState::Correct);
        }
        if !is_executable(&self.script) {
            return Ok(ResourceState::Invalid {
                reason: format!("not executable: {}", self.script.display()),
            });
        }
        Ok(ResourceState::Missing)
    }
}

#[cfg(all(test, unix))]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::resources::test_helpers::MockExecutor;
    use std::os::unix::fs::PermissionsExt as _;

    fn script(dir: &Path, name: &str, mode: u32) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, "#!/bin/sh\ntrue\n").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(mode)).unwrap();
        path
    }

    #[test]
    fn step_name_uses_file_stem() {
        let tracker = StepTracker::new("/nonexistent");
        let executor = MockExecutor::with_responses(vec![]);
        let m = MigrationResource::new(
            PathBuf::from("/repo/migrations/001-move-zshrc.sh"),
            PathBuf::from("/repo"),
            &tracker,
            &executor,
        );
        assert_eq!(m.step_name(), "migration-001-move-zshrc");
    }

    #[test]
    fn discover_sorts_and_skips_hidden() {
        let dir = tempfile::tempdir().unwrap();
        script(dir.path(), "002-b", 0o755);
        script(dir.path(), "001-a", 0o755);
        script(dir.path(), ".keep", 0o644);
        std::fs::create_dir(dir.path().join("lib")).unwrap();
        let names: Vec<String> = discover(dir.path())
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["001-a", "002-b"]);
    }

    #[test]
    fn discover_missing_dir_is_empty() {
        assert!(discover(Path::new("/nonexistent/migrations")).unwrap().is_empty());
    }

    #[test]
    fn pending_migration_runs_once_and_is_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = StepTracker::new(dir.path().join("state"));
        let path = script(dir.path(), "001-a", 0o755);
        let executor = MockExecutor::ok("");
        let m = MigrationResource::new(path, dir.path().to_path_buf(), &tracker, &executor);

        assert_eq!(m.current_state().unwrap(), ResourceState::Missing);
        assert_eq!(m.apply().unwrap(), ResourceChange::Applied);
        assert!(tracker.is_step_completed("migration-001-a").unwrap());
        assert_eq!(m.current_state().unwrap(), ResourceState::Correct);
    }

    #[test]
    fn failed_migration_is_not_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = StepTracker::new(dir.path().join("state"));
        let path = script(dir.path(), "001-a", 0o755);
        let executor = MockExecutor::fail();
        let m = MigrationResource::new(path, dir.path().to_path_buf(), &tracker, &executor);

        assert!(m.apply().is_err());
        assert!(!tracker.is_step_completed("migration-001-a").unwrap());
    }

    #[test]
    fn non_executable_script_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = StepTracker::new(dir.path().join("state"));
        let path = script(dir.path(), "001-a", 0o644);
        let executor = MockExecutor::with_responses(vec![]);
        let m = MigrationResource::new(path, dir.path().to_path_buf(), &tracker, &executor);
        assert!(matches!(
            m.current_state().unwrap(),
            ResourceState::Invalid { .. }
        ));
    }

    #[test]
    fn unusable_step_name_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = StepTracker::new(dir.path().join("state"));
        let path = script(dir.path(), "003 fix fonts", 0o755);
        let executor = MockExecutor::with_responses(vec![]);
        let m = MigrationResource::new(path, dir.path().to_path_buf(), &tracker, &executor);
        assert!(matches!(
            m.current_state().unwrap(),
            ResourceState::Invalid { .. }
        ));
    }
}
