use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;

use crate::config::Config;
use crate::exec::Executor;
use crate::logging::Log;
use crate::platform::Platform;
use crate::state::StepTracker;
use crate::sysmod::BackupStore;

/// Shared context for task execution.
pub struct Context {
    /// Configuration of the active host.
    pub config: Arc<Config>,
    /// Detected platform information.
    pub platform: Platform,
    /// Logger for output and task recording.
    pub log: Arc<dyn Log>,
    /// Whether to perform a dry run (preview changes without applying).
    pub dry_run: bool,
    /// Re-run steps that are already marked completed.
    pub force: bool,
    /// User's home directory path (stow target).
    pub home: PathBuf,
    /// Command executor (for testing or real system calls).
    pub executor: Arc<dyn Executor>,
    /// Step markers.
    pub tracker: StepTracker,
    /// Backups of replaced system files.
    pub backups: BackupStore,
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("host", &self.config.host.name)
            .field("platform", &self.platform)
            .field("log", &"<dyn Log>")
            .field("dry_run", &self.dry_run)
            .field("force", &self.force)
            .field("home", &self.home)
            .field("executor", &self.executor)
            .field("tracker", &self.tracker)
            .field("backups", &self.backups)
            .finish()
    }
}

impl Context {
    /// Creates a new context for task execution.
    ///
    /// The step tracker and backup store are rooted at the directories
    /// resolved in `config.paths`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HOME environment variable is not set.
    pub fn new(
        config: Arc<Config>,
        platform: Platform,
        log: Arc<dyn Log>,
        dry_run: bool,
        executor: Arc<dyn Executor>,
    ) -> Result<Self> {
        let home = std::env::var("HOME")
            .map_err(|_| anyhow::anyhow!("HOME environment variable is not set"))?;
        Ok(Self::with_home(
            config,
            platform,
            log,
            dry_run,
            executor,
            PathBuf::from(home),
        ))
    }

    /// Creates a context with an explicit home directory.
    #[must_use]
    pub fn with_home(
        config: Arc<Config>,
        platform: Platform,
        log: Arc<dyn Log>,
        dry_run: bool,
        executor: Arc<dyn Executor>,
        home: PathBuf,
    ) -> Self {
        let tracker = StepTracker::new(&config.paths.state_dir);
        let backups = BackupStore::new(&config.paths.backup_dir, &config.paths.sysroot);
        Self {
            config,
            platform,
            log,
            dry_run,
            force: false,
            home,
            executor,
            tracker,
            backups,
        }
    }

    /// Set whether completed steps are re-run.
    #[must_use]
    pub const fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Tracker name of a host-scoped step.
    #[must_use]
    pub fn step_name(&self, id: &str) -> String {
        self.config.step_name(id)
    }
}
