//! Subcommand handlers.
pub mod completions;
pub mod cooler;
pub mod host;
pub mod install;
pub mod state;
pub mod sysmod;
pub mod validate;
pub mod version;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context as _, Result};

use crate::cli::GlobalOpts;
use crate::config::host::{HostQuery, resolve_host_name};
use crate::config::settings::{EnvLookup, Paths, Settings, process_env};
use crate::config::{self, Config};
use crate::exec::{Executor, SystemExecutor};
use crate::logging::{Log, Logger};
use crate::platform::Platform;
use crate::tasks::{self, Context, Task};

/// File holding the machine's host name.
const HOSTNAME_FILE: &str = "/etc/hostname";

/// Whether this run is a dry run: `--dry-run` or `SYSMOD_DRY_RUN`.
#[must_use]
pub fn is_dry_run(global: &GlobalOpts) -> bool {
    is_dry_run_with(global, &process_env)
}

/// [`is_dry_run`] against an explicit environment.
#[must_use]
pub fn is_dry_run_with(global: &GlobalOpts, env: EnvLookup<'_>) -> bool {
    global.dry_run || crate::sysmod::dry_run_requested(env)
}

/// Locate the repository root from the flags, environment, executable and
/// working directory.
///
/// # Errors
///
/// Returns an error if no root can be found.
pub fn resolve_root(global: &GlobalOpts) -> Result<PathBuf> {
    resolve_root_with(global, &process_env)
}

fn resolve_root_with(global: &GlobalOpts, env: EnvLookup<'_>) -> Result<PathBuf> {
    let cwd = std::env::current_dir().context("reading current directory")?;
    let exe = std::env::current_exe().ok();
    config::resolve_root(global.root.as_deref(), env, &cwd, exe.as_deref())
}

/// Effective state, backup and sysroot directories.
///
/// Commands that only touch markers or backups work outside a repository;
/// the settings file is consulted only when a root is found.
///
/// # Errors
///
/// Returns an error if the settings file exists but is invalid.
pub fn resolve_paths(global: &GlobalOpts) -> Result<Paths> {
    resolve_paths_with(global, &process_env)
}

/// [`resolve_paths`] against an explicit environment.
///
/// # Errors
///
/// Returns an error if the settings file exists but is invalid.
pub fn resolve_paths_with(global: &GlobalOpts, env: EnvLookup<'_>) -> Result<Paths> {
    let settings = match resolve_root_with(global, env) {
        Ok(root) => Settings::load(&root).context("loading conf/settings.toml")?,
        Err(_) => Settings::default(),
    };
    Ok(settings.resolve(&global.overrides(), env))
}

/// Shared state produced by the common command setup sequence.
///
/// Encapsulates platform detection, root and host resolution, and
/// configuration loading so that each command does not have to repeat the
/// boilerplate.
#[derive(Debug)]
pub struct CommandSetup {
    /// Detected platform.
    pub platform: Platform,
    /// Loaded configuration.
    pub config: Config,
    /// `--dry-run` or `SYSMOD_DRY_RUN`.
    pub dry_run: bool,
}

impl CommandSetup {
    /// Detect the platform, resolve root and host, and load configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the root directory or host cannot be determined,
    /// or any configuration file fails to parse.
    pub fn init(global: &GlobalOpts, log: &dyn Log) -> Result<Self> {
        Self::init_with(global, log, &process_env)
    }

    /// [`init`](Self::init) against an explicit environment.
    ///
    /// # Errors
    ///
    /// As for [`init`](Self::init).
    pub fn init_with(global: &GlobalOpts, log: &dyn Log, env: EnvLookup<'_>) -> Result<Self> {
        let platform = Platform::detect();
        log.debug(&format!("platform: {platform}"));
        let root = resolve_root_with(global, env)?;
        log.debug(&format!("root: {}", root.display()));

        let executor = SystemExecutor;
        let query = HostQuery {
            requested: global.host.as_deref(),
            env,
            hostname_file: Path::new(HOSTNAME_FILE),
            executor: &executor,
        };
        let host = resolve_host_name(&config::hosts_dir(&root), &query)?;

        log.stage("Loading configuration");
        let config = Config::load(&root, &host, &global.overrides(), env)?;
        let traits: Vec<&str> = config.host.traits.iter().map(String::as_str).collect();
        log.info(&format!(
            "host: {} (traits: {})",
            config.host.name,
            if traits.is_empty() {
                "none".to_string()
            } else {
                traits.join(", ")
            }
        ));
        log.debug(&format!("state dir: {}", config.paths.state_dir.display()));
        log.debug(&format!("backup dir: {}", config.paths.backup_dir.display()));
        log.debug(&format!("sysroot: {}", config.paths.sysroot.display()));

        let warnings = config.validate(&platform);
        if !warnings.is_empty() {
            log.warn(&format!(
                "found {} configuration warning(s):",
                warnings.len()
            ));
            for warning in &warnings {
                log.warn(&format!("  {warning}"));
            }
        }

        Ok(Self {
            platform,
            config,
            dry_run: is_dry_run_with(global, env),
        })
    }

    /// Build a task context from this setup.
    ///
    /// # Errors
    ///
    /// Returns an error if `HOME` is not set.
    pub fn into_context(self, log: &Arc<Logger>, executor: Arc<dyn Executor>) -> Result<Context> {
        Context::new(
            Arc::new(self.config),
            self.platform,
            Arc::clone(log) as Arc<dyn Log>,
            self.dry_run,
            executor,
        )
    }
}

/// Execute every task in order, print the summary, and bail if any task failed.
///
/// # Errors
///
/// Returns an error if one or more tasks recorded a failure.
pub fn run_tasks_to_completion<'a>(
    tasks: impl IntoIterator<Item = &'a dyn Task>,
    ctx: &Context,
    log: &Logger,
) -> Result<()> {
    for task in tasks {
        tasks::execute(task, ctx);
    }

    log.print_summary();

    let count = log.failure_count();
    if count > 0 {
        anyhow::bail!("{count} task(s) failed");
    }
    Ok(())
}
