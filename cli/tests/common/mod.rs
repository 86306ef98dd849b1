// Shared helpers for integration tests.
//
// Provides a temporary-directory-backed dotfiles repository with one host,
// a recording executor standing in for pacman/stow/systemctl, and a
// builder for task contexts whose state, backups and sysroot all live
// inside the temp dir.
//
// Used by all integration test binaries that declare `mod common;`.
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use hostsetup_cli::config::Config;
use hostsetup_cli::config::settings::Overrides;
use hostsetup_cli::exec::{ExecResult, Executor};
use hostsetup_cli::logging::{Log, Logger};
use hostsetup_cli::platform::Platform;
use hostsetup_cli::tasks::Context;

/// Executor that succeeds for every command and records what was run.
#[derive(Debug, Default)]
pub struct StubExecutor {
    calls: Mutex<Vec<String>>,
    missing: Vec<String>,
}

impl StubExecutor {
    /// Report `program` as absent from `PATH`.
    pub fn without(mut self, program: &str) -> Self {
        self.missing.push(program.to_string());
        self
    }

    /// Every command line run so far.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls lock").clone()
    }

    fn record(&self, program: &str, args: &[&str]) -> ExecResult {
        let mut line = program.to_string();
        for arg in args {
            line.push(' ');
            line.push_str(arg);
        }
        self.calls.lock().expect("calls lock").push(line);
        ExecResult {
            stdout: String::new(),
            stderr: String::new(),
            success: true,
            code: Some(0),
        }
    }
}

impl Executor for StubExecutor {
    fn run(&self, program: &str, args: &[&str]) -> Result<ExecResult> {
        Ok(self.record(program, args))
    }

    fn run_in(&self, _dir: &Path, program: &str, args: &[&str]) -> Result<ExecResult> {
        Ok(self.record(program, args))
    }

    fn run_in_with_env(
        &self,
        _dir: &Path,
        program: &str,
        args: &[&str],
        _env: &[(&str, &str)],
    ) -> Result<ExecResult> {
        Ok(self.record(program, args))
    }

    fn run_unchecked(&self, program: &str, args: &[&str]) -> Result<ExecResult> {
        Ok(self.record(program, args))
    }

    fn which(&self, program: &str) -> bool {
        !self.missing.iter().any(|m| m == program)
    }
}

/// An isolated repository backed by a [`tempfile::TempDir`].
pub struct IntegrationTestContext {
    /// Temporary directory holding the repository and its state.
    pub root: tempfile::TempDir,
    host: String,
}

impl IntegrationTestContext {
    /// Create `hosts/<host>/` in a new temp dir.
    pub fn new(host: &str) -> Self {
        let root = tempfile::tempdir().expect("create temp dir");
        std::fs::create_dir_all(root.path().join("hosts").join(host)).expect("create host dir");
        std::fs::create_dir_all(root.path().join("home")).expect("create home dir");
        Self {
            root,
            host: host.to_string(),
        }
    }

    /// Repository root.
    pub fn root_path(&self) -> &Path {
        self.root.path()
    }

    /// Host directory.
    pub fn host_dir(&self) -> PathBuf {
        self.root.path().join("hosts").join(&self.host)
    }

    /// Stand-in for `$HOME`.
    pub fn home(&self) -> PathBuf {
        self.root.path().join("home")
    }

    /// Directory managed files are installed under.
    pub fn sysroot(&self) -> PathBuf {
        self.root.path().join("sysroot")
    }

    /// Step marker directory.
    pub fn state_dir(&self) -> PathBuf {
        self.root.path().join("state")
    }

    /// Backup directory.
    pub fn backup_dir(&self) -> PathBuf {
        self.root.path().join("backups")
    }

    fn write(path: &Path, body: &str) {
        std::fs::create_dir_all(path.parent().expect("parent")).expect("create parent");
        std::fs::write(path, body).expect("write file");
    }

    /// Write `hosts/<host>/<rel>`.
    pub fn with_host_file(self, rel: &str, body: &str) -> Self {
        Self::write(&self.host_dir().join(rel), body);
        self
    }

    /// Write `stow/<pkg>/<rel>`.
    pub fn with_stow_file(self, pkg: &str, rel: &str, body: &str) -> Self {
        Self::write(&self.root.path().join("stow").join(pkg).join(rel), body);
        self
    }

    /// Write `<sysroot>/<rel>`.
    pub fn with_system_file(self, rel: &str, body: &str) -> Self {
        Self::write(&self.sysroot().join(rel), body);
        self
    }

    /// Load the configuration with every directory kept in the temp dir.
    pub fn load_config(&self) -> Config {
        let overrides = Overrides {
            state_dir: Some(self.state_dir()),
            backup_dir: Some(self.backup_dir()),
            sysroot: Some(self.sysroot()),
        };
        Config::load(self.root.path(), &self.host, &overrides, &|_| None).expect("load config")
    }

    /// Build a task context for `platform` that runs commands on `executor`.
    pub fn context(
        &self,
        platform: Platform,
        executor: Arc<StubExecutor>,
        dry_run: bool,
    ) -> (Context, Arc<Logger>) {
        let log = Arc::new(Logger::with_log_file(None));
        let ctx = Context::with_home(
            Arc::new(self.load_config()),
            platform,
            Arc::clone(&log) as Arc<dyn Log>,
            dry_run,
            executor,
            self.home(),
        );
        (ctx, log)
    }
}
