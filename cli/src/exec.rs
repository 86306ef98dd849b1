//! Running external programs (`pacman`, `stow`, `systemctl`, `sudo`)
//! through the [`Executor`] trait, so tests can script their answers.
use std::path::Path;
use std::process::{Command, Output};

use anyhow::{Context, Result};

/// Captured outcome of one program run.
#[derive(Debug, Clone)]
pub struct ExecResult {
    /// Standard output, lossily decoded.
    pub stdout: String,
    /// Standard error, lossily decoded.
    pub stderr: String,
    /// Exit status zero.
    pub success: bool,
    /// `None` when a signal ended the process.
    pub code: Option<i32>,
}

impl From<Output> for ExecResult {
    fn from(output: Output) -> Self {
        Self {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }
}

/// Runs programs for tasks and resources.
///
/// The checked methods turn a non-zero exit into an error carrying the
/// program's stderr.
pub trait Executor: Send + Sync + std::fmt::Debug {
    /// # Errors
    ///
    /// Spawn failure or non-zero exit.
    fn run(&self, program: &str, args: &[&str]) -> Result<ExecResult>;

    /// [`run`](Self::run) with `dir` as the working directory.
    ///
    /// # Errors
    ///
    /// Spawn failure or non-zero exit.
    fn run_in(&self, dir: &Path, program: &str, args: &[&str]) -> Result<ExecResult>;

    /// [`run_in`](Self::run_in) with `env` added to the environment.
    ///
    /// # Errors
    ///
    /// Spawn failure or non-zero exit.
    fn run_in_with_env(
        &self,
        dir: &Path,
        program: &str,
        args: &[&str],
        env: &[(&str, &str)],
    ) -> Result<ExecResult>;

    /// Like [`run`](Self::run) but a non-zero exit is returned, not raised.
    ///
    /// # Errors
    ///
    /// Spawn failure only.
    fn run_unchecked(&self, program: &str, args: &[&str]) -> Result<ExecResult>;

    /// `program` resolves on `PATH`.
    fn which(&self, program: &str) -> bool;
}

/// Spawns real processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemExecutor;

impl SystemExecutor {
    fn spawn(
        program: &str,
        args: &[&str],
        dir: Option<&Path>,
        env: &[(&str, &str)],
    ) -> Result<ExecResult> {
        let mut cmd = Command::new(program);
        cmd.args(args).envs(env.iter().copied());
        if let Some(dir) = dir {
            cmd.current_dir(dir);
        }
        let output = cmd
            .output()
            .with_context(|| format!("cannot start {program}"))?;
        Ok(output.into())
    }

    fn spawn_checked(
        program: &str,
        args: &[&str],
        dir: Option<&Path>,
        env: &[(&str, &str)],
    ) -> Result<ExecResult> {
        let result = Self::spawn(program, args, dir, env)?;
        if result.success {
            return Ok(result);
        }
        let code = result
            .code
            .map_or_else(|| "signal".to_string(), |c| c.to_string());
        let place = dir.map_or_else(String::new, |d| format!(" in {}", d.display()));
        anyhow::bail!("{program}{place} exited with {code}: {}", result.stderr.trim())
    }
}

impl Executor for SystemExecutor {
    fn run(&self, program: &str, args: &[&str]) -> Result<ExecResult> {
        Self::spawn_checked(program, args, None, &[])
    }

    fn run_in(&self, dir: &Path, program: &str, args: &[&str]) -> Result<ExecResult> {
        Self::spawn_checked(program, args, Some(dir), &[])
    }

    fn run_in_with_env(
        &self,
        dir: &Path,
        program: &str,
        args: &[&str],
        env: &[(&str, &str)],
    ) -> Result<ExecResult> {
        Self::spawn_checked(program, args, Some(dir), env)
    }

    fn run_unchecked(&self, program: &str, args: &[&str]) -> Result<ExecResult> {
        Self::spawn(program, args, None, &[])
    }

    fn which(&self, program: &str) -> bool {
        which::which(program).is_ok()
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn captures_stdout() {
        let result = SystemExecutor.run("echo", &["hello"]).unwrap();
        assert!(result.success);
        assert_eq!(result.stdout.trim(), "hello");
    }

    #[test]
    fn non_zero_exit_is_an_error_with_stderr() {
        let err = SystemExecutor
            .run("sh", &["-c", "echo broken >&2; exit 3"])
            .unwrap_err();
        let text = err.to_string();
        assert!(text.contains("exited with 3"), "{text}");
        assert!(text.contains("broken"), "{text}");
    }

    #[test]
    fn unchecked_run_reports_the_exit_code() {
        let result = SystemExecutor.run_unchecked("false", &[]).unwrap();
        assert!(!result.success);
        assert_eq!(result.code, Some(1));
    }

    #[test]
    fn missing_program_cannot_start() {
        let err = SystemExecutor
            .run_unchecked("hostsetup-no-such-program", &[])
            .unwrap_err();
        assert!(err.to_string().contains("cannot start"));
    }

    #[test]
    fn run_in_uses_directory() {
        let dir = tempfile::tempdir().unwrap();
        let result = SystemExecutor.run_in(dir.path(), "pwd", &[]).unwrap();
        let reported = std::fs::canonicalize(result.stdout.trim()).unwrap();
        assert_eq!(reported, std::fs::canonicalize(dir.path()).unwrap());
    }

    #[test]
    fn run_in_with_env_sets_variables() {
        let dir = tempfile::tempdir().unwrap();
        let result = SystemExecutor
            .run_in_with_env(
                dir.path(),
                "sh",
                &["-c", "printf %s \"$MAKEFLAGS\""],
                &[("MAKEFLAGS", "-j8")],
            )
            .unwrap();
        assert_eq!(result.stdout, "-j8");
    }

    #[test]
    fn which_looks_up_path() {
        assert!(SystemExecutor.which("sh"));
        assert!(!SystemExecutor.which("hostsetup-no-such-program"));
    }
}
