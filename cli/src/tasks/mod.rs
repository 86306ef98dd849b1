//! Named, ordered tasks that orchestrate resource changes.
//!
//! Each task may carry a step id; the step tracker records `<host>-<id>`
//! after the task succeeds so later runs skip it.
pub mod context;
pub mod migrations;
pub mod packages;
mod processing;
pub mod services;
pub mod stow;
pub mod system_files;
pub mod validate;

pub use context::Context;
pub use processing::{
    ProcessOpts, TaskResult, TaskStats, process_resource_states, process_resources,
    process_resources_stats,
};

use anyhow::Result;

use crate::logging::{TaskEntry, TaskStatus};

/// A named, executable task.
pub trait Task {
    /// Human-readable task name.
    fn name(&self) -> &str;

    /// Step id tracked as `<host>-<id>`. `None` for tasks that must always
    /// run (they may track finer-grained steps themselves).
    fn step_id(&self) -> Option<&str> {
        None
    }

    /// Whether this task applies to the current host and platform.
    fn should_run(&self, ctx: &Context) -> bool;

    /// Execute the task.
    ///
    /// # Errors
    ///
    /// Returns an error if the task fails to execute, such as when system commands
    /// fail, file operations are not permitted, or configuration is invalid.
    fn run(&self, ctx: &Context) -> Result<TaskResult>;
}

/// The install sequence, in execution order.
#[must_use]
pub fn all_install_tasks() -> Vec<Box<dyn Task>> {
    vec![
        Box::new(packages::InstallPackages),
        Box::new(packages::InstallParu),
        Box::new(packages::InstallAurPackages),
        Box::new(stow::StowDotfiles),
        Box::new(system_files::ApplySystemFiles),
        Box::new(services::EnableServices),
        Box::new(migrations::RunMigrations),
    ]
}

/// Task selection from `--skip` and `--only`.
///
/// A pattern matches a task when it equals the step id or is a
/// case-insensitive substring of the task name.
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    /// Tasks to leave out.
    pub skip: Vec<String>,
    /// If non-empty, the only tasks to run.
    pub only: Vec<String>,
}

impl TaskFilter {
    fn matches(pattern: &str, task: &dyn Task) -> bool {
        task.step_id().is_some_and(|id| id == pattern)
            || task
                .name()
                .to_lowercase()
                .contains(&pattern.to_lowercase())
    }

    /// Whether `task` is selected.
    #[must_use]
    pub fn selects(&self, task: &dyn Task) -> bool {
        let only_ok = self.only.is_empty() || self.only.iter().any(|p| Self::matches(p, task));
        let skipped = self.skip.iter().any(|p| Self::matches(p, task));
        only_ok && !skipped
    }
}

/// Run `task` unless its step is already marked, mark the step on success,
/// and record how it ended in the log.
pub fn execute(task: &dyn Task, ctx: &Context) {
    let step = task.step_id().map(|id| ctx.step_name(id));
    let (status, message) = run_tracked(task, ctx, step.as_deref());
    if status == TaskStatus::Failed
        && let Some(message) = &message
    {
        ctx.log.error(&format!("{}: {message}", task.name()));
    }
    let mut entry = TaskEntry::new(task.name(), status).with_step(step.as_deref());
    entry.message = message;
    ctx.log.record_task(entry);
}

fn run_tracked(
    task: &dyn Task,
    ctx: &Context,
    step: Option<&str>,
) -> (TaskStatus, Option<String>) {
    if !task.should_run(ctx) {
        ctx.log.debug(&format!("{}: not applicable to this host", task.name()));
        return (TaskStatus::NotApplicable, None);
    }

    if let Some(step) = step
        && !ctx.force
    {
        match ctx.tracker.is_step_completed(step) {
            Ok(true) => {
                ctx.log.debug(&format!("{step} is marked, not running"));
                return (TaskStatus::AlreadyDone, Some("already completed".into()));
            }
            Ok(false) => {}
            Err(e) => return (TaskStatus::Failed, Some(format!("{e:#}"))),
        }
    }

    ctx.log.stage(task.name());
    match task.run(ctx) {
        Ok(TaskResult::Ok) => match step.map(|s| ctx.tracker.mark_step_completed(s)) {
            Some(Err(e)) => (TaskStatus::Failed, Some(format!("{e:#}"))),
            _ => (TaskStatus::Done, None),
        },
        Ok(TaskResult::Skipped(reason)) => {
            ctx.log.info(&format!("skipped: {reason}"));
            (TaskStatus::Skipped, Some(reason))
        }
        Ok(TaskResult::DryRun) => {
            if let Some(step) = step {
                ctx.log.dry_run(&format!("would mark step {step} completed"));
            }
            (TaskStatus::DryRun, None)
        }
        Err(e) => (TaskStatus::Failed, Some(format!("{e:#}"))),
    }
}
