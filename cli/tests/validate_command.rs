#![allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
//! Integration tests for the `validate` command's task list.

mod common;

use std::sync::Arc;

use common::{IntegrationTestContext, StubExecutor};
use hostsetup_cli::logging::{Logger, TaskStatus};
use hostsetup_cli::platform::Platform;
use hostsetup_cli::state::StepTracker;
use hostsetup_cli::tasks::validate::validation_tasks;
use hostsetup_cli::tasks::{self, Context};

fn run_validation(ctx: &Context) {
    for task in &validation_tasks() {
        tasks::execute(task.as_ref(), ctx);
    }
}

fn status(log: &Logger, name: &str) -> TaskStatus {
    log.task_entries()
        .into_iter()
        .find(|e| e.name == name)
        .map(|e| e.status)
        .expect("task recorded")
}

fn healthy_repo() -> IntegrationTestContext {
    IntegrationTestContext::new("dragon")
        .with_host_file(".traits", "aio wireguard\n")
        .with_host_file("host.toml", "stow = [\"zsh\"]\n")
        .with_host_file("etc/pacman.conf", "[options]\n")
        .with_stow_file("zsh", ".zshrc", "export EDITOR=nvim\n")
}

#[test]
fn healthy_host_passes() {
    let repo = healthy_repo();
    let (ctx, log) = repo.context(
        Platform::new(true, true),
        Arc::new(StubExecutor::default()),
        false,
    );

    run_validation(&ctx);

    assert!(!log.has_failures(), "{:?}", log.task_entries());
    assert_eq!(status(&log, "Check trait requirements"), TaskStatus::Done);
    assert_eq!(status(&log, "Validate etc overlay"), TaskStatus::Done);
}

#[test]
fn missing_trait_command_fails() {
    let repo = healthy_repo();
    let (ctx, log) = repo.context(
        Platform::new(true, true),
        Arc::new(StubExecutor::default().without("liquidctl")),
        false,
    );

    run_validation(&ctx);

    assert_eq!(status(&log, "Check trait requirements"), TaskStatus::Failed);
    assert_eq!(log.failure_count(), 1);
}

#[test]
fn missing_stow_package_fails_twice() {
    let repo = IntegrationTestContext::new("dragon")
        .with_host_file(".traits", "wireguard\n")
        .with_host_file("host.toml", "stow = [\"nvim\"]\n");
    let (ctx, log) = repo.context(
        Platform::new(true, true),
        Arc::new(StubExecutor::default()),
        false,
    );

    run_validation(&ctx);

    assert_eq!(status(&log, "Validate configuration"), TaskStatus::Failed);
    assert_eq!(status(&log, "Validate stow packages"), TaskStatus::Failed);
}

#[test]
fn validation_never_marks_steps() {
    let repo = healthy_repo();
    let (ctx, _log) = repo.context(
        Platform::new(true, true),
        Arc::new(StubExecutor::default()),
        false,
    );
    run_validation(&ctx);
    assert!(
        StepTracker::new(repo.state_dir())
            .completed_steps()
            .unwrap()
            .is_empty()
    );
}
