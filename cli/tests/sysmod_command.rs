#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::panic
)]
//! Integration tests for guarded system file changes and the `sysmod`
//! command.

mod common;

use std::sync::Arc;

use clap::Parser;
use common::{IntegrationTestContext, StubExecutor};
use hostsetup_cli::cli::{Cli, Command};
use hostsetup_cli::commands::sysmod::{guarded_apply, restore, run_with_env};
use hostsetup_cli::logging::Logger;
use hostsetup_cli::platform::Platform;
use hostsetup_cli::resources::system_file::{FileSource, SystemFileResource};
use hostsetup_cli::sysmod::{self, BackupStore, overlay_entries};
use hostsetup_cli::tasks::{self, Task, TaskResult};

fn store(repo: &IntegrationTestContext) -> BackupStore {
    BackupStore::new(repo.backup_dir(), repo.sysroot())
}

#[test]
fn identical_content_is_a_no_op() {
    let repo = IntegrationTestContext::new("dragon")
        .with_system_file("etc/hosts", "127.0.0.1 localhost\n");
    let store = store(&repo);
    let executor = StubExecutor::default();
    let log = Logger::with_log_file(None);
    let resource = SystemFileResource::new(
        FileSource::Inline(b"127.0.0.1 localhost\n".to_vec()),
        repo.sysroot().join("etc/hosts"),
        &store,
        &executor,
    );

    assert!(!guarded_apply(&resource, "install", false, &log).unwrap());
    assert!(store.list().unwrap().is_empty());
}

#[test]
fn new_file_is_written_without_a_backup() {
    let repo = IntegrationTestContext::new("dragon");
    let store = store(&repo);
    let executor = StubExecutor::default();
    let log = Logger::with_log_file(None);
    let dest = repo.sysroot().join("etc/modprobe.d/nvidia.conf");
    let resource = SystemFileResource::new(
        FileSource::Inline(b"options nvidia_drm modeset=1\n".to_vec()),
        dest.clone(),
        &store,
        &executor,
    );

    assert!(guarded_apply(&resource, "install", false, &log).unwrap());
    assert_eq!(
        std::fs::read_to_string(dest).unwrap(),
        "options nvidia_drm modeset=1\n"
    );
    assert!(store.list().unwrap().is_empty());
}

#[test]
fn two_backups_in_one_second_both_survive() {
    let repo = IntegrationTestContext::new("dragon")
        .with_system_file("etc/pacman.conf", "v1\n");
    let store = store(&repo);
    let executor = StubExecutor::default();
    let log = Logger::with_log_file(None);
    let dest = repo.sysroot().join("etc/pacman.conf");

    for body in ["v2\n", "v3\n"] {
        let resource = SystemFileResource::new(
            FileSource::Inline(body.as_bytes().to_vec()),
            dest.clone(),
            &store,
            &executor,
        );
        guarded_apply(&resource, "install", false, &log).unwrap();
    }

    let mut bodies: Vec<String> = store
        .list()
        .unwrap()
        .iter()
        .map(|e| std::fs::read_to_string(&e.path).unwrap())
        .collect();
    bodies.sort();
    assert_eq!(bodies, vec!["v1\n", "v2\n"]);
    assert_eq!(std::fs::read_to_string(&dest).unwrap(), "v3\n");
}

#[test]
fn restore_round_trips_through_a_new_backup() {
    let repo = IntegrationTestContext::new("dragon")
        .with_system_file("etc/pacman.conf", "original\n");
    let store = store(&repo);
    let executor = StubExecutor::default();
    let log = Logger::with_log_file(None);
    let dest = repo.sysroot().join("etc/pacman.conf");
    let resource = SystemFileResource::new(
        FileSource::Inline(b"managed\n".to_vec()),
        dest.clone(),
        &store,
        &executor,
    );
    guarded_apply(&resource, "install", false, &log).unwrap();

    restore(&dest, &store, &executor, false, &log).unwrap();

    assert_eq!(std::fs::read_to_string(&dest).unwrap(), "original\n");
    let latest = store.latest_for(&dest).unwrap().expect("backup");
    assert_eq!(std::fs::read_to_string(latest.path).unwrap(), "managed\n");
}

#[test]
fn dry_run_restore_writes_nothing() {
    let repo = IntegrationTestContext::new("dragon")
        .with_system_file("etc/pacman.conf", "original\n");
    let store = store(&repo);
    let executor = StubExecutor::default();
    let log = Logger::with_log_file(None);
    let dest = repo.sysroot().join("etc/pacman.conf");
    let resource = SystemFileResource::new(
        FileSource::Inline(b"managed\n".to_vec()),
        dest.clone(),
        &store,
        &executor,
    );
    guarded_apply(&resource, "install", false, &log).unwrap();

    restore(&dest, &store, &executor, true, &log).unwrap();
    assert_eq!(std::fs::read_to_string(&dest).unwrap(), "managed\n");
    assert_eq!(store.list().unwrap().len(), 1);
}

#[test]
fn overlay_maps_into_sysroot_etc() {
    let repo = IntegrationTestContext::new("dragon")
        .with_host_file("etc/pacman.conf", "x\n")
        .with_host_file("etc/modprobe.d/nvidia.conf", "y\n");
    let entries = overlay_entries(&repo.host_dir().join("etc"), &repo.sysroot()).unwrap();
    let destinations: Vec<_> = entries.iter().map(|e| e.destination.clone()).collect();
    assert_eq!(
        destinations,
        vec![
            repo.sysroot().join("etc/modprobe.d/nvidia.conf"),
            repo.sysroot().join("etc/pacman.conf"),
        ]
    );
}

#[test]
fn overlay_task_backs_up_replaced_files() {
    let repo = IntegrationTestContext::new("dragon")
        .with_host_file("etc/pacman.conf", "new\n")
        .with_system_file("etc/pacman.conf", "old\n");
    let (ctx, _log) = repo.context(
        Platform::new(true, true),
        Arc::new(StubExecutor::default()),
        false,
    );

    let task = tasks::system_files::ApplySystemFiles;
    assert!(task.should_run(&ctx));
    assert_eq!(task.run(&ctx).unwrap(), TaskResult::Ok);

    let backups = store(&repo).list().unwrap();
    assert_eq!(backups.len(), 1);
    assert_eq!(backups[0].original, repo.sysroot().join("etc/pacman.conf"));
}

#[test]
fn truthy_dry_run_values() {
    for value in ["1", "true", "YES", " on "] {
        assert!(sysmod::is_truthy(value), "{value:?}");
    }
    for value in ["", "0", "false", "off", "no"] {
        assert!(!sysmod::is_truthy(value), "{value:?}");
    }
}

#[test]
fn dry_run_variable_turns_apply_into_a_preview() {
    let repo = IntegrationTestContext::new("dragon")
        .with_host_file("etc/pacman.conf", "ParallelDownloads = 10\n")
        .with_system_file("etc/pacman.conf", "ParallelDownloads = 5\n");
    let dest = repo.sysroot().join("etc/pacman.conf");
    let args = [
        "hostsetup".to_string(),
        "--root".to_string(),
        repo.root_path().display().to_string(),
        "--backup-dir".to_string(),
        repo.backup_dir().display().to_string(),
        "--sysroot".to_string(),
        repo.sysroot().display().to_string(),
        "sysmod".to_string(),
        "apply".to_string(),
        repo.host_dir().join("etc/pacman.conf").display().to_string(),
        dest.display().to_string(),
    ];
    let cli = Cli::try_parse_from(args).unwrap();
    let Command::Sysmod(command) = &cli.command else {
        panic!("expected a sysmod command");
    };
    let log = Arc::new(Logger::with_log_file(None));

    let dry = |key: &str| (key == sysmod::DRY_RUN_ENV).then(|| "true".to_string());
    run_with_env(&cli.global, command, &log, &dry).unwrap();
    assert_eq!(
        std::fs::read_to_string(&dest).unwrap(),
        "ParallelDownloads = 5\n"
    );
    assert!(!repo.backup_dir().exists());

    run_with_env(&cli.global, command, &log, &|_| None).unwrap();
    assert_eq!(
        std::fs::read_to_string(&dest).unwrap(),
        "ParallelDownloads = 10\n"
    );
    assert_eq!(store(&repo).list().unwrap().len(), 1);
}

#[test]
fn overlay_subcommand_honours_the_dry_run_variable() {
    let repo = IntegrationTestContext::new("dragon")
        .with_host_file("etc/pacman.conf", "ParallelDownloads = 10\n")
        .with_system_file("etc/pacman.conf", "ParallelDownloads = 5\n");
    let dest = repo.sysroot().join("etc/pacman.conf");
    let cli = Cli::try_parse_from([
        "hostsetup".to_string(),
        "--root".to_string(),
        repo.root_path().display().to_string(),
        "--host".to_string(),
        "dragon".to_string(),
        "--state-dir".to_string(),
        repo.state_dir().display().to_string(),
        "--backup-dir".to_string(),
        repo.backup_dir().display().to_string(),
        "--sysroot".to_string(),
        repo.sysroot().display().to_string(),
        "sysmod".to_string(),
        "overlay".to_string(),
    ])
    .unwrap();
    let Command::Sysmod(command) = &cli.command else {
        panic!("expected a sysmod command");
    };
    let log = Arc::new(Logger::with_log_file(None));

    let dry = |key: &str| (key == sysmod::DRY_RUN_ENV).then(|| "yes".to_string());
    run_with_env(&cli.global, command, &log, &dry).unwrap();
    assert_eq!(
        std::fs::read_to_string(&dest).unwrap(),
        "ParallelDownloads = 5\n"
    );

    run_with_env(&cli.global, command, &log, &|_| None).unwrap();
    assert_eq!(
        std::fs::read_to_string(&dest).unwrap(),
        "ParallelDownloads = 10\n"
    );
    assert_eq!(store(&repo).list().unwrap().len(), 1);
    assert!(!repo.state_dir().join("dragon-system-files").exists());
}
