//! Command: guarded changes to system files and their backups.
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context as _, Result};

use crate::cli::{GlobalOpts, SysmodCommand};
use crate::config::settings::{EnvLookup, process_env};
use crate::exec::{Executor, SystemExecutor};
use crate::logging::{Log, Logger};
use crate::resources::system_file::{FileSource, SystemFileResource};
use crate::resources::{Applicable, Resource, ResourceChange, ResourceState};
use crate::sysmod::BackupStore;
use crate::tasks::system_files::ApplySystemFiles;
use crate::tasks::{Task, TaskResult};

/// Run a `sysmod` subcommand.
///
/// # Errors
///
/// Returns an error if a file cannot be read, backed up or written.
pub fn run(global: &GlobalOpts, command: &SysmodCommand, log: &Arc<Logger>) -> Result<()> {
    run_with_env(global, command, log, &process_env)
}

/// [`run`] with directory and dry-run settings read from `env`.
///
/// # Errors
///
/// Returns an error if a file cannot be read, backed up or written.
pub fn run_with_env(
    global: &GlobalOpts,
    command: &SysmodCommand,
    log: &Arc<Logger>,
    env: EnvLookup<'_>,
) -> Result<()> {
    let paths = super::resolve_paths_with(global, env)?;
    let store = BackupStore::new(paths.backup_dir, paths.sysroot);
    let executor = SystemExecutor;
    let dry_run = super::is_dry_run_with(global, env);

    match command {
        SysmodCommand::Apply { source, dest } => {
            let resource = SystemFileResource::new(
                FileSource::Path(source.clone()),
                dest.clone(),
                &store,
                &executor,
            );
            guarded_apply(&resource, "install", dry_run, &**log).map(|_| ())
        }
        SysmodCommand::Restore { dest } => restore(dest, &store, &executor, dry_run, &**log),
        SysmodCommand::Diff { source, dest } => {
            let resource = SystemFileResource::new(
                FileSource::Path(source.clone()),
                dest.clone(),
                &store,
                &executor,
            );
            let diff = resource.diff()?;
            if diff.is_empty() {
                log.info(&format!("{} is up to date", dest.display()));
            } else {
                print!("{diff}");
            }
            Ok(())
        }
        SysmodCommand::Backups { json } => backups(&store, *json),
        SysmodCommand::Overlay => overlay(global, log, env),
    }
}

/// Check `resource` and write it if it differs, reporting instead in dry-run.
///
/// Returns whether the file was (or would be) changed.
///
/// # Errors
///
/// Returns an error if the resource is invalid or the write fails.
pub fn guarded_apply(
    resource: &SystemFileResource<'_>,
    verb: &str,
    dry_run: bool,
    log: &dyn Log,
) -> Result<bool> {
    let desc = resource.description();
    match resource.current_state()? {
        ResourceState::Correct => {
            log.info(&format!("{desc} is up to date"));
            Ok(false)
        }
        ResourceState::Invalid { reason } => anyhow::bail!("cannot {verb} {desc}: {reason}"),
        state @ (ResourceState::Missing | ResourceState::Incorrect { .. }) => {
            if dry_run {
                let msg = if let ResourceState::Incorrect { current } = &state {
                    format!("would {verb} {desc} (currently {current})")
                } else {
                    format!("would {verb}: {desc}")
                };
                log.dry_run(&msg);
                if let Some(preview) = resource.preview() {
                    for line in preview.lines() {
                        log.info(&format!("  {line}"));
                    }
                }
                return Ok(true);
            }
            let change = resource
                .apply()
                .with_context(|| format!("failed to {verb} {desc}"))?;
            match change {
                ResourceChange::Applied => {
                    log.info(&format!("{verb}: {desc}"));
                    Ok(true)
                }
                ResourceChange::AlreadyCorrect => Ok(false),
                ResourceChange::Skipped { reason } => {
                    anyhow::bail!("failed to {verb} {desc}: {reason}")
                }
            }
        }
    }
}

/// Put the newest backup of `dest` back, backing up the current content.
///
/// # Errors
///
/// Returns an error if no backup exists or the write fails.
pub fn restore(
    dest: &Path,
    store: &BackupStore,
    executor: &dyn Executor,
    dry_run: bool,
    log: &dyn Log,
) -> Result<()> {
    let resource = SystemFileResource::restore_latest(dest, store, executor)?;
    log.debug(&format!("restoring from {}", resource.source.label()));
    guarded_apply(&resource, "restore", dry_run, log).map(|_| ())
}

fn backups(store: &BackupStore, json: bool) -> Result<()> {
    let entries = store.list()?;
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&entries).context("serializing backups")?
        );
        return Ok(());
    }
    for entry in &entries {
        println!(
            "{:<20} {:<40} {}",
            entry.taken_at,
            entry.original.display(),
            entry.path.display()
        );
    }
    Ok(())
}

/// Install the host overlay without touching step markers.
fn overlay(global: &GlobalOpts, log: &Arc<Logger>, env: EnvLookup<'_>) -> Result<()> {
    let setup = super::CommandSetup::init_with(global, &**log, env)?;
    let ctx = setup.into_context(log, Arc::new(SystemExecutor))?;
    let task = ApplySystemFiles;
    if !task.should_run(&ctx) {
        log.info(&format!("no overlay for host {}", ctx.config.host.name));
        return Ok(());
    }
    log.stage(task.name());
    match task.run(&ctx)? {
        TaskResult::Skipped(reason) => log.info(&format!("skipped: {reason}")),
        TaskResult::Ok | TaskResult::DryRun => {}
    }
    Ok(())
}
