//! Command: inspect and edit step markers.
use std::process::ExitCode;

use anyhow::{Context as _, Result};

use crate::cli::{GlobalOpts, StateCommand};
use crate::logging::Log;
use crate::state::{StepTracker, validate_step_name};

/// Run a `state` subcommand.
///
/// # Errors
///
/// Returns an error if a step name is invalid or the state directory cannot
/// be read or written.
pub fn run(global: &GlobalOpts, command: &StateCommand, log: &dyn Log) -> Result<ExitCode> {
    let paths = super::resolve_paths(global)?;
    let tracker = StepTracker::new(paths.state_dir);
    log.debug(&format!("state dir: {}", tracker.dir().display()));
    let dry_run = super::is_dry_run(global);

    match command {
        StateCommand::List { json } => list(&tracker, *json).map(|()| ExitCode::SUCCESS),
        StateCommand::Check { step } => check(&tracker, step),
        StateCommand::Mark { steps } => {
            mark(&tracker, steps, dry_run, log).map(|()| ExitCode::SUCCESS)
        }
        StateCommand::Reset { steps, all } => {
            reset(&tracker, steps, *all, dry_run, log).map(|()| ExitCode::SUCCESS)
        }
    }
}

fn list(tracker: &StepTracker, json: bool) -> Result<()> {
    let steps = tracker.completed_steps()?;
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&steps).context("serializing steps")?
        );
        return Ok(());
    }
    for step in &steps {
        let when = step
            .completed_at
            .map_or_else(|| "unknown".to_string(), |t| t.to_rfc3339());
        println!("{:<32} {when}", step.name);
    }
    Ok(())
}

/// Exit 0 when the step is done, 1 when it is not.
fn check(tracker: &StepTracker, step: &str) -> Result<ExitCode> {
    Ok(if tracker.is_step_completed(step)? {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Mark `steps` completed; in dry-run only report them.
///
/// # Errors
///
/// Returns an error if a name is invalid or a marker cannot be written.
pub fn mark(tracker: &StepTracker, steps: &[String], dry_run: bool, log: &dyn Log) -> Result<()> {
    for step in steps {
        if dry_run {
            validate_step_name(step)?;
            log.dry_run(&format!("would mark step {step} completed"));
        } else {
            tracker.mark_step_completed(step)?;
            log.info(&format!("marked {step}"));
        }
    }
    Ok(())
}

/// Remove the markers of `steps`, or every marker when `all` is set.
///
/// # Errors
///
/// Returns an error if a name is invalid or a marker cannot be removed.
pub fn reset(
    tracker: &StepTracker,
    steps: &[String],
    all: bool,
    dry_run: bool,
    log: &dyn Log,
) -> Result<()> {
    if all {
        if dry_run {
            let count = tracker.completed_steps()?.len();
            log.dry_run(&format!("would reset {count} step(s)"));
        } else {
            let count = tracker.reset_all_steps()?;
            log.info(&format!("reset {count} step(s)"));
        }
        return Ok(());
    }

    for step in steps {
        if dry_run {
            if tracker.is_step_completed(step)? {
                log.dry_run(&format!("would reset {step}"));
            } else {
                log.info(&format!("{step} not marked"));
            }
        } else if tracker.reset_step(step)? {
            log.info(&format!("reset {step}"));
        } else {
            log.info(&format!("{step} not marked"));
        }
    }
    Ok(())
}
