//! Check-then-apply loop shared by the install steps.
//!
//! Every resource is checked and, when missing or out of date, applied. The
//! outcome of each item is tallied in [`TaskStats`]. A tally with invalid or
//! failed items ends the task with an error, so its step stays unmarked.

mod apply;

use anyhow::Result;

use super::Context;
use crate::resources::{Resource, ResourceState};

pub(crate) use apply::Outcome;

/// How a task finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskResult {
    /// Every item is in place; the step may be marked.
    Ok,
    /// Nothing was attempted; the step stays unmarked.
    Skipped(String),
    /// Changes were only reported.
    DryRun,
}

/// Per-item outcome counts for one task.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TaskStats {
    /// Items written (or that would be written in dry-run).
    pub changed: u32,
    /// Items already matching the repository.
    pub already_ok: u32,
    /// Items deliberately left as they are.
    pub skipped: u32,
    /// Items that cannot be processed as declared.
    pub invalid: u32,
    /// Items whose change was attempted and failed.
    pub failed: u32,
}

impl TaskStats {
    /// Count one item.
    pub(crate) const fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Changed => self.changed += 1,
            Outcome::AlreadyOk => self.already_ok += 1,
            Outcome::Skipped => self.skipped += 1,
            Outcome::Invalid => self.invalid += 1,
            Outcome::Failed => self.failed += 1,
        }
    }

    /// Whether any item was invalid or failed.
    #[must_use]
    pub const fn has_problems(&self) -> bool {
        self.invalid > 0 || self.failed > 0
    }

    /// One-line tally, e.g. `2 changed, 5 already ok, 1 invalid`.
    /// Zero counts other than the first two are left out.
    #[must_use]
    pub fn summary(&self, dry_run: bool) -> String {
        let verb = if dry_run { "would change" } else { "changed" };
        let mut out = format!("{} {verb}, {} already ok", self.changed, self.already_ok);
        out.extend(
            [
                (self.skipped, "skipped"),
                (self.invalid, "invalid"),
                (self.failed, "failed"),
            ]
            .into_iter()
            .filter(|(count, _)| *count > 0)
            .map(|(count, label)| format!(", {count} {label}")),
        );
        out
    }

    /// Log the tally and turn it into the task's result.
    ///
    /// # Errors
    ///
    /// Returns an error naming the invalid and failed counts when either is
    /// non-zero.
    pub fn finish(self, ctx: &Context, verb: &str) -> Result<TaskResult> {
        ctx.log.info(&self.summary(ctx.dry_run));
        match (self.invalid, self.failed) {
            (0, 0) if ctx.dry_run => Ok(TaskResult::DryRun),
            (0, 0) => Ok(TaskResult::Ok),
            (invalid, 0) => anyhow::bail!("{invalid} invalid item(s)"),
            (0, failed) => anyhow::bail!("{failed} item(s) failed to {verb}"),
            (invalid, failed) => {
                anyhow::bail!("{invalid} invalid item(s), {failed} failed to {verb}")
            }
        }
    }
}

/// Knobs for [`process_resources`].
#[derive(Debug)]
pub struct ProcessOpts<'a> {
    /// Verb used in log lines and errors ("install", "stow", "enable").
    pub verb: &'a str,
    /// Overwrite out-of-date items; otherwise they count as skipped.
    pub fix_incorrect: bool,
    /// Stop at the first failed apply instead of counting it and moving on.
    pub bail_on_error: bool,
}

impl<'a> ProcessOpts<'a> {
    /// Bring every item in line, stopping at the first failure.
    #[must_use]
    pub const fn apply_all(verb: &'a str) -> Self {
        Self {
            verb,
            fix_incorrect: true,
            bail_on_error: true,
        }
    }

    /// Add what is missing and leave out-of-date items alone.
    #[must_use]
    pub const fn install_missing(verb: &'a str) -> Self {
        Self {
            verb,
            fix_incorrect: false,
            bail_on_error: false,
        }
    }

    /// Keep going after a failed apply.
    #[must_use]
    pub const fn no_bail(mut self) -> Self {
        self.bail_on_error = false;
        self
    }
}

/// Check and apply each resource, then [`finish`](TaskStats::finish).
///
/// # Errors
///
/// Returns an error if a state check fails, an apply fails under
/// `bail_on_error`, or any item ends invalid or failed.
pub fn process_resources<R: Resource>(
    ctx: &Context,
    resources: impl IntoIterator<Item = R>,
    opts: &ProcessOpts,
) -> Result<TaskResult> {
    process_resources_stats(ctx, resources, opts)?.finish(ctx, opts.verb)
}

/// Check and apply each resource, returning the tally unjudged.
///
/// # Errors
///
/// Returns an error if a state check fails or an apply fails under
/// `bail_on_error`.
pub fn process_resources_stats<R: Resource>(
    ctx: &Context,
    resources: impl IntoIterator<Item = R>,
    opts: &ProcessOpts,
) -> Result<TaskStats> {
    let mut stats = TaskStats::default();
    for resource in resources {
        let current = resource.current_state()?;
        stats.record(apply::process_single(ctx, &resource, current, opts)?);
    }
    Ok(stats)
}

/// Like [`process_resources`] for states that were queried in one batch.
///
/// # Errors
///
/// Returns an error if an apply fails under `bail_on_error`, or any item ends
/// invalid or failed.
pub fn process_resource_states<R: crate::resources::Applicable>(
    ctx: &Context,
    resource_states: impl IntoIterator<Item = (R, ResourceState)>,
    opts: &ProcessOpts,
) -> Result<TaskResult> {
    let mut stats = TaskStats::default();
    for (resource, current) in resource_states {
        stats.record(apply::process_single(ctx, &resource, current, opts)?);
    }
    stats.finish(ctx, opts.verb)
}
