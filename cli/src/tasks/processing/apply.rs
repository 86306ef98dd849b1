//! One resource through the check-then-apply decision.

use anyhow::Result;

use super::ProcessOpts;
use crate::resources::{Applicable, ResourceChange, ResourceState};
use crate::tasks::Context;

/// What happened to a single item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Outcome {
    Changed,
    AlreadyOk,
    Skipped,
    Invalid,
    Failed,
}

/// Decide what to do with `resource` in `state` and do it.
pub(super) fn process_single<R: Applicable + ?Sized>(
    ctx: &Context,
    resource: &R,
    state: ResourceState,
    opts: &ProcessOpts,
) -> Result<Outcome> {
    let desc = resource.description();
    ctx.log.debug(&format!("{desc}: {state:?}"));

    let current = match state {
        ResourceState::Correct => return Ok(Outcome::AlreadyOk),
        ResourceState::Invalid { reason } => {
            ctx.log
                .warn(&format!("cannot {} {desc}: {reason}", opts.verb));
            return Ok(Outcome::Invalid);
        }
        ResourceState::Incorrect { .. } if !opts.fix_incorrect => {
            ctx.log.debug(&format!("leaving {desc} as it is"));
            return Ok(Outcome::Skipped);
        }
        ResourceState::Incorrect { current } => Some(current),
        ResourceState::Missing => None,
    };

    let preview = resource.preview();
    if ctx.dry_run {
        ctx.log.dry_run(&current.map_or_else(
            || format!("would {}: {desc}", opts.verb),
            |current| format!("would {} {desc} (currently {current})", opts.verb),
        ));
        for line in preview.iter().flat_map(|p| p.lines()) {
            ctx.log.info(&format!("  {line}"));
        }
        return Ok(Outcome::Changed);
    }
    for line in preview.iter().flat_map(|p| p.lines()) {
        ctx.log.debug(&format!("  {line}"));
    }

    let failure = match resource.apply() {
        Ok(ResourceChange::Applied) => {
            ctx.log.info(&format!("{}: {desc}", opts.verb));
            return Ok(Outcome::Changed);
        }
        Ok(ResourceChange::AlreadyCorrect) => return Ok(Outcome::AlreadyOk),
        Ok(ResourceChange::Skipped { reason }) => anyhow::anyhow!(reason),
        Err(e) => e,
    };
    if opts.bail_on_error {
        return Err(failure.context(format!("failed to {} {desc}", opts.verb)));
    }
    ctx.log
        .warn(&format!("failed to {} {desc}: {failure:#}", opts.verb));
    Ok(Outcome::Failed)
}
