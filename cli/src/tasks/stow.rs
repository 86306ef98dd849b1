use anyhow::Result;

use super::{Context, ProcessOpts, Task, TaskResult, process_resources};
use crate::resources::stow::StowPackageResource;

/// Link the host's stow packages into `$HOME`.
#[derive(Debug)]
pub struct StowDotfiles;

impl Task for StowDotfiles {
    fn name(&self) -> &'static str {
        "Stow dotfiles"
    }

    fn step_id(&self) -> Option<&str> {
        Some("stow")
    }

    fn should_run(&self, ctx: &Context) -> bool {
        !ctx.config.host.config.stow.is_empty()
    }

    fn run(&self, ctx: &Context) -> Result<TaskResult> {
        if !ctx.executor.which("stow") {
            return Ok(TaskResult::Skipped("stow not found".to_string()));
        }

        let stow_dir = ctx.config.stow_dir();
        let resources = ctx.config.host.config.stow.iter().map(|pkg| {
            StowPackageResource::new(
                pkg.clone(),
                stow_dir.clone(),
                ctx.home.clone(),
                &*ctx.executor,
            )
        });
        process_resources(ctx, resources, &ProcessOpts::apply_all("stow"))
    }
}
