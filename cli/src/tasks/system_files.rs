use anyhow::Result;

use super::{Context, ProcessOpts, Task, TaskResult, process_resources};
use crate::resources::system_file::{FileSource, SystemFileResource};
use crate::sysmod::overlay_entries;

/// Install the host's `etc/` overlay under the system root.
#[derive(Debug)]
pub struct ApplySystemFiles;

impl Task for ApplySystemFiles {
    fn name(&self) -> &'static str {
        "Apply system files"
    }

    fn step_id(&self) -> Option<&str> {
        Some("system-files")
    }

    fn should_run(&self, ctx: &Context) -> bool {
        ctx.config.host.overlay_dir().is_dir()
    }

    fn run(&self, ctx: &Context) -> Result<TaskResult> {
        let entries = overlay_entries(&ctx.config.host.overlay_dir(), ctx.backups.sysroot())?;
        ctx.log
            .debug(&format!("{} files in the etc overlay", entries.len()));

        let resources = entries.into_iter().map(|entry| {
            SystemFileResource::new(
                FileSource::Path(entry.source),
                entry.destination,
                &ctx.backups,
                &*ctx.executor,
            )
        });
        process_resources(ctx, resources, &ProcessOpts::apply_all("install"))
    }
}
