use std::sync::Arc;

use anyhow::Result;

use crate::cli::{GlobalOpts, InstallOpts};
use crate::exec::SystemExecutor;
use crate::logging::{Log, Logger};
use crate::tasks::{self, Task, TaskFilter};

/// Run the install command.
///
/// # Errors
///
/// Returns an error if host resolution or configuration loading fails, or
/// if any task fails.
pub fn run(global: &GlobalOpts, opts: &InstallOpts, log: &Arc<Logger>) -> Result<()> {
    log.info(&format!("hostsetup {}", super::version::version()));

    let setup = super::CommandSetup::init(global, log.as_ref())?;
    let ctx = setup
        .into_context(log, Arc::new(SystemExecutor))?
        .with_force(opts.force);
    if ctx.dry_run {
        log.dry_run("no changes will be made");
    }

    let filter = TaskFilter {
        skip: opts.skip.clone(),
        only: opts.only.clone(),
    };
    let all_tasks = tasks::all_install_tasks();
    let selected: Vec<&dyn Task> = all_tasks
        .iter()
        .map(Box::as_ref)
        .filter(|task| filter.selects(*task))
        .collect();
    log.debug(&format!(
        "{} of {} tasks selected",
        selected.len(),
        all_tasks.len()
    ));

    super::run_tasks_to_completion(selected, &ctx, log)
}
