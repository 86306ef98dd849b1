use std::sync::Arc;

use anyhow::Result;

use crate::cli::GlobalOpts;
use crate::exec::SystemExecutor;
use crate::logging::Logger;
use crate::tasks::Task;
use crate::tasks::validate::validation_tasks;

/// Run the validate command.
///
/// # Errors
///
/// Returns an error if configuration loading fails or any check fails.
pub fn run(global: &GlobalOpts, log: &Arc<Logger>) -> Result<()> {
    let setup = super::CommandSetup::init(global, log.as_ref())?;
    let ctx = setup.into_context(log, Arc::new(SystemExecutor))?;
    let all = validation_tasks();
    let tasks: Vec<&dyn Task> = all.iter().map(Box::as_ref).collect();
    super::run_tasks_to_completion(tasks, &ctx, log)
}
