use anyhow::Result;

use super::{Context, ProcessOpts, Task, TaskResult, process_resources};
use crate::resources::service::{ServiceResource, UnitScope};

/// Enable and start the host's system and user units.
#[derive(Debug)]
pub struct EnableServices;

impl Task for EnableServices {
    fn name(&self) -> &'static str {
        "Enable services"
    }

    fn step_id(&self) -> Option<&str> {
        Some("services")
    }

    fn should_run(&self, ctx: &Context) -> bool {
        let host = &ctx.config.host.config;
        ctx.platform.has_systemd && !(host.services.is_empty() && host.user_services.is_empty())
    }

    fn run(&self, ctx: &Context) -> Result<TaskResult> {
        let host = &ctx.config.host.config;
        let system = host
            .services
            .iter()
            .map(|name| (name, UnitScope::System));
        let user = host
            .user_services
            .iter()
            .map(|name| (name, UnitScope::User));

        let resources = system
            .chain(user)
            .map(|(name, scope)| ServiceResource::new(name.clone(), scope, &*ctx.executor));
        process_resources(ctx, resources, &ProcessOpts::apply_all("enable").no_bail())
    }
}
