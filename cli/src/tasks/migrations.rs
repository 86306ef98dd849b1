use anyhow::Result;

use super::{Context, ProcessOpts, Task, TaskResult, process_resources};
use crate::resources::migration::{MigrationResource, discover};

/// Run every migration script that has not run on this machine yet.
///
/// Untracked as a whole; each script records its own `migration-<stem>`
/// step, so scripts added later are still picked up.
#[derive(Debug)]
pub struct RunMigrations;

impl Task for RunMigrations {
    fn name(&self) -> &'static str {
        "Run migrations"
    }

    fn should_run(&self, ctx: &Context) -> bool {
        ctx.config.migrations_dir().is_dir()
    }

    fn run(&self, ctx: &Context) -> Result<TaskResult> {
        let scripts = discover(&ctx.config.migrations_dir())?;
        ctx.log
            .debug(&format!("{} migration scripts found", scripts.len()));

        let resources = scripts.into_iter().map(|script| {
            MigrationResource::new(
                script,
                ctx.config.root.clone(),
                &ctx.tracker,
                &*ctx.executor,
            )
        });
        process_resources(ctx, resources, &ProcessOpts::apply_all("run"))
    }
}

#[cfg(all(test, unix))]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::resources::test_helpers::MockExecutor;
    use crate::tasks::test_helpers::TestContext;
    use std::os::unix::fs::PermissionsExt as _;

    fn add_script(tc: &TestContext, name: &str) {
        let dir = tc.repo.root().join("migrations");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        std::fs::write(&path, "#!/bin/sh\nexit 0\n").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    }

    #[test]
    fn no_migrations_dir_is_not_applicable() {
        let tc = TestContext::new();
        assert!(!RunMigrations.should_run(&tc.ctx()));
    }

    #[test]
    fn pending_scripts_run_in_order_and_are_recorded() {
        let tc = TestContext::new().executor(MockExecutor::with_responses(vec![
            (true, String::new()),
            (true, String::new()),
        ]));
        add_script(&tc, "002-rename-hypr");
        add_script(&tc, "001-move-zshrc");
        let ctx = tc.ctx();
        ctx.tracker
            .mark_step_completed("migration-001-move-zshrc")
            .unwrap();

        assert_eq!(RunMigrations.run(&ctx).unwrap(), TaskResult::Ok);
        let calls = tc.mock().calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].ends_with("migrations/002-rename-hypr"));
        assert!(
            ctx.tracker
                .is_step_completed("migration-002-rename-hypr")
                .unwrap()
        );
    }

    #[test]
    fn failing_script_stops_the_run_unrecorded() {
        let tc = TestContext::new().executor(MockExecutor::fail());
        add_script(&tc, "001-move-zshrc");
        add_script(&tc, "002-rename-hypr");
        let ctx = tc.ctx();

        let err = RunMigrations.run(&ctx).unwrap_err();
        assert!(format!("{err:#}").contains("migration-001-move-zshrc"));
        assert_eq!(tc.mock().call_count(), 1);
        assert!(ctx.tracker.completed_steps().unwrap().is_empty());
    }

    #[test]
    fn dry_run_lists_pending_scripts() {
        let tc = TestContext::new().dry_run();
        add_script(&tc, "001-move-zshrc");
        assert_eq!(RunMigrations.run(&tc.ctx()).unwrap(), TaskResult::DryRun);
        assert!(tc.log.contains("dry_run", "would run: migration-001-move-zshrc"));
        assert_eq!(tc.mock().call_count(), 0);
    }

    #[test]
    fn badly_named_script_fails_the_run_without_blocking_others() {
        let tc = TestContext::new().executor(MockExecutor::with_responses(vec![(
            true,
            String::new(),
        )]));
        add_script(&tc, "001 fix fonts");
        add_script(&tc, "002-rename-hypr");
        let ctx = tc.ctx();

        let err = RunMigrations.run(&ctx).unwrap_err();
        assert_eq!(err.to_string(), "1 invalid item(s)");
        assert!(tc.log.contains("warn", "001 fix fonts"));
        assert!(
            ctx.tracker
                .is_step_completed("migration-002-rename-hypr")
                .unwrap()
        );
    }
}
