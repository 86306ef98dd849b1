//! Read-only checks run by `hostsetup validate`.
use anyhow::Result;

use super::{Context, Task, TaskResult};
use crate::resources::stow::StowPackageResource;
use crate::sysmod::overlay_entries;

/// Commands each known trait expects on `PATH`.
pub const TRAIT_REQUIREMENTS: &[(&str, &[&str])] = &[
    ("aio", &["liquidctl"]),
    ("bluetooth", &["bluetoothctl"]),
    ("hyprland", &["Hyprland", "hyprctl"]),
    ("nvidia", &["nvidia-smi"]),
    ("pipewire", &["pw-cli"]),
    ("wireguard", &["wg"]),
];

/// The validation sequence, in execution order.
#[must_use]
pub fn validation_tasks() -> Vec<Box<dyn Task>> {
    vec![
        Box::new(ValidateConfig),
        Box::new(CheckTraitRequirements),
        Box::new(ValidateStowPackages),
        Box::new(ValidateOverlay),
    ]
}

/// Fail on any configuration warning.
#[derive(Debug)]
pub struct ValidateConfig;

impl Task for ValidateConfig {
    fn name(&self) -> &'static str {
        "Validate configuration"
    }

    fn should_run(&self, _ctx: &Context) -> bool {
        true
    }

    fn run(&self, ctx: &Context) -> Result<TaskResult> {
        let warnings = ctx.config.validate(&ctx.platform);
        for warning in &warnings {
            ctx.log.error(&warning.to_string());
        }
        if !warnings.is_empty() {
            anyhow::bail!("{} configuration warning(s)", warnings.len());
        }
        ctx.log.info("configuration is consistent");
        Ok(TaskResult::Ok)
    }
}

/// Every declared trait with known requirements has its commands installed.
#[derive(Debug)]
pub struct CheckTraitRequirements;

impl Task for CheckTraitRequirements {
    fn name(&self) -> &'static str {
        "Check trait requirements"
    }

    fn should_run(&self, ctx: &Context) -> bool {
        !ctx.config.host.traits.is_empty()
    }

    fn run(&self, ctx: &Context) -> Result<TaskResult> {
        let mut missing = 0u32;
        for (name, commands) in TRAIT_REQUIREMENTS {
            if !ctx.config.host.has_trait(name) {
                continue;
            }
            for command in *commands {
                if ctx.executor.which(command) {
                    ctx.log.debug(&format!("{name}: {command} found"));
                } else {
                    ctx.log
                        .error(&format!("trait '{name}' requires '{command}' on PATH"));
                    missing += 1;
                }
            }
        }

        if missing > 0 {
            anyhow::bail!("{missing} required command(s) missing");
        }
        ctx.log.info(&format!(
            "requirements met for {} traits",
            ctx.config.host.traits.len()
        ));
        Ok(TaskResult::Ok)
    }
}

/// Every configured stow package exists and has files to link.
#[derive(Debug)]
pub struct ValidateStowPackages;

impl Task for ValidateStowPackages {
    fn name(&self) -> &'static str {
        "Validate stow packages"
    }

    fn should_run(&self, ctx: &Context) -> bool {
        !ctx.config.host.config.stow.is_empty()
    }

    fn run(&self, ctx: &Context) -> Result<TaskResult> {
        let stow_dir = ctx.config.stow_dir();
        let mut errors = 0u32;

        for pkg in &ctx.config.host.config.stow {
            let resource = StowPackageResource::new(
                pkg.clone(),
                stow_dir.clone(),
                ctx.home.clone(),
                &*ctx.executor,
            );
            if !stow_dir.join(pkg).is_dir() {
                ctx.log.error(&format!("stow package missing: {pkg}"));
                errors += 1;
                continue;
            }
            match resource.files() {
                Ok(files) if files.is_empty() => {
                    ctx.log.error(&format!("stow package is empty: {pkg}"));
                    errors += 1;
                }
                Ok(files) => {
                    ctx.log.debug(&format!("{pkg}: {} files", files.len()));
                }
                Err(e) => {
                    ctx.log.error(&format!("{pkg}: {e:#}"));
                    errors += 1;
                }
            }
        }

        if errors > 0 {
            anyhow::bail!("{errors} stow package(s) invalid");
        }
        ctx.log.info(&format!(
            "all {} stow packages present",
            ctx.config.host.config.stow.len()
        ));
        Ok(TaskResult::Ok)
    }
}

/// Every file in the `etc/` overlay can be read.
#[derive(Debug)]
pub struct ValidateOverlay;

impl Task for ValidateOverlay {
    fn name(&self) -> &'static str {
        "Validate etc overlay"
    }

    fn should_run(&self, ctx: &Context) -> bool {
        ctx.config.host.overlay_dir().is_dir()
    }

    fn run(&self, ctx: &Context) -> Result<TaskResult> {
        let entries = overlay_entries(&ctx.config.host.overlay_dir(), ctx.backups.sysroot())?;
        let mut unreadable = 0u32;
        for entry in &entries {
            if let Err(e) = std::fs::File::open(&entry.source) {
                ctx.log
                    .error(&format!("cannot read {}: {e}", entry.source.display()));
                unreadable += 1;
            }
        }

        if unreadable > 0 {
            anyhow::bail!("{unreadable} overlay file(s) unreadable");
        }
        ctx.log
            .info(&format!("{} overlay files readable", entries.len()));
        Ok(TaskResult::Ok)
    }
}
