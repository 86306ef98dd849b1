use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};

use super::{Context, ProcessOpts, Task, TaskResult, TaskStats, process_resource_states};
use crate::resources::package::{
    PackageManager, PackageResource, batch_install_packages, get_installed_packages,
};
use crate::resources::{Applicable, ResourceState};

/// Default number of parallel jobs for makepkg if nproc detection fails.
const DEFAULT_NPROC: &str = "4";

/// AUR repository of the prebuilt paru package.
const PARU_REPO: &str = "https://aur.archlinux.org/paru-bin.git";

/// Check and install a list of packages using one installed-package query.
///
/// Missing packages are installed with a single package manager command.
fn process_packages(
    ctx: &Context,
    names: &[String],
    manager: PackageManager,
) -> Result<TaskResult> {
    ctx.log.debug(&format!(
        "batch-checking {} packages with a single query",
        names.len()
    ));
    let installed = get_installed_packages(&*ctx.executor)?;

    let resource_states: Vec<_> = names
        .iter()
        .map(|name| {
            let resource = PackageResource::new(name.clone(), manager, &*ctx.executor);
            let state = resource.state_from_installed(&installed);
            (resource, state)
        })
        .collect();

    let any_missing = resource_states
        .iter()
        .any(|(_, state)| *state == ResourceState::Missing);
    if ctx.dry_run || !any_missing {
        return process_resource_states(
            ctx,
            resource_states,
            &ProcessOpts::install_missing("install"),
        );
    }

    let missing: Vec<&PackageResource<'_>> = resource_states
        .iter()
        .filter(|(_, state)| *state == ResourceState::Missing)
        .map(|(resource, _)| resource)
        .collect();

    batch_install_packages(&missing)
        .with_context(|| format!("installing {} {manager} packages", missing.len()))?;
    for resource in &missing {
        ctx.log.info(&format!("install: {}", resource.description()));
    }

    let changed = u32::try_from(missing.len()).unwrap_or(u32::MAX);
    let total = u32::try_from(resource_states.len()).unwrap_or(u32::MAX);
    let stats = TaskStats {
        changed,
        already_ok: total.saturating_sub(changed),
        ..TaskStats::default()
    };
    stats.finish(ctx, "install")
}

/// Install repository packages via pacman.
#[derive(Debug)]
pub struct InstallPackages;

impl Task for InstallPackages {
    fn name(&self) -> &'static str {
        "Install packages"
    }

    fn step_id(&self) -> Option<&str> {
        Some("packages")
    }

    fn should_run(&self, ctx: &Context) -> bool {
        ctx.platform.uses_pacman() && !ctx.config.host.config.packages.is_empty()
    }

    fn run(&self, ctx: &Context) -> Result<TaskResult> {
        if !ctx.executor.which("pacman") {
            return Ok(TaskResult::Skipped("pacman not found".to_string()));
        }
        process_packages(ctx, &ctx.config.host.config.packages, PackageManager::Pacman)
    }
}

/// Install AUR packages via paru.
#[derive(Debug)]
pub struct InstallAurPackages;

impl Task for InstallAurPackages {
    fn name(&self) -> &'static str {
        "Install AUR packages"
    }

    fn step_id(&self) -> Option<&str> {
        Some("aur")
    }

    fn should_run(&self, ctx: &Context) -> bool {
        ctx.platform.supports_aur() && !ctx.config.host.config.aur.is_empty()
    }

    fn run(&self, ctx: &Context) -> Result<TaskResult> {
        let packages = &ctx.config.host.config.aur;

        if !ctx.executor.which("paru") {
            if ctx.dry_run {
                ctx.log.dry_run(&format!(
                    "would install {} AUR packages once paru is available",
                    packages.len()
                ));
                return Ok(TaskResult::DryRun);
            }
            ctx.log.debug("paru not found in PATH, skipping AUR packages");
            return Ok(TaskResult::Skipped("paru not installed".to_string()));
        }

        process_packages(ctx, packages, PackageManager::Paru)
    }
}

/// Bootstrap the paru AUR helper.
#[derive(Debug)]
pub struct InstallParu;

impl Task for InstallParu {
    fn name(&self) -> &'static str {
        "Install paru"
    }

    fn step_id(&self) -> Option<&str> {
        Some("paru")
    }

    fn should_run(&self, ctx: &Context) -> bool {
        ctx.platform.supports_aur() && !ctx.config.host.config.aur.is_empty()
    }

    fn run(&self, ctx: &Context) -> Result<TaskResult> {
        if ctx.executor.which("paru") {
            ctx.log.info("paru already installed");
            return Ok(TaskResult::Ok);
        }

        if ctx.dry_run {
            ctx.log.dry_run("would install paru from AUR (paru-bin)");
            return Ok(TaskResult::DryRun);
        }

        check_prerequisites(ctx)?;
        let tmp = prepare_build_directory(ctx)?;
        clone_paru_from_aur(ctx, &tmp)?;
        build_paru(ctx, &tmp)?;
        cleanup_build_directory(&tmp);

        ctx.log.info("paru installed successfully");
        Ok(TaskResult::Ok)
    }
}

/// Check that required tools are available for building paru.
fn check_prerequisites(ctx: &Context) -> Result<()> {
    for dep in ["git", "makepkg", "sudo"] {
        if !ctx.executor.which(dep) {
            anyhow::bail!("missing prerequisite: {dep}");
        }
        ctx.log.debug(&format!("prerequisite ok: {dep}"));
    }
    Ok(())
}

/// Prepare a clean build directory for paru.
fn prepare_build_directory(ctx: &Context) -> Result<PathBuf> {
    let tmp = std::env::temp_dir().join("paru-build");
    if tmp.exists() {
        ctx.log.debug("removing previous paru build directory");
        std::fs::remove_dir_all(&tmp).context("removing previous paru build directory")?;
    }
    Ok(tmp)
}

fn clone_paru_from_aur(ctx: &Context, tmp: &Path) -> Result<()> {
    ctx.log.debug("cloning paru-bin from AUR");
    ctx.executor
        .run("git", &["clone", PARU_REPO, &tmp.to_string_lossy()])
        .context("cloning paru-bin from AUR")?;
    Ok(())
}

/// Build paru using makepkg with parallel compilation.
fn build_paru(ctx: &Context, tmp: &Path) -> Result<()> {
    let nproc = ctx.executor.run("nproc", &[]).map_or_else(
        |_| DEFAULT_NPROC.to_string(),
        |r| r.stdout.trim().to_string(),
    );

    let makeflags = format!("-j{nproc}");
    ctx.log.debug(&format!("building with MAKEFLAGS={makeflags}"));
    ctx.executor
        .run_in_with_env(
            tmp,
            "makepkg",
            &["-si", "--noconfirm"],
            &[("MAKEFLAGS", &makeflags)],
        )
        .context("building paru with makepkg")?;
    Ok(())
}

/// Remove the build directory (best effort, ignores errors).
fn cleanup_build_directory(tmp: &Path) {
    std::fs::remove_dir_all(tmp).ok();
}
