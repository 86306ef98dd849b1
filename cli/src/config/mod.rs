//! Repository layout, settings and the active host.
pub mod host;
pub mod settings;
pub mod toml_loader;
pub mod traits;
pub mod validation;

use anyhow::{Context as _, Result, bail};
use std::path::{Path, PathBuf};

use crate::platform::Platform;
use host::Host;
use settings::{EnvLookup, Overrides, Paths, Settings};

/// Environment variable naming the repository root.
pub const ROOT_ENV: &str = "DOTFILES_ROOT";

/// All loaded configuration for the active host.
#[derive(Debug, Clone)]
pub struct Config {
    /// Repository root.
    pub root: PathBuf,
    /// Active host.
    pub host: Host,
    /// Contents of `conf/settings.toml`.
    pub settings: Settings,
    /// Effective state, backup and sysroot directories.
    pub paths: Paths,
}

impl Config {
    /// Load settings and host `host_name` from the repository at `root`.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings or host files cannot be read or
    /// parsed, or if the host does not exist.
    pub fn load(
        root: &Path,
        host_name: &str,
        overrides: &Overrides,
        env: EnvLookup<'_>,
    ) -> Result<Self> {
        let settings = Settings::load(root).context("loading conf/settings.toml")?;
        let paths = settings.resolve(overrides, env);
        let host = Host::load(&hosts_dir(root), host_name)
            .with_context(|| format!("loading host '{host_name}'"))?;
        Ok(Self {
            root: root.to_path_buf(),
            host,
            settings,
            paths,
        })
    }

    /// Directory holding stow packages.
    #[must_use]
    pub fn stow_dir(&self) -> PathBuf {
        self.root.join("stow")
    }

    /// Directory holding migration scripts.
    #[must_use]
    pub fn migrations_dir(&self) -> PathBuf {
        self.root.join("migrations")
    }

    /// Step tracker name for a host-scoped step: `<host>-<id>`.
    #[must_use]
    pub fn step_name(&self, id: &str) -> String {
        format!("{}-{id}", self.host.name)
    }

    /// Configuration warnings for this host on `platform`.
    #[must_use]
    pub fn validate(&self, platform: &Platform) -> Vec<validation::ValidationWarning> {
        validation::validate_all(self, platform)
    }
}

/// `<root>/hosts`.
#[must_use]
pub fn hosts_dir(root: &Path) -> PathBuf {
    root.join("hosts")
}

/// Locate the repository root: `--root` > `DOTFILES_ROOT` > the nearest
/// ancestor of the executable, then of `cwd`, that contains `hosts/`.
///
/// # Errors
///
/// Returns an error if an explicit root is not a directory or no candidate
/// contains `hosts/`.
pub fn resolve_root(
    requested: Option<&Path>,
    env: EnvLookup<'_>,
    cwd: &Path,
    exe: Option<&Path>,
) -> Result<PathBuf> {
    if let Some(root) = requested
        .map(Path::to_path_buf)
        .or_else(|| env(ROOT_ENV).map(PathBuf::from))
    {
        if !root.is_dir() {
            bail!("dotfiles root is not a directory: {}", root.display());
        }
        return Ok(root);
    }

    let from_exe = exe.and_then(Path::parent).and_then(find_repo_ancestor);
    from_exe
        .or_else(|| find_repo_ancestor(cwd))
        .context("cannot find the dotfiles root (a directory containing hosts/); use --root or set DOTFILES_ROOT")
}

fn find_repo_ancestor(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| hosts_dir(dir).is_dir())
        .map(Path::to_path_buf)
}
