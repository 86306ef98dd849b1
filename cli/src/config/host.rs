//! Host directories: `hosts/<host>/{host.toml,.traits,.hyprland,etc/}`.
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use super::settings::EnvLookup;
use super::toml_loader::load_config;
use super::traits::read_traits;
use crate::error::{HostError, HostsetupError};
use crate::exec::Executor;

/// Environment variable naming the host.
pub const HOST_ENV: &str = "HOSTSETUP_HOST";

/// Marker file enabling the Hyprland desktop for a host.
pub const HYPRLAND_MARKER: &str = ".hyprland";

/// Per-host package, service and stow lists from `host.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct HostConfig {
    /// Official repository packages.
    pub packages: Vec<String>,
    /// AUR packages.
    pub aur: Vec<String>,
    /// System units to enable.
    pub services: Vec<String>,
    /// User units to enable.
    pub user_services: Vec<String>,
    /// Stow packages to link into `$HOME`.
    pub stow: Vec<String>,
}

/// A resolved host directory and everything declared in it.
#[derive(Debug, Clone, Serialize)]
pub struct Host {
    /// Host name (directory name under `hosts/`).
    pub name: String,
    /// Host directory.
    pub dir: PathBuf,
    /// Declared traits.
    pub traits: BTreeSet<String>,
    /// Whether a `.traits` file exists at all.
    pub has_trait_file: bool,
    /// Whether the `.hyprland` marker is present.
    pub hyprland: bool,
    /// Contents of `host.toml`.
    pub config: HostConfig,
}

impl Host {
    /// Load host `name` from `hosts_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::InvalidName`] for names unusable in step names,
    /// [`HostError::UnknownHost`] if there is no such directory, or an error
    /// if `.traits` or `host.toml` cannot be read.
    pub fn load(hosts_dir: &Path, name: &str) -> Result<Self, HostsetupError> {
        check_host_name(name)?;
        let dir = hosts_dir.join(name);
        if !dir.is_dir() {
            return Err(unknown_host(hosts_dir, name).into());
        }

        let trait_file = dir.join(".traits");
        let traits = read_traits(&trait_file)?;
        let config: HostConfig = load_config(&dir.join("host.toml"))?;

        Ok(Self {
            name: name.to_string(),
            has_trait_file: trait_file.is_file(),
            hyprland: dir.join(HYPRLAND_MARKER).exists(),
            traits,
            config,
            dir,
        })
    }

    /// The `/etc` overlay directory of this host.
    #[must_use]
    pub fn overlay_dir(&self) -> PathBuf {
        self.dir.join("etc")
    }

    /// Whether the host declares `name`.
    #[must_use]
    pub fn has_trait(&self, name: &str) -> bool {
        self.traits.contains(name)
    }
}

/// Host directory names under `hosts_dir`, sorted. Dot directories are
/// skipped.
#[must_use]
pub fn list_hosts(hosts_dir: &Path) -> Vec<String> {
    let Ok(entries) = std::fs::read_dir(hosts_dir) else {
        return Vec::new();
    };
    let mut hosts: Vec<String> = entries
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_ok_and(|t| t.is_dir()))
        .map(|e| e.file_name().to_string_lossy().to_string())
        .filter(|name| !name.starts_with('.'))
        .collect();
    hosts.sort();
    hosts
}

/// Host names are embedded in `<host>-<id>` step names and marker files.
fn check_host_name(name: &str) -> Result<(), HostError> {
    let usable = !name.starts_with('.')
        && !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
    if usable {
        Ok(())
    } else {
        Err(HostError::InvalidName(name.to_string()))
    }
}

fn unknown_host(hosts_dir: &Path, name: &str) -> HostError {
    let available = list_hosts(hosts_dir);
    HostError::UnknownHost {
        name: name.to_string(),
        available: if available.is_empty() {
            "none".to_string()
        } else {
            available.join(", ")
        },
    }
}

/// Inputs for [`resolve_host_name`].
#[derive(Clone, Copy)]
pub struct HostQuery<'a> {
    /// `--host` value.
    pub requested: Option<&'a str>,
    /// Environment lookup.
    pub env: EnvLookup<'a>,
    /// Usually `/etc/hostname`.
    pub hostname_file: &'a Path,
    /// Used to run `hostname` as a last resort.
    pub executor: &'a dyn Executor,
}

impl std::fmt::Debug for HostQuery<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostQuery")
            .field("requested", &self.requested)
            .field("env", &"<fn>")
            .field("hostname_file", &self.hostname_file)
            .field("executor", &self.executor)
            .finish()
    }
}

/// Resolve the active host: `--host` > `HOSTSETUP_HOST` > hostname file >
/// `hostname` command. The result must name a directory under `hosts_dir`.
///
/// # Errors
///
/// Returns [`HostError::Undetermined`] if no source yields a name,
/// [`HostError::InvalidName`] if the name cannot be used in step names and
/// [`HostError::UnknownHost`] if the name has no host directory.
pub fn resolve_host_name(hosts_dir: &Path, query: &HostQuery<'_>) -> Result<String, HostError> {
    let name = query
        .requested
        .map(str::to_string)
        .or_else(|| (query.env)(HOST_ENV))
        .or_else(|| {
            std::fs::read_to_string(query.hostname_file)
                .ok()
                .and_then(|s| s.lines().next().map(|l| l.trim().to_string()))
        })
        .filter(|s| !s.is_empty())
        .or_else(|| {
            query
                .executor
                .run("hostname", &[])
                .ok()
                .map(|r| r.stdout.trim().to_string())
                .filter(|s| !s.is_empty())
        })
        .ok_or(HostError::Undetermined)?;

    check_host_name(&name)?;
    if !hosts_dir.join(&name).is_dir() {
        return Err(unknown_host(hosts_dir, &name));
    }
    Ok(name)
}
