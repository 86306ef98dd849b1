//! Global settings from `conf/settings.toml`, environment and CLI flags.
use serde::Deserialize;
use std::path::{Path, PathBuf};

use super::toml_loader::load_config;
use crate::error::ConfigError;

/// Environment variable overriding the state directory.
pub const STATE_DIR_ENV: &str = "HOSTSETUP_STATE_DIR";
/// Environment variable overriding the backup directory.
pub const BACKUP_DIR_ENV: &str = "SYSMOD_BACKUP_DIR";
/// Environment variable overriding the system root.
pub const SYSROOT_ENV: &str = "HOSTSETUP_SYSROOT";

/// Looks up an environment variable; injectable so tests need not mutate
/// the process environment.
pub type EnvLookup<'a> = &'a dyn Fn(&str) -> Option<String>;

/// Read `key` from the process environment, treating empty values as unset.
#[must_use]
pub fn process_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// AIO cooler LED settings (`[cooler]` table).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CoolerSettings {
    /// `liquidctl --match` pattern.
    pub device: String,
    /// Temperature (°C) at and above which the hot colour is used.
    pub threshold_c: f64,
    /// Colour below the threshold (hex, no `#`).
    pub cool_color: String,
    /// Colour at or above the threshold.
    pub hot_color: String,
    /// Seconds between polls.
    pub interval_secs: u64,
}

impl Default for CoolerSettings {
    fn default() -> Self {
        Self {
            device: "h100i".to_string(),
            threshold_c: 40.0,
            cool_color: "0080ff".to_string(),
            hot_color: "ff0000".to_string(),
            interval_secs: 60,
        }
    }
}

/// Contents of `conf/settings.toml`. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Step marker directory.
    pub state_dir: Option<PathBuf>,
    /// Backup root for replaced system files.
    pub backup_dir: Option<PathBuf>,
    /// Root that `/etc` overlays are applied under.
    pub sysroot: Option<PathBuf>,
    /// Cooler loop settings.
    pub cooler: CoolerSettings,
}

/// Path overrides given on the command line.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    /// `--state-dir`.
    pub state_dir: Option<PathBuf>,
    /// `--backup-dir`.
    pub backup_dir: Option<PathBuf>,
    /// `--sysroot`.
    pub sysroot: Option<PathBuf>,
}

/// Effective directories after applying precedence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    /// Step marker directory.
    pub state_dir: PathBuf,
    /// Backup root.
    pub backup_dir: PathBuf,
    /// System root.
    pub sysroot: PathBuf,
}

impl Settings {
    /// Load `<root>/conf/settings.toml`; a missing file yields defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(root: &Path) -> Result<Self, ConfigError> {
        let mut settings: Self = load_config(&root.join("conf").join("settings.toml"))?;
        for path in [
            &mut settings.state_dir,
            &mut settings.backup_dir,
            &mut settings.sysroot,
        ]
        .into_iter()
        .flatten()
        {
            if path.is_relative() {
                *path = root.join(&*path);
            }
        }
        Ok(settings)
    }

    /// Resolve directories: CLI flag > environment > settings file > default.
    #[must_use]
    pub fn resolve(&self, cli: &Overrides, env: EnvLookup<'_>) -> Paths {
        let pick = |flag: &Option<PathBuf>, key: &str, file: &Option<PathBuf>| {
            flag.clone()
                .or_else(|| env(key).map(PathBuf::from))
                .or_else(|| file.clone())
        };
        let state_home = xdg_state_home(env).join("hostsetup");

        Paths {
            state_dir: pick(&cli.state_dir, STATE_DIR_ENV, &self.state_dir)
                .unwrap_or_else(|| state_home.join("install-state")),
            backup_dir: pick(&cli.backup_dir, BACKUP_DIR_ENV, &self.backup_dir)
                .unwrap_or_else(|| state_home.join("backups")),
            sysroot: pick(&cli.sysroot, SYSROOT_ENV, &self.sysroot)
                .unwrap_or_else(|| PathBuf::from("/")),
        }
    }
}

/// `$XDG_STATE_HOME`, falling back to `$HOME/.local/state`.
fn xdg_state_home(env: EnvLookup<'_>) -> PathBuf {
    env("XDG_STATE_HOME").map_or_else(
        || {
            env("HOME")
                .map_or_else(|| PathBuf::from("."), PathBuf::from)
                .join(".local")
                .join("state")
        },
        PathBuf::from,
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_follow_xdg_state_home() {
        let env = env_from(&[("XDG_STATE_HOME", "/home/u/.state")]);
        let paths = Settings::default().resolve(&Overrides::default(), &env);
        assert_eq!(
            paths.state_dir,
            PathBuf::from("/home/u/.state/hostsetup/install-state")
        );
        assert_eq!(
            paths.backup_dir,
            PathBuf::from("/home/u/.state/hostsetup/backups")
        );
        assert_eq!(paths.sysroot, PathBuf::from("/"));
    }

    #[test]
    fn defaults_fall_back_to_home() {
        let env = env_from(&[("HOME", "/home/u")]);
        let paths = Settings::default().resolve(&Overrides::default(), &env);
        assert_eq!(
            paths.state_dir,
            PathBuf::from("/home/u/.local/state/hostsetup/install-state")
        );
    }

    #[test]
    fn precedence_is_cli_then_env_then_file() {
        let settings = Settings {
            state_dir: Some(PathBuf::from("/file/state")),
            backup_dir: Some(PathBuf::from("/file/backups")),
            sysroot: Some(PathBuf::from("/file/root")),
            ..Settings::default()
        };
        let env = env_from(&[
            (STATE_DIR_ENV, "/env/state"),
            (BACKUP_DIR_ENV, "/env/backups"),
        ]);
        let cli = Overrides {
            state_dir: Some(PathBuf::from("/cli/state")),
            ..Overrides::default()
        };
        let paths = settings.resolve(&cli, &env);
        assert_eq!(paths.state_dir, PathBuf::from("/cli/state"));
        assert_eq!(paths.backup_dir, PathBuf::from("/env/backups"));
        assert_eq!(paths.sysroot, PathBuf::from("/file/root"));
    }

    #[test]
    fn load_resolves_relative_paths_against_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("conf")).unwrap();
        std::fs::write(
            dir.path().join("conf/settings.toml"),
            "state_dir = \"var/state\"\nbackup_dir = \"/abs/backups\"\n\n[cooler]\nthreshold_c = 45.0\n",
        )
        .unwrap();
        let settings = Settings::load(dir.path()).unwrap();
        assert_eq!(settings.state_dir, Some(dir.path().join("var/state")));
        assert_eq!(settings.backup_dir, Some(PathBuf::from("/abs/backups")));
        assert_eq!(settings.cooler.threshold_c, 45.0);
        assert_eq!(settings.cooler.device, "h100i");
    }

    #[test]
    fn missing_settings_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(Settings::load(dir.path()).unwrap(), Settings::default());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("conf")).unwrap();
        std::fs::write(dir.path().join("conf/settings.toml"), "stat_dir = \"x\"\n").unwrap();
        assert!(matches!(
            Settings::load(dir.path()),
            Err(ConfigError::InvalidSyntax { .. })
        ));
    }
}
