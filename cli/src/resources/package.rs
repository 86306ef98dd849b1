//! Package installation resource.
use std::collections::HashSet;

use anyhow::Result;

use super::{Applicable, ResourceChange, ResourceState};
use crate::exec::Executor;

/// Supported package managers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageManager {
    /// Official Arch Linux packages (pacman, through sudo).
    Pacman,
    /// AUR packages (paru, which escalates on its own).
    Paru,
}

impl std::fmt::Display for PackageManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pacman => write!(f, "pacman"),
            Self::Paru => write!(f, "paru"),
        }
    }
}

impl PackageManager {
    /// Program and leading arguments for a non-interactive install.
    const fn install_command(self) -> (&'static str, &'static [&'static str]) {
        match self {
            Self::Pacman => ("sudo", &["pacman", "-S", "--needed", "--noconfirm"]),
            Self::Paru => ("paru", &["-S", "--needed", "--noconfirm"]),
        }
    }
}

/// A system package that can be checked and installed.
#[derive(Debug)]
pub struct PackageResource<'a> {
    /// Package name.
    pub name: String,
    /// Package manager to use.
    pub manager: PackageManager,
    executor: &'a dyn Executor,
}

impl<'a> PackageResource<'a> {
    /// Create a new package resource.
    #[must_use]
    pub const fn new(name: String, manager: PackageManager, executor: &'a dyn Executor) -> Self {
        Self {
            name,
            manager,
            executor,
        }
    }

    /// Determine the resource state from a pre-fetched set of installed package names.
    #[must_use]
    pub fn state_from_installed(&self, installed: &HashSet<String>) -> ResourceState {
        if installed.contains(&self.name) {
            ResourceState::Correct
        } else {
            ResourceState::Missing
        }
    }
}

/// Query the full set of installed package names with a single `pacman -Q`.
///
/// Both managers share the pacman database, so AUR packages show up here
/// too. A failing query yields an empty set.
///
/// # Errors
///
/// Returns an error if `pacman` cannot be spawned.
pub fn get_installed_packages(executor: &dyn Executor) -> Result<HashSet<String>> {
    let result = executor.run_unchecked("pacman", &["-Q"])?;
    let mut set = HashSet::new();
    if result.success {
        for line in result.stdout.lines() {
            if let Some(name) = line.split_whitespace().next() {
                set.insert(name.to_string());
            }
        }
    }
    Ok(set)
}

/// Install a batch of packages with one command per package manager.
///
/// # Errors
///
/// Returns an error if any package manager command fails.
pub fn batch_install_packages(resources: &[&PackageResource<'_>]) -> Result<()> {
    for manager in [PackageManager::Pacman, PackageManager::Paru] {
        let Some(first) = resources.iter().find(|r| r.manager == manager) else {
            continue;
        };
        let (program, base) = manager.install_command();
        let mut args: Vec<&str> = base.iter().copied().collect();
        args.extend(
            resources
                .iter()
                .filter(|r| r.manager == manager)
                .map(|r| r.name.as_str()),
        );
        first.executor.run(program, &args)?;
    }
    Ok(())
}

impl Applicable for PackageResource<'_> {
    fn description(&self) -> String {
        format!("{} ({})", self.name, self.manager)
    }

    fn apply(&self) -> Result<ResourceChange> {
        let (program, base) = self.manager.install_command();
        let mut args: Vec<&str> = base.iter().copied().collect();
        args.push(self.name.as_str());
        self.executor.run(program, &args)?;
        Ok(ResourceChange::Applied)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::resources::test_helpers::MockExecutor;

    #[test]
    fn description_includes_manager() {
        let executor = MockExecutor::with_responses(vec![]);
        let pkg = PackageResource::new("git".to_string(), PackageManager::Pacman, &executor);
        assert_eq!(pkg.description(), "git (pacman)");
        let pkg = PackageResource::new("paru-bin".to_string(), PackageManager::Paru, &executor);
        assert_eq!(pkg.description(), "paru-bin (paru)");
    }

    #[test]
    fn installed_set_parses_pacman_query() {
        let executor = MockExecutor::ok("git 2.47.0-1\nzsh 5.9-5\n");
        let installed = get_installed_packages(&executor).unwrap();
        assert!(installed.contains("git"));
        assert!(installed.contains("zsh"));
        assert_eq!(installed.len(), 2);
    }

    #[test]
    fn failed_query_yields_empty_set() {
        let executor = MockExecutor::fail();
        assert!(get_installed_packages(&executor).unwrap().is_empty());
    }

    #[test]
    fn state_from_installed() {
        let executor = MockExecutor::with_responses(vec![]);
        let installed: HashSet<String> = ["git".to_string()].into_iter().collect();
        let git = PackageResource::new("git".to_string(), PackageManager::Pacman, &executor);
        let vim = PackageResource::new("vim".to_string(), PackageManager::Pacman, &executor);
        assert_eq!(git.state_from_installed(&installed), ResourceState::Correct);
        assert_eq!(vim.state_from_installed(&installed), ResourceState::Missing);
    }

    #[test]
    fn apply_pacman_runs_through_sudo() {
        let executor = MockExecutor::ok("");
        let pkg = PackageResource::new("ripgrep".to_string(), PackageManager::Pacman, &executor);
        assert_eq!(pkg.apply().unwrap(), ResourceChange::Applied);
        assert_eq!(
            executor.calls(),
            vec!["sudo pacman -S --needed --noconfirm ripgrep"]
        );
    }

    #[test]
    fn batch_install_groups_by_manager() {
        let executor = MockExecutor::with_responses(vec![
            (true, String::new()),
            (true, String::new()),
        ]);
        let a = PackageResource::new("git".to_string(), PackageManager::Pacman, &executor);
        let b = PackageResource::new("zsh".to_string(), PackageManager::Pacman, &executor);
        let c = PackageResource::new("paru-bin".to_string(), PackageManager::Paru, &executor);
        batch_install_packages(&[&a, &c, &b]).unwrap();
        assert_eq!(
            executor.calls(),
            vec![
                "sudo pacman -S --needed --noconfirm git zsh",
                "paru -S --needed --noconfirm paru-bin",
            ]
        );
    }

    #[test]
    fn batch_install_propagates_failure() {
        let executor = MockExecutor::fail();
        let a = PackageResource::new("git".to_string(), PackageManager::Pacman, &executor);
        assert!(batch_install_packages(&[&a]).is_err());
    }
}
