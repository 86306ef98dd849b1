//! Systemd unit resource.
use anyhow::Result;

use super::{Applicable, Resource, ResourceChange, ResourceState};
use crate::exec::Executor;

/// Which systemd instance manages a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitScope {
    /// The system manager (`sudo systemctl`).
    System,
    /// The calling user's manager (`systemctl --user`).
    User,
}

/// A systemd unit that should be enabled and started.
#[derive(Debug)]
pub struct ServiceResource<'a> {
    /// Unit name (e.g. "bluetooth.service").
    pub name: String,
    /// Manager the unit belongs to.
    pub scope: UnitScope,
    executor: &'a dyn Executor,
}

impl<'a> ServiceResource<'a> {
    /// Create a new unit resource.
    #[must_use]
    pub const fn new(name: String, scope: UnitScope, executor: &'a dyn Executor) -> Self {
        Self {
            name,
            scope,
            executor,
        }
    }
}

impl Applicable for ServiceResource<'_> {
    fn description(&self) -> String {
        match self.scope {
            UnitScope::System => self.name.clone(),
            UnitScope::User => format!("{} (user)", self.name),
        }
    }

    fn apply(&self) -> Result<ResourceChange> {
        let result = match self.scope {
            UnitScope::System => self
                .executor
                .run_unchecked("sudo", &["systemctl", "enable", "--now", &self.name])?,
            UnitScope::User => self
                .executor
                .run_unchecked("systemctl", &["--user", "enable", "--now", &self.name])?,
        };
        if result.success {
            Ok(ResourceChange::Applied)
        } else {
            Ok(ResourceChange::Skipped {
                reason: format!("failed to enable: {}", result.stderr.trim()),
            })
        }
    }
}

impl Resource for ServiceResource<'_> {
    fn current_state(&self) -> Result<ResourceState> {
        let result = match self.scope {
            UnitScope::System => self
                .executor
                .run_unchecked("systemctl", &["is-enabled", &self.name])?,
            UnitScope::User => self
                .executor
                .run_unchecked("systemctl", &["--user", "is-enabled", &self.name])?,
        };
        if result.success {
            Ok(ResourceState::Correct)
        } else {
            Ok(ResourceState::Missing)
        }
    }
}
