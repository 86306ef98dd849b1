//! Things a host should have: files, packages, stow links, services and
//! migration scripts, each able to report how far it is from the wanted
//! state and to close that gap.
pub mod helpers;
pub mod migration;
pub mod package;
pub mod service;
pub mod stow;
pub mod system_file;

use anyhow::Result;

/// Something that can be named in output and brought into place.
///
/// Packages only implement this: their state comes from one `pacman -Q`
/// over the whole list. Everything else also implements [`Resource`].
pub trait Applicable {
    /// Shown in progress, warning and dry-run lines.
    fn description(&self) -> String;

    /// Make the change.
    ///
    /// # Errors
    ///
    /// A write, copy or external command failed.
    fn apply(&self) -> Result<ResourceChange>;

    /// Diff or other detail printed before the change; `None` when there
    /// is nothing beyond the description.
    fn preview(&self) -> Option<String> {
        None
    }
}

/// How a resource compares with what the host config asks for.
///
/// # Examples
///
/// ```
/// use hostsetup_cli::resources::ResourceState;
///
/// let wrong = ResourceState::Incorrect { current: "sha256 1a2b3c4d".into() };
/// assert_ne!(wrong, ResourceState::Correct);
/// assert_eq!(ResourceState::Missing, ResourceState::Missing);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceState {
    /// Absent from the host.
    Missing,
    /// Present and as configured.
    Correct,
    /// Present but different.
    Incorrect {
        /// What is there now, e.g. a checksum or unit state.
        current: String,
    },
    /// Cannot be brought into place, e.g. the overlay source is gone.
    Invalid {
        /// Shown to the user.
        reason: String,
    },
}

/// What [`Applicable::apply`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceChange {
    /// Created or updated.
    Applied,
    /// Found already in place.
    AlreadyCorrect,
    /// Not done; the step is left unmarked.
    Skipped {
        /// Shown to the user.
        reason: String,
    },
}

/// A resource that can inspect the host on its own.
pub trait Resource: Applicable {
    /// Inspect the host.
    ///
    /// # Errors
    ///
    /// The inspection itself failed (unreadable file, failing query).
    fn current_state(&self) -> Result<ResourceState>;

    /// `true` when [`apply`](Applicable::apply) would do something.
    ///
    /// # Errors
    ///
    /// See [`current_state`](Self::current_state).
    fn needs_change(&self) -> Result<bool> {
        let state = self.current_state()?;
        Ok(matches!(state, ResourceState::Missing | ResourceState::Incorrect { .. }))
    }
}
