//! Facts about the running system that gate tasks.
use std::fmt;
use std::path::Path;

/// Platform information for the current system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Platform {
    /// `/etc/arch-release` exists (pacman and the AUR are available).
    pub is_arch: bool,
    /// The system is booted with systemd as PID 1.
    pub has_systemd: bool,
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let distro = if self.is_arch { "arch" } else { "linux" };
        let init = if self.has_systemd { "systemd" } else { "no systemd" };
        write!(f, "{distro} ({init})")
    }
}

impl Platform {
    /// Detect the current platform.
    #[must_use]
    pub fn detect() -> Self {
        Self::detect_in(Path::new("/"))
    }

    /// Detect the platform of the system mounted at `root`.
    #[must_use]
    pub fn detect_in(root: &Path) -> Self {
        Self {
            is_arch: root.join("etc/arch-release").exists(),
            has_systemd: root.join("run/systemd/system").is_dir(),
        }
    }

    /// Create a platform with explicit values.
    #[must_use]
    pub const fn new(is_arch: bool, has_systemd: bool) -> Self {
        Self {
            is_arch,
            has_systemd,
        }
    }

    /// Whether packages are managed with pacman.
    #[must_use]
    pub const fn uses_pacman(&self) -> bool {
        self.is_arch
    }

    /// Whether AUR packages can be built (requires Arch).
    #[must_use]
    pub const fn supports_aur(&self) -> bool {
        self.is_arch
    }
}
