//! Domain-specific error types for the host setup engine.
//!
//! Internal modules return typed errors (e.g., [`StateError`],
//! [`SysmodError`]) while command handlers at the CLI boundary convert them
//! to [`anyhow::Error`] via the standard `?` operator.
//!
//! # Error hierarchy
//!
//! ```text
//! HostsetupError
//! ├── Config(ConfigError)  - settings and host.toml parsing
//! ├── Host(HostError)      - host resolution and trait files
//! ├── State(StateError)    - step tracker markers
//! └── Sysmod(SysmodError)  - guarded system file mutation and backups
//! ```

use thiserror::Error;

/// Top-level error type for the host setup engine.
#[derive(Error, Debug)]
pub enum HostsetupError {
    /// Configuration-related error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Host resolution error.
    #[error("Host error: {0}")]
    Host(#[from] HostError),

    /// Step tracker error.
    #[error("State error: {0}")]
    State(#[from] StateError),

    /// System modification error.
    #[error("System modification error: {0}")]
    Sysmod(#[from] SysmodError),
}

/// Errors that arise from loading settings and host configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The TOML file contains a syntax or schema error.
    #[error("Invalid TOML in {file}: {message}")]
    InvalidSyntax {
        /// File that failed to parse.
        file: String,
        /// Parser message.
        message: String,
    },

    /// An I/O error occurred while reading a config file.
    #[error("IO error reading config file {path}: {source}")]
    Io {
        /// Path to the file that could not be read.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// Errors that arise while resolving the active host.
#[derive(Error, Debug)]
pub enum HostError {
    /// The requested host has no directory under `hosts/`.
    #[error("unknown host '{name}' (available: {available})")]
    UnknownHost {
        /// Requested host name.
        name: String,
        /// Comma-separated list of known hosts.
        available: String,
    },

    /// The host name cannot be part of a step name.
    #[error("invalid host name '{0}': use letters, digits, '.', '_' and '-', not starting with '.'")]
    InvalidName(String),

    /// No host was given and none could be detected.
    #[error("cannot determine host. Use --host or set HOSTSETUP_HOST")]
    Undetermined,

    /// The trait file exists but could not be read.
    #[error("cannot read trait file {path}: {source}")]
    TraitFile {
        /// Path to the `.traits` file.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// Errors from the step tracker.
#[derive(Error, Debug)]
pub enum StateError {
    /// The step name cannot be used as a marker file name.
    #[error("invalid step name '{name}': {reason}")]
    InvalidStepName {
        /// Rejected name.
        name: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// Reading or writing a marker failed.
    #[error("state I/O error at {path}: {source}")]
    Io {
        /// Marker or state directory path.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// Errors from guarded system file mutation.
#[derive(Error, Debug)]
pub enum SysmodError {
    /// The source file does not exist.
    #[error("source does not exist: {0}")]
    SourceMissing(String),

    /// The destination is a directory and cannot be overwritten with a file.
    #[error("destination is a directory: {0}")]
    DestinationIsDirectory(String),

    /// The privileged (`sudo`) fallback failed.
    #[error("privileged write to {path} failed: {reason}")]
    PrivilegedWrite {
        /// Destination path.
        path: String,
        /// Error reported by the helper command.
        reason: String,
    },

    /// No backup exists for the requested destination.
    #[error("no backup found for {0}")]
    NoBackup(String),

    /// Filesystem error.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path being accessed.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn config_error_invalid_syntax_display() {
        let e = ConfigError::InvalidSyntax {
            file: "host.toml".to_string(),
            message: "expected `=`".to_string(),
        };
        assert_eq!(e.to_string(), "Invalid TOML in host.toml: expected `=`");
    }

    #[test]
    fn config_error_io_has_source() {
        use std::error::Error as StdError;
        let e = ConfigError::Io {
            path: "/conf/settings.toml".to_string(),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "permission denied"),
        };
        assert!(e.to_string().contains("/conf/settings.toml"));
        assert!(e.source().is_some());
    }

    #[test]
    fn unknown_host_lists_available() {
        let e = HostError::UnknownHost {
            name: "wyvern".to_string(),
            available: "dragon, griffin".to_string(),
        };
        assert_eq!(
            e.to_string(),
            "unknown host 'wyvern' (available: dragon, griffin)"
        );
    }

    #[test]
    fn invalid_step_name_display() {
        let e = StateError::InvalidStepName {
            name: "../etc".to_string(),
            reason: "contains a path separator",
        };
        assert_eq!(
            e.to_string(),
            "invalid step name '../etc': contains a path separator"
        );
    }

    #[test]
    fn sysmod_no_backup_display() {
        let e = SysmodError::NoBackup("/etc/pacman.conf".to_string());
        assert_eq!(e.to_string(), "no backup found for /etc/pacman.conf");
    }

    #[test]
    fn top_level_wraps_sub_errors() {
        let e: HostsetupError = StateError::InvalidStepName {
            name: String::new(),
            reason: "is empty",
        }
        .into();
        assert!(e.to_string().starts_with("State error"));

        let e: HostsetupError = SysmodError::SourceMissing("x".to_string()).into();
        assert!(e.to_string().starts_with("System modification error"));

        let e: HostsetupError = HostError::Undetermined.into();
        assert!(e.to_string().starts_with("Host error"));
    }

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn all_error_types_are_send_sync() {
        assert_send_sync::<HostsetupError>();
        assert_send_sync::<ConfigError>();
        assert_send_sync::<HostError>();
        assert_send_sync::<StateError>();
        assert_send_sync::<SysmodError>();
    }

    #[test]
    fn sysmod_error_converts_to_anyhow() {
        let e = SysmodError::DestinationIsDirectory("/etc".to_string());
        let _anyhow_err: anyhow::Error = e.into();
    }
}
