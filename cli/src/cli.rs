use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::settings::Overrides;

/// Top-level CLI entry point for the host setup engine.
#[derive(Parser, Debug)]
#[command(
    name = "hostsetup",
    about = "Host setup engine for a stow-based dotfiles repository",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(flatten)]
    pub global: GlobalOpts,
}

/// Options shared across all subcommands.
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalOpts {
    /// Dotfiles repository root (default: $DOTFILES_ROOT or auto-detect)
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    /// Host to configure (default: $HOSTSETUP_HOST or the hostname)
    #[arg(long, global = true)]
    pub host: Option<String>,

    /// Preview changes without applying (also $SYSMOD_DRY_RUN)
    #[arg(short = 'd', long, global = true)]
    pub dry_run: bool,

    /// Step marker directory
    #[arg(long, global = true)]
    pub state_dir: Option<PathBuf>,

    /// Backup directory for replaced system files
    #[arg(long, global = true)]
    pub backup_dir: Option<PathBuf>,

    /// Root under which system files are managed
    #[arg(long, global = true)]
    pub sysroot: Option<PathBuf>,
}

impl GlobalOpts {
    /// Path flags as configuration overrides.
    #[must_use]
    pub fn overrides(&self) -> Overrides {
        Overrides {
            state_dir: self.state_dir.clone(),
            backup_dir: self.backup_dir.clone(),
            sysroot: self.sysroot.clone(),
        }
    }
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the install sequence for the host
    Install(InstallOpts),
    /// Inspect and edit step markers
    #[command(subcommand)]
    State(StateCommand),
    /// Guarded system file changes and backups
    #[command(subcommand)]
    Sysmod(SysmodCommand),
    /// Inspect host directories and traits
    #[command(subcommand)]
    Host(HostCommand),
    /// Check the repository and host configuration
    Validate,
    /// Drive the AIO cooler LED colour from the liquid temperature
    Cooler(CoolerOpts),
    /// Print shell completions to stdout
    Completions(CompletionsOpts),
    /// Print version information
    Version,
}

impl Command {
    /// Name used for the log file.
    #[must_use]
    pub const fn log_name(&self) -> &'static str {
        match self {
            Self::Install(_) => "install",
            Self::State(_) => "state",
            Self::Sysmod(_) => "sysmod",
            Self::Host(_) => "host",
            Self::Validate => "validate",
            Self::Cooler(_) => "cooler",
            Self::Completions(_) => "completions",
            Self::Version => "version",
        }
    }

    /// Whether stdout must carry only machine-readable output.
    #[must_use]
    pub const fn wants_quiet_console(&self) -> bool {
        match self {
            Self::State(StateCommand::List { json })
            | Self::Sysmod(SysmodCommand::Backups { json })
            | Self::Host(HostCommand::Show { json } | HostCommand::Detect { json }) => *json,
            Self::Completions(_) | Self::Version => true,
            _ => false,
        }
    }
}

/// Options for the `install` subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct InstallOpts {
    /// Skip tasks by step id or name
    #[arg(long, value_delimiter = ',')]
    pub skip: Vec<String>,

    /// Run only these tasks (step id or name)
    #[arg(long, value_delimiter = ',')]
    pub only: Vec<String>,

    /// Re-run steps that are already completed
    #[arg(short, long)]
    pub force: bool,
}

/// `state` subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum StateCommand {
    /// List completed steps
    List {
        /// Print JSON
        #[arg(long)]
        json: bool,
    },
    /// Exit 0 if the step is completed, 1 otherwise
    Check {
        /// Step name
        step: String,
    },
    /// Mark steps completed
    Mark {
        /// Step names
        #[arg(required = true)]
        steps: Vec<String>,
    },
    /// Remove step markers
    Reset {
        /// Step names
        #[arg(required_unless_present = "all", conflicts_with = "all")]
        steps: Vec<String>,
        /// Remove every marker
        #[arg(long)]
        all: bool,
    },
}

/// `sysmod` subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum SysmodCommand {
    /// Install SOURCE at DEST, backing up DEST if it differs
    Apply {
        /// File with the desired content
        source: PathBuf,
        /// System path to write
        dest: PathBuf,
    },
    /// Install the host's etc/ overlay
    Overlay,
    /// Show the diff SOURCE would apply to DEST
    Diff {
        /// File with the desired content
        source: PathBuf,
        /// System path to compare with
        dest: PathBuf,
    },
    /// List backups, newest first
    Backups {
        /// Print JSON
        #[arg(long)]
        json: bool,
    },
    /// Put the most recent backup of DEST back
    Restore {
        /// System path to restore
        dest: PathBuf,
    },
}

/// `host` subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum HostCommand {
    /// Show the active host
    Show {
        /// Print JSON
        #[arg(long)]
        json: bool,
    },
    /// List host directories
    List,
    /// Detect traits on this machine and compare with the declared ones
    Detect {
        /// Print JSON
        #[arg(long)]
        json: bool,
    },
}

/// Options for the `cooler` subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct CoolerOpts {
    /// Run a single poll and exit
    #[arg(long)]
    pub once: bool,

    /// liquidctl device match (overrides settings)
    #[arg(long)]
    pub device: Option<String>,

    /// Hot colour threshold in °C (overrides settings)
    #[arg(long)]
    pub threshold: Option<f64>,

    /// Seconds between polls (overrides settings)
    #[arg(long)]
    pub interval: Option<u64>,
}

/// Options for the `completions` subcommand.
#[derive(Args, Debug, Clone)]
pub struct CompletionsOpts {
    /// Target shell
    #[arg(value_enum)]
    pub shell: clap_complete::Shell,
}
