//! Command: inspect host directories and traits.
use std::collections::BTreeSet;
use std::path::PathBuf;

use anyhow::{Context as _, Result};
use serde::Serialize;

use crate::cli::{GlobalOpts, HostCommand};
use crate::config::host::{Host, list_hosts};
use crate::config::hosts_dir;
use crate::config::traits::{TraitDiff, detect_traits};
use crate::exec::SystemExecutor;
use crate::logging::Log;

/// What `host show` reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HostSummary {
    /// Host name.
    pub name: String,
    /// Host directory.
    pub dir: PathBuf,
    /// Declared traits.
    pub traits: BTreeSet<String>,
    /// Marker files present in the host directory.
    pub markers: Vec<String>,
    /// Number of official packages.
    pub packages: usize,
    /// Number of AUR packages.
    pub aur: usize,
    /// Number of system units.
    pub services: usize,
    /// Number of user units.
    pub user_services: usize,
    /// Number of stow packages.
    pub stow: usize,
    /// Whether the host has an `etc/` overlay.
    pub overlay: bool,
}

impl HostSummary {
    /// Summarize a loaded host.
    #[must_use]
    pub fn new(host: &Host) -> Self {
        let markers = if host.hyprland {
            vec!["hyprland".to_string()]
        } else {
            Vec::new()
        };
        Self {
            name: host.name.clone(),
            dir: host.dir.clone(),
            traits: host.traits.clone(),
            markers,
            packages: host.config.packages.len(),
            aur: host.config.aur.len(),
            services: host.config.services.len(),
            user_services: host.config.user_services.len(),
            stow: host.config.stow.len(),
            overlay: host.overlay_dir().is_dir(),
        }
    }
}

/// Run a `host` subcommand.
///
/// # Errors
///
/// Returns an error if the repository or host cannot be resolved.
pub fn run(global: &GlobalOpts, command: &HostCommand, log: &dyn Log) -> Result<()> {
    match command {
        HostCommand::List => {
            let root = super::resolve_root(global)?;
            for name in list_hosts(&hosts_dir(&root)) {
                println!("{name}");
            }
            Ok(())
        }
        HostCommand::Show { json } => {
            let setup = super::CommandSetup::init(global, log)?;
            let summary = HostSummary::new(&setup.config.host);
            if *json {
                print_json(&summary)
            } else {
                print!("{}", render_summary(&summary));
                Ok(())
            }
        }
        HostCommand::Detect { json } => {
            let setup = super::CommandSetup::init(global, log)?;
            log.stage("Detecting traits");
            let diff = TraitDiff::new(&setup.config.host.traits, detect_traits(&SystemExecutor));
            if *json {
                return print_json(&diff);
            }
            println!("detected:   {}", join(&diff.detected));
            println!("missing:    {}", join(&diff.missing));
            println!("undeclared: {}", join(&diff.undeclared));
            if !diff.is_clean() {
                log.warn(&format!(
                    "declared traits for {} do not match this machine",
                    setup.config.host.name
                ));
            }
            Ok(())
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("serializing output")?
    );
    Ok(())
}

fn join(set: &BTreeSet<String>) -> String {
    if set.is_empty() {
        "-".to_string()
    } else {
        set.iter().map(String::as_str).collect::<Vec<_>>().join(" ")
    }
}

/// Plain-text form of a [`HostSummary`].
#[must_use]
pub fn render_summary(summary: &HostSummary) -> String {
    let markers = if summary.markers.is_empty() {
        "-".to_string()
    } else {
        summary.markers.join(" ")
    };
    format!(
        "host:          {}\n\
         directory:     {}\n\
         traits:        {}\n\
         markers:       {markers}\n\
         packages:      {}\n\
         aur:           {}\n\
         services:      {}\n\
         user services: {}\n\
         stow:          {}\n\
         overlay:       {}\n",
        summary.name,
        summary.dir.display(),
        join(&summary.traits),
        summary.packages,
        summary.aur,
        summary.services,
        summary.user_services,
        summary.stow,
        if summary.overlay { "yes" } else { "no" },
    )
}
