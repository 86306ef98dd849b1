use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;

use hostsetup_cli::cli::{Cli, Command};
use hostsetup_cli::commands;
use hostsetup_cli::logging::{self, Logger};

fn main() -> Result<ExitCode> {
    let args = Cli::parse();
    let command = args.command.log_name();
    logging::init_subscriber(args.verbose, args.command.wants_quiet_console(), command);
    let log = Arc::new(Logger::new(command));
    let global = &args.global;

    match &args.command {
        Command::Install(opts) => commands::install::run(global, opts, &log)?,
        Command::State(cmd) => return commands::state::run(global, cmd, log.as_ref()),
        Command::Sysmod(cmd) => commands::sysmod::run(global, cmd, &log)?,
        Command::Host(cmd) => commands::host::run(global, cmd, log.as_ref())?,
        Command::Validate => commands::validate::run(global, &log)?,
        Command::Cooler(opts) => commands::cooler::run(global, opts, log.as_ref())?,
        Command::Completions(opts) => commands::completions::run(opts),
        Command::Version => commands::version::run(),
    }
    Ok(ExitCode::SUCCESS)
}
