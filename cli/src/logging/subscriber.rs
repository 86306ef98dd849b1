//! Global `tracing` subscriber: a console layer and a log file layer.
use std::fs;
use std::io::Write as _;
use std::path::Path;
use std::sync::{Mutex, PoisonError};

use tracing::Level;

use super::utils::{HEADER_TIME, LINE_TIME, log_file_path, now, strip_ansi};

/// Target of stage headers.
pub(super) const STAGE_TARGET: &str = "hostsetup::stage";
/// Target of changes a dry run skipped.
pub(super) const DRY_RUN_TARGET: &str = "hostsetup::dry_run";

/// Pulls the `message` field out of an event.
#[derive(Default)]
struct Message(String);

impl tracing::field::Visit for Message {
    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            value.clone_into(&mut self.0);
        }
    }

    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.0 = format!("{value:?}");
        }
    }
}

fn message_of(event: &tracing::Event<'_>) -> String {
    let mut message = Message::default();
    event.record(&mut message);
    message.0
}

/// Plain-text rendering of one event for the log file.
fn file_line(level: Level, target: &str, msg: &str) -> String {
    let tag = match (level, target) {
        (Level::INFO, STAGE_TARGET) => return format!("==> {msg}"),
        (Level::INFO, DRY_RUN_TARGET) => "[dry run] ",
        (Level::ERROR, _) => "[error] ",
        (Level::WARN, _) => "[warn] ",
        (Level::DEBUG | Level::TRACE, _) => "[debug] ",
        _ => "",
    };
    format!("    {tag}{msg}")
}

/// Coloured rendering of one event for the terminal.
fn console_line(level: Level, target: &str, msg: &str) -> String {
    match (level, target) {
        (Level::ERROR, _) => format!("\x1b[31merror:\x1b[0m {msg}"),
        (Level::WARN, _) => format!("\x1b[33mwarning:\x1b[0m {msg}"),
        (Level::INFO, STAGE_TARGET) => format!("\x1b[1;34m==>\x1b[0m \x1b[1m{msg}\x1b[0m"),
        (Level::INFO, DRY_RUN_TARGET) => format!("  \x1b[36m[DRY RUN]\x1b[0m {msg}"),
        (Level::INFO, _) => format!("  {msg}"),
        _ => format!("  \x1b[2m{msg}\x1b[0m"),
    }
}

/// Appends every event, debug included, to the run's log file with a
/// timestamp and without colour codes.
#[derive(Debug)]
pub(super) struct FileLayer {
    file: Mutex<fs::File>,
}

impl FileLayer {
    /// Layer writing to `<log dir>/<command>.log`; `None` when that file
    /// cannot be opened.
    pub(super) fn new(command: &str) -> Option<Self> {
        Self::create(&log_file_path(command)?)
    }

    /// Start `path` afresh with a header naming the version and start time.
    pub(super) fn create(path: &Path) -> Option<Self> {
        let version = option_env!("HOSTSETUP_VERSION")
            .unwrap_or(concat!("dev-", env!("CARGO_PKG_VERSION")));
        let rule = "=".repeat(48);
        let header = format!("{rule}\nhostsetup {version} {}\n{rule}\n", now(HEADER_TIME));
        fs::write(path, header).ok()?;
        let file = fs::OpenOptions::new().append(true).open(path).ok()?;
        Some(Self {
            file: Mutex::new(file),
        })
    }
}

impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for FileLayer {
    fn on_event(
        &self,
        event: &tracing::Event<'_>,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        let metadata = event.metadata();
        let line = file_line(
            *metadata.level(),
            metadata.target(),
            &strip_ansi(&message_of(event)),
        );
        let mut file = self.file.lock().unwrap_or_else(PoisonError::into_inner);
        writeln!(file, "[{}] {line}", now(LINE_TIME)).ok();
    }
}

/// Formats console events with [`console_line`].
struct ConsoleFormatter;

impl<S, N> tracing_subscriber::fmt::FormatEvent<S, N> for ConsoleFormatter
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
    N: for<'a> tracing_subscriber::fmt::FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &tracing_subscriber::fmt::FmtContext<'_, S, N>,
        mut writer: tracing_subscriber::fmt::format::Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        let metadata = event.metadata();
        writeln!(
            writer,
            "{}",
            console_line(*metadata.level(), metadata.target(), &message_of(event))
        )
    }
}

/// Install the global subscriber. Call once, before anything logs.
///
/// Warnings and errors go to stderr and everything else to stdout.
/// `verbose` lets debug lines through to the console and `quiet` keeps
/// only warnings and errors there, so `--json` output stays parseable.
/// The log file always receives debug and above.
pub fn init_subscriber(verbose: bool, quiet: bool, command: &str) {
    use tracing_subscriber::fmt::writer::MakeWriterExt as _;
    use tracing_subscriber::{
        Layer as _, filter::LevelFilter, fmt, layer::SubscriberExt as _,
        util::SubscriberInitExt as _,
    };

    let console_level = match (quiet, verbose) {
        (true, _) => LevelFilter::WARN,
        (false, true) => LevelFilter::DEBUG,
        (false, false) => LevelFilter::INFO,
    };
    let console = fmt::layer()
        .event_format(ConsoleFormatter)
        .with_writer(
            std::io::stderr
                .with_max_level(Level::WARN)
                .and(std::io::stdout.with_min_level(Level::INFO)),
        )
        .with_filter(console_level);
    let file = FileLayer::new(command).map(|layer| layer.with_filter(LevelFilter::DEBUG));

    tracing_subscriber::registry().with(console).with(file).init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_lines_are_tagged_by_level_and_target() {
        assert_eq!(file_line(Level::INFO, STAGE_TARGET, "Summary"), "==> Summary");
        assert_eq!(
            file_line(Level::INFO, DRY_RUN_TARGET, "would install git"),
            "    [dry run] would install git"
        );
        assert_eq!(file_line(Level::WARN, "hostsetup_cli", "w"), "    [warn] w");
        assert_eq!(file_line(Level::INFO, "hostsetup_cli", "plain"), "    plain");
    }

    #[test]
    fn console_marks_stages_and_dry_runs() {
        let stage = strip_ansi(&console_line(Level::INFO, STAGE_TARGET, "Stow dotfiles"));
        assert_eq!(stage, "==> Stow dotfiles");
        let dry = strip_ansi(&console_line(Level::INFO, DRY_RUN_TARGET, "would stow zsh"));
        assert_eq!(dry, "  [DRY RUN] would stow zsh");
        let err = strip_ansi(&console_line(Level::ERROR, "hostsetup_cli", "boom"));
        assert_eq!(err, "error: boom");
    }
}
