//! Log file location, ANSI stripping and timestamps.
use std::path::PathBuf;

use crate::config::settings::{EnvLookup, process_env};

/// Timestamp on the log file's header line.
pub(super) const HEADER_TIME: &str = "%Y-%m-%d %H:%M:%S %:z";
/// Timestamp leading each log file line.
pub(super) const LINE_TIME: &str = "%H:%M:%S";

/// `$XDG_CACHE_HOME/hostsetup`, falling back to `$HOME/.cache/hostsetup`.
pub(super) fn log_dir(env: EnvLookup<'_>) -> PathBuf {
    env("XDG_CACHE_HOME")
        .map(PathBuf::from)
        .or_else(|| env("HOME").map(|home| PathBuf::from(home).join(".cache")))
        .unwrap_or_else(|| PathBuf::from(".cache"))
        .join("hostsetup")
}

/// `<log dir>/<command>.log`, creating the directory. `None` when the
/// directory cannot be created.
pub(super) fn log_file_path(command: &str) -> Option<PathBuf> {
    let dir = log_dir(&process_env);
    std::fs::create_dir_all(&dir).ok()?;
    Some(dir.join(format!("{command}.log")))
}

/// Drop ANSI escape sequences: CSI sequences up to their final byte
/// (`@`..=`~`) and two-byte `ESC x` sequences.
pub(super) fn strip_ansi(s: &str) -> String {
    let mut pieces = s.split('\x1b');
    let mut out = pieces.next().unwrap_or_default().to_string();
    for piece in pieces {
        let rest = piece.strip_prefix('[').map_or_else(
            || piece.char_indices().nth(1).and_then(|(at, _)| piece.get(at..)),
            |csi| {
                csi.find(|c: char| ('@'..='~').contains(&c))
                    .and_then(|end| csi.get(end + 1..))
            },
        );
        out.push_str(rest.unwrap_or_default());
    }
    out
}

/// Local time in `format`.
pub(super) fn now(format: &str) -> String {
    chrono::Local::now().format(format).to_string()
}
