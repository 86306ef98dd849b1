//! Host trait files (`hosts/<host>/.traits`).
use std::collections::BTreeSet;
use std::path::Path;

use serde::Serialize;

use crate::error::HostError;
use crate::exec::Executor;

/// Parse trait tokens: whitespace or comma separated, `#` comments,
/// lower-cased, duplicates collapsed.
#[must_use]
pub fn parse_traits(text: &str) -> BTreeSet<String> {
    text.lines()
        .map(|line| line.split_once('#').map_or(line, |(before, _)| before))
        .flat_map(|line| line.split(|c: char| c.is_whitespace() || c == ','))
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Read and parse a trait file. A missing file has no traits.
///
/// # Errors
///
/// Returns [`HostError::TraitFile`] if the file exists but cannot be read.
pub fn read_traits(path: &Path) -> Result<BTreeSet<String>, HostError> {
    match std::fs::read_to_string(path) {
        Ok(text) => Ok(parse_traits(&text)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeSet::new()),
        Err(source) => Err(HostError::TraitFile {
            path: path.display().to_string(),
            source,
        }),
    }
}

/// Detect traits on the running system.
///
/// GPUs come from `lspci`, the AIO cooler from `liquidctl list`, and the
/// rest from programs on `PATH`. A check that fails detects nothing.
#[must_use]
pub fn detect_traits(executor: &dyn Executor) -> BTreeSet<String> {
    let mut found = BTreeSet::new();

    if let Ok(result) = executor.run_unchecked("lspci", &[])
        && result.success
    {
        for line in result.stdout.lines().filter(|l| is_display_controller(l)) {
            if line.contains("NVIDIA") {
                found.insert("nvidia".to_string());
            }
            if line.contains("AMD/ATI") || line.contains("Advanced Micro Devices") {
                found.insert("amd".to_string());
            }
        }
    }

    if let Ok(result) = executor.run_unchecked("liquidctl", &["list"])
        && result.success
        && !result.stdout.trim().is_empty()
    {
        found.insert("aio".to_string());
    }

    for (name, program) in [
        ("wireguard", "wg"),
        ("hyprland", "Hyprland"),
        ("bluetooth", "bluetoothctl"),
        ("pipewire", "pw-cli"),
    ] {
        if executor.which(program) {
            found.insert(name.to_string());
        }
    }
    found
}

fn is_display_controller(line: &str) -> bool {
    ["VGA compatible controller", "3D controller", "Display controller"]
        .iter()
        .any(|class| line.contains(class))
}

/// Declared traits compared with detected ones.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TraitDiff {
    /// Traits detected on this machine.
    pub detected: BTreeSet<String>,
    /// Declared but not detected.
    pub missing: BTreeSet<String>,
    /// Detected but not declared.
    pub undeclared: BTreeSet<String>,
}

impl TraitDiff {
    /// Compare `declared` with `detected`.
    #[must_use]
    pub fn new(declared: &BTreeSet<String>, detected: BTreeSet<String>) -> Self {
        Self {
            missing: declared.difference(&detected).cloned().collect(),
            undeclared: detected.difference(declared).cloned().collect(),
            detected,
        }
    }

    /// Whether declared and detected traits agree.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.missing.is_empty() && self.undeclared.is_empty()
    }
}
