//! Command: AIO cooler LED loop.
use anyhow::Result;

use crate::cli::{CoolerOpts, GlobalOpts};
use crate::config::settings::{CoolerSettings, Settings};
use crate::cooler::{Cooler, StopSignal};
use crate::exec::SystemExecutor;
use crate::logging::Log;

/// Apply command-line overrides on top of the `[cooler]` settings.
#[must_use]
pub fn effective_settings(base: &CoolerSettings, opts: &CoolerOpts) -> CoolerSettings {
    let mut settings = base.clone();
    if let Some(device) = &opts.device {
        settings.device.clone_from(device);
    }
    if let Some(threshold) = opts.threshold {
        settings.threshold_c = threshold;
    }
    if let Some(interval) = opts.interval {
        settings.interval_secs = interval.max(1);
    }
    settings
}

/// Run the cooler command.
///
/// # Errors
///
/// Returns an error if the settings are invalid, the Ctrl-C handler cannot
/// be installed, or a single `--once` poll fails.
pub fn run(global: &GlobalOpts, opts: &CoolerOpts, log: &dyn Log) -> Result<()> {
    let base = match super::resolve_root(global) {
        Ok(root) => Settings::load(&root)?.cooler,
        Err(_) => CoolerSettings::default(),
    };
    let settings = effective_settings(&base, opts);
    log.debug(&format!("cooler settings: {settings:?}"));

    let executor = SystemExecutor;
    let mut cooler = Cooler::new(&settings, &executor, log, super::is_dry_run(global));
    if opts.once {
        if cooler.poll()?.is_none() {
            log.debug("colour unchanged");
        }
        return Ok(());
    }

    let stop = StopSignal::new();
    stop.stop_on_ctrlc()?;
    log.info(&format!(
        "polling {} every {}s (Ctrl-C to stop)",
        settings.device, settings.interval_secs
    ));
    cooler.run(&stop);
    Ok(())
}
