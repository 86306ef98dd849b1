//! AIO cooler LED colour driven by the liquid temperature.
//!
//! Every poll reads `liquidctl --match <device> status --json` and sets the
//! LED to the cool or hot colour. The colour is only sent when it changes.
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::{Context as _, Result};
use serde::Deserialize;

use crate::config::settings::CoolerSettings;
use crate::exec::Executor;
use crate::logging::Log;

/// Granularity of the wait between polls, so Ctrl-C is noticed quickly.
const STOP_CHECK_INTERVAL: Duration = Duration::from_millis(250);

/// Cheaply-clonable flag telling the loop to stop.
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    stopped: Arc<AtomicBool>,
}

impl StopSignal {
    /// Create a signal in the running state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request the loop to stop after the current poll.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
    }

    /// Whether [`Self::stop`] has been called.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    /// Stop on Ctrl-C.
    ///
    /// # Errors
    ///
    /// Returns an error if a handler is already installed.
    pub fn stop_on_ctrlc(&self) -> Result<()> {
        let signal = self.clone();
        ctrlc::set_handler(move || signal.stop()).context("installing Ctrl-C handler")
    }
}

#[derive(Debug, Deserialize)]
struct DeviceStatus {
    #[serde(default)]
    status: Vec<StatusItem>,
}

#[derive(Debug, Deserialize)]
struct StatusItem {
    key: String,
    value: serde_json::Value,
}

/// Extract the liquid temperature from `liquidctl status --json` output.
///
/// Uses the first entry whose key contains "liquid temperature", falling
/// back to the first entry of the first device.
///
/// # Errors
///
/// Returns an error if the output is not valid JSON or holds no numeric
/// status value.
pub fn parse_liquid_temperature(json: &str) -> Result<f64> {
    let devices: Vec<DeviceStatus> =
        serde_json::from_str(json).context("parsing liquidctl status output")?;
    let mut items = devices.iter().flat_map(|d| d.status.iter());
    let liquid = items
        .clone()
        .find(|item| item.key.to_lowercase().contains("liquid temperature"));
    liquid
        .or_else(|| items.next())
        .and_then(|item| item.value.as_f64())
        .context("liquidctl status has no temperature reading")
}

/// Colour for `temp_c`: cool below the threshold, hot at or above it.
#[must_use]
pub fn pick_color(temp_c: f64, settings: &CoolerSettings) -> &str {
    if temp_c < settings.threshold_c {
        &settings.cool_color
    } else {
        &settings.hot_color
    }
}

/// The polling loop state.
pub struct Cooler<'a> {
    settings: &'a CoolerSettings,
    executor: &'a dyn Executor,
    log: &'a dyn Log,
    dry_run: bool,
    last_color: Option<String>,
}

impl std::fmt::Debug for Cooler<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cooler")
            .field("settings", &self.settings)
            .field("dry_run", &self.dry_run)
            .field("last_color", &self.last_color)
            .finish_non_exhaustive()
    }
}

impl<'a> Cooler<'a> {
    /// Create a cooler controller.
    #[must_use]
    pub const fn new(
        settings: &'a CoolerSettings,
        executor: &'a dyn Executor,
        log: &'a dyn Log,
        dry_run: bool,
    ) -> Self {
        Self {
            settings,
            executor,
            log,
            dry_run,
            last_color: None,
        }
    }

    /// Read the temperature once and update the LED if the colour changed.
    ///
    /// Returns the colour that was sent, or `None` when it was unchanged.
    ///
    /// # Errors
    ///
    /// Returns an error if `liquidctl` fails or its output cannot be parsed.
    pub fn poll(&mut self) -> Result<Option<String>> {
        let device = self.settings.device.as_str();
        let status = self
            .executor
            .run("liquidctl", &["--match", device, "status", "--json"])
            .context("reading cooler status")?;
        let temp = parse_liquid_temperature(&status.stdout)?;
        let color = pick_color(temp, self.settings).to_string();
        self.log.debug(&format!("liquid temperature {temp:.1} °C"));

        if self.last_color.as_deref() == Some(color.as_str()) {
            return Ok(None);
        }

        let args = ["--match", device, "set", "led", "color", "fixed", color.as_str()];
        if self.dry_run {
            self.log
                .dry_run(&format!("would run: liquidctl {}", args.join(" ")));
        } else {
            self.executor
                .run("liquidctl", &args)
                .context("setting cooler LED colour")?;
            self.log
                .info(&format!("{temp:.1} °C: LED set to {color}"));
        }
        self.last_color = Some(color.clone());
        Ok(Some(color))
    }

    /// Poll every `interval_secs` until `stop` is signalled.
    ///
    /// Poll failures are logged and the loop continues.
    pub fn run(&mut self, stop: &StopSignal) {
        let interval = Duration::from_secs(self.settings.interval_secs);
        while !stop.is_stopped() {
            if let Err(e) = self.poll() {
                self.log.warn(&format!("{e:#}"));
            }
            wait(stop, interval);
        }
        self.log.info("cooler loop stopped");
    }
}

/// Sleep for `total`, returning early once `stop` is signalled.
fn wait(stop: &StopSignal, total: Duration) {
    let mut remaining = total;
    while !remaining.is_zero() && !stop.is_stopped() {
        let step = remaining.min(STOP_CHECK_INTERVAL);
        std::thread::sleep(step);
        remaining = remaining.saturating_sub(step);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::resources::test_helpers::MockExecutor;
    use crate::tasks::test_helpers::RecordingLog;

    fn status(temp: f64) -> String {
        format!(
            r#"[{{"bus": "hid", "address": "/dev/hidraw3",
                "description": "Corsair Hydro H100i Pro XT",
                "status": [
                    {{"key": "Fan 1 speed", "value": 1020, "unit": "rpm"}},
                    {{"key": "Liquid temperature", "value": {temp}, "unit": "°C"}}
                ]}}]"#
        )
    }

    #[test]
    fn liquid_temperature_is_found_by_key() {
        assert!((parse_liquid_temperature(&status(33.4)).unwrap() - 33.4).abs() < f64::EPSILON);
    }

    #[test]
    fn falls_back_to_first_entry() {
        let json = r#"[{"status": [{"key": "Coolant", "value": 41.0, "unit": "°C"}]}]"#;
        assert!((parse_liquid_temperature(json).unwrap() - 41.0).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_status_is_an_error() {
        assert!(parse_liquid_temperature("[]").is_err());
        assert!(parse_liquid_temperature("not json").is_err());
    }

    #[test]
    fn threshold_is_inclusive_for_hot() {
        let settings = CoolerSettings::default();
        assert_eq!(pick_color(39.9, &settings), "0080ff");
        assert_eq!(pick_color(40.0, &settings), "ff0000");
    }

    #[test]
    fn colour_is_sent_only_when_it_changes() {
        let settings = CoolerSettings::default();
        let executor = MockExecutor::with_responses(vec![
            (true, status(35.0)),
            (true, String::new()),
            (true, status(36.0)),
            (true, status(45.0)),
            (true, String::new()),
        ]);
        let log = RecordingLog::default();
        let mut cooler = Cooler::new(&settings, &executor, &log, false);

        assert_eq!(cooler.poll().unwrap().as_deref(), Some("0080ff"));
        assert_eq!(cooler.poll().unwrap(), None);
        assert_eq!(cooler.poll().unwrap().as_deref(), Some("ff0000"));
        assert_eq!(
            executor.calls(),
            vec![
                "liquidctl --match h100i status --json",
                "liquidctl --match h100i set led color fixed 0080ff",
                "liquidctl --match h100i status --json",
                "liquidctl --match h100i status --json",
                "liquidctl --match h100i set led color fixed ff0000",
            ]
        );
    }

    #[test]
    fn dry_run_logs_instead_of_setting() {
        let settings = CoolerSettings::default();
        let executor = MockExecutor::ok(&status(50.0));
        let log = RecordingLog::default();
        let mut cooler = Cooler::new(&settings, &executor, &log, true);

        assert_eq!(cooler.poll().unwrap().as_deref(), Some("ff0000"));
        assert_eq!(executor.call_count(), 1);
        assert!(log.contains("dry_run", "set led color fixed ff0000"));
    }

    #[test]
    fn stopped_loop_does_not_poll() {
        let settings = CoolerSettings::default();
        let executor = MockExecutor::with_responses(vec![]);
        let log = RecordingLog::default();
        let stop = StopSignal::new();
        stop.stop();
        Cooler::new(&settings, &executor, &log, false).run(&stop);
        assert_eq!(executor.call_count(), 0);
        assert!(log.contains("info", "cooler loop stopped"));
    }
}
