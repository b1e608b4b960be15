//! Telemetry Task
//!
//! Periodically renders the arbitration state and the latest sensor values
//! on the status display. Lowest priority of all tasks.
//!
//! The store is read through one snapshot; the page is built and rendered
//! after the lock is released. A failed render is logged and skipped, the
//! next period simply tries again.

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_time::Instant;

use crate::system::drive_command::DriveCommandStore;
use crate::system::error::StoreError;
use crate::system::readings::SensorReadings;
use crate::system::telemetry::{status_page, StatusDisplay};
use crate::system::warm_up::WarmUpGate;

/// What one refresh did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "rp2350", derive(defmt::Format))]
pub enum RefreshOutcome {
    /// Warm-up owns the display
    Suppressed,
    Rendered,
    RenderFailed,
}

/// Status page publisher
pub struct Telemetry<'a, M: RawMutex, D: StatusDisplay> {
    store: &'a DriveCommandStore<M>,
    gate: &'a WarmUpGate,
    readings: &'a SensorReadings,
    display: D,
}

impl<'a, M: RawMutex, D: StatusDisplay> Telemetry<'a, M, D> {
    pub fn new(
        store: &'a DriveCommandStore<M>,
        gate: &'a WarmUpGate,
        readings: &'a SensorReadings,
        display: D,
    ) -> Self {
        Self {
            store,
            gate,
            readings,
            display,
        }
    }

    /// Builds and renders one status page
    pub fn refresh(&mut self, now: Instant) -> Result<RefreshOutcome, StoreError> {
        if self.gate.is_active() {
            return Ok(RefreshOutcome::Suppressed);
        }

        let command = self.store.snapshot()?;
        let page = status_page(&command, &self.readings.snapshot(), now);

        match self.display.render(&page) {
            Ok(()) => Ok(RefreshOutcome::Rendered),
            Err(e) => {
                crate::log_warn!("status page not rendered: {:?}", e);
                Ok(RefreshOutcome::RenderFailed)
            }
        }
    }

    pub fn display(&self) -> &D {
        &self.display
    }
}

#[cfg(feature = "rp2350")]
mod firmware {
    use embassy_time::Ticker;

    use super::Telemetry;
    use crate::system::clock::{Clock, SystemClock};
    use crate::system::config::BehaviorConfig;
    use crate::system::drive_command::SharedDriveCommandStore;
    use crate::system::readings::SensorReadings;
    use crate::system::telemetry::{DisplayError, StatusDisplay, TelemetryLine, TelemetryValue};
    use crate::system::warm_up::WarmUpGate;

    /// Status display printing every line over RTT
    #[derive(Debug, Default)]
    pub struct RttDisplay;

    impl StatusDisplay for RttDisplay {
        fn render(&mut self, lines: &[TelemetryLine]) -> Result<(), DisplayError> {
            for line in lines {
                match line.value {
                    TelemetryValue::Text(text) => defmt::info!("{=str}: {=str}", line.label, text),
                    TelemetryValue::Number(n) => defmt::info!("{=str}: {}", line.label, n),
                    TelemetryValue::Pair(a, b) => {
                        defmt::info!("{=str}: {} / {}", line.label, a, b)
                    }
                }
            }
            Ok(())
        }
    }

    /// Telemetry task: one status page per telemetry period
    #[embassy_executor::task]
    pub async fn telemetry(
        store: &'static SharedDriveCommandStore,
        gate: &'static WarmUpGate,
        readings: &'static SensorReadings,
        config: BehaviorConfig,
    ) {
        let clock = SystemClock;
        let mut telemetry = Telemetry::new(store, gate, readings, RttDisplay);

        crate::log_info!("telemetry task started");
        let mut ticker = Ticker::every(config.telemetry_period);
        loop {
            ticker.next().await;
            if let Err(e) = telemetry.refresh(clock.now()) {
                panic!("telemetry task: {}", e);
            }
        }
    }
}

#[cfg(feature = "rp2350")]
pub use firmware::{telemetry, RttDisplay};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::drive_command::{DriveCommand, Priority};
    use crate::system::telemetry::{DisplayError, TelemetryLine, TelemetryValue, STATUS_LINES};
    use embassy_sync::blocking_mutex::raw::NoopRawMutex;

    type Store = DriveCommandStore<NoopRawMutex>;

    #[derive(Default)]
    struct CapturingDisplay {
        pages: Vec<Vec<TelemetryLine>>,
        fail: bool,
    }

    impl StatusDisplay for CapturingDisplay {
        fn render(&mut self, lines: &[TelemetryLine]) -> Result<(), DisplayError> {
            if self.fail {
                return Err(DisplayError::Unavailable);
            }
            self.pages.push(lines.to_vec());
            Ok(())
        }
    }

    fn open_gate() -> WarmUpGate {
        let gate = WarmUpGate::new();
        gate.release();
        gate
    }

    #[test]
    fn suppressed_during_warm_up() {
        let store = Store::new();
        let gate = WarmUpGate::new();
        let readings = SensorReadings::new();
        let mut telemetry = Telemetry::new(&store, &gate, &readings, CapturingDisplay::default());

        assert_eq!(
            telemetry.refresh(Instant::from_millis(0)),
            Ok(RefreshOutcome::Suppressed)
        );
        assert!(telemetry.display().pages.is_empty());
    }

    #[test]
    fn renders_current_state() {
        let store = Store::new();
        let gate = open_gate();
        let readings = SensorReadings::new();
        readings.record_light(420);
        readings.record_range(33, 33);
        store.propose(Priority::Follow, 100, 100, 150).unwrap();
        let mut telemetry = Telemetry::new(&store, &gate, &readings, CapturingDisplay::default());

        assert_eq!(
            telemetry.refresh(Instant::from_millis(7_500)),
            Ok(RefreshOutcome::Rendered)
        );
        let page = &telemetry.display().pages[0];
        assert_eq!(page.len(), STATUS_LINES);
        assert_eq!(page[0].value, TelemetryValue::Text("FOLLOW"));
        assert_eq!(page[3].value, TelemetryValue::Number(7_500));
        assert_eq!(page[4].value, TelemetryValue::Number(420));
        assert_eq!(page[5].value, TelemetryValue::Pair(33, 33));
    }

    #[test]
    fn render_failure_is_not_fatal() {
        let store = Store::new();
        let gate = open_gate();
        let readings = SensorReadings::new();
        let display = CapturingDisplay {
            fail: true,
            ..Default::default()
        };
        let mut telemetry = Telemetry::new(&store, &gate, &readings, display);

        assert_eq!(
            telemetry.refresh(Instant::from_millis(0)),
            Ok(RefreshOutcome::RenderFailed)
        );
        assert_eq!(store.snapshot(), Ok(DriveCommand::IDLE));
    }
}
