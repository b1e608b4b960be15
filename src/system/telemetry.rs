//! Status page
//!
//! The telemetry task renders the arbitration state and the raw sensor
//! values as a short list of labelled lines. Rendering is best-effort.

use core::fmt;
use embassy_time::Instant;

use crate::system::drive_command::DriveCommand;
use crate::system::readings::ReadingsSnapshot;

/// Value column of a status line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "rp2350", derive(defmt::Format))]
pub enum TelemetryValue {
    Text(&'static str),
    Number(i64),
    Pair(i64, i64),
}

/// One labelled status line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "rp2350", derive(defmt::Format))]
pub struct TelemetryLine {
    pub label: &'static str,
    pub value: TelemetryValue,
}

impl TelemetryLine {
    pub const fn new(label: &'static str, value: TelemetryValue) -> Self {
        Self { label, value }
    }
}

/// Display failed to show a page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "rp2350", derive(defmt::Format))]
pub enum DisplayError {
    /// The display did not accept the page
    Unavailable,
}

impl fmt::Display for DisplayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayError::Unavailable => f.write_str("display unavailable"),
        }
    }
}

/// Sink for status pages
pub trait StatusDisplay {
    fn render(&mut self, lines: &[TelemetryLine]) -> Result<(), DisplayError>;
}

/// Number of lines on the status page
pub const STATUS_LINES: usize = 6;

/// Builds the status page from a store snapshot and the sensor board
pub fn status_page(
    command: &DriveCommand,
    readings: &ReadingsSnapshot,
    now: Instant,
) -> [TelemetryLine; STATUS_LINES] {
    [
        TelemetryLine::new("PRIO", TelemetryValue::Text(command.priority.label())),
        TelemetryLine::new(
            "SPEED L/R",
            TelemetryValue::Pair(command.speed_left.into(), command.speed_right.into()),
        ),
        TelemetryLine::new("DURATION", TelemetryValue::Number(command.duration_ms.into())),
        TelemetryLine::new("SYSTEM", TelemetryValue::Number(millis(now))),
        TelemetryLine::new("LIGHT", TelemetryValue::Number(readings.light.into())),
        TelemetryLine::new(
            "RANGE",
            TelemetryValue::Pair(readings.range.into(), readings.last_accepted_range.into()),
        ),
    ]
}

/// Builds the warm-up countdown page
pub fn setup_page(remaining: u8) -> [TelemetryLine; 1] {
    [TelemetryLine::new("SETUP", TelemetryValue::Number(remaining.into()))]
}

fn millis(now: Instant) -> i64 {
    i64::try_from(now.as_millis()).unwrap_or(i64::MAX)
}
