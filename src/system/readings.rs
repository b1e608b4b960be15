//! Latest raw sensor values
//!
//! Producers publish what they read; the telemetry task shows it. Nothing
//! here feeds back into arbitration, so plain atomics are enough and the
//! drive command lock is never involved.

use core::sync::atomic::{AtomicU16, Ordering};

/// Lock-free board of the latest sensor readings
#[derive(Debug)]
pub struct SensorReadings {
    light: AtomicU16,
    range: AtomicU16,
    last_accepted_range: AtomicU16,
}

/// Copy of the board at one point in time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "rp2350", derive(defmt::Format))]
pub struct ReadingsSnapshot {
    pub light: u16,
    pub range: u16,
    pub last_accepted_range: u16,
}

impl SensorReadings {
    /// Creates an empty board
    ///
    /// This is a const fn, allowing static initialization.
    pub const fn new() -> Self {
        Self {
            light: AtomicU16::new(0),
            range: AtomicU16::new(0),
            last_accepted_range: AtomicU16::new(0),
        }
    }

    pub fn record_light(&self, value: u16) {
        self.light.store(value, Ordering::Relaxed);
    }

    pub fn record_range(&self, value: u16, last_accepted: u16) {
        self.range.store(value, Ordering::Relaxed);
        self.last_accepted_range.store(last_accepted, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ReadingsSnapshot {
        ReadingsSnapshot {
            light: self.light.load(Ordering::Relaxed),
            range: self.range.load(Ordering::Relaxed),
            last_accepted_range: self.last_accepted_range.load(Ordering::Relaxed),
        }
    }
}

impl Default for SensorReadings {
    fn default() -> Self {
        Self::new()
    }
}
