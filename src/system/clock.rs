//! Monotonic millisecond clock
//!
//! Producers take the current time as an argument; the periodic tasks read it
//! from a [`Clock`]. On target that is the embassy time driver.

use embassy_time::Instant;

/// Read-only monotonic time source
pub trait Clock {
    /// Current time; never decreases
    fn now(&self) -> Instant;
}

/// Embassy time driver
#[cfg(feature = "rp2350")]
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

#[cfg(feature = "rp2350")]
impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}
