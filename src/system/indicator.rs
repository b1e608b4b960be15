//! Status indicator and buzzer
//!
//! Used by the warm-up countdown: an RGB LED cycles through colors and a
//! piezo buzzer chirps once per step.

use embassy_time::Duration;

/// Indicator LED color
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "rp2350", derive(defmt::Format))]
pub enum IndicatorColor {
    Off,
    Red,
    Green,
    Blue,
}

impl IndicatorColor {
    /// Which of the red, green and blue channels are lit
    pub const fn channels(self) -> (bool, bool, bool) {
        match self {
            IndicatorColor::Off => (false, false, false),
            IndicatorColor::Red => (true, false, false),
            IndicatorColor::Green => (false, true, false),
            IndicatorColor::Blue => (false, false, true),
        }
    }
}

/// A buzzer tone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "rp2350", derive(defmt::Format))]
pub struct Tone {
    pub frequency_hz: u32,
    pub length: Duration,
}

impl Tone {
    pub const fn new(frequency_hz: u32, length_ms: u64) -> Self {
        Self {
            frequency_hz,
            length: Duration::from_millis(length_ms),
        }
    }
}

/// Countdown chirp, once per warm-up step
pub const COUNTDOWN_TONE: Tone = Tone::new(1800, 50);

/// Played once when the warm-up gate opens
pub const READY_TONE: Tone = Tone::new(2800, 500);
