//! Motor actuator interface
//!
//! The motor task hands the wheel speeds of the winning drive command to an
//! implementation of [`MotorActuator`]. Calls are idempotent: the same speed
//! is re-applied every motor period whether it changed or not.

/// Wheel selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "rp2350", derive(defmt::Format))]
pub enum Wheel {
    Left,
    Right,
}

/// Sink for signed wheel speeds
///
/// Speeds are in -100..=100; positive drives forward, negative backward,
/// zero stops. Failures are not reported; the next period re-applies the
/// speed anyway.
pub trait MotorActuator {
    fn set(&mut self, wheel: Wheel, speed: i8);
}
