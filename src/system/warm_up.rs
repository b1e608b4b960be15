//! Warm-up Gate
//!
//! For a fixed number of seconds after power-up nothing may move. The gate is
//! a read-only flag for every periodic task; the warm-up task is the only one
//! that opens it, exactly once.
//!
//! # Countdown
//! The sequence is a one-shot state machine ticked by the warm-up task's own
//! ticker, one step per second:
//! ```text
//! step N (N = steps..1): show N, color by N % 3 (2 green, 1 blue, 0 red), chirp
//! after step 1:          open the gate, color red, ready tone
//! ```

use core::sync::atomic::{AtomicBool, Ordering};

use crate::system::indicator::{IndicatorColor, Tone, COUNTDOWN_TONE, READY_TONE};

/// Startup gate shared by all periodic tasks
#[derive(Debug)]
pub struct WarmUpGate {
    active: AtomicBool,
}

impl WarmUpGate {
    /// Creates a closed gate (warm-up active)
    ///
    /// This is a const fn, allowing static initialization.
    pub const fn new() -> Self {
        Self {
            active: AtomicBool::new(true),
        }
    }

    /// Whether behaviors and actuators must stay idle
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Opens the gate
    ///
    /// Returns true for the single call that performed the transition.
    pub fn release(&self) -> bool {
        self.active
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

impl Default for WarmUpGate {
    fn default() -> Self {
        Self::new()
    }
}

/// What the warm-up task should do on this tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "rp2350", derive(defmt::Format))]
pub enum WarmUpStep {
    /// Still counting down
    Countdown {
        remaining: u8,
        color: IndicatorColor,
        tone: Tone,
    },
    /// Countdown over, gate just opened
    Ready { color: IndicatorColor, tone: Tone },
    /// Nothing left to do
    Done,
}

/// One-shot countdown driving a [`WarmUpGate`]
#[derive(Debug)]
pub struct WarmUpSequence {
    remaining: u8,
    finished: bool,
}

impl WarmUpSequence {
    pub const fn new(steps: u8) -> Self {
        Self {
            remaining: steps,
            finished: false,
        }
    }

    /// Advances one tick, opening `gate` when the countdown runs out
    pub fn step(&mut self, gate: &WarmUpGate) -> WarmUpStep {
        if self.finished {
            return WarmUpStep::Done;
        }

        if self.remaining > 0 {
            let remaining = self.remaining;
            self.remaining -= 1;
            return WarmUpStep::Countdown {
                remaining,
                color: countdown_color(remaining),
                tone: COUNTDOWN_TONE,
            };
        }

        self.finished = true;
        if gate.release() {
            crate::log_info!("warm-up finished, behaviors enabled");
        }
        WarmUpStep::Ready {
            color: IndicatorColor::Red,
            tone: READY_TONE,
        }
    }
}

fn countdown_color(remaining: u8) -> IndicatorColor {
    match remaining % 3 {
        2 => IndicatorColor::Green,
        1 => IndicatorColor::Blue,
        _ => IndicatorColor::Red,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gate_starts_active_and_releases_once() {
        let gate = WarmUpGate::new();
        assert!(gate.is_active());
        assert!(gate.release());
        assert!(!gate.is_active());
        assert!(!gate.release());
        assert!(!gate.is_active());
    }

    #[test]
    fn countdown_then_ready_then_done() {
        let gate = WarmUpGate::new();
        let mut seq = WarmUpSequence::new(5);

        let mut counted = [0u8; 5];
        for slot in counted.iter_mut() {
            match seq.step(&gate) {
                WarmUpStep::Countdown { remaining, tone, .. } => {
                    assert_eq!(tone, COUNTDOWN_TONE);
                    *slot = remaining;
                }
                other => panic!("unexpected step {:?}", other),
            }
            assert!(gate.is_active());
        }
        assert_eq!(counted, [5, 4, 3, 2, 1]);

        assert_eq!(
            seq.step(&gate),
            WarmUpStep::Ready {
                color: IndicatorColor::Red,
                tone: READY_TONE
            }
        );
        assert!(!gate.is_active());
        assert_eq!(seq.step(&gate), WarmUpStep::Done);
    }

    #[test]
    fn countdown_colors_cycle() {
        let gate = WarmUpGate::new();
        let mut seq = WarmUpSequence::new(3);
        let colors: [IndicatorColor; 3] = core::array::from_fn(|_| match seq.step(&gate) {
            WarmUpStep::Countdown { color, .. } => color,
            other => panic!("unexpected step {:?}", other),
        });
        assert_eq!(
            colors,
            [IndicatorColor::Red, IndicatorColor::Green, IndicatorColor::Blue]
        );
    }

    #[test]
    fn zero_steps_opens_immediately() {
        let gate = WarmUpGate::new();
        let mut seq = WarmUpSequence::new(0);
        assert!(matches!(seq.step(&gate), WarmUpStep::Ready { .. }));
        assert!(!gate.is_active());
    }
}
