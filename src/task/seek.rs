//! Seek Behavior
//!
//! Searches for an opponent while nothing is in sonar range. Invoked by the
//! proximity task on every activation without a target.
//!
//! # Pattern
//! Driven by the time elapsed since the episode started, not by counting
//! activations, so a late or missed activation does not shift the pattern:
//! ```text
//! start            rotate in place, random direction
//! (T1, T1 + P_s]   reverse rotation, once
//! (T2, T2 + P_s]   reverse rotation again, once
//! (T3, T4]         drive straight, re-proposed every activation
//! > T4             end episode; the next activation starts a fresh one
//! otherwise        hold: the long-lived seek command keeps running
//! ```
//! Seek commands last longer than the gap between reversals. The reversal
//! has to be re-proposed inside its window before the command would expire.

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_time::{Duration, Instant};
use nanorand::{Rng, WyRand};

use crate::system::config::BehaviorConfig;
use crate::system::drive_command::{
    ArbitrationState, DriveCommand, DriveCommandStore, Outcome, Priority,
};
use crate::system::error::StoreError;

/// Direction of an in-place rotation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "rp2350", derive(defmt::Format))]
pub enum Rotation {
    /// Left wheel backward, right wheel forward
    Left,
    /// Left wheel forward, right wheel backward
    Right,
}

impl Rotation {
    /// Wheel speeds (left, right) for rotating at `speed`
    pub fn wheel_speeds(self, speed: i8) -> (i8, i8) {
        match self {
            Rotation::Left => (speed.saturating_neg(), speed),
            Rotation::Right => (speed, speed.saturating_neg()),
        }
    }
}

/// Phase of a running episode at a given elapsed time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "rp2350", derive(defmt::Format))]
pub enum SeekPhase {
    /// Leave the current command running
    Hold,
    /// Inside reversal window 1 or 2
    Reverse(u8),
    /// Inside the straight advance window
    Advance,
    /// Past the last boundary
    Expired,
}

impl SeekPhase {
    /// Classifies `elapsed` against the configured boundaries
    pub fn at(elapsed: Duration, config: &BehaviorConfig) -> Self {
        let window = config.sonar_period;
        let in_window =
            |boundary: Duration| elapsed > boundary && elapsed <= boundary + window;

        if in_window(config.seek_first_reversal) {
            SeekPhase::Reverse(1)
        } else if in_window(config.seek_second_reversal) {
            SeekPhase::Reverse(2)
        } else if elapsed > config.seek_advance_start && elapsed <= config.seek_advance_end {
            SeekPhase::Advance
        } else if elapsed > config.seek_advance_end {
            SeekPhase::Expired
        } else {
            SeekPhase::Hold
        }
    }
}

/// What one seek evaluation did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "rp2350", derive(defmt::Format))]
pub enum SeekAction {
    /// No episode was running; tried to open one rotating this way
    Started { rotation: Rotation, outcome: Outcome },
    /// Reversed the rotation
    Reversed(Outcome),
    /// Proposed straight advance
    Advancing(Outcome),
    /// Left the running command alone
    Holding,
    /// Closed the episode
    Ended,
}

/// Timed seek state machine
///
/// The episode start lives in the drive command store next to the command it
/// belongs to, so a competing behavior taking over clears it in the same lock.
pub struct Seek {
    rng: WyRand,
}

impl Seek {
    /// Creates the state machine; `seed` picks the sequence of start directions
    pub fn new(seed: u64) -> Self {
        Self {
            rng: WyRand::new_seed(seed),
        }
    }

    /// Runs one activation against the store
    ///
    /// Reading the episode and proposing the next command is one lock
    /// acquisition.
    pub fn evaluate<M: RawMutex>(
        &mut self,
        store: &DriveCommandStore<M>,
        config: &BehaviorConfig,
        now: Instant,
    ) -> Result<SeekAction, StoreError> {
        let rng = &mut self.rng;
        let action = store.transact(|state| step(state, config, now, rng))?;

        match action {
            SeekAction::Started {
                rotation,
                outcome: Outcome::Installed,
            } => crate::log_info!("seek started, rotating {:?}", rotation),
            SeekAction::Reversed(Outcome::Installed) => crate::log_debug!("seek reversed"),
            SeekAction::Ended => crate::log_debug!("seek episode ended"),
            _ => {}
        }
        Ok(action)
    }
}

fn pick_rotation(rng: &mut WyRand) -> Rotation {
    if rng.generate_range(0_u8..=1) == 0 {
        Rotation::Left
    } else {
        Rotation::Right
    }
}

fn step(
    state: &mut ArbitrationState,
    config: &BehaviorConfig,
    now: Instant,
    rng: &mut WyRand,
) -> SeekAction {
    let Some(started) = state.seek_started() else {
        let rotation = pick_rotation(rng);
        let (left, right) = rotation.wheel_speeds(config.seek_turn_speed);
        let outcome = state.begin_seek(now, left, right, config.seek_command_duration_ms);
        return SeekAction::Started { rotation, outcome };
    };

    let elapsed = now.saturating_duration_since(started);
    match SeekPhase::at(elapsed, config) {
        // each window reverses once, however many activations land in it
        SeekPhase::Reverse(window) if state.seek_reversals() < window => {
            let held = *state.command();
            let outcome = state.propose(DriveCommand::new(
                Priority::Seek,
                held.speed_left.saturating_neg(),
                held.speed_right.saturating_neg(),
                config.seek_command_duration_ms,
            ));
            state.record_reversal(window);
            SeekAction::Reversed(outcome)
        }
        SeekPhase::Advance => SeekAction::Advancing(state.propose(DriveCommand::new(
            Priority::Seek,
            config.seek_advance_speed,
            config.seek_advance_speed,
            config.seek_command_duration_ms,
        ))),
        SeekPhase::Expired => {
            state.end_seek();
            SeekAction::Ended
        }
        SeekPhase::Reverse(_) | SeekPhase::Hold => SeekAction::Holding,
    }
}
