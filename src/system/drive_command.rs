//! Drive Command Store
//!
//! The single shared record of what the motors should currently do, and the
//! arbitration rule deciding which behavior owns it.
//!
//! # Arbitration
//! A proposal is installed iff its priority is greater than or equal to the
//! priority of the command currently held. Equal priorities go to the newest
//! proposer. A lower priority proposal is dropped; that is the designed
//! outcome, not an error.
//!
//! Commands are self-expiring: the motor task counts `duration_ms` down every
//! activation and resets the store to idle once it has run out. That is the
//! only way the held priority ever decreases.
//!
//! # Locking
//! The state sits in an embassy blocking mutex. With `CriticalSectionRawMutex`
//! on a single core the lock masks interrupts, so no task of any executor
//! priority can preempt a holder. Every read that decides a write happens in
//! the same acquisition; use [`DriveCommandStore::transact`] for multi-step
//! decisions. Actuator and display I/O never happens while locked.
//!
//! # Usage
//! ```rust
//! use embassy_sync::blocking_mutex::raw::NoopRawMutex;
//! use sumo_robot::system::drive_command::{DriveCommandStore, Outcome, Priority};
//!
//! let store = DriveCommandStore::<NoopRawMutex>::new();
//! assert_eq!(store.propose(Priority::Follow, 100, 100, 150), Ok(Outcome::Installed));
//! assert_eq!(store.propose(Priority::Seek, 70, -70, 3000), Ok(Outcome::Dropped));
//! ```

use core::cell::RefCell;

use embassy_sync::blocking_mutex::{
    raw::{CriticalSectionRawMutex, RawMutex},
    Mutex,
};
use embassy_time::{Duration, Instant};

use crate::system::error::StoreError;

/// Rank of the behavior owning the drive command
///
/// Declaration order is the arbitration order: `Idle < Seek < Follow < Edge`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "rp2350", derive(defmt::Format))]
#[repr(u8)]
pub enum Priority {
    /// Nobody owns the motors
    Idle = 5,
    /// Searching for an opponent
    Seek = 20,
    /// Driving at an opponent in sight
    Follow = 30,
    /// Backing off the ring edge
    Edge = 50,
}

impl Priority {
    /// Short name for the status page
    pub const fn label(self) -> &'static str {
        match self {
            Priority::Idle => "IDLE",
            Priority::Seek => "SEEK",
            Priority::Follow => "FOLLOW",
            Priority::Edge => "EDGE",
        }
    }
}

/// Current motor intent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "rp2350", derive(defmt::Format))]
pub struct DriveCommand {
    /// Behavior owning this command
    pub priority: Priority,
    /// Left wheel speed, -100..=100
    pub speed_left: i8,
    /// Right wheel speed, -100..=100
    pub speed_right: i8,
    /// Remaining validity in milliseconds
    pub duration_ms: u32,
}

impl DriveCommand {
    /// Idle default: lowest priority, wheels stopped
    pub const IDLE: Self = Self {
        priority: Priority::Idle,
        speed_left: 0,
        speed_right: 0,
        duration_ms: 0,
    };

    /// Builds a command
    pub const fn new(priority: Priority, speed_left: i8, speed_right: i8, duration_ms: u32) -> Self {
        Self {
            priority,
            speed_left,
            speed_right,
            duration_ms,
        }
    }
}

impl Default for DriveCommand {
    fn default() -> Self {
        Self::IDLE
    }
}

/// Result of a proposal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "rp2350", derive(defmt::Format))]
pub enum Outcome {
    /// The proposal replaced the held command
    Installed,
    /// A higher priority command is held; nothing changed
    Dropped,
}

impl Outcome {
    /// True when the proposal took effect
    pub fn is_installed(self) -> bool {
        self == Outcome::Installed
    }
}

/// The state guarded by the store lock
///
/// Only reachable through [`DriveCommandStore::transact`], so every access is
/// part of one uninterrupted lock acquisition.
#[derive(Debug)]
pub struct ArbitrationState {
    command: DriveCommand,
    seek: Option<SeekEpisode>,
}

/// Bookkeeping of a running seek episode
#[derive(Debug, Clone, Copy)]
struct SeekEpisode {
    started: Instant,
    /// Reversal windows already served
    reversals: u8,
}

impl ArbitrationState {
    const fn new() -> Self {
        Self {
            command: DriveCommand::IDLE,
            seek: None,
        }
    }

    /// Command currently held
    pub fn command(&self) -> &DriveCommand {
        &self.command
    }

    /// Start of the running seek episode, if any
    pub fn seek_started(&self) -> Option<Instant> {
        self.seek.map(|episode| episode.started)
    }

    /// Number of reversal windows served in the running seek episode
    pub fn seek_reversals(&self) -> u8 {
        self.seek.map_or(0, |episode| episode.reversals)
    }

    /// Marks reversal window `window` as served
    ///
    /// No effect without a running episode.
    pub fn record_reversal(&mut self, window: u8) {
        if let Some(episode) = self.seek.as_mut() {
            episode.reversals = episode.reversals.max(window);
        }
    }

    /// Arbitrates a proposal against the held command
    ///
    /// Any proposal made while the store is not at SEEK, and any proposal of
    /// a priority other than SEEK, invalidates a running seek episode,
    /// whether or not the proposal wins.
    pub fn propose(&mut self, command: DriveCommand) -> Outcome {
        if self.command.priority != Priority::Seek || command.priority != Priority::Seek {
            self.seek = None;
        }

        if command.priority >= self.command.priority {
            self.command = command;
            Outcome::Installed
        } else {
            Outcome::Dropped
        }
    }

    /// Proposes a SEEK command and opens a new episode at `now` if it wins
    pub fn begin_seek(&mut self, now: Instant, speed_left: i8, speed_right: i8, duration_ms: u32) -> Outcome {
        let outcome = self.propose(DriveCommand::new(
            Priority::Seek,
            speed_left,
            speed_right,
            duration_ms,
        ));
        if outcome.is_installed() {
            self.seek = Some(SeekEpisode {
                started: now,
                reversals: 0,
            });
        }
        outcome
    }

    /// Ends the running seek episode
    pub fn end_seek(&mut self) {
        self.seek = None;
    }

    /// Ages the held command by one motor period
    ///
    /// A command with time left is shortened by `period`; a command without
    /// time left is replaced by the idle default. Returns the resulting
    /// command.
    pub fn decay(&mut self, period: Duration) -> DriveCommand {
        if self.command.duration_ms > 0 {
            let step = u32::try_from(period.as_millis()).unwrap_or(u32::MAX);
            self.command.duration_ms = self.command.duration_ms.saturating_sub(step);
        } else {
            self.command = DriveCommand::IDLE;
            self.seek = None;
        }
        self.command
    }
}

/// Lock-guarded drive command store
///
/// `M` selects the lock: `CriticalSectionRawMutex` on target and in
/// multi-threaded host tests, `NoopRawMutex` for single-threaded use.
pub struct DriveCommandStore<M: RawMutex> {
    inner: Mutex<M, RefCell<ArbitrationState>>,
}

impl<M: RawMutex> DriveCommandStore<M> {
    /// Creates a store holding the idle default
    ///
    /// This is a const fn, allowing static initialization.
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(RefCell::new(ArbitrationState::new())),
        }
    }

    /// Runs `f` on the arbitration state under one lock acquisition
    ///
    /// `f` must be a pure memory operation; no I/O while the lock is held.
    pub fn transact<R>(&self, f: impl FnOnce(&mut ArbitrationState) -> R) -> Result<R, StoreError> {
        self.inner.lock(|cell| {
            let mut state = cell.try_borrow_mut().map_err(|_| StoreError::Reentered)?;
            Ok(f(&mut state))
        })
    }

    /// Attempts to install a new command
    pub fn propose(
        &self,
        priority: Priority,
        speed_left: i8,
        speed_right: i8,
        duration_ms: u32,
    ) -> Result<Outcome, StoreError> {
        let command = DriveCommand::new(priority, speed_left, speed_right, duration_ms);
        let (before, outcome) = self.transact(|state| {
            let before = state.command.priority;
            (before, state.propose(command))
        })?;
        if outcome.is_installed() && before != priority {
            crate::log_debug!("drive command taken over: {:?} -> {:?}", before, priority);
        }
        Ok(outcome)
    }

    /// Ages the held command by one motor period and returns the result
    pub fn decay(&self, period: Duration) -> Result<DriveCommand, StoreError> {
        self.transact(|state| state.decay(period))
    }

    /// Copy of the held command
    pub fn snapshot(&self) -> Result<DriveCommand, StoreError> {
        self.transact(|state| state.command)
    }

    /// Start of the running seek episode, if any
    pub fn seek_started(&self) -> Result<Option<Instant>, StoreError> {
        self.transact(|state| state.seek_started())
    }
}

impl<M: RawMutex> Default for DriveCommandStore<M> {
    fn default() -> Self {
        Self::new()
    }
}

/// Store shared between tasks of every executor priority
pub type SharedDriveCommandStore = DriveCommandStore<CriticalSectionRawMutex>;
