//! Behavior Configuration
//!
//! All tunables of the sumo controller in one place. The values are fixed at
//! build time; nothing is persisted and nothing changes at runtime.
//!
//! # Timing
//! The seek phase boundaries and the command durations are tuned against the
//! sonar period. Each seek reversal window is exactly one sonar period wide,
//! so the sonar task must not run slower than `sonar_period`.
//!
//! # Sensor scales
//! - Range: centimeters, saturating at `range_sentinel`
//! - Light: raw reflectance reading, higher is brighter

use core::fmt;
use embassy_time::Duration;

/// Tunable parameters for every behavior and task period
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BehaviorConfig {
    /// Motor decay/apply period
    pub motor_period: Duration,
    /// Proximity (sonar) sampling period, also the seek acceptance window width
    pub sonar_period: Duration,
    /// Edge (light) sampling period
    pub light_period: Duration,
    /// Status page refresh period
    pub telemetry_period: Duration,
    /// Warm-up countdown step
    pub warm_up_step: Duration,
    /// Number of warm-up countdown steps
    pub warm_up_steps: u8,

    /// Range above which no target is considered in sight
    pub seek_distance_threshold: u16,
    /// A saturated reading after a reading below this means "too close to measure"
    pub close_range_threshold: u16,
    /// Sensor output for both "nothing detected" and "closer than minimum range"
    pub range_sentinel: u16,
    /// Light readings below this are the ring edge
    pub edge_light_threshold: u16,

    /// Wheel speed while following a target
    pub follow_speed: i8,
    /// Follow command lifetime, re-issued every sonar period while in sight
    pub follow_duration_ms: u32,
    /// Wheel speed (magnitude) while backing off an edge
    pub edge_reverse_speed: i8,
    /// Edge back-off command lifetime
    pub edge_duration_ms: u32,
    /// Wheel speed (magnitude) while rotating in place during seek
    pub seek_turn_speed: i8,
    /// Wheel speed while advancing during seek
    pub seek_advance_speed: i8,
    /// Lifetime of every seek command; outlives the reversal boundaries
    pub seek_command_duration_ms: u32,

    /// Elapsed seek time of the first direction reversal (T1)
    pub seek_first_reversal: Duration,
    /// Elapsed seek time of the second direction reversal (T2)
    pub seek_second_reversal: Duration,
    /// Elapsed seek time at which straight advance starts (T3)
    pub seek_advance_start: Duration,
    /// Elapsed seek time at which the episode ends (T4)
    pub seek_advance_end: Duration,
}

impl BehaviorConfig {
    /// Reference configuration
    pub const DEFAULT: Self = Self {
        motor_period: Duration::from_millis(50),
        sonar_period: Duration::from_millis(100),
        light_period: Duration::from_millis(20),
        telemetry_period: Duration::from_millis(500),
        warm_up_step: Duration::from_secs(1),
        warm_up_steps: 5,

        seek_distance_threshold: 70,
        close_range_threshold: 20,
        range_sentinel: 255,
        edge_light_threshold: 300,

        follow_speed: 100,
        follow_duration_ms: 150,
        edge_reverse_speed: 100,
        edge_duration_ms: 1250,
        seek_turn_speed: 70,
        seek_advance_speed: 100,
        seek_command_duration_ms: 3000,

        seek_first_reversal: Duration::from_millis(1000),
        seek_second_reversal: Duration::from_millis(2000),
        seek_advance_start: Duration::from_millis(4000),
        seek_advance_end: Duration::from_millis(6000),
    };

    /// Checks the ordering and timing relations the behaviors rely on
    pub fn validate(&self) -> Result<(), ConfigError> {
        let periods = [
            self.motor_period,
            self.sonar_period,
            self.light_period,
            self.telemetry_period,
            self.warm_up_step,
        ];
        if periods.iter().any(|p| p.as_ticks() == 0) {
            return Err(ConfigError::ZeroPeriod);
        }

        if self.follow_duration_ms == 0
            || self.edge_duration_ms == 0
            || self.seek_command_duration_ms == 0
        {
            return Err(ConfigError::ZeroDuration);
        }

        if !(self.seek_first_reversal < self.seek_second_reversal
            && self.seek_second_reversal < self.seek_advance_start
            && self.seek_advance_start < self.seek_advance_end)
        {
            return Err(ConfigError::SeekPhasesOutOfOrder);
        }

        // Each reversal fires once inside (Tk, Tk + P_s]; that window must
        // close before the next phase begins.
        if self.seek_first_reversal + self.sonar_period > self.seek_second_reversal
            || self.seek_second_reversal + self.sonar_period > self.seek_advance_start
        {
            return Err(ConfigError::ReversalWindowOverlap);
        }

        if self.close_range_threshold > self.seek_distance_threshold
            || self.seek_distance_threshold >= self.range_sentinel
        {
            return Err(ConfigError::RangeThresholdsOutOfOrder);
        }

        Ok(())
    }
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Rejected configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "rp2350", derive(defmt::Format))]
pub enum ConfigError {
    /// A task period is zero
    ZeroPeriod,
    /// A command duration is zero
    ZeroDuration,
    /// Seek boundaries are not strictly increasing
    SeekPhasesOutOfOrder,
    /// A reversal acceptance window reaches into the next phase
    ReversalWindowOverlap,
    /// Close range, seek distance and sentinel are not ordered
    RangeThresholdsOutOfOrder,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            ConfigError::ZeroPeriod => "task period must be non-zero",
            ConfigError::ZeroDuration => "command duration must be non-zero",
            ConfigError::SeekPhasesOutOfOrder => "seek phase boundaries must increase",
            ConfigError::ReversalWindowOverlap => "seek reversal window overlaps next phase",
            ConfigError::RangeThresholdsOutOfOrder => "range thresholds out of order",
        };
        f.write_str(msg)
    }
}
