#![cfg_attr(not(test), no_std)]

//! sumo-robot - reactive sumo controller for a two-wheeled robot
//!
//! Edge avoidance, proximity following and a timed seek pattern each run as
//! their own periodic task and propose drive commands. A single lock-guarded
//! store arbitrates between them by priority; the motor task ages the winning
//! command out and applies it to the wheels.
//!
//! Everything in here builds for the host so the behaviors can be tested
//! without hardware. The `rp2350` feature adds the embassy tasks and the
//! firmware binary.

/// Logging macros shared by all modules
#[macro_use]
pub mod logging;

/// Shared state, configuration and collaborator interfaces
pub mod system;

/// Behavior producers and the periodic tasks driving them
pub mod task;
