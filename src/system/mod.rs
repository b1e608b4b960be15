//! Core system components shared by the behavior tasks
pub mod clock;
pub mod config;
pub mod drive_command;
pub mod error;
pub mod indicator;
pub mod motor;
pub mod readings;
#[cfg(feature = "rp2350")]
pub mod resources;
pub mod telemetry;
pub mod warm_up;
