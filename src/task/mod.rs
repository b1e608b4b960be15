//! Periodic tasks
//!
//! Each module holds the host-testable logic of one periodic unit and, with
//! the `rp2350` feature, the embassy task that drives it on the robot.

pub mod edge_avoidance;
pub mod motor_control;
pub mod proximity_follow;
pub mod seek;
pub mod telemetry;
pub mod warm_up;
