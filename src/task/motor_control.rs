//! Motor Control Task
//!
//! Consumes the drive command store every motor period: ages the held
//! command, then applies the resulting wheel speeds to the motor driver.
//!
//! # Operation
//! 1. Suppressed entirely while warm-up is active (no decay, no actuator call)
//! 2. Decay under one lock acquisition, keeping a copy of the result
//! 3. Lock released, then both wheels set from the copy
//!
//! The speeds are re-applied every period whether they changed or not. This
//! is the only place where an expired command returns the store to idle.

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_time::Duration;

use crate::system::drive_command::{DriveCommand, DriveCommandStore, Priority};
use crate::system::error::StoreError;
use crate::system::motor::{MotorActuator, Wheel};
use crate::system::warm_up::WarmUpGate;

/// Motor task logic over any actuator
pub struct MotorControl<'a, M: RawMutex, A: MotorActuator> {
    store: &'a DriveCommandStore<M>,
    gate: &'a WarmUpGate,
    actuator: A,
    period: Duration,
    last_priority: Priority,
}

impl<'a, M: RawMutex, A: MotorActuator> MotorControl<'a, M, A> {
    pub fn new(
        store: &'a DriveCommandStore<M>,
        gate: &'a WarmUpGate,
        actuator: A,
        period: Duration,
    ) -> Self {
        Self {
            store,
            gate,
            actuator,
            period,
            last_priority: Priority::Idle,
        }
    }

    /// Runs one motor period
    ///
    /// Returns the applied command, or `None` while warm-up suppresses the
    /// task.
    pub fn tick(&mut self) -> Result<Option<DriveCommand>, StoreError> {
        if self.gate.is_active() {
            return Ok(None);
        }

        let command = self.store.decay(self.period)?;

        if command.priority != self.last_priority {
            crate::log_debug!(
                "motors now driven by {:?} ({} / {})",
                command.priority,
                command.speed_left,
                command.speed_right
            );
            self.last_priority = command.priority;
        }

        self.actuator.set(Wheel::Left, command.speed_left);
        self.actuator.set(Wheel::Right, command.speed_right);
        Ok(Some(command))
    }

    /// The driven actuator
    pub fn actuator(&self) -> &A {
        &self.actuator
    }
}

#[cfg(feature = "rp2350")]
mod firmware {
    use embassy_rp::gpio::{Level, Output};
    use embassy_rp::pwm::{self, Pwm};
    use embassy_time::Ticker;
    use tb6612fng::{DriveCommand as WheelCommand, Motor};

    use super::MotorControl;
    use crate::system::config::BehaviorConfig;
    use crate::system::drive_command::SharedDriveCommandStore;
    use crate::system::motor::{MotorActuator, Wheel};
    use crate::system::resources::MotorDriverResources;
    use crate::system::warm_up::WarmUpGate;

    /// Left and right motors are mounted mirrored on this chassis
    const MOTORS_MOUNTED_REVERSED: bool = false;

    /// PWM frequency for the drive motors
    const MOTOR_PWM_FREQ_HZ: u32 = 10_000;

    type DriverMotor = Motor<Output<'static>, Output<'static>, Pwm<'static>>;

    /// TB6612FNG backed actuator
    pub struct Tb6612Motors {
        left: DriverMotor,
        right: DriverMotor,
        // Held high for as long as the actuator lives
        _standby: Output<'static>,
    }

    impl Tb6612Motors {
        /// Claims the driver pins and takes the driver out of standby
        pub fn new(r: MotorDriverResources) -> Self {
            let clock_freq_hz = embassy_rp::clocks::clk_sys_freq();

            // Minimum divider that keeps the period within 16 bits
            let divider = ((clock_freq_hz / MOTOR_PWM_FREQ_HZ) / 65535 + 1) as u8;
            let period = (clock_freq_hz / (MOTOR_PWM_FREQ_HZ * divider as u32)) as u16 - 1;

            let mut pwm_config = pwm::Config::default();
            pwm_config.divider = divider.into();
            pwm_config.top = period;

            // motor A is the left motor
            let left_fwd = Output::new(r.left_forward_pin, Level::Low);
            let left_bckw = Output::new(r.left_backward_pin, Level::Low);
            let left_pwm = Pwm::new_output_a(r.left_slice, r.left_pwm_pin, pwm_config.clone());
            let left = unwrap_driver(Motor::new(left_fwd, left_bckw, left_pwm));

            // motor B is the right motor
            let right_fwd = Output::new(r.right_forward_pin, Level::Low);
            let right_bckw = Output::new(r.right_backward_pin, Level::Low);
            let right_pwm = Pwm::new_output_b(r.right_slice, r.right_pwm_pin, pwm_config);
            let right = unwrap_driver(Motor::new(right_fwd, right_bckw, right_pwm));

            // Both motors are stopped, safe to leave standby
            let standby = Output::new(r.standby_pin, Level::High);

            Self {
                left,
                right,
                _standby: standby,
            }
        }
    }

    fn unwrap_driver<T, E>(result: Result<T, E>) -> T {
        match result {
            Ok(value) => value,
            Err(_) => panic!("motor driver setup failed"),
        }
    }

    fn wheel_command(speed: i8) -> WheelCommand {
        let magnitude = speed.unsigned_abs().min(100);
        match speed {
            s if s > 0 => WheelCommand::Forward(magnitude),
            s if s < 0 => WheelCommand::Backward(magnitude),
            _ => WheelCommand::Stop,
        }
    }

    impl MotorActuator for Tb6612Motors {
        fn set(&mut self, wheel: Wheel, speed: i8) {
            let wheel = match (wheel, MOTORS_MOUNTED_REVERSED) {
                (w, false) => w,
                (Wheel::Left, true) => Wheel::Right,
                (Wheel::Right, true) => Wheel::Left,
            };
            // Driver errors are not observable here; the next period retries
            let _ = match wheel {
                Wheel::Left => self.left.drive(wheel_command(speed)),
                Wheel::Right => self.right.drive(wheel_command(speed)),
            };
        }
    }

    /// Motor task: decay and apply every motor period
    #[embassy_executor::task]
    pub async fn motor_control(
        r: MotorDriverResources,
        store: &'static SharedDriveCommandStore,
        gate: &'static WarmUpGate,
        config: BehaviorConfig,
    ) {
        let motors = Tb6612Motors::new(r);
        let mut control = MotorControl::new(store, gate, motors, config.motor_period);

        crate::log_info!("motor task started");
        let mut ticker = Ticker::every(config.motor_period);
        loop {
            ticker.next().await;
            if let Err(e) = control.tick() {
                panic!("motor task: {}", e);
            }
        }
    }
}

#[cfg(feature = "rp2350")]
pub use firmware::motor_control;

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_sync::blocking_mutex::raw::NoopRawMutex;

    type Store = DriveCommandStore<NoopRawMutex>;

    const PERIOD: Duration = Duration::from_millis(50);

    #[derive(Default)]
    struct RecordingMotors {
        calls: Vec<(Wheel, i8)>,
    }

    impl MotorActuator for RecordingMotors {
        fn set(&mut self, wheel: Wheel, speed: i8) {
            self.calls.push((wheel, speed));
        }
    }

    fn open_gate() -> WarmUpGate {
        let gate = WarmUpGate::new();
        gate.release();
        gate
    }

    #[test]
    fn warm_up_suppresses_decay_and_actuation() {
        let store = Store::new();
        let gate = WarmUpGate::new();
        store.propose(Priority::Follow, 100, 100, 150).unwrap();
        let mut control = MotorControl::new(&store, &gate, RecordingMotors::default(), PERIOD);

        assert_eq!(control.tick(), Ok(None));
        assert!(control.actuator().calls.is_empty());
        assert_eq!(store.snapshot().unwrap().duration_ms, 150);
    }

    #[test]
    fn applies_speeds_every_period() {
        let store = Store::new();
        let gate = open_gate();
        store.propose(Priority::Follow, 40, 60, 150).unwrap();
        let mut control = MotorControl::new(&store, &gate, RecordingMotors::default(), PERIOD);

        control.tick().unwrap();
        control.tick().unwrap();
        assert_eq!(
            control.actuator().calls,
            [
                (Wheel::Left, 40),
                (Wheel::Right, 60),
                (Wheel::Left, 40),
                (Wheel::Right, 60)
            ]
        );
    }

    #[test]
    fn idle_store_stops_the_wheels() {
        let store = Store::new();
        let gate = open_gate();
        let mut control = MotorControl::new(&store, &gate, RecordingMotors::default(), PERIOD);

        assert_eq!(control.tick(), Ok(Some(DriveCommand::IDLE)));
        assert_eq!(control.actuator().calls, [(Wheel::Left, 0), (Wheel::Right, 0)]);
    }

    #[test]
    fn expired_command_reverts_to_idle() {
        let store = Store::new();
        let gate = open_gate();
        store.propose(Priority::Follow, 100, 100, 150).unwrap();
        let mut control = MotorControl::new(&store, &gate, RecordingMotors::default(), PERIOD);

        let applied: Vec<_> = (0..4).map(|_| control.tick().unwrap().unwrap()).collect();
        assert_eq!(applied[0].duration_ms, 100);
        assert_eq!(applied[2], DriveCommand::new(Priority::Follow, 100, 100, 0));
        assert_eq!(applied[3], DriveCommand::IDLE);
        assert_eq!(
            control.actuator().calls[6..],
            [(Wheel::Left, 0), (Wheel::Right, 0)]
        );
    }
}
