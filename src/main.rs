//! Robot firmware entry point
//!
//! Initializes the system and spawns the periodic tasks on three priority
//! levels:
//! - High (`SWI_IRQ_1`): motor control, edge avoidance
//! - Medium (`SWI_IRQ_0`): proximity follow and seek
//! - Thread mode: warm-up, telemetry

#![no_std]
#![no_main]

use embassy_executor::{InterruptExecutor, Spawner};
use embassy_rp::block::ImageDef;
use embassy_rp::config::Config;
use embassy_rp::interrupt;
use embassy_rp::interrupt::{InterruptExt, Priority};
use sumo_robot::system::config::BehaviorConfig;
use sumo_robot::system::drive_command::SharedDriveCommandStore;
use sumo_robot::system::readings::SensorReadings;
use sumo_robot::system::resources::{
    AssignedResources, DistanceSensorResources, LightSensorResources, MotorDriverResources,
    WarmUpResources,
};
use sumo_robot::system::warm_up::WarmUpGate;
use sumo_robot::task::{
    edge_avoidance::edge_avoidance, motor_control::motor_control,
    proximity_follow::proximity_follow, telemetry::telemetry, warm_up::warm_up,
};
use {defmt_rtt as _, panic_probe as _};

/// Firmware image type for bootloader
#[link_section = ".start_block"]
#[used]
pub static IMAGE_DEF: ImageDef = ImageDef::secure_exe();

/// Behavior tuning
const CONFIG: BehaviorConfig = BehaviorConfig::DEFAULT;

/// The one shared drive command
static DRIVE_COMMAND: SharedDriveCommandStore = SharedDriveCommandStore::new();

/// Closed until the warm-up countdown has run
static WARM_UP: WarmUpGate = WarmUpGate::new();

/// Latest sensor values for telemetry
static READINGS: SensorReadings = SensorReadings::new();

static EXECUTOR_HIGH: InterruptExecutor = InterruptExecutor::new();
static EXECUTOR_MEDIUM: InterruptExecutor = InterruptExecutor::new();

#[interrupt]
unsafe fn SWI_IRQ_1() {
    EXECUTOR_HIGH.on_interrupt()
}

#[interrupt]
unsafe fn SWI_IRQ_0() {
    EXECUTOR_MEDIUM.on_interrupt()
}

/// Firmware entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    let p = embassy_rp::init(Config::default());

    if let Err(e) = CONFIG.validate() {
        panic!("invalid behavior configuration: {}", e);
    }

    // Split the resources into separate groups for each task
    let r = sumo_robot::split_resources!(p);

    // High priority: motors and edge avoidance
    interrupt::SWI_IRQ_1.set_priority(Priority::P2);
    let high = EXECUTOR_HIGH.start(interrupt::SWI_IRQ_1);
    high.spawn(motor_control(r.motor_driver, &DRIVE_COMMAND, &WARM_UP, CONFIG))
        .unwrap();
    high.spawn(edge_avoidance(
        r.light_sensor,
        &DRIVE_COMMAND,
        &WARM_UP,
        &READINGS,
        CONFIG,
    ))
    .unwrap();

    // Medium priority: proximity and seek
    interrupt::SWI_IRQ_0.set_priority(Priority::P3);
    let medium = EXECUTOR_MEDIUM.start(interrupt::SWI_IRQ_0);
    medium
        .spawn(proximity_follow(
            r.distance_sensor,
            &DRIVE_COMMAND,
            &WARM_UP,
            &READINGS,
            CONFIG,
        ))
        .unwrap();

    // Thread mode: everything that may wait
    spawner.spawn(warm_up(r.warm_up, &WARM_UP, CONFIG)).unwrap();
    spawner
        .spawn(telemetry(&DRIVE_COMMAND, &WARM_UP, &READINGS, CONFIG))
        .unwrap();
}
