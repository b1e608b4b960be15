//! End-to-end behavior scenarios
//!
//! The producers and the motor task are driven on the host by a simple
//! periodic schedule over a manual clock: motor every 50 ms, sonar every
//! 100 ms, light every 20 ms where needed.

use std::cell::Cell;
use std::sync::Arc;
use std::thread;

use embassy_sync::blocking_mutex::raw::{CriticalSectionRawMutex, NoopRawMutex};
use embassy_time::{Duration, Instant};
use sumo_robot::system::clock::Clock;
use sumo_robot::system::config::BehaviorConfig;
use sumo_robot::system::drive_command::{DriveCommand, DriveCommandStore, Outcome, Priority};
use sumo_robot::system::motor::{MotorActuator, Wheel};
use sumo_robot::system::readings::SensorReadings;
use sumo_robot::system::warm_up::{WarmUpGate, WarmUpSequence, WarmUpStep};
use sumo_robot::task::edge_avoidance::{EdgeAvoidance, EdgeReaction};
use sumo_robot::task::motor_control::MotorControl;
use sumo_robot::task::proximity_follow::{ProximityFollow, RangeDecision, SonarReaction};
use sumo_robot::task::seek::SeekAction;

type Store = DriveCommandStore<NoopRawMutex>;

const CONFIG: BehaviorConfig = BehaviorConfig::DEFAULT;

#[derive(Default)]
struct RecordingMotors {
    calls: Vec<(Wheel, i8)>,
}

impl MotorActuator for RecordingMotors {
    fn set(&mut self, wheel: Wheel, speed: i8) {
        self.calls.push((wheel, speed));
    }
}

/// Clock that only moves when advanced
struct ManualClock {
    now_ms: Cell<u64>,
}

impl ManualClock {
    fn new(start_ms: u64) -> Self {
        Self {
            now_ms: Cell::new(start_ms),
        }
    }

    fn advance(&self, by: Duration) {
        self.now_ms.set(self.now_ms.get() + by.as_millis());
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        Instant::from_millis(self.now_ms.get())
    }
}

fn open_gate() -> WarmUpGate {
    let gate = WarmUpGate::new();
    gate.release();
    gate
}

#[test]
fn saturated_readings_after_close_target_keep_following() {
    let store = Store::new();
    let gate = open_gate();
    let readings = SensorReadings::new();
    let mut follow = ProximityFollow::new(&store, &gate, &readings, CONFIG, 3);

    follow.on_range(10, Instant::from_millis(0)).unwrap();

    for t in [100, 200] {
        let reaction = follow.on_range(255, Instant::from_millis(t)).unwrap();
        let SonarReaction::Evaluated { artifact, decision } = reaction else {
            panic!("unexpected suppression");
        };
        assert_eq!(artifact, Some(Outcome::Installed));
        // seek is evaluated too, but cannot take over from FOLLOW
        assert!(matches!(
            decision,
            RangeDecision::Seek(SeekAction::Started {
                outcome: Outcome::Dropped,
                ..
            })
        ));
        assert_eq!(
            store.snapshot().unwrap(),
            DriveCommand::new(Priority::Follow, 100, 100, 150)
        );
        assert_eq!(follow.last_range(), 10);
    }
}

#[test]
fn edge_takes_over_from_follow_and_expires() {
    let store = Store::new();
    let gate = open_gate();
    let readings = SensorReadings::new();
    let edge = EdgeAvoidance::new(&store, &gate, &readings, CONFIG);
    let mut motors = MotorControl::new(&store, &gate, RecordingMotors::default(), CONFIG.motor_period);

    store.propose(Priority::Follow, 100, 100, 150).unwrap();
    assert_eq!(edge.on_light(400), Ok(EdgeReaction::OnRing));
    assert_eq!(store.snapshot().unwrap().priority, Priority::Follow);

    assert_eq!(
        edge.on_light(250),
        Ok(EdgeReaction::BackingOff(Outcome::Installed))
    );
    assert_eq!(
        store.snapshot().unwrap(),
        DriveCommand::new(Priority::Edge, -100, -100, 1250)
    );

    // 1250 ms at 50 ms per tick: 25 ticks to zero, one more to idle
    for tick in 1..=25_u32 {
        let applied = motors.tick().unwrap().unwrap();
        assert_eq!(applied.priority, Priority::Edge);
        assert_eq!(applied.duration_ms, 1250 - tick * 50);
    }
    assert_eq!(motors.tick(), Ok(Some(DriveCommand::IDLE)));

    let calls = &motors.actuator().calls;
    assert_eq!(calls.len(), 52);
    assert!(calls[..50].iter().all(|&(_, speed)| speed == -100));
    assert_eq!(calls[50..], [(Wheel::Left, 0), (Wheel::Right, 0)]);
}

#[test]
fn equal_priority_goes_to_the_later_proposal() {
    let a = (Priority::Follow, 100, 100, 150);
    let b = (Priority::Follow, 60, 80, 150);

    for (first, second) in [(a, b), (b, a)] {
        let store = Store::new();
        store.propose(first.0, first.1, first.2, first.3).unwrap();
        assert_eq!(
            store.propose(second.0, second.1, second.2, second.3),
            Ok(Outcome::Installed)
        );
        assert_eq!(
            store.snapshot().unwrap(),
            DriveCommand::new(second.0, second.1, second.2, second.3)
        );
    }
}

#[test]
fn seek_timeline_without_target() {
    let store = Store::new();
    let gate = open_gate();
    let readings = SensorReadings::new();
    let clock = ManualClock::new(0);
    let mut follow = ProximityFollow::new(&store, &gate, &readings, CONFIG, 11);
    let mut motors = MotorControl::new(&store, &gate, RecordingMotors::default(), CONFIG.motor_period);

    let mut after_sonar: Vec<(u64, DriveCommand, Option<Instant>)> = Vec::new();
    while clock.now().as_millis() <= 6_200 {
        let now = clock.now();
        motors.tick().unwrap();
        if now.as_millis() % 100 == 0 {
            follow.on_range(200, now).unwrap();
            after_sonar.push((
                now.as_millis(),
                store.snapshot().unwrap(),
                store.seek_started().unwrap(),
            ));
        }
        clock.advance(Duration::from_millis(50));
    }

    let at = |t: u64| {
        after_sonar
            .iter()
            .find(|(ms, _, _)| *ms == t)
            .copied()
            .unwrap()
    };

    let (_, start, episode) = at(0);
    assert_eq!(episode, Some(Instant::from_millis(0)));
    assert_eq!(start.priority, Priority::Seek);
    assert_eq!(start.speed_left, -start.speed_right);
    let (l, r) = (start.speed_left, start.speed_right);

    // rotation held until the first window
    for t in (100..=1_000).step_by(100) {
        let (_, cmd, _) = at(t);
        assert_eq!((cmd.speed_left, cmd.speed_right), (l, r), "at {} ms", t);
    }

    // reversed exactly once inside (T1, T1 + P]
    let (_, first, _) = at(1_100);
    assert_eq!((first.speed_left, first.speed_right), (-l, -r));
    assert_eq!(first.duration_ms, 3_000);
    for t in (1_200..=2_000).step_by(100) {
        let (_, cmd, _) = at(t);
        assert_eq!((cmd.speed_left, cmd.speed_right), (-l, -r), "at {} ms", t);
    }

    // reversed again inside (T2, T2 + P]
    for t in (2_100..=4_000).step_by(100) {
        let (_, cmd, _) = at(t);
        assert_eq!((cmd.speed_left, cmd.speed_right), (l, r), "at {} ms", t);
    }

    // straight ahead through (T3, T4]
    for t in (4_100..=6_000).step_by(100) {
        let (_, cmd, episode) = at(t);
        assert_eq!(cmd.priority, Priority::Seek);
        assert_eq!((cmd.speed_left, cmd.speed_right), (100, 100), "at {} ms", t);
        assert_eq!(episode, Some(Instant::from_millis(0)));
    }

    // episode ends strictly after T4, the next activation starts a fresh one
    let (_, _, ended) = at(6_100);
    assert_eq!(ended, None);
    let (_, restart, episode) = at(6_200);
    assert_eq!(episode, Some(Instant::from_millis(6_200)));
    assert_eq!(restart.speed_left, -restart.speed_right);
    assert_eq!(restart.speed_left.unsigned_abs(), 70);
}

#[test]
fn warm_up_suppresses_everything() {
    let store = Store::new();
    let gate = WarmUpGate::new();
    let readings = SensorReadings::new();
    let edge = EdgeAvoidance::new(&store, &gate, &readings, CONFIG);
    let mut follow = ProximityFollow::new(&store, &gate, &readings, CONFIG, 5);
    let mut motors = MotorControl::new(&store, &gate, RecordingMotors::default(), CONFIG.motor_period);
    let mut sequence = WarmUpSequence::new(CONFIG.warm_up_steps);

    let mut t = 0;
    while let WarmUpStep::Countdown { .. } = sequence.step(&gate) {
        for _ in 0..10 {
            assert_eq!(edge.on_light(100), Ok(EdgeReaction::Suppressed));
            assert_eq!(
                follow.on_range(10, Instant::from_millis(t)),
                Ok(SonarReaction::Suppressed)
            );
            assert_eq!(motors.tick(), Ok(None));
            t += 100;
        }
    }

    assert!(motors.actuator().calls.is_empty());
    assert_eq!(store.snapshot(), Ok(DriveCommand::IDLE));
    assert_eq!(store.seek_started(), Ok(None));
    assert_eq!(t, 5_000);

    // the final step opened the gate
    assert!(!gate.is_active());
    assert_eq!(
        edge.on_light(100),
        Ok(EdgeReaction::BackingOff(Outcome::Installed))
    );
    assert_eq!(motors.tick().unwrap().unwrap().priority, Priority::Edge);
    assert_eq!(motors.actuator().calls.len(), 2);
}

#[test]
fn concurrent_proposals_settle_on_highest_priority() {
    let store: Arc<DriveCommandStore<CriticalSectionRawMutex>> = Arc::new(DriveCommandStore::new());
    let priorities = [Priority::Seek, Priority::Follow, Priority::Edge, Priority::Follow];

    thread::scope(|scope| {
        for (i, priority) in priorities.into_iter().enumerate() {
            let store = Arc::clone(&store);
            scope.spawn(move || {
                for n in 0..500_u32 {
                    let speed = (i as i8) * 10;
                    store.propose(priority, speed, -speed, 1_000 + n).unwrap();
                    let held = store.snapshot().unwrap();
                    assert!(held.priority >= priority);
                }
            });
        }
    });

    let held = store.snapshot().unwrap();
    assert_eq!(held.priority, Priority::Edge);
    assert_eq!((held.speed_left, held.speed_right), (20, -20));
    assert_eq!(held.duration_ms, 1_499);
}
