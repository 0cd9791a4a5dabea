use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel as xch;
use garage_core::runner::{self, RunnerCfg, RunnerEvent};
use garage_core::{DoorProgress, GarageEstimator};
use garage_store::{DoorSeed, InMemoryStore};
use garage_traits::{DoorId, Field, ManualClock};

fn setup() -> (
    ManualClock,
    InMemoryStore,
    GarageEstimator<InMemoryStore>,
    xch::Sender<RunnerEvent>,
    xch::Receiver<RunnerEvent>,
) {
    let clock = ManualClock::new();
    let store = InMemoryStore::new(Arc::new(clock.clone()));
    store.add_door(
        "main",
        DoorSeed {
            time_to_open_ms: 10_000,
            time_to_close_ms: 8_000,
            percent_closed: 0,
        },
    );
    let (tx, rx) = runner::channel();
    let est = GarageEstimator::new(
        store.clone(),
        Arc::new(clock.clone()),
        runner::notification_sink(tx.clone()),
    );
    (clock, store, est, tx, rx)
}

#[test]
fn runner_drives_a_door_to_arrival_and_stops_on_shutdown() {
    let (clock, store, mut est, tx, rx) = setup();
    let (arrived_tx, arrived_rx) = xch::unbounded();

    let handle = std::thread::spawn(move || {
        runner::run(
            &mut est,
            &rx,
            RunnerCfg {
                tick_period: Duration::from_millis(2),
            },
            |report| {
                for door in report.arrived() {
                    let _ = arrived_tx.send(door.clone());
                }
            },
        )
    });

    tx.send(RunnerEvent::BecameLeader).unwrap();
    // Wait until the subscriptions exist before pressing.
    for _ in 0..500 {
        if store.subscription_count() > 0 {
            break;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    let door = DoorId::from("main");
    store.press(&door, Field::CloseTrigger).unwrap();
    // Wait for the runner to create the context before time jumps.
    for _ in 0..500 {
        if store.snapshot(&door).unwrap().moving {
            break;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    clock.set_ms(8_000);

    let arrived = arrived_rx
        .recv_timeout(Duration::from_secs(5))
        .expect("door should arrive");
    assert_eq!(arrived, door);

    tx.send(RunnerEvent::Shutdown).unwrap();
    let stats = handle.join().unwrap();
    assert!(stats.ticks >= 1);
    assert!(stats.notifications >= 2);
    assert_eq!(stats.rejected, 0);

    let snap = store.snapshot(&door).unwrap();
    assert_eq!(snap.percent_closed, 100);
    assert!(!snap.moving);
}

#[test]
fn dispatch_handles_leadership_events() {
    let (_clock, store, mut est, _tx, rx) = setup();
    let mut stats = runner::RunStats::default();

    assert!(runner::dispatch(&mut est, RunnerEvent::BecameLeader, &mut stats));
    assert!(est.is_leader());
    assert_eq!(store.subscription_count(), 5);
    // Replay of Moving=false for the one door.
    assert!(runner::drain(&mut est, &rx, &mut stats));
    assert_eq!(stats.notifications, 1);

    assert!(runner::dispatch(&mut est, RunnerEvent::LostLeadership, &mut stats));
    assert!(!est.is_leader());
    assert_eq!(store.subscription_count(), 0);

    assert!(!runner::dispatch(&mut est, RunnerEvent::Shutdown, &mut stats));
}

#[test]
fn tick_report_lists_doors_in_transit() {
    let (clock, store, mut est, _tx, rx) = setup();
    let mut stats = runner::RunStats::default();
    est.on_became_leader().unwrap();
    runner::drain(&mut est, &rx, &mut stats);

    store
        .press(&DoorId::from("main"), Field::CloseTrigger)
        .unwrap();
    runner::drain(&mut est, &rx, &mut stats);
    clock.set_ms(2_000);
    let report = runner::tick_once(&mut est, &mut stats);
    assert!(matches!(
        report.progress.as_slice(),
        [(_, DoorProgress::Moving(p))] if p.get() == 25
    ));
    assert_eq!(stats.ticks, 1);
}
