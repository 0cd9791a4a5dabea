#![allow(dead_code)]

use std::sync::Arc;

use crossbeam_channel::Receiver;
use garage_core::runner::{self, RunStats, RunnerEvent};
use garage_core::{GarageEstimator, TickReport};
use garage_store::{DoorSeed, InMemoryStore};
use garage_traits::{DoorId, EntityStore, Field, ManualClock, Value};

/// One door, one estimator, one virtual clock; every step drains the
/// notification queue so the estimator sees its own writes.
pub struct Harness {
    pub clock: ManualClock,
    pub store: InMemoryStore,
    pub est: GarageEstimator<InMemoryStore>,
    pub rx: Receiver<RunnerEvent>,
    pub stats: RunStats,
    pub door: DoorId,
}

impl Harness {
    pub fn new(open_ms: i64, close_ms: i64, percent_closed: i64) -> Self {
        Self::with_doors(&[("main", open_ms, close_ms, percent_closed)])
    }

    /// Several doors `(id, open_ms, close_ms, percent_closed)`; the first one
    /// is the harness's default `door`.
    pub fn with_doors(doors: &[(&str, i64, i64, i64)]) -> Self {
        let clock = ManualClock::new();
        let store = InMemoryStore::new(Arc::new(clock.clone()));
        for &(id, time_to_open_ms, time_to_close_ms, percent_closed) in doors {
            store.add_door(
                id,
                DoorSeed {
                    time_to_open_ms,
                    time_to_close_ms,
                    percent_closed,
                },
            );
        }
        let (tx, rx) = runner::channel();
        let est = GarageEstimator::new(
            store.clone(),
            Arc::new(clock.clone()),
            runner::notification_sink(tx),
        );
        let mut h = Self {
            clock,
            store,
            est,
            rx,
            stats: RunStats::default(),
            door: DoorId::from(doors[0].0),
        };
        h.est.on_became_leader().unwrap();
        h.drain();
        h
    }

    pub fn drain(&mut self) {
        assert!(runner::drain(&mut self.est, &self.rx, &mut self.stats));
    }

    /// Move the clock to `ms`, then run one tick.
    pub fn tick_at(&mut self, ms: u64) -> TickReport {
        self.clock.set_ms(ms);
        self.drain();
        let report = runner::tick_once(&mut self.est, &mut self.stats);
        self.drain();
        report
    }

    pub fn press_at(&mut self, ms: u64, trigger: Field) {
        self.clock.set_ms(ms);
        self.store.press(&self.door, trigger).unwrap();
        self.drain();
    }

    pub fn press_door_at(&mut self, door: &str, ms: u64, trigger: Field) {
        self.clock.set_ms(ms);
        self.store.press(&DoorId::from(door), trigger).unwrap();
        self.drain();
    }

    pub fn percent_of(&self, door: &str) -> i64 {
        self.store.snapshot(&DoorId::from(door)).unwrap().percent_closed
    }

    pub fn moving_of(&self, door: &str) -> bool {
        self.store.snapshot(&DoorId::from(door)).unwrap().moving
    }

    pub fn sensor_at(&mut self, ms: u64, closed: bool) {
        self.clock.set_ms(ms);
        self.store
            .write(&self.door, Field::IsClosed, Value::Bool(closed))
            .unwrap();
        self.drain();
    }

    pub fn percent(&self) -> i64 {
        self.store.snapshot(&self.door).unwrap().percent_closed
    }

    pub fn moving(&self) -> bool {
        self.store.snapshot(&self.door).unwrap().moving
    }

    pub fn closing(&self) -> bool {
        self.store.snapshot(&self.door).unwrap().closing
    }

    pub fn in_transit(&self) -> bool {
        self.est.contexts().contains(&self.door)
    }
}
