#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! In-memory entity store.
//!
//! Reference implementation of the store collaborator used by the CLI and the
//! test suites: schema-typed door fields, logical write times, notify-on-change
//! filtering, context snapshots taken atomically with the write, and
//! replay-on-subscribe. Notifications are delivered while the store lock is
//! held, so per-field delivery order always matches write order.
pub mod error;

pub use error::StoreError;

use error::Result;
use garage_traits::{
    Clock, DoorId, EntityStore, Field, Notification, NotificationSink, Stamped, Subscription,
    SubscriptionToken, Value,
};
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

/// Initial field values for a door added to the store.
#[derive(Debug, Clone, Copy)]
pub struct DoorSeed {
    pub time_to_open_ms: i64,
    pub time_to_close_ms: i64,
    pub percent_closed: i64,
}

/// Plain view of the position-related fields of one door.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DoorSnapshot {
    pub percent_closed: i64,
    pub closing: bool,
    pub moving: bool,
    pub is_closed: bool,
}

struct Registered {
    token: SubscriptionToken,
    subscription: Subscription,
    sink: NotificationSink,
}

#[derive(Default)]
struct Inner {
    doors: BTreeMap<DoorId, BTreeMap<Field, Stamped>>,
    subscriptions: Vec<Registered>,
    next_token: u64,
    rejected: HashSet<(DoorId, Field)>,
}

/// Cloneable handle; clones share the same entities and subscriptions.
#[derive(Clone)]
pub struct InMemoryStore {
    inner: Arc<Mutex<Inner>>,
    clock: Arc<dyn Clock + Send + Sync>,
}

impl core::fmt::Debug for InMemoryStore {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let inner = self.lock();
        f.debug_struct("InMemoryStore")
            .field("doors", &inner.doors.len())
            .field("subscriptions", &inner.subscriptions.len())
            .finish()
    }
}

impl InMemoryStore {
    pub fn new(clock: Arc<dyn Clock + Send + Sync>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
            clock,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A panicking sink must not take the whole store down with it.
        self.inner.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Create (or replace) a door entity with every known field populated.
    pub fn add_door(&self, id: impl Into<DoorId>, seed: DoorSeed) {
        let now = self.clock.now();
        let stamp = |value: Value| Stamped {
            value,
            write_time: now,
        };
        let mut fields = BTreeMap::new();
        fields.insert(Field::PercentClosed, stamp(Value::Int(seed.percent_closed)));
        fields.insert(Field::Closing, stamp(Value::Bool(false)));
        fields.insert(Field::Moving, stamp(Value::Bool(false)));
        fields.insert(Field::OpenTrigger, stamp(Value::Bool(false)));
        fields.insert(Field::CloseTrigger, stamp(Value::Bool(false)));
        fields.insert(Field::ToggleTrigger, stamp(Value::Bool(false)));
        fields.insert(
            Field::IsClosed,
            stamp(Value::Bool(seed.percent_closed >= 100)),
        );
        fields.insert(
            Field::RatedTimeToOpen,
            stamp(Value::Int(seed.time_to_open_ms)),
        );
        fields.insert(
            Field::RatedTimeToClose,
            stamp(Value::Int(seed.time_to_close_ms)),
        );
        let id = id.into();
        tracing::debug!(door = %id, percent_closed = seed.percent_closed, "door added");
        self.lock().doors.insert(id, fields);
    }

    pub fn doors(&self) -> Vec<DoorId> {
        self.lock().doors.keys().cloned().collect()
    }

    /// Current value of a field, if the door and field exist.
    pub fn value(&self, door: &DoorId, field: Field) -> Option<Stamped> {
        self.lock().doors.get(door)?.get(&field).copied()
    }

    pub fn snapshot(&self, door: &DoorId) -> Option<DoorSnapshot> {
        let inner = self.lock();
        let fields = inner.doors.get(door)?;
        let int = |f: Field| fields.get(&f).and_then(|s| s.value.as_int());
        let flag = |f: Field| fields.get(&f).and_then(|s| s.value.as_bool());
        Some(DoorSnapshot {
            percent_closed: int(Field::PercentClosed)?,
            closing: flag(Field::Closing)?,
            moving: flag(Field::Moving)?,
            is_closed: flag(Field::IsClosed)?,
        })
    }

    /// Simulate a button press or sensor edge: a plain write with a fresh time.
    pub fn press(&self, door: &DoorId, trigger: Field) -> Result<()> {
        let now = self.clock.now();
        self.apply(door, trigger, Value::Bool(true), now)
    }

    /// Reject all future writes to `door.field` (fault injection).
    pub fn reject_writes(&self, door: &DoorId, field: Field) {
        self.lock().rejected.insert((door.clone(), field));
    }

    pub fn accept_writes(&self, door: &DoorId, field: Field) {
        self.lock().rejected.remove(&(door.clone(), field));
    }

    /// Drop a field from a door so notifications arrive without it.
    pub fn remove_field(&self, door: &DoorId, field: Field) {
        if let Some(fields) = self.lock().doors.get_mut(door) {
            fields.remove(&field);
        }
    }

    pub fn subscription_count(&self) -> usize {
        self.lock().subscriptions.len()
    }

    fn apply(&self, door: &DoorId, field: Field, value: Value, write_time: Instant) -> Result<()> {
        if value.kind() != field.kind() {
            return Err(StoreError::TypeMismatch {
                field,
                expected: field.kind(),
            });
        }

        let mut inner = self.lock();
        if inner.rejected.contains(&(door.clone(), field)) {
            return Err(StoreError::Rejected(format!("{door}.{field}")));
        }
        let fields = inner
            .doors
            .get_mut(door)
            .ok_or_else(|| StoreError::UnknownDoor(door.to_string()))?;
        let current = Stamped { value, write_time };
        let previous = fields.insert(field, current);
        let changed = previous.is_none_or(|p| p.value != value);
        tracing::trace!(door = %door, %field, ?value, changed, "write");

        let inner = &*inner;
        let Some(fields) = inner.doors.get(door) else {
            return Ok(());
        };
        for reg in inner
            .subscriptions
            .iter()
            .filter(|r| r.subscription.field == field)
            .filter(|r| changed || !r.subscription.notify_on_change)
        {
            (reg.sink)(Notification {
                door: door.clone(),
                field,
                current,
                previous,
                context: context_snapshot(fields, &reg.subscription.context_fields),
            });
        }
        Ok(())
    }
}

fn context_snapshot(
    fields: &BTreeMap<Field, Stamped>,
    wanted: &[Field],
) -> Vec<(Field, Stamped)> {
    wanted
        .iter()
        .filter_map(|f| fields.get(f).map(|s| (*f, *s)))
        .collect()
}

impl EntityStore for InMemoryStore {
    fn read(
        &self,
        door: &DoorId,
        field: Field,
    ) -> std::result::Result<Stamped, Box<dyn std::error::Error + Send + Sync>> {
        let inner = self.lock();
        let fields = inner
            .doors
            .get(door)
            .ok_or_else(|| StoreError::UnknownDoor(door.to_string()))?;
        let stamped = fields.get(&field).ok_or_else(|| StoreError::UnknownField {
            door: door.to_string(),
            field,
        })?;
        Ok(*stamped)
    }

    fn write(
        &self,
        door: &DoorId,
        field: Field,
        value: Value,
    ) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let now = self.clock.now();
        Ok(self.apply(door, field, value, now)?)
    }

    fn write_preserving_time(
        &self,
        door: &DoorId,
        field: Field,
        value: Value,
        write_time: Instant,
    ) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.apply(door, field, value, write_time)?)
    }

    fn subscribe(
        &self,
        subscription: Subscription,
        sink: NotificationSink,
    ) -> std::result::Result<SubscriptionToken, Box<dyn std::error::Error + Send + Sync>> {
        let mut inner = self.lock();
        inner.next_token += 1;
        let token = SubscriptionToken(inner.next_token);

        if subscription.replay_current {
            for (door, fields) in &inner.doors {
                let Some(current) = fields.get(&subscription.field) else {
                    continue;
                };
                sink(Notification {
                    door: door.clone(),
                    field: subscription.field,
                    current: *current,
                    previous: None,
                    context: context_snapshot(fields, &subscription.context_fields),
                });
            }
        }

        tracing::debug!(field = %subscription.field, token = token.0, "subscribed");
        inner.subscriptions.push(Registered {
            token,
            subscription,
            sink,
        });
        Ok(token)
    }

    fn unsubscribe(&self, token: SubscriptionToken) {
        self.lock().subscriptions.retain(|r| r.token != token);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use garage_traits::ManualClock;

    fn store() -> (InMemoryStore, ManualClock) {
        let clock = ManualClock::new();
        let store = InMemoryStore::new(Arc::new(clock.clone()));
        store.add_door(
            "main",
            DoorSeed {
                time_to_open_ms: 10_000,
                time_to_close_ms: 8_000,
                percent_closed: 100,
            },
        );
        (store, clock)
    }

    #[test]
    fn seeded_door_reports_closed() {
        let (store, _) = store();
        let snap = store.snapshot(&DoorId::from("main")).unwrap();
        assert_eq!(snap.percent_closed, 100);
        assert!(snap.is_closed);
        assert!(!snap.moving);
    }

    #[test]
    fn write_rejects_wrong_type() {
        let (store, _) = store();
        let err = store
            .write(&DoorId::from("main"), Field::Moving, Value::Int(1))
            .unwrap_err();
        assert!(err.to_string().contains("type mismatch"));
    }

    #[test]
    fn write_preserving_time_keeps_stamp() {
        let (store, clock) = store();
        let door = DoorId::from("main");
        let anchor = clock.at_ms(0);
        clock.set_ms(5_000);
        store
            .write_preserving_time(&door, Field::Moving, Value::Bool(true), anchor)
            .unwrap();
        assert_eq!(store.value(&door, Field::Moving).unwrap().write_time, anchor);
        store.write(&door, Field::Moving, Value::Bool(false)).unwrap();
        assert_eq!(
            store.value(&door, Field::Moving).unwrap().write_time,
            clock.at_ms(5_000)
        );
    }
}
