//! The leader-only position estimator.
//!
//! `GarageEstimator` owns the moving-context table and is driven from a single
//! thread of control: notifications go through [`GarageEstimator::handle`],
//! periodic recomputes through [`GarageEstimator::tick`]. Handlers only mutate
//! the table after the store has acknowledged the write they depend on.
use std::sync::Arc;
use std::time::Instant;

use garage_traits::{
    Clock, DoorId, EntityStore, Field, Notification, NotificationSink, Subscription,
    SubscriptionToken, Value,
};

use crate::context::{ContextTable, MovingContext};
use crate::door::{Direction, DoorMotion, DoorStatus, PercentClosed, Press, PressPlan, RatedTimes};
use crate::error::EstimatorError;
use crate::position;
use crate::status::{DoorProgress, TickReport};
use crate::store_error::map_store_error;

/// Context attached to every trigger notification.
const TRIGGER_CONTEXT: [Field; 3] = [Field::Moving, Field::PercentClosed, Field::Closing];

/// Context attached to every `Moving` notification.
const MOVING_CONTEXT: [Field; 4] = [
    Field::Closing,
    Field::PercentClosed,
    Field::RatedTimeToOpen,
    Field::RatedTimeToClose,
];

pub struct GarageEstimator<S: EntityStore> {
    store: S,
    clock: Arc<dyn Clock + Send + Sync>,
    sink: NotificationSink,
    leader: bool,
    tokens: Vec<SubscriptionToken>,
    moving: ContextTable,
}

impl<S: EntityStore> core::fmt::Debug for GarageEstimator<S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("GarageEstimator")
            .field("leader", &self.leader)
            .field("subscriptions", &self.tokens.len())
            .field("moving", &self.moving.len())
            .finish_non_exhaustive()
    }
}

impl<S: EntityStore> GarageEstimator<S> {
    /// Build a follower; nothing is subscribed until leadership is acquired.
    /// `sink` receives every notification the estimator subscribes to.
    pub fn new(store: S, clock: Arc<dyn Clock + Send + Sync>, sink: NotificationSink) -> Self {
        Self {
            store,
            clock,
            sink,
            leader: false,
            tokens: Vec::new(),
            moving: ContextTable::new(),
        }
    }

    pub fn is_leader(&self) -> bool {
        self.leader
    }

    pub fn contexts(&self) -> &ContextTable {
        &self.moving
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn on_became_leader(&mut self) -> Result<(), EstimatorError> {
        self.leader = true;
        tracing::info!("became leader");
        self.reinitialize()
    }

    /// Drop every subscription and context without flushing anything.
    pub fn on_lost_leadership(&mut self) {
        self.leader = false;
        self.unsubscribe_all();
        let dropped = self.moving.len();
        self.moving.clear();
        tracing::info!(dropped_contexts = dropped, "lost leadership");
    }

    /// Rebuild subscriptions from scratch. The `Moving` subscription replays
    /// current values, so doors already in transit get fresh contexts.
    pub fn reinitialize(&mut self) -> Result<(), EstimatorError> {
        self.unsubscribe_all();
        self.moving.clear();
        if !self.leader {
            return Ok(());
        }

        let mut subscriptions: Vec<Subscription> = [
            Field::OpenTrigger,
            Field::CloseTrigger,
            Field::ToggleTrigger,
        ]
        .into_iter()
        .map(|f| Subscription::on(f).with_context(&TRIGGER_CONTEXT))
        .collect();
        subscriptions.push(Subscription::on(Field::IsClosed).notify_on_change());
        subscriptions.push(
            Subscription::on(Field::Moving)
                .notify_on_change()
                .with_context(&MOVING_CONTEXT)
                .replay_current(),
        );

        for sub in subscriptions {
            let token = self
                .store
                .subscribe(sub, self.sink.clone())
                .map_err(|e| map_store_error(e.as_ref()))?;
            self.tokens.push(token);
        }
        tracing::debug!(subscriptions = self.tokens.len(), "subscriptions rebuilt");
        Ok(())
    }

    fn unsubscribe_all(&mut self) {
        for token in self.tokens.drain(..) {
            self.store.unsubscribe(token);
        }
    }

    /// Route one notification to its handler. No-op when not leader.
    pub fn handle(&mut self, n: &Notification) -> Result<(), EstimatorError> {
        if !self.leader {
            tracing::trace!(door = %n.door, field = %n.field, "not leader; notification ignored");
            return Ok(());
        }
        match n.field {
            Field::OpenTrigger => self.on_trigger(n, Press::Open),
            Field::CloseTrigger => self.on_trigger(n, Press::Close),
            Field::ToggleTrigger => self.on_trigger(n, Press::Toggle),
            Field::IsClosed => self.on_door_status_changed(n),
            Field::Moving => self.on_moving_changed(n),
            other => {
                tracing::debug!(door = %n.door, field = %other, "unexpected notification field");
                Ok(())
            }
        }
    }

    fn on_trigger(&mut self, n: &Notification, press: Press) -> Result<(), EstimatorError> {
        if n.current.value.as_bool() != Some(true) {
            return Ok(());
        }
        let (moving, moving_written_at) = context_bool(n, Field::Moving)?;
        let (closing, _) = context_bool(n, Field::Closing)?;
        let percent = context_percent(n)?;

        let motion = DoorMotion::observe(moving, closing, percent, moving_written_at);
        let percent = motion.percent();
        match motion.plan(press) {
            PressPlan::Pause { preserve_anchor } => {
                match preserve_anchor {
                    Some(anchor) => self.put_preserving(&n.door, Field::Moving, false, anchor)?,
                    None => self.put(&n.door, Field::Moving, Value::Bool(false))?,
                }
                tracing::info!(door = %n.door, press = press.name(), %percent, "paused");
            }
            PressPlan::Start(direction) => {
                self.put(&n.door, Field::Closing, Value::Bool(direction.is_closing()))?;
                self.put(&n.door, Field::Moving, Value::Bool(true))?;
                tracing::info!(
                    door = %n.door,
                    press = press.name(),
                    direction = direction.name(),
                    %percent,
                    "motion started"
                );
            }
            PressPlan::Ignore => {
                tracing::debug!(door = %n.door, press = press.name(), %percent, "already at target; press ignored");
            }
        }
        Ok(())
    }

    fn on_door_status_changed(&mut self, n: &Notification) -> Result<(), EstimatorError> {
        let is_closed = n
            .current
            .value
            .as_bool()
            .ok_or_else(|| malformed(n, "IsClosed is not a bool"))?;

        match DoorStatus::from_is_closed(is_closed) {
            DoorStatus::Closed => {
                self.put(&n.door, Field::Closing, Value::Bool(false))?;
                self.put(&n.door, Field::Moving, Value::Bool(false))?;
                self.put(&n.door, Field::PercentClosed, PercentClosed::CLOSED.into())?;
                tracing::info!(door = %n.door, "sensor confirmed closed");
            }
            DoorStatus::Opened => {
                let already_moving = self
                    .store
                    .read(&n.door, Field::Moving)
                    .map_err(|e| map_store_error(e.as_ref()))?
                    .value
                    .as_bool()
                    .unwrap_or(false);
                if !already_moving {
                    self.put(&n.door, Field::Moving, Value::Bool(true))?;
                }
                tracing::info!(door = %n.door, already_moving, "sensor reports open");
            }
        }
        Ok(())
    }

    /// Sole creator and destroyer of contexts. `Moving=false` removes the
    /// entry, and so does a `Moving=true` whose ratings are unusable.
    fn on_moving_changed(&mut self, n: &Notification) -> Result<(), EstimatorError> {
        let moving = n
            .current
            .value
            .as_bool()
            .ok_or_else(|| malformed(n, "Moving is not a bool"))?;
        if !moving {
            if self.moving.remove(&n.door).is_some() {
                tracing::debug!(door = %n.door, "moving context removed");
            }
            return Ok(());
        }

        let (closing, _) = context_bool(n, Field::Closing)?;
        let (percent, percent_written_at) = context_percent_stamped(n)?;
        let open_ms = context_int(n, Field::RatedTimeToOpen)?;
        let close_ms = context_int(n, Field::RatedTimeToClose)?;
        let Some(rated) = RatedTimes::new(open_ms, close_ms) else {
            self.moving.remove(&n.door);
            return Err(EstimatorError::InvalidRating {
                door: n.door.to_string(),
                open_ms,
                close_ms,
            });
        };

        // A fresh segment has no estimate newer than its Moving write. A
        // replayed one does, and that estimate is where the clock restarts.
        let ctx = MovingContext {
            initial: percent,
            direction: Direction::from_closing_flag(closing),
            rated,
            anchor: n.current.write_time.max(percent_written_at),
        };
        let replaced = self.moving.insert(n.door.clone(), ctx).is_some();
        tracing::debug!(
            door = %n.door,
            initial = %percent,
            direction = ctx.direction.name(),
            replaced,
            "moving context created"
        );
        Ok(())
    }

    /// Recompute every door in transit and write the new estimates.
    pub fn tick(&mut self) -> TickReport {
        let mut report = TickReport::default();
        if !self.leader {
            return report;
        }

        for (door, ctx) in self.moving.iter() {
            let elapsed_ms = self.clock.ms_since(ctx.anchor);
            let estimate = position::estimate_percent(ctx, elapsed_ms);
            let percent = PercentClosed::from_estimate(estimate);

            if let Err(e) = self.put(door, Field::PercentClosed, percent.into()) {
                report.failures.push((door.clone(), e));
                continue;
            }
            tracing::debug!(door = %door, %percent, elapsed_ms, "estimate written");

            if position::has_arrived(estimate, ctx.direction, ctx.rated) {
                match self.put(door, Field::Moving, Value::Bool(false)) {
                    Ok(()) => {
                        tracing::info!(door = %door, %percent, "arrived");
                        report
                            .progress
                            .push((door.clone(), DoorProgress::Arrived(percent)));
                    }
                    Err(e) => report.failures.push((door.clone(), e)),
                }
            } else {
                report
                    .progress
                    .push((door.clone(), DoorProgress::Moving(percent)));
            }
        }
        report
    }

    fn put(&self, door: &DoorId, field: Field, value: Value) -> Result<(), EstimatorError> {
        self.store
            .write(door, field, value)
            .map_err(|e| map_store_error(e.as_ref()))
    }

    fn put_preserving(
        &self,
        door: &DoorId,
        field: Field,
        value: bool,
        write_time: Instant,
    ) -> Result<(), EstimatorError> {
        self.store
            .write_preserving_time(door, field, Value::Bool(value), write_time)
            .map_err(|e| map_store_error(e.as_ref()))
    }
}

fn malformed(n: &Notification, reason: impl Into<String>) -> EstimatorError {
    EstimatorError::MalformedNotification {
        door: n.door.to_string(),
        reason: reason.into(),
    }
}

fn context_bool(n: &Notification, field: Field) -> Result<(bool, Instant), EstimatorError> {
    let stamped = n
        .context(field)
        .ok_or_else(|| malformed(n, format!("missing context field {field}")))?;
    let value = stamped
        .value
        .as_bool()
        .ok_or_else(|| malformed(n, format!("context field {field} is not a bool")))?;
    Ok((value, stamped.write_time))
}

fn context_int(n: &Notification, field: Field) -> Result<i64, EstimatorError> {
    n.context(field)
        .ok_or_else(|| malformed(n, format!("missing context field {field}")))?
        .value
        .as_int()
        .ok_or_else(|| malformed(n, format!("context field {field} is not an integer")))
}

fn context_percent(n: &Notification) -> Result<PercentClosed, EstimatorError> {
    context_percent_stamped(n).map(|(p, _)| p)
}

fn context_percent_stamped(n: &Notification) -> Result<(PercentClosed, Instant), EstimatorError> {
    let raw = context_int(n, Field::PercentClosed)?;
    let percent = PercentClosed::from_i64(raw)
        .ok_or_else(|| malformed(n, format!("PercentClosed {raw} is outside [0, 100]")))?;
    let written_at = n
        .context(Field::PercentClosed)
        .map_or(n.current.write_time, |s| s.write_time);
    Ok((percent, written_at))
}
