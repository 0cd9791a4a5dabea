mod common;

use common::Harness;
use garage_core::EstimatorError;
use garage_traits::{DoorId, Field, Notification, Stamped, Value};

#[test]
fn invalid_rating_creates_no_context() {
    let mut h = Harness::new(10_000, 0, 0);
    h.press_at(0, Field::CloseTrigger);
    assert!(h.moving());
    assert!(!h.in_transit());
    assert_eq!(h.stats.rejected, 1);

    h.tick_at(4_000);
    assert_eq!(h.percent(), 0);
}

#[test]
fn missing_context_field_discards_notification() {
    let mut h = Harness::new(10_000, 8_000, 0);
    h.store.remove_field(&h.door, Field::RatedTimeToOpen);
    h.press_at(0, Field::CloseTrigger);
    assert!(!h.in_transit());
    assert_eq!(h.stats.rejected, 1);
}

#[test]
fn malformed_notification_is_an_input_error() {
    let mut h = Harness::new(10_000, 8_000, 0);
    let now = h.clock.at_ms(0);
    let n = Notification {
        door: DoorId::from("main"),
        field: Field::CloseTrigger,
        current: Stamped {
            value: Value::Bool(true),
            write_time: now,
        },
        previous: None,
        context: vec![],
    };
    let err = h.est.handle(&n).unwrap_err();
    assert!(matches!(err, EstimatorError::MalformedNotification { .. }));
    assert!(err.is_input_error());
    assert!(!h.moving());
}

#[test]
fn write_failure_is_reported_not_retried() {
    let mut h = Harness::new(10_000, 8_000, 0);
    h.press_at(0, Field::CloseTrigger);
    h.store.reject_writes(&h.door, Field::PercentClosed);

    let report = h.tick_at(2_000);
    assert_eq!(report.failures.len(), 1);
    assert!(matches!(
        report.failures[0].1,
        EstimatorError::StoreRejected(_)
    ));
    assert_eq!(h.stats.write_failures, 1);
    assert_eq!(h.percent(), 0);
    assert!(h.in_transit());

    h.store.accept_writes(&h.door, Field::PercentClosed);
    h.tick_at(4_000);
    assert_eq!(h.percent(), 50);
}

#[test]
fn rejected_pause_leaves_door_moving() {
    let mut h = Harness::new(10_000, 8_000, 0);
    h.press_at(0, Field::CloseTrigger);
    h.tick_at(2_000);
    h.store.reject_writes(&h.door, Field::Moving);
    h.press_at(2_000, Field::CloseTrigger);

    assert_eq!(h.stats.rejected, 1);
    assert!(h.moving());
    assert!(h.in_transit());
}

#[test]
fn follower_ignores_everything() {
    let mut h = Harness::new(10_000, 8_000, 0);
    h.press_at(0, Field::CloseTrigger);
    h.tick_at(2_000);
    assert_eq!(h.percent(), 25);

    h.est.on_lost_leadership();
    assert!(!h.est.is_leader());
    assert!(!h.in_transit());
    assert_eq!(h.store.subscription_count(), 0);

    let report = h.tick_at(4_000);
    assert!(report.is_idle());
    assert_eq!(h.percent(), 25);
    h.press_at(4_000, Field::CloseTrigger);
    assert!(h.moving());
}

#[test]
fn regaining_leadership_replays_doors_in_transit() {
    let mut h = Harness::new(10_000, 8_000, 0);
    h.press_at(0, Field::CloseTrigger);
    h.tick_at(2_000);
    h.est.on_lost_leadership();
    h.clock.set_ms(3_000);

    h.est.on_became_leader().unwrap();
    h.drain();
    let ctx = *h.est.contexts().get(&h.door).unwrap();
    assert_eq!(ctx.initial.get(), 25);
    assert_eq!(ctx.anchor, h.clock.at_ms(2_000));

    h.tick_at(4_000);
    assert_eq!(h.percent(), 50);
    h.tick_at(8_000);
    assert_eq!(h.percent(), 100);
    assert!(!h.moving());
}
