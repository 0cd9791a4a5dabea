pub mod clock;
pub mod entity;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use entity::{
    DoorId, Field, Notification, NotificationSink, Stamped, Subscription, SubscriptionToken,
    Value, ValueKind,
};

use std::time::Instant;

/// The entity store collaborator: point reads, two-mode writes, and
/// subscribe-with-context notifications.
pub trait EntityStore {
    fn read(
        &self,
        door: &DoorId,
        field: Field,
    ) -> Result<Stamped, Box<dyn std::error::Error + Send + Sync>>;

    /// Set a field's value and advance its logical write time to now.
    fn write(
        &self,
        door: &DoorId,
        field: Field,
        value: Value,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    /// Set a field's value while keeping `write_time` as its logical write time.
    fn write_preserving_time(
        &self,
        door: &DoorId,
        field: Field,
        value: Value,
        write_time: Instant,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    fn subscribe(
        &self,
        subscription: Subscription,
        sink: NotificationSink,
    ) -> Result<SubscriptionToken, Box<dyn std::error::Error + Send + Sync>>;

    fn unsubscribe(&self, token: SubscriptionToken);
}
