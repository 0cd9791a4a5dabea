//! Entity vocabulary shared between the store collaborator and the estimator.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

/// Identity of one garage door entity.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DoorId(String);

impl DoorId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DoorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DoorId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for DoorId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Fields of a garage door entity that the estimator reads or writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    /// 0 = fully open, 100 = fully closed.
    PercentClosed,
    /// Direction of the current or most recent motion.
    Closing,
    /// True while the door is in transit.
    Moving,
    OpenTrigger,
    CloseTrigger,
    /// Single-button opener press.
    ToggleTrigger,
    /// Contact sensor: true when the door is confirmed fully closed.
    IsClosed,
    /// Full-travel time toward open, in milliseconds.
    RatedTimeToOpen,
    /// Full-travel time toward closed, in milliseconds.
    RatedTimeToClose,
}

impl Field {
    pub const ALL: [Field; 9] = [
        Field::PercentClosed,
        Field::Closing,
        Field::Moving,
        Field::OpenTrigger,
        Field::CloseTrigger,
        Field::ToggleTrigger,
        Field::IsClosed,
        Field::RatedTimeToOpen,
        Field::RatedTimeToClose,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Field::PercentClosed => "PercentClosed",
            Field::Closing => "Closing",
            Field::Moving => "Moving",
            Field::OpenTrigger => "OpenTrigger",
            Field::CloseTrigger => "CloseTrigger",
            Field::ToggleTrigger => "ToggleTrigger",
            Field::IsClosed => "IsClosed",
            Field::RatedTimeToOpen => "RatedTimeToOpen",
            Field::RatedTimeToClose => "RatedTimeToClose",
        }
    }

    /// Schema type of the field.
    pub fn kind(self) -> ValueKind {
        match self {
            Field::PercentClosed | Field::RatedTimeToOpen | Field::RatedTimeToClose => {
                ValueKind::Int
            }
            Field::Closing
            | Field::Moving
            | Field::OpenTrigger
            | Field::CloseTrigger
            | Field::ToggleTrigger
            | Field::IsClosed => ValueKind::Bool,
        }
    }

    /// Write-only command fields; every write is a discrete press.
    pub fn is_trigger(self) -> bool {
        matches!(
            self,
            Field::OpenTrigger | Field::CloseTrigger | Field::ToggleTrigger
        )
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Bool,
    Int,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Value {
    Bool(bool),
    Int(i64),
}

impl Value {
    pub fn kind(self) -> ValueKind {
        match self {
            Value::Bool(_) => ValueKind::Bool,
            Value::Int(_) => ValueKind::Int,
        }
    }

    pub fn as_bool(self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(b),
            Value::Int(_) => None,
        }
    }

    pub fn as_int(self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(i),
            Value::Bool(_) => None,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

/// A field value together with its logical write time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stamped {
    pub value: Value,
    pub write_time: Instant,
}

/// A field-change notification with the context snapshot taken atomically
/// with the triggering write.
#[derive(Debug, Clone)]
pub struct Notification {
    pub door: DoorId,
    pub field: Field,
    pub current: Stamped,
    /// None for replayed notifications.
    pub previous: Option<Stamped>,
    /// Requested sibling fields, in subscription order. Fields missing on the
    /// entity are omitted.
    pub context: Vec<(Field, Stamped)>,
}

impl Notification {
    pub fn context(&self, field: Field) -> Option<&Stamped> {
        self.context
            .iter()
            .find_map(|(f, s)| (*f == field).then_some(s))
    }
}

/// Interest in one field's changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    pub field: Field,
    pub context_fields: Vec<Field>,
    /// Only notify when the value differs from the previous one.
    pub notify_on_change: bool,
    /// Deliver the current value of every door once, at subscribe time.
    pub replay_current: bool,
}

impl Subscription {
    pub fn on(field: Field) -> Self {
        Self {
            field,
            context_fields: Vec::new(),
            notify_on_change: false,
            replay_current: false,
        }
    }

    pub fn with_context(mut self, fields: &[Field]) -> Self {
        self.context_fields = fields.to_vec();
        self
    }

    pub fn notify_on_change(mut self) -> Self {
        self.notify_on_change = true;
        self
    }

    pub fn replay_current(mut self) -> Self {
        self.replay_current = true;
        self
    }
}

/// Delivery callback. Called in write order; must not call back into the store.
pub type NotificationSink = Arc<dyn Fn(Notification) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionToken(pub u64);
