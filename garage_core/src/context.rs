//! Per-door moving context table.
//!
//! Owned by the estimator; entries exist only while a door is in transit.
use std::collections::BTreeMap;
use std::time::Instant;

use garage_traits::DoorId;

use crate::door::{Direction, PercentClosed, RatedTimes};

/// Anchor data for one motion segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MovingContext {
    /// Position when the segment began.
    pub initial: PercentClosed,
    pub direction: Direction,
    pub rated: RatedTimes,
    /// Start of the current uninterrupted portion of the segment.
    pub anchor: Instant,
}

#[derive(Debug, Default)]
pub struct ContextTable {
    entries: BTreeMap<DoorId, MovingContext>,
}

impl ContextTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace; returns the previous entry for the door.
    pub fn insert(&mut self, door: DoorId, ctx: MovingContext) -> Option<MovingContext> {
        self.entries.insert(door, ctx)
    }

    pub fn remove(&mut self, door: &DoorId) -> Option<MovingContext> {
        self.entries.remove(door)
    }

    pub fn get(&self, door: &DoorId) -> Option<&MovingContext> {
        self.entries.get(door)
    }

    pub fn contains(&self, door: &DoorId) -> bool {
        self.entries.contains_key(door)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&DoorId, &MovingContext)> {
        self.entries.iter()
    }
}
