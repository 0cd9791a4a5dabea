use garage_traits::DoorId;

use crate::door::PercentClosed;
use crate::error::EstimatorError;

/// Outcome of one recompute for one door.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoorProgress {
    /// Estimate written; still travelling.
    Moving(PercentClosed),
    /// Reached the target; `Moving=false` written.
    Arrived(PercentClosed),
}

impl DoorProgress {
    pub fn percent(self) -> PercentClosed {
        match self {
            DoorProgress::Moving(p) | DoorProgress::Arrived(p) => p,
        }
    }
}

/// Result of a single tick across all doors in transit.
#[derive(Debug, Default)]
pub struct TickReport {
    pub progress: Vec<(DoorId, DoorProgress)>,
    /// Per-door write failures; not retried.
    pub failures: Vec<(DoorId, EstimatorError)>,
}

impl TickReport {
    pub fn is_idle(&self) -> bool {
        self.progress.is_empty() && self.failures.is_empty()
    }

    pub fn arrived(&self) -> impl Iterator<Item = &DoorId> {
        self.progress
            .iter()
            .filter(|(_, p)| matches!(p, DoorProgress::Arrived(_)))
            .map(|(d, _)| d)
    }
}
