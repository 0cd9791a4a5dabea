//! Conversions bridging `garage_config` types to `garage_core` types.

use crate::door::{PercentClosed, RatedTimes};
use crate::error::EstimatorError;

// ── DoorCfg ──────────────────────────────────────────────────────────────────

impl TryFrom<&garage_config::DoorCfg> for RatedTimes {
    type Error = EstimatorError;

    fn try_from(c: &garage_config::DoorCfg) -> Result<Self, Self::Error> {
        RatedTimes::new(c.time_to_open_ms, c.time_to_close_ms).ok_or_else(|| {
            EstimatorError::InvalidRating {
                door: c.id.clone(),
                open_ms: c.time_to_open_ms,
                close_ms: c.time_to_close_ms,
            }
        })
    }
}

/// Seed position for a configured door.
pub fn initial_percent(c: &garage_config::DoorCfg) -> Result<PercentClosed, EstimatorError> {
    PercentClosed::from_i64(c.initial_percent_closed).ok_or_else(|| {
        EstimatorError::Config(format!(
            "doors.{}.initial_percent_closed must be in [0, 100]",
            c.id
        ))
    })
}

// ── RunnerCfg ────────────────────────────────────────────────────────────────

impl From<&garage_config::RunnerCfg> for crate::runner::RunnerCfg {
    fn from(c: &garage_config::RunnerCfg) -> Self {
        Self {
            tick_period: crate::util::tick_period(c.tick_rate_ms),
        }
    }
}
