//! Store assembly from config and door snapshot rendering.

use std::sync::Arc;

use garage_config::Config;
use garage_core::RatedTimes;
use garage_core::conversions::initial_percent;
use garage_store::{DoorSeed, DoorSnapshot, InMemoryStore};
use garage_traits::{Clock, DoorId};

/// Seed an in-memory store with every configured door.
pub fn build_store(cfg: &Config, clock: Arc<dyn Clock + Send + Sync>) -> eyre::Result<InMemoryStore> {
    let store = InMemoryStore::new(clock);
    for door in &cfg.doors {
        let rated = RatedTimes::try_from(door)?;
        let percent = initial_percent(door)?;
        store.add_door(
            door.id.as_str(),
            DoorSeed {
                time_to_open_ms: i64::try_from(rated.to_open_ms())?,
                time_to_close_ms: i64::try_from(rated.to_close_ms())?,
                percent_closed: i64::from(percent.get()),
            },
        );
    }
    Ok(store)
}

/// Human name for the externally observable state.
pub fn state_name(s: &DoorSnapshot) -> &'static str {
    match (s.moving, s.closing, s.percent_closed) {
        (true, true, _) => "closing",
        (true, false, _) => "opening",
        (false, _, 100) => "closed",
        (false, _, 0) => "open",
        (false, _, _) => "paused",
    }
}

pub fn render(door: &DoorId, s: &DoorSnapshot) -> String {
    format!("{door} {}% {}", s.percent_closed, state_name(s))
}

pub fn render_json(door: &DoorId, s: &DoorSnapshot) -> serde_json::Value {
    serde_json::json!({
        "door": door.as_str(),
        "percent_closed": s.percent_closed,
        "moving": s.moving,
        "closing": s.closing,
        "state": state_name(s),
    })
}
