//! Text commands shared by the stdin driver and simulation scripts.

use std::str::FromStr;

use garage_core::runner::RunnerEvent;
use garage_core::store_error::map_store_error;
use garage_core::{DoorStatus, Press};
use garage_store::InMemoryStore;
use garage_traits::{DoorId, EntityStore, Field, Value};

use crate::cli::CliError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Press(Press),
    Sensor(DoorStatus),
    Leader(bool),
}

impl FromStr for Action {
    type Err = CliError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "open" => Action::Press(Press::Open),
            "close" => Action::Press(Press::Close),
            "toggle" => Action::Press(Press::Toggle),
            "sensor-closed" => Action::Sensor(DoorStatus::Closed),
            "sensor-opened" => Action::Sensor(DoorStatus::Opened),
            "leader-on" => Action::Leader(true),
            "leader-off" => Action::Leader(false),
            other => return Err(CliError::BadScript(format!("unknown action '{other}'"))),
        })
    }
}

pub fn trigger_field(press: Press) -> Field {
    match press {
        Press::Open => Field::OpenTrigger,
        Press::Close => Field::CloseTrigger,
        Press::Toggle => Field::ToggleTrigger,
    }
}

/// One scripted step: `action[:door]@ms`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub at_ms: u64,
    pub action: Action,
    pub door: Option<DoorId>,
}

impl FromStr for Step {
    type Err = CliError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let Some((what, at)) = s.rsplit_once('@') else {
            return Err(CliError::BadScript(format!("step '{s}' is missing '@ms'")));
        };
        let at_ms = at
            .trim()
            .parse::<u64>()
            .map_err(|_| CliError::BadScript(format!("step '{s}' has a bad time '{at}'")))?;
        let (action, door) = match what.split_once(':') {
            Some((action, door)) if !door.trim().is_empty() => {
                (action, Some(DoorId::from(door.trim())))
            }
            Some((_, _)) => return Err(CliError::BadScript(format!("step '{s}' has an empty door"))),
            None => (what, None),
        };
        Ok(Step {
            at_ms,
            action: action.parse()?,
            door,
        })
    }
}

/// Parse a comma-separated script, ordered by time; same-time steps keep
/// their written order.
pub fn parse_script(script: &str) -> Result<Vec<Step>, CliError> {
    let mut steps = script
        .split(',')
        .filter(|s| !s.trim().is_empty())
        .map(str::parse::<Step>)
        .collect::<Result<Vec<_>, _>>()?;
    if steps.is_empty() {
        return Err(CliError::BadScript("script has no steps".into()));
    }
    steps.sort_by_key(|s| s.at_ms);
    Ok(steps)
}

/// Apply an action to the store. Leadership changes are not store writes;
/// they come back as the runner event to deliver.
pub fn apply(
    store: &InMemoryStore,
    door: &DoorId,
    action: Action,
) -> eyre::Result<Option<RunnerEvent>> {
    match action {
        Action::Press(p) => store.press(door, trigger_field(p))?,
        Action::Sensor(status) => store
            .write(
                door,
                Field::IsClosed,
                Value::Bool(status == DoorStatus::Closed),
            )
            .map_err(|e| map_store_error(e.as_ref()))?,
        Action::Leader(true) => return Ok(Some(RunnerEvent::BecameLeader)),
        Action::Leader(false) => return Ok(Some(RunnerEvent::LostLeadership)),
    }
    Ok(None)
}
