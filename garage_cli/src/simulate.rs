//! Deterministic scenario replay on a virtual clock.
//!
//! Timeline points are every tick (`step_ms`) plus every scripted step time.
//! At each point the tick runs first, then the steps due at that time, then
//! any door whose observable fields changed is printed.

use std::collections::BTreeMap;
use std::sync::Arc;

use garage_config::Config;
use garage_core::GarageEstimator;
use garage_core::runner::{self, RunStats};
use garage_store::{DoorSnapshot, InMemoryStore};
use garage_traits::{DoorId, ManualClock};

use crate::cli::CliError;
use crate::command::{self, Step};
use crate::doors;

/// Longest virtual timeline a simulation may cover (one day).
pub const MAX_SIM_MS: u64 = 24 * 60 * 60 * 1000;

pub struct SimParams<'a> {
    pub script: &'a str,
    pub door: Option<&'a str>,
    pub until_ms: Option<u64>,
    pub step_ms: Option<u64>,
    pub json: bool,
}

struct Printer {
    json: bool,
    last: BTreeMap<DoorId, DoorSnapshot>,
}

impl Printer {
    fn emit_changes(&mut self, t_ms: u64, store: &InMemoryStore) {
        for door in store.doors() {
            let Some(snap) = store.snapshot(&door) else {
                continue;
            };
            if self.last.get(&door) == Some(&snap) {
                continue;
            }
            if self.json {
                let mut v = doors::render_json(&door, &snap);
                v["t_ms"] = t_ms.into();
                println!("{v}");
            } else {
                println!("t={t_ms} {}", doors::render(&door, &snap));
            }
            self.last.insert(door, snap);
        }
    }

    fn emit_final(&self, store: &InMemoryStore, stats: &RunStats) {
        for door in store.doors() {
            let Some(snap) = store.snapshot(&door) else {
                continue;
            };
            if self.json {
                let mut v = doors::render_json(&door, &snap);
                v["final"] = true.into();
                println!("{v}");
            } else {
                println!("final {}", doors::render(&door, &snap));
            }
        }
        if self.json {
            println!(
                "{}",
                serde_json::json!({
                    "ticks": stats.ticks,
                    "notifications": stats.notifications,
                    "rejected": stats.rejected,
                    "write_failures": stats.write_failures,
                })
            );
        } else {
            println!(
                "stats ticks={} notifications={} rejected={} write_failures={}",
                stats.ticks, stats.notifications, stats.rejected, stats.write_failures
            );
        }
    }
}

fn target_door(cfg: &Config, step: &Step, default: &DoorId) -> Result<DoorId, CliError> {
    let door = step.door.clone().unwrap_or_else(|| default.clone());
    if cfg.door(door.as_str()).is_none() {
        return Err(CliError::UnknownDoor(door.to_string()));
    }
    Ok(door)
}

pub fn simulate(cfg: &Config, p: &SimParams<'_>) -> eyre::Result<RunStats> {
    let steps = command::parse_script(p.script)?;
    let default_door = match p.door {
        Some(id) => DoorId::from(id),
        None => cfg
            .doors
            .first()
            .map(|d| DoorId::from(d.id.as_str()))
            .ok_or_else(|| CliError::Config("no doors configured".into()))?,
    };
    let targets = steps
        .iter()
        .map(|s| target_door(cfg, s, &default_door))
        .collect::<Result<Vec<_>, _>>()?;

    let step_ms = p.step_ms.unwrap_or(cfg.runner.tick_rate_ms).max(1);
    let last_step = steps.iter().map(|s| s.at_ms).max().unwrap_or(0);
    if last_step > MAX_SIM_MS {
        return Err(CliError::BadScript(format!(
            "step at {last_step} ms is beyond the {MAX_SIM_MS} ms horizon"
        ))
        .into());
    }
    if let Some(until) = p.until_ms
        && until > MAX_SIM_MS
    {
        return Err(CliError::BadScript(format!(
            "--until-ms {until} is beyond the {MAX_SIM_MS} ms horizon"
        ))
        .into());
    }
    let longest = cfg
        .doors
        .iter()
        .map(|d| d.time_to_open_ms.max(d.time_to_close_ms))
        .max()
        .unwrap_or(0);
    let until = p.until_ms.unwrap_or_else(|| {
        last_step
            .saturating_add(u64::try_from(longest).unwrap_or(0))
            .saturating_add(step_ms)
            .min(MAX_SIM_MS)
    });

    let clock = ManualClock::new();
    let store = doors::build_store(cfg, Arc::new(clock.clone()))?;
    let (tx, rx) = runner::channel();
    let mut est = GarageEstimator::new(
        store.clone(),
        Arc::new(clock.clone()),
        runner::notification_sink(tx),
    );
    let mut stats = RunStats::default();
    if cfg.leadership.start_as_leader {
        est.on_became_leader()?;
    }
    runner::drain(&mut est, &rx, &mut stats);
    tracing::info!(steps = steps.len(), step_ms, until, "simulation started");

    let mut printer = Printer {
        json: p.json,
        last: BTreeMap::new(),
    };
    printer.emit_changes(0, &store);

    let mut pending = steps.iter().zip(targets.iter()).peekable();
    let mut t = 0;
    loop {
        clock.set_ms(t);
        runner::drain(&mut est, &rx, &mut stats);
        if t % step_ms == 0 {
            runner::tick_once(&mut est, &mut stats);
            runner::drain(&mut est, &rx, &mut stats);
        }
        while let Some((step, door)) = pending.next_if(|(s, _)| s.at_ms == t) {
            if let Some(event) = command::apply(&store, door, step.action)? {
                runner::dispatch(&mut est, event, &mut stats);
            }
            runner::drain(&mut est, &rx, &mut stats);
        }
        printer.emit_changes(t, &store);

        let next_tick = (t / step_ms).saturating_add(1).saturating_mul(step_ms);
        let next = pending
            .peek()
            .map_or(next_tick, |(s, _)| s.at_ms.min(next_tick));
        if next > until || next == t {
            break;
        }
        t = next;
    }

    printer.emit_final(&store, &stats);
    Ok(stats)
}
