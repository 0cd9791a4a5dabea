#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema and measured-travel parsing for the garage estimator.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//! - The travel CSV loader enforces headers and takes the median of measured
//!   runs per door and direction, so one slow run does not skew the rating.
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};

/// Upper bound for any rated travel time.
const MAX_RATED_MS: i64 = 10 * 60 * 1000;

/// Environment variable overriding `runner.tick_rate_ms`.
pub const TICK_RATE_ENV: &str = "TICK_RATE_MS";

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RunnerCfg {
    /// Period of the position recompute loop (ms).
    pub tick_rate_ms: u64,
}

impl Default for RunnerCfg {
    fn default() -> Self {
        Self { tick_rate_ms: 100 }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LeadershipCfg {
    /// Single-process deployments lead immediately.
    pub start_as_leader: bool,
}

impl Default for LeadershipCfg {
    fn default() -> Self {
        Self {
            start_as_leader: true,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DoorCfg {
    /// Stored trimmed; store keys and CSV lookups use it as-is.
    #[serde(deserialize_with = "trimmed")]
    pub id: String,
    pub time_to_open_ms: i64,
    pub time_to_close_ms: i64,
    /// Seed position for the in-memory store; defaults to fully closed.
    #[serde(default = "default_percent_closed")]
    pub initial_percent_closed: i64,
}

fn trimmed<'de, D: serde::Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    String::deserialize(d).map(|s| s.trim().to_string())
}

fn default_percent_closed() -> i64 {
    100
}

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub runner: RunnerCfg,
    #[serde(default)]
    pub leadership: LeadershipCfg,
    #[serde(default)]
    pub logging: Logging,
    #[serde(default)]
    pub doors: Vec<DoorCfg>,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Runner
        if self.runner.tick_rate_ms == 0 {
            eyre::bail!("runner.tick_rate_ms must be >= 1");
        }
        if self.runner.tick_rate_ms > 60_000 {
            eyre::bail!("runner.tick_rate_ms is unreasonably large (>60s)");
        }

        // Doors
        if self.doors.is_empty() {
            eyre::bail!("at least one [[doors]] entry is required");
        }
        let mut seen = HashSet::new();
        for door in &self.doors {
            let id = door.id.trim();
            if id.is_empty() {
                eyre::bail!("doors.id must not be empty");
            }
            if !seen.insert(id) {
                eyre::bail!("doors.id '{id}' is duplicated");
            }
            if door.time_to_open_ms <= 0 {
                eyre::bail!("doors.{id}.time_to_open_ms must be > 0");
            }
            if door.time_to_close_ms <= 0 {
                eyre::bail!("doors.{id}.time_to_close_ms must be > 0");
            }
            if door.time_to_open_ms > MAX_RATED_MS || door.time_to_close_ms > MAX_RATED_MS {
                eyre::bail!("doors.{id} rated travel time is unreasonably large (>10min)");
            }
            if !(0..=100).contains(&door.initial_percent_closed) {
                eyre::bail!("doors.{id}.initial_percent_closed must be in [0, 100]");
            }
        }

        // Logging
        if let Some(rotation) = self.logging.rotation.as_deref()
            && !matches!(rotation, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly");
        }

        Ok(())
    }

    /// Apply process-environment overrides (`TICK_RATE_MS`).
    pub fn apply_env_overrides(&mut self) {
        self.apply_env(|k| std::env::var(k).ok());
    }

    /// Apply overrides from an arbitrary lookup. Unparseable values are ignored.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(ms) = lookup(TICK_RATE_ENV).and_then(|v| v.trim().parse::<u64>().ok()) {
            self.runner.tick_rate_ms = ms;
        }
    }

    /// Look up a door; ids compare with surrounding whitespace ignored.
    pub fn door(&self, id: &str) -> Option<&DoorCfg> {
        let id = id.trim();
        self.doors.iter().find(|d| d.id.trim() == id)
    }

    /// Replace rated times with measured ones. Every rating must name a configured door.
    pub fn apply_travel_ratings(&mut self, ratings: &[TravelRating]) -> eyre::Result<()> {
        for rating in ratings {
            let wanted = rating.door.trim();
            let Some(door) = self.doors.iter_mut().find(|d| d.id.trim() == wanted) else {
                eyre::bail!("travel CSV names unknown door '{}'", rating.door);
            };
            door.time_to_open_ms = rating.time_to_open_ms;
            door.time_to_close_ms = rating.time_to_close_ms;
        }
        Ok(())
    }
}

/// Travel CSV schema.
///
/// Expected headers:
/// door,direction,ms
///
/// Example:
/// door,direction,ms
/// main,close,8120
/// main,open,10040
#[derive(Debug, Deserialize, Clone)]
pub struct TravelRow {
    pub door: String,
    pub direction: TravelDirection,
    pub ms: i64,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TravelDirection {
    Open,
    Close,
}

/// Rated times derived from measurements for one door.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TravelRating {
    pub door: String,
    pub time_to_open_ms: i64,
    pub time_to_close_ms: i64,
}

/// Median of measured runs, rounding down between the two middle values.
fn median_ms(mut runs: Vec<i64>) -> Option<i64> {
    if runs.is_empty() {
        return None;
    }
    runs.sort_unstable();
    let mid = runs.len() / 2;
    if runs.len() % 2 == 1 {
        Some(runs[mid])
    } else {
        Some(runs[mid - 1] + (runs[mid] - runs[mid - 1]) / 2)
    }
}

pub fn ratings_from_rows(rows: Vec<TravelRow>) -> eyre::Result<Vec<TravelRating>> {
    if rows.is_empty() {
        eyre::bail!("travel CSV has no measurements");
    }

    let mut runs: BTreeMap<String, (Vec<i64>, Vec<i64>)> = BTreeMap::new();
    for (idx, row) in rows.into_iter().enumerate() {
        if row.ms <= 0 {
            eyre::bail!("invalid CSV row {}: ms must be > 0", idx + 2);
        }
        let entry = runs.entry(row.door.trim().to_string()).or_default();
        match row.direction {
            TravelDirection::Open => entry.0.push(row.ms),
            TravelDirection::Close => entry.1.push(row.ms),
        }
    }

    let mut out = Vec::with_capacity(runs.len());
    for (door, (open, close)) in runs {
        let Some(time_to_open_ms) = median_ms(open) else {
            eyre::bail!("travel CSV has no 'open' measurement for door '{door}'");
        };
        let Some(time_to_close_ms) = median_ms(close) else {
            eyre::bail!("travel CSV has no 'close' measurement for door '{door}'");
        };
        out.push(TravelRating {
            door,
            time_to_open_ms,
            time_to_close_ms,
        });
    }
    Ok(out)
}

pub fn load_travel_csv(path: &std::path::Path) -> eyre::Result<Vec<TravelRating>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| eyre::eyre!("open travel CSV {:?}: {}", path, e))?;

    // Enforce exact headers
    let headers = rdr
        .headers()
        .map_err(|e| eyre::eyre!("read CSV headers {:?}: {}", path, e))?
        .clone();
    let expected = ["door", "direction", "ms"];
    let actual: Vec<String> = headers.iter().map(ToString::to_string).collect();
    if actual != expected {
        eyre::bail!(
            "travel CSV must have headers 'door,direction,ms', got: {}",
            actual.join(",")
        );
    }

    let mut rows = Vec::new();
    for (idx, rec) in rdr.deserialize::<TravelRow>().enumerate() {
        match rec {
            Ok(row) => rows.push(row),
            Err(e) => {
                eyre::bail!("invalid CSV row {}: {}", idx + 2, e);
            }
        }
    }

    ratings_from_rows(rows)
}
