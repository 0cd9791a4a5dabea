//! Live mode: real clock, Ctrl-C shutdown, and a line-oriented stdin driver.

use std::collections::HashMap;
use std::io::BufRead;
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel as xch;
use eyre::WrapErr;
use garage_config::Config;
use garage_core::runner::{self, RunStats, RunnerCfg, RunnerEvent};
use garage_core::{DoorProgress, GarageEstimator, TickReport};
use garage_store::InMemoryStore;
use garage_traits::{Clock, DoorId, MonotonicClock};

use crate::command::{self, Action};
use crate::doors;

/// Parse one stdin line: `<action> [door]`, `status`, or `quit`.
enum Line {
    Act(Action, Option<DoorId>),
    Status,
    Quit,
}

fn parse_line(line: &str) -> Option<Result<Line, crate::cli::CliError>> {
    let mut words = line.split_whitespace();
    let first = words.next()?;
    Some(match first {
        "quit" | "exit" => Ok(Line::Quit),
        "status" => Ok(Line::Status),
        other => other
            .parse::<Action>()
            .map(|a| Line::Act(a, words.next().map(DoorId::from))),
    })
}

fn print_status(store: &InMemoryStore, json: bool) {
    for door in store.doors() {
        if let Some(snap) = store.snapshot(&door) {
            if json {
                println!("{}", doors::render_json(&door, &snap));
            } else {
                println!("{}", doors::render(&door, &snap));
            }
        }
    }
}

fn spawn_stdin_driver(
    store: InMemoryStore,
    tx: xch::Sender<RunnerEvent>,
    default_door: DoorId,
    json: bool,
) {
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else {
                break;
            };
            let parsed = match parse_line(&line) {
                None => continue,
                Some(Ok(parsed)) => parsed,
                Some(Err(e)) => {
                    eprintln!("{e}");
                    continue;
                }
            };
            match parsed {
                Line::Quit => {
                    let _ = tx.send(RunnerEvent::Shutdown);
                    break;
                }
                Line::Status => print_status(&store, json),
                Line::Act(action, door) => {
                    let door = door.unwrap_or_else(|| default_door.clone());
                    match command::apply(&store, &door, action) {
                        Ok(Some(event)) => {
                            if tx.send(event).is_err() {
                                break;
                            }
                        }
                        Ok(None) => {}
                        Err(e) => eprintln!("{door}: {e}"),
                    }
                }
            }
        }
        // EOF leaves the runner going; services often run with stdin closed.
        tracing::debug!("stdin driver exiting");
    });
}

fn print_progress(report: &TickReport, json: bool, last: &mut HashMap<DoorId, DoorProgress>) {
    for (door, progress) in &report.progress {
        if last.get(door) == Some(progress) {
            continue;
        }
        let state = match progress {
            DoorProgress::Moving(_) => "moving",
            DoorProgress::Arrived(_) => "arrived",
        };
        let percent = progress.percent().get();
        if json {
            println!(
                "{}",
                serde_json::json!({ "door": door.as_str(), "percent_closed": percent, "state": state })
            );
        } else {
            println!("{door} {percent}% {state}");
        }
        last.insert(door.clone(), *progress);
    }
    for (door, e) in &report.failures {
        if json {
            println!(
                "{}",
                serde_json::json!({ "door": door.as_str(), "error": e.to_string() })
            );
        } else {
            println!("{door} write failed: {e}");
        }
    }
}

pub fn run_live(
    cfg: &Config,
    duration_ms: Option<u64>,
    follower: bool,
    json: bool,
) -> eyre::Result<RunStats> {
    let clock: Arc<dyn Clock + Send + Sync> = Arc::new(MonotonicClock::new());
    let store = doors::build_store(cfg, clock.clone())?;
    let (tx, rx) = runner::channel();
    let mut est = GarageEstimator::new(store.clone(), clock, runner::notification_sink(tx.clone()));

    if cfg.leadership.start_as_leader && !follower {
        est.on_became_leader()?;
    }

    {
        let tx = tx.clone();
        ctrlc::set_handler(move || {
            let _ = tx.send(RunnerEvent::Shutdown);
        })
        .wrap_err("install Ctrl-C handler")?;
    }
    if let Some(ms) = duration_ms {
        let tx = tx.clone();
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(ms));
            let _ = tx.send(RunnerEvent::Shutdown);
        });
    }

    let default_door = cfg
        .doors
        .first()
        .map(|d| DoorId::from(d.id.as_str()))
        .ok_or_else(|| crate::cli::CliError::Config("no doors configured".into()))?;
    spawn_stdin_driver(store.clone(), tx, default_door, json);

    let mut last = HashMap::new();
    let stats = runner::run(&mut est, &rx, RunnerCfg::from(&cfg.runner), |report| {
        print_progress(report, json, &mut last);
    });

    if json {
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
            "stopped: ticks={} notifications={} rejected={} write_failures={}",
            stats.ticks, stats.notifications, stats.rejected, stats.write_failures
        );
    }
    Ok(stats)
}
