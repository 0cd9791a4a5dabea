mod cli;
mod command;
mod doors;
mod error_fmt;
mod run;
mod simulate;

use std::path::Path;

use clap::Parser;
use eyre::WrapErr;
use garage_config::Config;
use garage_core::RatedTimes;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::cli::{Cli, CliError, Commands, FILE_GUARD, JSON_MODE};

fn main() {
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);
    let _ = color_eyre::install();

    if let Err(e) = real_main(cli) {
        if cli::json_mode() {
            eprintln!("{}", error_fmt::format_error_json(&e));
        } else {
            eprintln!("error: {}", error_fmt::humanize(&e));
        }
        std::process::exit(error_fmt::exit_code_for_error(&e));
    }
}

fn real_main(cli: Cli) -> eyre::Result<()> {
    let cfg = load_config(&cli.config, cli.travel_csv.as_deref())?;
    init_tracing(cli.json, cli.log_level.as_deref(), &cfg.logging)?;

    match cli.cmd {
        Commands::Run {
            duration_ms,
            follower,
        } => {
            run::run_live(&cfg, duration_ms, follower, cli.json)?;
        }
        Commands::Simulate {
            script,
            door,
            until_ms,
            step_ms,
        } => {
            simulate::simulate(
                &cfg,
                &simulate::SimParams {
                    script: &script,
                    door: door.as_deref(),
                    until_ms,
                    step_ms,
                    json: cli.json,
                },
            )?;
        }
        Commands::SelfCheck => self_check(&cfg, cli.json)?,
    }
    Ok(())
}

fn toml_error(path: &Path, text: &str, e: &toml::de::Error) -> CliError {
    let line = e
        .span()
        .map(|span| text[..span.start.min(text.len())].lines().count().max(1));
    match line {
        Some(line) => CliError::Config(format!("{}:{line}: {}", path.display(), e.message())),
        None => CliError::Config(format!("{}: {}", path.display(), e.message())),
    }
}

/// Read, override, and validate the config; travel ratings replace rated times.
fn load_config(path: &Path, travel_csv: Option<&Path>) -> eyre::Result<Config> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| CliError::Config(format!("read {}: {e}", path.display())))?;
    let mut cfg = garage_config::load_toml(&text).map_err(|e| toml_error(path, &text, &e))?;
    cfg.apply_env_overrides();

    if let Some(csv) = travel_csv {
        let ratings = garage_config::load_travel_csv(csv)?;
        cfg.apply_travel_ratings(&ratings)?;
    }

    cfg.validate()
        .map_err(|e| CliError::Config(e.to_string()))?;
    Ok(cfg)
}

fn init_tracing(
    json: bool,
    cli_level: Option<&str>,
    logging: &garage_config::Logging,
) -> eyre::Result<()> {
    let level = cli_level
        .or(logging.level.as_deref())
        .unwrap_or("info");
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = match logging.file.as_deref() {
        Some(file) => {
            let path = Path::new(file);
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .ok_or_else(|| CliError::Config("logging.file must name a file".into()))?;
            let appender = match logging.rotation.as_deref() {
                Some("daily") => tracing_appender::rolling::daily(dir, name),
                Some("hourly") => tracing_appender::rolling::hourly(dir, name),
                _ => tracing_appender::rolling::never(dir, name),
            };
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let _ = FILE_GUARD.set(guard);
            Some(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(writer)
                    .with_ansi(false),
            )
        }
        None => None,
    };

    // Console logs go to stderr; stdout carries command output.
    let registry = tracing_subscriber::registry().with(filter).with(file_layer);
    let res = if json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .try_init()
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init()
    };
    res.wrap_err("initialize tracing")
}

fn self_check(cfg: &Config, json: bool) -> eyre::Result<()> {
    let mut doors = Vec::with_capacity(cfg.doors.len());
    for door in &cfg.doors {
        let rated = RatedTimes::try_from(door)?;
        let percent = garage_core::conversions::initial_percent(door)?;
        doors.push((door.id.as_str(), rated, percent));
    }

    if json {
        let list: Vec<_> = doors
            .iter()
            .map(|(id, rated, percent)| {
                serde_json::json!({
                    "door": id,
                    "time_to_open_ms": rated.to_open_ms(),
                    "time_to_close_ms": rated.to_close_ms(),
                    "percent_closed": percent.get(),
                })
            })
            .collect();
        println!(
            "{}",
            serde_json::json!({
                "ok": true,
                "tick_rate_ms": cfg.runner.tick_rate_ms,
                "doors": list,
            })
        );
    } else {
        println!(
            "ok: {} door(s), tick every {} ms ({}/s)",
            doors.len(),
            cfg.runner.tick_rate_ms,
            garage_core::util::ticks_per_sec(cfg.runner.tick_rate_ms)
        );
        for (id, rated, percent) in &doors {
            println!(
                "  {id}: open {} ms, close {} ms, at {percent}",
                rated.to_open_ms(),
                rated.to_close_ms()
            );
        }
    }
    Ok(())
}
