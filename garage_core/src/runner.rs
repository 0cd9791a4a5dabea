//! Single-owner runner for the estimator.
//!
//! One thread owns the `GarageEstimator`; notifications, leadership changes
//! and shutdown arrive over a crossbeam channel and are serialized with the
//! periodic tick, so the moving-context table never needs a lock.
//!
//! The event channel is unbounded: the store invokes the sink while holding
//! its own lock, and the runner thread itself writes to the store, so a
//! bounded channel could block the writer on its own notifications.
use crossbeam_channel as xch;
use garage_traits::{EntityStore, Notification, NotificationSink};
use std::sync::Arc;
use std::time::Duration;

use crate::error::EstimatorError;
use crate::estimator::GarageEstimator;
use crate::status::TickReport;

#[derive(Debug)]
pub enum RunnerEvent {
    Notification(Notification),
    BecameLeader,
    LostLeadership,
    Shutdown,
}

#[derive(Debug, Clone, Copy)]
pub struct RunnerCfg {
    pub tick_period: Duration,
}

impl Default for RunnerCfg {
    fn default() -> Self {
        Self {
            tick_period: Duration::from_millis(100),
        }
    }
}

/// Counters returned when the runner stops.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunStats {
    pub ticks: u64,
    pub notifications: u64,
    /// Notifications whose handler returned an error.
    pub rejected: u64,
    pub write_failures: u64,
}

/// Create the channel pair used by the store sink and the runner.
pub fn channel() -> (xch::Sender<RunnerEvent>, xch::Receiver<RunnerEvent>) {
    xch::unbounded()
}

/// Sink forwarding store notifications into the runner's channel.
pub fn notification_sink(tx: xch::Sender<RunnerEvent>) -> NotificationSink {
    Arc::new(move |n| {
        // If send fails, the runner is gone and there is nobody to notify.
        if tx.send(RunnerEvent::Notification(n)).is_err() {
            tracing::trace!("runner disconnected; notification dropped");
        }
    })
}

fn log_handler_error(e: &EstimatorError) {
    if e.is_input_error() {
        tracing::warn!(error = %e, "notification discarded");
    } else {
        tracing::error!(error = %e, "notification handling failed");
    }
}

/// Apply one event. Returns `false` once shutdown is requested.
pub fn dispatch<S: EntityStore>(
    estimator: &mut GarageEstimator<S>,
    event: RunnerEvent,
    stats: &mut RunStats,
) -> bool {
    match event {
        RunnerEvent::Notification(n) => {
            stats.notifications += 1;
            if let Err(e) = estimator.handle(&n) {
                stats.rejected += 1;
                log_handler_error(&e);
            }
        }
        RunnerEvent::BecameLeader => {
            if let Err(e) = estimator.on_became_leader() {
                tracing::error!(error = %e, "failed to subscribe after acquiring leadership");
            }
        }
        RunnerEvent::LostLeadership => estimator.on_lost_leadership(),
        RunnerEvent::Shutdown => {
            tracing::debug!("runner received shutdown");
            return false;
        }
    }
    true
}

/// Handle everything already queued, including notifications produced by
/// the handlers' own writes. Returns `false` if shutdown was seen.
pub fn drain<S: EntityStore>(
    estimator: &mut GarageEstimator<S>,
    rx: &xch::Receiver<RunnerEvent>,
    stats: &mut RunStats,
) -> bool {
    while let Ok(event) = rx.try_recv() {
        if !dispatch(estimator, event, stats) {
            return false;
        }
    }
    true
}

/// Run one recompute and account for it.
pub fn tick_once<S: EntityStore>(
    estimator: &mut GarageEstimator<S>,
    stats: &mut RunStats,
) -> TickReport {
    stats.ticks += 1;
    let report = estimator.tick();
    for (door, e) in &report.failures {
        stats.write_failures += 1;
        tracing::error!(door = %door, error = %e, "estimate write failed");
    }
    report
}

/// Serve events and ticks until shutdown or until every sender is dropped.
pub fn run<S: EntityStore>(
    estimator: &mut GarageEstimator<S>,
    rx: &xch::Receiver<RunnerEvent>,
    cfg: RunnerCfg,
    mut on_tick: impl FnMut(&TickReport),
) -> RunStats {
    let mut stats = RunStats::default();
    let ticker = xch::tick(cfg.tick_period);
    tracing::info!(tick_ms = cfg.tick_period.as_millis(), "runner started");

    loop {
        xch::select! {
            recv(rx) -> msg => match msg {
                Ok(event) => {
                    if !dispatch(estimator, event, &mut stats) {
                        break;
                    }
                }
                Err(_) => {
                    tracing::debug!("event channel closed");
                    break;
                }
            },
            recv(ticker) -> _ => {
                // Arrivals written by the previous tick must be seen first.
                if !drain(estimator, rx, &mut stats) {
                    break;
                }
                let report = tick_once(estimator, &mut stats);
                on_tick(&report);
            }
        }
    }

    tracing::info!(
        ticks = stats.ticks,
        notifications = stats.notifications,
        rejected = stats.rejected,
        write_failures = stats.write_failures,
        "runner stopped"
    );
    stats
}
