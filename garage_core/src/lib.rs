#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Garage door position estimator (store-agnostic).
//!
//! A garage door opener has no position sensor, only buttons and a contact
//! sensor at the closed end. This crate turns those discrete events plus
//! elapsed time into a continuous percent-closed estimate. All entity access
//! goes through `garage_traits::EntityStore`.
//!
//! ## Architecture
//!
//! - **Door vocabulary**: `PercentClosed`, `Direction`, `RatedTimes` and the
//!   `DoorMotion` state machine (`door` module)
//! - **Moving contexts**: per-door segment anchors (`context` module)
//! - **Position math**: pure functions of a context and elapsed time (`position`)
//! - **Estimator**: event handlers, periodic tick, leadership (`estimator`)
//! - **Runner**: single-owner crossbeam event loop (`runner`)
//!
//! ## Timing
//!
//! Elapsed time is always measured from a store write time through the
//! injected `Clock`, so a `ManualClock` shared with the store makes every
//! scenario deterministic.

pub mod context;
pub mod conversions;
pub mod door;
pub mod error;
pub mod estimator;
pub mod position;
pub mod runner;
pub mod status;
pub mod store_error;
pub mod util;

pub use context::{ContextTable, MovingContext};
pub use door::{Direction, DoorMotion, DoorStatus, PercentClosed, Press, PressPlan, RatedTimes};
pub use error::EstimatorError;
pub use estimator::GarageEstimator;
pub use runner::{RunStats, RunnerCfg, RunnerEvent};
pub use status::{DoorProgress, TickReport};
