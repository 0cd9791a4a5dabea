//! Pure position math for a door in transit.
//!
//! `elapsed_before_resume_ms` uses the rated time of the direction being
//! traveled: a door at 60% closed that starts opening has 60% of its opening
//! travel still ahead, i.e. 40% of `T_open` already behind it.
use crate::context::MovingContext;
use crate::door::{Direction, PercentClosed, RatedTimes};

/// Travel time already consumed in this direction before the anchor.
#[allow(clippy::cast_precision_loss)]
pub fn elapsed_before_resume_ms(initial: PercentClosed, direction: Direction, rated: RatedTimes) -> f64 {
    let total = rated.for_direction(direction) as f64;
    match direction {
        Direction::Closing => initial.fraction() * total,
        Direction::Opening => (1.0 - initial.fraction()) * total,
    }
}

/// Travel time left in this direction, never negative.
#[allow(clippy::cast_precision_loss)]
pub fn remaining_ms(ctx: &MovingContext, elapsed_since_anchor_ms: u64) -> f64 {
    let total = ctx.rated.for_direction(ctx.direction) as f64;
    let before = elapsed_before_resume_ms(ctx.initial, ctx.direction, ctx.rated);
    (total - (before + elapsed_since_anchor_ms as f64)).max(0.0)
}

/// Continuous percent-closed estimate, clamped to [0, 100].
#[allow(clippy::cast_precision_loss)]
pub fn estimate_percent(ctx: &MovingContext, elapsed_since_anchor_ms: u64) -> f64 {
    let total = ctx.rated.for_direction(ctx.direction) as f64;
    let remaining = remaining_ms(ctx, elapsed_since_anchor_ms);
    let percent = match ctx.direction {
        Direction::Closing => (total - remaining) / total * 100.0,
        Direction::Opening => remaining / total * 100.0,
    };
    percent.clamp(0.0, 100.0)
}

/// True when `estimate` is within `1 / T` of the direction's target.
#[allow(clippy::cast_precision_loss)]
pub fn has_arrived(estimate: f64, direction: Direction, rated: RatedTimes) -> bool {
    let tolerance = 1.0 / rated.for_direction(direction) as f64;
    let target = f64::from(direction.target().get());
    (estimate - target).abs() < tolerance
}
