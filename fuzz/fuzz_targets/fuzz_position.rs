#![no_main]
use libfuzzer_sys::{arbitrary::Arbitrary, fuzz_target};
use std::time::Instant;

use garage_core::position::{estimate_percent, has_arrived};
use garage_core::{Direction, MovingContext, PercentClosed, RatedTimes};

#[derive(Debug, Arbitrary)]
struct Input {
    initial: u8,
    closing: bool,
    open_ms: i64,
    close_ms: i64,
    elapsed_ms: u64,
}

fuzz_target!(|input: Input| {
    let (Some(initial), Some(rated)) = (
        PercentClosed::new(input.initial),
        RatedTimes::new(input.open_ms, input.close_ms),
    ) else {
        return;
    };
    let ctx = MovingContext {
        initial,
        direction: Direction::from_closing_flag(input.closing),
        rated,
        anchor: Instant::now(),
    };
    let p = estimate_percent(&ctx, input.elapsed_ms);
    assert!((0.0..=100.0).contains(&p));
    let _ = has_arrived(p, ctx.direction, ctx.rated);
    let _ = PercentClosed::from_estimate(p);
});
