//! Common time/period helpers for garage_core.
use std::time::Duration;

/// Number of milliseconds in one second.
pub const MILLIS_PER_SEC: u64 = 1_000;

/// Tick period for a configured rate in milliseconds.
/// - Clamps to at least 1 ms so `crossbeam_channel::tick` never spins.
#[inline]
pub fn tick_period(tick_rate_ms: u64) -> Duration {
    Duration::from_millis(tick_rate_ms.max(1))
}

/// Ticks per second for a period, for log output.
#[inline]
pub fn ticks_per_sec(tick_rate_ms: u64) -> u64 {
    (MILLIS_PER_SEC / tick_rate_ms.max(1)).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_rate_is_clamped() {
        assert_eq!(tick_period(0), Duration::from_millis(1));
        assert_eq!(ticks_per_sec(0), 1_000);
        assert_eq!(ticks_per_sec(100), 10);
        assert_eq!(ticks_per_sec(5_000), 1);
    }
}
