//! Door position vocabulary and the explicit motion state machine.
//!
//! The store exposes motion as three loose fields (`Moving`, `Closing`,
//! `PercentClosed`). Internally a door is always exactly one `DoorMotion`
//! variant; translation happens only when reading a notification snapshot and
//! when a `PressPlan` is turned into writes.

use std::time::Instant;

use garage_traits::Value;

const QUANTIZE_EPSILON: f64 = 1e-6;

/// Position estimate: 0 = fully open, 100 = fully closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct PercentClosed(u8);

impl PercentClosed {
    pub const OPEN: Self = Self(0);
    pub const CLOSED: Self = Self(100);

    pub fn new(v: u8) -> Option<Self> {
        (v <= 100).then_some(Self(v))
    }

    /// Accept a stored integer only when it is a valid percentage.
    pub fn from_i64(v: i64) -> Option<Self> {
        u8::try_from(v).ok().and_then(Self::new)
    }

    /// Quantize a continuous estimate: clamp to [0, 100] and truncate.
    /// NaN maps to fully open. Float noise just below an integer rounds up,
    /// so resuming from 29% never reads back as 28%.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn from_estimate(v: f64) -> Self {
        if v.is_nan() {
            return Self::OPEN;
        }
        Self((v + QUANTIZE_EPSILON).clamp(0.0, 100.0) as u8)
    }

    #[inline]
    pub fn get(self) -> u8 {
        self.0
    }

    #[inline]
    pub fn is_open(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub fn is_closed(self) -> bool {
        self.0 == 100
    }

    #[inline]
    pub fn is_extreme(self) -> bool {
        self.is_open() || self.is_closed()
    }

    /// Fraction of full travel toward closed, in [0, 1].
    #[inline]
    pub fn fraction(self) -> f64 {
        f64::from(self.0) / 100.0
    }
}

impl From<PercentClosed> for Value {
    fn from(p: PercentClosed) -> Self {
        Value::Int(i64::from(p.0))
    }
}

impl core::fmt::Display for PercentClosed {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}%", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Opening,
    Closing,
}

impl Direction {
    #[inline]
    pub fn from_closing_flag(closing: bool) -> Self {
        if closing {
            Direction::Closing
        } else {
            Direction::Opening
        }
    }

    #[inline]
    pub fn is_closing(self) -> bool {
        matches!(self, Direction::Closing)
    }

    /// The extreme this direction travels toward.
    pub fn target(self) -> PercentClosed {
        match self {
            Direction::Opening => PercentClosed::OPEN,
            Direction::Closing => PercentClosed::CLOSED,
        }
    }

    pub fn reversed(self) -> Self {
        match self {
            Direction::Opening => Direction::Closing,
            Direction::Closing => Direction::Opening,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Direction::Opening => "opening",
            Direction::Closing => "closing",
        }
    }
}

/// Validated full-travel times. Both are strictly positive by construction,
/// so position math never divides by zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RatedTimes {
    to_open_ms: u64,
    to_close_ms: u64,
}

impl RatedTimes {
    /// None if either time is not strictly positive.
    pub fn new(to_open_ms: i64, to_close_ms: i64) -> Option<Self> {
        let to_open_ms = u64::try_from(to_open_ms).ok().filter(|v| *v > 0)?;
        let to_close_ms = u64::try_from(to_close_ms).ok().filter(|v| *v > 0)?;
        Some(Self {
            to_open_ms,
            to_close_ms,
        })
    }

    #[inline]
    pub fn to_open_ms(self) -> u64 {
        self.to_open_ms
    }

    #[inline]
    pub fn to_close_ms(self) -> u64 {
        self.to_close_ms
    }

    #[inline]
    pub fn for_direction(self, direction: Direction) -> u64 {
        match direction {
            Direction::Opening => self.to_open_ms,
            Direction::Closing => self.to_close_ms,
        }
    }
}

/// Authoritative contact-sensor reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoorStatus {
    Closed,
    /// Anything other than a confirmed closure.
    Opened,
}

impl DoorStatus {
    pub fn from_is_closed(is_closed: bool) -> Self {
        if is_closed {
            DoorStatus::Closed
        } else {
            DoorStatus::Opened
        }
    }
}

/// What the estimator believes a door is doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoorMotion {
    /// At rest at an extreme (`at` is `OPEN` or `CLOSED`).
    Stationary { at: PercentClosed },
    /// Stopped mid-travel; `last` is the direction it was moving in.
    Paused {
        percent: PercentClosed,
        last: Direction,
    },
    /// In transit; `anchor` is the write time of the `Moving=true` that
    /// started the current segment, `percent` the latest estimate.
    InTransit {
        direction: Direction,
        anchor: Instant,
        percent: PercentClosed,
    },
}

impl DoorMotion {
    /// Translate the store's three fields into a motion state.
    pub fn observe(
        moving: bool,
        closing: bool,
        percent: PercentClosed,
        moving_written_at: Instant,
    ) -> Self {
        let direction = Direction::from_closing_flag(closing);
        if moving {
            DoorMotion::InTransit {
                direction,
                anchor: moving_written_at,
                percent,
            }
        } else if percent.is_extreme() {
            DoorMotion::Stationary { at: percent }
        } else {
            DoorMotion::Paused {
                percent,
                last: direction,
            }
        }
    }

    pub fn percent(&self) -> PercentClosed {
        match *self {
            DoorMotion::Stationary { at } => at,
            DoorMotion::Paused { percent, .. } | DoorMotion::InTransit { percent, .. } => percent,
        }
    }

    /// Decide what a button press does in this state.
    pub fn plan(&self, press: Press) -> PressPlan {
        match (*self, press) {
            (DoorMotion::InTransit { anchor, percent, .. }, _) => PressPlan::Pause {
                // Exact position known at an extreme: nothing to preserve.
                preserve_anchor: (!percent.is_extreme()).then_some(anchor),
            },
            (DoorMotion::Stationary { at }, Press::Open) if at.is_open() => PressPlan::Ignore,
            (DoorMotion::Stationary { at }, Press::Close) if at.is_closed() => PressPlan::Ignore,
            (_, Press::Open) => PressPlan::Start(Direction::Opening),
            (_, Press::Close) => PressPlan::Start(Direction::Closing),
            (DoorMotion::Stationary { at }, Press::Toggle) => {
                if at.is_closed() {
                    PressPlan::Start(Direction::Opening)
                } else {
                    PressPlan::Start(Direction::Closing)
                }
            }
            (DoorMotion::Paused { last, .. }, Press::Toggle) => PressPlan::Start(last.reversed()),
        }
    }
}

/// A discrete button press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Press {
    Open,
    Close,
    /// Single-button opener: pause, or move opposite to the last direction.
    Toggle,
}

impl Press {
    pub fn name(self) -> &'static str {
        match self {
            Press::Open => "open",
            Press::Close => "close",
            Press::Toggle => "toggle",
        }
    }
}

/// Writes a press translates into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PressPlan {
    /// `Moving=false`, keeping `preserve_anchor` as its write time when set.
    Pause { preserve_anchor: Option<Instant> },
    /// `Closing=direction`, then `Moving=true` with a fresh time.
    Start(Direction),
    /// Already at the extreme the press heads toward.
    Ignore,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn pc(v: u8) -> PercentClosed {
        PercentClosed::new(v).unwrap()
    }

    #[test]
    fn percent_rejects_out_of_range() {
        assert_eq!(PercentClosed::from_i64(-1), None);
        assert_eq!(PercentClosed::from_i64(101), None);
        assert_eq!(PercentClosed::from_i64(100), Some(PercentClosed::CLOSED));
    }

    #[test]
    fn estimate_is_clamped_and_truncated() {
        assert_eq!(PercentClosed::from_estimate(-3.0), PercentClosed::OPEN);
        assert_eq!(PercentClosed::from_estimate(100.7), PercentClosed::CLOSED);
        assert_eq!(PercentClosed::from_estimate(49.99), pc(49));
        assert_eq!(PercentClosed::from_estimate(f64::NAN), PercentClosed::OPEN);
        assert_eq!(PercentClosed::from_estimate(28.999_999_999_9), pc(29));
    }

    #[rstest]
    #[case(0, 8000, false)]
    #[case(10000, -1, false)]
    #[case(10000, 8000, true)]
    fn rated_times_require_positive(#[case] open: i64, #[case] close: i64, #[case] ok: bool) {
        assert_eq!(RatedTimes::new(open, close).is_some(), ok);
    }

    #[test]
    fn observe_distinguishes_paused_from_stationary() {
        let t = Instant::now();
        assert_eq!(
            DoorMotion::observe(false, true, pc(100), t),
            DoorMotion::Stationary { at: pc(100) }
        );
        assert_eq!(
            DoorMotion::observe(false, true, pc(40), t),
            DoorMotion::Paused {
                percent: pc(40),
                last: Direction::Closing
            }
        );
        assert!(matches!(
            DoorMotion::observe(true, false, pc(40), t),
            DoorMotion::InTransit {
                direction: Direction::Opening,
                ..
            }
        ));
    }

    #[rstest]
    #[case(false, false, 0, Press::Close, PressPlan::Start(Direction::Closing))]
    #[case(false, false, 0, Press::Open, PressPlan::Ignore)]
    #[case(false, false, 100, Press::Close, PressPlan::Ignore)]
    #[case(false, false, 100, Press::Open, PressPlan::Start(Direction::Opening))]
    #[case(false, true, 40, Press::Open, PressPlan::Start(Direction::Opening))]
    #[case(false, true, 40, Press::Toggle, PressPlan::Start(Direction::Opening))]
    #[case(false, false, 40, Press::Toggle, PressPlan::Start(Direction::Closing))]
    #[case(false, false, 100, Press::Toggle, PressPlan::Start(Direction::Opening))]
    #[case(false, true, 0, Press::Toggle, PressPlan::Start(Direction::Closing))]
    fn stationary_and_paused_presses(
        #[case] moving: bool,
        #[case] closing: bool,
        #[case] percent: u8,
        #[case] press: Press,
        #[case] expected: PressPlan,
    ) {
        let motion = DoorMotion::observe(moving, closing, pc(percent), Instant::now());
        assert_eq!(motion.plan(press), expected);
    }

    #[rstest]
    #[case(Press::Open)]
    #[case(Press::Close)]
    #[case(Press::Toggle)]
    fn any_press_pauses_a_moving_door(#[case] press: Press) {
        let anchor = Instant::now();
        let mid = DoorMotion::observe(true, true, pc(25), anchor);
        assert_eq!(
            mid.plan(press),
            PressPlan::Pause {
                preserve_anchor: Some(anchor)
            }
        );
        let at_end = DoorMotion::observe(true, true, pc(100), anchor);
        assert_eq!(
            at_end.plan(press),
            PressPlan::Pause {
                preserve_anchor: None
            }
        );
    }
}
