/// Simulated time for the hierarchical simulation kernel.
///
/// Time is a count of ticks expressed in the run's declared [`TimeUnit`].
/// It advances only when the driver moves to the next scheduled instant,
/// never from wall-clock observation.

use serde::{Deserialize, Serialize};

// ── Time unit ─────────────────────────────────────────────────────────

/// The unit in which every tick of a run is expressed.
///
/// An architecture declares exactly one unit; every atomic descriptor in it
/// must agree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    Nanoseconds,
    Microseconds,
    Milliseconds,
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl TimeUnit {
    /// Short suffix used when printing times.
    pub fn suffix(self) -> &'static str {
        match self {
            TimeUnit::Nanoseconds => "ns",
            TimeUnit::Microseconds => "us",
            TimeUnit::Milliseconds => "ms",
            TimeUnit::Seconds => "s",
            TimeUnit::Minutes => "min",
            TimeUnit::Hours => "h",
            TimeUnit::Days => "d",
        }
    }
}

impl std::fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.suffix())
    }
}

// ── SimTime ───────────────────────────────────────────────────────────

/// A point in simulated time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SimTime(u64);

impl SimTime {
    /// The zero-point of simulated time.
    pub const ZERO: SimTime = SimTime(0);

    #[inline]
    pub fn new(ticks: u64) -> Self {
        SimTime(ticks)
    }

    #[inline]
    pub fn ticks(self) -> u64 {
        self.0
    }

    /// The instant `delta` after `self`.
    ///
    /// Returns `None` when `delta` is infinite or the addition overflows;
    /// both mean "never".
    #[inline]
    pub fn advance(self, delta: Duration) -> Option<SimTime> {
        match delta {
            Duration::Finite(d) => self.0.checked_add(d).map(SimTime),
            Duration::Infinite => None,
        }
    }

    /// Duration elapsed between `earlier` and `self`.
    /// Returns `None` if `earlier` is after `self`.
    #[inline]
    pub fn elapsed_since(self, earlier: SimTime) -> Option<Duration> {
        self.0.checked_sub(earlier.0).map(Duration::Finite)
    }
}

impl std::fmt::Display for SimTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "T={}", self.0)
    }
}

// ── Duration ──────────────────────────────────────────────────────────

/// A span of simulated time, possibly infinite.
///
/// `Infinite` is the time advance of an idle model. The derived ordering
/// puts every finite duration before `Infinite`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Duration {
    Finite(u64),
    Infinite,
}

impl Duration {
    pub const ZERO: Duration = Duration::Finite(0);

    #[inline]
    pub fn ticks(ticks: u64) -> Self {
        Duration::Finite(ticks)
    }

    #[inline]
    pub fn is_infinite(self) -> bool {
        matches!(self, Duration::Infinite)
    }

    #[inline]
    pub fn is_zero(self) -> bool {
        self == Duration::ZERO
    }

    /// Finite tick count, `None` for `Infinite`.
    #[inline]
    pub fn as_ticks(self) -> Option<u64> {
        match self {
            Duration::Finite(d) => Some(d),
            Duration::Infinite => None,
        }
    }

    /// Sum of two durations; infinite absorbs, overflow saturates to infinite.
    pub fn saturating_add(self, other: Duration) -> Duration {
        match (self, other) {
            (Duration::Finite(a), Duration::Finite(b)) => {
                a.checked_add(b).map(Duration::Finite).unwrap_or(Duration::Infinite)
            }
            _ => Duration::Infinite,
        }
    }
}

impl std::fmt::Display for Duration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Duration::Finite(d) => write!(f, "{}", d),
            Duration::Infinite => f.write_str("inf"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero() {
        assert_eq!(SimTime::ZERO.ticks(), 0);
        assert!(Duration::ZERO.is_zero());
    }

    #[test]
    fn test_ordering() {
        assert!(SimTime::new(10) < SimTime::new(20));
        assert!(Duration::ticks(u64::MAX) < Duration::Infinite);
        assert!(Duration::ZERO < Duration::ticks(1));
    }

    #[test]
    fn test_advance() {
        let t = SimTime::new(100);
        assert_eq!(t.advance(Duration::ticks(50)), Some(SimTime::new(150)));
        assert_eq!(t.advance(Duration::Infinite), None);
        assert_eq!(SimTime::new(u64::MAX).advance(Duration::ticks(1)), None);
    }

    #[test]
    fn test_elapsed_since() {
        let t1 = SimTime::new(10);
        let t2 = SimTime::new(30);
        assert_eq!(t2.elapsed_since(t1), Some(Duration::ticks(20)));
        assert_eq!(t1.elapsed_since(t2), None);
    }

    #[test]
    fn test_saturating_add() {
        assert_eq!(
            Duration::ticks(2).saturating_add(Duration::ticks(3)),
            Duration::ticks(5)
        );
        assert!(Duration::ticks(2).saturating_add(Duration::Infinite).is_infinite());
        assert!(Duration::ticks(u64::MAX)
            .saturating_add(Duration::ticks(1))
            .is_infinite());
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", SimTime::new(42)), "T=42");
        assert_eq!(format!("{}", Duration::Infinite), "inf");
        assert_eq!(format!("{}", TimeUnit::Seconds), "s");
    }

    #[test]
    fn test_time_unit_serde_name() {
        #[derive(serde::Deserialize)]
        struct Wrapper {
            unit: TimeUnit,
        }
        let w: Wrapper = toml::from_str("unit = \"minutes\"").unwrap();
        assert_eq!(w.unit, TimeUnit::Minutes);
    }
}
