use core::fmt;
use std::ops::{Add, AddAssign, Sub};

/// Simulated time in microseconds since the start of the run.
/// Used both for instants and for durations.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SimTime(u64);

impl SimTime {
    pub const ZERO: SimTime = SimTime(0);

    pub const fn from_us(us: u64) -> Self {
        SimTime(us)
    }

    pub const fn from_ms(ms: u64) -> Self {
        SimTime(ms * 1000)
    }

    /// Fractional milliseconds, rounded to the nearest microsecond
    pub fn from_ms_f64(ms: f64) -> Self {
        SimTime((ms * 1000.0).round().max(0.0) as u64)
    }

    pub fn from_secs_f64(s: f64) -> Self {
        SimTime((s * 1_000_000.0).round().max(0.0) as u64)
    }

    pub const fn as_us(self) -> u64 {
        self.0
    }

    pub fn as_ms_f64(self) -> f64 {
        self.0 as f64 / 1000.0
    }

    pub fn as_secs_f64(self) -> f64 {
        self.0 as f64 / 1_000_000.0
    }

    /// Time elapsed since `earlier`, zero if `earlier` lies in the future
    pub fn since(self, earlier: SimTime) -> SimTime {
        SimTime(self.0.saturating_sub(earlier.0))
    }

    /// Number of whole `period`s that fit in this duration
    pub fn div_floor(self, period: SimTime) -> u64 {
        assert!(period.0 > 0, "division by zero duration");
        self.0 / period.0
    }

    /// Number of `period`s needed to cover this duration
    pub fn div_ceil(self, period: SimTime) -> u64 {
        assert!(period.0 > 0, "division by zero duration");
        self.0.div_ceil(period.0)
    }
}

impl Add for SimTime {
    type Output = SimTime;
    fn add(self, rhs: SimTime) -> SimTime {
        SimTime(self.0 + rhs.0)
    }
}

impl AddAssign for SimTime {
    fn add_assign(&mut self, rhs: SimTime) {
        self.0 += rhs.0;
    }
}

impl Sub for SimTime {
    type Output = SimTime;
    /// Saturating difference
    fn sub(self, rhs: SimTime) -> SimTime {
        self.since(rhs)
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:03}ms", self.0 / 1000, self.0 % 1000)
    }
}

impl fmt::Debug for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SimTime({}us)", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversions() {
        assert_eq!(SimTime::from_ms(10).as_us(), 10_000);
        assert_eq!(SimTime::from_ms_f64(2.5).as_us(), 2_500);
        assert_eq!(SimTime::from_secs_f64(1.0), SimTime::from_ms(1000));
        assert_eq!(format!("{}", SimTime::from_us(12_345)), "12.345ms");
    }

    #[test]
    fn test_arith() {
        let a = SimTime::from_ms(30);
        let b = SimTime::from_ms(10);
        assert_eq!(a - b, SimTime::from_ms(20));
        assert_eq!(b - a, SimTime::ZERO, "subtraction saturates");
        assert_eq!(a.div_floor(SimTime::from_ms(7)), 4);
        assert_eq!(a.div_ceil(SimTime::from_ms(7)), 5);
        let mut c = b;
        c += b;
        assert_eq!(c, SimTime::from_ms(20));
    }
}
