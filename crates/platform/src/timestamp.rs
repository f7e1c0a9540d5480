//! White Rabbit timestamps with sub-nanosecond phase.
//!
//! A [`Timestamp`] is always kept normalized: `nanoseconds` in
//! `[0, 1_000_000_000)` and `phase_ps` in `[0, 1000)`. Construction and
//! subtraction carry and borrow across phase → nanoseconds → seconds, so
//! `a - b` of two normalized timestamps is normalized too (with a negative
//! `seconds` field when `a` precedes `b`).

use core::ops::Sub;

/// Picoseconds per nanosecond (modulus of the phase field).
pub const PS_PER_NS: i64 = 1_000;

const PS_PER_SEC: i128 = 1_000_000_000_000;

/// Normalized timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Timestamp {
    seconds: i64,
    nanoseconds: u32,
    phase_ps: u32,
}

impl Timestamp {
    /// Build a timestamp from possibly out-of-range parts, normalizing them.
    pub fn new(seconds: i64, nanoseconds: i64, phase_ps: i64) -> Self {
        // i128 holds i64::MAX seconds in picoseconds with room to spare.
        #[allow(clippy::arithmetic_side_effects)]
        let total = i128::from(seconds) * PS_PER_SEC
            + i128::from(nanoseconds) * i128::from(PS_PER_NS)
            + i128::from(phase_ps);
        Self::from_picoseconds(total)
    }

    /// Build a timestamp from a signed picosecond count.
    ///
    /// Seconds outside the `i64` range saturate.
    pub fn from_picoseconds(total_ps: i128) -> Self {
        let seconds = total_ps.div_euclid(PS_PER_SEC);
        let sub_second = total_ps.rem_euclid(PS_PER_SEC);
        let nanoseconds = sub_second.div_euclid(i128::from(PS_PER_NS));
        let phase_ps = sub_second.rem_euclid(i128::from(PS_PER_NS));
        Self {
            seconds: i64::try_from(seconds).unwrap_or(if seconds < 0 { i64::MIN } else { i64::MAX }),
            // rem_euclid bounds both fields below their (u32-sized) moduli.
            nanoseconds: u32::try_from(nanoseconds).unwrap_or(0),
            phase_ps: u32::try_from(phase_ps).unwrap_or(0),
        }
    }

    /// Whole seconds.
    pub const fn seconds(&self) -> i64 {
        self.seconds
    }

    /// Nanoseconds within the second, `[0, 1e9)`.
    pub const fn nanoseconds(&self) -> u32 {
        self.nanoseconds
    }

    /// Picoseconds within the nanosecond, `[0, 1000)`.
    pub const fn phase_ps(&self) -> u32 {
        self.phase_ps
    }

    /// Signed picosecond count since the epoch.
    pub fn to_picoseconds(&self) -> i128 {
        // Bounded: |seconds| <= i64::MAX, far inside i128.
        #[allow(clippy::arithmetic_side_effects)]
        let total = i128::from(self.seconds) * PS_PER_SEC
            + i128::from(self.nanoseconds) * i128::from(PS_PER_NS)
            + i128::from(self.phase_ps);
        total
    }
}

impl Sub for Timestamp {
    type Output = Timestamp;

    fn sub(self, rhs: Timestamp) -> Timestamp {
        Timestamp::from_picoseconds(self.to_picoseconds().saturating_sub(rhs.to_picoseconds()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_carries_phase_into_nanoseconds() {
        let ts = Timestamp::new(1, 10, 2_500);
        assert_eq!((ts.seconds(), ts.nanoseconds(), ts.phase_ps()), (1, 12, 500));
    }

    #[test]
    fn new_borrows_negative_phase() {
        let ts = Timestamp::new(1, 0, -1);
        assert_eq!(
            (ts.seconds(), ts.nanoseconds(), ts.phase_ps()),
            (0, 999_999_999, 999)
        );
    }

    #[test]
    fn subtraction_borrows_across_all_fields() {
        let a = Timestamp::new(10, 5, 100);
        let b = Timestamp::new(9, 999_999_999, 900);
        let d = a - b;
        assert_eq!((d.seconds(), d.nanoseconds(), d.phase_ps()), (0, 5, 200));
    }

    #[test]
    fn negative_difference_is_normalized() {
        let a = Timestamp::new(0, 0, 0);
        let b = Timestamp::new(0, 0, 1);
        let d = a - b;
        assert_eq!(d.to_picoseconds(), -1);
        assert!(d.nanoseconds() < 1_000_000_000 && d.phase_ps() < 1_000);
    }
}
