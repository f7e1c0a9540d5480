//! RX timestamp linearization
//!
//! The TSU latches the RX timestamp with two counters, one on each edge of
//! the reference clock. Near the rising-edge counter's transition (the t24p
//! point) its value is unreliable, so within a quarter period of it the
//! falling-edge counter is used instead, and the fine phase from the DMTD is
//! re-based on the transition point.
//!
//! ```text
//!        trip_lo        t24p        trip_hi
//!   ───────┼─────────────┼─────────────┼────────▶ phase
//!          │◀─ falling counter, +1 cycle if before t24p ─▶│
//! ```

use core::sync::atomic::{AtomicU32, Ordering};

use platform::config::REF_CLOCK_PERIOD_PS;
use platform::timestamp::PS_PER_NS;
use platform::{PhaseTransition, PhaseTransitionSink, Timestamp};

/// Raw RX timestamp as read from the TSU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RawRxTimestamp {
    /// Seconds counter.
    pub seconds: i64,
    /// Coarse nanoseconds, a multiple of the reference period.
    pub nanoseconds: u32,
    /// DMTD phase of the RX clock, `[0, period)` picoseconds.
    pub dmtd_phase_ps: u32,
    /// Rising-edge counter one tick ahead of the falling-edge counter.
    pub counter_ahead: bool,
}

/// Active transition phase, shared with the timestamping path.
///
/// Holds the persisted-word encoding so "uncalibrated" is a distinct state.
pub struct RxTimestampCorrection {
    word: AtomicU32,
    period_ps: u32,
}

impl RxTimestampCorrection {
    /// Uncalibrated correction for the default reference period.
    pub const fn new() -> Self {
        Self::with_period(REF_CLOCK_PERIOD_PS)
    }

    /// Uncalibrated correction for `period_ps`.
    pub const fn with_period(period_ps: u32) -> Self {
        Self {
            word: AtomicU32::new(0),
            period_ps,
        }
    }

    /// Active transition phase, `None` until one is set.
    pub fn phase_transition(&self) -> Option<PhaseTransition> {
        PhaseTransition::from_stored_word(self.word.load(Ordering::Acquire))
    }

    /// Make `t24p` active.
    pub fn set(&self, t24p: PhaseTransition) {
        self.word.store(t24p.to_stored_word(), Ordering::Release);
    }

    /// Linearize `raw` with the active transition phase.
    ///
    /// Returns `None` while uncalibrated.
    pub fn linearize(&self, raw: &RawRxTimestamp) -> Option<Timestamp> {
        let t24p = self.phase_transition()?;
        Some(linearize(raw, t24p.get(), self.period_ps))
    }
}

impl Default for RxTimestampCorrection {
    fn default() -> Self {
        Self::new()
    }
}

impl PhaseTransitionSink for &RxTimestampCorrection {
    fn set_phase_transition(&mut self, value: PhaseTransition) {
        self.set(value);
    }
}

/// `x` in the circular interval `[min, max]`.
fn inside_range(min: i64, max: i64, x: i64) -> bool {
    if min < max {
        x >= min && x <= max
    } else {
        x <= max || x >= min
    }
}

/// Linearize `raw` against transition phase `t24p_ps` for a reference clock
/// of `period_ps`.
#[allow(clippy::arithmetic_side_effects)] // all operands bounded by the period
pub fn linearize(raw: &RawRxTimestamp, t24p_ps: u32, period_ps: u32) -> Timestamp {
    let period = i64::from(period_ps);
    let transition = i64::from(t24p_ps);
    let cycle_ns = period / PS_PER_NS;
    let phase = period - 1 - i64::from(raw.dmtd_phase_ps);

    let trip_lo = (transition - period / 4).rem_euclid(period);
    let trip_hi = (transition + period / 4).rem_euclid(period);

    let mut nanoseconds = i64::from(raw.nanoseconds);
    if inside_range(trip_lo, trip_hi, phase) {
        if raw.counter_ahead {
            nanoseconds -= cycle_ns;
        }
        if inside_range(trip_lo, transition, phase) {
            nanoseconds += cycle_ns;
        }
    }

    let rebased = (phase - transition - 1).rem_euclid(period);
    let fine_ps = period - 1 - rebased;

    Timestamp::new(raw.seconds, nanoseconds, fine_ps)
}
