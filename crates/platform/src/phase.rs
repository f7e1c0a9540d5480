//! Phase newtypes and normalization helpers.
//!
//! - [`PhaseTransition`]: the 31-bit t24p value, with the persisted-word
//!   encoding (validity flag in bit 31)
//! - [`normalize_phase`]: canonical `[0, period)` form of any signed phase

use thiserror_no_std::Error;

// ── Error type ───────────────────────────────────────────────────────────────

/// Error returned when a value is out of the valid range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[error("value {value} outside [{min}, {max}]")]
pub struct OutOfRangeError {
    /// The value that was out of range.
    pub value: u32,
    /// The inclusive minimum allowed value.
    pub min: u32,
    /// The inclusive maximum allowed value.
    pub max: u32,
}

// ── normalize_phase ──────────────────────────────────────────────────────────

/// Fold a signed phase into `[0, period_ps)`.
///
/// Adding or subtracting any multiple of `period_ps` before the call yields the
/// same result. A zero period returns 0.
pub fn normalize_phase(phase_ps: i64, period_ps: u32) -> u32 {
    if period_ps == 0 {
        return 0;
    }
    let folded = phase_ps.rem_euclid(i64::from(period_ps));
    // rem_euclid with a positive u32 modulus lands in [0, period_ps).
    u32::try_from(folded).unwrap_or(0)
}

// ── PhaseTransition ──────────────────────────────────────────────────────────

/// Transition phase ("t24p") in picoseconds.
///
/// Wraps a `u32` with the invariant `value <= 0x7FFF_FFFF`, leaving bit 31
/// free for the validity flag of the persisted word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(transparent)]
pub struct PhaseTransition(u32);

impl PhaseTransition {
    /// Largest representable transition phase.
    pub const MAX_PS: u32 = 0x7FFF_FFFF;

    /// Validity flag of the persisted word.
    pub const VALID_FLAG: u32 = 1 << 31;

    /// Word read back from an erased EEPROM cell.
    pub const ERASED_WORD: u32 = 0xFFFF_FFFF;

    /// Create a transition phase, returning an error above 31 bits.
    pub fn new(phase_ps: u32) -> Result<Self, OutOfRangeError> {
        if phase_ps > Self::MAX_PS {
            Err(OutOfRangeError {
                value: phase_ps,
                min: 0,
                max: Self::MAX_PS,
            })
        } else {
            Ok(Self(phase_ps))
        }
    }

    /// Create a transition phase from a value already normalized into a period.
    ///
    /// Periods are far below 2^31 ps, so the mask never changes such a value.
    pub const fn from_normalized(phase_ps: u32) -> Self {
        Self(phase_ps & Self::MAX_PS)
    }

    /// Return the phase in picoseconds.
    pub const fn get(self) -> u32 {
        self.0
    }

    /// Encode as the persisted word: the phase with the validity flag set.
    pub const fn to_stored_word(self) -> u32 {
        self.0 | Self::VALID_FLAG
    }

    /// Decode a persisted word.
    ///
    /// Returns `None` when the validity flag is clear or the cell is erased.
    pub const fn from_stored_word(word: u32) -> Option<Self> {
        if word == Self::ERASED_WORD || word & Self::VALID_FLAG == 0 {
            None
        } else {
            Some(Self(word & Self::MAX_PS))
        }
    }
}
