//! Persistent calibration storage and the RX correction consumer

use crate::PhaseTransition;

/// Durable storage of the transition phase.
///
/// The on-medium layout (offset, byte order, validity bit) is the
/// implementation's concern; callers only see a valid value or nothing.
pub trait PhaseTransitionStore {
    /// Error type
    type Error: core::fmt::Debug;

    /// Read the stored value; `Ok(None)` when no valid value was ever stored.
    fn get_phase_transition(&mut self) -> Result<Option<PhaseTransition>, Self::Error>;

    /// Store `value` and mark it valid.
    fn set_phase_transition(&mut self, value: PhaseTransition) -> Result<(), Self::Error>;
}

/// Consumer of the active transition phase (the RX timestamp correction path).
pub trait PhaseTransitionSink {
    /// Make `value` the correction constant for every following RX timestamp.
    fn set_phase_transition(&mut self, value: PhaseTransition);
}

impl<T: PhaseTransitionStore + ?Sized> PhaseTransitionStore for &mut T {
    type Error = T::Error;

    fn get_phase_transition(&mut self) -> Result<Option<PhaseTransition>, Self::Error> {
        (**self).get_phase_transition()
    }

    fn set_phase_transition(&mut self, value: PhaseTransition) -> Result<(), Self::Error> {
        (**self).set_phase_transition(value)
    }
}

impl<T: PhaseTransitionSink + ?Sized> PhaseTransitionSink for &mut T {
    fn set_phase_transition(&mut self, value: PhaseTransition) {
        (**self).set_phase_transition(value);
    }
}
