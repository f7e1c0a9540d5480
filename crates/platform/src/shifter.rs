//! Phase shifter and calibration-pulse abstractions
//!
//! Both are polled from the foreground context. A shift command returns
//! immediately; the shifter then reports busy until the new phase has settled.

/// Programmable, settling-time-bound delay of a clock/sampling phase.
pub trait PhaseShifter {
    /// Command the shifter of `channel` to `phase_ps` (absolute offset).
    fn set_phase_shift(&mut self, channel: u8, phase_ps: i32);

    /// `true` while a commanded shift on `channel` has not settled.
    fn is_busy(&self, channel: u8) -> bool;

    /// Phase measured by the DMTD phase tracker of `channel`, in picoseconds.
    fn read_phase_tracker(&self, channel: u8) -> i32;
}

/// Source of calibration pulses in the RX timestamping unit.
pub trait TimestampSource {
    /// Generate one fake RX timestamp and return its flip bit.
    ///
    /// The flip bit is `true` when the rising-edge counter is ahead of the
    /// falling-edge counter at the latch instant.
    fn calibration_pulse(&mut self) -> bool;
}

impl<T: PhaseShifter + ?Sized> PhaseShifter for &mut T {
    fn set_phase_shift(&mut self, channel: u8, phase_ps: i32) {
        (**self).set_phase_shift(channel, phase_ps);
    }

    fn is_busy(&self, channel: u8) -> bool {
        (**self).is_busy(channel)
    }

    fn read_phase_tracker(&self, channel: u8) -> i32 {
        (**self).read_phase_tracker(channel)
    }
}

impl<T: TimestampSource + ?Sized> TimestampSource for &mut T {
    fn calibration_pulse(&mut self) -> bool {
        (**self).calibration_pulse()
    }
}
