//! Mock implementations for testing
//!
//! This module provides mock implementations of all platform traits
//! for use in unit and integration tests of the downstream crates.

#![cfg(any(test, feature = "std"))]
#![allow(clippy::arithmetic_side_effects, clippy::indexing_slicing)]

use std::cell::Cell;
use std::rc::Rc;
use std::vec::Vec;

use crate::*;

/// Shared phase register between [`MockShifter`] and [`SquareWaveSource`].
pub type PhaseHandle = Rc<Cell<i32>>;

/// Mock phase shifter: records commands and fakes a settling time.
pub struct MockShifter {
    phase: PhaseHandle,
    busy_polls_per_shift: u32,
    remaining_busy: Cell<u32>,
    busy_polls: Cell<u32>,
    /// Every `(channel, phase_ps)` command in call order.
    pub commands: Vec<(u8, i32)>,
}

impl MockShifter {
    /// Shifter that settles immediately.
    pub fn new() -> Self {
        Self::with_settling(0)
    }

    /// Shifter that reports busy for `polls` polls after every command.
    pub fn with_settling(polls: u32) -> Self {
        Self {
            phase: Rc::new(Cell::new(0)),
            busy_polls_per_shift: polls,
            remaining_busy: Cell::new(0),
            busy_polls: Cell::new(0),
            commands: Vec::new(),
        }
    }

    /// Shifter that never settles after its first command.
    pub fn stuck() -> Self {
        Self::with_settling(u32::MAX)
    }

    /// Handle to the current phase, for wiring a [`SquareWaveSource`].
    pub fn phase_handle(&self) -> PhaseHandle {
        Rc::clone(&self.phase)
    }

    /// Number of polls answered with "busy" so far.
    pub fn busy_polls(&self) -> u32 {
        self.busy_polls.get()
    }
}

impl Default for MockShifter {
    fn default() -> Self {
        Self::new()
    }
}

impl PhaseShifter for MockShifter {
    fn set_phase_shift(&mut self, channel: u8, phase_ps: i32) {
        self.commands.push((channel, phase_ps));
        self.phase.set(phase_ps);
        self.remaining_busy.set(self.busy_polls_per_shift);
    }

    fn is_busy(&self, _channel: u8) -> bool {
        let remaining = self.remaining_busy.get();
        if remaining == 0 {
            return false;
        }
        self.remaining_busy.set(remaining.saturating_sub(u32::from(remaining != u32::MAX)));
        self.busy_polls.set(self.busy_polls.get().saturating_add(1));
        true
    }

    fn read_phase_tracker(&self, _channel: u8) -> i32 {
        self.phase.get()
    }
}

/// Synthetic TSU: the flip bit is high while the shifted phase lies in
/// `[rising_ps, falling_ps)` (circularly, modulo the period).
pub struct SquareWaveSource {
    phase: PhaseHandle,
    period_ps: u32,
    rising_ps: u32,
    falling_ps: u32,
    glitches: Vec<i32>,
    /// Number of calibration pulses generated.
    pub pulses: usize,
}

impl SquareWaveSource {
    /// Square wave with a rising edge at `rising_ps` and a falling edge at
    /// `falling_ps`, sampled at the phase held by `phase`.
    pub fn new(phase: PhaseHandle, period_ps: u32, rising_ps: u32, falling_ps: u32) -> Self {
        Self {
            phase,
            period_ps,
            rising_ps: rising_ps % period_ps,
            falling_ps: falling_ps % period_ps,
            glitches: Vec::new(),
            pulses: 0,
        }
    }

    /// Signal that is constant `level` at every phase (no transition).
    pub fn constant(phase: PhaseHandle, period_ps: u32, level: bool) -> Self {
        let mut source = Self::new(phase, period_ps, 0, 0);
        source.rising_ps = if level { 0 } else { period_ps };
        source.falling_ps = if level { period_ps } else { 0 };
        source
    }

    /// Invert the flip bit at exactly these (unwrapped) scan phases.
    #[must_use]
    pub fn with_glitches(mut self, phases: &[i32]) -> Self {
        self.glitches.extend_from_slice(phases);
        self
    }

    /// Level of the undisturbed signal at `phase_ps`.
    pub fn level_at(&self, phase_ps: i32) -> bool {
        let p = normalize_phase(i64::from(phase_ps), self.period_ps);
        if self.rising_ps <= self.falling_ps {
            p >= self.rising_ps && p < self.falling_ps
        } else {
            p >= self.rising_ps || p < self.falling_ps
        }
    }
}

impl TimestampSource for SquareWaveSource {
    fn calibration_pulse(&mut self) -> bool {
        self.pulses += 1;
        let phase = self.phase.get();
        let level = self.level_at(phase);
        if self.glitches.contains(&phase) {
            !level
        } else {
            level
        }
    }
}

/// Error returned by [`MockStore`] when a failure is injected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockStoreError;

/// In-memory transition phase store with failure injection.
#[derive(Default)]
pub struct MockStore {
    /// Currently stored value.
    pub value: Option<PhaseTransition>,
    /// Fail every read.
    pub fail_reads: bool,
    /// Fail every write.
    pub fail_writes: bool,
    /// Number of successful writes.
    pub writes: usize,
}

impl MockStore {
    /// Empty store.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Store already holding a valid `phase_ps`.
    pub fn holding(phase_ps: u32) -> Self {
        Self {
            value: Some(PhaseTransition::from_normalized(phase_ps)),
            ..Self::default()
        }
    }

    /// Store whose medium is unreachable.
    pub fn unreachable() -> Self {
        Self {
            fail_reads: true,
            fail_writes: true,
            ..Self::default()
        }
    }
}

impl PhaseTransitionStore for MockStore {
    type Error = MockStoreError;

    fn get_phase_transition(&mut self) -> Result<Option<PhaseTransition>, Self::Error> {
        if self.fail_reads {
            return Err(MockStoreError);
        }
        Ok(self.value)
    }

    fn set_phase_transition(&mut self, value: PhaseTransition) -> Result<(), Self::Error> {
        if self.fail_writes {
            return Err(MockStoreError);
        }
        self.value = Some(value);
        self.writes += 1;
        Ok(())
    }
}

/// Byte-addressable EEPROM image, erased to `0xFF`.
pub struct MockEeprom<const N: usize> {
    /// Raw contents.
    pub bytes: [u8; N],
    /// Fail every bus transaction.
    pub fail: bool,
}

impl<const N: usize> MockEeprom<N> {
    /// Erased EEPROM.
    pub fn new() -> Self {
        Self {
            bytes: [0xFF; N],
            fail: false,
        }
    }
}

impl<const N: usize> Default for MockEeprom<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Error returned by [`MockEeprom`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockEepromError {
    /// Injected bus failure.
    Bus,
    /// Access beyond the end of the device.
    OutOfBounds,
}

impl<const N: usize> embedded_storage::ReadStorage for MockEeprom<N> {
    type Error = MockEepromError;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        if self.fail {
            return Err(MockEepromError::Bus);
        }
        let start = offset as usize;
        let src = self
            .bytes
            .get(start..start + bytes.len())
            .ok_or(MockEepromError::OutOfBounds)?;
        bytes.copy_from_slice(src);
        Ok(())
    }

    fn capacity(&self) -> usize {
        N
    }
}

impl<const N: usize> embedded_storage::Storage for MockEeprom<N> {
    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
        if self.fail {
            return Err(MockEepromError::Bus);
        }
        let start = offset as usize;
        let dst = self
            .bytes
            .get_mut(start..start + bytes.len())
            .ok_or(MockEepromError::OutOfBounds)?;
        dst.copy_from_slice(bytes);
        Ok(())
    }
}

/// Sink recording every pushed correction constant.
#[derive(Default)]
pub struct RecordingSink {
    /// Values in push order.
    pub values: Vec<PhaseTransition>,
}

impl RecordingSink {
    /// Last pushed value.
    pub fn last(&self) -> Option<PhaseTransition> {
        self.values.last().copied()
    }
}

impl PhaseTransitionSink for RecordingSink {
    fn set_phase_transition(&mut self, value: PhaseTransition) {
        self.values.push(value);
    }
}

/// Link that comes up after a number of polls.
pub struct MockLink {
    polls_until_up: Option<u32>,
    /// Number of polls so far.
    pub polls: u32,
}

impl MockLink {
    /// Link already up.
    pub fn up() -> Self {
        Self::up_after(0)
    }

    /// Link that reports up from poll `polls` onwards.
    pub fn up_after(polls: u32) -> Self {
        Self {
            polls_until_up: Some(polls),
            polls: 0,
        }
    }

    /// Link that never comes up.
    pub fn down() -> Self {
        Self {
            polls_until_up: None,
            polls: 0,
        }
    }
}

impl LinkMonitor for MockLink {
    fn link_up(&mut self) -> bool {
        let up = self.polls_until_up.is_some_and(|n| self.polls >= n);
        self.polls += 1;
        up
    }
}

/// PLL that locks a number of polls after being started.
pub struct MockPll {
    polls_until_lock: Option<u32>,
    polls_since_start: u32,
    /// Number of `start_slave` calls.
    pub starts: u32,
}

impl MockPll {
    /// PLL that locks after `polls` polls of `is_locked`.
    pub fn locks_after(polls: u32) -> Self {
        Self {
            polls_until_lock: Some(polls),
            polls_since_start: 0,
            starts: 0,
        }
    }

    /// PLL that never locks.
    pub fn never_locks() -> Self {
        Self {
            polls_until_lock: None,
            polls_since_start: 0,
            starts: 0,
        }
    }
}

impl SlavePll for MockPll {
    fn start_slave(&mut self) {
        self.starts += 1;
        self.polls_since_start = 0;
    }

    fn is_locked(&mut self) -> bool {
        let locked = self.starts > 0
            && self
                .polls_until_lock
                .is_some_and(|n| self.polls_since_start >= n);
        self.polls_since_start += 1;
        locked
    }
}

/// DAC recording every written code.
#[derive(Default)]
pub struct MockDac {
    /// Codes in write order.
    pub codes: Vec<u16>,
}

impl MockDac {
    /// Last written code.
    pub fn last(&self) -> Option<u16> {
        self.codes.last().copied()
    }
}

impl ActuatorDac for MockDac {
    fn write(&mut self, code: u16) {
        self.codes.push(code);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn square_wave_follows_shifter_phase() {
        let mut shifter = MockShifter::new();
        let mut source = SquareWaveSource::new(shifter.phase_handle(), 8_000, 2_500, 6_500);
        shifter.set_phase_shift(0, 2_400);
        assert!(!source.calibration_pulse());
        shifter.set_phase_shift(0, 2_500);
        assert!(source.calibration_pulse());
        shifter.set_phase_shift(0, 8_000 + 6_499);
        assert!(source.calibration_pulse());
        shifter.set_phase_shift(0, 6_500);
        assert!(!source.calibration_pulse());
    }

    #[test]
    fn wrapped_window_is_high_across_zero() {
        let source = SquareWaveSource::new(Rc::new(Cell::new(0)), 8_000, 6_000, 2_000);
        assert!(source.level_at(7_900));
        assert!(source.level_at(0));
        assert!(!source.level_at(2_000));
    }

    #[test]
    fn constant_source_never_changes_level() {
        let high = SquareWaveSource::constant(Rc::new(Cell::new(0)), 8_000, true);
        let low = SquareWaveSource::constant(Rc::new(Cell::new(0)), 8_000, false);
        for phase in (0..16_000).step_by(100) {
            assert!(high.level_at(phase));
            assert!(!low.level_at(phase));
        }
    }

    #[test]
    fn settling_shifter_reports_busy_then_idle() {
        let mut shifter = MockShifter::with_settling(2);
        shifter.set_phase_shift(0, 100);
        assert!(shifter.is_busy(0));
        assert!(shifter.is_busy(0));
        assert!(!shifter.is_busy(0));
        assert_eq!(shifter.busy_polls(), 2);
    }
}
