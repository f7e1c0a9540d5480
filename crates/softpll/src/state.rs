//! State shared between the tag notification context and the foreground
//!
//! Each field has exactly one writer:
//!
//! | Field          | Writer                 | Readers     |
//! |----------------|------------------------|-------------|
//! | snapshot       | notification (loop)    | foreground  |
//! | shift target   | foreground (shifter)   | loop        |
//! | shift current  | notification (loop)    | foreground  |

use core::cell::Cell;
use core::sync::atomic::{AtomicI32, Ordering};

use critical_section::Mutex;
use platform::PhaseShifter;

use crate::BangBangConfig;

/// Observable state of the steered channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChannelState {
    /// Steered (output) channel.
    pub channel_id: u8,
    /// Tags consumed since start, all channels.
    pub tag_count: u32,
    /// Last output tag value.
    pub last_tag_phase: u32,
    /// Last output-minus-reference phase, in tag units.
    pub measured_phase: i32,
    /// Last phase error after the setpoint, in tag units.
    pub phase_error: i32,
    /// Current actuator code.
    pub actuator: u16,
    /// Lock detector output.
    pub locked: bool,
    /// Loop halted on a FIFO overrun.
    pub faulted: bool,
}

impl ChannelState {
    /// State of a loop that has not seen a tag yet.
    pub const fn new(channel_id: u8, actuator: u16) -> Self {
        Self {
            channel_id,
            tag_count: 0,
            last_tag_phase: 0,
            measured_phase: 0,
            phase_error: 0,
            actuator,
            locked: false,
            faulted: false,
        }
    }
}

/// Snapshot and phase-shift registers of one loop.
pub struct SharedLoopState {
    snapshot: Mutex<Cell<ChannelState>>,
    shift_target: AtomicI32,
    shift_current: AtomicI32,
}

impl SharedLoopState {
    /// Fresh state; usable in a `static`.
    pub const fn new() -> Self {
        Self {
            snapshot: Mutex::new(Cell::new(ChannelState::new(0, 0))),
            shift_target: AtomicI32::new(0),
            shift_current: AtomicI32::new(0),
        }
    }

    /// Consistent copy of the channel state.
    pub fn snapshot(&self) -> ChannelState {
        critical_section::with(|cs| self.snapshot.borrow(cs).get())
    }

    pub(crate) fn publish(&self, state: ChannelState) {
        critical_section::with(|cs| self.snapshot.borrow(cs).set(state));
    }

    /// Commanded phase setpoint, in tag units.
    pub fn shift_target(&self) -> i32 {
        self.shift_target.load(Ordering::Acquire)
    }

    /// Command a new phase setpoint. Foreground only.
    pub fn set_shift_target(&self, units: i32) {
        self.shift_target.store(units, Ordering::Release);
    }

    /// Setpoint the loop is currently steering to, in tag units.
    pub fn shift_current(&self) -> i32 {
        self.shift_current.load(Ordering::Acquire)
    }

    pub(crate) fn set_shift_current(&self, units: i32) {
        self.shift_current.store(units, Ordering::Release);
    }

    /// `true` while the loop is still walking toward the commanded setpoint.
    pub fn shift_in_progress(&self) -> bool {
        self.shift_current() != self.shift_target()
    }
}

impl Default for SharedLoopState {
    fn default() -> Self {
        Self::new()
    }
}

/// [`PhaseShifter`] backed by a running loop's setpoint.
///
/// Only the loop's output channel can be shifted; commands for other
/// channels are ignored and those channels never report busy. Not `Clone`:
/// the calibration owns the only writer of the shift target.
pub struct LoopShifter<'a> {
    shared: &'a SharedLoopState,
    config: BangBangConfig,
}

impl<'a> LoopShifter<'a> {
    /// Shifter for the loop configured with `config`.
    pub const fn new(shared: &'a SharedLoopState, config: BangBangConfig) -> Self {
        Self { shared, config }
    }
}

impl PhaseShifter for LoopShifter<'_> {
    fn set_phase_shift(&mut self, channel: u8, phase_ps: i32) {
        if channel != self.config.output_channel {
            #[cfg(feature = "defmt")]
            defmt::warn!("phase shift on unsteered channel {=u8} ignored", channel);
            return;
        }
        self.shared.set_shift_target(self.config.ps_to_units(phase_ps));
    }

    fn is_busy(&self, channel: u8) -> bool {
        channel == self.config.output_channel && self.shared.shift_in_progress()
    }

    fn read_phase_tracker(&self, _channel: u8) -> i32 {
        self.config.units_to_ps(self.shared.snapshot().measured_phase)
    }
}
