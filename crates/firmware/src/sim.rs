//! Desktop simulation of the node timing hardware
//!
//! Stands in for the gateware so the tag service, the control loop and the
//! calibration can run together on a host:
//!
//! - [`SimulatedOscillator`] produces reference/output tag register words
//!   from the current actuator code
//! - [`SimulatedTsu`] answers calibration pulses from the loop's current
//!   phase setpoint and a hidden transition phase
//! - [`LoopLockMonitor`] reports the loop's lock detector as PLL lock
//!
//! [`drive_loop`] is the async stand-in for the tag interrupt.

use core::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use embedded_hal::delay::DelayNs;
use platform::{
    normalize_phase, ActuatorDac, LinkMonitor, PhaseShifter, SlavePll, TimestampSource,
};
use softpll::{BangBangConfig, LoopMode, SharedLoopState, TagFifo, TagService};

use crate::config::{SOFTPLL_OUT_CHANNEL, SOFTPLL_REF_CHANNEL};
use crate::irq::push_tag_register;

/// Reference tag increment per simulated tick.
const REFERENCE_ADVANCE: u32 = 1_000;

/// Oscillator whose output phase is offset from the reference by
/// `balance_code - actuator` tag units.
pub struct SimulatedOscillator {
    tag_modulus: u32,
    reference: u32,
    balance_code: i64,
}

impl SimulatedOscillator {
    /// Oscillator in phase with the reference at `balance_code`.
    pub fn new(config: &BangBangConfig, balance_code: u16) -> Self {
        Self {
            tag_modulus: config.tag_modulus,
            reference: 0,
            balance_code: i64::from(balance_code),
        }
    }

    /// Tag register words for one reference period: reference, then output.
    #[allow(clippy::arithmetic_side_effects)] // modulus validated non-zero by the loop config
    pub fn tick(&mut self, actuator: u16) -> [u32; 2] {
        self.reference = (self.reference + REFERENCE_ADVANCE) % self.tag_modulus;
        let output = i64::from(self.reference) + self.balance_code - i64::from(actuator);
        let output = normalize_phase(output, self.tag_modulus);
        [
            register_word(SOFTPLL_REF_CHANNEL, self.reference),
            register_word(SOFTPLL_OUT_CHANNEL, output),
        ]
    }
}

#[allow(clippy::arithmetic_side_effects)]
fn register_word(channel: u8, value: u32) -> u32 {
    (u32::from(channel) << 24) | (value & softpll::tag::TAG_VALUE_MASK)
}

/// TSU whose flip bit is high for half a period starting at the hidden
/// transition phase, sampled at the loop's current setpoint.
pub struct SimulatedTsu<'a> {
    shared: &'a SharedLoopState,
    config: BangBangConfig,
    transition_ps: u32,
}

impl<'a> SimulatedTsu<'a> {
    /// TSU with its flip-bit transition at `transition_ps`.
    pub fn new(shared: &'a SharedLoopState, config: BangBangConfig, transition_ps: u32) -> Self {
        Self {
            shared,
            config,
            transition_ps,
        }
    }
}

impl TimestampSource for SimulatedTsu<'_> {
    #[allow(clippy::arithmetic_side_effects)]
    fn calibration_pulse(&mut self) -> bool {
        let phase_ps = self.config.units_to_ps(self.shared.shift_current());
        let period = self.config.reference_period_ps;
        let offset = normalize_phase(
            i64::from(phase_ps) - i64::from(self.transition_ps),
            period,
        );
        offset < period / 2
    }
}

/// Shifter that sleeps on every busy poll, so a host-speed scan does not
/// spin through its busy limit before the loop thread moves the setpoint.
pub struct PacedShifter<S> {
    inner: S,
    pause: Duration,
}

impl<S: PhaseShifter> PacedShifter<S> {
    /// Wrap `inner`, sleeping `pause` whenever it reports busy.
    pub fn new(inner: S, pause: Duration) -> Self {
        Self { inner, pause }
    }
}

impl<S: PhaseShifter> PhaseShifter for PacedShifter<S> {
    fn set_phase_shift(&mut self, channel: u8, phase_ps: i32) {
        tracing::trace!(channel, phase_ps, "phase shift");
        self.inner.set_phase_shift(channel, phase_ps);
    }

    fn is_busy(&self, channel: u8) -> bool {
        let busy = self.inner.is_busy(channel);
        if busy {
            std::thread::sleep(self.pause);
        }
        busy
    }

    fn read_phase_tracker(&self, channel: u8) -> i32 {
        self.inner.read_phase_tracker(channel)
    }
}

/// Link that is always up.
pub struct SimulatedLink;

impl LinkMonitor for SimulatedLink {
    fn link_up(&mut self) -> bool {
        true
    }
}

/// PLL lock taken from the bang-bang loop's lock detector.
pub struct LoopLockMonitor<'a> {
    shared: &'a SharedLoopState,
}

impl<'a> LoopLockMonitor<'a> {
    /// Monitor for the loop publishing into `shared`.
    pub fn new(shared: &'a SharedLoopState) -> Self {
        Self { shared }
    }
}

impl SlavePll for LoopLockMonitor<'_> {
    fn start_slave(&mut self) {
        tracing::debug!("slave PLL already running in the simulation");
    }

    fn is_locked(&mut self) -> bool {
        self.shared.snapshot().locked
    }
}

/// DAC that logs every code.
#[derive(Default)]
pub struct TracingDac;

impl ActuatorDac for TracingDac {
    fn write(&mut self, code: u16) {
        tracing::trace!(code, "dac write");
    }
}

/// Blocking delay on the host clock.
pub struct StdDelay;

impl DelayNs for StdDelay {
    fn delay_ns(&mut self, ns: u32) {
        std::thread::sleep(Duration::from_nanos(u64::from(ns)));
    }
}

/// Feed `service` from `oscillator` every `period` until `stop` is set,
/// restarting the loop after an overrun. Returns the number of restarts.
pub async fn drive_loop<D, const N: usize>(
    fifo: &TagFifo<N>,
    mut service: TagService<'_, D, N>,
    mut oscillator: SimulatedOscillator,
    period: Duration,
    stop: &AtomicBool,
) -> u32
where
    D: ActuatorDac,
{
    let mut restarts = 0_u32;
    let mut ticker = tokio::time::interval(period);

    while !stop.load(Ordering::Acquire) {
        ticker.tick().await;
        if service.pll().is_faulted() {
            let from = service.pll().actuator();
            tracing::warn!(restarts, "restarting bang-bang loop");
            if let Err(err) = service.restart(LoopMode::Slave, SOFTPLL_REF_CHANNEL, from) {
                tracing::error!(error = err.as_str(), "bang-bang restart rejected");
                break;
            }
            restarts = restarts.saturating_add(1);
        }
        for word in oscillator.tick(service.pll().actuator()) {
            // An overrun is latched and reported by the drain below.
            let _ = push_tag_register(fifo, word);
        }
        if let Err(err) = service.service() {
            tracing::error!(error = err.as_str(), "tag service failed, loop halted");
        }
    }
    restarts
}
