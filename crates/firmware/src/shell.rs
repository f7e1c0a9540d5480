//! Shell commands: `calibration` and `ptrack`
//!
//! The dispatcher (line editing, command table) lives elsewhere; this module
//! only tokenizes a line and implements the two commands. Output goes to any
//! [`core::fmt::Write`] sink.
//!
//! ```text
//! calibration          stored t24p if present, else measure and store
//! calibration force    always measure and store
//! ptrack [enable|disable]
//! ```

use core::fmt::Write;
use core::sync::atomic::{AtomicBool, Ordering};

use calibration::{CalibrationError, CalibrationOrchestrator};
use embedded_hal::delay::DelayNs;
use heapless::Vec;
use platform::{
    LinkMonitor, PhaseShifter, PhaseTransition, PhaseTransitionSink, PhaseTransitionStore,
    SlavePll, TimestampSource,
};
use thiserror_no_std::Error;

use crate::config::PreconditionConfig;

/// Arguments accepted after the command name.
pub const MAX_ARGS: usize = 4;

/// Command failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CommandError {
    /// More than [`MAX_ARGS`] arguments.
    #[error("too many arguments")]
    TooManyArguments,
    /// Argument not understood by the command.
    #[error("invalid argument")]
    InvalidArgument,
    /// The calibration failed.
    #[error("calibration failed: {0}")]
    Calibration(CalibrationError),
    /// The output sink rejected a write.
    #[error("output error")]
    Output,
}

impl From<CalibrationError> for CommandError {
    fn from(err: CalibrationError) -> Self {
        Self::Calibration(err)
    }
}

impl From<core::fmt::Error> for CommandError {
    fn from(_: core::fmt::Error) -> Self {
        Self::Output
    }
}

/// A tokenized command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine<'a> {
    /// Command name.
    pub name: &'a str,
    /// Arguments in order.
    pub args: Vec<&'a str, MAX_ARGS>,
}

impl<'a> CommandLine<'a> {
    /// Split `line` on whitespace. A blank line gives `Ok(None)`.
    pub fn parse(line: &'a str) -> Result<Option<Self>, CommandError> {
        let mut words = line.split_whitespace();
        let Some(name) = words.next() else {
            return Ok(None);
        };
        let mut args = Vec::new();
        for word in words {
            args.push(word).map_err(|_| CommandError::TooManyArguments)?;
        }
        Ok(Some(Self { name, args }))
    }
}

/// `calibration [force]`.
///
/// Owns the precondition collaborators; the orchestrator is borrowed per
/// invocation so the rest of the firmware can keep using it.
pub struct CalibrationCommand<L, P, D> {
    link: L,
    pll: P,
    delay: D,
    limits: PreconditionConfig,
}

impl<L, P, D> CalibrationCommand<L, P, D>
where
    L: LinkMonitor,
    P: SlavePll,
    D: DelayNs,
{
    /// Create the command.
    pub fn new(link: L, pll: P, delay: D, limits: PreconditionConfig) -> Self {
        Self {
            link,
            pll,
            delay,
            limits,
        }
    }

    /// Execute with `args`; returns the transition phase made active.
    pub fn run<Sh, Ts, St, Sk, W>(
        &mut self,
        args: &[&str],
        orchestrator: &mut CalibrationOrchestrator<Sh, Ts, St, Sk>,
        out: &mut W,
    ) -> Result<PhaseTransition, CommandError>
    where
        Sh: PhaseShifter,
        Ts: TimestampSource,
        St: PhaseTransitionStore,
        Sk: PhaseTransitionSink,
        W: Write,
    {
        match args {
            [] => {
                // An unreadable store is treated like an empty one.
                if let Ok(Some(t24p)) = orchestrator.load_stored() {
                    writeln!(out, "Found phase transition in EEPROM: {}ps", t24p.get())?;
                    return Ok(t24p);
                }
                writeln!(out, "Measuring t2/t4 phase transition...")?;
                self.measure_and_store(orchestrator, out)
            }
            [arg] if arg.eq_ignore_ascii_case("force") => self.measure_and_store(orchestrator, out),
            _ => Err(CommandError::InvalidArgument),
        }
    }

    fn measure_and_store<Sh, Ts, St, Sk, W>(
        &mut self,
        orchestrator: &mut CalibrationOrchestrator<Sh, Ts, St, Sk>,
        out: &mut W,
    ) -> Result<PhaseTransition, CommandError>
    where
        Sh: PhaseShifter,
        Ts: TimestampSource,
        St: PhaseTransitionStore,
        Sk: PhaseTransitionSink,
        W: Write,
    {
        writeln!(out, "Waiting for link...")?;
        let link = &mut self.link;
        if !wait_until(&mut self.delay, &self.limits, self.limits.link_timeout_polls, || {
            link.link_up()
        }) {
            writeln!(out, "link timeout")?;
        }

        self.pll.start_slave();
        writeln!(out, "Locking PLL...")?;
        let pll = &mut self.pll;
        if !wait_until(&mut self.delay, &self.limits, self.limits.lock_timeout_polls, || {
            pll.is_locked()
        }) {
            writeln!(out, "lock timeout")?;
        }

        writeln!(out, "Calibrating RX timestamper...")?;
        let t24p = orchestrator.force_measurement(&mut self.link, &mut self.pll)?;
        writeln!(out, "t24p value is {} ps, storing to EEPROM", t24p.get())?;
        orchestrator.persist(t24p)?;
        Ok(t24p)
    }

    /// Release the collaborators.
    pub fn into_parts(self) -> (L, P, D) {
        (self.link, self.pll, self.delay)
    }
}

/// Poll `ready` until it holds or `max_polls` delays have elapsed.
fn wait_until<D: DelayNs>(
    delay: &mut D,
    limits: &PreconditionConfig,
    max_polls: u32,
    mut ready: impl FnMut() -> bool,
) -> bool {
    for _ in 0..max_polls {
        if ready() {
            return true;
        }
        delay.delay_ms(limits.poll_interval_ms);
    }
    ready()
}

/// Phase tracking switch read by the PTP servo.
pub struct PhaseTracking {
    enabled: AtomicBool,
}

impl PhaseTracking {
    /// Create the switch.
    pub const fn new(enabled: bool) -> Self {
        Self {
            enabled: AtomicBool::new(enabled),
        }
    }

    /// `true` when phase tracking is on.
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Turn phase tracking on or off.
    pub fn set(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
    }
}

impl Default for PhaseTracking {
    fn default() -> Self {
        Self::new(true)
    }
}

/// `ptrack [enable|disable]`: optionally switch, then report the state.
///
/// Other arguments only report the state.
pub fn ptrack<W: Write>(
    args: &[&str],
    tracking: &PhaseTracking,
    out: &mut W,
) -> Result<bool, CommandError> {
    match args.first() {
        Some(arg) if arg.eq_ignore_ascii_case("enable") => tracking.set(true),
        Some(arg) if arg.eq_ignore_ascii_case("disable") => tracking.set(false),
        _ => {}
    }
    let enabled = tracking.is_enabled();
    writeln!(out, "phase tracking {}", if enabled { "ON" } else { "OFF" })?;
    Ok(enabled)
}
