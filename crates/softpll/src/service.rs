//! Tag notification context
//!
//! [`TagService::service`] is the body of the tag interrupt: it drains the
//! FIFO in a tight loop, runs the control loop on every tag in arrival order,
//! and writes each new actuator code to the DAC. It is not reentrant; the
//! `&mut self` receiver enforces that.

use platform::ActuatorDac;

use crate::bangbang::{BangBangLoop, LoopMode};
use crate::tag::TagFifo;
use crate::SoftPllError;

/// Consumer side of the tag FIFO, owning the loop and the actuator.
pub struct TagService<'a, D, const N: usize> {
    fifo: &'a TagFifo<N>,
    pll: BangBangLoop<'a>,
    dac: D,
}

impl<'a, D: ActuatorDac, const N: usize> TagService<'a, D, N> {
    /// Wire `pll` to `fifo` and `dac`. The current actuator code is output
    /// immediately.
    pub fn new(fifo: &'a TagFifo<N>, pll: BangBangLoop<'a>, mut dac: D) -> Self {
        dac.write(pll.actuator());
        Self { fifo, pll, dac }
    }

    /// Drain the FIFO. Returns the number of tags processed.
    ///
    /// An overrun halts the loop and is reported on this and every following
    /// call until [`restart`](Self::restart).
    pub fn service(&mut self) -> Result<usize, SoftPllError> {
        let mut processed = 0_usize;
        loop {
            match self.fifo.pop() {
                Ok(Some(tag)) => {
                    if let Some(code) = self.pll.on_tag(tag.channel, tag.value) {
                        self.dac.write(code);
                    }
                    processed = processed.saturating_add(1);
                }
                Ok(None) => return Ok(processed),
                Err(err) => {
                    if !self.pll.is_faulted() {
                        #[cfg(feature = "defmt")]
                        defmt::error!("tag FIFO overrun after {=usize} tags, loop halted", processed);
                        self.pll.halt();
                    }
                    return Err(err);
                }
            }
        }
    }

    /// Recover from an overrun: discard queued tags, re-initialize and start
    /// the loop from `initial_actuator`.
    ///
    /// A rejected `reference_channel` leaves the FIFO and the loop as they were.
    pub fn restart(
        &mut self,
        mode: LoopMode,
        reference_channel: u8,
        initial_actuator: u16,
    ) -> Result<(), SoftPllError> {
        self.pll.init(mode, reference_channel, initial_actuator)?;
        self.fifo.reset();
        self.dac.write(self.pll.actuator());
        self.pll.start();
        Ok(())
    }

    /// The control loop.
    pub fn pll(&self) -> &BangBangLoop<'a> {
        &self.pll
    }

    /// The actuator.
    pub fn dac(&self) -> &D {
        &self.dac
    }
}
