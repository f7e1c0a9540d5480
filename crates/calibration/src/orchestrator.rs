//! Master/slave calibration policy
//!
//! | Mode   | Source of t24p                    | On scan failure            |
//! |--------|-----------------------------------|----------------------------|
//! | Slave  | scan, then persist                | fall back to stored value  |
//! | Master | persistent store only             | n/a (never measures)       |
//!
//! A master cannot measure: its RX clock is not locked to anything. It relies
//! on the node having been calibrated at least once as a slave.
//!
//! Every value obtained is pushed to the [`PhaseTransitionSink`] (the RX
//! timestamp correction path), including a measured value whose persist
//! failed.

use platform::{
    CalibrationConfig, LinkMonitor, NodeMode, PhaseShifter, PhaseTransition, PhaseTransitionSink,
    PhaseTransitionStore, SlavePll, TimestampSource,
};

use crate::scanner::{run_to_completion, CalibrationSession};
use crate::CalibrationError;

/// Calibration entry point owning its collaborators.
pub struct CalibrationOrchestrator<Sh, Ts, St, Sk> {
    config: CalibrationConfig,
    shifter: Sh,
    source: Ts,
    store: St,
    sink: Sk,
    current: Option<PhaseTransition>,
}

impl<Sh, Ts, St, Sk> CalibrationOrchestrator<Sh, Ts, St, Sk>
where
    Sh: PhaseShifter,
    Ts: TimestampSource,
    St: PhaseTransitionStore,
    Sk: PhaseTransitionSink,
{
    /// Create an orchestrator; the configuration is validated up front.
    pub fn new(
        config: CalibrationConfig,
        shifter: Sh,
        source: Ts,
        store: St,
        sink: Sk,
    ) -> Result<Self, CalibrationError> {
        config.validate()?;
        Ok(Self {
            config,
            shifter,
            source,
            store,
            sink,
            current: None,
        })
    }

    /// Obtain the transition phase for `mode` and make it active.
    pub fn calibrate(&mut self, mode: NodeMode) -> Result<PhaseTransition, CalibrationError> {
        #[cfg(feature = "defmt")]
        defmt::debug!("t24p calibration as {=str}", mode.as_str());
        match mode {
            NodeMode::Slave => self.calibrate_slave(),
            NodeMode::Master => self.calibrate_master(),
        }
    }

    fn calibrate_slave(&mut self) -> Result<PhaseTransition, CalibrationError> {
        match self.measure() {
            Ok(t24p) => {
                #[cfg(feature = "defmt")]
                defmt::info!("t24p value is {=u32} ps, storing", t24p.get());
                self.persist(t24p)?;
                Ok(t24p)
            }
            Err(CalibrationError::CalibrationRangeExhausted) => {
                #[cfg(feature = "defmt")]
                defmt::warn!("could not calibrate t24p, trying the stored value");
                match self.load_stored()? {
                    Some(t24p) => Ok(t24p),
                    None => Err(CalibrationError::CalibrationRangeExhausted),
                }
            }
            Err(err) => Err(err),
        }
    }

    fn calibrate_master(&mut self) -> Result<PhaseTransition, CalibrationError> {
        match self.load_stored()? {
            Some(t24p) => {
                #[cfg(feature = "defmt")]
                defmt::info!("t24p read from store: {=u32} ps", t24p.get());
                Ok(t24p)
            }
            None => {
                #[cfg(feature = "defmt")]
                defmt::error!("no t24p stored; calibrate once as slave");
                Err(CalibrationError::StoreUnavailable)
            }
        }
    }

    /// Run a scan and make its result active. The store is not touched.
    ///
    /// The PLL must already be locked in slave mode.
    pub fn measure(&mut self) -> Result<PhaseTransition, CalibrationError> {
        let mut session = CalibrationSession::start(self.config, &mut self.shifter)?;
        let t24p = run_to_completion(&mut session, &mut self.shifter, &mut self.source)?;
        self.apply(t24p);
        Ok(t24p)
    }

    /// Measure after checking the link and PLL lock, ignoring the store.
    ///
    /// Waiting for the preconditions is the caller's job; this only checks
    /// them once.
    pub fn force_measurement<L, P>(
        &mut self,
        link: &mut L,
        pll: &mut P,
    ) -> Result<PhaseTransition, CalibrationError>
    where
        L: LinkMonitor,
        P: SlavePll,
    {
        if !link.link_up() {
            return Err(CalibrationError::LinkDown);
        }
        if !pll.is_locked() {
            return Err(CalibrationError::PllUnlocked);
        }
        self.measure()
    }

    /// Read the stored value; a value found is made active.
    pub fn load_stored(&mut self) -> Result<Option<PhaseTransition>, CalibrationError> {
        let stored = self
            .store
            .get_phase_transition()
            .map_err(|_| CalibrationError::StoreUnavailable)?;
        if let Some(t24p) = stored {
            self.apply(t24p);
        }
        Ok(stored)
    }

    /// Write `t24p` to the store, marked valid.
    pub fn persist(&mut self, t24p: PhaseTransition) -> Result<(), CalibrationError> {
        self.store.set_phase_transition(t24p).map_err(|_| {
            #[cfg(feature = "defmt")]
            defmt::error!("failed to store t24p");
            CalibrationError::StoreUnavailable
        })
    }

    fn apply(&mut self, t24p: PhaseTransition) {
        self.current = Some(t24p);
        self.sink.set_phase_transition(t24p);
    }

    /// Transition phase made active last, if any.
    pub const fn current_phase_transition(&self) -> Option<PhaseTransition> {
        self.current
    }

    /// Scan configuration.
    pub const fn config(&self) -> &CalibrationConfig {
        &self.config
    }

    /// Phase shifter driven by the scan.
    pub fn shifter(&self) -> &Sh {
        &self.shifter
    }

    /// Persistent store.
    pub fn store(&self) -> &St {
        &self.store
    }

    /// RX correction consumer.
    pub fn sink(&self) -> &Sk {
        &self.sink
    }

    /// Release the collaborators.
    pub fn into_parts(self) -> (Sh, Ts, St, Sk) {
        (self.shifter, self.source, self.store, self.sink)
    }
}
