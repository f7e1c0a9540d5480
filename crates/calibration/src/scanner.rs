//! Phase sweep locating the RX timestamper transition
//!
//! A [`CalibrationSession`] owns both detectors and the phase cursor. Each
//! [`update`](CalibrationSession::update) performs at most one scan step:
//!
//! 1. shifter still settling: `Pending`, cursor untouched
//! 2. one calibration pulse, fed to the rising and the falling detector
//! 3. cursor at the end of the range: combine both edges, or fail
//! 4. otherwise advance the cursor one step and command the shifter
//!
//! The range is one reference period plus `3 * T * step` of headroom, so both
//! edges are found wherever they sit in the period.

use platform::{
    normalize_phase, CalibrationConfig, PhaseShifter, PhaseTransition, TimestampSource,
};

use crate::detector::{Polarity, TransitionDetector};
use crate::CalibrationError;

/// Outcome of one scan step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ScanProgress {
    /// More steps needed.
    Pending,
    /// Transition phase found.
    Done(PhaseTransition),
}

/// State of one calibration scan.
#[derive(Debug, Clone)]
pub struct CalibrationSession {
    config: CalibrationConfig,
    rising: TransitionDetector,
    falling: TransitionDetector,
    cursor_ps: i32,
    range_ps: i32,
    step_ps: i32,
    busy_polls: u32,
}

impl CalibrationSession {
    /// Validate `config`, reset both detectors and move the shifter to zero.
    pub fn start<S: PhaseShifter>(
        config: CalibrationConfig,
        shifter: &mut S,
    ) -> Result<Self, CalibrationError> {
        config.validate()?;
        // validate() guarantees the range (and so the step) fits an i32.
        let range_ps = i32::try_from(config.scan_range_ps()).unwrap_or(i32::MAX);
        let step_ps = i32::try_from(config.scan_step_ps).unwrap_or(i32::MAX);

        shifter.set_phase_shift(config.shifter_channel, 0);

        Ok(Self {
            rising: TransitionDetector::new(Polarity::Rising, &config),
            falling: TransitionDetector::new(Polarity::Falling, &config),
            config,
            cursor_ps: 0,
            range_ps,
            step_ps,
            busy_polls: 0,
        })
    }

    /// Perform at most one scan step.
    pub fn update<S, T>(
        &mut self,
        shifter: &mut S,
        source: &mut T,
    ) -> Result<ScanProgress, CalibrationError>
    where
        S: PhaseShifter,
        T: TimestampSource,
    {
        if shifter.is_busy(self.config.shifter_channel) {
            self.busy_polls = self.busy_polls.saturating_add(1);
            if self.busy_polls > self.config.shifter_busy_limit {
                #[cfg(feature = "defmt")]
                defmt::error!("RXTS calibration: shifter stuck at {=i32}ps", self.cursor_ps);
                return Err(CalibrationError::ShifterTimeout);
            }
            return Ok(ScanProgress::Pending);
        }
        self.busy_polls = 0;

        let flip = source.calibration_pulse();
        self.rising.update(flip, self.cursor_ps);
        self.falling.update(flip, self.cursor_ps);

        if self.cursor_ps >= self.range_ps {
            return self.finish().map(ScanProgress::Done);
        }

        self.cursor_ps = self.cursor_ps.saturating_add(self.step_ps);
        shifter.set_phase_shift(self.config.shifter_channel, self.cursor_ps);
        Ok(ScanProgress::Pending)
    }

    fn finish(&self) -> Result<PhaseTransition, CalibrationError> {
        let (Some(rising), Some(falling)) =
            (self.rising.detected_phase(), self.falling.detected_phase())
        else {
            #[cfg(feature = "defmt")]
            defmt::warn!(
                "RXTS calibration error: rising {}, falling {}",
                self.rising.state(),
                self.falling.state()
            );
            return Err(CalibrationError::CalibrationRangeExhausted);
        };

        let t24p = combine_edges(rising, falling, self.config.reference_period_ps);

        #[cfg(feature = "defmt")]
        defmt::info!(
            "RXTS calibration: R@{=i32}ps, F@{=i32}ps, transition@{=u32}ps",
            rising,
            falling,
            t24p.get()
        );

        Ok(t24p)
    }

    /// Current shifter phase commanded by the scan.
    pub const fn cursor_ps(&self) -> i32 {
        self.cursor_ps
    }

    /// Phase the cursor must reach before the scan is evaluated.
    pub const fn range_ps(&self) -> i32 {
        self.range_ps
    }

    /// Rising-edge detector.
    pub const fn rising(&self) -> &TransitionDetector {
        &self.rising
    }

    /// Falling-edge detector.
    pub const fn falling(&self) -> &TransitionDetector {
        &self.falling
    }
}

/// Poll `session` until it completes or fails.
pub fn run_to_completion<S, T>(
    session: &mut CalibrationSession,
    shifter: &mut S,
    source: &mut T,
) -> Result<PhaseTransition, CalibrationError>
where
    S: PhaseShifter,
    T: TimestampSource,
{
    loop {
        if let ScanProgress::Done(t24p) = session.update(shifter, source)? {
            return Ok(t24p);
        }
    }
}

/// Derive the transition phase from the two localized edges.
///
/// The falling edge, moved by half a period, is a second sample of the rising
/// edge; the result is the mean of both, folded into `[0, period)`. Equal
/// edges give the rising phase.
pub fn combine_edges(rising_ps: i32, falling_ps: i32, period_ps: u32) -> PhaseTransition {
    let rising = i64::from(normalize_phase(i64::from(rising_ps), period_ps));
    let falling = i64::from(normalize_phase(i64::from(falling_ps), period_ps));
    let half = i64::from(period_ps / 2);

    // All operands are below 2^32; no i64 overflow.
    #[allow(clippy::arithmetic_side_effects)]
    let mean = {
        let second = match falling.cmp(&rising) {
            core::cmp::Ordering::Greater => falling - half,
            core::cmp::Ordering::Less => falling + half,
            core::cmp::Ordering::Equal => rising,
        };
        // Truncates toward zero; the fold below handles the negative case.
        (rising + second) / 2
    };

    PhaseTransition::from_normalized(normalize_phase(mean, period_ps))
}
