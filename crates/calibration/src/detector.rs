//! Flip-bit transition detector
//!
//! One detector looks for one edge polarity. It first waits for a run of
//! `threshold` samples of the *inactive* level, then for a run of `threshold`
//! samples of the *active* level. The edge is then placed `threshold` steps
//! behind the phase of the sample that completed the second run, i.e. one
//! step before the first active sample of that run.
//!
//! ```text
//!   flip   0 0 0 0 0 0 1 0 0 1 1 1 1 1
//!          └─inactive─┘ │     └─active─┘
//!                     glitch        ↑ Done, phase back-dated by T steps
//! ```
//!
//! Runs shorter than the threshold (jitter glitches near the transition)
//! restart the count and never move the detector forward.

use platform::CalibrationConfig;

/// Edge polarity a detector is looking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Polarity {
    /// Flip bit going from `false` to `true`.
    Rising,
    /// Flip bit going from `true` to `false`.
    Falling,
}

impl Polarity {
    /// Flip-bit level the polarity ends on.
    pub const fn active_level(self) -> bool {
        matches!(self, Self::Rising)
    }

    /// Short name for log lines.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Rising => "rising",
            Self::Falling => "falling",
        }
    }
}

/// Detector progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DetectorState {
    /// Counting samples of the inactive level.
    WaitInactive,
    /// Inactive level confirmed; counting samples of the active level.
    SeenTransition,
    /// Transition localized. Terminal.
    Done,
}

/// Deglitching transition detector for one polarity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionDetector {
    polarity: Polarity,
    threshold: u32,
    backdate_ps: i32,
    state: DetectorState,
    run_length: u32,
    previous_sample: Option<bool>,
    detected_phase: i32,
}

impl TransitionDetector {
    /// Fresh detector using the threshold and step of `config`.
    pub fn new(polarity: Polarity, config: &CalibrationConfig) -> Self {
        Self {
            polarity,
            threshold: config.deglitch_threshold,
            backdate_ps: i32::try_from(config.backdate_ps()).unwrap_or(i32::MAX),
            state: DetectorState::WaitInactive,
            run_length: 0,
            previous_sample: None,
            detected_phase: 0,
        }
    }

    /// Feed one flip-bit sample taken at `phase_ps`.
    ///
    /// Returns `true` once the transition is localized, and on every call
    /// after that.
    pub fn update(&mut self, flip: bool, phase_ps: i32) -> bool {
        let active = flip == self.polarity.active_level();
        self.previous_sample = Some(flip);

        match self.state {
            DetectorState::WaitInactive => {
                if active {
                    self.run_length = 0;
                } else {
                    self.run_length = self.run_length.saturating_add(1);
                }
                if self.run_length >= self.threshold {
                    self.state = DetectorState::SeenTransition;
                    self.run_length = 0;
                }
                false
            }
            DetectorState::SeenTransition => {
                if !active {
                    self.run_length = 0;
                    return false;
                }
                self.run_length = self.run_length.saturating_add(1);
                if self.run_length < self.threshold {
                    return false;
                }
                self.state = DetectorState::Done;
                self.detected_phase = phase_ps.saturating_sub(self.backdate_ps);
                true
            }
            DetectorState::Done => true,
        }
    }

    /// Polarity this detector looks for.
    pub const fn polarity(&self) -> Polarity {
        self.polarity
    }

    /// Current state.
    pub const fn state(&self) -> DetectorState {
        self.state
    }

    /// `true` once the transition is localized.
    pub fn is_done(&self) -> bool {
        self.state == DetectorState::Done
    }

    /// Localized transition phase (unnormalized), once [`is_done`](Self::is_done).
    pub fn detected_phase(&self) -> Option<i32> {
        self.is_done().then_some(self.detected_phase)
    }

    /// Last sample fed to the detector.
    pub const fn previous_sample(&self) -> Option<bool> {
        self.previous_sample
    }
}

#[cfg(test)]
#[allow(clippy::arithmetic_side_effects)]
mod tests {
    use super::*;

    fn detector(polarity: Polarity) -> TransitionDetector {
        TransitionDetector::new(polarity, &CalibrationConfig::default())
    }

    /// Feed `samples` at 100 ps steps starting from phase 0; return the phase
    /// of the sample that completed detection.
    fn feed(det: &mut TransitionDetector, samples: &[bool]) -> Option<i32> {
        let mut phase = 0;
        for &flip in samples {
            if det.update(flip, phase) {
                return Some(phase);
            }
            phase += 100;
        }
        None
    }

    #[test]
    fn clean_rising_edge_is_backdated_by_threshold_steps() {
        let mut det = detector(Polarity::Rising);
        let samples = [false, false, false, false, false, true, true, true, true, true];
        assert_eq!(feed(&mut det, &samples), Some(900));
        assert_eq!(det.detected_phase(), Some(400));
    }

    #[test]
    fn falling_detector_mirrors_rising() {
        let mut det = detector(Polarity::Falling);
        let samples = [true, true, true, true, true, false, false, false, false, false];
        assert_eq!(feed(&mut det, &samples), Some(900));
        assert_eq!(det.detected_phase(), Some(400));
    }

    #[test]
    fn active_sample_restarts_inactive_run() {
        let mut det = detector(Polarity::Rising);
        // Four inactive, one active, then only four more inactive: not enough.
        let samples = [false, false, false, false, true, false, false, false, false];
        assert_eq!(feed(&mut det, &samples), None);
        assert_eq!(det.state(), DetectorState::WaitInactive);
    }

    #[test]
    fn short_glitch_after_transition_is_ignored() {
        let mut det = detector(Polarity::Rising);
        let samples = [
            false, false, false, false, false, // inactive run
            true, true, false, // glitch back to inactive
            true, true, true, true, true, // real active run starts at 800
        ];
        assert_eq!(feed(&mut det, &samples), Some(1_200));
        assert_eq!(det.detected_phase(), Some(700));
    }

    #[test]
    fn threshold_three_recovers_from_a_single_glitch() {
        let config = CalibrationConfig {
            deglitch_threshold: 3,
            ..CalibrationConfig::default()
        };
        let mut det = TransitionDetector::new(Polarity::Rising, &config);
        let samples = [false, false, false, true, false, true, true, true];
        assert_eq!(feed(&mut det, &samples), Some(700));
        assert_eq!(det.detected_phase(), Some(400));
    }

    #[test]
    fn run_one_short_of_threshold_never_advances() {
        let mut det = detector(Polarity::Rising);
        assert_eq!(feed(&mut det, &[false; 4]), None);
        assert_eq!(det.state(), DetectorState::WaitInactive);

        let mut det = detector(Polarity::Rising);
        let samples = [false, false, false, false, false, true, true, true, true, false];
        assert_eq!(feed(&mut det, &samples), None);
        assert_eq!(det.state(), DetectorState::SeenTransition);
    }

    #[test]
    fn done_is_terminal() {
        let mut det = detector(Polarity::Rising);
        let samples = [false, false, false, false, false, true, true, true, true, true];
        feed(&mut det, &samples);
        assert!(det.update(false, 5_000));
        assert!(det.update(true, 5_100));
        assert_eq!(det.detected_phase(), Some(400));
    }

    #[test]
    fn no_phase_before_done() {
        let mut det = detector(Polarity::Falling);
        assert_eq!(det.detected_phase(), None);
        assert!(!det.update(true, 0));
        assert_eq!(det.previous_sample(), Some(true));
        assert_eq!(det.detected_phase(), None);
    }
}
