//! Deglitching properties of the transition detector over the whole
//! threshold range, in both polarities.

#![allow(clippy::arithmetic_side_effects)]
#![allow(clippy::unwrap_used)]

use calibration::{DetectorState, Polarity, TransitionDetector};
use platform::CalibrationConfig;
use proptest::prelude::*;

fn config(threshold: u32, step: u32) -> CalibrationConfig {
    CalibrationConfig {
        deglitch_threshold: threshold,
        scan_step_ps: step,
        ..CalibrationConfig::default()
    }
}

fn polarity(rising: bool) -> Polarity {
    if rising {
        Polarity::Rising
    } else {
        Polarity::Falling
    }
}

/// `len` samples at the inactive (`active == false`) or active level.
fn run(polarity: Polarity, active: bool, len: u32) -> Vec<bool> {
    let level = match polarity {
        Polarity::Rising => active,
        Polarity::Falling => !active,
    };
    vec![level; usize::try_from(len).unwrap()]
}

/// Feed `samples` at `step` ps from phase 0; the phase that completed
/// detection, if any.
fn feed(det: &mut TransitionDetector, samples: &[bool], step: u32) -> Option<i32> {
    let step = i32::try_from(step).unwrap();
    let mut phase = 0;
    for &flip in samples {
        if det.update(flip, phase) {
            return Some(phase);
        }
        phase += step;
    }
    None
}

fn threshold_and_glitch() -> impl Strategy<Value = (u32, u32)> {
    (1u32..=10).prop_flat_map(|t| (Just(t), 0..t))
}

proptest! {
    /// An inactive run of T-1 followed by an active sample leaves the
    /// detector waiting; an active run of T-1 broken by an inactive sample
    /// never completes.
    #[test]
    fn run_one_short_never_advances(
        threshold in 2u32..=10,
        rising in any::<bool>(),
        step in 1u32..=500,
    ) {
        let polarity = polarity(rising);
        let config = config(threshold, step);

        let mut det = TransitionDetector::new(polarity, &config);
        let mut samples = run(polarity, false, threshold - 1);
        samples.extend(run(polarity, true, 1));
        prop_assert_eq!(feed(&mut det, &samples, step), None);
        prop_assert_eq!(det.state(), DetectorState::WaitInactive);

        let mut det = TransitionDetector::new(polarity, &config);
        let mut samples = run(polarity, false, threshold);
        samples.extend(run(polarity, true, threshold - 1));
        samples.extend(run(polarity, false, 1));
        prop_assert_eq!(feed(&mut det, &samples, step), None);
        prop_assert_eq!(det.state(), DetectorState::SeenTransition);
    }

    /// Glitches shorter than T on either side of the edge are absorbed and
    /// the edge is back-dated by exactly T steps from the completing sample.
    #[test]
    fn glitches_shorter_than_threshold_are_absorbed(
        (threshold, glitch) in threshold_and_glitch(),
        lead in 0u32..10,
        rising in any::<bool>(),
        step in 1u32..=500,
    ) {
        let polarity = polarity(rising);
        let config = config(threshold, step);
        let lead = lead % threshold;

        // Short inactive lead-in cut by an active sample, the real inactive
        // run, a short active glitch cut by an inactive sample, then the
        // real active run.
        let mut samples = run(polarity, false, lead);
        samples.extend(run(polarity, true, 1));
        samples.extend(run(polarity, false, threshold));
        samples.extend(run(polarity, true, glitch));
        samples.extend(run(polarity, false, 1));
        samples.extend(run(polarity, true, threshold));

        let mut det = TransitionDetector::new(polarity, &config);
        let completing = feed(&mut det, &samples, step);

        let last = i32::try_from(samples.len() - 1).unwrap();
        let step = i32::try_from(step).unwrap();
        let threshold = i32::try_from(threshold).unwrap();
        prop_assert_eq!(completing, Some(last * step));
        prop_assert_eq!(det.detected_phase(), Some(last * step - threshold * step));
    }
}
