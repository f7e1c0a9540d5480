//! Type system enforcement tests for timing-core newtypes.
//! The persisted t24p word and the timestamp representation are shared with
//! other firmware generations, so their encodings are pinned here.

// ── PhaseTransition ──────────────────────────────────────────────────────────

#[test]
fn phase_transition_is_one_word() {
    use platform::PhaseTransition;
    assert_eq!(core::mem::size_of::<PhaseTransition>(), 4);
}

#[test]
fn phase_transition_accepts_full_31_bit_range() {
    use platform::PhaseTransition;
    assert_eq!(PhaseTransition::new(0).map(PhaseTransition::get), Ok(0));
    assert_eq!(
        PhaseTransition::new(0x7FFF_FFFF).map(PhaseTransition::get),
        Ok(0x7FFF_FFFF)
    );
    assert!(PhaseTransition::new(0x8000_0000).is_err());
}

#[test]
fn stored_word_round_trips_a_period_value() {
    use platform::PhaseTransition;
    let t24p = PhaseTransition::from_normalized(7_999);
    let word = t24p.to_stored_word();
    assert_eq!(word & 0x8000_0000, 0x8000_0000, "validity flag must be set");
    assert_eq!(PhaseTransition::from_stored_word(word), Some(t24p));
}

#[test]
fn from_normalized_masks_flag_bit() {
    use platform::PhaseTransition;
    assert_eq!(PhaseTransition::from_normalized(0x8000_0010).get(), 0x10);
}

// ── CalibrationConfig ────────────────────────────────────────────────────────

#[test]
fn default_config_matches_reference_constants() {
    use platform::config::{
        CAL_DEGLITCH_THRESHOLD, CAL_SCAN_STEP_PS, CAL_SHIFTER_CHANNEL, REF_CLOCK_PERIOD_PS,
    };
    use platform::CalibrationConfig;
    let config = CalibrationConfig::default();
    assert_eq!(config.reference_period_ps, REF_CLOCK_PERIOD_PS);
    assert_eq!(config.scan_step_ps, CAL_SCAN_STEP_PS);
    assert_eq!(config.deglitch_threshold, CAL_DEGLITCH_THRESHOLD);
    assert_eq!(config.shifter_channel, CAL_SHIFTER_CHANNEL);
    assert_eq!(config.backdate_ps(), 500);
}

#[test]
fn node_mode_names_match_shell_output() {
    use platform::NodeMode;
    assert_eq!(NodeMode::Master.as_str(), "master");
    assert_eq!(NodeMode::Slave.as_str(), "slave");
}

// ── Timestamp ────────────────────────────────────────────────────────────────

#[test]
fn timestamp_normalizes_negative_phase_into_previous_nanosecond() {
    use platform::Timestamp;
    let ts = Timestamp::new(10, 500, -1);
    assert_eq!(ts.seconds(), 10);
    assert_eq!(ts.nanoseconds(), 499);
    assert_eq!(ts.phase_ps(), 999);
}

#[test]
fn timestamp_carries_nanoseconds_into_seconds() {
    use platform::Timestamp;
    let ts = Timestamp::new(1, 999_999_999, 1_500);
    assert_eq!(ts.seconds(), 2);
    assert_eq!(ts.nanoseconds(), 0);
    assert_eq!(ts.phase_ps(), 500);
}

#[test]
fn timestamp_difference_is_picosecond_exact() {
    use platform::Timestamp;
    let a = Timestamp::new(5, 100, 250);
    let b = Timestamp::new(4, 999_999_900, 750);
    assert_eq!((a - b).to_picoseconds(), 199_500);
}
