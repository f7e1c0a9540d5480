//! `calibration` command integration tests
//!
//! Drives the shell command end to end with mock collaborators: the scan
//! runs against a square-wave flip bit, the value lands in a mock EEPROM at
//! the I2C offset, and the RX correction picks it up.
//!
//! Run with: cargo test -p firmware --test shell_calibration

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use calibration::{CalibrationError, CalibrationOrchestrator};
use embedded_hal_mock::eh1::delay::NoopDelay;
use firmware::config::PreconditionConfig;
use firmware::store::I2C_EEPROM_T24P_OFFSET;
use firmware::{CalibrationCommand, CommandError, EepromPhaseStore, RxTimestampCorrection};
use platform::mocks::{MockEeprom, MockLink, MockPll, MockShifter, SquareWaveSource};
use platform::{CalibrationConfig, PhaseTransition};

type Eeprom = MockEeprom<8192>;
type Orchestrator<'a> = CalibrationOrchestrator<
    MockShifter,
    SquareWaveSource,
    EepromPhaseStore<Eeprom>,
    &'a RxTimestampCorrection,
>;

const WORD: core::ops::Range<usize> = 0x1000..0x1004;

/// Orchestrator whose flip bit is high in `[2500, 6500)`.
fn orchestrator(eeprom: Eeprom, correction: &RxTimestampCorrection) -> Orchestrator<'_> {
    let shifter = MockShifter::new();
    let source = SquareWaveSource::new(shifter.phase_handle(), 8_000, 2_500, 6_500);
    CalibrationOrchestrator::new(
        CalibrationConfig::default(),
        shifter,
        source,
        EepromPhaseStore::i2c(eeprom),
        correction,
    )
    .unwrap()
}

fn eeprom_holding(phase_ps: u32) -> Eeprom {
    let mut eeprom = Eeprom::new();
    let word = PhaseTransition::new(phase_ps).unwrap().to_stored_word();
    eeprom.bytes[WORD].copy_from_slice(&word.to_be_bytes());
    eeprom
}

fn command(link: MockLink, pll: MockPll) -> CalibrationCommand<MockLink, MockPll, NoopDelay> {
    CalibrationCommand::new(link, pll, NoopDelay::new(), PreconditionConfig::default())
}

fn stored_word(orchestrator: Orchestrator<'_>) -> [u8; 4] {
    let (_, _, store, _) = orchestrator.into_parts();
    let bytes = store.into_inner().bytes;
    <[u8; 4]>::try_from(&bytes[WORD]).unwrap()
}

#[test]
fn i2c_offset_matches_layout() {
    assert_eq!(I2C_EEPROM_T24P_OFFSET as usize, WORD.start);
}

#[test]
fn stored_value_is_used_without_touching_the_link() {
    let correction = RxTimestampCorrection::new();
    let mut orch = orchestrator(eeprom_holding(3_100), &correction);
    let mut cmd = command(MockLink::down(), MockPll::never_locks());
    let mut out = String::new();

    let t24p = cmd.run(&[], &mut orch, &mut out).unwrap();

    assert_eq!(t24p.get(), 3_100);
    assert_eq!(out, "Found phase transition in EEPROM: 3100ps\n");
    assert_eq!(correction.phase_transition(), Some(t24p));
    let (link, pll, _) = cmd.into_parts();
    assert_eq!(link.polls, 0);
    assert_eq!(pll.starts, 0);
}

#[test]
fn empty_store_measures_and_persists() {
    let correction = RxTimestampCorrection::new();
    let mut orch = orchestrator(Eeprom::new(), &correction);
    let mut cmd = command(MockLink::up_after(2), MockPll::locks_after(3));
    let mut out = String::new();

    let t24p = cmd.run(&[], &mut orch, &mut out).unwrap();

    assert_eq!(t24p.get(), 2_400);
    assert_eq!(
        out,
        "Measuring t2/t4 phase transition...\n\
         Waiting for link...\n\
         Locking PLL...\n\
         Calibrating RX timestamper...\n\
         t24p value is 2400 ps, storing to EEPROM\n"
    );
    assert_eq!(correction.phase_transition(), Some(t24p));
    assert_eq!(cmd.into_parts().1.starts, 1);
    assert_eq!(stored_word(orch), [0x80, 0x00, 0x09, 0x60]);
}

#[test]
fn force_remeasures_over_a_stored_value() {
    let correction = RxTimestampCorrection::new();
    let mut orch = orchestrator(eeprom_holding(7_000), &correction);
    let mut cmd = command(MockLink::up(), MockPll::locks_after(0));
    let mut out = String::new();

    let t24p = cmd.run(&["force"], &mut orch, &mut out).unwrap();

    assert_eq!(t24p.get(), 2_400);
    assert!(!out.contains("Found phase transition"));
    assert_eq!(stored_word(orch), [0x80, 0x00, 0x09, 0x60]);
}

#[test]
fn second_invocation_reads_back_the_measurement() {
    let correction = RxTimestampCorrection::new();
    let mut orch = orchestrator(Eeprom::new(), &correction);
    let mut cmd = command(MockLink::up(), MockPll::locks_after(0));

    let mut out = String::new();
    let measured = cmd.run(&[], &mut orch, &mut out).unwrap();
    out.clear();
    let reloaded = cmd.run(&[], &mut orch, &mut out).unwrap();

    assert_eq!(measured, reloaded);
    assert_eq!(out, "Found phase transition in EEPROM: 2400ps\n");
}

#[test]
fn link_that_never_comes_up_fails_the_measurement() {
    let correction = RxTimestampCorrection::new();
    let mut orch = orchestrator(Eeprom::new(), &correction);
    let mut cmd = command(MockLink::down(), MockPll::locks_after(0));
    let mut out = String::new();

    let result = cmd.run(&["force"], &mut orch, &mut out);

    assert_eq!(
        result,
        Err(CommandError::Calibration(CalibrationError::LinkDown))
    );
    assert!(out.starts_with("Waiting for link...\nlink timeout\nLocking PLL...\n"));
    assert!(!out.contains("lock timeout"));
    assert_eq!(correction.phase_transition(), None);
    assert_eq!(stored_word(orch), [0xFF; 4]);
}

#[test]
fn pll_that_never_locks_fails_the_measurement() {
    let correction = RxTimestampCorrection::new();
    let mut orch = orchestrator(Eeprom::new(), &correction);
    let mut cmd = command(MockLink::up(), MockPll::never_locks());
    let mut out = String::new();

    let result = cmd.run(&["force"], &mut orch, &mut out);

    assert_eq!(
        result,
        Err(CommandError::Calibration(CalibrationError::PllUnlocked))
    );
    assert_eq!(
        out,
        "Waiting for link...\n\
         Locking PLL...\n\
         lock timeout\n\
         Calibrating RX timestamper...\n"
    );
    assert_eq!(correction.phase_transition(), None);
}

#[test]
fn unreadable_store_falls_through_to_measurement() {
    let correction = RxTimestampCorrection::new();
    let mut eeprom = Eeprom::new();
    eeprom.fail = true;
    let mut orch = orchestrator(eeprom, &correction);
    let mut cmd = command(MockLink::up(), MockPll::locks_after(0));
    let mut out = String::new();

    let result = cmd.run(&[], &mut orch, &mut out);

    // The write fails too, but the measured value is already active.
    assert_eq!(
        result,
        Err(CommandError::Calibration(CalibrationError::StoreUnavailable))
    );
    assert_eq!(
        correction.phase_transition().map(PhaseTransition::get),
        Some(2_400)
    );
}

#[test]
fn unknown_argument_is_rejected_before_any_work() {
    let correction = RxTimestampCorrection::new();
    let mut orch = orchestrator(Eeprom::new(), &correction);
    let mut cmd = command(MockLink::up(), MockPll::locks_after(0));
    let mut out = String::new();

    assert_eq!(
        cmd.run(&["sweep"], &mut orch, &mut out),
        Err(CommandError::InvalidArgument)
    );
    assert_eq!(
        cmd.run(&["force", "now"], &mut orch, &mut out),
        Err(CommandError::InvalidArgument)
    );
    assert!(out.is_empty());
    assert_eq!(cmd.into_parts().0.polls, 0);
}
