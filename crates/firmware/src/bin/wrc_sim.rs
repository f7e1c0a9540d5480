//! White Rabbit node simulator
//!
//! Runs the bang-bang loop against a simulated oscillator in a tokio task,
//! then replays a short shell session (`calibration`, `ptrack`) against a
//! simulated TSU whose flip-bit transition sits at [`HIDDEN_TRANSITION_PS`].
//!
//! Run with: RUST_LOG=debug cargo run --bin wrc_sim --features emulator

#![allow(clippy::print_stdout)]

use core::fmt::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use calibration::CalibrationOrchestrator;
use firmware::config::{PreconditionConfig, SOFTPLL_REF_CHANNEL, TAG_FIFO_DEPTH};
use firmware::irq::{LOOP_STATE, RX_CORRECTION, TAG_FIFO};
use firmware::sim::{
    drive_loop, LoopLockMonitor, PacedShifter, SimulatedLink, SimulatedOscillator, SimulatedTsu,
    StdDelay, TracingDac,
};
use firmware::{ptrack, CalibrationCommand, CommandError, CommandLine, EepromPhaseStore};
use firmware::{PhaseTracking, RawRxTimestamp};
use platform::mocks::MockEeprom;
use platform::CalibrationConfig;
use softpll::{BangBangConfig, BangBangLoop, LoopMode, LoopShifter, TagService};
use tracing_subscriber::EnvFilter;

/// Where the simulated TSU flips from low to high.
const HIDDEN_TRANSITION_PS: u32 = 2_500;

/// Actuator code at which the oscillator is in phase with the reference,
/// 400 codes above mid-scale.
const BALANCE_CODE: u16 = 0x8190;

/// Starting actuator code.
const MID_SCALE: u16 = 0x8000;

/// Simulated reference tick.
const TICK: Duration = Duration::from_millis(1);

/// Shell session replayed after the loop has started.
const SESSION: [&str; 4] = ["calibration", "calibration", "ptrack disable", "ptrack"];

static STOP: AtomicBool = AtomicBool::new(false);
static TRACKING: PhaseTracking = PhaseTracking::new(true);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let loop_config = BangBangConfig::default();
    let pll = BangBangLoop::new(loop_config, &LOOP_STATE).map_err(|err| err.to_string())?;
    let mut service: TagService<'static, TracingDac, TAG_FIFO_DEPTH> =
        TagService::new(&TAG_FIFO, pll, TracingDac);
    service
        .restart(LoopMode::Slave, SOFTPLL_REF_CHANNEL, MID_SCALE)
        .map_err(|err| err.to_string())?;
    tracing::info!("bang-bang loop started");

    let oscillator = SimulatedOscillator::new(&loop_config, BALANCE_CODE);
    let plant = tokio::spawn(drive_loop(&TAG_FIFO, service, oscillator, TICK, &STOP));

    let session = tokio::task::spawn_blocking(move || run_session(loop_config)).await?;
    STOP.store(true, Ordering::Release);
    let restarts = plant.await?;

    let transcript = session.map_err(|err| err.to_string())?;
    print!("{transcript}");

    let raw = RawRxTimestamp {
        seconds: 1,
        nanoseconds: 800,
        dmtd_phase_ps: 5_499,
        counter_ahead: true,
    };
    if let Some(ts) = RX_CORRECTION.linearize(&raw) {
        println!(
            "RX timestamp {}s {}ns {}ps linearized to {}s {}ns {}ps",
            raw.seconds,
            raw.nanoseconds,
            raw.dmtd_phase_ps,
            ts.seconds(),
            ts.nanoseconds(),
            ts.phase_ps()
        );
    }

    let state = LOOP_STATE.snapshot();
    tracing::info!(
        actuator = state.actuator,
        locked = state.locked,
        tags = state.tag_count,
        restarts,
        "simulation finished"
    );
    Ok(())
}

/// Replay [`SESSION`] and return the shell transcript.
fn run_session(loop_config: BangBangConfig) -> Result<String, CommandError> {
    let shifter = PacedShifter::new(
        LoopShifter::new(&LOOP_STATE, loop_config),
        Duration::from_micros(50),
    );
    let tsu = SimulatedTsu::new(&LOOP_STATE, loop_config, HIDDEN_TRANSITION_PS);
    let store = EepromPhaseStore::i2c(MockEeprom::<8192>::new());
    let mut orchestrator = CalibrationOrchestrator::new(
        CalibrationConfig::default(),
        shifter,
        tsu,
        store,
        &RX_CORRECTION,
    )?;
    let mut calibration = CalibrationCommand::new(
        SimulatedLink,
        LoopLockMonitor::new(&LOOP_STATE),
        StdDelay,
        PreconditionConfig::default(),
    );

    let mut out = String::new();
    for line in SESSION {
        writeln!(out, "wrc# {line}")?;
        let Some(command) = CommandLine::parse(line)? else {
            continue;
        };
        match command.name {
            "calibration" => {
                let t24p = calibration.run(&command.args, &mut orchestrator, &mut out)?;
                tracing::info!(t24p_ps = t24p.get(), "calibration done");
            }
            "ptrack" => {
                ptrack(&command.args, &TRACKING, &mut out)?;
            }
            other => writeln!(out, "unknown command: {other}")?,
        }
    }
    Ok(out)
}
