//! RX timestamper transition-phase calibration
//!
//! Locates the phase ("t24p") at which the TSU flip bit changes state, by
//! sweeping the sampling phase across one reference period while generating
//! calibration pulses. Built from three layers:
//!
//! - [`TransitionDetector`] - deglitching state machine for one edge polarity
//! - [`CalibrationSession`] - non-blocking scan driving the shifter and both
//!   detectors, one step per [`CalibrationSession::update`]
//! - [`CalibrationOrchestrator`] - master/slave policy around the scan and the
//!   persistent store
//!
//! The PLL must be locked in slave mode before a scan is started; the
//! orchestrator only checks this on the forced path.

// ── Lint policy ─────────────────────────────────────────────────────────────
#![deny(clippy::unwrap_used)] // no .unwrap() in production code
#![deny(clippy::expect_used)] // no .expect() in production code
#![deny(clippy::panic)] // no panic!() in production code
#![deny(unused_must_use)]
// ────────────────────────────────────────────────────────────────────────────
#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]

pub mod detector;
pub mod error;
pub mod orchestrator;
pub mod scanner;

pub use detector::{DetectorState, Polarity, TransitionDetector};
pub use error::CalibrationError;
pub use orchestrator::CalibrationOrchestrator;
pub use scanner::{combine_edges, run_to_completion, CalibrationSession, ScanProgress};
