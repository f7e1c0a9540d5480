//! Hardware Abstraction Layer (HAL) for the White Rabbit node timing core
//!
//! This crate provides trait-based abstractions for the timing hardware the
//! calibration and control-loop crates drive, so both can be developed and
//! tested without a gateware bitstream.
//!
//! # Architecture Layers
//!
//! ```text
//! Application Layer (firmware crate: shell commands, tag service wiring)
//!         ↓
//! Feature Layers (calibration, softpll)
//!         ↓
//! Platform HAL (this crate - trait abstractions, newtypes, config)
//!         ↓
//! Gateware registers (TSU, SoftPLL, DMTD phase tracker)
//! ```
//!
//! # Collaborators
//!
//! - [`PhaseShifter`] - programmable delay of the sampling phase
//! - [`TimestampSource`] - calibration pulse with the TSU flip bit
//! - [`PhaseTransitionStore`] - durable t24p storage (EEPROM, one-wire)
//! - [`PhaseTransitionSink`] - RX timestamp correction consumer
//! - [`ActuatorDac`] - oscillator tuning DAC steered by the bang-bang loop
//! - [`LinkMonitor`], [`SlavePll`] - preconditions of the force measurement
//!
//! # Features
//!
//! - `std`: mock collaborators in [`mocks`] for host-side tests
//! - `defmt`: derive `defmt::Format` on platform types

// ── Lint policy ─────────────────────────────────────────────────────────────
#![deny(clippy::unwrap_used)] // no .unwrap() in production code
#![deny(clippy::expect_used)] // no .expect() in production code
#![deny(clippy::panic)] // no panic!() in production code
#![deny(clippy::unreachable)] // no unreachable!() that isn't documented
#![deny(unused_must_use)]
// all Results must be handled
// ────────────────────────────────────────────────────────────────────────────
#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::print_stdout)] // prefer tracing/defmt over println! in lib code
#![allow(clippy::doc_markdown)] // register names in doc comments
#![allow(clippy::must_use_candidate)] // hardware accessors, callers decide
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod config;
pub mod dac;
pub mod link;
pub mod phase;
pub mod shifter;
pub mod storage;
pub mod timestamp;

#[cfg(any(test, feature = "std"))]
pub mod mocks;

// Re-export collaborator traits
pub use dac::ActuatorDac;
pub use link::{LinkMonitor, SlavePll};
pub use shifter::{PhaseShifter, TimestampSource};
pub use storage::{PhaseTransitionSink, PhaseTransitionStore};

// Re-export shared types
pub use config::{CalibrationConfig, ConfigError, NodeMode};
pub use phase::{normalize_phase, OutOfRangeError, PhaseTransition};
pub use timestamp::Timestamp;
