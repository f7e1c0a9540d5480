//! White Rabbit node firmware glue
//!
//! Wires the calibration and bang-bang loop crates to the node: the tag
//! interrupt statics, the EEPROM store for the transition phase, the RX
//! timestamp correction it feeds, and the `calibration`/`ptrack` shell
//! commands.
//!
//! # Architecture
//!
//! ```text
//! Shell commands (shell)                      Tag interrupt (irq)
//!         ↓                                           ↓
//! CalibrationOrchestrator ── LoopShifter ──▶ SharedLoopState ◀── TagService
//!         ↓                                                          ↓
//! EepromPhaseStore (store)   RxTimestampCorrection (rx_correction)  DAC
//! ```
//!
//! # Features
//!
//! - `hardware` - defmt logging over RTT for node builds
//! - `emulator` - desktop simulator (tokio, tracing), see [`sim`]
//! - `std` - Enable standard library (for emulator and testing)
//!
//! # Examples
//!
//! ## Simulator
//!
//! ```bash
//! RUST_LOG=debug cargo run --bin wrc_sim --features emulator
//! ```

#![cfg_attr(all(not(test), not(feature = "std")), no_std)]
// Upgrade relevant warns to deny; keep pedantic as warn
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// Critical correctness: deny these
#![deny(clippy::await_holding_lock)] // holding a blocking Mutex across .await is a bug
#![deny(unsafe_op_in_unsafe_fn)]
// unsafe fn body is not implicitly unsafe block
// Logging discipline
#![warn(clippy::print_stdout)] // prefer tracing/defmt over println! in lib code
#![warn(clippy::dbg_macro)] // dbg! should not be left in committed code
// Intentional allows for this codebase:
#![allow(clippy::module_name_repetitions)] // common in Rust crates; not a real issue
#![allow(clippy::missing_errors_doc)] // most errors are self-explanatory
#![allow(clippy::must_use_candidate)]
#![allow(clippy::doc_markdown)]

#[cfg(feature = "hardware")]
use defmt_rtt as _;

pub mod config;
pub mod irq;
pub mod rx_correction;
pub mod shell;
pub mod store;

#[cfg(feature = "emulator")]
pub mod sim;

// Re-export key types
pub use rx_correction::{linearize, RawRxTimestamp, RxTimestampCorrection};
pub use shell::{ptrack, CalibrationCommand, CommandError, CommandLine, PhaseTracking};
pub use store::{EepromPhaseStore, StoreError};
