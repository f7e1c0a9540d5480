//! Software PLL: tag FIFO and bang-bang control loop
//!
//! The gateware timestamps reference and output clock edges with a DMTD and
//! queues the results as tags. This crate consumes them:
//!
//! ```text
//!  gateware ──push──▶ TagFifo ──drain──▶ TagService ──on_tag──▶ BangBangLoop
//!                                            │                      │
//!                                            ▼                      ▼
//!                                       ActuatorDac          SharedLoopState
//!                                                        (snapshot, shift target)
//! ```
//!
//! [`TagService`] runs in the tag notification context. The foreground sees
//! the loop only through [`SharedLoopState`]: a critical-section snapshot of
//! the channel state and the single-writer phase shift target, which
//! [`LoopShifter`] exposes as a [`platform::PhaseShifter`] for calibration.

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

pub mod bangbang;
pub mod error;
pub mod service;
pub mod state;
pub mod tag;

pub use bangbang::{BangBangConfig, BangBangLoop, LoopMode};
pub use error::SoftPllError;
pub use service::TagService;
pub use state::{ChannelState, LoopShifter, SharedLoopState};
pub use tag::{Tag, TagFifo};
