//! Node wiring constants and shell timing
//!
//! Channel assignment follows the SoftPLL gateware: the main output is tag
//! channel 0, the first reference input is channel 1.

/// Depth of the tag FIFO between the gateware and the tag service.
///
/// At 2 tags per reference tick the service has 32 ticks of slack.
pub const TAG_FIFO_DEPTH: usize = 64;

/// Tag channel of the main (steered) output clock.
pub const SOFTPLL_OUT_CHANNEL: u8 = 0;

/// Tag channel of the reference clock.
pub const SOFTPLL_REF_CHANNEL: u8 = 1;

/// Poll interval while waiting for link-up or PLL lock.
pub const PRECONDITION_POLL_MS: u32 = 100;

/// Bounds on the waits before a forced measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PreconditionConfig {
    /// Delay between two polls.
    pub poll_interval_ms: u32,
    /// Polls of the link status before giving up.
    pub link_timeout_polls: u32,
    /// Polls of the PLL lock status before giving up.
    pub lock_timeout_polls: u32,
}

impl Default for PreconditionConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: PRECONDITION_POLL_MS,
            // 60 s each
            link_timeout_polls: 600,
            lock_timeout_polls: 600,
        }
    }
}
