//! SoftPLL error type

use thiserror_no_std::Error;

/// SoftPLL failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SoftPllError {
    /// Tags were dropped because the FIFO was full. Fatal until restart.
    #[error("tag FIFO overrun")]
    FifoOverrun,
    /// A loop parameter is unusable.
    #[error("invalid loop config: {0}")]
    InvalidConfig(&'static str),
}

impl SoftPllError {
    /// Short name for log lines and shell output.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::FifoOverrun => "fifo overrun",
            Self::InvalidConfig(reason) => reason,
        }
    }
}
