//! Calibration error type

use platform::ConfigError;
use thiserror_no_std::Error;

/// Failure of a calibration run or of the store around it.
///
/// Every variant is returned to the immediate caller; no default transition
/// phase is ever substituted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CalibrationError {
    /// The phase shifter stayed busy past the configured poll limit.
    #[error("phase shifter did not settle")]
    ShifterTimeout,
    /// The scan covered its whole range without localizing both edges.
    #[error("no flip-bit transition found in the scan range")]
    CalibrationRangeExhausted,
    /// The persistent store is empty, unreachable, or rejected a write.
    #[error("calibration store unavailable")]
    StoreUnavailable,
    /// The Ethernet link is down.
    #[error("link down")]
    LinkDown,
    /// The PLL has not locked to the master.
    #[error("PLL not locked")]
    PllUnlocked,
    /// The scan configuration is unusable.
    #[error("invalid calibration config: {0}")]
    InvalidConfig(ConfigError),
}

impl CalibrationError {
    /// Short name for log lines and shell output.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ShifterTimeout => "shifter timeout",
            Self::CalibrationRangeExhausted => "range exhausted",
            Self::StoreUnavailable => "store unavailable",
            Self::LinkDown => "link down",
            Self::PllUnlocked => "pll unlocked",
            Self::InvalidConfig(_) => "invalid config",
        }
    }
}

impl From<ConfigError> for CalibrationError {
    fn from(err: ConfigError) -> Self {
        Self::InvalidConfig(err)
    }
}
