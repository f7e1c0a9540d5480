//! Timing-core configuration and constants
//!
//! Central configuration values for the RX timestamper calibration. All
//! calibration code reads these through [`CalibrationConfig`] rather than
//! hardcoding values, so a gateware with a different reference clock only has
//! to change one place.

use thiserror_no_std::Error;

/// Reference clock period in picoseconds (125 MHz White Rabbit reference).
pub const REF_CLOCK_PERIOD_PS: u32 = 8_000;

/// How finely the phase shift range is scanned to find the flip-bit transition.
pub const CAL_SCAN_STEP_PS: u32 = 100;

/// Consecutive identical flip-bit samples required before a level is trusted.
///
/// Removes 1->0->1 flip-bit glitches caused by jitter near the transition.
pub const CAL_DEGLITCH_THRESHOLD: u32 = 5;

/// Phase shifter channel driven during calibration (the main PLL output).
pub const CAL_SHIFTER_CHANNEL: u8 = 0;

/// Consecutive "shifter busy" polls tolerated before the scan gives up.
///
/// A shift of one scan step settles within a few hundred tag periods on the
/// SoftPLL; this bound is two orders of magnitude above that.
pub const CAL_SHIFTER_BUSY_LIMIT: u32 = 1_000_000;

/// Node role with respect to the White Rabbit link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum NodeMode {
    /// Timing master: the transition phase is read back from storage.
    Master,
    /// Timing slave: the transition phase is measured on the locked link.
    Slave,
}

impl NodeMode {
    /// Short name used in log lines and shell output.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Master => "master",
            Self::Slave => "slave",
        }
    }
}

/// Error returned when a configuration value cannot drive the scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Reference period is zero or odd (the edge combination halves it).
    #[error("reference period {0} ps must be even and non-zero")]
    InvalidPeriod(u32),
    /// Scan step is zero or not smaller than the reference period.
    #[error("scan step {0} ps must be non-zero and below the reference period")]
    InvalidScanStep(u32),
    /// Deglitch threshold is zero.
    #[error("deglitch threshold must be at least one sample")]
    InvalidThreshold,
    /// Scan range does not fit the signed phase arithmetic.
    #[error("scan range overflows the phase accumulator")]
    RangeOverflow,
}

/// Calibration scan configuration.
///
/// The sweep range is one full reference period plus
/// `3 * deglitch_threshold * scan_step_ps` of headroom, so both transitions
/// are seen regardless of where they sit in the period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CalibrationConfig {
    /// Reference clock period in picoseconds.
    pub reference_period_ps: u32,
    /// Phase increment between two calibration pulses.
    pub scan_step_ps: u32,
    /// Consecutive samples required to accept a level.
    pub deglitch_threshold: u32,
    /// Phase shifter channel moved by the scan.
    pub shifter_channel: u8,
    /// Consecutive busy polls after which the shifter is declared stuck.
    pub shifter_busy_limit: u32,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            reference_period_ps: REF_CLOCK_PERIOD_PS,
            scan_step_ps: CAL_SCAN_STEP_PS,
            deglitch_threshold: CAL_DEGLITCH_THRESHOLD,
            shifter_channel: CAL_SHIFTER_CHANNEL,
            shifter_busy_limit: CAL_SHIFTER_BUSY_LIMIT,
        }
    }
}

impl CalibrationConfig {
    /// Check the configuration before a scan uses it.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.reference_period_ps == 0 || self.reference_period_ps % 2 != 0 {
            return Err(ConfigError::InvalidPeriod(self.reference_period_ps));
        }
        if self.scan_step_ps == 0 || self.scan_step_ps >= self.reference_period_ps {
            return Err(ConfigError::InvalidScanStep(self.scan_step_ps));
        }
        if self.deglitch_threshold == 0 {
            return Err(ConfigError::InvalidThreshold);
        }
        match self.checked_scan_range_ps() {
            Some(range) if i32::try_from(range).is_ok() => Ok(()),
            _ => Err(ConfigError::RangeOverflow),
        }
    }

    /// Phase the cursor must reach before the scan is evaluated.
    pub fn scan_range_ps(&self) -> u32 {
        self.checked_scan_range_ps().unwrap_or(u32::MAX)
    }

    /// Distance the detectors back-date a transition by.
    pub fn backdate_ps(&self) -> u32 {
        self.deglitch_threshold.saturating_mul(self.scan_step_ps)
    }

    fn checked_scan_range_ps(&self) -> Option<u32> {
        self.deglitch_threshold
            .checked_mul(self.scan_step_ps)?
            .checked_mul(3)?
            .checked_add(self.reference_period_ps)
    }
}
