//! Bang-bang phase control loop
//!
//! The loop compares every output-channel tag against the latest reference
//! tag and moves the actuator (oscillator tuning DAC) by a fixed step in the
//! direction that reduces the phase error:
//!
//! ```text
//! error = wrap(output - reference - setpoint)      wrap: (-M/2, M/2]
//! error > 0  → actuator += step
//! error < 0  → actuator -= step                    clamped to the DAC range
//! ```
//!
//! No proportional or integral term: the step is the only gain, which keeps
//! the loop trivially stable at the cost of a dither of one step around lock.
//!
//! The setpoint is walked toward the commanded shift target by `shift_step`
//! per reference tag, so the output phase moves smoothly. That walk is what
//! the calibration scan waits on when the shifter reports busy.

use platform::dac::{DAC_FULL_SCALE, DAC_MID_SCALE};

use crate::state::{ChannelState, SharedLoopState};
use crate::SoftPllError;

/// Tag modulus of the DMTD phase detector (2^14 units per reference period).
pub const DEFAULT_TAG_MODULUS: u32 = 1 << 14;

/// Loop operating mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LoopMode {
    /// Steer the local oscillator to an external reference.
    GrandMaster,
    /// No reference: count tags, hold the actuator.
    FreeRunningMaster,
    /// Steer the local oscillator to the recovered RX clock.
    Slave,
}

impl LoopMode {
    /// Short name for log lines and shell output.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::GrandMaster => "grandmaster",
            Self::FreeRunningMaster => "free-running master",
            Self::Slave => "slave",
        }
    }

    const fn steers(self) -> bool {
        !matches!(self, Self::FreeRunningMaster)
    }
}

/// Loop tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BangBangConfig {
    /// Tag units per reference period.
    pub tag_modulus: u32,
    /// Reference period in picoseconds, for unit conversion.
    pub reference_period_ps: u32,
    /// Channel whose tags are steered.
    pub output_channel: u8,
    /// Actuator change per comparison.
    pub step: u16,
    /// Largest |error| (tag units) counted as in band.
    pub lock_band: u32,
    /// Consecutive in-band (out-of-band) comparisons to assert (drop) lock.
    pub lock_samples: u32,
    /// Setpoint change per reference tag, in tag units.
    pub shift_step: i32,
    /// Lowest actuator code.
    pub actuator_min: u16,
    /// Highest actuator code.
    pub actuator_max: u16,
}

impl Default for BangBangConfig {
    fn default() -> Self {
        Self {
            tag_modulus: DEFAULT_TAG_MODULUS,
            reference_period_ps: platform::config::REF_CLOCK_PERIOD_PS,
            output_channel: 0,
            step: 8,
            lock_band: 64,
            lock_samples: 16,
            shift_step: 16,
            actuator_min: 0,
            actuator_max: u16::try_from(DAC_FULL_SCALE).unwrap_or(u16::MAX),
        }
    }
}

impl BangBangConfig {
    /// Check the tuning before a loop uses it.
    pub fn validate(&self) -> Result<(), SoftPllError> {
        if self.tag_modulus < 2 || self.tag_modulus > crate::tag::TAG_VALUE_MASK.saturating_add(1) {
            return Err(SoftPllError::InvalidConfig("tag modulus out of range"));
        }
        if self.reference_period_ps == 0 {
            return Err(SoftPllError::InvalidConfig("reference period is zero"));
        }
        if self.step == 0 {
            return Err(SoftPllError::InvalidConfig("actuator step is zero"));
        }
        if self.lock_samples == 0 {
            return Err(SoftPllError::InvalidConfig("lock sample count is zero"));
        }
        if self.shift_step <= 0 {
            return Err(SoftPllError::InvalidConfig("shift step must be positive"));
        }
        if self.actuator_min >= self.actuator_max {
            return Err(SoftPllError::InvalidConfig("empty actuator range"));
        }
        Ok(())
    }

    /// Convert picoseconds to tag units (truncating toward zero).
    pub fn ps_to_units(&self, phase_ps: i32) -> i32 {
        let units = i64::from(phase_ps).saturating_mul(i64::from(self.tag_modulus))
            / i64::from(self.reference_period_ps.max(1));
        i32::try_from(units).unwrap_or(if units < 0 { i32::MIN } else { i32::MAX })
    }

    /// Convert tag units to picoseconds (truncating toward zero).
    pub fn units_to_ps(&self, units: i32) -> i32 {
        let ps = i64::from(units).saturating_mul(i64::from(self.reference_period_ps))
            / i64::from(self.tag_modulus.max(1));
        i32::try_from(ps).unwrap_or(if ps < 0 { i32::MIN } else { i32::MAX })
    }

    /// Fold a phase difference into `(-M/2, M/2]`.
    pub fn wrap_error(&self, diff: i64) -> i32 {
        let modulus = i64::from(self.tag_modulus.max(1));
        let folded = diff.rem_euclid(modulus);
        // folded < modulus <= 2^24, so both branches fit an i32.
        #[allow(clippy::arithmetic_side_effects)]
        let wrapped = if folded > modulus / 2 { folded - modulus } else { folded };
        i32::try_from(wrapped).unwrap_or(0)
    }
}

/// Bang-bang control loop for one output channel.
pub struct BangBangLoop<'a> {
    config: BangBangConfig,
    shared: &'a SharedLoopState,
    mode: LoopMode,
    reference_channel: Option<u8>,
    running: bool,
    faulted: bool,
    reference_phase: Option<u32>,
    setpoint: i32,
    actuator: u16,
    in_band_run: u32,
    out_band_run: u32,
    locked: bool,
    tag_count: u32,
    last_tag_phase: u32,
    measured_phase: i32,
    phase_error: i32,
}

impl<'a> BangBangLoop<'a> {
    /// Create a stopped loop in slave mode publishing into `shared`.
    pub fn new(config: BangBangConfig, shared: &'a SharedLoopState) -> Result<Self, SoftPllError> {
        config.validate()?;
        let mut pll = Self {
            config,
            shared,
            mode: LoopMode::Slave,
            reference_channel: None,
            running: false,
            faulted: false,
            reference_phase: None,
            setpoint: 0,
            actuator: 0,
            in_band_run: 0,
            out_band_run: 0,
            locked: false,
            tag_count: 0,
            last_tag_phase: 0,
            measured_phase: 0,
            phase_error: 0,
        };
        pll.reset(
            LoopMode::Slave,
            None,
            u16::try_from(DAC_MID_SCALE).unwrap_or(u16::MAX / 2),
        );
        Ok(pll)
    }

    /// Reset the loop for `mode`, steering against `reference_channel` from
    /// `initial_actuator`. The loop stays stopped until [`start`](Self::start).
    ///
    /// A reference on the output channel would compare the output against
    /// itself; it is rejected and the loop is left untouched.
    pub fn init(
        &mut self,
        mode: LoopMode,
        reference_channel: u8,
        initial_actuator: u16,
    ) -> Result<(), SoftPllError> {
        if reference_channel == self.config.output_channel {
            #[cfg(feature = "defmt")]
            defmt::warn!(
                "bang-bang init rejected: ref ch {=u8} is the output channel",
                reference_channel
            );
            return Err(SoftPllError::InvalidConfig(
                "reference channel is the output channel",
            ));
        }
        self.reset(mode, Some(reference_channel), initial_actuator);
        Ok(())
    }

    fn reset(&mut self, mode: LoopMode, reference_channel: Option<u8>, initial_actuator: u16) {
        self.mode = mode;
        self.reference_channel = reference_channel;
        self.running = false;
        self.faulted = false;
        self.reference_phase = None;
        self.setpoint = 0;
        self.actuator = initial_actuator.clamp(self.config.actuator_min, self.config.actuator_max);
        self.in_band_run = 0;
        self.out_band_run = 0;
        self.locked = false;
        self.tag_count = 0;
        self.last_tag_phase = 0;
        self.measured_phase = 0;
        self.phase_error = 0;
        self.shared.set_shift_current(self.setpoint);
        self.publish();
    }

    /// Start consuming tags.
    pub fn start(&mut self) {
        self.running = true;
        #[cfg(feature = "defmt")]
        defmt::info!(
            "bang-bang start: {=str}, ref ch {}, out ch {=u8}, dac {=u16}",
            self.mode.as_str(),
            self.reference_channel,
            self.config.output_channel,
            self.actuator
        );
        self.publish();
    }

    /// Stop steering after a fatal error. Cleared by [`init`](Self::init).
    pub fn halt(&mut self) {
        self.faulted = true;
        self.running = false;
        self.locked = false;
        self.publish();
    }

    /// Process one tag. Returns the actuator code to output when the tag
    /// produced a comparison.
    pub fn on_tag(&mut self, channel: u8, value: u32) -> Option<u16> {
        if !self.running {
            return None;
        }
        self.tag_count = self.tag_count.wrapping_add(1);

        let code = if Some(channel) == self.reference_channel {
            self.reference_phase = Some(value % self.config.tag_modulus);
            self.walk_setpoint();
            None
        } else if channel == self.config.output_channel {
            self.last_tag_phase = value;
            self.compare(value)
        } else {
            None
        };

        self.publish();
        code
    }

    fn compare(&mut self, output: u32) -> Option<u16> {
        if !self.mode.steers() {
            return None;
        }
        let reference = self.reference_phase?;

        self.measured_phase = self
            .config
            .wrap_error(i64::from(output) - i64::from(reference));
        self.phase_error = self
            .config
            .wrap_error(i64::from(self.measured_phase) - i64::from(self.setpoint));

        self.actuator = match self.phase_error.signum() {
            1 => self
                .actuator
                .saturating_add(self.config.step)
                .min(self.config.actuator_max),
            -1 => self
                .actuator
                .saturating_sub(self.config.step)
                .max(self.config.actuator_min),
            _ => self.actuator,
        };

        self.update_lock();
        Some(self.actuator)
    }

    fn update_lock(&mut self) {
        if self.phase_error.unsigned_abs() <= self.config.lock_band {
            self.out_band_run = 0;
            self.in_band_run = self.in_band_run.saturating_add(1);
            if !self.locked && self.in_band_run >= self.config.lock_samples {
                self.locked = true;
                #[cfg(feature = "defmt")]
                defmt::info!("bang-bang locked, dac {=u16}", self.actuator);
            }
        } else {
            self.in_band_run = 0;
            self.out_band_run = self.out_band_run.saturating_add(1);
            if self.locked && self.out_band_run >= self.config.lock_samples {
                self.locked = false;
                #[cfg(feature = "defmt")]
                defmt::warn!("bang-bang lost lock, error {=i32}", self.phase_error);
            }
        }
    }

    fn walk_setpoint(&mut self) {
        let target = self.shared.shift_target();
        let step = self.config.shift_step;
        self.setpoint = if target > self.setpoint {
            self.setpoint.saturating_add(step).min(target)
        } else {
            self.setpoint.saturating_sub(step).max(target)
        };
        self.shared.set_shift_current(self.setpoint);
    }

    fn publish(&self) {
        self.shared.publish(self.state());
    }

    /// Current channel state.
    pub fn state(&self) -> ChannelState {
        ChannelState {
            channel_id: self.config.output_channel,
            tag_count: self.tag_count,
            last_tag_phase: self.last_tag_phase,
            measured_phase: self.measured_phase,
            phase_error: self.phase_error,
            actuator: self.actuator,
            locked: self.locked,
            faulted: self.faulted,
        }
    }

    /// Operating mode.
    pub const fn mode(&self) -> LoopMode {
        self.mode
    }

    /// Loop tuning.
    pub const fn config(&self) -> &BangBangConfig {
        &self.config
    }

    /// Current setpoint in tag units.
    pub const fn setpoint(&self) -> i32 {
        self.setpoint
    }

    /// `true` between [`start`](Self::start) and a halt or re-init.
    pub const fn is_running(&self) -> bool {
        self.running
    }

    /// `true` after [`halt`](Self::halt).
    pub const fn is_faulted(&self) -> bool {
        self.faulted
    }

    /// Lock detector output.
    pub const fn is_locked(&self) -> bool {
        self.locked
    }

    /// Current actuator code.
    pub const fn actuator(&self) -> u16 {
        self.actuator
    }
}
