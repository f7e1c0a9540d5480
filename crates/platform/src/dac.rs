//! Oscillator tuning DAC abstraction

/// Full-scale code of the 16-bit tuning DAC.
pub const DAC_FULL_SCALE: i32 = 0xFFFF;

/// Mid-scale code written before the loop starts steering.
pub const DAC_MID_SCALE: i32 = 0x8000;

/// Actuator steered by the control loop.
///
/// Called from the tag notification context: implementations must be a
/// single register write with no blocking.
pub trait ActuatorDac {
    /// Output `code` (already clamped to the DAC range by the caller).
    fn write(&mut self, code: u16);
}

impl<T: ActuatorDac + ?Sized> ActuatorDac for &mut T {
    fn write(&mut self, code: u16) {
        (**self).write(code);
    }
}
