//! Transition-phase persistence on a byte-addressable EEPROM
//!
//! The value is one 32-bit big-endian word: bits [30:0] hold the phase in
//! picoseconds, bit 31 marks it valid. The word sits at a fixed offset that
//! depends on the medium:
//!
//! | Medium            | Offset   |
//! |-------------------|----------|
//! | I2C FMC EEPROM    | `0x1000` |
//! | one-wire EEPROM   | `0x0200` |
//!
//! Any [`embedded_storage::Storage`] works; page handling and bus errors are
//! the storage driver's concern.

use embedded_storage::{ReadStorage, Storage};
use platform::{PhaseTransition, PhaseTransitionStore};
use thiserror_no_std::Error;

/// Offset of the word on the I2C FMC EEPROM.
pub const I2C_EEPROM_T24P_OFFSET: u32 = 4 * 1024;

/// Offset of the word on the one-wire EEPROM.
pub const W1_EEPROM_T24P_OFFSET: u32 = 0x0200;

/// Storage failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StoreError {
    /// The read transaction failed.
    #[error("EEPROM read failed")]
    Read,
    /// The write transaction failed.
    #[error("EEPROM write failed")]
    Write,
}

/// [`PhaseTransitionStore`] over an EEPROM driver.
pub struct EepromPhaseStore<S> {
    storage: S,
    offset: u32,
}

impl<S: Storage> EepromPhaseStore<S> {
    /// Store at the I2C FMC EEPROM location.
    pub fn i2c(storage: S) -> Self {
        Self::at(storage, I2C_EEPROM_T24P_OFFSET)
    }

    /// Store at the one-wire EEPROM location.
    pub fn one_wire(storage: S) -> Self {
        Self::at(storage, W1_EEPROM_T24P_OFFSET)
    }

    /// Store at an arbitrary `offset`.
    pub fn at(storage: S, offset: u32) -> Self {
        Self { storage, offset }
    }

    /// Release the storage driver.
    pub fn into_inner(self) -> S {
        self.storage
    }
}

impl<S: Storage> PhaseTransitionStore for EepromPhaseStore<S> {
    type Error = StoreError;

    fn get_phase_transition(&mut self) -> Result<Option<PhaseTransition>, Self::Error> {
        let mut word = [0_u8; 4];
        ReadStorage::read(&mut self.storage, self.offset, &mut word).map_err(|_| StoreError::Read)?;
        Ok(PhaseTransition::from_stored_word(u32::from_be_bytes(word)))
    }

    fn set_phase_transition(&mut self, value: PhaseTransition) -> Result<(), Self::Error> {
        let word = value.to_stored_word().to_be_bytes();
        self.storage
            .write(self.offset, &word)
            .map_err(|_| StoreError::Write)?;
        #[cfg(feature = "defmt")]
        defmt::debug!("t24p {=u32} ps written at {=u32:#x}", value.get(), self.offset);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use platform::mocks::MockEeprom;

    #[test]
    fn erased_eeprom_reads_empty() {
        let mut store = EepromPhaseStore::i2c(MockEeprom::<8192>::new());
        assert_eq!(store.get_phase_transition(), Ok(None));
    }

    #[test]
    fn word_is_big_endian_with_valid_flag() {
        let mut store = EepromPhaseStore::i2c(MockEeprom::<8192>::new());
        store
            .set_phase_transition(PhaseTransition::from_normalized(2_500))
            .unwrap();
        let eeprom = store.into_inner();
        assert_eq!(eeprom.bytes[0x1000..0x1004], [0x80, 0x00, 0x09, 0xC4]);
    }

    #[test]
    fn written_value_reads_back() {
        let mut store = EepromPhaseStore::one_wire(MockEeprom::<1024>::new());
        let t24p = PhaseTransition::from_normalized(7_123);
        store.set_phase_transition(t24p).unwrap();
        assert_eq!(store.get_phase_transition(), Ok(Some(t24p)));
    }

    #[test]
    fn word_without_flag_reads_empty() {
        let mut eeprom = MockEeprom::<1024>::new();
        eeprom.bytes[0x200..0x204].copy_from_slice(&[0x00, 0x00, 0x09, 0xC4]);
        let mut store = EepromPhaseStore::one_wire(eeprom);
        assert_eq!(store.get_phase_transition(), Ok(None));
    }

    #[test]
    fn bus_failures_map_to_store_errors() {
        let mut eeprom = MockEeprom::<8192>::new();
        eeprom.fail = true;
        let mut store = EepromPhaseStore::i2c(eeprom);
        assert_eq!(store.get_phase_transition(), Err(StoreError::Read));
        assert_eq!(
            store.set_phase_transition(PhaseTransition::from_normalized(1)),
            Err(StoreError::Write)
        );
    }

    #[test]
    fn offset_past_device_end_fails() {
        let mut store = EepromPhaseStore::i2c(MockEeprom::<1024>::new());
        assert_eq!(store.get_phase_transition(), Err(StoreError::Read));
    }
}
