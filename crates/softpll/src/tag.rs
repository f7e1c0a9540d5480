//! DMTD tags and the bounded tag FIFO
//!
//! Tags are pushed by the gateware side (or its interrupt shim) and drained
//! exactly once, in order, by the [`TagService`](crate::TagService).
//!
//! # Overrun policy
//!
//! A full FIFO means the control loop has fallen behind and tags were lost;
//! the phase history is no longer contiguous. The first failed push latches
//! an overrun flag and every following [`pop`](TagFifo::pop) reports
//! [`SoftPllError::FifoOverrun`] until [`reset`](TagFifo::reset).

use core::sync::atomic::{AtomicBool, Ordering};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;

use crate::SoftPllError;

/// Tag value field of the tag readout register, bits [23:0].
pub const TAG_VALUE_MASK: u32 = 0x00FF_FFFF;

/// Channel-id field of the tag readout register, bits [30:24].
pub const TAG_CHANNEL_MASK: u32 = 0x7F;

const TAG_CHANNEL_SHIFT: u32 = 24;

/// One DMTD phase tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Tag {
    /// Source channel (reference or output).
    pub channel: u8,
    /// Phase tag value, modulo the loop's tag modulus.
    pub value: u32,
}

impl Tag {
    /// Create a tag.
    pub const fn new(channel: u8, value: u32) -> Self {
        Self { channel, value }
    }

    /// Decode a tag readout register word.
    #[allow(clippy::cast_possible_truncation)] // masked to 7 bits
    pub const fn from_register(word: u32) -> Self {
        Self {
            channel: ((word >> TAG_CHANNEL_SHIFT) & TAG_CHANNEL_MASK) as u8,
            value: word & TAG_VALUE_MASK,
        }
    }
}

/// Bounded FIFO of tags with a latched overrun flag.
pub struct TagFifo<const N: usize> {
    channel: Channel<CriticalSectionRawMutex, Tag, N>,
    overrun: AtomicBool,
}

impl<const N: usize> TagFifo<N> {
    /// Empty FIFO; usable in a `static`.
    pub const fn new() -> Self {
        Self {
            channel: Channel::new(),
            overrun: AtomicBool::new(false),
        }
    }

    /// Queue `tag`. A full FIFO latches the overrun flag and drops the tag.
    pub fn push(&self, tag: Tag) -> Result<(), SoftPllError> {
        if self.channel.try_send(tag).is_err() {
            self.overrun.store(true, Ordering::Release);
            #[cfg(feature = "defmt")]
            defmt::error!("tag FIFO overrun, dropped tag from channel {=u8}", tag.channel);
            return Err(SoftPllError::FifoOverrun);
        }
        Ok(())
    }

    /// Next tag in arrival order, `Ok(None)` when empty.
    pub fn pop(&self) -> Result<Option<Tag>, SoftPllError> {
        if self.has_overrun() {
            return Err(SoftPllError::FifoOverrun);
        }
        Ok(self.channel.try_receive().ok())
    }

    /// `true` once a push has failed since the last reset.
    pub fn has_overrun(&self) -> bool {
        self.overrun.load(Ordering::Acquire)
    }

    /// Discard every queued tag and clear the overrun flag.
    pub fn reset(&self) {
        while self.channel.try_receive().is_ok() {}
        self.overrun.store(false, Ordering::Release);
    }
}

impl<const N: usize> Default for TagFifo<N> {
    fn default() -> Self {
        Self::new()
    }
}
