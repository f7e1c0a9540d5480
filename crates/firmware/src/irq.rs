//! Statics shared between the tag interrupt and the foreground
//!
//! The interrupt shim decodes each tag readout register word and hands it to
//! [`on_tag_register`]; the tag service drains [`TAG_FIFO`] in the
//! notification context. Everything here is `Sync` and lock-free on the
//! foreground side except the snapshot read, which is one critical section.

use softpll::{SharedLoopState, SoftPllError, Tag, TagFifo};

use crate::config::TAG_FIFO_DEPTH;
use crate::rx_correction::RxTimestampCorrection;

/// Tags queued for the bang-bang loop.
pub static TAG_FIFO: TagFifo<TAG_FIFO_DEPTH> = TagFifo::new();

/// Loop snapshot and phase-shift registers.
pub static LOOP_STATE: SharedLoopState = SharedLoopState::new();

/// Active transition phase used by the RX timestamping path.
pub static RX_CORRECTION: RxTimestampCorrection = RxTimestampCorrection::new();

/// Queue one tag readout register word on [`TAG_FIFO`].
///
/// An overrun is latched in the FIFO; the tag service reports it on its next
/// drain, so callers may ignore the result.
pub fn on_tag_register(word: u32) -> Result<(), SoftPllError> {
    push_tag_register(&TAG_FIFO, word)
}

/// Decode `word` and queue it on `fifo`.
pub fn push_tag_register<const N: usize>(
    fifo: &TagFifo<N>,
    word: u32,
) -> Result<(), SoftPllError> {
    fifo.push(Tag::from_register(word))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]
mod tests {
    use super::*;

    // The only test touching the static FIFO.
    #[test]
    fn register_word_reaches_the_tag_fifo() {
        TAG_FIFO.reset();
        on_tag_register((1 << 24) | 1_234).unwrap();
        on_tag_register(77).unwrap();

        assert_eq!(TAG_FIFO.pop(), Ok(Some(Tag::new(1, 1_234))));
        assert_eq!(TAG_FIFO.pop(), Ok(Some(Tag::new(0, 77))));
        assert_eq!(TAG_FIFO.pop(), Ok(None));
    }

    #[test]
    fn full_fifo_latches_the_overrun() {
        let fifo: TagFifo<1> = TagFifo::new();
        push_tag_register(&fifo, 5).unwrap();
        assert_eq!(push_tag_register(&fifo, 6), Err(SoftPllError::FifoOverrun));
        assert!(fifo.has_overrun());
    }
}
