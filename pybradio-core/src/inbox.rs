//! Last-received-message slot
//!
//! A single-slot channel from the radio receive path to the command engine.
//! Publishing overwrites whatever was there: only the most recent datagram
//! is kept, older ones are lost. Reading leaves the message in place.
//!
//! The slot is guarded by an embassy-sync raw mutex chosen by the firmware.
//! `ThreadModeRawMutex` is enough while the receive path and the command
//! engine run on the same cooperative executor; if the receive path moves
//! into an interrupt or another thread it must become
//! `CriticalSectionRawMutex`.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex;
use heapless::Vec;
use pybradio_protocol::MAX_PAYLOAD_SIZE;

/// Largest datagram the slot holds (must fit in one response packet)
pub const MAX_MESSAGE_SIZE: usize = MAX_PAYLOAD_SIZE;

/// Errors from publishing into the slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InboxError {
    /// Datagram does not fit; the slot was left unchanged
    TooLarge,
}

/// Overwriting single-slot message holder
pub struct MessageSlot<M: RawMutex> {
    inner: Mutex<M, RefCell<Vec<u8, MAX_MESSAGE_SIZE>>>,
}

impl<M: RawMutex> Default for MessageSlot<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: RawMutex> MessageSlot<M> {
    /// Create an empty slot
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(RefCell::new(Vec::new())),
        }
    }

    /// Replace the stored message
    pub fn publish(&self, data: &[u8]) -> Result<(), InboxError> {
        if data.len() > MAX_MESSAGE_SIZE {
            warn!("Dropping {} byte datagram, slot holds {}", data.len(), MAX_MESSAGE_SIZE);
            return Err(InboxError::TooLarge);
        }
        self.inner.lock(|slot| {
            let mut slot = slot.borrow_mut();
            slot.clear();
            // Length checked above
            let _ = slot.extend_from_slice(data);
        });
        trace!("Inbox updated: {} bytes", data.len());
        Ok(())
    }

    /// Length of the stored message (0 if none)
    pub fn len(&self) -> usize {
        self.inner.lock(|slot| slot.borrow().len())
    }

    /// Check whether no message has been received
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Borrow the stored message without removing it
    pub fn with<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R {
        self.inner.lock(|slot| f(&slot.borrow()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_sync::blocking_mutex::raw::NoopRawMutex;

    #[test]
    fn test_starts_empty() {
        let slot = MessageSlot::<NoopRawMutex>::new();
        assert!(slot.is_empty());
        assert_eq!(slot.with(|m| m.len()), 0);
    }

    #[test]
    fn test_publish_overwrites() {
        let slot = MessageSlot::<NoopRawMutex>::new();
        slot.publish(b"first message").unwrap();
        slot.publish(b"second").unwrap();
        assert_eq!(slot.len(), 6);
        slot.with(|m| assert_eq!(m, b"second"));
    }

    #[test]
    fn test_with_is_non_destructive() {
        let slot = MessageSlot::<NoopRawMutex>::new();
        slot.publish(b"hello").unwrap();

        slot.with(|m| assert_eq!(m, b"hello"));
        slot.with(|m| assert_eq!(m, b"hello"));
        assert!(!slot.is_empty());
    }

    #[test]
    fn test_oversized_datagram_leaves_slot_unchanged() {
        let slot = MessageSlot::<NoopRawMutex>::new();
        slot.publish(b"keep").unwrap();
        let big = [0u8; MAX_MESSAGE_SIZE + 1];
        assert_eq!(slot.publish(&big), Err(InboxError::TooLarge));
        slot.with(|m| assert_eq!(m, b"keep"));
    }
}
