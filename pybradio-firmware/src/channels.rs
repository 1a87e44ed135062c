//! Shared state between the radio receive path and the command engine
//!
//! Both run inside the link task on the thread-mode executor, so a
//! `ThreadModeRawMutex` guards the slot. Switch to `CriticalSectionRawMutex`
//! if radio reception moves into an interrupt handler.

use embassy_sync::blocking_mutex::raw::ThreadModeRawMutex;

use pybradio_core::MessageSlot;

/// Most recently received datagram
pub static INBOX: MessageSlot<ThreadModeRawMutex> = MessageSlot::new();
