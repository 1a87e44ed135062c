//! Board-agnostic core of the radio bridge firmware
//!
//! This crate contains everything between the SPI slave registers and the
//! radio that does not depend on a particular chip:
//!
//! - Buffered transport arbitrating the SPI buffers via the hardware semaphore
//! - Command engine: packet validation, dispatch, response crafting
//! - Single-slot inbox for the last received datagram
//! - Link service tying them together into one cooperative poll step
//! - Radio collaborator trait and transmit power table
//! - Configuration type definitions

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

pub mod config;
pub mod engine;
pub mod inbox;
pub mod power;
pub mod service;
pub mod traits;
pub mod transport;

#[cfg(any(test, feature = "sim"))]
pub mod sim;

pub use config::{LinkConfig, RadioDefaults};
pub use engine::CommandEngine;
pub use inbox::{InboxError, MessageSlot};
pub use service::{LinkService, PollOutcome};
pub use traits::{Radio, RadioError};
pub use transport::{BufferedTransport, Grant, TokenOwner, TransportError};
