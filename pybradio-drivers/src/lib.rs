//! Driver implementations talking to the radio bridge
//!
//! The bridge is an SPI slave; this crate holds the master side:
//!
//! - Host client (any `embedded-hal` SPI device and delay)

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod host;

pub use host::{ClientError, RadioClient};
