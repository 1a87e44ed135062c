//! pybradio SPI protocol
//!
//! This crate defines the framed protocol spoken between a host controller
//! (SPI master) and the radio module (SPI slave). The host clocks out a
//! single command byte, optionally followed by a payload; the module answers
//! on the next transaction with a status byte, optionally followed by data.
//!
//! # Packet layout
//!
//! Requests and responses share one layout:
//! ```text
//! ┌────────────────┬────────┬──────────────┬──────────┐
//! │ COMMAND/STATUS │ LENGTH │ PAYLOAD      │ CHECKSUM │
//! │ 1B             │ 1B     │ 0–61B        │ 1B       │
//! └────────────────┴────────┴──────────────┴──────────┘
//! ```
//!
//! The checksum is the XOR of the payload bytes only. A packet without a
//! payload is sent as the bare command/status byte.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod command;
pub mod packet;
pub mod status;

pub use command::Command;
pub use packet::{
    checksum, craft_packet, validate_packet, Packet, PacketError, BUFFER_SIZE, MAX_PAYLOAD_SIZE,
};
pub use status::Status;
