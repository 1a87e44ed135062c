//! pybradio Hardware Abstraction Layer
//!
//! This crate defines the register-level surface the radio bridge needs from
//! its SPI slave peripheral. Chip-specific HALs implement it; the transport in
//! `pybradio-core` is written against it and can be exercised on the host with
//! a simulated peripheral.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  pybradio-firmware                      │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  pybradio-core (transport, engine)      │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  pybradio-hal (this crate - traits)     │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  pybradio-hal-nrf51                     │
//! └─────────────────────────────────────────┘
//! ```

#![no_std]
#![deny(unsafe_code)]

pub mod spis;

pub use spis::{Semaphore, SlaveConfig, SlavePeripheral};
