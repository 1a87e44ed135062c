//! nRF51-specific HAL for the radio bridge firmware
//!
//! Implementations of the shared traits on top of `embassy-nrf`:
//!
//! - SPIS1 slave with hardware semaphore (implements `pybradio_hal::SlavePeripheral`)
//! - 2.4 GHz radio speaking the micro:bit datagram format (implements
//!   `pybradio_core::Radio`)
//!
//! Both drivers take their peripheral singletons from `embassy_nrf::init`
//! and their DMA buffers as `&'static mut`, so the addresses written to the
//! peripheral stay valid for the life of the firmware.

#![no_std]
#![deny(unsafe_code)]

pub mod radio;
pub mod spis;

pub use radio::NrfRadio;
pub use spis::Spis1;
