//! Configuration type definitions
//!
//! Defaults match the micro:bit radio runtime so a freshly booted module
//! talks to stock micro:bits without any host setup.

use pybradio_hal::SlaveConfig;
use pybradio_protocol::status::{STATUS_OVERFLOW, STATUS_PERIPH_BUSY};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Spin iterations allowed while waiting for the semaphore at start-up
pub const DEFAULT_ACQUIRE_SPIN_LIMIT: u32 = 100_000;

/// SPI link configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LinkConfig {
    /// Byte clocked out while firmware holds the buffers
    pub busy_byte: u8,
    /// Byte clocked out past the end of a reply
    pub overread_byte: u8,
    /// Bound on the start-up semaphore acquire spin
    pub acquire_spin_limit: u32,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            busy_byte: STATUS_PERIPH_BUSY,
            overread_byte: STATUS_OVERFLOW,
            acquire_spin_limit: DEFAULT_ACQUIRE_SPIN_LIMIT,
        }
    }
}

impl LinkConfig {
    /// Peripheral configuration derived from this link configuration
    ///
    /// END→ACQUIRE is always enabled; the transport relies on it.
    pub fn slave_config(&self) -> SlaveConfig {
        SlaveConfig {
            busy_byte: self.busy_byte,
            overread_byte: self.overread_byte,
            acquire_on_end: true,
        }
    }
}

/// Radio settings applied at boot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RadioDefaults {
    /// Frequency band (2400 + band MHz)
    pub frequency_band: u8,
    /// Transmit power level (0-7)
    pub power_level: u8,
    /// Datagram group
    pub group: u8,
    /// Switch the radio on at boot
    pub enabled: bool,
}

impl Default for RadioDefaults {
    fn default() -> Self {
        Self {
            frequency_band: 7,
            power_level: 6,
            group: 0,
            enabled: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_link_config() {
        let config = LinkConfig::default();
        let slave = config.slave_config();
        assert_eq!(slave.busy_byte, 0xF0);
        assert_eq!(slave.overread_byte, 0xF1);
        assert!(slave.acquire_on_end);
    }

    #[test]
    fn test_radio_defaults_in_range() {
        let defaults = RadioDefaults::default();
        assert!(defaults.frequency_band <= crate::traits::MAX_FREQUENCY_BAND);
        assert!(defaults.power_level <= crate::power::MAX_POWER_LEVEL);
        assert!(!defaults.enabled);
    }
}
