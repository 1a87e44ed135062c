//! Radio trait

/// Highest frequency band accepted (2400 + 100 MHz)
pub const MAX_FREQUENCY_BAND: u8 = 100;

/// Errors reported by the radio
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RadioError {
    /// Operation requires the radio to be enabled
    NotEnabled,
    /// Frequency band outside 0-100
    InvalidBand,
    /// Power level outside 0-7
    InvalidPower,
    /// Datagram larger than the radio can frame
    PayloadTooLarge,
    /// Radio did not complete the operation
    Hardware,
}

/// Short-range datagram radio
///
/// Implementations wrap the chip's radio peripheral. Power is exchanged as
/// an abstract level (see [`crate::power`]); the implementation owns the
/// translation to its hardware setting.
pub trait Radio {
    /// Switch the radio on and start listening
    fn enable(&mut self) -> Result<(), RadioError>;

    /// Switch the radio off
    fn disable(&mut self) -> Result<(), RadioError>;

    /// Check whether the radio is on
    fn is_enabled(&self) -> bool;

    /// Set the frequency band (0-100)
    fn set_frequency_band(&mut self, band: u8) -> Result<(), RadioError>;

    /// Current frequency band
    fn frequency_band(&self) -> u8;

    /// Set the transmit power level (0-7)
    fn set_transmit_power(&mut self, level: u8) -> Result<(), RadioError>;

    /// Current transmit power level
    ///
    /// Returns [`crate::power::UNMAPPED_POWER_LEVEL`] if the hardware is set
    /// to a value outside the power table.
    fn transmit_power(&self) -> u8;

    /// Transmit one datagram
    fn send_datagram(&mut self, data: &[u8]) -> Result<(), RadioError>;

    /// Collect a datagram received over the air, if any
    ///
    /// Copies at most `buf.len()` bytes and returns the number copied.
    /// Never blocks.
    fn poll_datagram(&mut self, buf: &mut [u8]) -> Option<usize>;
}
