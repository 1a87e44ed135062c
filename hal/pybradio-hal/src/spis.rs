//! SPI slave peripheral abstractions
//!
//! Models an SPI slave with an autonomous DMA engine and a hardware
//! semaphore arbitrating the transaction buffers between the CPU and the
//! peripheral (as found on nRF51/nRF52 SPIS).

/// Semaphore state as reported by the peripheral
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Semaphore {
    /// Nobody holds the buffers
    Free,
    /// The CPU holds the buffers
    Cpu,
    /// The peripheral holds the buffers (transaction may be live)
    Peripheral,
    /// The peripheral holds the buffers, CPU acquire is queued behind it
    CpuPending,
}

impl Semaphore {
    /// Decode the raw SEMSTAT register value
    pub fn from_bits(bits: u32) -> Self {
        match bits & 0b11 {
            0 => Semaphore::Free,
            1 => Semaphore::Cpu,
            2 => Semaphore::Peripheral,
            _ => Semaphore::CpuPending,
        }
    }
}

/// Static peripheral configuration applied while the CPU holds the buffers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SlaveConfig {
    /// Byte clocked out when the host starts a transaction the peripheral
    /// cannot serve (CPU owns the buffers)
    pub busy_byte: u8,
    /// Byte clocked out once the reply has been exhausted
    pub overread_byte: u8,
    /// Hand the semaphore to the CPU automatically at end of transaction
    pub acquire_on_end: bool,
}

/// SPI slave with a semaphore-guarded buffer pair
///
/// The buffers themselves live with the implementation (they are DMA
/// targets); callers must only touch them while [`Semaphore::Cpu`] is
/// reported.
pub trait SlavePeripheral {
    /// Read the semaphore state
    fn semaphore(&self) -> Semaphore;

    /// Start the ACQUIRE task
    fn trigger_acquire(&mut self);

    /// Start the RELEASE task
    fn trigger_release(&mut self);

    /// Check the ACQUIRED event
    fn acquired_event(&self) -> bool;

    /// Clear the ACQUIRED event
    fn clear_acquired_event(&mut self);

    /// Check the END (transaction complete) event
    fn end_event(&self) -> bool;

    /// Clear the END event
    fn clear_end_event(&mut self);

    /// Number of bytes received in the last transaction
    fn rx_amount(&self) -> usize;

    /// Set the number of bytes to transmit in the next transaction
    fn set_tx_len(&mut self, len: usize);

    /// Receive (host → slave) buffer
    fn rx_buffer(&mut self) -> &mut [u8];

    /// Transmit (slave → host) buffer
    fn tx_buffer(&mut self) -> &mut [u8];

    /// Apply filler bytes and shortcuts
    fn configure(&mut self, config: &SlaveConfig);

    /// Called between polls of a busy-wait
    ///
    /// Defaults to a spin hint; hardware may sleep until the next event.
    fn wait_for_event(&mut self) {
        core::hint::spin_loop();
    }
}
