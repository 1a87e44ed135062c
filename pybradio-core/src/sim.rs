//! Simulated peripherals for host-side testing
//!
//! [`SimSpis`] models an SPI slave with a hardware semaphore closely enough
//! to exercise the transport hand-off: host transactions are refused with
//! the busy filler while the CPU holds the buffers, replies are padded with
//! the overread filler, and END→ACQUIRE passes the semaphore to the CPU.
//! [`SimRadio`] records sent datagrams and delivers queued ones.

use heapless::{Deque, Vec};
use pybradio_hal::{Semaphore, SlaveConfig, SlavePeripheral};
use pybradio_protocol::BUFFER_SIZE;

use crate::power::{dbm_to_level, level_to_dbm};
use crate::traits::{Radio, RadioError, MAX_FREQUENCY_BAND};

/// Largest datagram the simulated radio handles
pub const SIM_DATAGRAM_SIZE: usize = 64;

/// Datagrams the simulated radio remembers in each direction
pub const SIM_QUEUE_DEPTH: usize = 8;

/// Simulated SPI slave with semaphore
#[derive(Debug, Clone)]
pub struct SimSpis {
    rx: [u8; BUFFER_SIZE],
    tx: [u8; BUFFER_SIZE],
    tx_len: usize,
    amount_rx: usize,
    semaphore: Semaphore,
    events_end: bool,
    events_acquired: bool,
    config: Option<SlaveConfig>,
    stall_acquire: bool,
}

impl Default for SimSpis {
    fn default() -> Self {
        Self::new()
    }
}

impl SimSpis {
    /// Create a peripheral with a free semaphore and empty buffers
    pub fn new() -> Self {
        Self {
            rx: [0; BUFFER_SIZE],
            tx: [0; BUFFER_SIZE],
            tx_len: 0,
            amount_rx: 0,
            semaphore: Semaphore::Free,
            events_end: false,
            events_acquired: false,
            config: None,
            stall_acquire: false,
        }
    }

    /// Make CPU acquire requests hang forever
    pub fn stall_acquire(&mut self, stall: bool) {
        self.stall_acquire = stall;
    }

    /// Configuration applied by the firmware, if any
    pub fn config(&self) -> Option<SlaveConfig> {
        self.config
    }

    /// Input buffer contents
    pub fn rx_contents(&self) -> &[u8; BUFFER_SIZE] {
        &self.rx
    }

    /// Output buffer contents
    pub fn tx_contents(&self) -> &[u8; BUFFER_SIZE] {
        &self.tx
    }

    /// Run one host-clocked transaction
    ///
    /// Clocks `mosi` in and fills `miso` with what the slave shifts out; the
    /// two are the same length on a real bus, extra `miso` bytes are left
    /// untouched.
    pub fn transfer(&mut self, mosi: &[u8], miso: &mut [u8]) {
        let config = self.config.unwrap_or(SlaveConfig {
            busy_byte: 0xFF,
            overread_byte: 0xFF,
            acquire_on_end: false,
        });
        let clocked = mosi.len().min(miso.len());

        if matches!(self.semaphore, Semaphore::Cpu) {
            miso[..clocked].fill(config.busy_byte);
            return;
        }

        self.semaphore = Semaphore::Peripheral;
        for i in 0..clocked {
            miso[i] = if i < self.tx_len {
                self.tx[i]
            } else {
                config.overread_byte
            };
        }
        let stored = mosi.len().min(self.rx.len());
        self.rx[..stored].copy_from_slice(&mosi[..stored]);
        self.amount_rx = stored;
        self.events_end = true;

        if config.acquire_on_end {
            self.semaphore = Semaphore::Cpu;
            self.events_acquired = true;
        } else {
            self.semaphore = Semaphore::Free;
        }
    }
}

impl SlavePeripheral for SimSpis {
    fn semaphore(&self) -> Semaphore {
        self.semaphore
    }

    fn trigger_acquire(&mut self) {
        if self.stall_acquire {
            self.semaphore = Semaphore::CpuPending;
            return;
        }
        self.semaphore = Semaphore::Cpu;
        self.events_acquired = true;
    }

    fn trigger_release(&mut self) {
        if self.semaphore == Semaphore::Cpu {
            self.semaphore = Semaphore::Free;
        }
    }

    fn acquired_event(&self) -> bool {
        self.events_acquired
    }

    fn clear_acquired_event(&mut self) {
        self.events_acquired = false;
    }

    fn end_event(&self) -> bool {
        self.events_end
    }

    fn clear_end_event(&mut self) {
        self.events_end = false;
    }

    fn rx_amount(&self) -> usize {
        self.amount_rx
    }

    fn set_tx_len(&mut self, len: usize) {
        self.tx_len = len.min(self.tx.len());
    }

    fn rx_buffer(&mut self) -> &mut [u8] {
        &mut self.rx
    }

    fn tx_buffer(&mut self) -> &mut [u8] {
        &mut self.tx
    }

    fn configure(&mut self, config: &SlaveConfig) {
        self.config = Some(*config);
    }
}

/// One datagram as seen by the simulated radio
pub type SimDatagram = Vec<u8, SIM_DATAGRAM_SIZE>;

/// Simulated radio
#[derive(Debug, Clone)]
pub struct SimRadio {
    enabled: bool,
    band: u8,
    power_dbm: i8,
    sent: Vec<SimDatagram, SIM_QUEUE_DEPTH>,
    incoming: Deque<SimDatagram, SIM_QUEUE_DEPTH>,
    fail: bool,
}

impl Default for SimRadio {
    fn default() -> Self {
        Self::new()
    }
}

impl SimRadio {
    /// Radio switched off, band 7, power level 6
    pub fn new() -> Self {
        Self {
            enabled: false,
            band: 7,
            power_dbm: 0,
            sent: Vec::new(),
            incoming: Deque::new(),
            fail: false,
        }
    }

    /// Make every fallible operation report a hardware error
    pub fn set_failing(&mut self, fail: bool) {
        self.fail = fail;
    }

    /// Force the raw transmit power setting
    pub fn set_power_dbm(&mut self, dbm: i8) {
        self.power_dbm = dbm;
    }

    /// Datagrams transmitted so far
    pub fn sent(&self) -> &[SimDatagram] {
        &self.sent
    }

    /// Queue a datagram as if it arrived over the air
    ///
    /// Returns false if the queue is full or the datagram too large.
    pub fn deliver(&mut self, data: &[u8]) -> bool {
        match Vec::from_slice(data) {
            Ok(datagram) => self.incoming.push_back(datagram).is_ok(),
            Err(()) => false,
        }
    }

    fn check(&self) -> Result<(), RadioError> {
        if self.fail {
            Err(RadioError::Hardware)
        } else {
            Ok(())
        }
    }
}

impl Radio for SimRadio {
    fn enable(&mut self) -> Result<(), RadioError> {
        self.check()?;
        self.enabled = true;
        Ok(())
    }

    fn disable(&mut self) -> Result<(), RadioError> {
        self.check()?;
        self.enabled = false;
        Ok(())
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn set_frequency_band(&mut self, band: u8) -> Result<(), RadioError> {
        self.check()?;
        if band > MAX_FREQUENCY_BAND {
            return Err(RadioError::InvalidBand);
        }
        self.band = band;
        Ok(())
    }

    fn frequency_band(&self) -> u8 {
        self.band
    }

    fn set_transmit_power(&mut self, level: u8) -> Result<(), RadioError> {
        self.check()?;
        self.power_dbm = level_to_dbm(level).ok_or(RadioError::InvalidPower)?;
        Ok(())
    }

    fn transmit_power(&self) -> u8 {
        dbm_to_level(self.power_dbm)
    }

    fn send_datagram(&mut self, data: &[u8]) -> Result<(), RadioError> {
        self.check()?;
        let datagram = Vec::from_slice(data).map_err(|_| RadioError::PayloadTooLarge)?;
        // Oldest record is dropped once the log is full
        if self.sent.is_full() {
            self.sent.remove(0);
        }
        let _ = self.sent.push(datagram);
        Ok(())
    }

    fn poll_datagram(&mut self, buf: &mut [u8]) -> Option<usize> {
        if !self.enabled {
            return None;
        }
        let datagram = self.incoming.pop_front()?;
        let len = datagram.len().min(buf.len());
        buf[..len].copy_from_slice(&datagram[..len]);
        Some(len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transfer_without_config_stores_request() {
        let mut spis = SimSpis::new();
        let mut miso = [0u8; 2];
        spis.transfer(&[1, 2], &mut miso);
        assert_eq!(spis.rx_amount(), 2);
        assert!(spis.end_event());
        assert_eq!(spis.semaphore(), Semaphore::Free);
    }

    #[test]
    fn test_radio_power_levels() {
        let mut radio = SimRadio::new();
        assert_eq!(radio.transmit_power(), 6);
        radio.set_transmit_power(2).unwrap();
        assert_eq!(radio.transmit_power(), 2);
        assert_eq!(radio.set_transmit_power(8), Err(RadioError::InvalidPower));
    }

    #[test]
    fn test_radio_receive_requires_enabled() {
        let mut radio = SimRadio::new();
        assert!(radio.deliver(b"hi"));
        let mut buf = [0u8; 8];
        assert_eq!(radio.poll_datagram(&mut buf), None);
        radio.enable().unwrap();
        assert_eq!(radio.poll_datagram(&mut buf), Some(2));
        assert_eq!(&buf[..2], b"hi");
        assert_eq!(radio.poll_datagram(&mut buf), None);
    }
}
