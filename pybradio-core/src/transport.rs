//! Semaphore-arbitrated SPI slave transport
//!
//! The SPI slave peripheral moves bytes in and out of a pair of buffers on
//! its own while the host clocks a transaction. A hardware semaphore decides
//! who may touch those buffers: the peripheral during a transaction, the
//! firmware in between. With the END→ACQUIRE shortcut enabled the peripheral
//! hands the semaphore to the firmware at the end of every transaction, so
//! firmware never races the hardware for it; it only has to give it back.
//!
//! Typical flow for one command:
//! 1. [`BufferedTransport::receive`] reports a completed transaction
//! 2. [`BufferedTransport::begin`] copies the request out and returns a
//!    [`Grant`] that keeps the buffers with the firmware
//! 3. the reply is written through [`Grant::reply`], which releases the
//!    semaphore so the host can clock it out
//!
//! Dropping a [`Grant`] without replying releases the semaphore as well; a
//! grant can only be released once.

use pybradio_hal::{Semaphore, SlavePeripheral};
use pybradio_protocol::Status;

use crate::config::LinkConfig;

/// Which side currently owns the transaction buffers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TokenOwner {
    /// The peripheral (or nobody); firmware must not touch the buffers
    Device,
    /// Firmware may read the input buffer and write the output buffer
    Firmware,
}

impl From<Semaphore> for TokenOwner {
    fn from(semaphore: Semaphore) -> Self {
        match semaphore {
            Semaphore::Cpu => TokenOwner::Firmware,
            Semaphore::Free | Semaphore::Peripheral | Semaphore::CpuPending => TokenOwner::Device,
        }
    }
}

/// Errors reported by the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransportError {
    /// No completed transaction, or firmware does not hold the semaphore
    NotReady,
    /// Caller's buffer too small, or reply empty / larger than the buffers
    InsufficientBuffer,
    /// Release attempted without holding the semaphore
    OtherFailure,
}

/// SPI slave transport owning the peripheral and its buffers
pub struct BufferedTransport<S: SlavePeripheral> {
    spis: S,
}

impl<S: SlavePeripheral> BufferedTransport<S> {
    /// Take over the peripheral and make it ready for the first transaction
    ///
    /// Acquires the semaphore (bounded spin), applies the filler bytes and
    /// the END→ACQUIRE shortcut, clears both buffers and releases.
    pub fn new(spis: S, config: &LinkConfig) -> Result<Self, TransportError> {
        let mut transport = Self { spis };

        {
            let mut grant = transport.acquire(config.acquire_spin_limit)?;
            let spis = grant.peripheral();
            spis.configure(&config.slave_config());
            spis.rx_buffer().fill(0);
            spis.tx_buffer().fill(0);
            spis.set_tx_len(0);
            spis.clear_end_event();
            grant.release()?;
        }

        debug!("SPI transport ready");
        Ok(transport)
    }

    /// Acquire the semaphore, spinning at most `spin_limit` times
    ///
    /// Only used during bring-up; in steady state the semaphore arrives with
    /// the END→ACQUIRE shortcut.
    fn acquire(&mut self, spin_limit: u32) -> Result<Grant<'_, S>, TransportError> {
        if self.spis.semaphore() != Semaphore::Cpu {
            self.spis.clear_acquired_event();
            self.spis.trigger_acquire();

            let mut spins = 0u32;
            while !self.spis.acquired_event() {
                if spins >= spin_limit {
                    warn!("Semaphore acquire timed out");
                    return Err(TransportError::NotReady);
                }
                spins += 1;
                self.spis.wait_for_event();
            }
            trace!("Semaphore acquired after {} spins", spins);
        }

        Ok(Grant::new(self, 0))
    }

    /// Give the semaphore back to the peripheral
    fn release_sem(&mut self) {
        self.spis.clear_acquired_event();
        self.spis.trigger_release();
    }

    fn holds_token(&self) -> bool {
        self.spis.semaphore() == Semaphore::Cpu
    }

    /// Number of bytes received in the last completed transaction
    ///
    /// Returns 0 if no transaction has completed since the last read.
    /// Does not touch the semaphore.
    pub fn receive(&self) -> usize {
        if self.spis.end_event() {
            self.spis.rx_amount()
        } else {
            0
        }
    }

    /// Drop a completed transaction that carried no bytes
    ///
    /// A chip-select pulse without clocking still ends a transaction and,
    /// with END→ACQUIRE, leaves the semaphore with the firmware. There is
    /// nothing to read, so the END event is cleared and the semaphore handed
    /// back; the staged reply stays in place. Returns true if a transaction
    /// was discarded.
    pub fn discard_empty(&mut self) -> bool {
        if !self.spis.end_event() || self.spis.rx_amount() != 0 || !self.holds_token() {
            return false;
        }
        self.spis.clear_end_event();
        self.release_sem();
        true
    }

    /// Copy the received bytes into `buf`
    ///
    /// Requires a completed transaction and the semaphore. The consumed part
    /// of the input buffer is zeroed and the END event cleared. Set `release`
    /// to hand the semaphore back immediately; otherwise the caller must
    /// reply or [`release`](Self::release) before the next transaction.
    pub fn read_buffer(&mut self, buf: &mut [u8], release: bool) -> Result<usize, TransportError> {
        let received = self.receive();
        if received == 0 || !self.holds_token() {
            return Err(TransportError::NotReady);
        }
        if buf.len() < received {
            return Err(TransportError::InsufficientBuffer);
        }

        let rx = self.spis.rx_buffer();
        let received = received.min(rx.len());
        buf[..received].copy_from_slice(&rx[..received]);
        rx[..received].fill(0);
        self.spis.clear_end_event();

        if release {
            self.release_sem();
        }

        Ok(received)
    }

    /// Stage `data` as the next reply
    ///
    /// `data` must be between 1 byte and the buffer capacity. Set `release`
    /// to hand the semaphore back so the host can clock the reply out.
    pub fn reply_buffer(&mut self, data: &[u8], release: bool) -> Result<(), TransportError> {
        if data.is_empty() || data.len() > self.spis.tx_buffer().len() {
            return Err(TransportError::InsufficientBuffer);
        }
        if !self.holds_token() {
            return Err(TransportError::NotReady);
        }

        self.spis.tx_buffer()[..data.len()].copy_from_slice(data);
        self.spis.set_tx_len(data.len());

        if release {
            self.release_sem();
        }

        Ok(())
    }

    /// Stage a single-byte reply and release
    pub fn reply(&mut self, byte: u8) -> Result<(), TransportError> {
        self.reply_buffer(&[byte], true)
    }

    /// Hand the semaphore back to the peripheral
    ///
    /// Fails with [`TransportError::OtherFailure`] if firmware does not hold
    /// it, so a second release is harmless.
    pub fn release(&mut self) -> Result<(), TransportError> {
        if !self.holds_token() {
            return Err(TransportError::OtherFailure);
        }
        self.release_sem();
        Ok(())
    }

    /// Current owner of the buffers
    pub fn sem_state(&self) -> TokenOwner {
        self.spis.semaphore().into()
    }

    /// Read the completed request into `buf` and keep the buffers
    ///
    /// The returned [`Grant`] is the only handle to the held semaphore:
    /// replying through it or dropping it releases the buffers.
    pub fn begin(&mut self, buf: &mut [u8]) -> Result<Grant<'_, S>, TransportError> {
        let received = self.read_buffer(buf, false)?;
        Ok(Grant::new(self, received))
    }

    /// Access the underlying peripheral
    pub fn peripheral(&self) -> &S {
        &self.spis
    }

    /// Mutable access to the underlying peripheral
    ///
    /// Bypasses the semaphore checks; intended for bring-up and tests.
    pub fn peripheral_mut(&mut self) -> &mut S {
        &mut self.spis
    }
}

/// Exclusive hold on the transaction buffers
///
/// Consumed by [`reply`](Grant::reply), [`reply_status`](Grant::reply_status)
/// or [`release`](Grant::release). Dropping it releases the semaphore.
#[must_use = "dropping a Grant releases the buffers without replying"]
pub struct Grant<'t, S: SlavePeripheral> {
    transport: &'t mut BufferedTransport<S>,
    received: usize,
    released: bool,
}

impl<'t, S: SlavePeripheral> Grant<'t, S> {
    fn new(transport: &'t mut BufferedTransport<S>, received: usize) -> Self {
        Self {
            transport,
            received,
            released: false,
        }
    }

    /// Number of request bytes copied out when the grant was taken
    pub fn received(&self) -> usize {
        self.received
    }

    fn peripheral(&mut self) -> &mut S {
        &mut self.transport.spis
    }

    /// Stage `data` as the reply and release the buffers
    ///
    /// If staging fails the buffers are still released when the grant drops.
    pub fn reply(mut self, data: &[u8]) -> Result<(), TransportError> {
        let result = self.transport.reply_buffer(data, true);
        if result.is_ok() {
            self.released = true;
        }
        result
    }

    /// Stage a single status byte and release the buffers
    pub fn reply_status(self, status: Status) -> Result<(), TransportError> {
        self.reply(&[status.to_byte()])
    }

    /// Release the buffers without staging a new reply
    pub fn release(mut self) -> Result<(), TransportError> {
        self.released = true;
        self.transport.release()
    }
}

impl<S: SlavePeripheral> Drop for Grant<'_, S> {
    fn drop(&mut self) {
        if !self.released && self.transport.release().is_err() {
            warn!("Grant dropped without holding the semaphore");
        }
    }
}
