//! Link service
//!
//! One [`LinkService::poll`] is one iteration of the firmware's cooperative
//! loop: first drain datagrams the radio has received into the inbox, then
//! serve at most one SPI transaction. Both steps run to completion, so the
//! inbox is never written while a command is being executed.

use embassy_sync::blocking_mutex::raw::RawMutex;
use pybradio_hal::SlavePeripheral;
use pybradio_protocol::BUFFER_SIZE;

use crate::engine::CommandEngine;
use crate::inbox::MAX_MESSAGE_SIZE;
use crate::traits::Radio;
use crate::transport::{BufferedTransport, TransportError};

/// Upper bound on datagrams moved into the inbox per poll
const MAX_DATAGRAMS_PER_POLL: usize = 4;

/// What a single poll did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PollOutcome {
    /// Datagrams moved from the radio into the inbox
    pub datagrams: usize,
    /// Whether a host command was executed
    pub command: bool,
}

/// Transport, engine and radio receive path for one link
pub struct LinkService<'a, S: SlavePeripheral, R: Radio, M: RawMutex> {
    transport: BufferedTransport<S>,
    engine: CommandEngine<'a, R, M>,
    request: [u8; BUFFER_SIZE],
}

impl<'a, S: SlavePeripheral, R: Radio, M: RawMutex> LinkService<'a, S, R, M> {
    /// Create a service from a ready transport and engine
    pub fn new(transport: BufferedTransport<S>, engine: CommandEngine<'a, R, M>) -> Self {
        Self {
            transport,
            engine,
            request: [0; BUFFER_SIZE],
        }
    }

    /// Access the transport
    pub fn transport(&self) -> &BufferedTransport<S> {
        &self.transport
    }

    /// Mutable access to the transport
    pub fn transport_mut(&mut self) -> &mut BufferedTransport<S> {
        &mut self.transport
    }

    /// Access the engine
    pub fn engine(&self) -> &CommandEngine<'a, R, M> {
        &self.engine
    }

    /// Mutable access to the engine
    pub fn engine_mut(&mut self) -> &mut CommandEngine<'a, R, M> {
        &mut self.engine
    }

    /// Run one loop iteration
    ///
    /// A transaction whose semaphore hand-over is still in flight is left
    /// for the next poll.
    pub fn poll(&mut self) -> Result<PollOutcome, TransportError> {
        let datagrams = self.drain_radio();
        let command = self.serve_host()?;
        Ok(PollOutcome { datagrams, command })
    }

    /// Radio receive event handler
    fn drain_radio(&mut self) -> usize {
        let mut datagram = [0u8; MAX_MESSAGE_SIZE];
        let mut count = 0;

        while count < MAX_DATAGRAMS_PER_POLL {
            let Some(len) = self.engine.radio_mut().poll_datagram(&mut datagram) else {
                break;
            };
            count += 1;
            if self.engine.inbox().publish(&datagram[..len]).is_ok() {
                debug!("Datagram received: {} bytes", len);
            }
        }

        count
    }

    fn serve_host(&mut self) -> Result<bool, TransportError> {
        if self.transport.receive() == 0 {
            if self.transport.discard_empty() {
                debug!("Empty transaction discarded");
            }
            return Ok(false);
        }

        let grant = match self.transport.begin(&mut self.request) {
            Ok(grant) => grant,
            Err(TransportError::NotReady) => return Ok(false),
            Err(e) => {
                warn!("Failed to read request: {:?}", e);
                return Err(e);
            }
        };

        let received = grant.received();
        self.engine.handle(grant, &self.request[..received])?;
        Ok(true)
    }
}
