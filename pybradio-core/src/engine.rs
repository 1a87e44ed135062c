//! Command engine
//!
//! Turns one request received over SPI into one response:
//!
//! 1. validate framing and checksum (once, for every command with a payload)
//! 2. decode the command byte
//! 3. run the command against the radio or the inbox
//! 4. craft the response into the output buffer
//!
//! Every failure becomes a status byte for the host; nothing here is fatal
//! and nothing blocks.

use embassy_sync::blocking_mutex::raw::RawMutex;
use heapless::Vec;
use pybradio_hal::SlavePeripheral;
use pybradio_protocol::packet::HEADER_SIZE;
use pybradio_protocol::{
    craft_packet, validate_packet, Command, Status, BUFFER_SIZE, MAX_PAYLOAD_SIZE,
};

use crate::inbox::MessageSlot;
use crate::power::MAX_POWER_LEVEL;
use crate::traits::{Radio, RadioError, MAX_FREQUENCY_BAND};
use crate::transport::{Grant, TransportError};

/// Executes host commands against the radio
pub struct CommandEngine<'a, R: Radio, M: RawMutex> {
    radio: R,
    inbox: &'a MessageSlot<M>,
    version: &'static str,
}

impl<'a, R: Radio, M: RawMutex> CommandEngine<'a, R, M> {
    /// Create an engine
    ///
    /// `version` is reported (NUL-terminated) in response to VERSION.
    pub fn new(radio: R, inbox: &'a MessageSlot<M>, version: &'static str) -> Self {
        Self {
            radio,
            inbox,
            version,
        }
    }

    /// Access the radio
    pub fn radio(&self) -> &R {
        &self.radio
    }

    /// Mutable access to the radio
    pub fn radio_mut(&mut self) -> &mut R {
        &mut self.radio
    }

    /// The inbox read by RECV and MSG_QUERY
    pub fn inbox(&self) -> &'a MessageSlot<M> {
        self.inbox
    }

    /// Execute `request` and reply through `grant`
    pub fn handle<S: SlavePeripheral>(
        &mut self,
        grant: Grant<'_, S>,
        request: &[u8],
    ) -> Result<(), TransportError> {
        let mut response = [0u8; BUFFER_SIZE];
        let len = self.execute(request, &mut response);
        grant.reply(&response[..len])
    }

    /// Execute `request` and write the response into `out`
    ///
    /// Returns the number of response bytes (always at least 1).
    pub fn execute(&mut self, request: &[u8], out: &mut [u8; BUFFER_SIZE]) -> usize {
        match self.dispatch(request, out) {
            Ok(len) => len,
            Err(status) => {
                debug!("Request rejected: {:?}", status);
                out[0] = status.to_byte();
                1
            }
        }
    }

    fn dispatch(&mut self, request: &[u8], out: &mut [u8; BUFFER_SIZE]) -> Result<usize, Status> {
        let Some(&opcode) = request.first() else {
            return Ok(status(out, Status::NoCommand));
        };

        let length = validate_packet(request).map_err(|e| {
            warn!("Invalid packet for {:#x}: {:?}", opcode, e);
            e.status()
        })?;
        let payload = if length == 0 {
            &[][..]
        } else {
            &request[HEADER_SIZE..HEADER_SIZE + length]
        };

        let command = Command::from_byte(opcode).ok_or_else(|| {
            warn!("Unknown command {:#x}", opcode);
            Status::InvalidCommand
        })?;
        trace!("Command {:?}, {} byte payload", command, length);

        match command {
            Command::Noop => Ok(status(out, Status::NoCommand)),
            Command::Version => self.version(out),
            Command::RadioEnable => {
                self.radio.enable().map_err(radio_failure)?;
                info!("Radio enabled");
                Ok(status(out, Status::Success))
            }
            Command::RadioDisable => {
                self.radio.disable().map_err(radio_failure)?;
                info!("Radio disabled");
                Ok(status(out, Status::Success))
            }
            Command::RadioQuery => {
                let state = if self.radio.is_enabled() {
                    Status::SuccessAndEnabled
                } else {
                    Status::SuccessAndDisabled
                };
                Ok(status(out, state))
            }
            Command::ChannelSet => {
                let band = single_byte(payload)?;
                if band > MAX_FREQUENCY_BAND {
                    return Err(Status::OutOfRange);
                }
                self.radio.set_frequency_band(band).map_err(radio_failure)?;
                Ok(status(out, Status::Success))
            }
            Command::ChannelQuery => packet(out, &[self.radio.frequency_band()]),
            Command::PowerSet => {
                let level = single_byte(payload)?;
                if level > MAX_POWER_LEVEL {
                    return Err(Status::OutOfRange);
                }
                self.radio.set_transmit_power(level).map_err(radio_failure)?;
                Ok(status(out, Status::Success))
            }
            Command::PowerQuery => packet(out, &[self.radio.transmit_power()]),
            Command::MessageQuery => {
                let state = if self.inbox.is_empty() {
                    Status::NoMessage
                } else {
                    Status::MessageAvailable
                };
                Ok(status(out, state))
            }
            // Payloads above MAX_PAYLOAD_SIZE were already turned away by
            // validation with ReplyOverflow
            Command::Send => {
                if payload.is_empty() {
                    return Err(Status::InvalidLength);
                }
                self.radio.send_datagram(payload).map_err(radio_failure)?;
                debug!("Sent {} byte datagram", payload.len());
                Ok(status(out, Status::Success))
            }
            Command::Receive => self.inbox.with(|message| {
                if message.is_empty() {
                    Err(Status::NoMessage)
                } else {
                    packet(out, message)
                }
            }),
        }
    }

    fn version(&self, out: &mut [u8; BUFFER_SIZE]) -> Result<usize, Status> {
        let mut text = Vec::<u8, MAX_PAYLOAD_SIZE>::new();
        text.extend_from_slice(self.version.as_bytes())
            .map_err(|_| Status::ReplyOverflow)?;
        text.push(0).map_err(|_| Status::ReplyOverflow)?;
        packet(out, &text)
    }
}

fn status(out: &mut [u8; BUFFER_SIZE], status: Status) -> usize {
    out[0] = status.to_byte();
    1
}

fn packet(out: &mut [u8; BUFFER_SIZE], payload: &[u8]) -> Result<usize, Status> {
    craft_packet(Status::Success.to_byte(), payload, out).map_err(|e| e.status())
}

fn single_byte(payload: &[u8]) -> Result<u8, Status> {
    match payload {
        [value] => Ok(*value),
        _ => Err(Status::InvalidLength),
    }
}

fn radio_failure(e: RadioError) -> Status {
    warn!("Radio error: {:?}", e);
    Status::OtherFailure
}
