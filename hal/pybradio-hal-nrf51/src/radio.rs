//! nRF51 2.4 GHz radio, micro:bit compatible
//!
//! Datagrams are framed the way the micro:bit runtime frames them so the
//! bridge can talk to stock micro:bits:
//!
//! ```text
//! ┌────────┬─────────┬───────┬──────────┬─────────────┐
//! │ LENGTH │ VERSION │ GROUP │ PROTOCOL │ PAYLOAD     │
//! │ 1 byte │ 1       │ 1     │ 1        │ ≤ 32 bytes  │
//! └────────┴─────────┴───────┴──────────┴─────────────┘
//! ```
//!
//! 1 Mbit/s nRF proprietary mode, base address "ubit", group as address
//! prefix, 16-bit CRC and data whitening.
//!
//! The radio listens whenever it is enabled. Received frames are collected
//! by [`Radio::poll_datagram`]; transmitting briefly leaves receive mode.

use core::sync::atomic::{compiler_fence, Ordering};

use embassy_nrf::pac::radio::{vals, Radio as RadioRegs};
use embassy_nrf::{pac, peripherals, Peri};
use pybradio_core::power::{dbm_to_level, level_to_dbm};
use pybradio_core::traits::{Radio, RadioError, MAX_FREQUENCY_BAND};
use pybradio_core::RadioDefaults;

/// 8-bit length field, no S0/S1
const LENGTH_FIELD_BITS: u8 = 8;
/// Base address "ubit"
const BASE_ADDRESS: u32 = 0x7562_6974;
const BASE_ADDRESS_LEN: u8 = 4;
const CRC_POLY: u32 = 0x1_1021;
const CRC_INIT: u32 = 0xFFFF;
const WHITENING_IV: u8 = 0x18;

/// Largest datagram payload
pub const MAX_DATAGRAM_PAYLOAD: usize = 32;

/// Bytes between the length field and the payload
const FRAME_HEADER_SIZE: usize = 3;

/// Frame buffer size: length byte, header and payload
pub const FRAME_BUFFER_SIZE: usize = 1 + FRAME_HEADER_SIZE + MAX_DATAGRAM_PAYLOAD;

const FRAME_VERSION: u8 = 1;
const FRAME_PROTOCOL_DATAGRAM: u8 = 1;

/// Spins allowed for a radio state change (a few hundred µs)
const STATE_CHANGE_SPIN_LIMIT: u32 = 20_000;

/// The nRF51 radio
pub struct NrfRadio {
    _radio: Peri<'static, peripherals::RADIO>,
    frame: &'static mut [u8; FRAME_BUFFER_SIZE],
    group: u8,
    enabled: bool,
}

fn regs() -> RadioRegs {
    pac::RADIO
}

/// Spin until `done` holds, giving up after `limit` checks
fn spin_until(mut done: impl FnMut() -> bool, limit: u32) -> bool {
    for _ in 0..limit {
        if done() {
            return true;
        }
        cortex_m::asm::nop();
    }
    done()
}

impl NrfRadio {
    /// Power up and configure the radio
    ///
    /// The radio starts listening right away if `defaults.enabled` is set.
    /// The high-frequency crystal must already be running.
    pub fn new(
        radio: Peri<'static, peripherals::RADIO>,
        defaults: &RadioDefaults,
        frame: &'static mut [u8; FRAME_BUFFER_SIZE],
    ) -> Result<Self, RadioError> {
        let r = regs();
        r.power().write(|w| w.set_power(true));

        r.mode().write(|w| w.set_mode(vals::Mode::NRF_1MBIT));
        r.pcnf0().write(|w| w.set_lflen(LENGTH_FIELD_BITS));
        r.pcnf1().write(|w| {
            w.set_maxlen((FRAME_HEADER_SIZE + MAX_DATAGRAM_PAYLOAD) as u8);
            w.set_balen(BASE_ADDRESS_LEN);
            w.set_endian(vals::Endian::BIG);
            w.set_whiteen(true);
        });
        r.base0().write_value(BASE_ADDRESS);
        r.prefix0().write(|w| w.set_ap(0, defaults.group));
        r.txaddress().write(|w| w.set_txaddress(0));
        r.rxaddresses().write(|w| w.set_addr(0, true));
        r.crccnf().write(|w| w.set_len(vals::Len::TWO));
        r.crcpoly().write(|w| w.set_crcpoly(CRC_POLY));
        r.crcinit().write(|w| w.set_crcinit(CRC_INIT));
        r.datawhiteiv().write(|w| w.set_datawhiteiv(WHITENING_IV));
        r.frequency()
            .write(|w| w.set_frequency(defaults.frequency_band.min(MAX_FREQUENCY_BAND)));

        let mut radio = Self {
            _radio: radio,
            frame,
            group: defaults.group,
            enabled: false,
        };

        radio.set_transmit_power(defaults.power_level)?;
        if defaults.enabled {
            radio.enable()?;
        }

        Ok(radio)
    }

    /// Move the radio to DISABLED and wait for it to get there
    fn stop(&mut self) -> Result<(), RadioError> {
        let r = regs();
        r.shorts().write(|_| {});
        r.events_disabled().write_value(0);
        r.tasks_disable().write_value(1);
        if spin_until(|| r.events_disabled().read() != 0, STATE_CHANGE_SPIN_LIMIT) {
            Ok(())
        } else {
            Err(RadioError::Hardware)
        }
    }

    /// Start listening into the frame buffer
    fn listen(&mut self) {
        let r = regs();
        r.packetptr().write_value(self.frame.as_mut_ptr() as u32);
        r.events_end().write_value(0);
        r.shorts().write(|w| w.set_ready_start(true));
        compiler_fence(Ordering::SeqCst);
        r.tasks_rxen().write_value(1);
    }

    /// Check a received frame, returning the payload length
    fn parse_frame(&self) -> Option<usize> {
        let length = self.frame[0] as usize;
        if length < FRAME_HEADER_SIZE || length > FRAME_HEADER_SIZE + MAX_DATAGRAM_PAYLOAD {
            return None;
        }
        let header = &self.frame[1..1 + FRAME_HEADER_SIZE];
        if header != [FRAME_VERSION, self.group, FRAME_PROTOCOL_DATAGRAM] {
            return None;
        }
        Some(length - FRAME_HEADER_SIZE)
    }
}

impl Radio for NrfRadio {
    fn enable(&mut self) -> Result<(), RadioError> {
        if self.enabled {
            return Ok(());
        }
        self.stop()?;
        self.listen();
        self.enabled = true;
        Ok(())
    }

    fn disable(&mut self) -> Result<(), RadioError> {
        if !self.enabled {
            return Ok(());
        }
        self.stop()?;
        self.enabled = false;
        Ok(())
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn set_frequency_band(&mut self, band: u8) -> Result<(), RadioError> {
        if band > MAX_FREQUENCY_BAND {
            return Err(RadioError::InvalidBand);
        }
        // FREQUENCY is only sampled on ramp-up
        self.stop()?;
        regs().frequency().write(|w| w.set_frequency(band));
        if self.enabled {
            self.listen();
        }
        Ok(())
    }

    fn frequency_band(&self) -> u8 {
        regs().frequency().read().frequency()
    }

    fn set_transmit_power(&mut self, level: u8) -> Result<(), RadioError> {
        let dbm = level_to_dbm(level).ok_or(RadioError::InvalidPower)?;
        regs()
            .txpower()
            .write(|w| w.set_txpower(vals::Txpower::from_bits(dbm as u8)));
        Ok(())
    }

    fn transmit_power(&self) -> u8 {
        dbm_to_level(regs().txpower().read().txpower().to_bits() as i8)
    }

    fn send_datagram(&mut self, data: &[u8]) -> Result<(), RadioError> {
        if !self.enabled {
            return Err(RadioError::NotEnabled);
        }
        if data.len() > MAX_DATAGRAM_PAYLOAD {
            return Err(RadioError::PayloadTooLarge);
        }

        self.stop()?;

        self.frame[0] = (FRAME_HEADER_SIZE + data.len()) as u8;
        self.frame[1] = FRAME_VERSION;
        self.frame[2] = self.group;
        self.frame[3] = FRAME_PROTOCOL_DATAGRAM;
        self.frame[1 + FRAME_HEADER_SIZE..1 + FRAME_HEADER_SIZE + data.len()].copy_from_slice(data);

        let r = regs();
        r.packetptr().write_value(self.frame.as_ptr() as u32);
        r.events_disabled().write_value(0);
        r.shorts().write(|w| {
            w.set_ready_start(true);
            w.set_end_disable(true);
        });
        compiler_fence(Ordering::SeqCst);
        r.tasks_txen().write_value(1);
        let sent = spin_until(|| r.events_disabled().read() != 0, STATE_CHANGE_SPIN_LIMIT);

        self.listen();
        if sent {
            Ok(())
        } else {
            Err(RadioError::Hardware)
        }
    }

    fn poll_datagram(&mut self, buf: &mut [u8]) -> Option<usize> {
        let r = regs();
        if !self.enabled || r.events_end().read() == 0 {
            return None;
        }
        r.events_end().write_value(0);
        compiler_fence(Ordering::SeqCst);

        // Frames failing the CRC are dropped
        let received = if r.crcstatus().read().crcstatus() == vals::Crcstatus::CRCOK {
            self.parse_frame().map(|len| {
                let len = len.min(buf.len());
                let payload = &self.frame[1 + FRAME_HEADER_SIZE..];
                buf[..len].copy_from_slice(&payload[..len]);
                len
            })
        } else {
            None
        };

        // Back to RX for the next frame
        r.tasks_start().write_value(1);
        received
    }
}
