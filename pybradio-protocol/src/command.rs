//! Commands sent by the host
//!
//! Command bytes encode a peripheral "family" in bits 2..7 and a sub-state
//! in bits 0..1 (off, on, query).

// Sub-states
const STATE_OFF: u8 = 0x00;
const STATE_ON: u8 = 0x01;
const QUERY: u8 = 0x02;

// Families
const FAMILY_RADIO_STATE: u8 = 0x01 << 2;
const FAMILY_RADIO_CHAN: u8 = 0x02 << 2;
const FAMILY_RADIO_POWER: u8 = 0x03 << 2;
const FAMILY_MSG_AVAIL: u8 = 0x04 << 2;
const FAMILY_SEND_MSG: u8 = 0x05 << 2;
const FAMILY_RECV_MSG: u8 = 0x06 << 2;

// Wire format values
pub const CMD_NOOP: u8 = 0x00;
pub const CMD_VERSION: u8 = QUERY;
pub const CMD_RADIO_STATE_DISABLE: u8 = FAMILY_RADIO_STATE | STATE_OFF;
pub const CMD_RADIO_STATE_ENABLE: u8 = FAMILY_RADIO_STATE | STATE_ON;
pub const CMD_RADIO_STATE_QUERY: u8 = FAMILY_RADIO_STATE | QUERY;
pub const CMD_RADIO_CHAN_SET: u8 = FAMILY_RADIO_CHAN;
pub const CMD_RADIO_CHAN_QUERY: u8 = FAMILY_RADIO_CHAN | QUERY;
pub const CMD_RADIO_POWER_SET: u8 = FAMILY_RADIO_POWER;
pub const CMD_RADIO_POWER_QUERY: u8 = FAMILY_RADIO_POWER | QUERY;
pub const CMD_MSG_QUERY: u8 = FAMILY_MSG_AVAIL | QUERY;
pub const CMD_SEND: u8 = FAMILY_SEND_MSG;
pub const CMD_RECV: u8 = FAMILY_RECV_MSG;

/// Commands understood by the module
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    /// Do nothing
    Noop,
    /// Report the firmware build version
    Version,
    /// Switch the radio on
    RadioEnable,
    /// Switch the radio off
    RadioDisable,
    /// Report whether the radio is on
    RadioQuery,
    /// Set the frequency band (1-byte payload, 0-100)
    ChannelSet,
    /// Report the frequency band
    ChannelQuery,
    /// Set the transmit power level (1-byte payload, 0-7)
    PowerSet,
    /// Report the transmit power level
    PowerQuery,
    /// Report whether a datagram has been received
    MessageQuery,
    /// Transmit the payload as a datagram
    Send,
    /// Return the last received datagram
    Receive,
}

impl Command {
    /// Parse a command from its wire format byte
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            CMD_NOOP => Some(Command::Noop),
            CMD_VERSION => Some(Command::Version),
            CMD_RADIO_STATE_ENABLE => Some(Command::RadioEnable),
            CMD_RADIO_STATE_DISABLE => Some(Command::RadioDisable),
            CMD_RADIO_STATE_QUERY => Some(Command::RadioQuery),
            CMD_RADIO_CHAN_SET => Some(Command::ChannelSet),
            CMD_RADIO_CHAN_QUERY => Some(Command::ChannelQuery),
            CMD_RADIO_POWER_SET => Some(Command::PowerSet),
            CMD_RADIO_POWER_QUERY => Some(Command::PowerQuery),
            CMD_MSG_QUERY => Some(Command::MessageQuery),
            CMD_SEND => Some(Command::Send),
            CMD_RECV => Some(Command::Receive),
            _ => None,
        }
    }

    /// Convert to wire format byte
    pub fn to_byte(self) -> u8 {
        match self {
            Command::Noop => CMD_NOOP,
            Command::Version => CMD_VERSION,
            Command::RadioEnable => CMD_RADIO_STATE_ENABLE,
            Command::RadioDisable => CMD_RADIO_STATE_DISABLE,
            Command::RadioQuery => CMD_RADIO_STATE_QUERY,
            Command::ChannelSet => CMD_RADIO_CHAN_SET,
            Command::ChannelQuery => CMD_RADIO_CHAN_QUERY,
            Command::PowerSet => CMD_RADIO_POWER_SET,
            Command::PowerQuery => CMD_RADIO_POWER_QUERY,
            Command::MessageQuery => CMD_MSG_QUERY,
            Command::Send => CMD_SEND,
            Command::Receive => CMD_RECV,
        }
    }
}
