//! Status codes returned by the module

// Wire format values
pub const STATUS_NO_COMMAND: u8 = 0x00;
pub const STATUS_SUCCESS: u8 = 0x01;
pub const STATUS_OUT_OF_RANGE: u8 = 0x02;
pub const STATUS_SUCCESS_AND_ENABLED: u8 = 0x03;
pub const STATUS_SUCCESS_AND_DISABLED: u8 = 0x04;
pub const STATUS_INVALID_LENGTH: u8 = 0x05;
pub const STATUS_REPLY_OVERFLOW: u8 = 0x06;
pub const STATUS_CHECKSUM_FAIL: u8 = 0x07;
pub const STATUS_INVALID_COMMAND: u8 = 0x08;
pub const STATUS_NO_MESSAGE: u8 = 0x10;
pub const STATUS_MESSAGE_AVAILABLE: u8 = 0x11;
pub const STATUS_PERIPH_BUSY: u8 = 0xF0;
pub const STATUS_OVERFLOW: u8 = 0xF1;
pub const STATUS_OTHER_FAILURE: u8 = 0xFF;

/// Response status byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Status {
    /// Reply to NOOP
    NoCommand,
    /// Command executed
    Success,
    /// Argument outside the accepted range
    OutOfRange,
    /// Radio state query: radio is on
    SuccessAndEnabled,
    /// Radio state query: radio is off
    SuccessAndDisabled,
    /// Payload length not accepted by this command
    InvalidLength,
    /// Payload or reply larger than a transaction buffer
    ReplyOverflow,
    /// Framing or checksum error
    ChecksumFail,
    /// Unknown command byte
    InvalidCommand,
    /// No datagram has been received
    NoMessage,
    /// A datagram is waiting
    MessageAvailable,
    /// Filler clocked out while firmware owns the buffers
    PeriphBusy,
    /// Filler clocked out past the end of a reply
    Overflow,
    /// Radio reported a failure
    OtherFailure,
}

impl Status {
    /// Parse a status from its wire format byte
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            STATUS_NO_COMMAND => Some(Status::NoCommand),
            STATUS_SUCCESS => Some(Status::Success),
            STATUS_OUT_OF_RANGE => Some(Status::OutOfRange),
            STATUS_SUCCESS_AND_ENABLED => Some(Status::SuccessAndEnabled),
            STATUS_SUCCESS_AND_DISABLED => Some(Status::SuccessAndDisabled),
            STATUS_INVALID_LENGTH => Some(Status::InvalidLength),
            STATUS_REPLY_OVERFLOW => Some(Status::ReplyOverflow),
            STATUS_CHECKSUM_FAIL => Some(Status::ChecksumFail),
            STATUS_INVALID_COMMAND => Some(Status::InvalidCommand),
            STATUS_NO_MESSAGE => Some(Status::NoMessage),
            STATUS_MESSAGE_AVAILABLE => Some(Status::MessageAvailable),
            STATUS_PERIPH_BUSY => Some(Status::PeriphBusy),
            STATUS_OVERFLOW => Some(Status::Overflow),
            STATUS_OTHER_FAILURE => Some(Status::OtherFailure),
            _ => None,
        }
    }

    /// Convert to wire format byte
    pub fn to_byte(self) -> u8 {
        match self {
            Status::NoCommand => STATUS_NO_COMMAND,
            Status::Success => STATUS_SUCCESS,
            Status::OutOfRange => STATUS_OUT_OF_RANGE,
            Status::SuccessAndEnabled => STATUS_SUCCESS_AND_ENABLED,
            Status::SuccessAndDisabled => STATUS_SUCCESS_AND_DISABLED,
            Status::InvalidLength => STATUS_INVALID_LENGTH,
            Status::ReplyOverflow => STATUS_REPLY_OVERFLOW,
            Status::ChecksumFail => STATUS_CHECKSUM_FAIL,
            Status::InvalidCommand => STATUS_INVALID_COMMAND,
            Status::NoMessage => STATUS_NO_MESSAGE,
            Status::MessageAvailable => STATUS_MESSAGE_AVAILABLE,
            Status::PeriphBusy => STATUS_PERIPH_BUSY,
            Status::Overflow => STATUS_OVERFLOW,
            Status::OtherFailure => STATUS_OTHER_FAILURE,
        }
    }
}
