//! Packet encoding and validation.
//!
//! Packet format:
//! - CODE (1 byte): command (host → module) or status (module → host)
//! - LENGTH (1 byte): payload length (0-61)
//! - PAYLOAD (0-61 bytes): command/response data
//! - CHECKSUM (1 byte): XOR of all PAYLOAD bytes (header excluded)
//!
//! A packet with an empty payload is sent as the CODE byte alone.

use crate::status::Status;

/// Size of the SPI transaction buffers on both sides of the link
pub const BUFFER_SIZE: usize = 64;

/// CODE + LENGTH
pub const HEADER_SIZE: usize = 2;

/// Header plus trailing checksum
pub const OVERHEAD_SIZE: usize = HEADER_SIZE + 1;

/// Maximum payload that fits in one transaction buffer
pub const MAX_PAYLOAD_SIZE: usize = BUFFER_SIZE - OVERHEAD_SIZE;

/// Errors that can occur while validating or crafting a packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PacketError {
    /// Received byte count does not match the LENGTH header
    LengthMismatch,
    /// Checksum byte does not match the payload
    ChecksumMismatch,
    /// Payload exceeds [`MAX_PAYLOAD_SIZE`]
    PayloadTooLarge,
    /// Output buffer too small for the encoded packet
    BufferTooSmall,
}

impl PacketError {
    /// Status reported to the host for this error
    ///
    /// Truncated/oversized frames and checksum mismatches share one status
    /// on the wire; existing host drivers only know `ChecksumFail`.
    pub fn status(self) -> Status {
        match self {
            PacketError::LengthMismatch | PacketError::ChecksumMismatch => Status::ChecksumFail,
            PacketError::PayloadTooLarge | PacketError::BufferTooSmall => Status::ReplyOverflow,
        }
    }
}

/// XOR-fold of the payload bytes
///
/// An empty payload folds to zero.
pub fn checksum(payload: &[u8]) -> u8 {
    payload.iter().fold(0, |acc, &byte| acc ^ byte)
}

/// Validate a received packet and return its payload length
///
/// `buf` must be exactly the bytes received in the transaction. A single
/// byte (or nothing) carries no payload and validates to length 0.
pub fn validate_packet(buf: &[u8]) -> Result<usize, PacketError> {
    if buf.len() <= 1 {
        return Ok(0);
    }

    let length = buf[1] as usize;
    // Checked before the byte count, so an oversized frame reports
    // ReplyOverflow for every command rather than the ChecksumFail that
    // other framing errors get
    if length > MAX_PAYLOAD_SIZE {
        return Err(PacketError::PayloadTooLarge);
    }
    if buf.len() != length + OVERHEAD_SIZE {
        return Err(PacketError::LengthMismatch);
    }

    let payload = &buf[HEADER_SIZE..HEADER_SIZE + length];
    if checksum(payload) != buf[buf.len() - 1] {
        return Err(PacketError::ChecksumMismatch);
    }

    Ok(length)
}

/// Write a packet into `out`
///
/// Returns the number of bytes to transmit: 1 for an empty payload,
/// otherwise `payload.len() + 3`.
pub fn craft_packet(code: u8, payload: &[u8], out: &mut [u8]) -> Result<usize, PacketError> {
    if payload.len() > MAX_PAYLOAD_SIZE {
        return Err(PacketError::PayloadTooLarge);
    }

    if payload.is_empty() {
        let first = out.first_mut().ok_or(PacketError::BufferTooSmall)?;
        *first = code;
        return Ok(1);
    }

    let frame_len = payload.len() + OVERHEAD_SIZE;
    if out.len() < frame_len {
        return Err(PacketError::BufferTooSmall);
    }

    out[0] = code;
    out[1] = payload.len() as u8;
    out[HEADER_SIZE..HEADER_SIZE + payload.len()].copy_from_slice(payload);
    out[frame_len - 1] = checksum(payload);

    Ok(frame_len)
}

/// A borrowed view of a packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Packet<'a> {
    /// Command or status byte
    pub code: u8,
    /// Payload data
    pub payload: &'a [u8],
}

impl<'a> Packet<'a> {
    /// Create a packet, checking the payload fits
    pub fn new(code: u8, payload: &'a [u8]) -> Result<Self, PacketError> {
        if payload.len() > MAX_PAYLOAD_SIZE {
            return Err(PacketError::PayloadTooLarge);
        }
        Ok(Self { code, payload })
    }

    /// Create a packet with no payload
    pub fn bare(code: u8) -> Self {
        Self { code, payload: &[] }
    }

    /// Parse and validate a received packet
    pub fn parse(buf: &'a [u8]) -> Result<Self, PacketError> {
        let code = *buf.first().ok_or(PacketError::LengthMismatch)?;
        let length = validate_packet(buf)?;
        Ok(Self {
            code,
            payload: &buf[HEADER_SIZE.min(buf.len())..][..length],
        })
    }

    /// Encode this packet into `out`, returning the number of bytes written
    pub fn encode(&self, out: &mut [u8]) -> Result<usize, PacketError> {
        craft_packet(self.code, self.payload, out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_checksum_is_xor_fold() {
        assert_eq!(checksum(&[]), 0);
        assert_eq!(checksum(&[42]), 42);
        assert_eq!(checksum(&[0x0F, 0xF0]), 0xFF);
        assert_eq!(checksum(&[0xAA, 0xAA]), 0);
    }

    #[test]
    fn test_validate_bare_command() {
        assert_eq!(validate_packet(&[0x06]), Ok(0));
        assert_eq!(validate_packet(&[]), Ok(0));
    }

    #[test]
    fn test_validate_channel_set() {
        assert_eq!(validate_packet(&[0x08, 0x01, 42, 42]), Ok(1));
    }

    #[test]
    fn test_validate_rejects_short_payload() {
        // LENGTH says 5 but only 4 payload bytes follow
        let buf = [0x14, 5, 1, 2, 3, 4, 1 ^ 2 ^ 3 ^ 4];
        assert_eq!(validate_packet(&buf), Err(PacketError::LengthMismatch));
    }

    #[test]
    fn test_validate_rejects_two_bytes() {
        assert_eq!(validate_packet(&[0x08, 0x00]), Err(PacketError::LengthMismatch));
    }

    #[test]
    fn test_validate_rejects_bad_checksum() {
        assert_eq!(
            validate_packet(&[0x08, 0x01, 42, 43]),
            Err(PacketError::ChecksumMismatch)
        );
    }

    #[test]
    fn test_validate_rejects_oversized_length() {
        let mut buf = [0u8; BUFFER_SIZE];
        buf[0] = 0x14;
        buf[1] = (MAX_PAYLOAD_SIZE + 1) as u8;
        assert_eq!(validate_packet(&buf), Err(PacketError::PayloadTooLarge));
    }

    #[test]
    fn test_validate_empty_payload_with_header() {
        // Explicit zero-length frame: checksum of nothing is 0
        assert_eq!(validate_packet(&[0x14, 0, 0]), Ok(0));
    }

    #[test]
    fn test_craft_with_payload() {
        let mut out = [0u8; BUFFER_SIZE];
        let len = craft_packet(Status::Success.to_byte(), &[42], &mut out).unwrap();
        assert_eq!(len, 4);
        assert_eq!(&out[..len], &[0x01, 0x01, 42, 42]);
    }

    #[test]
    fn test_craft_empty_payload_is_single_byte() {
        let mut out = [0xEEu8; 4];
        let len = craft_packet(Status::NoMessage.to_byte(), &[], &mut out).unwrap();
        assert_eq!(len, 1);
        assert_eq!(out[0], 0x10);
        assert_eq!(out[1], 0xEE);
    }

    #[test]
    fn test_craft_payload_too_large() {
        let payload = [0u8; MAX_PAYLOAD_SIZE + 1];
        let mut out = [0u8; 128];
        assert_eq!(
            craft_packet(0x01, &payload, &mut out),
            Err(PacketError::PayloadTooLarge)
        );
    }

    #[test]
    fn test_craft_max_payload_fills_buffer() {
        let payload = [0x5Au8; MAX_PAYLOAD_SIZE];
        let mut out = [0u8; BUFFER_SIZE];
        assert_eq!(craft_packet(0x01, &payload, &mut out), Ok(BUFFER_SIZE));
    }

    #[test]
    fn test_craft_buffer_too_small() {
        let mut out = [0u8; 3];
        assert_eq!(
            craft_packet(0x01, &[1, 2], &mut out),
            Err(PacketError::BufferTooSmall)
        );
    }

    #[test]
    fn test_packet_parse() {
        let buf = [0x14, 3, b'a', b'b', b'c', b'a' ^ b'b' ^ b'c'];
        let packet = Packet::parse(&buf).unwrap();
        assert_eq!(packet.code, 0x14);
        assert_eq!(packet.payload, b"abc");

        let mut out = [0u8; BUFFER_SIZE];
        assert_eq!(packet.encode(&mut out), Ok(buf.len()));
        assert_eq!(&out[..buf.len()], &buf);
    }

    #[test]
    fn test_packet_parse_bare() {
        let packet = Packet::parse(&[0x12]).unwrap();
        assert_eq!(packet, Packet::bare(0x12));
    }

    #[test]
    fn test_packet_new_rejects_oversized_payload() {
        let payload = [0u8; MAX_PAYLOAD_SIZE + 1];
        assert_eq!(Packet::new(0x14, &payload), Err(PacketError::PayloadTooLarge));
        assert!(Packet::new(0x14, &payload[..MAX_PAYLOAD_SIZE]).is_ok());
    }

    #[test]
    fn test_packet_parse_empty_buffer() {
        assert_eq!(Packet::parse(&[]), Err(PacketError::LengthMismatch));
    }

    #[test]
    fn test_oversized_length_wins_over_byte_count() {
        // Channel set declaring 62 bytes but clocking only four
        assert_eq!(
            validate_packet(&[0x08, 62, 42, 42]),
            Err(PacketError::PayloadTooLarge)
        );
    }

    #[test]
    fn test_error_status_mapping() {
        assert_eq!(PacketError::LengthMismatch.status(), Status::ChecksumFail);
        assert_eq!(PacketError::ChecksumMismatch.status(), Status::ChecksumFail);
        assert_eq!(PacketError::PayloadTooLarge.status(), Status::ReplyOverflow);
    }

    proptest! {
        #[test]
        fn prop_crafted_request_validates(
            code in any::<u8>(),
            payload in proptest::collection::vec(any::<u8>(), 1..=MAX_PAYLOAD_SIZE),
        ) {
            let mut out = [0u8; BUFFER_SIZE];
            let len = craft_packet(code, &payload, &mut out).unwrap();
            prop_assert_eq!(len, payload.len() + OVERHEAD_SIZE);
            prop_assert_eq!(out[len - 1], checksum(&payload));
            prop_assert_eq!(validate_packet(&out[..len]), Ok(payload.len()));
        }

        #[test]
        fn prop_wrong_byte_count_rejected(
            payload in proptest::collection::vec(any::<u8>(), 1..=MAX_PAYLOAD_SIZE),
            received in 2usize..=BUFFER_SIZE,
        ) {
            let mut out = [0u8; BUFFER_SIZE];
            let len = craft_packet(0x14, &payload, &mut out).unwrap();
            prop_assume!(received != len);
            prop_assert!(validate_packet(&out[..received]).is_err());
        }
    }
}
