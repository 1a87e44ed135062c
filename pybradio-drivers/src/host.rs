//! Host-side client for the radio bridge
//!
//! Runs on the SPI master. Every command is two transactions:
//!
//! 1. the request is clocked out; if the bridge is still busy with the
//!    previous command it answers with the busy filler and drops the
//!    request, so the write is retried after a short delay
//! 2. a full buffer is clocked in, retried for as long as the bridge answers
//!    with the busy filler
//!
//! Bytes past the end of the response frame are overread filler and are
//! ignored.

use embedded_hal::delay::DelayNs;
use embedded_hal::spi::SpiDevice;
use heapless::{String, Vec};
use pybradio_protocol::command::*;
use pybradio_protocol::packet::OVERHEAD_SIZE;
use pybradio_protocol::status::STATUS_PERIPH_BUSY;
use pybradio_protocol::{Packet, Status, BUFFER_SIZE, MAX_PAYLOAD_SIZE};

/// Delay between busy polls in microseconds
pub const DEFAULT_POLL_DELAY_US: u32 = 100;

/// Busy polls before a command is abandoned
pub const DEFAULT_MAX_RETRIES: u32 = 100;

/// Highest frequency band the bridge accepts
pub const MAX_CHANNEL: u8 = 100;

/// Highest transmit power level the bridge accepts
pub const MAX_POWER: u8 = 7;

/// Data returned by VERSION and RECV
pub type Payload = Vec<u8, MAX_PAYLOAD_SIZE>;

/// Client errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClientError<E> {
    /// SPI bus error
    Spi(E),
    /// Bridge stayed busy for every retry
    Timeout,
    /// Bridge reported a failure status
    Status(Status),
    /// Unknown status byte
    UnknownStatus(u8),
    /// Response frame length field out of range
    Malformed,
    /// Response checksum did not match
    ChecksumMismatch,
    /// Argument rejected before anything was sent
    InvalidArgument,
}

/// Radio bridge client
pub struct RadioClient<D: SpiDevice, T: DelayNs> {
    spi: D,
    delay: T,
    poll_delay_us: u32,
    max_retries: u32,
}

impl<D: SpiDevice, T: DelayNs> RadioClient<D, T> {
    /// Create a client with the default polling parameters
    pub fn new(spi: D, delay: T) -> Self {
        Self {
            spi,
            delay,
            poll_delay_us: DEFAULT_POLL_DELAY_US,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    /// Change busy polling parameters
    pub fn with_polling(mut self, poll_delay_us: u32, max_retries: u32) -> Self {
        self.poll_delay_us = poll_delay_us;
        self.max_retries = max_retries;
        self
    }

    /// Release the bus and delay
    pub fn release(self) -> (D, T) {
        (self.spi, self.delay)
    }

    /// Firmware version string
    pub fn version(&mut self) -> Result<String<MAX_PAYLOAD_SIZE>, ClientError<D::Error>> {
        let mut text = self.query(Packet::bare(CMD_VERSION))?;
        if let Some(end) = text.iter().position(|&b| b == 0) {
            text.truncate(end);
        }
        String::from_utf8(text).map_err(|_| ClientError::Malformed)
    }

    /// Switch the radio on
    pub fn enable(&mut self) -> Result<(), ClientError<D::Error>> {
        self.expect_success(Packet::bare(CMD_RADIO_STATE_ENABLE))
    }

    /// Switch the radio off
    pub fn disable(&mut self) -> Result<(), ClientError<D::Error>> {
        self.expect_success(Packet::bare(CMD_RADIO_STATE_DISABLE))
    }

    /// Whether the radio is on
    pub fn is_enabled(&mut self) -> Result<bool, ClientError<D::Error>> {
        match self.status(Packet::bare(CMD_RADIO_STATE_QUERY))? {
            Status::SuccessAndEnabled => Ok(true),
            Status::SuccessAndDisabled => Ok(false),
            other => Err(ClientError::Status(other)),
        }
    }

    /// Select frequency band 0-100
    pub fn set_channel(&mut self, channel: u8) -> Result<(), ClientError<D::Error>> {
        if channel > MAX_CHANNEL {
            return Err(ClientError::InvalidArgument);
        }
        self.set(CMD_RADIO_CHAN_SET, channel)
    }

    /// Current frequency band
    pub fn channel(&mut self) -> Result<u8, ClientError<D::Error>> {
        self.query_byte(CMD_RADIO_CHAN_QUERY)
    }

    /// Select transmit power level 0-7
    pub fn set_power(&mut self, power: u8) -> Result<(), ClientError<D::Error>> {
        if power > MAX_POWER {
            return Err(ClientError::InvalidArgument);
        }
        self.set(CMD_RADIO_POWER_SET, power)
    }

    /// Current transmit power level (8 if the radio reports an unlisted value)
    pub fn power(&mut self) -> Result<u8, ClientError<D::Error>> {
        self.query_byte(CMD_RADIO_POWER_QUERY)
    }

    /// Whether a datagram has been received since power-up
    pub fn is_message_available(&mut self) -> Result<bool, ClientError<D::Error>> {
        match self.status(Packet::bare(CMD_MSG_QUERY))? {
            Status::MessageAvailable => Ok(true),
            Status::NoMessage => Ok(false),
            other => Err(ClientError::Status(other)),
        }
    }

    /// Broadcast a datagram
    pub fn send(&mut self, message: &[u8]) -> Result<(), ClientError<D::Error>> {
        if message.is_empty() {
            return Err(ClientError::InvalidArgument);
        }
        let request = Packet::new(CMD_SEND, message).map_err(|_| ClientError::InvalidArgument)?;
        self.expect_success(request)
    }

    /// Most recently received datagram, if any
    ///
    /// The bridge keeps the datagram, so repeated calls return it again
    /// until a newer one arrives.
    pub fn receive(&mut self) -> Result<Option<Payload>, ClientError<D::Error>> {
        match self.query(Packet::bare(CMD_RECV)) {
            Ok(message) => Ok(Some(message)),
            Err(ClientError::Status(Status::NoMessage)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn set(&mut self, opcode: u8, value: u8) -> Result<(), ClientError<D::Error>> {
        self.expect_success(Packet {
            code: opcode,
            payload: &[value],
        })
    }

    fn query_byte(&mut self, opcode: u8) -> Result<u8, ClientError<D::Error>> {
        match self.query(Packet::bare(opcode))?.as_slice() {
            [value] => Ok(*value),
            _ => Err(ClientError::Malformed),
        }
    }

    fn expect_success(&mut self, request: Packet<'_>) -> Result<(), ClientError<D::Error>> {
        match self.status(request)? {
            Status::Success => Ok(()),
            other => Err(ClientError::Status(other)),
        }
    }

    /// Run a command whose response is a bare status byte
    fn status(&mut self, request: Packet<'_>) -> Result<Status, ClientError<D::Error>> {
        let mut frame = [0u8; BUFFER_SIZE];
        self.command(request, &mut frame)?;
        Status::from_byte(frame[0]).ok_or(ClientError::UnknownStatus(frame[0]))
    }

    /// Run a command whose response is a data packet
    fn query(&mut self, request: Packet<'_>) -> Result<Payload, ClientError<D::Error>> {
        let mut frame = [0u8; BUFFER_SIZE];
        self.command(request, &mut frame)?;
        parse_data(&frame)
    }

    /// Send `request` and read the response frame into `frame`
    fn command(
        &mut self,
        request: Packet<'_>,
        frame: &mut [u8; BUFFER_SIZE],
    ) -> Result<(), ClientError<D::Error>> {
        let mut encoded = [0u8; BUFFER_SIZE];
        let len = request
            .encode(&mut encoded)
            .map_err(|_| ClientError::InvalidArgument)?;
        self.write(&encoded[..len])?;
        self.read(frame)
    }

    fn write(&mut self, request: &[u8]) -> Result<(), ClientError<D::Error>> {
        let mut echo = [0u8; BUFFER_SIZE];
        let echo = &mut echo[..request.len().min(BUFFER_SIZE)];

        for _ in 0..=self.max_retries {
            self.spi.transfer(echo, request).map_err(ClientError::Spi)?;
            // A refused transaction shifts out nothing but busy filler
            if echo.iter().any(|&b| b != STATUS_PERIPH_BUSY) {
                return Ok(());
            }
            self.delay.delay_us(self.poll_delay_us);
        }

        Err(ClientError::Timeout)
    }

    fn read(&mut self, frame: &mut [u8; BUFFER_SIZE]) -> Result<(), ClientError<D::Error>> {
        for _ in 0..=self.max_retries {
            frame.fill(CMD_NOOP);
            self.spi.transfer_in_place(frame).map_err(ClientError::Spi)?;
            if frame[0] != STATUS_PERIPH_BUSY {
                return Ok(());
            }
            self.delay.delay_us(self.poll_delay_us);
        }

        Err(ClientError::Timeout)
    }
}

/// Extract the payload of a data response
fn parse_data<E>(frame: &[u8; BUFFER_SIZE]) -> Result<Payload, ClientError<E>> {
    let status = Status::from_byte(frame[0]).ok_or(ClientError::UnknownStatus(frame[0]))?;
    if status != Status::Success {
        return Err(ClientError::Status(status));
    }

    let length = frame[1] as usize;
    if length == 0 || length > MAX_PAYLOAD_SIZE {
        return Err(ClientError::Malformed);
    }
    let packet =
        Packet::parse(&frame[..length + OVERHEAD_SIZE]).map_err(|_| ClientError::ChecksumMismatch)?;

    Vec::from_slice(packet.payload).map_err(|_| ClientError::Malformed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::RefCell;
    use core::convert::Infallible;
    use embassy_sync::blocking_mutex::raw::NoopRawMutex;
    use embedded_hal::spi::{ErrorType, Operation};
    use pybradio_core::sim::{SimRadio, SimSpis};
    use pybradio_core::{BufferedTransport, CommandEngine, LinkConfig, LinkService, MessageSlot};
    use pybradio_protocol::status::STATUS_NO_MESSAGE;

    type Service<'a> = LinkService<'a, SimSpis, SimRadio, NoopRawMutex>;

    /// SPI bus wired straight into a simulated bridge
    struct SimBus<'s, 'a> {
        bridge: &'s RefCell<Service<'a>>,
        transactions: usize,
    }

    /// Delay during which the simulated bridge gets to run
    struct SimDelay<'s, 'a> {
        bridge: &'s RefCell<Service<'a>>,
        polls: usize,
    }

    impl ErrorType for SimBus<'_, '_> {
        type Error = Infallible;
    }

    impl SpiDevice for SimBus<'_, '_> {
        fn transaction(&mut self, operations: &mut [Operation<'_, u8>]) -> Result<(), Infallible> {
            let mut bridge = self.bridge.borrow_mut();
            let spis = bridge.transport_mut().peripheral_mut();
            for op in operations {
                match op {
                    Operation::Write(data) => {
                        let mut miso = std::vec![0u8; data.len()];
                        spis.transfer(data, &mut miso);
                    }
                    Operation::Read(buf) => {
                        let mosi = std::vec![0u8; buf.len()];
                        spis.transfer(&mosi, buf);
                    }
                    Operation::Transfer(read, write) => {
                        let mosi = write.to_vec();
                        spis.transfer(&mosi, read);
                    }
                    Operation::TransferInPlace(buf) => {
                        let mosi = buf.to_vec();
                        spis.transfer(&mosi, buf);
                    }
                    Operation::DelayNs(_) => {}
                }
            }
            self.transactions += 1;
            Ok(())
        }
    }

    impl DelayNs for SimDelay<'_, '_> {
        fn delay_ns(&mut self, _ns: u32) {
            self.bridge.borrow_mut().poll().unwrap();
            self.polls += 1;
        }
    }

    fn bridge(inbox: &MessageSlot<NoopRawMutex>) -> RefCell<Service<'_>> {
        let transport = BufferedTransport::new(SimSpis::new(), &LinkConfig::default()).unwrap();
        let engine = CommandEngine::new(SimRadio::new(), inbox, "0.1.0");
        RefCell::new(LinkService::new(transport, engine))
    }

    fn client<'s, 'a>(
        bridge: &'s RefCell<Service<'a>>,
    ) -> RadioClient<SimBus<'s, 'a>, SimDelay<'s, 'a>> {
        RadioClient::new(
            SimBus {
                bridge,
                transactions: 0,
            },
            SimDelay { bridge, polls: 0 },
        )
    }

    #[test]
    fn test_version() {
        let inbox = MessageSlot::<NoopRawMutex>::new();
        let bridge = bridge(&inbox);
        let mut client = client(&bridge);
        assert_eq!(client.version().unwrap().as_str(), "0.1.0");
    }

    #[test]
    fn test_busy_bridge_is_polled() {
        let inbox = MessageSlot::<NoopRawMutex>::new();
        let bridge = bridge(&inbox);
        let mut client = client(&bridge);

        assert!(!client.is_enabled().unwrap());
        // First read hits busy filler, the bridge runs during the delay
        let (bus, delay) = client.release();
        assert_eq!(bus.transactions, 3);
        assert_eq!(delay.polls, 1);
    }

    #[test]
    fn test_refused_write_is_retried() {
        let inbox = MessageSlot::<NoopRawMutex>::new();
        let bridge = bridge(&inbox);
        let mut client = client(&bridge);

        client.enable().unwrap();
        // The previous read left a request pending, so this write is refused once
        client.set_channel(42).unwrap();
        assert_eq!(client.channel().unwrap(), 42);
        assert!(client.is_enabled().unwrap());
    }

    #[test]
    fn test_power() {
        let inbox = MessageSlot::<NoopRawMutex>::new();
        let bridge = bridge(&inbox);
        let mut client = client(&bridge);

        assert_eq!(client.power().unwrap(), 6);
        client.set_power(2).unwrap();
        assert_eq!(client.power().unwrap(), 2);
    }

    #[test]
    fn test_arguments_checked_locally() {
        let inbox = MessageSlot::<NoopRawMutex>::new();
        let bridge = bridge(&inbox);
        let mut client = client(&bridge);

        assert_eq!(client.set_channel(101), Err(ClientError::InvalidArgument));
        assert_eq!(client.set_power(8), Err(ClientError::InvalidArgument));
        assert_eq!(client.send(&[]), Err(ClientError::InvalidArgument));
        assert_eq!(client.send(&[0u8; 62]), Err(ClientError::InvalidArgument));

        let (bus, _) = client.release();
        assert_eq!(bus.transactions, 0);
    }

    #[test]
    fn test_send_and_receive() {
        let inbox = MessageSlot::<NoopRawMutex>::new();
        let bridge = bridge(&inbox);
        let mut client = client(&bridge);

        client.enable().unwrap();
        assert!(!client.is_message_available().unwrap());
        assert_eq!(client.receive().unwrap(), None);

        client.send(b"hello").unwrap();
        assert_eq!(&bridge.borrow().engine().radio().sent()[0][..], b"hello");

        bridge.borrow_mut().engine_mut().radio_mut().deliver(b"world");
        assert!(client.is_message_available().unwrap());
        assert_eq!(client.receive().unwrap().unwrap().as_slice(), b"world");
        // Still there
        assert_eq!(client.receive().unwrap().unwrap().as_slice(), b"world");
    }

    #[test]
    fn test_radio_failure_status() {
        let inbox = MessageSlot::<NoopRawMutex>::new();
        let bridge = bridge(&inbox);
        let mut client = client(&bridge);

        bridge.borrow_mut().engine_mut().radio_mut().set_failing(true);
        assert_eq!(
            client.enable(),
            Err(ClientError::Status(Status::OtherFailure))
        );
    }

    #[test]
    fn test_timeout_when_bridge_never_runs() {
        let inbox = MessageSlot::<NoopRawMutex>::new();
        let bridge = bridge(&inbox);
        let bus = SimBus {
            bridge: &bridge,
            transactions: 0,
        };
        let mut client = RadioClient::new(bus, NoDelay).with_polling(1, 3);

        assert_eq!(client.enable(), Err(ClientError::Timeout));
        let (bus, _) = client.release();
        // One write, then the initial read and three retries
        assert_eq!(bus.transactions, 5);
    }

    struct NoDelay;

    impl DelayNs for NoDelay {
        fn delay_ns(&mut self, _ns: u32) {}
    }

    #[test]
    fn test_parse_data_checksum() {
        let mut frame = [0xF1u8; BUFFER_SIZE];
        frame[..4].copy_from_slice(&[0x01, 0x01, 42, 43]);
        assert_eq!(
            parse_data::<Infallible>(&frame),
            Err(ClientError::ChecksumMismatch)
        );
        frame[3] = 42;
        assert_eq!(parse_data::<Infallible>(&frame).unwrap().as_slice(), &[42]);
    }

    #[test]
    fn test_parse_data_rejects_bare_status() {
        let mut frame = [0xF1u8; BUFFER_SIZE];
        frame[0] = 0x01;
        assert_eq!(parse_data::<Infallible>(&frame), Err(ClientError::Malformed));
        frame[0] = STATUS_NO_MESSAGE;
        assert_eq!(
            parse_data::<Infallible>(&frame),
            Err(ClientError::Status(Status::NoMessage))
        );
    }

    mod wire {
        use super::super::*;
        use embedded_hal_mock::eh1::delay::NoopDelay;
        use embedded_hal_mock::eh1::spi::{Mock as SpiMock, Transaction as SpiTransaction};

        fn reply(bytes: &[u8]) -> std::vec::Vec<u8> {
            let mut frame = std::vec![0xF1u8; BUFFER_SIZE];
            frame[..bytes.len()].copy_from_slice(bytes);
            frame
        }

        #[test]
        fn test_state_query_bytes() {
            let expectations = [
                SpiTransaction::transaction_start(),
                SpiTransaction::transfer(std::vec![CMD_RADIO_STATE_QUERY], std::vec![0xF1]),
                SpiTransaction::transaction_end(),
                SpiTransaction::transaction_start(),
                SpiTransaction::transfer_in_place(std::vec![0; BUFFER_SIZE], std::vec![0xF0; BUFFER_SIZE]),
                SpiTransaction::transaction_end(),
                SpiTransaction::transaction_start(),
                SpiTransaction::transfer_in_place(std::vec![0; BUFFER_SIZE], reply(&[0x03])),
                SpiTransaction::transaction_end(),
            ];
            let spi = SpiMock::new(&expectations);
            let mut client = RadioClient::new(spi, NoopDelay::new());

            assert!(client.is_enabled().unwrap());
            let (mut spi, _) = client.release();
            spi.done();
        }

        #[test]
        fn test_channel_set_bytes_with_refused_write() {
            let expectations = [
                SpiTransaction::transaction_start(),
                SpiTransaction::transfer(std::vec![0x08, 1, 42, 42], std::vec![0xF0; 4]),
                SpiTransaction::transaction_end(),
                SpiTransaction::transaction_start(),
                SpiTransaction::transfer(std::vec![0x08, 1, 42, 42], std::vec![0x07, 0xF1, 0xF1, 0xF1]),
                SpiTransaction::transaction_end(),
                SpiTransaction::transaction_start(),
                SpiTransaction::transfer_in_place(std::vec![0; BUFFER_SIZE], reply(&[0x01])),
                SpiTransaction::transaction_end(),
            ];
            let spi = SpiMock::new(&expectations);
            let mut client = RadioClient::new(spi, NoopDelay::new());

            client.set_channel(42).unwrap();
            let (mut spi, _) = client.release();
            spi.done();
        }

        #[test]
        fn test_receive_bytes() {
            let expectations = [
                SpiTransaction::transaction_start(),
                SpiTransaction::transfer(std::vec![CMD_RECV], std::vec![0xF1]),
                SpiTransaction::transaction_end(),
                SpiTransaction::transaction_start(),
                SpiTransaction::transfer_in_place(
                    std::vec![0; BUFFER_SIZE],
                    reply(&[0x01, 2, b'O', b'N', b'O' ^ b'N']),
                ),
                SpiTransaction::transaction_end(),
            ];
            let spi = SpiMock::new(&expectations);
            let mut client = RadioClient::new(spi, NoopDelay::new());

            assert_eq!(client.receive().unwrap().unwrap().as_slice(), b"ON");
            let (mut spi, _) = client.release();
            spi.done();
        }
    }
}
