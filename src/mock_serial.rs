//! We use this mocking module in unit tests to emulate the regulator's serial port.
//!
//! Replies are scripted per transaction: every write consumes the next [`Reply`] and queues its
//! bytes behind anything still unread, as a real receive buffer does.

use crate::link::Connector;
use std::{cell::Cell, collections::VecDeque, rc::Rc};

/// What the emulated regulator does in answer to one request.
#[derive(Debug, Clone)]
pub enum Reply {
    /// Answer with these bytes.
    Frame(Vec<u8>),
    /// Answer with the request itself, as a successful single register write does.
    Echo,
    /// Never answer; reads time out.
    Silence,
    /// Answer with these bytes only after the read has timed out.
    Late(Vec<u8>),
    /// Reads fail with a port error.
    Fail,
}

#[derive(Debug, thiserror::Error)]
pub enum MockSerialError {
    /// Simulated port failure
    #[error("simulated port failure")]
    SimulatedError,
    /// No data available
    #[error("no data available")]
    WouldBlock,
}

impl embedded_io::Error for MockSerialError {
    fn kind(&self) -> embedded_io::ErrorKind {
        match self {
            MockSerialError::SimulatedError => embedded_io::ErrorKind::BrokenPipe,
            MockSerialError::WouldBlock => embedded_io::ErrorKind::Other,
        }
    }
}

/// Our mock type used to emulate a serial port.
#[derive(Debug, Default)]
pub struct MockSerial {
    /// Everything written to the port
    written: Vec<u8>,
    /// Replies for upcoming transactions
    replies: VecDeque<Reply>,
    /// Received bytes not read yet
    pending: VecDeque<u8>,
    /// Reply that arrives once the current read times out
    late: Option<Vec<u8>>,
    /// Current transaction fails on read
    failing: bool,
}

impl embedded_io::ErrorType for MockSerial {
    type Error = MockSerialError;
}

impl embedded_io::Write for MockSerial {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.written.extend_from_slice(buf);

        self.failing = false;
        match self.replies.pop_front() {
            Some(Reply::Frame(frame)) => self.pending.extend(frame),
            Some(Reply::Echo) => self.pending.extend(buf.iter().copied()),
            Some(Reply::Late(frame)) => self.late = Some(frame),
            Some(Reply::Fail) => self.failing = true,
            Some(Reply::Silence) | None => {}
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl embedded_io::Read for MockSerial {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        if self.failing {
            return Err(MockSerialError::SimulatedError);
        }
        if self.pending.is_empty() {
            if let Some(frame) = self.late.take() {
                self.pending.extend(frame);
            }
            return Err(MockSerialError::WouldBlock);
        }

        let count = buf.len().min(self.pending.len());
        for (slot, byte) in buf.iter_mut().zip(self.pending.drain(..count)) {
            *slot = byte;
        }
        Ok(count)
    }
}

impl embedded_io::ReadReady for MockSerial {
    fn read_ready(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.pending.is_empty())
    }
}

impl MockSerial {
    pub fn new() -> Self {
        Self::default()
    }

    /// A port that answers successive transactions with `replies`.
    pub fn scripted(replies: impl IntoIterator<Item = Reply>) -> Self {
        Self {
            replies: replies.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Get a reference to the data that was written to this mock serial port
    pub fn written_data(&self) -> &[u8] {
        &self.written
    }

    /// Response frame for a single holding register read.
    pub fn read_reply(unit_id: u8, value: u16) -> Vec<u8> {
        let [hi, lo] = value.to_be_bytes();
        with_crc(vec![unit_id, 0x03, 0x02, hi, lo])
    }

    /// Request (and echoed response) frame for a single register write.
    pub fn write_reply(unit_id: u8, register: u16, value: u16) -> Vec<u8> {
        let [reg_hi, reg_lo] = register.to_be_bytes();
        let [hi, lo] = value.to_be_bytes();
        with_crc(vec![unit_id, 0x06, reg_hi, reg_lo, hi, lo])
    }
}

/// Append the Modbus RTU CRC, low byte first.
fn with_crc(mut frame: Vec<u8>) -> Vec<u8> {
    let mut crc: u16 = 0xFFFF;
    for &byte in &frame {
        crc ^= byte as u16;
        for _ in 0..8 {
            crc = if crc & 1 != 0 { (crc >> 1) ^ 0xA001 } else { crc >> 1 };
        }
    }
    frame.extend_from_slice(&crc.to_le_bytes());
    frame
}

/// Connector whose open attempts succeed or fail in a scripted order.
///
/// `None` entries fail; once the script runs out every attempt fails.
pub struct MockConnector {
    outcomes: VecDeque<Option<MockSerial>>,
    attempts: Rc<Cell<u32>>,
}

impl MockConnector {
    pub fn new(outcomes: impl IntoIterator<Item = Option<MockSerial>>) -> Self {
        Self {
            outcomes: outcomes.into_iter().collect(),
            attempts: Rc::new(Cell::new(0)),
        }
    }

    /// Connects once to `port`.
    pub fn with_port(port: MockSerial) -> Self {
        Self::new([Some(port)])
    }

    /// Shared counter of open attempts, readable after the connector has been moved.
    pub fn attempts(&self) -> Rc<Cell<u32>> {
        Rc::clone(&self.attempts)
    }
}

impl Connector for MockConnector {
    type Port = MockSerial;
    type Error = &'static str;

    fn open(&mut self, _address: &str, _baud_rate: u32) -> Result<Self::Port, Self::Error> {
        self.attempts.set(self.attempts.get() + 1);
        self.outcomes
            .pop_front()
            .flatten()
            .ok_or("no such device")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_io::{Error, Read, ReadReady, Write};

    #[test]
    fn test_write_records_data() {
        let mut mock = MockSerial::new();
        mock.write_all(b"Hello, ").unwrap();
        mock.write_all(b"World!").unwrap();
        assert_eq!(mock.written_data(), b"Hello, World!");
    }

    #[test]
    fn test_read_timeout_when_no_reply() {
        let mut mock = MockSerial::new();
        mock.write_all(b"ping").unwrap();

        let mut buffer = [0u8; 10];
        let result = mock.read(&mut buffer);
        assert!(matches!(result, Err(MockSerialError::WouldBlock)));
    }

    #[test]
    fn test_unread_bytes_stay_queued() {
        let mut mock = MockSerial::scripted([
            Reply::Frame(b"first".to_vec()),
            Reply::Frame(b"second".to_vec()),
        ]);

        let mut buffer = [0u8; 3];
        mock.write_all(b"a").unwrap();
        assert_eq!(mock.read(&mut buffer).unwrap(), 3);
        assert_eq!(&buffer, b"fir");

        // The unread tail of the first reply is still in front of the second.
        mock.write_all(b"b").unwrap();
        let mut buffer = [0u8; 10];
        assert_eq!(mock.read(&mut buffer).unwrap(), 8);
        assert_eq!(&buffer[..8], b"stsecond");
        assert!(!mock.read_ready().unwrap());
        assert!(mock.read(&mut buffer).is_err());
    }

    #[test]
    fn test_late_reply_arrives_after_timeout() {
        let mut mock = MockSerial::scripted([Reply::Late(b"late".to_vec())]);
        let mut buffer = [0u8; 8];

        mock.write_all(b"a").unwrap();
        assert!(!mock.read_ready().unwrap());
        assert!(matches!(mock.read(&mut buffer), Err(MockSerialError::WouldBlock)));

        assert!(mock.read_ready().unwrap());
        assert_eq!(mock.read(&mut buffer).unwrap(), 4);
        assert_eq!(&buffer[..4], b"late");
    }

    #[test]
    fn test_echo_and_fail() {
        let mut mock = MockSerial::scripted([Reply::Echo, Reply::Fail]);
        let mut buffer = [0u8; 8];

        mock.write_all(b"echo").unwrap();
        assert_eq!(mock.read(&mut buffer).unwrap(), 4);
        assert_eq!(&buffer[..4], b"echo");

        mock.write_all(b"x").unwrap();
        let err = mock.read(&mut buffer).unwrap_err();
        assert!(matches!(err.kind(), embedded_io::ErrorKind::BrokenPipe));
    }

    #[test]
    fn test_reply_frames_carry_crc() {
        assert_eq!(
            MockSerial::read_reply(0x01, 0x5678),
            [0x01, 0x03, 0x02, 0x56, 0x78, 0x87, 0xC6]
        );
        assert_eq!(
            MockSerial::write_reply(0x01, 0x10, 0x1234),
            [0x01, 0x06, 0x00, 0x10, 0x12, 0x34, 0x85, 0x78]
        );
    }

    #[test]
    fn test_connector_script() {
        let mut connector = MockConnector::new([None, Some(MockSerial::new())]);
        let attempts = connector.attempts();

        assert!(connector.open("/dev/null", 4800).is_err());
        assert!(connector.open("/dev/null", 4800).is_ok());
        assert!(connector.open("/dev/null", 4800).is_err());
        assert_eq!(attempts.get(), 3);
    }
}
