//! Mock transports used by unit tests in place of a serial port or socket.

use std::collections::{BTreeMap, VecDeque};

/// Scripted byte stream: records everything written, replays a preloaded response.
pub struct MockSerial {
    /// Data written to the mock port
    write_buffer: heapless::Vec<u8, 512>,
    /// Pre-configured response data to be read
    read_buffer: heapless::Vec<u8, 512>,
    /// Current position in the read buffer
    read_position: usize,
    /// Flag to simulate write errors
    should_error_on_write: bool,
    /// Flag to simulate read errors
    should_error_on_read: bool,
}

#[derive(Debug)]
pub enum MockSerialError {
    /// Nothing left to read, as a real port would report after its timeout
    Timeout,
    /// Simulated buffer overflow
    BufferOverflow,
    /// Generic simulated error for testing
    SimulatedError,
}

impl core::fmt::Display for MockSerialError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{self:?}")
    }
}

impl core::error::Error for MockSerialError {}

impl embedded_io::Error for MockSerialError {
    fn kind(&self) -> embedded_io::ErrorKind {
        match self {
            MockSerialError::Timeout => embedded_io::ErrorKind::TimedOut,
            MockSerialError::BufferOverflow => embedded_io::ErrorKind::OutOfMemory,
            MockSerialError::SimulatedError => embedded_io::ErrorKind::Other,
        }
    }
}

impl embedded_io::ErrorType for MockSerial {
    type Error = MockSerialError;
}

impl embedded_io::Write for MockSerial {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        if self.should_error_on_write {
            return Err(MockSerialError::SimulatedError);
        }
        self.write_buffer
            .extend_from_slice(buf)
            .map_err(|_| MockSerialError::BufferOverflow)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        if self.should_error_on_write {
            return Err(MockSerialError::SimulatedError);
        }
        Ok(())
    }
}

impl embedded_io::Read for MockSerial {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        if self.should_error_on_read {
            return Err(MockSerialError::SimulatedError);
        }
        if self.read_position >= self.read_buffer.len() {
            return Err(MockSerialError::Timeout);
        }

        let available = &self.read_buffer[self.read_position..];
        let count = core::cmp::min(buf.len(), available.len());
        buf[..count].copy_from_slice(&available[..count]);
        self.read_position += count;
        Ok(count)
    }
}

impl MockSerial {
    pub fn new() -> Self {
        Self {
            write_buffer: heapless::Vec::new(),
            read_buffer: heapless::Vec::new(),
            read_position: 0,
            should_error_on_write: false,
            should_error_on_read: false,
        }
    }

    /// Set the data that will be returned when read() is called
    pub fn set_read_data(&mut self, data: &[u8]) -> Result<(), MockSerialError> {
        self.read_buffer.clear();
        self.read_position = 0;
        self.read_buffer
            .extend_from_slice(data)
            .map_err(|_| MockSerialError::BufferOverflow)
    }

    pub fn written_data(&self) -> &[u8] {
        &self.write_buffer
    }

    pub fn set_write_error(&mut self, should_error: bool) {
        self.should_error_on_write = should_error;
    }

    pub fn set_read_error(&mut self, should_error: bool) {
        self.should_error_on_read = should_error;
    }
}

/// Behavioural stand-in for the supply: parses each SCPI line written to it and
/// queues the response a DP2031 would give.
///
/// Enabled channels read back their programmed voltage and the configured load
/// current, disabled channels read 0.
pub struct MockSupply {
    pending_line: Vec<u8>,
    responses: VecDeque<u8>,
    /// Every command received, in order.
    pub commands: Vec<String>,
    setpoints: BTreeMap<u8, f64>,
    enabled: BTreeMap<u8, bool>,
    loads: BTreeMap<u8, f64>,
    /// Number of queries to answer before refusing to answer any more.
    answer_limit: Option<usize>,
    answered: usize,
}

impl MockSupply {
    pub fn new() -> Self {
        Self {
            pending_line: Vec::new(),
            responses: VecDeque::new(),
            commands: Vec::new(),
            setpoints: BTreeMap::new(),
            enabled: BTreeMap::new(),
            loads: BTreeMap::new(),
            answer_limit: None,
            answered: 0,
        }
    }

    /// Current drawn by a channel while its output is on.
    pub fn with_load(mut self, channel: u8, amps: f64) -> Self {
        self.loads.insert(channel, amps);
        self
    }

    /// Stop answering queries after `count` responses.
    pub fn answer_only(mut self, count: usize) -> Self {
        self.answer_limit = Some(count);
        self
    }

    pub fn is_enabled(&self, channel: u8) -> bool {
        self.enabled.get(&channel).copied().unwrap_or(false)
    }

    fn channel_arg(arg: &str) -> Option<u8> {
        arg.trim().strip_prefix("CH")?.parse().ok()
    }

    fn respond(&mut self, text: &str) {
        if self.answer_limit.is_some_and(|limit| self.answered >= limit) {
            return;
        }
        self.answered += 1;
        self.responses.extend(text.bytes());
        self.responses.push_back(b'\n');
    }

    fn handle(&mut self, line: &str) {
        self.commands.push(line.to_string());
        let (header, args) = line.split_once(' ').unwrap_or((line, ""));
        match header {
            "*IDN?" => self.respond("RIGOL TECHNOLOGIES,DP2031,DP2A000000000,00.01.05"),
            "*RST" => {
                self.setpoints.clear();
                self.enabled.clear();
            }
            "APPL" => {
                let mut fields = args.split(',');
                let channel = fields.next().and_then(Self::channel_arg);
                let volts = fields.next().and_then(|v| v.parse().ok());
                if let (Some(channel), Some(volts)) = (channel, volts) {
                    self.setpoints.insert(channel, volts);
                }
            }
            "OUTP" => {
                if let Some((channel, state)) = args.split_once(',') {
                    if let Some(channel) = Self::channel_arg(channel) {
                        self.enabled.insert(channel, state == "ON");
                    }
                }
            }
            "MEAS:VOLT?" => {
                let channel = Self::channel_arg(args).unwrap_or(0);
                let volts = match self.is_enabled(channel) {
                    true => self.setpoints.get(&channel).copied().unwrap_or(0.0),
                    false => 0.0,
                };
                self.respond(&format!("{volts:.4}"));
            }
            "MEAS:CURR?" => {
                let channel = Self::channel_arg(args).unwrap_or(0);
                let amps = match self.is_enabled(channel) {
                    true => self.loads.get(&channel).copied().unwrap_or(0.0),
                    false => 0.0,
                };
                self.respond(&format!("{amps:.6}"));
            }
            _ => {}
        }
    }
}

impl embedded_io::ErrorType for MockSupply {
    type Error = MockSerialError;
}

impl embedded_io::Write for MockSupply {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        for &byte in buf {
            if byte == b'\n' {
                let line = String::from_utf8_lossy(&self.pending_line).into_owned();
                self.pending_line.clear();
                self.handle(&line);
            } else {
                self.pending_line.push(byte);
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl embedded_io::Read for MockSupply {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        if self.responses.is_empty() {
            return Err(MockSerialError::Timeout);
        }
        let mut count = 0;
        while count < buf.len() {
            match self.responses.pop_front() {
                Some(byte) => {
                    buf[count] = byte;
                    count += 1;
                }
                None => break,
            }
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_io::{Error, Read, Write};

    #[test]
    fn test_write_data() {
        let mut mock = MockSerial::new();
        mock.write_all(b"Hello, ").unwrap();
        mock.write_all(b"World!").unwrap();
        assert_eq!(mock.written_data(), b"Hello, World!");
    }

    #[test]
    fn test_read_partial_then_timeout() {
        let mut mock = MockSerial::new();
        mock.set_read_data(b"Hello World").unwrap();

        let mut first = [0u8; 5];
        let mut rest = [0u8; 10];
        assert_eq!(mock.read(&mut first).unwrap(), 5);
        assert_eq!(mock.read(&mut rest).unwrap(), 6);
        assert_eq!(&first, b"Hello");
        assert_eq!(&rest[..6], b" World");

        let err = mock.read(&mut rest).unwrap_err();
        assert!(matches!(err.kind(), embedded_io::ErrorKind::TimedOut));
    }

    #[test]
    fn test_write_buffer_overflow() {
        let mut mock = MockSerial::new();
        let large_data = vec![0u8; 600];
        assert!(matches!(
            mock.write(&large_data),
            Err(MockSerialError::BufferOverflow)
        ));
    }

    #[test]
    fn test_error_flags() {
        let mut mock = MockSerial::new();
        mock.set_write_error(true);
        assert!(mock.write(b"test").is_err());
        assert!(mock.written_data().is_empty());

        mock.set_read_data(b"data").unwrap();
        mock.set_read_error(true);
        let mut buffer = [0u8; 4];
        assert!(matches!(
            mock.read(&mut buffer),
            Err(MockSerialError::SimulatedError)
        ));
    }

    #[test]
    fn test_supply_reports_load_only_when_enabled() {
        let mut supply = MockSupply::new().with_load(1, 0.18);
        let mut buffer = [0u8; 32];

        supply.write_all(b"APPL CH1,2.3,0.5\nMEAS:CURR? CH1\n").unwrap();
        let n = supply.read(&mut buffer).unwrap();
        assert_eq!(&buffer[..n], b"0.000000\n");

        supply.write_all(b"OUTP CH1,ON\nMEAS:CURR? CH1\nMEAS:VOLT? CH1\n").unwrap();
        let n = supply.read(&mut buffer).unwrap();
        assert_eq!(&buffer[..n], b"0.180000\n2.3000\n");
        assert_eq!(supply.commands.len(), 5);
    }

    #[test]
    fn test_supply_answer_limit() {
        let mut supply = MockSupply::new().answer_only(1);
        let mut buffer = [0u8; 64];
        supply.write_all(b"*IDN?\n*IDN?\n").unwrap();
        let n = supply.read(&mut buffer).unwrap();
        assert!(buffer[..n].ends_with(b"00.01.05\n"));
        assert!(supply.read(&mut buffer).is_err());
    }
}
