//! Byte transports for the instrument: a raw SCPI socket or a serial port,
//! both exposed through [embedded_io::Read] & [embedded_io::Write].

use std::io;
use std::net::TcpStream;
use std::time::Duration;

use embedded_io::{Read as _, Write as _};
use serialport::SerialPort;

/// Rigol instruments listen for raw SCPI on this port.
pub const DEFAULT_SCPI_PORT: u16 = 5555;
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Wraps a [std::io::Error] so it can be used as an [embedded_io::Error].
#[derive(Debug)]
pub struct IoError(pub io::Error);

impl core::fmt::Display for IoError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for IoError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.0)
    }
}

impl embedded_io::Error for IoError {
    fn kind(&self) -> embedded_io::ErrorKind {
        match self.0.kind() {
            io::ErrorKind::NotFound => embedded_io::ErrorKind::NotFound,
            io::ErrorKind::PermissionDenied => embedded_io::ErrorKind::PermissionDenied,
            io::ErrorKind::ConnectionRefused => embedded_io::ErrorKind::ConnectionRefused,
            io::ErrorKind::ConnectionReset => embedded_io::ErrorKind::ConnectionReset,
            io::ErrorKind::ConnectionAborted => embedded_io::ErrorKind::ConnectionAborted,
            io::ErrorKind::NotConnected => embedded_io::ErrorKind::NotConnected,
            io::ErrorKind::BrokenPipe => embedded_io::ErrorKind::BrokenPipe,
            io::ErrorKind::InvalidInput => embedded_io::ErrorKind::InvalidInput,
            io::ErrorKind::InvalidData => embedded_io::ErrorKind::InvalidData,
            // Socket read timeouts surface as WouldBlock on unix.
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => {
                embedded_io::ErrorKind::TimedOut
            }
            io::ErrorKind::Interrupted => embedded_io::ErrorKind::Interrupted,
            io::ErrorKind::Unsupported => embedded_io::ErrorKind::Unsupported,
            io::ErrorKind::OutOfMemory => embedded_io::ErrorKind::OutOfMemory,
            _ => embedded_io::ErrorKind::Other,
        }
    }
}

/// Adapts any blocking [std::io] stream to [embedded_io].
pub struct IoPort<T>(pub T);

impl<T> embedded_io::ErrorType for IoPort<T> {
    type Error = IoError;
}

impl<T: io::Read> embedded_io::Read for IoPort<T> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        io::Read::read(&mut self.0, buf).map_err(IoError)
    }
}

impl<T: io::Write> embedded_io::Write for IoPort<T> {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        io::Write::write(&mut self.0, buf).map_err(IoError)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        io::Write::flush(&mut self.0).map_err(IoError)
    }
}

/// Where the instrument lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resource {
    /// Raw SCPI socket, `host:port`.
    Socket { host: String, port: u16 },
    /// Serial port name, e.g. `/dev/ttyUSB0` or `COM3`.
    Serial { port: String, baud_rate: u32 },
}

impl Resource {
    /// Accepts VISA style socket resources (`TCPIP0::192.168.1.5::5555::SOCKET`),
    /// plain `host:port`, VISA serial resources (`ASRL/dev/ttyUSB0::INSTR`, or
    /// `ASRL3::INSTR` for serial board 3) and bare serial port names.
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        let fields: Vec<&str> = text.split("::").collect();
        if fields.len() >= 2 && fields[0].to_ascii_uppercase().starts_with("TCPIP") {
            let port = fields
                .get(2)
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_SCPI_PORT);
            return Resource::Socket {
                host: fields[1].to_string(),
                port,
            };
        }
        if fields.len() >= 2 && fields[0].to_ascii_uppercase().starts_with("ASRL") {
            let port = &fields[0][4..];
            let port = match port.parse::<u16>() {
                Ok(board) => serial_board_name(board),
                Err(_) => port.to_string(),
            };
            return Resource::Serial {
                port,
                baud_rate: DEFAULT_BAUD_RATE,
            };
        }
        if let Some((host, port)) = text.rsplit_once(':') {
            if let Ok(port) = port.parse() {
                if !host.is_empty() {
                    return Resource::Socket {
                        host: host.to_string(),
                        port,
                    };
                }
            }
        }
        Resource::Serial {
            port: text.to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
        }
    }

    /// Open the transport. Every read and write is bounded by `timeout`.
    pub fn open(&self, timeout: Duration) -> io::Result<Link> {
        match self {
            Resource::Socket { host, port } => {
                let stream = TcpStream::connect((host.as_str(), *port))?;
                stream.set_read_timeout(Some(timeout))?;
                stream.set_write_timeout(Some(timeout))?;
                stream.set_nodelay(true)?;
                Ok(Link::Socket(IoPort(stream)))
            }
            Resource::Serial { port, baud_rate } => {
                let serial = serialport::new(port, *baud_rate)
                    .timeout(timeout)
                    .open()
                    .map_err(io::Error::from)?;
                Ok(Link::Serial(IoPort(serial)))
            }
        }
    }
}

/// Device name of VISA serial board `n`, counted from 1 like `COMn`.
#[cfg(windows)]
fn serial_board_name(board: u16) -> String {
    format!("COM{board}")
}

/// Device name of VISA serial board `n`. Board 1 is `/dev/ttyS0`.
#[cfg(not(windows))]
fn serial_board_name(board: u16) -> String {
    format!("/dev/ttyS{}", board.saturating_sub(1))
}

impl core::fmt::Display for Resource {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Resource::Socket { host, port } => write!(f, "{host}:{port}"),
            Resource::Serial { port, baud_rate } => write!(f, "{port} @ {baud_rate} baud"),
        }
    }
}

/// An open instrument transport. Dropping it closes the underlying handle.
pub enum Link {
    Socket(IoPort<TcpStream>),
    Serial(IoPort<Box<dyn SerialPort>>),
}

impl embedded_io::ErrorType for Link {
    type Error = IoError;
}

impl embedded_io::Read for Link {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        match self {
            Link::Socket(port) => port.read(buf),
            Link::Serial(port) => port.read(buf),
        }
    }
}

impl embedded_io::Write for Link {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        match self {
            Link::Socket(port) => port.write(buf),
            Link::Serial(port) => port.write(buf),
        }
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        match self {
            Link::Socket(port) => port.flush(),
            Link::Serial(port) => port.flush(),
        }
    }
}
