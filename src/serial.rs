//! Line-oriented command link to an auxiliary serial device.

use std::collections::BTreeSet;
use std::time::Duration;

use embedded_io::Write as _;
use serialport::SerialPort;

use crate::{
    error::LinkError,
    transport::{DEFAULT_BAUD_RATE, IoPort},
};

pub const SERIAL_TIMEOUT: Duration = Duration::from_secs(1);

/// Enumerates and opens ports. [SystemPorts] talks to the host; tests swap in a mock.
pub trait PortOpener {
    type Port: embedded_io::Write;

    fn available(&self) -> Result<BTreeSet<String>, serialport::Error>;

    fn open(&mut self, port: &str, baud_rate: u32) -> Result<Self::Port, serialport::Error>;
}

/// Host serial ports via the `serialport` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemPorts;

impl PortOpener for SystemPorts {
    type Port = IoPort<Box<dyn SerialPort>>;

    fn available(&self) -> Result<BTreeSet<String>, serialport::Error> {
        Ok(serialport::available_ports()?
            .into_iter()
            .map(|info| info.port_name)
            .collect())
    }

    fn open(&mut self, port: &str, baud_rate: u32) -> Result<Self::Port, serialport::Error> {
        let handle = serialport::new(port, baud_rate)
            .timeout(SERIAL_TIMEOUT)
            .open()?;
        Ok(IoPort(handle))
    }
}

/// Holds at most one open port. Connecting again while connected is refused.
pub struct SerialController<O: PortOpener = SystemPorts> {
    opener: O,
    port: Option<(String, O::Port)>,
}

impl SerialController<SystemPorts> {
    pub fn new() -> Self {
        Self::with_opener(SystemPorts)
    }
}

impl Default for SerialController<SystemPorts> {
    fn default() -> Self {
        Self::new()
    }
}

impl<O: PortOpener> SerialController<O> {
    pub fn with_opener(opener: O) -> Self {
        Self { opener, port: None }
    }

    /// Names of the ports the host currently exposes. Needs no connection.
    pub fn scan_ports(&self) -> Result<BTreeSet<String>, LinkError> {
        self.opener.available().map_err(LinkError::Scan)
    }

    /// Open `port`. On failure the controller stays disconnected.
    pub fn connect(&mut self, port: &str, baud_rate: u32) -> Result<String, LinkError> {
        if self.port.is_some() {
            return Err(LinkError::AlreadyConnected);
        }
        let handle = self
            .opener
            .open(port, baud_rate)
            .map_err(|source| LinkError::Open {
                port: port.to_string(),
                source,
            })?;
        self.port = Some((port.to_string(), handle));
        log::info!("connected to {port} at {baud_rate} baud");
        Ok(format!("Connected to {port}"))
    }

    /// Open `port` at the default baud rate.
    pub fn connect_default(&mut self, port: &str) -> Result<String, LinkError> {
        self.connect(port, DEFAULT_BAUD_RATE)
    }

    /// Close the port if one is open.
    pub fn disconnect(&mut self) {
        if let Some((name, _)) = self.port.take() {
            log::info!("disconnected from {name}");
        }
    }

    pub fn is_connected(&self) -> bool {
        self.port.is_some()
    }

    /// Name of the connected port.
    pub fn port_name(&self) -> Option<&str> {
        self.port.as_ref().map(|(name, _)| name.as_str())
    }

    /// Write `command` followed by a newline. Does not wait for a reply.
    pub fn send_command(&mut self, command: &str) -> Result<String, LinkError> {
        let Some((_, port)) = self.port.as_mut() else {
            return Err(LinkError::NotConnected);
        };
        let mut line = Vec::with_capacity(command.len() + 1);
        line.extend_from_slice(command.as_bytes());
        line.push(b'\n');
        port.write_all(&line)
            .and_then(|()| port.flush())
            .map_err(|e| LinkError::Write(format!("{e:?}")))?;
        log::debug!("sent: {command}");
        Ok("Sent".to_string())
    }
}
