use core::fmt::Write as _;

use crate::{
    error::{Error, Result},
    types::{ChannelId, State},
};
use embedded_io::Error as _;

/// Driver for a Rigol DP2031 speaking SCPI over any interface which implements
/// [embedded_io::Read] & [embedded_io::Write].
///
/// The driver owns its interface, so holding a `Dp2031` is holding the one live
/// connection. Dropping it (or calling [Self::into_inner]) releases the transport.
///
/// `L` bounds the length of a single command or response line.
pub struct Dp2031<S: embedded_io::Read + embedded_io::Write, const L: usize = 128> {
    interface: S,
}

impl<S: embedded_io::Read + embedded_io::Write, const L: usize> Dp2031<S, L> {
    pub fn new(interface: S) -> Self {
        Self { interface }
    }

    /// Give back the transport.
    pub fn into_inner(self) -> S {
        self.interface
    }

    /// `*IDN?`
    pub fn identify(&mut self) -> Result<String, S::Error> {
        self.query("*IDN?")
    }

    /// `*RST`, returns the supply to its power-on defaults with all outputs off.
    pub fn reset(&mut self) -> Result<(), S::Error> {
        self.write_command("*RST")
    }

    /// Set the target voltage and current limit of a channel in one go.
    pub fn apply(
        &mut self,
        channel: ChannelId,
        voltage: f64,
        current_limit: f64,
    ) -> Result<(), S::Error> {
        let command = self.format(format_args!("APPL {channel},{voltage},{current_limit}"))?;
        self.write_command(&command)
    }

    /// Switch a channel output on or off.
    pub fn set_output(&mut self, channel: ChannelId, state: impl Into<State>) -> Result<(), S::Error> {
        let state = state.into();
        let command = self.format(format_args!("OUTP {channel},{state}"))?;
        self.write_command(&command)
    }

    /// Measured output voltage in volts.
    pub fn measure_voltage(&mut self, channel: ChannelId) -> Result<f64, S::Error> {
        let command = self.format(format_args!("MEAS:VOLT? {channel}"))?;
        self.query_f64(&command)
    }

    /// Measured output current in amps.
    pub fn measure_current(&mut self, channel: ChannelId) -> Result<f64, S::Error> {
        let command = self.format(format_args!("MEAS:CURR? {channel}"))?;
        self.query_f64(&command)
    }

    /// Send a command that produces no response. A newline is appended.
    pub fn write_command(&mut self, command: &str) -> Result<(), S::Error> {
        log::debug!("scpi > {command}");
        self.interface
            .write_all(command.as_bytes())
            .map_err(Error::Transport)?;
        self.interface.write_all(b"\n").map_err(Error::Transport)?;
        self.interface.flush().map_err(Error::Transport)
    }

    /// Send a command and read back one response line, without its terminator.
    pub fn query(&mut self, command: &str) -> Result<String, S::Error> {
        self.write_command(command)?;

        // One byte per read so nothing after the terminator is consumed.
        let mut line: heapless::Vec<u8, L> = heapless::Vec::new();
        let mut byte = [0u8; 1];
        loop {
            match self.interface.read(&mut byte) {
                Ok(0) => return Err(Error::InvalidResponse),
                Ok(_) if byte[0] == b'\n' => break,
                Ok(_) => line.push(byte[0]).map_err(|_| Error::BufferError)?,
                Err(e) if matches!(e.kind(), embedded_io::ErrorKind::TimedOut) => {
                    return Err(Error::Timeout);
                }
                Err(e) => return Err(Error::Transport(e)),
            }
        }

        let text = core::str::from_utf8(&line).map_err(|_| Error::InvalidResponse)?;
        let text = text.trim_end_matches('\r').to_string();
        log::debug!("scpi < {text}");
        Ok(text)
    }

    fn query_f64(&mut self, command: &str) -> Result<f64, S::Error> {
        let response = self.query(command)?;
        response
            .trim()
            .parse::<f64>()
            .map_err(|_| Error::InvalidResponse)
    }

    fn format(&self, args: core::fmt::Arguments<'_>) -> Result<heapless::String<L>, S::Error> {
        let mut command = heapless::String::new();
        command.write_fmt(args).map_err(|_| Error::BufferError)?;
        Ok(command)
    }
}
