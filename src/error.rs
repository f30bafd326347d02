//! Error types for instrument traffic, config file edits, the serial link and report sinks.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T, I> = core::result::Result<T, Error<I>>;

/// Errors raised while talking SCPI to the supply.
#[derive(Error, Debug)]
pub enum Error<I: embedded_io::Error> {
    #[error("Transport error: {0:?}")]
    Transport(I),
    #[error("Communication timeout")]
    Timeout,
    #[error("Command or response exceeded the buffer")]
    BufferError,
    #[error("Invalid response received")]
    InvalidResponse,
    #[error("Invalid configuration: {0}")]
    InvalidConfig(&'static str),
}

/// Errors from rewriting the DAC configuration file.
#[derive(Error, Debug)]
pub enum DacError {
    #[error("File '{}' not found", .0.display())]
    NotFound(PathBuf),
    #[error("I/O error on '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("DAC index {0} out of range, expected 1-7")]
    InvalidIndex(u8),
}

/// Errors from the serial controller.
#[derive(Error, Debug)]
pub enum LinkError {
    #[error("A serial port is already connected, disconnect first")]
    AlreadyConnected,
    #[error("Serial port not connected")]
    NotConnected,
    #[error("Unable to open serial port {port}: {source}")]
    Open {
        port: String,
        #[source]
        source: serialport::Error,
    },
    #[error("Unable to enumerate serial ports: {0}")]
    Scan(#[source] serialport::Error),
    #[error("Write failed: {0}")]
    Write(String),
}

/// Errors from the log and plot sinks.
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("I/O error on '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Plot rendering failed: {0}")]
    Plot(String),
    #[error("Could not open '{}' in a viewer: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: opener::OpenError,
    },
    #[error("No samples recorded")]
    NoData,
}
