//! Bench utilities for a Rigol DP2031 programmable DC supply and an auxiliary serial device.
//!
//! * [sequencer] powers channels on in order while sampling voltage and current,
//!   [check] compares the settled current against expected ranges, [report] appends a
//!   text log and [plot] renders the samples.
//! * [dac] flips one line of a DAC configuration file to the active level.
//! * [serial] is a small connect/send wrapper around a serial port.
//!
//! The supply is driven through [scpi::Dp2031], which works over any interface
//! implementing [embedded_io::Read] & [embedded_io::Write]. [transport] provides
//! one for a raw SCPI socket (LAN, port 5555) and one for a serial port:
//!
//! ```no_run
//! use std::time::Duration;
//! use dp2031_bench::{scpi::Dp2031, transport::Resource};
//!
//! let link = Resource::parse("TCPIP0::192.168.1.20::5555::SOCKET")
//!     .open(Duration::from_secs(2))
//!     .unwrap();
//! let mut psu: Dp2031<_> = Dp2031::new(link);
//! println!("{}", psu.identify().unwrap());
//! ```

pub mod check;
pub mod dac;
pub mod error;
pub mod plot;
pub mod prompt;
pub mod report;
pub mod scpi;
pub mod sequencer;
pub mod serial;
pub mod transport;
pub mod types;

#[cfg(test)]
mod mock_serial;
