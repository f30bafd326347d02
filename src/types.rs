//! Plain data types shared by the sequencer, the range check and the reports.

use core::fmt;

use strum_macros::{Display, EnumIter};

/// Output channel number on the supply. Channels are numbered from 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChannelId(u8);

impl ChannelId {
    /// Returns `None` for channel 0.
    pub const fn new(number: u8) -> Option<Self> {
        if number == 0 { None } else { Some(Self(number)) }
    }

    pub const fn number(self) -> u8 {
        self.0
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CH{}", self.0)
    }
}

/// One step of a power-on plan: which channel, at what voltage, with which current limit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelSpec {
    pub channel: ChannelId,
    /// Volts.
    pub voltage: f64,
    /// Amps.
    pub current_limit: f64,
}

impl ChannelSpec {
    pub const fn new(channel: ChannelId, voltage: f64, current_limit: f64) -> Self {
        Self {
            channel,
            voltage,
            current_limit,
        }
    }
}

/// Inclusive band of acceptable settled current, in amps.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExpectedRange {
    pub min: f64,
    pub max: f64,
}

impl ExpectedRange {
    /// Used for channels that have no configured range.
    pub const PERMISSIVE: Self = Self { min: 0.0, max: 9999.0 };

    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Both bounds are inclusive.
    pub fn contains(&self, value: f64) -> bool {
        self.min <= value && value <= self.max
    }
}

/// Used to be less ambiguous about whether an output is on or off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum State {
    /// Disabled.
    #[strum(to_string = "OFF")]
    Off,
    /// Enabled.
    #[strum(to_string = "ON")]
    On,
}

impl From<State> for bool {
    fn from(value: State) -> Self {
        match value {
            State::Off => false,
            State::On => true,
        }
    }
}

impl From<bool> for State {
    fn from(value: bool) -> Self {
        match value {
            true => State::On,
            false => State::Off,
        }
    }
}

/// Outcome of a range check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, Display)]
pub enum Verdict {
    #[strum(to_string = "normal")]
    Normal,
    #[strum(to_string = "abnormal")]
    Abnormal,
}

impl Verdict {
    pub fn is_normal(self) -> bool {
        self == Verdict::Normal
    }
}
