//! Ordered channel power-on with sampling during each channel's settling window.

use std::time::Instant;

use fugit::MillisDurationU32;

use crate::{
    error::{Error, Result},
    scpi::Dp2031,
    types::{ChannelId, ChannelSpec, State},
};

/// Timing of a power-on run. All delays are open loop; the supply gives no
/// settling-complete signal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SequenceConfig {
    /// Pause between two sampling ticks.
    pub sample_interval: MillisDurationU32,
    /// Length of the sampling window after each channel is enabled.
    pub settling: MillisDurationU32,
    /// Wait between enabling a channel and its first sample.
    pub enable_delay: MillisDurationU32,
    /// Wait after switching every sequenced channel off, before the first one is enabled.
    pub initial_off_delay: MillisDurationU32,
}

impl Default for SequenceConfig {
    fn default() -> Self {
        Self {
            sample_interval: MillisDurationU32::millis(100),
            settling: MillisDurationU32::millis(2000),
            enable_delay: MillisDurationU32::millis(2000),
            initial_off_delay: MillisDurationU32::millis(2000),
        }
    }
}

impl SequenceConfig {
    /// Number of sampling ticks per channel, `ceil(settling / interval) + 1`.
    pub fn tick_count<I: embedded_io::Error>(&self) -> Result<u32, I> {
        let interval = self.sample_interval.to_millis();
        if interval == 0 {
            return Err(Error::InvalidConfig("sample interval must be non-zero"));
        }
        self.settling
            .to_millis()
            .div_ceil(interval)
            .checked_add(1)
            .ok_or(Error::InvalidConfig("settling window too long for the sample interval"))
    }
}

/// Voltage and current samples of one channel, index-aligned with [Recording::timestamps].
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelTrace {
    pub channel: ChannelId,
    pub voltage: Vec<f64>,
    pub current: Vec<f64>,
}

/// Everything sampled during a run. Samples are only ever appended.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Recording {
    /// Seconds since the start of the run.
    pub timestamps: Vec<f64>,
    /// One trace per sequenced channel, in plan order.
    pub channels: Vec<ChannelTrace>,
}

impl Recording {
    /// An empty recording with a trace for every channel of the plan.
    pub fn for_plan(plan: &[ChannelSpec]) -> Self {
        let mut recording = Self::default();
        for spec in plan {
            if recording.trace(spec.channel).is_none() {
                recording.channels.push(ChannelTrace {
                    channel: spec.channel,
                    voltage: Vec::new(),
                    current: Vec::new(),
                });
            }
        }
        recording
    }

    pub fn trace(&self, channel: ChannelId) -> Option<&ChannelTrace> {
        self.channels.iter().find(|trace| trace.channel == channel)
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Append one tick. `readings` holds `(voltage, current)` in the order of [Self::channels].
    pub fn push_tick(&mut self, elapsed_s: f64, readings: &[(f64, f64)]) {
        for (trace, &(voltage, current)) in self.channels.iter_mut().zip(readings) {
            trace.voltage.push(voltage);
            trace.current.push(current);
        }
        self.timestamps.push(elapsed_s);
    }
}

/// Drives a power-on plan against a supply.
#[derive(Debug, Clone)]
pub struct Sequencer {
    plan: Vec<ChannelSpec>,
    config: SequenceConfig,
}

impl Sequencer {
    pub fn new(plan: Vec<ChannelSpec>, config: SequenceConfig) -> Self {
        Self { plan, config }
    }

    pub fn plan(&self) -> &[ChannelSpec] {
        &self.plan
    }

    pub fn config(&self) -> &SequenceConfig {
        &self.config
    }

    /// Power the plan on in order, sampling every sequenced channel while each one settles.
    ///
    /// Channels are never switched off part way through, so later channels are
    /// sequenced with the earlier ones still live. A failed command or measurement
    /// aborts the run; samples gathered up to that point stay in `recording`.
    pub fn run<S, const L: usize>(
        &self,
        psu: &mut Dp2031<S, L>,
        recording: &mut Recording,
    ) -> Result<(), S::Error>
    where
        S: embedded_io::Read + embedded_io::Write,
    {
        let ticks = self.config.tick_count()?;
        if recording.channels.is_empty() {
            *recording = Recording::for_plan(&self.plan);
        }
        let start = Instant::now();

        for spec in &self.plan {
            psu.set_output(spec.channel, State::Off)?;
        }
        sleep(self.config.initial_off_delay);

        let mut readings = Vec::with_capacity(recording.channels.len());
        for spec in &self.plan {
            log::info!(
                "configuring {}: {} V, {} A limit",
                spec.channel,
                spec.voltage,
                spec.current_limit
            );
            psu.apply(spec.channel, spec.voltage, spec.current_limit)?;
            psu.set_output(spec.channel, State::On)?;
            sleep(self.config.enable_delay);

            for _ in 0..ticks {
                readings.clear();
                for trace in &recording.channels {
                    let voltage = psu.measure_voltage(trace.channel)?;
                    let current = psu.measure_current(trace.channel)?;
                    readings.push((voltage, current));
                }
                recording.push_tick(start.elapsed().as_secs_f64(), &readings);
                sleep(self.config.sample_interval);
            }
            log::info!("{} powered on, {} samples taken", spec.channel, ticks);
        }
        Ok(())
    }

    /// Switch the plan's channels off in reverse power-on order.
    pub fn shutdown<S, const L: usize>(&self, psu: &mut Dp2031<S, L>) -> Result<(), S::Error>
    where
        S: embedded_io::Read + embedded_io::Write,
    {
        for spec in self.plan.iter().rev() {
            psu.set_output(spec.channel, State::Off)?;
            log::info!("{} output off", spec.channel);
        }
        Ok(())
    }
}

fn sleep(duration: MillisDurationU32) {
    if duration.to_millis() > 0 {
        std::thread::sleep(std::time::Duration::from_millis(duration.to_millis().into()));
    }
}
