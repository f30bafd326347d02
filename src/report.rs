//! Human-readable run log, appended to a text file after every run.

use std::fmt::Write as _;
use std::fs::{self, OpenOptions};
use std::io::Write as _;
use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone};

use crate::{
    check::{ChannelOutcome, RangeReport},
    error::OutputError,
    sequencer::Recording,
    types::Verdict,
};

pub const LOG_BANNER: &str = "================ DP2031 Power On Current Log ================";
pub const DEFAULT_RESULTS_DIR: &str = "results";
pub const DEFAULT_SUFFIX: &str = "default";

/// Where a run's log and plot land: `{dir}/dp2031_log_{suffix}.txt` and
/// `{dir}/dp2031_plot_{suffix}.svg`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub log: PathBuf,
    pub plot: PathBuf,
}

impl OutputPaths {
    pub fn new(dir: impl AsRef<Path>, suffix: &str) -> Self {
        let dir = dir.as_ref();
        Self {
            log: dir.join(format!("dp2031_log_{suffix}.txt")),
            plot: dir.join(format!("dp2031_plot_{suffix}.svg")),
        }
    }
}

/// Render one log block: header, sample table, range check and conclusion.
pub fn render_log<Tz>(recording: &Recording, report: &RangeReport, time: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: core::fmt::Display,
{
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = write_log(&mut out, recording, report, time);
    out
}

fn write_log<Tz>(
    out: &mut String,
    recording: &Recording,
    report: &RangeReport,
    time: &DateTime<Tz>,
) -> core::fmt::Result
where
    Tz: TimeZone,
    Tz::Offset: core::fmt::Display,
{
    writeln!(out, "{LOG_BANNER}")?;
    writeln!(out, "Time: {}", time.format("%Y-%m-%d %H:%M:%S"))?;

    if !recording.is_empty() {
        let mut traces: Vec<_> = recording.channels.iter().collect();
        traces.sort_by_key(|trace| trace.channel);

        writeln!(out, "\n[Data Samples]")?;
        write!(out, "Time(s)")?;
        for trace in &traces {
            write!(out, ",{0}_Volt(V),{0}_Curr(A)", trace.channel)?;
        }
        writeln!(out)?;

        for (idx, t) in recording.timestamps.iter().enumerate() {
            write!(out, "{t:.3}")?;
            for trace in &traces {
                match (trace.voltage.get(idx), trace.current.get(idx)) {
                    (Some(v), Some(i)) => write!(out, ",{v:.4},{i:.6}")?,
                    _ => write!(out, ",,")?,
                }
            }
            writeln!(out)?;
        }
    }

    writeln!(out, "\n[Range Check]")?;
    for check in &report.channels {
        match check.outcome {
            ChannelOutcome::Measured {
                peak,
                range,
                verdict,
            } => {
                writeln!(out, "Channel {}:", check.channel.number())?;
                writeln!(out, "  Measured peak current: {peak:.4} A")?;
                writeln!(
                    out,
                    "  Expected current range: {:.4} A - {:.4} A",
                    range.min, range.max
                )?;
                match verdict {
                    Verdict::Normal => writeln!(out, "  -> Status: normal")?,
                    Verdict::Abnormal => {
                        writeln!(out, "  -> Status: abnormal (outside expected range)")?
                    }
                }
            }
            ChannelOutcome::NoData => writeln!(
                out,
                "Channel {}: no current data collected, cannot judge.",
                check.channel.number()
            )?,
        }
    }

    writeln!(out, "\n{}", conclusion(report.overall()))
}

pub fn conclusion(overall: Verdict) -> &'static str {
    match overall {
        Verdict::Normal => "Conclusion: all channel power-on currents are within the expected range.",
        Verdict::Abnormal => "Conclusion: abnormal channel power-on current detected. Please check.",
    }
}

/// Append `block` to the log file, creating it and its directory if needed.
pub fn append_log(path: &Path, block: &str) -> Result<(), OutputError> {
    let io_err = |source: std::io::Error| OutputError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(io_err)?;
    }
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(io_err)?;
    file.write_all(block.as_bytes()).map_err(io_err)?;
    log::info!("log appended to {}", path.display());
    Ok(())
}
