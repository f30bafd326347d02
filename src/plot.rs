//! Two stacked, time-aligned panels (voltage above, current below), one line per channel.

use std::fs;
use std::ops::Range;
use std::path::Path;

use plotters::coord::Shift;
use plotters::prelude::*;

use crate::{
    error::OutputError,
    sequencer::{ChannelTrace, Recording},
};

pub const PLOT_SIZE: (u32, u32) = (1200, 1000);
pub const PLOT_TITLE: &str = "DP2031 Power On Sequence - Voltage & Current";

#[derive(Debug, Clone, Copy)]
enum Quantity {
    Voltage,
    Current,
}

impl Quantity {
    fn samples(self, trace: &ChannelTrace) -> &[f64] {
        match self {
            Quantity::Voltage => &trace.voltage,
            Quantity::Current => &trace.current,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Quantity::Voltage => "Voltage",
            Quantity::Current => "Current",
        }
    }

    fn axis_label(self) -> &'static str {
        match self {
            Quantity::Voltage => "Voltage (V)",
            Quantity::Current => "Current (A)",
        }
    }
}

fn plot_err(err: impl core::fmt::Display) -> OutputError {
    OutputError::Plot(err.to_string())
}

/// Axis range covering every finite value with 5% headroom either side.
pub fn span(values: impl IntoIterator<Item = f64>) -> Range<f64> {
    let (lo, hi) = values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    if !lo.is_finite() {
        return 0.0..1.0;
    }
    let pad = if hi > lo {
        (hi - lo) * 0.05
    } else {
        lo.abs().max(1.0) * 0.05
    };
    (lo - pad)..(hi + pad)
}

/// Render the recording as an SVG chart at `path`.
pub fn render_plot(path: &Path, recording: &Recording) -> Result<(), OutputError> {
    if recording.is_empty() {
        return Err(OutputError::NoData);
    }
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(|source| OutputError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let root = SVGBackend::new(path, PLOT_SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;
    let panels = root.split_evenly((2, 1));
    let time_axis = span(recording.timestamps.iter().copied());

    draw_panel(
        &panels[0],
        recording,
        time_axis.clone(),
        Quantity::Voltage,
        Some(PLOT_TITLE),
    )?;
    draw_panel(&panels[1], recording, time_axis, Quantity::Current, None)?;

    root.present().map_err(plot_err)?;
    log::info!("plot saved to {}", path.display());
    Ok(())
}

/// Open a saved plot in the system's default viewer. Returns once the viewer is launched.
pub fn show_plot(path: &Path) -> Result<(), OutputError> {
    if !path.is_file() {
        return Err(OutputError::Io {
            path: path.to_path_buf(),
            source: std::io::ErrorKind::NotFound.into(),
        });
    }
    opener::open(path).map_err(|source| OutputError::Open {
        path: path.to_path_buf(),
        source,
    })
}

fn draw_panel(
    area: &DrawingArea<SVGBackend<'_>, Shift>,
    recording: &Recording,
    time_axis: Range<f64>,
    quantity: Quantity,
    title: Option<&str>,
) -> Result<(), OutputError> {
    let traces: Vec<&ChannelTrace> = recording
        .channels
        .iter()
        .filter(|trace| !quantity.samples(trace).is_empty())
        .collect();
    let value_axis = span(
        traces
            .iter()
            .copied()
            .flat_map(|trace| quantity.samples(trace).iter().copied()),
    );

    let mut builder = ChartBuilder::on(area);
    builder.margin(15).x_label_area_size(40).y_label_area_size(70);
    if let Some(title) = title {
        builder.caption(title, ("sans-serif", 24));
    }
    let mut chart = builder
        .build_cartesian_2d(time_axis, value_axis)
        .map_err(plot_err)?;

    chart
        .configure_mesh()
        .x_desc("Time (s)")
        .y_desc(quantity.axis_label())
        .draw()
        .map_err(plot_err)?;

    for (idx, trace) in traces.iter().enumerate() {
        let color = Palette99::pick(idx).to_rgba();
        let points = recording
            .timestamps
            .iter()
            .copied()
            .zip(quantity.samples(trace).iter().copied());
        chart
            .draw_series(LineSeries::new(points, color.stroke_width(2)))
            .map_err(plot_err)?
            .label(format!("{} {}", trace.channel, quantity.name()))
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
    }

    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()
        .map_err(plot_err)?;
    Ok(())
}
