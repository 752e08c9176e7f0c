//! One-shot pipeline: load, aggregate, lay out, render.

use std::path::PathBuf;

use log::info;

use crate::chart::{output_path, prefix_for, Chart, ChartOptions, ChartRenderer, ChartStyle};
use crate::error::Result;
use crate::rolling::rolling_average;
use crate::series::{IngestConfig, SeriesStore};

pub const DEFAULT_INPUT: &str = "results.csv";
pub const DEFAULT_WINDOW_DAYS: u32 = 30;

#[derive(Debug, Clone)]
pub struct PlotRequest {
    pub input: PathBuf,
    pub labels: Option<PathBuf>,
    /// Rolling window in days; 0 disables aggregation.
    pub window_days: u32,
    pub show_scatter: bool,
    pub ingest: IngestConfig,
}

impl Default for PlotRequest {
    fn default() -> Self {
        Self {
            input: PathBuf::from(DEFAULT_INPUT),
            labels: None,
            window_days: DEFAULT_WINDOW_DAYS,
            show_scatter: true,
            ingest: IngestConfig::default(),
        }
    }
}

impl PlotRequest {
    pub fn prefix(&self) -> PathBuf {
        prefix_for(&self.input)
    }

    pub fn output_path(&self) -> PathBuf {
        output_path(&self.prefix(), self.window_days)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlotOutcome {
    pub output: PathBuf,
    pub samples: usize,
    /// `None` when aggregation was disabled.
    pub rolling_points: Option<usize>,
    pub labels_drawn: usize,
}

/// Load the inputs and lay out the chart without drawing it.
pub fn prepare(request: &PlotRequest, style: &ChartStyle) -> Result<(SeriesStore, Chart)> {
    let store = SeriesStore::load(&request.input, request.labels.as_deref(), &request.ingest)?;
    let rolling = rolling_average(store.samples(), request.window_days);
    let options = ChartOptions {
        show_scatter: request.show_scatter,
        window_days: request.window_days,
    };
    let chart = Chart::build(&store, rolling.as_deref(), &request.prefix(), options, style);
    Ok((store, chart))
}

/// Run the whole pipeline and write the chart with `renderer`.
pub fn run<R>(request: &PlotRequest, style: &ChartStyle, renderer: &R) -> Result<PlotOutcome>
where
    R: ChartRenderer + ?Sized,
{
    let (store, chart) = prepare(request, style)?;
    let output = request.output_path();
    renderer.render(&chart, &output)?;

    let outcome = PlotOutcome {
        output,
        samples: store.samples().len(),
        rolling_points: chart.line.as_ref().map(|line| line.points.len()),
        labels_drawn: chart.markers.len(),
    };
    info!(
        "plotted {} samples ({:?} rolling points, {} labels) to {}",
        outcome.samples,
        outcome.rolling_points,
        outcome.labels_drawn,
        outcome.output.display()
    );
    Ok(outcome)
}
