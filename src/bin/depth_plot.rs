use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use depthplot::plot::{self, PlotRequest, DEFAULT_INPUT, DEFAULT_WINDOW_DAYS};
use depthplot::{ChartStyle, IngestConfig, PngRenderer};

#[derive(Parser, Debug)]
#[command(name = "depth-plot")]
#[command(about = "Plot depth data with optional rolling average.")]
struct Args {
    /// CSV file with depth statistics over time
    #[arg(default_value = DEFAULT_INPUT)]
    filename: PathBuf,

    /// Optional csv file with x-axis labels
    #[arg(long)]
    labels: Option<PathBuf>,

    /// Number of days for the rolling average window. Set to 0 to disable rolling average.
    #[arg(long, default_value_t = DEFAULT_WINDOW_DAYS)]
    rolling: u32,

    /// Do not show the raw daily scatter points
    #[arg(long)]
    hide_scatter: bool,

    /// JSON file overriding chart style defaults
    #[arg(long)]
    style: Option<PathBuf>,

    /// Field delimiter of the input files
    #[arg(long, default_value_t = ',')]
    delimiter: char,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if !args.delimiter.is_ascii() {
        anyhow::bail!("delimiter must be a single ASCII character, got {:?}", args.delimiter);
    }

    let style = match &args.style {
        Some(path) => ChartStyle::from_json_file(path)
            .with_context(|| format!("load style {}", path.display()))?,
        None => ChartStyle::default(),
    };

    let request = PlotRequest {
        input: args.filename,
        labels: args.labels,
        window_days: args.rolling,
        show_scatter: !args.hide_scatter,
        ingest: IngestConfig {
            delimiter: args.delimiter as u8,
            ..IngestConfig::default()
        },
    };
    info!(
        "input={} labels={:?} rolling={}d scatter={}",
        request.input.display(),
        request.labels,
        request.window_days,
        request.show_scatter
    );

    let renderer = PngRenderer::new(style.clone());
    let outcome = plot::run(&request, &style, &renderer)
        .with_context(|| format!("plot {}", request.input.display()))?;

    println!("Plot saved to {}", outcome.output.display());
    Ok(())
}
