//! Order-book depth time series: ingestion, time-windowed rolling
//! averages, and annotated charts.
//!
//! Samples are loaded once into a timestamp-ordered [`SeriesStore`], the
//! [`RollingAggregator`] folds them into trailing averages over an elapsed
//! time window, and the chart layer overlays raw ratios, the rolling line
//! and the labels that fall inside the plotted range.

pub mod chart;
pub mod error;
pub mod labels;
pub mod plot;
pub mod record;
#[cfg(feature = "render")]
pub mod render;
pub mod rolling;
pub mod series;

pub use chart::{Chart, ChartOptions, ChartRenderer, ChartStyle};
pub use error::{Error, Result};
pub use labels::{LabelAligner, VisibleRange};
pub use plot::{PlotOutcome, PlotRequest};
pub use record::{Label, RecordParser, Sample, Timestamp};
#[cfg(feature = "render")]
pub use render::PngRenderer;
pub use rolling::{rolling_average, RollingAggregator, RollingPoint};
pub use series::{IngestConfig, Series, SeriesStore};
