//! Chart layout.
//!
//! Turns the ordered series into plain drawing layers: scatter points, the
//! rolling line, label markers and the resolved axis ranges. Rendering
//! backends only read a [`Chart`]; they never see the store.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use time::macros::datetime;
use time::Duration;

use crate::error::{Error, Result};
use crate::labels::{LabelAligner, VisibleRange};
use crate::record::Timestamp;
use crate::rolling::RollingPoint;
use crate::series::SeriesStore;

const AXIS_EPOCH: Timestamp = datetime!(1970-01-01 0:00);
const SECONDS_PER_DAY: f64 = 86_400.0;

pub const RAW_LEGEND: &str = "Book Exit Depth";
pub const Y_AXIS_DESC: &str = "depth";

/// Presentation settings. Loadable from JSON; missing keys keep defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartStyle {
    /// Figure size in inches (width, height).
    /// Default: 12 x 7
    pub figure_size: (f64, f64),
    /// Pixels per inch of the exported image.
    /// Default: 300
    pub dpi: u32,
    /// Fraction of the data span added on each side of both axes.
    /// Default: 0.05
    pub margin: f64,
    /// Scatter marker area in points^2.
    pub dot_size: f64,
    pub small_dot_size: f64,
    /// Marker areas used once a series has `dense_threshold` samples.
    pub dense_dot_size: f64,
    pub dense_small_dot_size: f64,
    pub dense_threshold: usize,
    /// Rolling line width in points.
    pub line_width: f64,
    /// Scatter opacity while a rolling line is drawn on top.
    pub faded_opacity: f64,
    pub raw_color: [u8; 3],
    pub rolling_color: [u8; 3],
    pub axis_color: [u8; 3],
    pub marker_color: [u8; 3],
    pub label_color: [u8; 3],
    /// Font sizes in points.
    pub title_font_size: f64,
    pub tick_font_size: f64,
    pub legend_font_size: f64,
    pub label_font_size: f64,
    /// TrueType fonts tried in order; the first readable one is used.
    pub font_paths: Vec<PathBuf>,
}

impl Default for ChartStyle {
    fn default() -> Self {
        Self {
            figure_size: (12.0, 7.0),
            dpi: 300,
            margin: 0.05,
            dot_size: 20.0,
            small_dot_size: 4.0,
            dense_dot_size: 10.0,
            dense_small_dot_size: 3.0,
            dense_threshold: 100,
            line_width: 1.8,
            faded_opacity: 0.4,
            raw_color: [0, 0, 255],
            rolling_color: [0, 0, 139],
            axis_color: [0, 0, 0],
            marker_color: [211, 211, 211],
            label_color: [128, 128, 128],
            title_font_size: 12.0,
            tick_font_size: 8.0,
            legend_font_size: 9.0,
            label_font_size: 4.0,
            font_paths: [
                "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
                "/usr/share/fonts/dejavu/DejaVuSans.ttf",
                "/usr/share/fonts/TTF/DejaVuSans.ttf",
                "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
                "/usr/share/fonts/liberation-sans/LiberationSans-Regular.ttf",
                "/System/Library/Fonts/Supplemental/Arial.ttf",
                "/Library/Fonts/Arial.ttf",
                "C:\\Windows\\Fonts\\arial.ttf",
            ]
            .iter()
            .map(PathBuf::from)
            .collect(),
        }
    }
}

impl ChartStyle {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let data = fs::read(path).map_err(|source| Error::MissingFile {
            path: path.to_path_buf(),
            source,
        })?;
        let style: ChartStyle = serde_json::from_slice(&data)
            .map_err(|err| Error::Config(format!("{}: {err}", path.display())))?;
        style.validate()?;
        Ok(style)
    }

    pub fn validate(&self) -> Result<()> {
        let (w, h) = self.figure_size;
        if !(w > 0.0 && h > 0.0) {
            return Err(Error::Config(format!("figure_size must be positive, got {w}x{h}")));
        }
        if self.dpi == 0 {
            return Err(Error::Config("dpi must be positive".to_string()));
        }
        if !(0.0..0.5).contains(&self.margin) {
            return Err(Error::Config(format!("margin must be in [0, 0.5), got {}", self.margin)));
        }
        if !(0.0..=1.0).contains(&self.faded_opacity) {
            return Err(Error::Config(format!(
                "faded_opacity must be in [0, 1], got {}",
                self.faded_opacity
            )));
        }
        Ok(())
    }

    /// Canvas size in pixels.
    pub fn pixel_size(&self) -> (u32, u32) {
        let dpi = f64::from(self.dpi);
        let (w, h) = self.figure_size;
        ((w * dpi).round() as u32, (h * dpi).round() as u32)
    }

    /// Pixels per typographic point.
    pub fn px_per_pt(&self) -> f64 {
        f64::from(self.dpi) / 72.0
    }
}

/// Per-invocation presentation switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChartOptions {
    pub show_scatter: bool,
    /// Rolling window in days, 0 when aggregation is disabled.
    pub window_days: u32,
}

impl Default for ChartOptions {
    fn default() -> Self {
        Self {
            show_scatter: true,
            window_days: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScatterLayer {
    /// `(days since 1970-01-01, ratio)`.
    pub points: Vec<(f64, f64)>,
    /// Marker area in points^2.
    pub point_size: f64,
    pub opacity: f64,
    pub legend: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineLayer {
    pub points: Vec<(f64, f64)>,
    /// Width in points.
    pub width: f64,
    pub legend: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub x: f64,
    pub text: String,
}

/// Everything a renderer needs to draw one chart.
#[derive(Debug, Clone, PartialEq)]
pub struct Chart {
    pub title: String,
    pub y_desc: String,
    pub visible: VisibleRange,
    pub x_bounds: (f64, f64),
    pub y_bounds: (f64, f64),
    pub scatter: Option<ScatterLayer>,
    pub line: Option<LineLayer>,
    pub markers: Vec<Marker>,
}

impl Chart {
    /// Lay out the raw ratios, the optional rolling series and the labels
    /// that fall inside the resolved x range.
    pub fn build(
        store: &SeriesStore,
        rolling: Option<&[RollingPoint]>,
        prefix: &Path,
        options: ChartOptions,
        style: &ChartStyle,
    ) -> Self {
        let plot_rolling = rolling.is_some() && options.window_days >= 1;
        let dense = store.samples().len() >= style.dense_threshold;
        let (dot, small_dot) = if dense {
            (style.dense_dot_size, style.dense_small_dot_size)
        } else {
            (style.dot_size, style.small_dot_size)
        };

        let scatter = options.show_scatter.then(|| ScatterLayer {
            points: store
                .ratios()
                .into_iter()
                .map(|(ts, ratio)| (to_axis(ts), ratio))
                .collect(),
            point_size: if plot_rolling { small_dot * 1.5 } else { dot },
            opacity: if plot_rolling { style.faded_opacity } else { 1.0 },
            legend: (!plot_rolling).then(|| RAW_LEGEND.to_string()),
        });

        let line = rolling.filter(|_| plot_rolling).map(|points| LineLayer {
            points: points
                .iter()
                .map(|p| (to_axis(p.timestamp), p.average))
                .collect(),
            width: style.line_width,
            legend: format!("{RAW_LEGEND} ({}-day avg)", options.window_days),
        });

        let mut timestamps: Vec<Timestamp> = Vec::new();
        let mut values: Vec<f64> = Vec::new();
        if scatter.is_some() {
            for sample in store.samples() {
                timestamps.push(sample.timestamp);
                values.push(sample.ratio());
            }
        }
        if let (Some(points), true) = (rolling, plot_rolling) {
            for point in points {
                timestamps.push(point.timestamp);
                values.push(point.average);
            }
        }

        let visible = resolve_visible_range(&timestamps, style.margin);
        let markers = LabelAligner::new(visible)
            .align(store.labels())
            .iter()
            .map(|label| Marker {
                x: to_axis(label.timestamp),
                text: format!(" {}", label.text),
            })
            .collect();

        Chart {
            title: format!("Engine Depth Statistics for {}.csv", prefix.display()),
            y_desc: Y_AXIS_DESC.to_string(),
            visible,
            x_bounds: (to_axis(visible.start), to_axis(visible.end)),
            y_bounds: resolve_value_bounds(&values, style.margin),
            scatter,
            line,
            markers,
        }
    }
}

/// Span of `timestamps` padded by `margin` of the span on each side.
///
/// A single instant pads by one day on each side; no data resolves to the
/// first day of the axis epoch.
pub fn resolve_visible_range(timestamps: &[Timestamp], margin: f64) -> VisibleRange {
    let (Some(&min), Some(&max)) = (timestamps.iter().min(), timestamps.iter().max()) else {
        return VisibleRange::new(AXIS_EPOCH, AXIS_EPOCH + Duration::days(1));
    };
    let span = max - min;
    let pad = if span.is_zero() {
        Duration::days(1)
    } else {
        span * margin
    };
    VisibleRange::new(saturating_add(min, -pad), saturating_add(max, pad))
}

/// `ts + delta`, clamped to the representable timestamp range.
fn saturating_add(ts: Timestamp, delta: Duration) -> Timestamp {
    ts.checked_add(delta).unwrap_or(if delta.is_negative() {
        Timestamp::MIN
    } else {
        Timestamp::MAX
    })
}

pub fn resolve_value_bounds(values: &[f64], margin: f64) -> (f64, f64) {
    let mut iter = values.iter().copied().filter(|v| v.is_finite());
    let Some(first) = iter.next() else {
        return (0.0, 1.0);
    };
    let (min, max) = iter.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v)));
    let span = max - min;
    if span == 0.0 {
        return (min - 0.5, max + 0.5);
    }
    (min - span * margin, max + span * margin)
}

/// Axis coordinate: fractional days since 1970-01-01.
pub fn to_axis(ts: Timestamp) -> f64 {
    (ts - AXIS_EPOCH).as_seconds_f64() / SECONDS_PER_DAY
}

pub fn from_axis(x: f64) -> Timestamp {
    saturating_add(AXIS_EPOCH, Duration::seconds_f64(x * SECONDS_PER_DAY))
}

/// Draws a laid-out chart to a file.
pub trait ChartRenderer {
    fn render(&self, chart: &Chart, path: &Path) -> Result<()>;
}

/// `<prefix>.png`, or `<prefix>_d<D>.png` when a `D`-day window was applied.
pub fn output_path(prefix: &Path, window_days: u32) -> PathBuf {
    let mut name = prefix.as_os_str().to_os_string();
    if window_days >= 1 {
        name.push(format!("_d{window_days}"));
    }
    name.push(".png");
    PathBuf::from(name)
}

/// Input filename with its extension stripped.
pub fn prefix_for(input: &Path) -> PathBuf {
    input.with_extension("")
}
