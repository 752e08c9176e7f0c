//! PNG export of a laid-out [`Chart`].

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use ab_glyph::FontRef;
use log::{debug, info, warn};
use plotters::prelude::*;
use plotters::style::{register_font, FontDesc, FontFamily, FontStyle};
use time::macros::format_description;

use crate::chart::{from_axis, Chart, ChartRenderer, ChartStyle};
use crate::error::{Error, Result};

const FONT_FAMILY: &str = "depthplot-sans";
const LEGEND_SWATCH_PX: i32 = 20;

/// Raster renderer backed by `plotters`' bitmap backend.
#[derive(Debug, Clone, Default)]
pub struct PngRenderer {
    style: ChartStyle,
}

impl PngRenderer {
    pub fn new(style: ChartStyle) -> Self {
        Self { style }
    }

    pub fn style(&self) -> &ChartStyle {
        &self.style
    }

    fn font(&self, size_pt: f64) -> FontDesc<'static> {
        FontDesc::new(
            FontFamily::Name(FONT_FAMILY),
            size_pt * self.style.px_per_pt(),
            FontStyle::Normal,
        )
    }

    fn px(&self, size_pt: f64) -> u32 {
        (size_pt * self.style.px_per_pt()).round().max(1.0) as u32
    }

    /// Marker area in points^2 to a circle radius in pixels.
    fn marker_radius(&self, area_pt2: f64) -> u32 {
        (area_pt2.max(0.0).sqrt() * 0.5 * self.style.px_per_pt())
            .round()
            .max(1.0) as u32
    }
}

impl ChartRenderer for PngRenderer {
    fn render(&self, chart: &Chart, path: &Path) -> Result<()> {
        let has_font = ensure_font(&self.style.font_paths);
        if !has_font {
            warn!("no readable font in {:?}; rendering without text", self.style.font_paths);
        }

        let style = &self.style;
        let (width, height) = style.pixel_size();
        debug!("rendering {}x{} px to {}", width, height, path.display());

        let root = BitMapBackend::new(path, (width, height)).into_drawing_area();
        root.fill(&WHITE).map_err(render_err)?;

        let axis_color = rgb(style.axis_color);
        let (x0, x1) = chart.x_bounds;
        let (y0, y1) = chart.y_bounds;

        let mut builder = ChartBuilder::on(&root);
        builder.margin(self.px(8.0));
        if has_font {
            builder
                .caption(&chart.title, self.font(style.title_font_size))
                .x_label_area_size(self.px(48.0))
                .y_label_area_size(self.px(40.0));
        }
        let mut ctx = builder
            .build_cartesian_2d(x0..x1, y0..y1)
            .map_err(render_err)?;

        let day_label = |x: &f64| format_day(*x);
        let mut mesh = ctx.configure_mesh();
        mesh.disable_x_mesh()
            .bold_line_style(axis_color.mix(0.3).stroke_width(1))
            .light_line_style(TRANSPARENT)
            .axis_style(axis_color);
        if has_font {
            mesh.x_labels(10)
                .y_labels(10)
                .x_label_formatter(&day_label)
                .x_label_style(self.font(style.tick_font_size).color(&axis_color))
                .y_label_style(self.font(style.tick_font_size).color(&axis_color))
                .y_desc(chart.y_desc.as_str())
                .axis_desc_style(self.font(style.legend_font_size).color(&axis_color));
        } else {
            mesh.x_labels(0).y_labels(0);
        }
        mesh.draw().map_err(render_err)?;

        let mut has_legend = false;

        if let Some(scatter) = &chart.scatter {
            let radius = self.marker_radius(scatter.point_size);
            let shape = rgb(style.raw_color).mix(scatter.opacity).filled();
            let anno = ctx
                .draw_series(
                    scatter
                        .points
                        .iter()
                        .map(|&(x, y)| Circle::new((x, y), radius, shape)),
                )
                .map_err(render_err)?;
            if let (Some(legend), true) = (&scatter.legend, has_font) {
                anno.label(legend.as_str())
                    .legend(move |(x, y)| Circle::new((x + LEGEND_SWATCH_PX / 2, y), radius, shape));
                has_legend = true;
            }
        }

        if let Some(line) = &chart.line {
            let stroke = rgb(style.rolling_color).stroke_width(self.px(line.width));
            let anno = ctx
                .draw_series(LineSeries::new(line.points.iter().copied(), stroke))
                .map_err(render_err)?;
            if has_font {
                anno.label(line.legend.as_str()).legend(move |(x, y)| {
                    PathElement::new(vec![(x, y), (x + LEGEND_SWATCH_PX, y)], stroke)
                });
                has_legend = true;
            }
        }

        let marker_stroke = rgb(style.marker_color).mix(0.7).stroke_width(self.px(1.0));
        let text_y = y1 - 0.001 * (y1 - y0);
        for marker in &chart.markers {
            ctx.draw_series(LineSeries::new(
                vec![(marker.x, y0), (marker.x, y1)],
                marker_stroke,
            ))
            .map_err(render_err)?;
            if has_font {
                let text_style = self
                    .font(style.label_font_size)
                    .color(&rgb(style.label_color));
                ctx.draw_series(std::iter::once(Text::new(
                    marker.text.clone(),
                    (marker.x, text_y),
                    text_style,
                )))
                .map_err(render_err)?;
            }
        }

        if has_legend {
            ctx.configure_series_labels()
                .position(SeriesLabelPosition::UpperRight)
                .background_style(WHITE.mix(0.8))
                .border_style(axis_color.mix(0.3))
                .label_font(self.font(style.legend_font_size))
                .draw()
                .map_err(render_err)?;
        }

        root.present().map_err(render_err)?;
        info!(
            "rendered {} markers, scatter={} line={} to {}",
            chart.markers.len(),
            chart.scatter.is_some(),
            chart.line.is_some(),
            path.display()
        );
        Ok(())
    }
}

/// Register the first usable font once per process.
///
/// Registration is process-wide: only the font list of the first renderer
/// that draws text is consulted, later styles reuse that outcome.
fn ensure_font(paths: &[PathBuf]) -> bool {
    static REGISTERED: OnceLock<bool> = OnceLock::new();
    *REGISTERED.get_or_init(|| paths.iter().any(|path| register_font_file(path)))
}

fn register_font_file(path: &Path) -> bool {
    let Ok(bytes) = fs::read(path) else {
        return false;
    };
    if FontRef::try_from_slice(&bytes).is_err() {
        warn!("unusable font {}", path.display());
        return false;
    }
    // The font table keeps a `'static` reference for the process lifetime.
    let bytes: &'static [u8] = Box::leak(bytes.into_boxed_slice());
    match register_font(FONT_FAMILY, FontStyle::Normal, bytes) {
        Ok(()) => {
            debug!("using font {}", path.display());
            true
        }
        Err(_) => {
            warn!("unusable font {}", path.display());
            false
        }
    }
}

fn format_day(x: f64) -> String {
    from_axis(x)
        .date()
        .format(format_description!("[year]-[month]-[day]"))
        .unwrap_or_default()
}

fn rgb([r, g, b]: [u8; 3]) -> RGBColor {
    RGBColor(r, g, b)
}

fn render_err<E: std::fmt::Display>(err: E) -> Error {
    Error::Render(err.to_string())
}
