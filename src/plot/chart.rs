//! Trend charts rendered to PNG with Plotters' bitmap backend.
//!
//! A chart is one or more panels; each panel draws its series as solid lines
//! and, for series longer than the trend window, a lighter dashed centered
//! rolling-mean line on top. The x axis is a decimal year so the same code
//! works for any sampling frequency.

use std::fs::create_dir_all;
use std::path::Path;

use chrono::{Datelike, NaiveDate};
use plotters::coord::Shift;
use plotters::element::DashedPathElement;
use plotters::prelude::*;
use thiserror::Error;

use crate::error::{AppError, ErrorKind};
use crate::plot::centered_rolling_mean;

/// Errors that can occur during chart rendering.
#[derive(Error, Debug)]
pub enum PlotError {
    #[error("Failed to create drawing area: {0}")]
    DrawingArea(String),

    #[error("Failed to configure chart: {0}")]
    ChartConfig(String),

    #[error("Failed to draw chart elements: {0}")]
    Drawing(String),

    #[error("Failed to prepare chart output: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid chart data: {0}")]
    InvalidData(String),
}

impl From<PlotError> for AppError {
    fn from(e: PlotError) -> Self {
        AppError::new(ErrorKind::Render, e.to_string())
    }
}

type Result<T> = core::result::Result<T, PlotError>;

const PALETTE: [RGBColor; 7] = [
    RGBColor(0x1f, 0x77, 0xb4),
    RGBColor(0xff, 0x7f, 0x0e),
    RGBColor(0x2c, 0xa0, 0x2c),
    RGBColor(0xd6, 0x27, 0x28),
    RGBColor(0x94, 0x67, 0xbd),
    RGBColor(0x8c, 0x56, 0x4b),
    RGBColor(0xe3, 0x77, 0xc2),
];

const SINGLE_SIZE: (u32, u32) = (1500, 1000);
const GRID_SIZE: (u32, u32) = (1600, 1200);

/// One plotted series.
#[derive(Debug, Clone)]
pub struct SeriesLine {
    pub label: String,
    pub points: Vec<(NaiveDate, Option<f64>)>,
}

impl SeriesLine {
    fn valid_len(&self) -> usize {
        self.points.iter().filter(|(_, v)| v.is_some()).count()
    }

    /// Rows are counted whether or not their value is missing.
    fn has_trend(&self, window: usize) -> bool {
        self.points.len() > window
    }
}

#[derive(Debug, Clone)]
pub struct Panel {
    pub title: String,
    pub lines: Vec<SeriesLine>,
}

/// A render-only chart description; all data prep happens before `render_chart`.
#[derive(Debug, Clone)]
pub struct ChartSpec {
    pub title: String,
    pub y_label: String,
    pub panels: Vec<Panel>,
    /// Rolling-mean window; series with at most this many points get no overlay.
    pub trend_window: usize,
}

impl ChartSpec {
    /// `(rows, cols)` of the panel grid.
    pub fn grid(&self) -> (usize, usize) {
        match self.panels.len() {
            0 | 1 => (1, 1),
            n => (n.div_ceil(2), 2),
        }
    }
}

/// Render `spec` to a PNG at `output_path`.
pub fn render_chart(spec: &ChartSpec, output_path: &Path) -> Result<()> {
    if spec.panels.iter().all(|p| p.lines.iter().all(|l| l.valid_len() == 0)) {
        return Err(PlotError::InvalidData("no observations to plot".to_string()));
    }
    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        create_dir_all(parent)?;
    }

    let single = spec.panels.len() == 1;
    let size = if single { SINGLE_SIZE } else { GRID_SIZE };

    let root = BitMapBackend::new(output_path, size).into_drawing_area();
    root.fill(&WHITE)
        .map_err(|e| PlotError::DrawingArea(e.to_string()))?;

    if single {
        draw_panel(&root, &spec.panels[0], &spec.title, spec, true)?;
    } else {
        let body = root
            .titled(&spec.title, ("sans-serif", 30))
            .map_err(|e| PlotError::DrawingArea(e.to_string()))?;
        let areas = body.split_evenly(spec.grid());
        for (area, panel) in areas.iter().zip(&spec.panels) {
            draw_panel(area, panel, &panel.title, spec, false)?;
        }
    }

    root.present()
        .map_err(|e| PlotError::Drawing(e.to_string()))?;
    Ok(())
}

fn draw_panel(
    area: &DrawingArea<BitMapBackend<'_>, Shift>,
    panel: &Panel,
    caption: &str,
    spec: &ChartSpec,
    label_trends: bool,
) -> Result<()> {
    let Some(((x0, x1), (y0, y1))) = panel_bounds(panel) else {
        // Nothing fetched for this panel; leave the cell blank.
        return Ok(());
    };

    let caption_size = if label_trends { 24 } else { 18 };
    let mut chart = ChartBuilder::on(area)
        .caption(caption, ("sans-serif", caption_size))
        .margin(15)
        .set_label_area_size(LabelAreaPosition::Left, 60)
        .set_label_area_size(LabelAreaPosition::Bottom, 45)
        .build_cartesian_2d(x0..x1, y0..y1)
        .map_err(|e| PlotError::ChartConfig(e.to_string()))?;

    chart
        .configure_mesh()
        .x_desc("Date")
        .y_desc(&spec.y_label)
        .x_labels(8)
        .y_labels(8)
        .x_label_formatter(&|v| format_year_month(*v))
        .y_label_formatter(&|v| format!("{v:.1}"))
        .light_line_style(BLACK.mix(0.05))
        .draw()
        .map_err(|e| PlotError::Drawing(e.to_string()))?;

    for (i, line) in panel.lines.iter().enumerate() {
        let color = PALETTE[i % PALETTE.len()];
        let line_style = color.mix(0.8).stroke_width(2);
        let xy: Vec<(f64, Option<f64>)> = line.points.iter().map(|(d, v)| (decimal_year(*d), *v)).collect();

        for (k, seg) in segments(&xy).into_iter().enumerate() {
            let anno = chart
                .draw_series(LineSeries::new(seg, line_style))
                .map_err(|e| PlotError::Drawing(e.to_string()))?;
            if k == 0 {
                anno.label(line.label.clone())
                    .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], line_style));
            }
        }

        if !line.has_trend(spec.trend_window) {
            continue;
        }
        let values: Vec<Option<f64>> = xy.iter().map(|(_, v)| *v).collect();
        let trend: Vec<(f64, Option<f64>)> = xy
            .iter()
            .zip(centered_rolling_mean(&values, spec.trend_window))
            .map(|((x, _), t)| (*x, t))
            .collect();
        let trend_style = color.mix(0.6).stroke_width(1);

        for (k, seg) in segments(&trend).into_iter().enumerate() {
            let anno = chart
                .draw_series(DashedLineSeries::new(seg, 8, 5, trend_style))
                .map_err(|e| PlotError::Drawing(e.to_string()))?;
            if k == 0 && label_trends {
                anno.label(format!("{} ({}-month trend)", line.label, spec.trend_window))
                    .legend(move |(x, y)| DashedPathElement::new(vec![(x, y), (x + 20, y)], 4, 3, trend_style));
            }
        }
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .background_style(WHITE.mix(0.85))
        .border_style(BLACK.mix(0.3))
        .label_font(("sans-serif", if label_trends { 14 } else { 12 }))
        .draw()
        .map_err(|e| PlotError::Drawing(e.to_string()))?;

    Ok(())
}

/// `((x0, x1), (y0, y1))` covering every valid point of the panel, padded.
fn panel_bounds(panel: &Panel) -> Option<((f64, f64), (f64, f64))> {
    let mut x = (f64::INFINITY, f64::NEG_INFINITY);
    let mut y = (f64::INFINITY, f64::NEG_INFINITY);
    for line in &panel.lines {
        for (d, v) in &line.points {
            let Some(v) = v else { continue };
            let t = decimal_year(*d);
            x = (x.0.min(t), x.1.max(t));
            y = (y.0.min(*v), y.1.max(*v));
        }
    }
    if !x.0.is_finite() {
        return None;
    }

    if x.1 - x.0 < 1e-9 {
        x = (x.0 - 0.5, x.1 + 0.5);
    }
    let pad = ((y.1 - y.0) * 0.05).max(0.5);
    Some((x, (y.0 - pad, y.1 + pad)))
}

/// Split a line at missing values into drawable runs.
fn segments(points: &[(f64, Option<f64>)]) -> Vec<Vec<(f64, f64)>> {
    let mut out = Vec::new();
    let mut current = Vec::new();
    for (x, v) in points {
        match v {
            Some(y) => current.push((*x, *y)),
            None if !current.is_empty() => out.push(std::mem::take(&mut current)),
            None => {}
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

fn decimal_year(d: NaiveDate) -> f64 {
    f64::from(d.year()) + f64::from(d.ordinal0()) / days_in_year(d.year())
}

fn days_in_year(year: i32) -> f64 {
    if NaiveDate::from_ymd_opt(year, 2, 29).is_some() { 366.0 } else { 365.0 }
}

/// Inverse of `decimal_year`, formatted as `YYYY-MM` for axis ticks.
fn format_year_month(v: f64) -> String {
    let year = v.floor() as i32;
    let days = days_in_year(year);
    let ordinal0 = ((v - f64::from(year)) * days).round().clamp(0.0, days - 1.0) as u32;
    NaiveDate::from_yo_opt(year, ordinal0 + 1)
        .map(|d| d.format("%Y-%m").to_string())
        .unwrap_or_else(|| format!("{v:.1}"))
}
