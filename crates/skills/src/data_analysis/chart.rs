//! PNG chart rendering with `plotters` on an in-memory bitmap.
//!
//! Plotters draws into an RGB buffer; `image` encodes the buffer as PNG.
//! Missing and non-finite cells are never plotted.

use image::{ImageFormat, RgbImage};
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::io::Cursor;
use std::ops::Range;

use ai_agent_core::{Error, Result};

use super::table::{correlation, quantile, Column, DataTable};

const WIDTH: u32 = 1200;
const HEIGHT: u32 = 700;
const HISTOGRAM_BINS: usize = 30;
const MAX_PIE_SLICES: usize = 12;
/// Category ticks drawn on an axis at most.
const MAX_TICKS: usize = 20;
/// Values are pulled into this range so axis spans stay finite.
const AXIS_LIMIT: f64 = 1e300;
const FONT: &str = "sans-serif";

const PRIMARY: RGBColor = RGBColor(31, 119, 180);
const ACCENT: RGBColor = RGBColor(255, 127, 14);
const AXIS: RGBColor = RGBColor(60, 60, 60);

const PALETTE: [RGBColor; 10] = [
    RGBColor(31, 119, 180),
    RGBColor(255, 127, 14),
    RGBColor(44, 160, 44),
    RGBColor(214, 39, 40),
    RGBColor(148, 103, 189),
    RGBColor(140, 86, 75),
    RGBColor(227, 119, 194),
    RGBColor(127, 127, 127),
    RGBColor(188, 189, 34),
    RGBColor(23, 190, 207),
];

type Area<'a> = DrawingArea<BitMapBackend<'a>, Shift>;
type Drawn = std::result::Result<(), Box<dyn std::error::Error>>;

/// Supported chart kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    Bar,
    Line,
    Scatter,
    Histogram,
    Pie,
    Box,
    Heatmap,
}

impl ChartKind {
    pub fn parse(name: &str) -> Result<Self> {
        match name.trim().to_lowercase().as_str() {
            "bar" => Ok(Self::Bar),
            "line" => Ok(Self::Line),
            "scatter" => Ok(Self::Scatter),
            "histogram" => Ok(Self::Histogram),
            "pie" => Ok(Self::Pie),
            "box" => Ok(Self::Box),
            "heatmap" => Ok(Self::Heatmap),
            other => Err(Error::invalid_request(format!(
                "Chart type '{}' is not supported",
                other
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bar => "bar",
            Self::Line => "line",
            Self::Scatter => "scatter",
            Self::Histogram => "histogram",
            Self::Pie => "pie",
            Self::Box => "box",
            Self::Heatmap => "heatmap",
        }
    }
}

/// Columns resolved and validated for one chart.
pub struct ChartRequest<'a> {
    pub kind: ChartKind,
    pub x: Option<&'a Column>,
    pub y: Option<&'a Column>,
}

impl<'a> ChartRequest<'a> {
    /// Resolve column names and check the columns each kind needs.
    pub fn resolve(
        table: &'a DataTable,
        kind: ChartKind,
        x_col: Option<&str>,
        y_col: Option<&str>,
    ) -> Result<Self> {
        let lookup = |name: Option<&str>| -> Result<Option<&'a Column>> {
            match name.filter(|n| !n.is_empty()) {
                None => Ok(None),
                Some(n) => table
                    .column(n)
                    .map(Some)
                    .ok_or_else(|| Error::invalid_request(format!("Column '{}' does not exist", n))),
            }
        };
        let x = lookup(x_col)?;
        let y = lookup(y_col)?;

        let require_numeric = |col: &Column| -> Result<()> {
            if col.kind.is_numeric() {
                Ok(())
            } else {
                Err(Error::invalid_request(format!(
                    "Column '{}' must be numeric for a {} chart",
                    col.name,
                    kind.as_str()
                )))
            }
        };

        match kind {
            ChartKind::Bar | ChartKind::Line | ChartKind::Scatter => {
                let (Some(_), Some(y)) = (x, y) else {
                    return Err(Error::invalid_request(format!(
                        "x_col and y_col are required for a {} chart",
                        kind.as_str()
                    )));
                };
                require_numeric(y)?;
            }
            ChartKind::Histogram => {
                let Some(x) = x else {
                    return Err(Error::invalid_request("x_col is required for a histogram"));
                };
                require_numeric(x)?;
            }
            ChartKind::Pie => {
                if x.is_none() {
                    return Err(Error::invalid_request("x_col is required for a pie chart"));
                }
            }
            ChartKind::Box => {
                let Some(y) = y else {
                    return Err(Error::invalid_request("y_col is required for a box plot"));
                };
                require_numeric(y)?;
            }
            ChartKind::Heatmap => {
                if table.numeric_columns().is_empty() {
                    return Err(Error::invalid_request(
                        "No numeric columns available for a heatmap",
                    ));
                }
            }
        }

        Ok(Self { kind, x, y })
    }
}

/// Render the chart and encode it as PNG.
pub fn render_png(table: &DataTable, request: &ChartRequest<'_>, title: &str) -> Result<Vec<u8>> {
    let mut pixels = vec![0u8; (WIDTH * HEIGHT * 3) as usize];
    draw(&mut pixels, table, request, title)
        .map_err(|e| Error::tool_execution(format!("Failed to draw chart: {}", e)))?;

    let img = RgbImage::from_raw(WIDTH, HEIGHT, pixels)
        .ok_or_else(|| Error::tool_execution("Chart buffer does not match its size"))?;
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png)
        .map_err(|e| Error::tool_execution(format!("Failed to encode chart: {}", e)))?;
    Ok(buf.into_inner())
}

fn draw(pixels: &mut [u8], table: &DataTable, request: &ChartRequest<'_>, title: &str) -> Drawn {
    let root = BitMapBackend::with_buffer(pixels, (WIDTH, HEIGHT)).into_drawing_area();
    root.fill(&WHITE)?;
    match request.kind {
        ChartKind::Bar => bar(&root, title, request.x, request.y)?,
        ChartKind::Line => line(&root, title, request.x, request.y, true)?,
        ChartKind::Scatter => line(&root, title, request.x, request.y, false)?,
        ChartKind::Histogram => histogram(&root, title, request.x)?,
        ChartKind::Pie => pie(&root, title, request.x)?,
        ChartKind::Box => boxplot(&root, title, request.x, request.y)?,
        ChartKind::Heatmap => heatmap(&root, title, table)?,
    }
    root.present()?;
    Ok(())
}

fn finite(v: Option<f64>) -> Option<f64> {
    v.filter(|v| v.is_finite())
        .map(|v| v.clamp(-AXIS_LIMIT, AXIS_LIMIT))
}

/// Axis range covering `values` with 5% padding; constant data gets a
/// window around the value.
fn padded_range(values: impl Iterator<Item = f64>) -> Range<f64> {
    let (lo, hi) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    if lo > hi {
        return 0.0..1.0;
    }
    let scale = lo.abs().max(hi.abs());
    let pad = if hi - lo <= scale * 1e-9 {
        (scale * 0.05).max(1.0)
    } else {
        (hi - lo) * 0.05
    };
    (lo - pad)..(hi + pad)
}

/// Tick labels for row positions: the x column's cells, or the row index.
fn row_labels(x: Option<&Column>, len: usize) -> Vec<String> {
    (0..len)
        .map(|i| match x {
            Some(col) => col.display_value(i),
            None => i.to_string(),
        })
        .collect()
}

/// Label for an integer tick on a category axis; blank between categories.
fn category_tick(labels: &[String], v: f64) -> String {
    let idx = v.round();
    if (v - idx).abs() > 1e-6 || idx < 0.0 {
        return String::new();
    }
    labels.get(idx as usize).cloned().unwrap_or_default()
}

fn column_name(col: Option<&Column>) -> &str {
    col.map(|c| c.name.as_str()).unwrap_or("")
}

fn centered(size: u32) -> TextStyle<'static> {
    (FONT, size)
        .into_font()
        .color(&BLACK)
        .pos(Pos::new(HPos::Center, VPos::Center))
}

/// Title plus a notice, for columns with nothing to plot.
fn no_data(root: &Area, title: &str) -> Drawn {
    let body = root.titled(title, (FONT, 30))?;
    let (w, h) = body.dim_in_pixel();
    body.draw(&Text::new(
        "No data to plot",
        (w as i32 / 2, h as i32 / 2),
        centered(24),
    ))?;
    Ok(())
}

/// One bar per row, in row order.
fn bar(root: &Area, title: &str, x: Option<&Column>, y: Option<&Column>) -> Drawn {
    let Some(y) = y else { return no_data(root, title) };
    let bars: Vec<(f64, f64)> = y
        .numbers
        .iter()
        .enumerate()
        .filter_map(|(i, v)| finite(*v).map(|v| (i as f64, v)))
        .collect();
    if bars.is_empty() {
        return no_data(root, title);
    }

    let labels = row_labels(x, y.len());
    let span = y.len() as f64;
    let y_range = padded_range(bars.iter().map(|b| b.1).chain(std::iter::once(0.0)));
    let mut chart = ChartBuilder::on(root)
        .caption(title, (FONT, 30))
        .margin(20)
        .x_label_area_size(60)
        .y_label_area_size(90)
        .build_cartesian_2d(-0.5..span - 0.5, y_range)?;
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(labels.len().min(MAX_TICKS))
        .x_label_formatter(&|v| category_tick(&labels, *v))
        .x_desc(column_name(x))
        .y_desc(y.name.as_str())
        .draw()?;
    chart.draw_series(
        bars.iter()
            .map(|(i, v)| Rectangle::new([(i - 0.4, 0.0), (i + 0.4, *v)], PRIMARY.filled())),
    )?;
    Ok(())
}

/// Line or scatter of y against x. A text x column is plotted by row index
/// with its cells as tick labels.
fn line(
    root: &Area,
    title: &str,
    x: Option<&Column>,
    y: Option<&Column>,
    connect: bool,
) -> Drawn {
    let Some(y) = y else { return no_data(root, title) };
    let numeric_x = x.filter(|c| c.kind.is_numeric());
    let points: Vec<(f64, f64)> = (0..y.len())
        .filter_map(|i| {
            let px = match numeric_x {
                Some(col) => finite(col.numbers.get(i).copied().flatten())?,
                None => i as f64,
            };
            Some((px, finite(y.numbers.get(i).copied().flatten())?))
        })
        .collect();
    if points.is_empty() {
        return no_data(root, title);
    }

    let labels = row_labels(x, y.len());
    let mut chart = ChartBuilder::on(root)
        .caption(title, (FONT, 30))
        .margin(20)
        .x_label_area_size(60)
        .y_label_area_size(90)
        .build_cartesian_2d(
            padded_range(points.iter().map(|p| p.0)),
            padded_range(points.iter().map(|p| p.1)),
        )?;
    let by_row = |v: &f64| category_tick(&labels, *v);
    {
        let mut mesh = chart.configure_mesh();
        mesh.x_desc(column_name(x)).y_desc(y.name.as_str());
        if numeric_x.is_none() {
            mesh.x_labels(labels.len().min(MAX_TICKS))
                .x_label_formatter(&by_row);
        }
        mesh.draw()?;
    }

    if connect {
        chart.draw_series(LineSeries::new(points.iter().copied(), PRIMARY.stroke_width(2)))?;
        chart.draw_series(points.iter().map(|p| Circle::new(*p, 4, PRIMARY.filled())))?;
    } else {
        chart.draw_series(points.iter().map(|p| Circle::new(*p, 5, PRIMARY.mix(0.6).filled())))?;
    }
    Ok(())
}

fn histogram(root: &Area, title: &str, x: Option<&Column>) -> Drawn {
    let Some(x) = x else { return no_data(root, title) };
    let values: Vec<f64> = x.numbers.iter().filter_map(|v| finite(*v)).collect();
    if values.is_empty() {
        return no_data(root, title);
    }

    let (lo, hi) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(*v), hi.max(*v)));
    let (lo, hi) = if hi - lo > 0.0 { (lo, hi) } else { (lo - 0.5, hi + 0.5) };
    let width = (hi - lo) / HISTOGRAM_BINS as f64;
    let mut counts = vec![0u32; HISTOGRAM_BINS];
    for v in &values {
        let idx = (((v - lo) / width) as usize).min(HISTOGRAM_BINS - 1);
        counts[idx] += 1;
    }
    let peak = counts.iter().copied().max().unwrap_or(0) as f64;

    let mut chart = ChartBuilder::on(root)
        .caption(title, (FONT, 30))
        .margin(20)
        .x_label_area_size(60)
        .y_label_area_size(90)
        .build_cartesian_2d(lo..hi, 0.0..peak * 1.1)?;
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc(x.name.as_str())
        .y_desc("Frequency")
        .draw()?;
    chart.draw_series(counts.iter().enumerate().map(|(i, n)| {
        let left = lo + width * i as f64;
        Rectangle::new([(left, 0.0), (left + width, *n as f64)], PRIMARY.mix(0.8).filled())
    }))?;
    Ok(())
}

/// Value shares of a column; the tail beyond `MAX_PIE_SLICES - 1` values is
/// folded into "other".
fn pie(root: &Area, title: &str, x: Option<&Column>) -> Drawn {
    let Some(x) = x else { return no_data(root, title) };
    let mut counts = x.value_counts();
    if counts.len() > MAX_PIE_SLICES {
        let rest: usize = counts[MAX_PIE_SLICES - 1..].iter().map(|c| c.1).sum();
        counts.truncate(MAX_PIE_SLICES - 1);
        counts.push(("other".to_string(), rest));
    }
    if counts.is_empty() {
        return no_data(root, title);
    }

    let body = root.titled(title, (FONT, 30))?;
    let (w, h) = body.dim_in_pixel();
    let (left, top) = body.get_base_pixel();
    let center = (left + w as i32 / 2, top + h as i32 / 2);
    let radius = f64::from(w.min(h)) * 0.36;
    let sizes: Vec<f64> = counts.iter().map(|c| c.1 as f64).collect();
    let colors: Vec<RGBColor> = (0..counts.len()).map(|i| PALETTE[i % PALETTE.len()]).collect();
    let labels: Vec<&str> = counts.iter().map(|c| c.0.as_str()).collect();

    let mut wedges = Pie::new(&center, &radius, &sizes, &colors, &labels);
    wedges.start_angle(-90.0);
    wedges.label_style((FONT, 18).into_font().color(&BLACK));
    wedges.percentages((FONT, 16).into_font().color(&WHITE));
    body.draw(&wedges)?;
    Ok(())
}

/// Box plot of y, one box per x group in sorted order.
fn boxplot(root: &Area, title: &str, x: Option<&Column>, y: Option<&Column>) -> Drawn {
    let Some(y) = y else { return no_data(root, title) };

    let groups: Vec<(String, Vec<f64>)> = match x {
        Some(group_col) => {
            let mut keys: Vec<String> =
                group_col.value_counts().into_iter().map(|(k, _)| k).collect();
            keys.sort();
            keys.into_iter()
                .map(|key| {
                    let values = group_col
                        .values
                        .iter()
                        .zip(y.numbers.iter())
                        .filter(|(g, _)| g.as_deref() == Some(key.as_str()))
                        .filter_map(|(_, v)| finite(*v))
                        .collect();
                    (key, values)
                })
                .collect()
        }
        None => vec![(y.name.clone(), y.numbers.iter().filter_map(|v| finite(*v)).collect())],
    };
    let groups: Vec<(String, Vec<f64>)> = groups.into_iter().filter(|g| !g.1.is_empty()).collect();
    if groups.is_empty() {
        return no_data(root, title);
    }

    let labels: Vec<String> = groups.iter().map(|g| g.0.clone()).collect();
    let mut chart = ChartBuilder::on(root)
        .caption(title, (FONT, 30))
        .margin(20)
        .x_label_area_size(60)
        .y_label_area_size(90)
        .build_cartesian_2d(
            -0.5..groups.len() as f64 - 0.5,
            padded_range(groups.iter().flat_map(|g| g.1.iter().copied())),
        )?;
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(labels.len().min(MAX_TICKS))
        .x_label_formatter(&|v| category_tick(&labels, *v))
        .x_desc(column_name(x))
        .y_desc(y.name.as_str())
        .draw()?;

    for (i, (_, group)) in groups.iter().enumerate() {
        let mut sorted = group.clone();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let (q1, med, q3) = (
            quantile(&sorted, 0.25),
            quantile(&sorted, 0.5),
            quantile(&sorted, 0.75),
        );
        let iqr = q3 - q1;
        let (lo_fence, hi_fence) = (q1 - 1.5 * iqr, q3 + 1.5 * iqr);
        let whisker_lo = sorted.iter().copied().find(|v| *v >= lo_fence).unwrap_or(q1);
        let whisker_hi = sorted.iter().rev().copied().find(|v| *v <= hi_fence).unwrap_or(q3);

        let c = i as f64;
        chart.draw_series([
            Rectangle::new([(c - 0.25, q1), (c + 0.25, q3)], PRIMARY.mix(0.35).filled()),
            Rectangle::new([(c - 0.25, q1), (c + 0.25, q3)], AXIS.stroke_width(1)),
        ])?;
        chart.draw_series([
            PathElement::new(vec![(c - 0.25, med), (c + 0.25, med)], ACCENT.stroke_width(3)),
            PathElement::new(vec![(c, q1), (c, whisker_lo)], AXIS.stroke_width(1)),
            PathElement::new(vec![(c, q3), (c, whisker_hi)], AXIS.stroke_width(1)),
            PathElement::new(vec![(c - 0.12, whisker_lo), (c + 0.12, whisker_lo)], AXIS.stroke_width(1)),
            PathElement::new(vec![(c - 0.12, whisker_hi), (c + 0.12, whisker_hi)], AXIS.stroke_width(1)),
        ])?;
        chart.draw_series(
            sorted
                .iter()
                .filter(|v| **v < lo_fence || **v > hi_fence)
                .map(|v| Circle::new((c, *v), 3, AXIS.filled())),
        )?;
    }
    Ok(())
}

/// Correlation matrix of the numeric columns, each cell annotated with its
/// coefficient. The first column is the top row.
fn heatmap(root: &Area, title: &str, table: &DataTable) -> Drawn {
    let cols = table.numeric_columns();
    if cols.is_empty() {
        return no_data(root, title);
    }
    let n = cols.len();
    let names: Vec<String> = cols.iter().map(|c| c.name.clone()).collect();
    let rows: Vec<String> = names.iter().rev().cloned().collect();

    let side = (HEIGHT as i32 - 160).min(WIDTH as i32 - 240);
    let inset = (WIDTH as i32 - side) / 2 - 120;
    let mut chart = ChartBuilder::on(root)
        .caption(title, (FONT, 30))
        .margin_top(20)
        .margin_bottom(20)
        .margin_left(inset.max(20))
        .margin_right(inset.max(20))
        .x_label_area_size(60)
        .y_label_area_size(120)
        .build_cartesian_2d(-0.5..n as f64 - 0.5, -0.5..n as f64 - 0.5)?;
    chart
        .configure_mesh()
        .disable_mesh()
        .x_labels(n.min(MAX_TICKS))
        .y_labels(n.min(MAX_TICKS))
        .x_label_formatter(&|v| category_tick(&names, *v))
        .y_label_formatter(&|v| category_tick(&rows, *v))
        .draw()?;

    let mut cells = Vec::with_capacity(n * n);
    for (i, a) in cols.iter().enumerate() {
        for (j, b) in cols.iter().enumerate() {
            cells.push((j as f64, (n - 1 - i) as f64, correlation(a, b)));
        }
    }
    chart.draw_series(cells.iter().map(|(cx, cy, r)| {
        Rectangle::new(
            [(cx - 0.5, cy - 0.5), (cx + 0.5, cy + 0.5)],
            coolwarm(*r).filled(),
        )
    }))?;
    chart.draw_series(cells.iter().map(|(cx, cy, _)| {
        Rectangle::new([(cx - 0.5, cy - 0.5), (cx + 0.5, cy + 0.5)], WHITE.stroke_width(2))
    }))?;
    chart.draw_series(cells.iter().map(|(cx, cy, r)| {
        let ink = if r.abs() > 0.6 { WHITE } else { BLACK };
        let label = if r.is_nan() { "nan".to_string() } else { format!("{:.2}", r) };
        Text::new(
            label,
            (*cx, *cy),
            (FONT, 18).into_font().color(&ink).pos(Pos::new(HPos::Center, VPos::Center)),
        )
    }))?;
    Ok(())
}

/// Diverging blue-white-red color for a correlation in [-1, 1]; NaN is grey.
fn coolwarm(r: f64) -> RGBColor {
    if r.is_nan() {
        return RGBColor(200, 200, 200);
    }
    let t = r.clamp(-1.0, 1.0);
    let lerp = |a: f64, b: f64, f: f64| (a + (b - a) * f).round() as u8;
    if t < 0.0 {
        let f = -t;
        RGBColor(lerp(247.0, 59.0, f), lerp(247.0, 76.0, f), lerp(247.0, 192.0, f))
    } else {
        RGBColor(lerp(247.0, 180.0, t), lerp(247.0, 4.0, t), lerp(247.0, 38.0, t))
    }
}
