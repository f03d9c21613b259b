use anyhow::{anyhow, Context, Result};
use image::ImageEncoder;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};

use crate::data::format_number;
use crate::ir::{Figure, Trace};
use crate::options::{LineShape, PlotMode};
use crate::scale::{build_value_scale, ValueScale};

const TITLE_LINE_HEIGHT: u32 = 26;
const TITLE_PADDING: u32 = 14;
/// Extent of the polar chart in unit radii, leaving room for hour labels
const POLAR_LIMIT: f64 = 1.18;
const HOUR_LABEL_RADIUS: f64 = 1.09;
const RINGS: usize = 4;
/// Interpolated points per segment for smoothed traces
const SMOOTH_STEPS: usize = 8;
/// The cartesian x axis runs in hours so key points land on whole hours
const DEGREES_PER_HOUR: f64 = 15.0;

/// Render a figure to PNG bytes
pub fn render_png(figure: &Figure) -> Result<Vec<u8>> {
    let (width, height) = (figure.layout.width, figure.layout.height);
    let mut buffer = vec![0u8; rgb_buffer_len(width, height)];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
        draw_figure(&root, figure)?;
        root.present()
            .map_err(|e| anyhow!("Failed to present drawing: {}", e))?;
    }

    let mut png_bytes = Vec::new();
    {
        let encoder = image::codecs::png::PngEncoder::new(&mut png_bytes);
        encoder
            .write_image(&buffer, width, height, image::ColorType::Rgb8)
            .context("Failed to encode PNG")?;
    }

    Ok(png_bytes)
}

/// Bytes in an RGB buffer of the given size, computed without `u32` overflow
fn rgb_buffer_len(width: u32, height: u32) -> usize {
    width as usize * height as usize * 3
}

/// Render a figure to an SVG document
pub fn render_svg(figure: &Figure) -> Result<String> {
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, (figure.layout.width, figure.layout.height))
            .into_drawing_area();
        draw_figure(&root, figure)?;
        root.present()
            .map_err(|e| anyhow!("Failed to present drawing: {}", e))?;
    }
    Ok(svg)
}

/// Attach a description to a plotters error
fn drawing<T, E: std::fmt::Display>(result: std::result::Result<T, E>, what: &str) -> Result<T> {
    result.map_err(|e| anyhow!("Failed to {}: {}", what, e))
}

fn draw_figure<DB>(root: &DrawingArea<DB, Shift>, figure: &Figure) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    drawing(root.fill(&WHITE), "fill background")?;

    let title_lines: Vec<&str> = figure
        .layout
        .title
        .split("<br>")
        .filter(|l| !l.is_empty())
        .collect();
    let title_height = TITLE_PADDING * 2 + TITLE_LINE_HEIGHT * title_lines.len() as u32;
    let (title_area, body) = root.split_vertically(title_height as i32);

    let (title_width, _) = title_area.dim_in_pixel();
    for (i, line) in title_lines.iter().enumerate() {
        let size = if i == 0 { 22 } else { 16 };
        let style = ("sans-serif", size)
            .into_font()
            .color(&BLACK)
            .pos(Pos::new(HPos::Center, VPos::Top));
        let y = (TITLE_PADDING + TITLE_LINE_HEIGHT * i as u32) as i32;
        drawing(
            title_area.draw(&Text::new(line.to_string(), ((title_width / 2) as i32, y), style)),
            "draw title",
        )?;
    }

    let scale = build_value_scale(figure);
    match figure.layout.mode {
        PlotMode::Polar => draw_polar(&body, figure, &scale),
        PlotMode::Cartesian => draw_cartesian(&body, figure, &scale),
    }
}

/// Clock face: midnight at the top, hours running clockwise
fn draw_polar<DB>(
    area: &DrawingArea<DB, Shift>,
    figure: &Figure,
    scale: &ValueScale,
) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let (w, h) = area.dim_in_pixel();
    let side = w.min(h);
    let dx = ((w - side) / 2) as i32;
    let dy = ((h - side) / 2) as i32;
    let square = area.margin(dy, dy, dx, dx);

    let mut chart = drawing(
        ChartBuilder::on(&square)
            .margin(10)
            .build_cartesian_2d(-POLAR_LIMIT..POLAR_LIMIT, -POLAR_LIMIT..POLAR_LIMIT),
        "build chart",
    )?;

    let grid = RGBColor(210, 210, 210);
    let label_style = ("sans-serif", 13)
        .into_font()
        .color(&BLACK)
        .pos(Pos::new(HPos::Center, VPos::Center));

    // Rings with their value labels
    for (i, value) in scale.ticks(RINGS).into_iter().enumerate().skip(1) {
        let radius = i as f64 / RINGS as f64;
        let ring: Vec<(f64, f64)> = (0..=72).map(|k| to_xy(k as f64 * 5.0, radius)).collect();
        drawing(chart.draw_series(LineSeries::new(ring, grid.stroke_width(1))), "draw ring")?;
        drawing(
            chart.draw_series(std::iter::once(Text::new(
                format_number((value * 100.0).round() / 100.0),
                (0.03, radius + 0.03),
                ("sans-serif", 11).into_font().color(&RGBColor(120, 120, 120)),
            ))),
            "draw ring label",
        )?;
    }

    // Spokes and hour labels
    for (deg, text) in figure.layout.tick_vals.iter().zip(&figure.layout.tick_text) {
        drawing(
            chart.draw_series(LineSeries::new(
                vec![(0.0, 0.0), to_xy(*deg, 1.0)],
                grid.stroke_width(1),
            )),
            "draw spoke",
        )?;
        drawing(
            chart.draw_series(std::iter::once(Text::new(
                text.clone(),
                to_xy(*deg, HOUR_LABEL_RADIUS),
                label_style.clone(),
            ))),
            "draw hour label",
        )?;
    }

    for trace in &figure.traces {
        let points: Vec<(f64, f64)> = trace
            .points()
            .filter(|(_, v)| v.is_finite())
            .map(|(deg, v)| to_xy(deg, scale.normalize(v)))
            .collect();
        draw_trace(&mut chart, trace, points)?;
    }

    draw_legend(&mut chart, figure)
}

fn draw_cartesian<DB>(
    area: &DrawingArea<DB, Shift>,
    figure: &Figure,
    scale: &ValueScale,
) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let mut chart = drawing(
        ChartBuilder::on(area)
            .margin(20)
            .x_label_area_size(40)
            .y_label_area_size(60)
            .build_cartesian_2d(0f64..24f64, scale.min..scale.max),
        "build chart",
    )?;

    let tick_label = |hour: &f64| hour_label(figure, *hour);
    drawing(
        chart
            .configure_mesh()
            .x_labels(25)
            .x_label_formatter(&tick_label)
            .draw(),
        "draw mesh",
    )?;

    for trace in &figure.traces {
        let points: Vec<(f64, f64)> = trace
            .points()
            .filter(|(_, v)| v.is_finite())
            .map(|(deg, v)| (deg / DEGREES_PER_HOUR, v))
            .collect();
        draw_trace(&mut chart, trace, points)?;
    }

    draw_legend(&mut chart, figure)
}

fn draw_trace<'a, DB, X, Y>(
    chart: &mut ChartContext<'a, DB, Cartesian2d<X, Y>>,
    trace: &Trace,
    points: Vec<(f64, f64)>,
) -> Result<()>
where
    DB: DrawingBackend + 'a,
    DB::ErrorType: 'static,
    X: Ranged<ValueType = f64>,
    Y: Ranged<ValueType = f64>,
{
    if points.len() < 2 {
        return Ok(());
    }
    let closed = points.first() == points.last();
    let points = match trace.line.shape {
        LineShape::Spline => smooth(&points, closed),
        LineShape::Linear => points,
    };

    let stroke = (trace.width().round() as u32).max(1);
    let style = parse_color(&trace.line.color)
        .mix(trace.opacity.unwrap_or(1.0))
        .stroke_width(stroke);

    let anno = match dash_pattern(&trace.line.dash) {
        Some((size, spacing)) => drawing(
            chart.draw_series(DashedLineSeries::new(points, size, spacing, style)),
            "draw dashed line",
        )?,
        None => drawing(chart.draw_series(LineSeries::new(points, style)), "draw line")?,
    };

    if trace.show_legend {
        anno.label(trace.name.clone())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], style));
    }
    Ok(())
}

fn draw_legend<'a, DB, X, Y>(
    chart: &mut ChartContext<'a, DB, Cartesian2d<X, Y>>,
    figure: &Figure,
) -> Result<()>
where
    DB: DrawingBackend + 'a,
    DB::ErrorType: 'static,
    X: Ranged<ValueType = f64>,
    Y: Ranged<ValueType = f64>,
{
    if !figure.traces.iter().any(|t| t.show_legend) {
        return Ok(());
    }
    drawing(
        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperRight)
            .background_style(WHITE.mix(0.85))
            .border_style(RGBColor(180, 180, 180))
            .draw(),
        "draw legend",
    )
}

/// Tick text for an hour position on the cartesian axis; blank between ticks
fn hour_label(figure: &Figure, hour: f64) -> String {
    let degrees = hour * DEGREES_PER_HOUR;
    figure
        .layout
        .tick_vals
        .iter()
        .position(|t| (t - degrees).abs() < 1e-6)
        .and_then(|i| figure.layout.tick_text.get(i).cloned())
        .unwrap_or_default()
}

/// Clock angle and radius to chart coordinates (0 degrees at the top, clockwise)
fn to_xy(degrees: f64, radius: f64) -> (f64, f64) {
    let theta = degrees.to_radians();
    (radius * theta.sin(), radius * theta.cos())
}

/// Catmull-Rom smoothing through every point. Closed lines wrap around.
fn smooth(points: &[(f64, f64)], closed: bool) -> Vec<(f64, f64)> {
    let n = points.len();
    if n < 3 {
        return points.to_vec();
    }
    let ring = if closed { &points[..n - 1] } else { points };
    let m = ring.len() as isize;
    let at = |i: isize| {
        if closed {
            ring[i.rem_euclid(m) as usize]
        } else {
            ring[i.clamp(0, m - 1) as usize]
        }
    };

    let segments = if closed { m } else { m - 1 };
    let mut out = Vec::with_capacity(segments as usize * SMOOTH_STEPS + 1);
    for i in 0..segments {
        let (p0, p1, p2, p3) = (at(i - 1), at(i), at(i + 1), at(i + 2));
        for step in 0..SMOOTH_STEPS {
            let t = step as f64 / SMOOTH_STEPS as f64;
            out.push((
                catmull_rom(p0.0, p1.0, p2.0, p3.0, t),
                catmull_rom(p0.1, p1.1, p2.1, p3.1, t),
            ));
        }
    }
    out.push(if closed { ring[0] } else { ring[ring.len() - 1] });
    out
}

fn catmull_rom(p0: f64, p1: f64, p2: f64, p3: f64, t: f64) -> f64 {
    let t2 = t * t;
    let t3 = t2 * t;
    0.5 * (2.0 * p1
        + (p2 - p0) * t
        + (2.0 * p0 - 5.0 * p1 + 4.0 * p2 - p3) * t2
        + (3.0 * p1 - p0 - 3.0 * p2 + p3) * t3)
}

/// Dash length and gap in pixels; `None` for a solid line
fn dash_pattern(dash: &str) -> Option<(u32, u32)> {
    match dash {
        "dot" => Some((2, 4)),
        "dash" => Some((8, 6)),
        "longdash" => Some((16, 6)),
        "dashdot" => Some((10, 4)),
        "longdashdot" => Some((20, 5)),
        _ => None,
    }
}

/// Parse a CSS color name or `#rgb` / `#rrggbb` hex string
fn parse_color(color: &str) -> RGBColor {
    if let Some(hex) = color.strip_prefix('#') {
        let channel = |s: &str| u8::from_str_radix(s, 16).ok();
        let parsed = match hex.len() {
            6 => channel(&hex[0..2])
                .zip(channel(&hex[2..4]))
                .zip(channel(&hex[4..6]))
                .map(|((r, g), b)| RGBColor(r, g, b)),
            3 => channel(&hex[0..1].repeat(2))
                .zip(channel(&hex[1..2].repeat(2)))
                .zip(channel(&hex[2..3].repeat(2)))
                .map(|((r, g), b)| RGBColor(r, g, b)),
            _ => None,
        };
        return parsed.unwrap_or(BLUE);
    }

    match color.to_ascii_lowercase().as_str() {
        "red" => RGBColor(255, 0, 0),
        "green" => RGBColor(0, 128, 0),
        "blue" => RGBColor(0, 0, 255),
        "orange" => RGBColor(255, 165, 0),
        "black" => BLACK,
        "white" => WHITE,
        "yellow" => YELLOW,
        "cyan" => CYAN,
        "magenta" => MAGENTA,
        "purple" => RGBColor(128, 0, 128),
        "gray" | "grey" => RGBColor(128, 128, 128),
        _ => BLUE,
    }
}
