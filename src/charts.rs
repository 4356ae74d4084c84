// Chart model and rendering.
//
// Views and the report describe what to draw as a `ChartSpec`. Rendering
// goes through plotters' SVG backend, which needs no font files, and the SVG
// is rasterised to PNG with resvg when a bitmap is required (the report).

use crate::error::RenderError;
use crate::util::xml_text;
use once_cell::sync::Lazy;
use plotters::coord::Shift;
use plotters::prelude::*;
use resvg::tiny_skia;
use resvg::usvg::{self, fontdb};
use serde::Serialize;
use std::sync::Arc;

pub const PURPLE: RGBColor = RGBColor(128, 0, 128);
pub const ACHIEVED: RGBColor = RGBColor(0, 160, 60);

// Dash and gap length of dashed series, in pixels.
const DASH_PX: u32 = 10;
const DASH_GAP_PX: u32 = 6;

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

// System fonts are scanned once per process.
static FONT_DB: Lazy<Arc<fontdb::Database>> = Lazy::new(|| {
    let mut db = fontdb::Database::new();
    db.load_system_fonts();
    tracing::debug!(faces = db.len(), "loaded system fonts for rasterisation");
    Arc::new(db)
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LineStyle {
    Solid,
    Dashed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub name: String,
    pub points: Vec<(f64, f64)>,
    pub style: LineStyle,
    pub markers: bool,
    /// Fixed colour; palette colour by position when `None`.
    pub color: Option<(u8, u8, u8)>,
    /// Drawn in the "achieved" colour.
    pub highlighted: bool,
    /// Shown in the legend.
    pub labelled: bool,
}

impl Series {
    pub fn line(name: impl Into<String>, points: Vec<(f64, f64)>) -> Self {
        Series {
            name: name.into(),
            points,
            style: LineStyle::Solid,
            markers: false,
            color: None,
            highlighted: false,
            labelled: true,
        }
    }

    pub fn with_markers(mut self) -> Self {
        self.markers = true;
        self
    }

    pub fn dashed(mut self) -> Self {
        self.style = LineStyle::Dashed;
        self
    }

    pub fn colored(mut self, rgb: (u8, u8, u8)) -> Self {
        self.color = Some(rgb);
        self
    }

    pub fn unlabelled(mut self) -> Self {
        self.labelled = false;
        self
    }
}

/// Horizontal line across the plot with a text annotation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReferenceLine {
    pub y: f64,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bar {
    pub label: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ChartKind {
    Line {
        series: Vec<Series>,
        references: Vec<ReferenceLine>,
    },
    Bar {
        bars: Vec<Bar>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub kind: ChartKind,
}

impl ChartSpec {
    pub fn line(title: impl Into<String>, x_label: &str, y_label: &str) -> Self {
        ChartSpec {
            title: title.into(),
            x_label: x_label.to_string(),
            y_label: y_label.to_string(),
            kind: ChartKind::Line {
                series: Vec::new(),
                references: Vec::new(),
            },
        }
    }

    pub fn bars(title: impl Into<String>, x_label: &str, y_label: &str, bars: Vec<Bar>) -> Self {
        ChartSpec {
            title: title.into(),
            x_label: x_label.to_string(),
            y_label: y_label.to_string(),
            kind: ChartKind::Bar { bars },
        }
    }

    /// Append a series; no-op on bar charts.
    pub fn push_series(&mut self, s: Series) {
        if let ChartKind::Line { series, .. } = &mut self.kind {
            series.push(s);
        }
    }

    pub fn push_reference(&mut self, r: ReferenceLine) {
        if let ChartKind::Line { references, .. } = &mut self.kind {
            if !references.contains(&r) {
                references.push(r);
            }
        }
    }

    pub fn series(&self) -> &[Series] {
        match &self.kind {
            ChartKind::Line { series, .. } => series,
            ChartKind::Bar { .. } => &[],
        }
    }

    pub fn references(&self) -> &[ReferenceLine] {
        match &self.kind {
            ChartKind::Line { references, .. } => references,
            ChartKind::Bar { .. } => &[],
        }
    }

    pub fn series_mut(&mut self) -> &mut [Series] {
        match &mut self.kind {
            ChartKind::Line { series, .. } => series,
            ChartKind::Bar { .. } => &mut [],
        }
    }
}

/// A rendered chart held in memory until it is embedded.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartImage {
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

pub trait ChartRenderer {
    fn render_png(&self, spec: &ChartSpec) -> Result<ChartImage, RenderError>;
}

#[derive(Debug, Clone, Copy)]
pub struct SvgChartRenderer {
    pub width: u32,
    pub height: u32,
}

impl SvgChartRenderer {
    pub fn new(width: u32, height: u32) -> Self {
        SvgChartRenderer { width, height }
    }

    pub fn render_svg(&self, spec: &ChartSpec) -> Result<String, RenderError> {
        render_svg(spec, (self.width, self.height))
    }
}

impl ChartRenderer for SvgChartRenderer {
    fn render_png(&self, spec: &ChartSpec) -> Result<ChartImage, RenderError> {
        let svg = self.render_svg(spec)?;
        rasterize(&svg)
    }
}

fn chart_err<E: std::fmt::Display>(e: E) -> RenderError {
    RenderError::Chart(e.to_string())
}

pub fn render_svg(spec: &ChartSpec, size: (u32, u32)) -> Result<String, RenderError> {
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, size).into_drawing_area();
        root.fill(&WHITE).map_err(chart_err)?;
        match &spec.kind {
            ChartKind::Line { series, references } => {
                draw_line_chart(&root, spec, series, references)?
            }
            ChartKind::Bar { bars } => draw_bar_chart(&root, spec, bars)?,
        }
        root.present().map_err(chart_err)?;
    }
    // usvg rejects the whole document on a single stray control code
    Ok(xml_text(&svg).into_owned())
}

/// Rasterise an SVG document to PNG on a white background.
pub fn rasterize(svg: &str) -> Result<ChartImage, RenderError> {
    let mut opt = usvg::Options::default();
    opt.fontdb = Arc::clone(&FONT_DB);
    let tree =
        usvg::Tree::from_str(svg, &opt).map_err(|e| RenderError::Rasterize(e.to_string()))?;
    let size = tree.size().to_int_size();
    let mut pixmap = tiny_skia::Pixmap::new(size.width(), size.height())
        .ok_or_else(|| RenderError::Rasterize("failed to allocate pixmap".into()))?;
    pixmap.fill(tiny_skia::Color::WHITE);
    resvg::render(&tree, tiny_skia::Transform::default(), &mut pixmap.as_mut());
    let png = pixmap
        .encode_png()
        .map_err(|e| RenderError::Rasterize(e.to_string()))?;
    Ok(ChartImage {
        png,
        width: size.width(),
        height: size.height(),
    })
}

fn series_color(s: &Series, idx: usize) -> RGBColor {
    if s.highlighted {
        return ACHIEVED;
    }
    match s.color {
        Some((r, g, b)) => RGBColor(r, g, b),
        None => PALETTE[idx % PALETTE.len()],
    }
}

/// Padded `[lo, hi)` range covering `values`, never empty.
fn padded_range(values: impl Iterator<Item = f64>, pad_fraction: f64) -> (f64, f64) {
    let (mut lo, mut hi) = (f64::INFINITY, f64::NEG_INFINITY);
    for v in values.filter(|v| v.is_finite()) {
        lo = lo.min(v);
        hi = hi.max(v);
    }
    if !lo.is_finite() || !hi.is_finite() {
        return (0.0, 1.0);
    }
    if (hi - lo).abs() < f64::EPSILON {
        return (lo - 1.0, hi + 1.0);
    }
    let pad = (hi - lo) * pad_fraction;
    (lo - pad, hi + pad)
}

fn draw_line_chart<DB>(
    root: &DrawingArea<DB, Shift>,
    spec: &ChartSpec,
    series: &[Series],
    references: &[ReferenceLine],
) -> Result<(), RenderError>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let (x_lo, x_hi) = padded_range(
        series.iter().flat_map(|s| s.points.iter().map(|p| p.0)),
        0.03,
    );
    let (y_lo, y_hi) = padded_range(
        series
            .iter()
            .flat_map(|s| s.points.iter().map(|p| p.1))
            .chain(references.iter().map(|r| r.y)),
        0.08,
    );

    let mut chart = ChartBuilder::on(root)
        .caption(&spec.title, ("sans-serif", 28))
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(70)
        .build_cartesian_2d(x_lo..x_hi, y_lo..y_hi)
        .map_err(chart_err)?;

    chart
        .configure_mesh()
        .x_desc(spec.x_label.as_str())
        .y_desc(spec.y_label.as_str())
        .x_label_formatter(&|v| format!("{:.0}", v))
        .draw()
        .map_err(chart_err)?;

    let mut any_label = false;
    for (idx, s) in series.iter().enumerate() {
        let color = series_color(s, idx);
        let style = color.stroke_width(2);
        let anno = match s.style {
            LineStyle::Solid => chart
                .draw_series(LineSeries::new(s.points.iter().copied(), style))
                .map_err(chart_err)?,
            LineStyle::Dashed => chart
                .draw_series(DashedLineSeries::new(
                    s.points.iter().copied(),
                    DASH_PX,
                    DASH_GAP_PX,
                    style,
                ))
                .map_err(chart_err)?,
        };
        if s.labelled {
            any_label = true;
            anno.label(s.name.clone())
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], style));
        }
        if s.markers {
            chart
                .draw_series(
                    s.points
                        .iter()
                        .map(move |&p| Circle::new(p, 4, color.filled())),
                )
                .map_err(chart_err)?;
        }
    }

    for r in references {
        let style = PURPLE.stroke_width(2);
        chart
            .draw_series(std::iter::once(PathElement::new(
                vec![(x_lo, r.y), (x_hi, r.y)],
                style,
            )))
            .map_err(chart_err)?;
        chart
            .draw_series(std::iter::once(Text::new(
                r.label.clone(),
                (x_lo + (x_hi - x_lo) * 0.55, r.y),
                ("sans-serif", 16).into_font().color(&PURPLE),
            )))
            .map_err(chart_err)?;
    }

    if any_label {
        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.85))
            .border_style(BLACK)
            .draw()
            .map_err(chart_err)?;
    }
    Ok(())
}

fn draw_bar_chart<DB>(
    root: &DrawingArea<DB, Shift>,
    spec: &ChartSpec,
    bars: &[Bar],
) -> Result<(), RenderError>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let n = bars.len().max(1) as f64;
    let top = bars.iter().map(|b| b.value).fold(0.0_f64, f64::max);
    let top = if top > 0.0 { top * 1.1 } else { 1.0 };
    let labels: Vec<String> = bars.iter().map(|b| truncate_label(&b.label, 18)).collect();

    let mut chart = ChartBuilder::on(root)
        .caption(&spec.title, ("sans-serif", 28))
        .margin(20)
        .x_label_area_size(60)
        .y_label_area_size(70)
        .build_cartesian_2d(-0.5..(n - 0.5), 0.0..top)
        .map_err(chart_err)?;

    let label_at = |v: &f64| {
        let i = v.round();
        if (v - i).abs() > 0.01 || i < 0.0 {
            return String::new();
        }
        labels.get(i as usize).cloned().unwrap_or_default()
    };
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(bars.len().max(1))
        .x_label_formatter(&label_at)
        .x_desc(spec.x_label.as_str())
        .y_desc(spec.y_label.as_str())
        .draw()
        .map_err(chart_err)?;

    chart
        .draw_series(bars.iter().enumerate().map(|(i, b)| {
            let x = i as f64;
            Rectangle::new(
                [(x - 0.35, 0.0), (x + 0.35, b.value.max(0.0))],
                PALETTE[i % PALETTE.len()].filled(),
            )
        }))
        .map_err(chart_err)?;
    Ok(())
}

fn truncate_label(label: &str, max: usize) -> String {
    if label.chars().count() <= max {
        return label.to_string();
    }
    let mut s: String = label.chars().take(max.saturating_sub(1)).collect();
    s.push('…');
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_line() -> ChartSpec {
        let mut spec = ChartSpec::line("3.2: Mortality", "Year", "Value");
        spec.push_series(
            Series::line("Urban", vec![(2015.0, 40.0), (2016.0, 35.0), (2017.0, 30.0)]).with_markers(),
        );
        spec.push_series(
            Series::line("Target Value", vec![(2015.0, 25.0), (2017.0, 25.0)])
                .dashed()
                .colored((128, 0, 128)),
        );
        spec.push_reference(ReferenceLine {
            y: 25.0,
            label: "Target: 25 by 2030".into(),
        });
        spec
    }

    #[test]
    fn svg_contains_title_and_annotation() {
        let svg = render_svg(&sample_line(), (800, 500)).unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("3.2: Mortality"));
        assert!(svg.contains("Target: 25 by 2030"));
    }

    #[test]
    fn renders_png_bytes() {
        let img = SvgChartRenderer::new(640, 400).render_png(&sample_line()).unwrap();
        assert_eq!(&img.png[..8], b"\x89PNG\r\n\x1a\n");
        assert_eq!((img.width, img.height), (640, 400));
    }

    #[test]
    fn control_codes_in_labels_do_not_break_rasterisation() {
        let mut spec = ChartSpec::line("5.5: Seats \u{1} held", "Year", "Value");
        spec.push_series(Series::line("Urban\u{7}", vec![(2015.0, 1.0), (2016.0, 2.0)]));
        let svg = render_svg(&spec, (480, 320)).unwrap();
        assert!(svg.contains("5.5: Seats  held"));
        let img = rasterize(&svg).unwrap();
        assert_eq!((img.width, img.height), (480, 320));
    }

    #[test]
    fn renders_bar_chart_and_empty_chart() {
        let bars = ChartSpec::bars(
            "Indicators Achieving Target",
            "Indicator",
            "Progress",
            vec![
                Bar { label: "Mortality".into(), value: 120.0 },
                Bar { label: "Enrolment".into(), value: 101.0 },
            ],
        );
        assert!(render_svg(&bars, (600, 400)).is_ok());
        let empty = ChartSpec::line("Nothing", "Year", "Value");
        assert!(render_svg(&empty, (600, 400)).is_ok());
    }

    #[test]
    fn dashed_series_is_drawn_in_pieces() {
        let steep: Vec<(f64, f64)> = vec![(2015.0, 0.0), (2016.0, 1000.0), (2030.0, 1010.0)];
        let polylines = |series: Series| {
            let mut spec = ChartSpec::line("Trend", "Year", "Value");
            spec.push_series(series.unlabelled());
            render_svg(&spec, (600, 400)).unwrap().matches("<polyline").count()
        };
        let solid = polylines(Series::line("solid", steep.clone()));
        let dashed = polylines(Series::line("dashed", steep).dashed());
        assert!(dashed > solid + 10, "dashed {dashed}, solid {solid}");
    }

    #[test]
    fn references_are_not_duplicated() {
        let mut spec = sample_line();
        spec.push_reference(ReferenceLine {
            y: 25.0,
            label: "Target: 25 by 2030".into(),
        });
        assert_eq!(spec.references().len(), 1);
    }

    #[test]
    fn padded_range_handles_degenerate_input() {
        assert_eq!(padded_range(std::iter::empty::<f64>(), 0.1), (0.0, 1.0));
        assert_eq!(padded_range([5.0].into_iter(), 0.1), (4.0, 6.0));
    }
}
