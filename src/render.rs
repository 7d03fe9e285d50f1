//! PCA biplot rendering: sample scores, confidence ellipse and loading vectors.
//!
//! All styling lives in [`PlotStyle`], passed explicitly to [`render_biplot`];
//! nothing here touches process-wide state. The geometry helpers
//! ([`loading_scale`], [`plot_bounds`]) are pure so they can be tested without
//! a drawing backend.

use crate::ellipse::ConfidenceEllipse;
use crate::error::BiplotError;
use log::{debug, info};
use ndarray::{Array2, ArrayView2};
use plotters::prelude::*;
use std::ops::Range;
use std::path::Path;

const ELLIPSE_BOUNDARY_POINTS: usize = 180;
const ARROW_HEAD_FRACTION: f64 = 0.08;
const ARROW_HEAD_HALF_ANGLE: f64 = 0.4;
const LABEL_OFFSET_FACTOR: f64 = 1.12;

/// Visual configuration of the biplot.
#[derive(Clone, Debug)]
pub struct PlotStyle {
    pub width: u32,
    pub height: u32,
    pub title: String,
    pub font_family: String,
    pub title_font_size: u32,
    pub axis_font_size: u32,
    pub label_font_size: u32,
    pub point_radius: u32,
    pub point_color: RGBColor,
    pub ellipse_color: RGBColor,
    pub ellipse_fill_opacity: f64,
    pub loading_color: RGBColor,
    pub show_sample_labels: bool,
    pub show_grid: bool,
    /// Draw any text at all (title, axes, legend, labels). Text needs a system font;
    /// without it only the geometry is drawn.
    pub show_text: bool,
    /// Padding added on each side of the data extent, as a fraction of its span.
    pub margin_fraction: f64,
    /// Multiplier applied to loading coefficients. `None` picks one from the scores.
    pub loading_scale: Option<f64>,
}

impl Default for PlotStyle {
    fn default() -> Self {
        PlotStyle {
            width: 1200,
            height: 1000,
            title: "PCA of mudbrick XRF composition".to_string(),
            font_family: "sans-serif".to_string(),
            title_font_size: 30,
            axis_font_size: 20,
            label_font_size: 14,
            point_radius: 5,
            point_color: RGBColor(31, 119, 180),
            ellipse_color: RGBColor(214, 39, 40),
            ellipse_fill_opacity: 0.12,
            loading_color: RGBColor(44, 160, 44),
            show_sample_labels: true,
            show_grid: true,
            show_text: true,
            margin_fraction: 0.08,
            loading_scale: None,
        }
    }
}

/// Everything the renderer reads, borrowed from the analysis results.
#[derive(Clone, Debug)]
pub struct BiplotData<'a> {
    pub sample_ids: &'a [String],
    /// Scores on the first two components, shape (n_samples, 2).
    pub scores: ArrayView2<'a, f64>,
    pub feature_names: &'a [String],
    /// Loadings of the first two components, shape (n_features, 2).
    pub loadings: ArrayView2<'a, f64>,
    pub ellipse: &'a ConfidenceEllipse,
    /// Explained-variance ratios of PC1 and PC2.
    pub variance_ratio: (f64, f64),
}

impl BiplotData<'_> {
    fn validate(&self) -> Result<(), BiplotError> {
        if self.scores.ncols() != 2 || self.loadings.ncols() != 2 {
            return Err(BiplotError::InvalidParameter(format!(
                "biplot needs two columns of scores and loadings, got {} and {}",
                self.scores.ncols(),
                self.loadings.ncols()
            )));
        }
        if self.sample_ids.len() != self.scores.nrows() {
            return Err(BiplotError::InvalidParameter(format!(
                "{} sample ids for {} score rows",
                self.sample_ids.len(),
                self.scores.nrows()
            )));
        }
        if self.feature_names.len() != self.loadings.nrows() {
            return Err(BiplotError::InvalidParameter(format!(
                "{} feature names for {} loading rows",
                self.feature_names.len(),
                self.loadings.nrows()
            )));
        }
        Ok(())
    }
}

/// Arrow scale so the longest loading vector spans 90% of the largest absolute score.
pub fn loading_scale(data: &BiplotData<'_>) -> f64 {
    let max_score = data.scores.iter().fold(0.0f64, |m, v| m.max(v.abs()));
    let max_loading = data
        .loadings
        .rows()
        .into_iter()
        .map(|row| row[0].hypot(row[1]))
        .fold(0.0f64, f64::max);
    if max_score <= 0.0 || max_loading <= 0.0 {
        1.0
    } else {
        0.9 * max_score / max_loading
    }
}

/// Arrow tips in plot coordinates, shape (n_features, 2).
pub fn scaled_loadings(data: &BiplotData<'_>, style: &PlotStyle) -> Array2<f64> {
    let scale = style.loading_scale.unwrap_or_else(|| loading_scale(data));
    data.loadings.mapv(|v| v * scale)
}

/// Axis ranges enclosing scores, the ellipse boundary, arrow tips and the origin,
/// padded by `style.margin_fraction` of the span on every side.
pub fn plot_bounds(data: &BiplotData<'_>, style: &PlotStyle) -> (Range<f64>, Range<f64>) {
    let tips = scaled_loadings(data, style);
    let boundary = data.ellipse.boundary(ELLIPSE_BOUNDARY_POINTS);

    let points = data
        .scores
        .rows()
        .into_iter()
        .map(|r| (r[0], r[1]))
        .chain(tips.rows().into_iter().map(|r| (r[0] * LABEL_OFFSET_FACTOR, r[1] * LABEL_OFFSET_FACTOR)))
        .chain(boundary)
        .chain(std::iter::once((0.0, 0.0)));

    let (mut x_min, mut x_max, mut y_min, mut y_max) = (0.0f64, 0.0f64, 0.0f64, 0.0f64);
    for (x, y) in points {
        x_min = x_min.min(x);
        x_max = x_max.max(x);
        y_min = y_min.min(y);
        y_max = y_max.max(y);
    }
    let pad = |lo: f64, hi: f64| {
        let span = (hi - lo).max(1e-6);
        let margin = span * style.margin_fraction.max(0.0);
        (lo - margin)..(hi + margin)
    };
    (pad(x_min, x_max), pad(y_min, y_max))
}

fn arrow_head(tip: (f64, f64)) -> [(f64, f64); 3] {
    let length = tip.0.hypot(tip.1);
    let head = length * ARROW_HEAD_FRACTION;
    let direction = tip.1.atan2(tip.0);
    let left = direction + std::f64::consts::PI - ARROW_HEAD_HALF_ANGLE;
    let right = direction + std::f64::consts::PI + ARROW_HEAD_HALF_ANGLE;
    [
        (tip.0 + head * left.cos(), tip.1 + head * left.sin()),
        tip,
        (tip.0 + head * right.cos(), tip.1 + head * right.sin()),
    ]
}

fn render_err<E: std::fmt::Display>(e: E) -> BiplotError {
    BiplotError::Render(e.to_string())
}

/// Draws the biplot into a PNG at `path`, overwriting any existing file.
pub fn render_biplot<P: AsRef<Path>>(path: P, data: &BiplotData<'_>, style: &PlotStyle) -> Result<(), BiplotError> {
    data.validate()?;
    let path = path.as_ref();
    let render_start_time = std::time::Instant::now();
    let (x_range, y_range) = plot_bounds(data, style);
    let tips = scaled_loadings(data, style);
    debug!("Biplot axis ranges: x {:?}, y {:?}", x_range, y_range);

    let root = BitMapBackend::new(path, (style.width, style.height)).into_drawing_area();
    root.fill(&WHITE).map_err(render_err)?;

    let font = style.font_family.as_str();
    let mut builder = ChartBuilder::on(&root);
    builder.margin(20);
    if style.show_text {
        builder
            .caption(&style.title, (font, style.title_font_size))
            .x_label_area_size(60)
            .y_label_area_size(70);
    }
    let mut chart = builder
        .build_cartesian_2d(x_range.clone(), y_range.clone())
        .map_err(render_err)?;

    if style.show_text {
        let mut mesh = chart.configure_mesh();
        mesh.x_desc(format!("PC1 ({:.1}% explained variance)", data.variance_ratio.0 * 100.0))
            .y_desc(format!("PC2 ({:.1}% explained variance)", data.variance_ratio.1 * 100.0))
            .axis_desc_style((font, style.axis_font_size))
            .label_style((font, style.label_font_size));
        if !style.show_grid {
            mesh.disable_mesh();
        }
        mesh.draw().map_err(render_err)?;
    }

    let axis_color = BLACK.mix(0.4);
    chart
        .draw_series([
            PathElement::new(vec![(x_range.start, 0.0), (x_range.end, 0.0)], axis_color),
            PathElement::new(vec![(0.0, y_range.start), (0.0, y_range.end)], axis_color),
        ])
        .map_err(render_err)?;

    let boundary = data.ellipse.boundary(ELLIPSE_BOUNDARY_POINTS);
    let ellipse_color = style.ellipse_color;
    chart
        .draw_series(std::iter::once(Polygon::new(
            boundary.clone(),
            ellipse_color.mix(style.ellipse_fill_opacity).filled(),
        )))
        .map_err(render_err)?;
    chart
        .draw_series(LineSeries::new(boundary, ellipse_color.stroke_width(2)))
        .map_err(render_err)?
        .label(format!("{:.1}% confidence ellipse", data.ellipse.confidence * 100.0))
        .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], ellipse_color.stroke_width(2)));

    let point_color = style.point_color;
    let point_radius = style.point_radius;
    chart
        .draw_series(
            data.scores
                .rows()
                .into_iter()
                .map(|r| Circle::new((r[0], r[1]), point_radius, point_color.mix(0.8).filled())),
        )
        .map_err(render_err)?
        .label("Samples")
        .legend(move |(x, y)| Circle::new((x + 10, y), point_radius, point_color.filled()));

    if style.show_text && style.show_sample_labels {
        let label_font = (font, style.label_font_size).into_font().color(&BLACK.mix(0.75));
        chart
            .draw_series(data.scores.rows().into_iter().zip(data.sample_ids).map(|(r, id)| {
                EmptyElement::at((r[0], r[1])) + Text::new(id.clone(), (6, -14), label_font.clone())
            }))
            .map_err(render_err)?;
    }

    let loading_color = style.loading_color;
    let arrow_style = loading_color.stroke_width(2);
    chart
        .draw_series(
            tips.rows()
                .into_iter()
                .map(|tip| PathElement::new(vec![(0.0, 0.0), (tip[0], tip[1])], arrow_style)),
        )
        .map_err(render_err)?
        .label("Loadings")
        .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], loading_color.stroke_width(2)));
    chart
        .draw_series(
            tips.rows()
                .into_iter()
                .map(|tip| PathElement::new(arrow_head((tip[0], tip[1])).to_vec(), arrow_style)),
        )
        .map_err(render_err)?;

    if style.show_text {
        let feature_font = (font, style.label_font_size + 2).into_font().color(&loading_color);
        chart
            .draw_series(tips.rows().into_iter().zip(data.feature_names).map(|(tip, name)| {
                Text::new(
                    name.clone(),
                    (tip[0] * LABEL_OFFSET_FACTOR, tip[1] * LABEL_OFFSET_FACTOR),
                    feature_font.clone(),
                )
            }))
            .map_err(render_err)?;

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperRight)
            .background_style(WHITE.mix(0.85))
            .border_style(BLACK)
            .label_font((font, style.label_font_size))
            .draw()
            .map_err(render_err)?;
    }

    root.present().map_err(render_err)?;
    info!("Wrote biplot to {} in {:?}", path.display(), render_start_time.elapsed());
    Ok(())
}
