use std::sync::Arc;

use tracing::{debug, info};

use super::axis::{TickFormatter, TimeTicks, ValueTicks};
use super::legend::resolve_legends;
use super::normalize::normalize;
use super::stacking::apply_stacking;
use super::style::{assign, StyleConfig, StyleDescriptor};
use crate::metrics::{record_series_count, StageTimer};
use crate::models::{ChartOptions, QuerySpec, Series};
use crate::query::Query;
use crate::render::Renderer;
use crate::{ChartError, Result};

pub const X_AXIS_LABEL: &str = "Time";

/// A series ready to draw: legend text, style and `(x, y)` points where y
/// already includes any stacking offset.
#[derive(Debug, Clone, PartialEq)]
pub struct StyledSeries {
    pub legend: String,
    pub style: StyleDescriptor,
    pub points: Vec<(f64, f64)>,
}

/// Everything a renderer needs, independent of the output format.
#[derive(Debug, Clone, PartialEq)]
pub struct Plot {
    pub title: Option<String>,
    pub x_label: String,
    pub x_ticks: TickFormatter,
    pub y_ticks: TickFormatter,
    pub y_min: Option<f64>,
    pub y_max: Option<f64>,
    pub legend_top: bool,
    pub stroke_width: u32,
    pub width_inches: f64,
    pub height_inches: f64,
    /// Legend (input) order.
    pub series: Vec<StyledSeries>,
    /// Fallback x range when there is nothing to plot.
    pub window: (f64, f64),
}

impl Plot {
    pub fn x_range(&self) -> (f64, f64) {
        let xs = self.series.iter().flat_map(|s| s.points.iter().map(|p| p.0));
        let (lo, hi) = bounds(xs).unwrap_or(self.window);
        widen(lo, hi)
    }

    /// Data range of the plotted values, with `y_min`/`y_max` taking
    /// precedence when set.
    pub fn y_range(&self) -> (f64, f64) {
        let ys = self.series.iter().flat_map(|s| s.points.iter().map(|p| p.1));
        let (lo, hi) = bounds(ys).unwrap_or((0.0, 1.0));
        widen(self.y_min.unwrap_or(lo), self.y_max.unwrap_or(hi))
    }

    /// Series in paint order, first painted first.
    pub fn in_draw_order(&self) -> Vec<&StyledSeries> {
        let mut ordered: Vec<&StyledSeries> = self.series.iter().collect();
        ordered.sort_by_key(|s| s.style.draw_order);
        ordered
    }
}

fn bounds(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    values.fold(None, |acc, v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })
}

fn widen(lo: f64, hi: f64) -> (f64, f64) {
    if hi > lo {
        (lo, hi)
    } else {
        (lo - 1.0, lo + 1.0)
    }
}

/// Runs a chart request end to end: query, transform, render.
#[derive(Clone)]
pub struct ChartBuilder {
    query: Arc<dyn Query>,
    renderer: Arc<dyn Renderer>,
    style: Arc<StyleConfig>,
}

impl ChartBuilder {
    pub fn new(query: Arc<dyn Query>, renderer: Arc<dyn Renderer>, style: Arc<StyleConfig>) -> Self {
        Self {
            query,
            renderer,
            style,
        }
    }

    pub fn build_plot(&self, raw: Vec<Series>, spec: &QuerySpec, options: &ChartOptions) -> Result<Plot> {
        let series = normalize(raw);

        if let Some(empty) = series.iter().find(|s| s.points.is_empty()) {
            return Err(ChartError::Render(format!(
                "series {} has no points",
                empty.display_name()
            )));
        }

        let values = apply_stacking(&series, options.stacked);
        let styles = assign(series.len(), options.stacked, self.style.palette());
        let legends = resolve_legends(&series, options.legend_template.as_deref());

        let styled: Vec<StyledSeries> = series
            .iter()
            .zip(values)
            .zip(styles)
            .zip(legends)
            .map(|(((s, ys), style), legend)| StyledSeries {
                legend,
                style,
                points: s.points.iter().map(|p| p.x()).zip(ys).collect(),
            })
            .collect();

        debug!(series = styled.len(), stacked = options.stacked, "Built plot");

        Ok(Plot {
            title: options.title.clone(),
            x_label: X_AXIS_LABEL.to_string(),
            x_ticks: TickFormatter::Time(TimeTicks::new(spec.start, spec.end)),
            y_ticks: TickFormatter::Value(ValueTicks),
            y_min: options.y_min,
            y_max: options.y_max,
            legend_top: true,
            stroke_width: self.style.stroke_width,
            width_inches: options.width_inches,
            height_inches: options.height_inches,
            series: styled,
            window: (spec.start.timestamp() as f64, spec.end.timestamp() as f64),
        })
    }

    /// Fetches, builds and encodes one chart. Rendering runs on the blocking
    /// pool.
    pub async fn render(
        &self,
        spec: &QuerySpec,
        options: &ChartOptions,
        credential: Option<&str>,
    ) -> Result<Vec<u8>> {
        let raw = self.query.fetch(spec, credential).await?;
        let plot = self.build_plot(raw, spec, options)?;
        record_series_count(plot.series.len());

        let renderer = Arc::clone(&self.renderer);
        let format = options.output_format;
        let series = plot.series.len();
        let bytes = tokio::task::spawn_blocking(move || {
            let _timer = StageTimer::new("render");
            renderer.render(&plot, format)
        })
        .await
        .map_err(|e| ChartError::Internal(format!("render task failed: {}", e)))??;

        info!(%format, series, bytes = bytes.len(), "Rendered chart");
        Ok(bytes)
    }
}
