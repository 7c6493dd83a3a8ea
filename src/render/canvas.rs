use std::fmt::Debug;
use std::io::Cursor;
use std::sync::Once;

use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};

use super::Renderer;
use crate::models::{self, OutputFormat};
use crate::pipeline::axis::{Tick, Ticker};
use crate::pipeline::Plot;
use crate::{ChartError, Result};

pub const DPI: f64 = 96.0;
const MAX_SIDE_PX: u32 = 8192;
/// Bounds the RGB buffer of a PNG render to 48 MiB.
const MAX_PIXELS: u64 = 4096 * 4096;

const FONT: &str = "sans-serif";
const TICK_FONT_PX: u32 = 12;
const TITLE_FONT_PX: u32 = 16;
const MAJOR_TICK_PX: i32 = 6;
const MINOR_TICK_PX: i32 = 3;

const MAJOR_GRID: RGBAColor = RGBAColor(220, 220, 220, 1.0);
const MINOR_GRID: RGBAColor = RGBAColor(240, 240, 240, 1.0);

static INIT_FONTS: Once = Once::new();

/// ab_glyph does not look up system fonts, so the bundled face is
/// registered under the family name used for every label.
fn ensure_fonts_registered() {
    INIT_FONTS.call_once(|| {
        if let Err(_e) = plotters::style::register_font(
            FONT,
            FontStyle::Normal,
            include_bytes!("../../assets/DejaVuSans.ttf"),
        ) {
            tracing::error!("Failed to register chart font");
        }
    });
}

/// Draws plots with `plotters`: SVG into a string, PNG into an RGB buffer
/// encoded with `image`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlottersRenderer;

impl PlottersRenderer {
    pub fn new() -> Self {
        Self
    }
}

impl Renderer for PlottersRenderer {
    fn render(&self, plot: &Plot, format: OutputFormat) -> Result<Vec<u8>> {
        let size = pixel_size(plot)?;
        ensure_fonts_registered();
        match format {
            OutputFormat::Svg => render_svg(plot, size),
            OutputFormat::Png => render_png(plot, size),
        }
    }
}

fn pixel_size(plot: &Plot) -> Result<(u32, u32)> {
    let side = |inches: f64| -> Result<u32> {
        let px = (inches * DPI).round();
        if !px.is_finite() || px < 1.0 {
            return Err(ChartError::Render(format!("{} inches is too small to draw", inches)));
        }
        if px > MAX_SIDE_PX as f64 {
            return Err(ChartError::Render(format!(
                "{} inches exceeds the {} pixel limit",
                inches, MAX_SIDE_PX
            )));
        }
        Ok(px as u32)
    };
    let (width, height) = (side(plot.width_inches)?, side(plot.height_inches)?);
    if width as u64 * height as u64 > MAX_PIXELS {
        return Err(ChartError::Render(format!(
            "{}x{} pixels exceeds the {} pixel area limit",
            width, height, MAX_PIXELS
        )));
    }
    Ok((width, height))
}

fn render_err<E: Debug>(e: E) -> ChartError {
    ChartError::Render(format!("{:?}", e))
}

fn render_svg(plot: &Plot, size: (u32, u32)) -> Result<Vec<u8>> {
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, size).into_drawing_area();
        draw(&root, plot)?;
        root.present().map_err(render_err)?;
    }
    Ok(svg.into_bytes())
}

fn render_png(plot: &Plot, (width, height): (u32, u32)) -> Result<Vec<u8>> {
    let mut buffer = vec![0u8; width as usize * height as usize * 3];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
        draw(&root, plot)?;
        root.present().map_err(render_err)?;
    }

    let image = image::RgbImage::from_raw(width, height, buffer)
        .ok_or_else(|| ChartError::Render("bitmap buffer does not match image size".into()))?;
    let mut out = Cursor::new(Vec::new());
    image
        .write_to(&mut out, image::ImageFormat::Png)
        .map_err(|e| ChartError::Render(e.to_string()))?;
    Ok(out.into_inner())
}

fn to_rgba(color: models::Color) -> RGBAColor {
    RGBAColor(color.r, color.g, color.b, color.a as f64 / 255.0)
}

fn text(size: u32, h: HPos, v: VPos) -> TextStyle<'static> {
    (FONT, size).into_font().color(&BLACK).pos(Pos::new(h, v))
}

fn draw<DB: DrawingBackend>(root: &DrawingArea<DB, Shift>, plot: &Plot) -> Result<()> {
    root.fill(&WHITE).map_err(render_err)?;

    let (x_lo, x_hi) = plot.x_range();
    let (y_lo, y_hi) = plot.y_range();
    let x_ticks = plot.x_ticks.ticks(x_lo, x_hi);
    let y_ticks = plot.y_ticks.ticks(y_lo, y_hi);

    let top = if plot.title.is_some() { 36 } else { 12 };
    let mut chart = ChartBuilder::on(root)
        .margin_top(top)
        .margin_right(24)
        .margin_left(8)
        .margin_bottom(8)
        .x_label_area_size(44)
        .y_label_area_size(64)
        .build_cartesian_2d(x_lo..x_hi, y_lo..y_hi)
        .map_err(render_err)?;

    // Grid
    for tick in &x_ticks {
        let grid = if tick.is_major() { MAJOR_GRID } else { MINOR_GRID };
        chart
            .draw_series(std::iter::once(PathElement::new(
                vec![(tick.value, y_lo), (tick.value, y_hi)],
                grid,
            )))
            .map_err(render_err)?;
    }
    for tick in &y_ticks {
        let grid = if tick.is_major() { MAJOR_GRID } else { MINOR_GRID };
        chart
            .draw_series(std::iter::once(PathElement::new(
                vec![(x_lo, tick.value), (x_hi, tick.value)],
                grid,
            )))
            .map_err(render_err)?;
    }

    // Geometry, back to front.
    for series in plot.in_draw_order() {
        let stroke = ShapeStyle {
            color: to_rgba(series.style.stroke),
            filled: false,
            stroke_width: plot.stroke_width,
        };
        match series.style.fill {
            Some(fill) => {
                chart
                    .draw_series(
                        AreaSeries::new(series.points.iter().copied(), y_lo, to_rgba(fill).filled())
                            .border_style(stroke),
                    )
                    .map_err(render_err)?;
            }
            None if !series.style.stroke.is_transparent() => {
                chart
                    .draw_series(LineSeries::new(series.points.iter().copied(), stroke))
                    .map_err(render_err)?;
            }
            None => {}
        }
    }

    draw_axes(root, &chart, plot, (x_ticks.as_slice(), y_ticks.as_slice()))?;

    // Legend entries in input order, independent of paint order.
    if plot.legend_top && !plot.series.is_empty() {
        for series in &plot.series {
            let swatch = to_rgba(series.style.color);
            chart
                .draw_series(std::iter::empty::<Rectangle<(f64, f64)>>())
                .map_err(render_err)?
                .label(series.legend.clone())
                .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 14, y + 5)], swatch.filled()));
        }
        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperMiddle)
            .background_style(WHITE.mix(0.85))
            .border_style(BLACK)
            .label_font(text(TICK_FONT_PX, HPos::Left, VPos::Center))
            .draw()
            .map_err(render_err)?;
    }

    if let Some(title) = &plot.title {
        let (width, _) = root.dim_in_pixel();
        root.draw(&Text::new(
            title.clone(),
            (width as i32 / 2, 10),
            text(TITLE_FONT_PX, HPos::Center, VPos::Top),
        ))
        .map_err(render_err)?;
    }

    Ok(())
}

fn draw_axes<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    chart: &ChartContext<'_, DB, Cartesian2d<plotters::coord::types::RangedCoordf64, plotters::coord::types::RangedCoordf64>>,
    plot: &Plot,
    (x_ticks, y_ticks): (&[Tick], &[Tick]),
) -> Result<()> {
    let axis = BLACK.to_rgba();
    let (x_px, y_px) = chart.plotting_area().get_pixel_range();
    let (left, right, top, bottom) = (x_px.start, x_px.end, y_px.start, y_px.end);
    let (x_lo, _) = plot.x_range();
    let (y_lo, _) = plot.y_range();

    root.draw(&PathElement::new(vec![(left, bottom), (right, bottom)], axis))
        .map_err(render_err)?;
    root.draw(&PathElement::new(vec![(left, top), (left, bottom)], axis))
        .map_err(render_err)?;

    for tick in x_ticks {
        let (px, _) = chart.backend_coord(&(tick.value, y_lo));
        let len = if tick.is_major() { MAJOR_TICK_PX } else { MINOR_TICK_PX };
        root.draw(&PathElement::new(vec![(px, bottom), (px, bottom + len)], axis))
            .map_err(render_err)?;
        if tick.is_major() {
            root.draw(&Text::new(
                tick.label.clone(),
                (px, bottom + MAJOR_TICK_PX + 4),
                text(TICK_FONT_PX, HPos::Center, VPos::Top),
            ))
            .map_err(render_err)?;
        }
    }

    for tick in y_ticks {
        let (_, py) = chart.backend_coord(&(x_lo, tick.value));
        let len = if tick.is_major() { MAJOR_TICK_PX } else { MINOR_TICK_PX };
        root.draw(&PathElement::new(vec![(left - len, py), (left, py)], axis))
            .map_err(render_err)?;
        if tick.is_major() {
            root.draw(&Text::new(
                tick.label.clone(),
                (left - MAJOR_TICK_PX - 4, py),
                text(TICK_FONT_PX, HPos::Right, VPos::Center),
            ))
            .map_err(render_err)?;
        }
    }

    root.draw(&Text::new(
        plot.x_label.clone(),
        ((left + right) / 2, bottom + 26),
        text(TICK_FONT_PX, HPos::Center, VPos::Top),
    ))
    .map_err(render_err)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::axis::{TickFormatter, TimeTicks, ValueTicks};
    use crate::pipeline::style::{assign, SOFT_COLORS};
    use crate::pipeline::StyledSeries;
    use chrono::{DateTime, Duration};

    fn plot(stacked: bool, title: Option<&str>) -> Plot {
        let start = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let styles = assign(2, stacked, &SOFT_COLORS);
        let xs = [0.0, 60.0, 120.0, 180.0].map(|dx| 1_700_000_000.0 + dx);
        let series = vec![
            StyledSeries {
                legend: "first".to_string(),
                style: styles[0],
                points: xs.iter().copied().zip([1.0, 2.0, 3.0, 4.0]).collect(),
            },
            StyledSeries {
                legend: "second".to_string(),
                style: styles[1],
                points: xs.iter().copied().zip([3.0, 5.0, 7.0, 9.0]).collect(),
            },
        ];
        Plot {
            title: title.map(str::to_string),
            x_label: "Time".to_string(),
            x_ticks: TickFormatter::Time(TimeTicks::new(start, start + Duration::hours(1))),
            y_ticks: TickFormatter::Value(ValueTicks),
            y_min: None,
            y_max: None,
            legend_top: true,
            stroke_width: 1,
            width_inches: 4.0,
            height_inches: 3.0,
            series,
            window: (1_700_000_000.0, 1_700_003_600.0),
        }
    }

    #[test]
    fn test_svg_carries_text_and_paints_back_to_front() {
        let bytes = PlottersRenderer.render(&plot(true, Some("Uptime")), OutputFormat::Svg).unwrap();
        let svg = String::from_utf8(bytes).unwrap();
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("Uptime"));
        assert!(svg.contains("Time"));
        assert!(svg.contains("first") && svg.contains("second"));

        let lower = svg.to_ascii_lowercase();
        let first = lower.find(&SOFT_COLORS[0].hex().to_ascii_lowercase()).unwrap();
        let second = lower.find(&SOFT_COLORS[1].hex().to_ascii_lowercase()).unwrap();
        assert!(second < first, "second series must be painted first");
    }

    #[test]
    fn test_png_has_requested_size() {
        let bytes = PlottersRenderer.render(&plot(false, None), OutputFormat::Png).unwrap();
        assert_eq!(&bytes[..4], &[0x89, b'P', b'N', b'G']);

        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (384, 288));
    }

    #[test]
    fn test_png_draws_title_glyphs() {
        let bytes = PlottersRenderer.render(&plot(false, Some("Uptime")), OutputFormat::Png).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap().to_rgb8();

        // The title sits in the top margin, above the plotting area.
        let inked = (0..36)
            .flat_map(|y| (0..decoded.width()).map(move |x| (x, y)))
            .filter(|&(x, y)| decoded.get_pixel(x, y).0.iter().all(|c| *c < 128))
            .count();
        assert!(inked > 0, "title text should be painted into the PNG");

        let untitled = PlottersRenderer.render(&plot(false, None), OutputFormat::Png).unwrap();
        let untitled = image::load_from_memory(&untitled).unwrap().to_rgb8();
        let blank = (0..8)
            .flat_map(|y| (0..untitled.width()).map(move |x| (x, y)))
            .all(|(x, y)| untitled.get_pixel(x, y).0 == [255, 255, 255]);
        assert!(blank);
    }

    #[test]
    fn test_empty_plot_still_renders() {
        let mut empty = plot(false, None);
        empty.series.clear();
        assert!(PlottersRenderer.render(&empty, OutputFormat::Svg).is_ok());
    }

    #[test]
    fn test_oversized_canvas_is_rejected() {
        let mut huge = plot(false, None);
        huge.width_inches = 1_000.0;
        assert!(matches!(
            PlottersRenderer.render(&huge, OutputFormat::Png),
            Err(ChartError::Render(_))
        ));
    }

    #[test]
    fn test_canvas_area_is_capped() {
        let mut wide = plot(false, None);
        wide.width_inches = 50.0;
        wide.height_inches = 50.0;
        match PlottersRenderer.render(&wide, OutputFormat::Png) {
            Err(ChartError::Render(msg)) => assert!(msg.contains("4800x4800"), "{}", msg),
            other => panic!("expected render error, got {:?}", other.map(|b| b.len())),
        }

        wide.height_inches = 10.0;
        assert!(pixel_size(&wide).is_ok());
    }
}
