use crate::models::Color;
use crate::{ChartError, Result};

/// Muted palette used when nothing else is configured.
pub const SOFT_COLORS: [Color; 7] = [
    Color::rgb(241, 90, 96),
    Color::rgb(122, 195, 106),
    Color::rgb(90, 155, 212),
    Color::rgb(250, 167, 91),
    Color::rgb(158, 103, 171),
    Color::rgb(206, 112, 88),
    Color::rgb(215, 127, 180),
];

/// Styling shared by every chart. Built once at startup and never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct StyleConfig {
    palette: Vec<Color>,
    pub stroke_width: u32,
}

impl StyleConfig {
    pub fn new(palette: Vec<Color>, stroke_width: u32) -> Result<Self> {
        if palette.is_empty() {
            return Err(ChartError::Config("palette must hold at least one color".into()));
        }
        Ok(Self {
            palette,
            stroke_width: stroke_width.max(1),
        })
    }

    pub fn palette(&self) -> &[Color] {
        &self.palette
    }
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            palette: SOFT_COLORS.to_vec(),
            stroke_width: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StyleDescriptor {
    /// Palette color picked for the series; also its legend swatch.
    pub color: Color,
    /// Line color. Fully transparent for hidden outlines.
    pub stroke: Color,
    pub fill: Option<Color>,
    /// Paint position, 0 is painted first.
    pub draw_order: usize,
}

/// Visual encoding for `count` series, in input order.
///
/// Colors cycle through `palette`. Stacked charts fill every series and only
/// outline the last one. Draw order is the reverse of input order so that the
/// first series ends up on top.
pub fn assign(count: usize, stacked: bool, palette: &[Color]) -> Vec<StyleDescriptor> {
    (0..count)
        .map(|i| {
            let color = if palette.is_empty() {
                Color::BLACK
            } else {
                palette[i % palette.len()]
            };
            let (stroke, fill) = if stacked {
                let stroke = if i + 1 == count { color } else { Color::TRANSPARENT };
                (stroke, Some(color))
            } else {
                (color, None)
            };
            StyleDescriptor {
                color,
                stroke,
                fill,
                draw_order: count - 1 - i,
            }
        })
        .collect()
}
