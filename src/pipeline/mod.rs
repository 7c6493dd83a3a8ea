//! In-memory stages between the backend response and the renderer.

pub mod axis;
pub mod chart;
pub mod legend;
pub mod normalize;
pub mod stacking;
pub mod style;

pub use self::chart::{ChartBuilder, Plot, StyledSeries};
pub use self::style::StyleConfig;
