//! Image encoding for a finished [`Plot`].

pub mod canvas;

use crate::models::OutputFormat;
use crate::pipeline::Plot;
use crate::Result;

pub use self::canvas::PlottersRenderer;

/// Turns a plot into encoded image bytes. Implementations are blocking and
/// run off the async executor.
pub trait Renderer: Send + Sync {
    fn render(&self, plot: &Plot, format: OutputFormat) -> Result<Vec<u8>>;
}
