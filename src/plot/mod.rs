//! Chart rendering over a basemap.
//!
//! Every chart is a [`Figure`]: it draws onto any plotters drawing area, so
//! the same code produces PNG files, SVG files or in-memory SVG. The
//! `render_*` functions pick the backend from the output extension
//! (`.svg` is SVG, anything else PNG) and render exactly once.
//!
//! Bitmap text needs system fonts; without the `ttf` feature PNG charts are
//! drawn without labels. SVG output always carries its labels.

pub mod basemap;
pub mod clusters;
pub mod comparison;
pub mod hexbin;
pub mod kde;

pub use basemap::Basemap;
pub use clusters::{cluster_colors, render_clusters, ClusterPlot, CLUSTER_COLORS};
pub use comparison::{render_run_comparison, RunComparisonPlot, RunRecord};
pub use hexbin::{hexbin, render_hexbin, HexCell, HexGrid, HexbinConfig, HexbinPlot};
pub use kde::{density_levels, kde_grid, render_kde, DensityGrid, KdeConfig, KdePlot};

use crate::error::{InsightsError, Result};
use crate::gradients::Rgb;
use log::info;
use plotters::coord::Shift;
use plotters::prelude::*;
use std::path::Path;

/// Output size in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlotSize {
    pub width: u32,
    pub height: u32,
}

impl PlotSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl Default for PlotSize {
    fn default() -> Self {
        Self::new(1200, 1200)
    }
}

/// File format of a rendered chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Png,
    Svg,
}

impl OutputFormat {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("svg") => OutputFormat::Svg,
            _ => OutputFormat::Png,
        }
    }

    /// Whether labels can be drawn in this format.
    pub fn draws_text(self) -> bool {
        match self {
            OutputFormat::Svg => true,
            OutputFormat::Png => cfg!(feature = "ttf"),
        }
    }
}

/// A chart that can be drawn onto any plotters backend.
pub trait Figure {
    /// Size used when rendering to a file.
    fn size(&self) -> PlotSize {
        PlotSize::default()
    }

    /// Draw the whole chart onto `root`. Text is skipped when `text` is false.
    fn draw<DB: DrawingBackend>(&self, root: &DrawingArea<DB, Shift>, text: bool) -> Result<()>;
}

/// Draw `figure` into the file at `path`.
pub fn render_to_file<F: Figure, P: AsRef<Path>>(figure: &F, path: P) -> Result<()> {
    let path = path.as_ref();
    let PlotSize { width, height } = figure.size();
    let format = OutputFormat::from_path(path);

    match format {
        OutputFormat::Svg => {
            let root = SVGBackend::new(path, (width, height)).into_drawing_area();
            figure.draw(&root, format.draws_text())?;
            root.present().map_err(plot_err)?;
        }
        OutputFormat::Png => {
            let root = BitMapBackend::new(path, (width, height)).into_drawing_area();
            figure.draw(&root, format.draws_text())?;
            root.present().map_err(plot_err)?;
        }
    }

    info!("[Plot] Wrote {}x{} chart to {}", width, height, path.display());
    Ok(())
}

pub(crate) fn plot_err<E: std::fmt::Display>(e: E) -> InsightsError {
    InsightsError::Plot(e.to_string())
}

impl From<Rgb> for RGBColor {
    fn from(c: Rgb) -> Self {
        RGBColor(c.0, c.1, c.2)
    }
}
