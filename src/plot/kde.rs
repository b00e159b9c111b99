//! Kernel density heatmap.
//!
//! Density comes from a 2D Gaussian kernel with full covariance and Scott's
//! bandwidth (`n^(-1/6)`). It is evaluated on a regular grid that extends
//! three bandwidths past the data. Filled contours are drawn at
//! iso-proportion levels: level `p` encloses the densest cells holding a
//! fraction `1 - p` of the total mass, for `p` evenly spaced from
//! `threshold` to 1.

use super::basemap::Basemap;
use super::{plot_err, render_to_file, Figure, PlotSize};
use crate::error::{InsightsError, Result};
use crate::gradients::Gradient;
use crate::{Extent, XyPoint};
use log::debug;
use plotters::coord::Shift;
use plotters::prelude::*;
use std::f64::consts::PI;
use std::path::Path;

/// KDE chart settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KdeConfig {
    /// Number of contour levels
    pub levels: usize,
    /// Fill opacity
    pub alpha: f64,
    /// Grid cells per axis
    pub grid_size: usize,
    /// Lowest iso-proportion level; mass below it is left unfilled
    pub threshold: f64,
    /// Bandwidth multiplier
    pub bandwidth_adjust: f64,
}

impl Default for KdeConfig {
    fn default() -> Self {
        Self {
            levels: 10,
            alpha: 0.3,
            grid_size: 100,
            threshold: 0.05,
            bandwidth_adjust: 1.0,
        }
    }
}

/// Density values on a regular grid, row-major from the bottom row.
#[derive(Debug, Clone, PartialEq)]
pub struct DensityGrid {
    pub extent: Extent,
    pub nx: usize,
    pub ny: usize,
    pub values: Vec<f64>,
}

impl DensityGrid {
    pub fn value(&self, i: usize, j: usize) -> f64 {
        self.values[j * self.nx + i]
    }

    pub fn cell_width(&self) -> f64 {
        self.extent.width() / (self.nx - 1).max(1) as f64
    }

    pub fn cell_height(&self) -> f64 {
        self.extent.height() / (self.ny - 1).max(1) as f64
    }

    /// Center of grid node `(i, j)`.
    pub fn node(&self, i: usize, j: usize) -> XyPoint {
        XyPoint::new(
            self.extent.min_x + i as f64 * self.cell_width(),
            self.extent.min_y + j as f64 * self.cell_height(),
        )
    }
}

fn mean(values: impl Iterator<Item = f64> + Clone) -> f64 {
    let n = values.clone().count().max(1) as f64;
    values.sum::<f64>() / n
}

/// Evaluate the kernel density of `points` on a `grid_size` square grid.
///
/// Needs at least two points that are not all on one line.
pub fn kde_grid(
    points: &[XyPoint],
    grid_size: usize,
    bandwidth_adjust: f64,
) -> Result<DensityGrid> {
    if grid_size < 2 {
        return Err(InsightsError::InvalidParameter(
            "KDE grid needs at least 2 nodes per axis".into(),
        ));
    }
    if points.len() < 2 {
        return Err(InsightsError::InvalidParameter(format!(
            "KDE needs at least 2 points, got {}",
            points.len()
        )));
    }

    let n = points.len() as f64;
    let mx = mean(points.iter().map(|p| p.x));
    let my = mean(points.iter().map(|p| p.y));

    // Unbiased sample covariance
    let (mut sxx, mut syy, mut sxy) = (0.0, 0.0, 0.0);
    for p in points {
        let (dx, dy) = (p.x - mx, p.y - my);
        sxx += dx * dx;
        syy += dy * dy;
        sxy += dx * dy;
    }
    let (sxx, syy, sxy) = (sxx / (n - 1.0), syy / (n - 1.0), sxy / (n - 1.0));

    let factor = n.powf(-1.0 / 6.0) * bandwidth_adjust;
    let (cxx, cyy, cxy) = (sxx * factor * factor, syy * factor * factor, sxy * factor * factor);
    let det = cxx * cyy - cxy * cxy;
    if det.is_nan() || det <= 1e-12 * cxx * cyy {
        return Err(InsightsError::InvalidParameter(
            "KDE input is degenerate (points are collinear)".into(),
        ));
    }
    let (ixx, iyy, ixy) = (cyy / det, cxx / det, -cxy / det);
    let norm = 1.0 / (2.0 * PI * det.sqrt() * n);

    let Some(data) = Extent::from_points(points) else {
        return Err(InsightsError::InvalidParameter("KDE needs points".into()));
    };
    let (cut_x, cut_y) = (3.0 * cxx.sqrt(), 3.0 * cyy.sqrt());
    let extent = Extent::new(
        data.min_x - cut_x,
        data.max_x + cut_x,
        data.min_y - cut_y,
        data.max_y + cut_y,
    );

    let mut grid = DensityGrid {
        extent,
        nx: grid_size,
        ny: grid_size,
        values: vec![0.0; grid_size * grid_size],
    };

    for j in 0..grid.ny {
        for i in 0..grid.nx {
            let node = grid.node(i, j);
            let sum: f64 = points
                .iter()
                .map(|p| {
                    let (dx, dy) = (node.x - p.x, node.y - p.y);
                    (-0.5 * (ixx * dx * dx + 2.0 * ixy * dx * dy + iyy * dy * dy)).exp()
                })
                .sum();
            grid.values[j * grid.nx + i] = sum * norm;
        }
    }

    debug!(
        "[KDE] {} points on a {}x{} grid, bandwidth factor {:.3}",
        points.len(),
        grid_size,
        grid_size,
        factor
    );
    Ok(grid)
}

/// Density thresholds for `count` iso-proportion levels, ascending.
pub fn density_levels(grid: &DensityGrid, count: usize, threshold: f64) -> Vec<f64> {
    if count == 0 {
        return vec![];
    }
    let mut sorted = grid.values.clone();
    sorted.sort_by(|a, b| b.total_cmp(a));
    let total: f64 = sorted.iter().sum();
    if total <= 0.0 {
        return vec![];
    }

    let mut cumulative = Vec::with_capacity(sorted.len());
    let mut acc = 0.0;
    for v in &sorted {
        acc += v;
        cumulative.push(acc / total);
    }

    let step = if count > 1 { (1.0 - threshold) / (count - 1) as f64 } else { 0.0 };
    (0..count)
        .map(|k| {
            let proportion = threshold + k as f64 * step;
            let target = 1.0 - proportion;
            let idx = cumulative.partition_point(|&c| c < target).min(sorted.len() - 1);
            sorted[idx]
        })
        .collect()
}

/// KDE heatmap over a basemap.
pub struct KdePlot<'a> {
    pub points: &'a [XyPoint],
    pub view: Extent,
    pub basemap: &'a Basemap,
    pub config: KdeConfig,
    pub size: PlotSize,
}

impl Figure for KdePlot<'_> {
    fn size(&self) -> PlotSize {
        self.size
    }

    fn draw<DB: DrawingBackend>(&self, root: &DrawingArea<DB, Shift>, _text: bool) -> Result<()> {
        root.fill(&WHITE).map_err(plot_err)?;
        self.basemap.draw(root, &self.view)?;

        let grid = kde_grid(self.points, self.config.grid_size, self.config.bandwidth_adjust)?;
        let levels = density_levels(&grid, self.config.levels, self.config.threshold);
        let bands = levels.len().saturating_sub(1);
        if bands == 0 {
            return Ok(());
        }

        let mut chart = ChartBuilder::on(root)
            .build_cartesian_2d(self.view.min_x..self.view.max_x, self.view.min_y..self.view.max_y)
            .map_err(plot_err)?;

        let (hw, hh) = (grid.cell_width() / 2.0, grid.cell_height() / 2.0);
        let band_of = |v: f64| -> Option<usize> {
            if v < levels[0] {
                return None;
            }
            Some(levels.partition_point(|&l| l <= v).saturating_sub(1).min(bands - 1))
        };

        let mut cells = Vec::new();
        for j in 0..grid.ny {
            for i in 0..grid.nx {
                if let Some(band) = band_of(grid.value(i, j)) {
                    let t = if bands > 1 { band as f64 / (bands - 1) as f64 } else { 1.0 };
                    let color = RGBColor::from(Gradient::REDS.sample(t)).mix(self.config.alpha);
                    let c = grid.node(i, j);
                    let corners = [(c.x - hw, c.y + hh), (c.x + hw, c.y - hh)];
                    cells.push(Rectangle::new(corners, color.filled()));
                }
            }
        }
        chart.draw_series(cells).map_err(plot_err)?;
        Ok(())
    }
}

/// Render a KDE heatmap of `points` over `basemap` to `path`.
pub fn render_kde<P: AsRef<Path>>(
    points: &[XyPoint],
    view: Extent,
    basemap: &Basemap,
    config: KdeConfig,
    path: P,
) -> Result<()> {
    render_to_file(
        &KdePlot {
            points,
            view,
            basemap,
            config,
            size: PlotSize::new(1500, 1500),
        },
        path,
    )
}
