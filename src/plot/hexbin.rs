//! Hexagonal binning of plot points.
//!
//! Two interleaved rectangular lattices cover the data: lattice A has its
//! centers on the grid corners, lattice B in the middle of each grid cell.
//! Each point goes to the nearer center (vertical distances scaled by 3 so
//! that cells are regular hexagons in index space).

use super::basemap::Basemap;
use super::{plot_err, render_to_file, Figure, PlotSize};
use crate::error::{InsightsError, Result};
use crate::gradients::Gradient;
use crate::{Extent, XyPoint};
use log::debug;
use plotters::coord::Shift;
use plotters::prelude::*;
use std::collections::HashMap;
use std::path::Path;

/// Hexbin chart settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HexbinConfig {
    /// Number of hexagons across the x range
    pub grid_size: usize,
    /// Fill opacity
    pub alpha: f64,
    /// Draw a count scale next to the map
    pub colorbar: bool,
}

impl Default for HexbinConfig {
    fn default() -> Self {
        Self {
            grid_size: 100,
            alpha: 0.6,
            colorbar: true,
        }
    }
}

/// One non-empty hexagon.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HexCell {
    pub center: XyPoint,
    pub count: usize,
}

/// Binned points. Only cells holding at least one point are kept.
#[derive(Debug, Clone, PartialEq)]
pub struct HexGrid {
    cells: Vec<HexCell>,
    /// Lattice spacing along x and y
    sx: f64,
    sy: f64,
}

impl HexGrid {
    pub fn cells(&self) -> &[HexCell] {
        &self.cells
    }

    pub fn max_count(&self) -> usize {
        self.cells.iter().map(|c| c.count).max().unwrap_or(0)
    }

    pub fn total_count(&self) -> usize {
        self.cells.iter().map(|c| c.count).sum()
    }

    /// Hexagon outline around `center`, pointy side up.
    pub fn hexagon(&self, center: XyPoint) -> Vec<(f64, f64)> {
        const UNIT: [(f64, f64); 6] = [
            (0.5, -0.5),
            (0.5, 0.5),
            (0.0, 1.0),
            (-0.5, 0.5),
            (-0.5, -0.5),
            (0.0, -1.0),
        ];
        UNIT.iter()
            .map(|(ux, uy)| (center.x + ux * self.sx, center.y + uy * self.sy / 3.0))
            .collect()
    }
}

/// Lattice cell key: lattice flag plus column/row.
type HexCoord = (bool, i64, i64);

/// Bin `points` into hexagons, `grid_size` across the x range.
pub fn hexbin(points: &[XyPoint], grid_size: usize) -> Result<HexGrid> {
    if grid_size == 0 {
        return Err(InsightsError::InvalidParameter("hexbin grid size must be positive".into()));
    }
    let nx = grid_size as f64;
    let ny = ((grid_size as f64) / 3f64.sqrt()).floor().max(1.0);

    let Some(extent) = Extent::from_points(points) else {
        return Ok(HexGrid {
            cells: vec![],
            sx: 1.0,
            sy: 1.0,
        });
    };
    let (xmin, xmax) = nonsingular(extent.min_x, extent.max_x);
    let (ymin, ymax) = nonsingular(extent.min_y, extent.max_y);
    let pad = 1e-9 * (xmax - xmin);
    let (xmin, xmax) = (xmin - pad, xmax + pad);

    let sx = (xmax - xmin) / nx;
    let sy = (ymax - ymin) / ny;

    let mut counts: HashMap<HexCoord, usize> = HashMap::new();
    for p in points {
        let ix = (p.x - xmin) / sx;
        let iy = (p.y - ymin) / sy;

        let (ix1, iy1) = (ix.round(), iy.round());
        let (ix2, iy2) = (ix.floor(), iy.floor());
        let d1 = (ix - ix1).powi(2) + 3.0 * (iy - iy1).powi(2);
        let d2 = (ix - ix2 - 0.5).powi(2) + 3.0 * (iy - iy2 - 0.5).powi(2);

        let key = if d1 < d2 {
            (true, ix1 as i64, iy1 as i64)
        } else {
            (false, ix2 as i64, iy2 as i64)
        };
        *counts.entry(key).or_insert(0) += 1;
    }

    let mut cells: Vec<HexCell> = counts
        .into_iter()
        .map(|((corner, i, j), count)| {
            let offset = if corner { 0.0 } else { 0.5 };
            HexCell {
                center: XyPoint::new(
                    xmin + (i as f64 + offset) * sx,
                    ymin + (j as f64 + offset) * sy,
                ),
                count,
            }
        })
        .collect();
    cells.sort_by(|a, b| {
        a.center
            .y
            .total_cmp(&b.center.y)
            .then(a.center.x.total_cmp(&b.center.x))
    });

    debug!("[Hexbin] {} points into {} cells", points.len(), cells.len());
    Ok(HexGrid { cells, sx, sy })
}

/// Widen a degenerate range so the grid has a non-zero size.
fn nonsingular(lo: f64, hi: f64) -> (f64, f64) {
    if hi - lo > f64::EPSILON * lo.abs().max(hi.abs()).max(1.0) {
        return (lo, hi);
    }
    if lo == 0.0 {
        (-0.1, 0.1)
    } else {
        (lo - 0.1 * lo.abs(), hi + 0.1 * hi.abs())
    }
}

/// Hexbin density over a basemap.
pub struct HexbinPlot<'a> {
    pub points: &'a [XyPoint],
    /// Visible map extent
    pub view: Extent,
    pub basemap: &'a Basemap,
    pub config: HexbinConfig,
    pub size: PlotSize,
}

const COLORBAR_WIDTH: u32 = 120;

impl Figure for HexbinPlot<'_> {
    fn size(&self) -> PlotSize {
        self.size
    }

    fn draw<DB: DrawingBackend>(&self, root: &DrawingArea<DB, Shift>, text: bool) -> Result<()> {
        root.fill(&WHITE).map_err(plot_err)?;
        let grid = hexbin(self.points, self.config.grid_size)?;

        let (w, _) = root.dim_in_pixel();
        let (map_area, bar_area) = if self.config.colorbar && w > COLORBAR_WIDTH * 2 {
            let (map, bar) = root.split_horizontally(w - COLORBAR_WIDTH);
            (map, Some(bar))
        } else {
            (root.clone(), None)
        };

        self.basemap.draw(&map_area, &self.view)?;

        let mut chart = ChartBuilder::on(&map_area)
            .build_cartesian_2d(self.view.min_x..self.view.max_x, self.view.min_y..self.view.max_y)
            .map_err(plot_err)?;

        let max = grid.max_count().max(1) as f64;
        chart
            .draw_series(grid.cells().iter().map(|cell| {
                let color = RGBColor::from(Gradient::REDS.sample(cell.count as f64 / max));
                Polygon::new(grid.hexagon(cell.center), color.mix(self.config.alpha).filled())
            }))
            .map_err(plot_err)?;

        if let Some(bar) = bar_area {
            draw_colorbar(&bar, grid.max_count(), self.config.alpha, text)?;
        }
        Ok(())
    }
}

/// Vertical count scale: gradient strip with min, mid and max labels.
fn draw_colorbar<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    max: usize,
    alpha: f64,
    text: bool,
) -> Result<()> {
    let (_, h) = area.dim_in_pixel();
    let (top, bottom) = (h as i32 / 10, h as i32 - h as i32 / 10);
    let (left, right) = (20, 50);
    let span = (bottom - top).max(1);

    for y in top..bottom {
        let t = (bottom - y) as f64 / span as f64;
        let color = RGBColor::from(Gradient::REDS.sample(t)).mix(alpha);
        area.draw(&Rectangle::new([(left, y), (right, y + 1)], color.filled()))
            .map_err(plot_err)?;
    }
    area.draw(&Rectangle::new([(left, top), (right, bottom)], BLACK.stroke_width(1)))
        .map_err(plot_err)?;

    if text {
        let style = ("sans-serif", 16).into_font().color(&BLACK);
        for (t, value) in [(0.0, 0.0), (0.5, max as f64 / 2.0), (1.0, max as f64)] {
            let y = bottom - (t * span as f64) as i32;
            area.draw(&Text::new(format!("{:.0}", value), (right + 8, y - 8), style.clone()))
                .map_err(plot_err)?;
        }
    }
    Ok(())
}

/// Render a hexbin chart of `points` over `basemap` to `path`.
pub fn render_hexbin<P: AsRef<Path>>(
    points: &[XyPoint],
    view: Extent,
    basemap: &Basemap,
    config: HexbinConfig,
    path: P,
) -> Result<()> {
    render_to_file(
        &HexbinPlot {
            points,
            view,
            basemap,
            config,
            size: PlotSize::default(),
        },
        path,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plot::tests::{grey_basemap, render_svg, two_blobs};

    #[test]
    fn test_counts_preserved() {
        let points = two_blobs();
        let grid = hexbin(&points, 10).unwrap();
        assert_eq!(grid.total_count(), points.len());
        assert!(grid.cells().iter().all(|c| c.count > 0));
    }

    #[test]
    fn test_coincident_points_share_cell() {
        let points = vec![
            XyPoint::new(0.0, 0.0),
            XyPoint::new(10.0, 10.0),
            XyPoint::new(10.0, 10.0),
            XyPoint::new(10.0, 10.0),
        ];
        let grid = hexbin(&points, 4).unwrap();
        assert_eq!(grid.max_count(), 3);
        assert_eq!(grid.cells().len(), 2);
    }

    #[test]
    fn test_single_point_and_empty_input() {
        let grid = hexbin(&[XyPoint::new(5.0, 5.0)], 20).unwrap();
        assert_eq!(grid.cells().len(), 1);
        assert_eq!(grid.max_count(), 1);

        assert!(hexbin(&[], 20).unwrap().cells().is_empty());
    }

    #[test]
    fn test_zero_grid_size_rejected() {
        assert!(matches!(
            hexbin(&two_blobs(), 0),
            Err(InsightsError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_hexagon_is_centered() {
        let grid = hexbin(&two_blobs(), 10).unwrap();
        let center = grid.cells()[0].center;
        let hex = grid.hexagon(center);
        assert_eq!(hex.len(), 6);
        let cx: f64 = hex.iter().map(|p| p.0).sum::<f64>() / 6.0;
        let cy: f64 = hex.iter().map(|p| p.1).sum::<f64>() / 6.0;
        assert!((cx - center.x).abs() < 1e-9);
        assert!((cy - center.y).abs() < 1e-9);
    }

    #[test]
    fn test_draw_svg_with_colorbar() {
        let view = Extent::new(50.0, 350.0, 50.0, 300.0);
        let basemap = grey_basemap(view);
        let points = two_blobs();
        let plot = HexbinPlot {
            points: &points,
            view,
            basemap: &basemap,
            config: HexbinConfig {
                grid_size: 8,
                ..Default::default()
            },
            size: PlotSize::new(300, 150),
        };
        let svg = render_svg(&plot, (300, 150));
        assert!(svg.contains("<svg"));
        assert!(svg.contains("<polygon"));
        assert_eq!(svg.matches("<image").count(), 1);
    }

    #[test]
    fn test_render_png_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hexbin.png");
        let view = Extent::new(50.0, 350.0, 50.0, 300.0);
        let basemap = grey_basemap(view);

        render_hexbin(
            &two_blobs(),
            view,
            &basemap,
            HexbinConfig {
                grid_size: 8,
                colorbar: false,
                ..Default::default()
            },
            &path,
        )
        .unwrap();
        assert!(path.exists());
    }
}
