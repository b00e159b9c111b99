//! Cluster scatter over a basemap.
//!
//! Labels are normalized between their minimum and maximum and mapped onto
//! a fixed seven-color list, the lowest label grey and the highest green.

use super::basemap::Basemap;
use super::{plot_err, render_to_file, Figure, PlotSize};
use crate::error::{InsightsError, Result};
use crate::gradients::Rgb;
use crate::{Extent, XyPoint};
use plotters::coord::Shift;
use plotters::prelude::*;
use std::path::Path;

/// grey, yellow, blue, purple, red, orange, green
pub const CLUSTER_COLORS: [Rgb; 7] = [
    Rgb::hex(0x808080),
    Rgb::hex(0xFFFF00),
    Rgb::hex(0x0000FF),
    Rgb::hex(0x800080),
    Rgb::hex(0xFF0000),
    Rgb::hex(0xFFA500),
    Rgb::hex(0x008000),
];

const POINT_RADIUS: u32 = 3;

/// Color of each label. A single distinct label maps to the first color.
pub fn cluster_colors(labels: &[i64]) -> Vec<Rgb> {
    let (Some(&min), Some(&max)) = (labels.iter().min(), labels.iter().max()) else {
        return vec![];
    };
    let n = CLUSTER_COLORS.len();
    labels
        .iter()
        .map(|&l| {
            let idx = if max > min {
                let t = (l - min) as f64 / (max - min) as f64;
                ((t * n as f64).floor() as usize).min(n - 1)
            } else {
                0
            };
            CLUSTER_COLORS[idx]
        })
        .collect()
}

/// Labeled points over a basemap. The view is the basemap extent.
pub struct ClusterPlot<'a> {
    pub points: &'a [XyPoint],
    pub labels: &'a [i64],
    pub basemap: &'a Basemap,
    pub size: PlotSize,
}

impl Figure for ClusterPlot<'_> {
    fn size(&self) -> PlotSize {
        self.size
    }

    fn draw<DB: DrawingBackend>(&self, root: &DrawingArea<DB, Shift>, _text: bool) -> Result<()> {
        if self.points.len() != self.labels.len() {
            return Err(InsightsError::InvalidParameter(format!(
                "{} points but {} labels",
                self.points.len(),
                self.labels.len()
            )));
        }

        let view = self.basemap.extent();
        root.fill(&WHITE).map_err(plot_err)?;
        self.basemap.draw(root, &view)?;

        let mut chart = ChartBuilder::on(root)
            .build_cartesian_2d(view.min_x..view.max_x, view.min_y..view.max_y)
            .map_err(plot_err)?;

        let colors = cluster_colors(self.labels);
        chart
            .draw_series(self.points.iter().zip(colors).map(|(p, c)| {
                Circle::new((p.x, p.y), POINT_RADIUS, RGBColor::from(c).filled())
            }))
            .map_err(plot_err)?;
        Ok(())
    }
}

/// Render labeled `points` over `basemap` to `path`.
pub fn render_clusters<P: AsRef<Path>>(
    points: &[XyPoint],
    labels: &[i64],
    basemap: &Basemap,
    path: P,
) -> Result<()> {
    render_to_file(
        &ClusterPlot {
            points,
            labels,
            basemap,
            size: PlotSize::default(),
        },
        path,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plot::tests::{grey_basemap, render_svg};

    #[test]
    fn test_seven_labels_take_each_color() {
        let colors = cluster_colors(&[0, 1, 2, 3, 4, 5, 6]);
        assert_eq!(colors, CLUSTER_COLORS.to_vec());
    }

    #[test]
    fn test_noise_label_is_lowest() {
        let colors = cluster_colors(&[-1, 0, 1]);
        assert_eq!(colors[0], Rgb::hex(0x808080));
        assert_eq!(colors[1], Rgb::hex(0x800080));
        assert_eq!(colors[2], Rgb::hex(0x008000));
    }

    #[test]
    fn test_single_label_and_empty() {
        assert_eq!(cluster_colors(&[3, 3]), vec![CLUSTER_COLORS[0]; 2]);
        assert!(cluster_colors(&[]).is_empty());
    }

    #[test]
    fn test_draw_svg() {
        let extent = Extent::new(0.0, 100.0, 0.0, 100.0);
        let basemap = grey_basemap(extent);
        let points = [XyPoint::new(10.0, 10.0), XyPoint::new(50.0, 60.0), XyPoint::new(90.0, 20.0)];
        let plot = ClusterPlot {
            points: &points,
            labels: &[0, 1, 2],
            basemap: &basemap,
            size: PlotSize::new(100, 100),
        };
        let svg = render_svg(&plot, (100, 100));
        assert_eq!(svg.matches("<circle").count(), 3);
    }

    #[test]
    fn test_label_count_mismatch() {
        let basemap = grey_basemap(Extent::new(0.0, 1.0, 0.0, 1.0));
        let plot = ClusterPlot {
            points: &[XyPoint::new(0.5, 0.5)],
            labels: &[],
            basemap: &basemap,
            size: PlotSize::new(10, 10),
        };
        let mut svg = String::new();
        let root = SVGBackend::with_string(&mut svg, (10, 10)).into_drawing_area();
        assert!(matches!(plot.draw(&root, true), Err(InsightsError::InvalidParameter(_))));
    }
}
