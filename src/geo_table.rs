//! Geometry-aware point tables.
//!
//! A [`GeoTable`] is a flattened table plus a point geometry per row, built
//! from the longitude/latitude/elevation columns, tagged with its CRS
//! (always WGS84 / EPSG:4326 on construction).

use crate::geo_utils;
use crate::progress::progress_bar;
use crate::table::{ActivityTable, PointRow, PointTable};
use crate::{Bounds, Crs, XyPoint};
use geo::{Coord, LineString, Point};
use serde::{Deserialize, Serialize};

/// A point geometry with an optional z (elevation) coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointZ {
    pub x: f64,
    pub y: f64,
    pub z: Option<f64>,
}

impl PointZ {
    pub fn new(x: f64, y: f64, z: Option<f64>) -> Self {
        Self { x, y, z }
    }

    /// The planar part as a `geo` point.
    pub fn point(&self) -> Point<f64> {
        Point::new(self.x, self.y)
    }
}

impl From<&PointRow> for PointZ {
    fn from(row: &PointRow) -> Self {
        PointZ::new(row.longitude, row.latitude, row.elevation)
    }
}

/// A point table with geometry column and CRS tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoTable {
    rows: Vec<PointRow>,
    geometry: Vec<PointZ>,
    crs: Crs,
}

impl GeoTable {
    pub fn from_rows(rows: Vec<PointRow>) -> Self {
        let geometry = rows.iter().map(PointZ::from).collect();
        Self {
            rows,
            geometry,
            crs: Crs::WGS84,
        }
    }

    pub fn from_table(table: ActivityTable) -> Self {
        Self::from_rows(table.into_rows())
    }

    pub fn geometry(&self) -> &[PointZ] {
        &self.geometry
    }

    pub fn crs(&self) -> Crs {
        self.crs
    }

    pub fn bounds(&self) -> Option<Bounds> {
        Bounds::from_points(&self.positions())
    }

    pub fn line_string(&self) -> LineString<f64> {
        LineString::new(
            self.geometry
                .iter()
                .map(|g| Coord { x: g.x, y: g.y })
                .collect(),
        )
    }

    /// Planar length along the points in meters.
    pub fn length(&self) -> f64 {
        geo_utils::polyline_length(&self.positions())
    }

    /// Project every point to Web Mercator for plotting.
    ///
    /// Rows with non-finite or out-of-range coordinates are skipped.
    pub fn to_web_mercator(&self) -> Vec<XyPoint> {
        self.rows
            .iter()
            .map(PointRow::position)
            .filter(|p| p.is_valid())
            .map(|p| geo_utils::to_web_mercator(&p))
            .collect()
    }

    pub(crate) fn into_rows(self) -> Vec<PointRow> {
        self.rows
    }
}

impl PointTable for GeoTable {
    fn rows(&self) -> &[PointRow] {
        &self.rows
    }
}

/// Wrap each flattened table into a geometry-aware table, order preserved.
pub fn to_geo_tables(tables: Vec<ActivityTable>) -> Vec<GeoTable> {
    let pb = progress_bar(tables.len(), "Building geometries");
    let geo_tables = tables
        .into_iter()
        .map(|table| {
            let geo = GeoTable::from_table(table);
            pb.inc(1);
            geo
        })
        .collect();
    pb.finish_and_clear();
    geo_tables
}

/// All points of all tables in Web Mercator, ready for density plots.
pub fn plot_points(tables: &[GeoTable]) -> Vec<XyPoint> {
    tables.iter().flat_map(|t| t.to_web_mercator()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(points: &[(f64, f64, Option<f64>)]) -> ActivityTable {
        ActivityTable::new(
            points
                .iter()
                .map(|&(lon, lat, ele)| PointRow::new(lon, lat, ele, None))
                .collect(),
        )
    }

    #[test]
    fn test_to_geo_tables_preserves_length_and_crs() {
        let tables = vec![
            table(&[(12.50, 41.90, Some(20.0)), (12.51, 41.91, None)]),
            table(&[(7.68, 45.07, Some(240.0))]),
            table(&[]),
        ];
        let geo = to_geo_tables(tables);
        assert_eq!(geo.len(), 3);
        assert!(geo.iter().all(|g| g.crs() == Crs::WGS84));
        assert_eq!(geo[0].len(), 2);
        assert_eq!(geo[1].len(), 1);
        assert!(geo[2].is_empty());
    }

    #[test]
    fn test_geometry_from_columns() {
        let geo = GeoTable::from_table(table(&[(12.50, 41.90, Some(20.0)), (12.51, 41.91, None)]));
        assert_eq!(geo.geometry()[0], PointZ::new(12.50, 41.90, Some(20.0)));
        assert_eq!(geo.geometry()[1].z, None);
        assert_eq!(geo.geometry()[1].point(), Point::new(12.51, 41.91));
    }

    #[test]
    fn test_bounds_and_line() {
        let geo = GeoTable::from_table(table(&[(12.50, 41.90, None), (12.52, 41.89, None)]));
        let b = geo.bounds().unwrap();
        assert_eq!(b.min_lng, 12.50);
        assert_eq!(b.max_lng, 12.52);
        assert_eq!(b.min_lat, 41.89);
        assert_eq!(geo.line_string().0.len(), 2);
        assert!(geo.length() > 1000.0);

        let empty = GeoTable::from_rows(vec![]);
        assert!(empty.bounds().is_none());
        assert_eq!(empty.length(), 0.0);
    }

    #[test]
    fn test_plot_points_concatenates() {
        let geo = to_geo_tables(vec![
            table(&[(0.0, 0.0, None)]),
            table(&[(1.0, 0.0, None), (2.0, 0.0, None)]),
        ]);
        let pts = plot_points(&geo);
        assert_eq!(pts.len(), 3);
        assert!(pts[0].x.abs() < 1e-9);
        assert!(pts[2].x > pts[1].x);
    }

    #[test]
    fn test_plot_points_skip_invalid_coordinates() {
        let geo = to_geo_tables(vec![table(&[
            (12.50, 41.90, None),
            (f64::NAN, 41.90, None),
            (12.50, 95.0, None),
            (12.51, 41.91, None),
        ])]);
        assert_eq!(geo[0].len(), 4);
        assert_eq!(plot_points(&geo).len(), 2);
    }
}
