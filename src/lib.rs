//! # Track Insights
//!
//! Analysis and visualization helpers for recorded GPS activities (runs,
//! rides, hikes).
//!
//! This library provides:
//! - GPX loading into [`Activity`] values
//! - Top-N rankings by duration, 3D length and elevation range
//! - Flattened point tables, geometry-aware tables and trajectories
//! - Stop detection and elevation/time deltas between stops
//! - Administrative boundary polygons from an Overpass endpoint
//! - Hexbin, KDE, cluster and run-comparison charts over a basemap
//!
//! ## Features
//!
//! - **`http`** (default) - Overpass client for administrative boundaries
//! - **`plot`** (default) - Chart rendering with plotters
//! - **`ttf`** - Rasterize chart text in PNG output using system fonts
//! - **`parallel`** - Parallel table conversion with rayon
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use track_insights::{load_activities, summary, to_geo_tables, to_tables, to_trajectories};
//!
//! let activities = load_activities("activities/")?;
//! summary::print_top_longest_travel_time(&activities, 3)?;
//!
//! let tables = to_tables(&activities)?;
//! let geo_tables = to_geo_tables(tables);
//! let trajectories = to_trajectories(geo_tables)?;
//! println!("{} trajectories", trajectories.len());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use serde::{Deserialize, Serialize};

pub mod error;
pub use error::{InsightsError, Result};

pub mod units;
pub use units::ms_to_km;

pub mod gradients;
pub use gradients::{Gradient, HeatmapTheme, Rgb};

pub mod geo_utils;

pub mod activity;
pub use activity::{
    load_activities, Activity, ActivityRecord, ElevationExtremes, Track, TrackPoint,
    TrackSegment,
};

pub mod summary;
pub use summary::{RankMetric, RankedActivity};

mod progress;

pub mod table;
pub use table::{to_tables, ActivityTable, PointRow, PointTable};

#[cfg(feature = "parallel")]
pub use table::to_tables_parallel;

pub mod geo_table;
pub use geo_table::{plot_points, to_geo_tables, GeoTable, PointZ};

pub mod trajectory;
pub use trajectory::{to_trajectories, Trajectory};

pub mod stops;
pub use stops::{
    detect_stops, stop_elevation_diff, StopDetectionConfig, StopDiff, StopPoint, StopTable,
};

pub mod boundary;
pub use boundary::{boundary_query, parse_overpass_response, BoundaryFeature, BoundaryTable};

// HTTP module for boundary fetching
#[cfg(feature = "http")]
pub mod http;

#[cfg(feature = "http")]
pub use http::{get_boundary, get_boundary_with, OverpassClient, OverpassConfig};

#[cfg(feature = "plot")]
pub mod plot;

// ============================================================================
// Core Types
// ============================================================================

/// A GPS coordinate with latitude and longitude.
///
/// # Example
/// ```
/// use track_insights::GpsPoint;
/// let point = GpsPoint::new(41.9028, 12.4964); // Roma
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpsPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GpsPoint {
    /// Create a new GPS point.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Check if the point has valid coordinates.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }
}

/// Bounding box in WGS84 degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl Bounds {
    /// Create bounds from GPS points. `None` for empty input.
    pub fn from_points(points: &[GpsPoint]) -> Option<Self> {
        if points.is_empty() {
            return None;
        }
        Some(geo_utils::compute_bounds(points))
    }

    /// Smallest bounds covering both.
    pub fn union(&self, other: &Bounds) -> Bounds {
        Bounds {
            min_lat: self.min_lat.min(other.min_lat),
            max_lat: self.max_lat.max(other.max_lat),
            min_lng: self.min_lng.min(other.min_lng),
            max_lng: self.max_lng.max(other.max_lng),
        }
    }

    /// Project the corners to Web Mercator.
    pub fn to_web_mercator_extent(&self) -> Extent {
        let sw = geo_utils::to_web_mercator(&GpsPoint::new(self.min_lat, self.min_lng));
        let ne = geo_utils::to_web_mercator(&GpsPoint::new(self.max_lat, self.max_lng));
        Extent::new(sw.x, ne.x, sw.y, ne.y)
    }
}

/// Coordinate reference system, identified by EPSG code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Crs {
    pub epsg: u32,
}

impl Crs {
    /// Geographic WGS84 degrees.
    pub const WGS84: Crs = Crs { epsg: 4326 };
    /// Spherical Web Mercator meters.
    pub const WEB_MERCATOR: Crs = Crs { epsg: 3857 };

    pub fn from_epsg(epsg: u32) -> Self {
        Self { epsg }
    }
}

impl std::fmt::Display for Crs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EPSG:{}", self.epsg)
    }
}

/// A projected plot coordinate (the `x`/`y` columns of a plot table).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct XyPoint {
    pub x: f64,
    pub y: f64,
}

impl XyPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Display extent in `(min_x, max_x, min_y, max_y)` order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
}

impl Extent {
    pub fn new(min_x: f64, max_x: f64, min_y: f64, max_y: f64) -> Self {
        Self {
            min_x,
            max_x,
            min_y,
            max_y,
        }
    }

    /// Extent enclosing all points. `None` for empty input.
    pub fn from_points(points: &[XyPoint]) -> Option<Self> {
        let first = points.first()?;
        let mut extent = Extent::new(first.x, first.x, first.y, first.y);
        for p in &points[1..] {
            extent.min_x = extent.min_x.min(p.x);
            extent.max_x = extent.max_x.max(p.x);
            extent.min_y = extent.min_y.min(p.y);
            extent.max_y = extent.max_y.max(p.y);
        }
        Some(extent)
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn contains(&self, p: &XyPoint) -> bool {
        p.x >= self.min_x && p.x <= self.max_x && p.y >= self.min_y && p.y <= self.max_y
    }

    /// Grow each side by `fraction` of the width/height.
    pub fn padded(&self, fraction: f64) -> Extent {
        let dx = self.width() * fraction;
        let dy = self.height() * fraction;
        Extent::new(self.min_x - dx, self.max_x + dx, self.min_y - dy, self.max_y + dy)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gps_point_validation() {
        assert!(GpsPoint::new(41.9028, 12.4964).is_valid());
        assert!(!GpsPoint::new(91.0, 0.0).is_valid());
        assert!(!GpsPoint::new(0.0, 181.0).is_valid());
        assert!(!GpsPoint::new(f64::NAN, 0.0).is_valid());
    }

    #[test]
    fn test_bounds_from_points() {
        assert!(Bounds::from_points(&[]).is_none());

        let bounds = Bounds::from_points(&[
            GpsPoint::new(45.0, 7.0),
            GpsPoint::new(46.0, 8.0),
        ])
        .unwrap();
        assert_eq!(bounds.min_lat, 45.0);
        assert_eq!(bounds.max_lng, 8.0);

        let other = Bounds::from_points(&[GpsPoint::new(44.0, 7.5)]).unwrap();
        let both = bounds.union(&other);
        assert_eq!(both.min_lat, 44.0);
        assert_eq!(both.max_lat, 46.0);
    }

    #[test]
    fn test_crs_display() {
        assert_eq!(Crs::WGS84.to_string(), "EPSG:4326");
        assert_eq!(Crs::from_epsg(3857), Crs::WEB_MERCATOR);
    }

    #[test]
    fn test_extent_from_points() {
        assert!(Extent::from_points(&[]).is_none());

        let extent = Extent::from_points(&[
            XyPoint::new(1.0, 5.0),
            XyPoint::new(-2.0, 7.0),
            XyPoint::new(4.0, 6.0),
        ])
        .unwrap();
        assert_eq!(extent, Extent::new(-2.0, 4.0, 5.0, 7.0));
        assert_eq!(extent.width(), 6.0);
        assert_eq!(extent.height(), 2.0);
        assert!(extent.contains(&XyPoint::new(0.0, 6.0)));
        assert!(!extent.contains(&XyPoint::new(5.0, 6.0)));
    }

    #[test]
    fn test_extent_padded() {
        let a = Extent::new(0.0, 10.0, 0.0, 20.0);
        assert_eq!(a.padded(0.1), Extent::new(-1.0, 11.0, -2.0, 22.0));
        assert_eq!(a.padded(0.0), a);
    }
}
