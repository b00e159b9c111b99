//! # Geographic Utilities
//!
//! Core geographic computations shared by the table, trajectory, stop and
//! boundary modules.
//!
//! ## Overview
//!
//! | Function | Description |
//! |----------|-------------|
//! | [`haversine_distance`] | Great-circle distance between two GPS points |
//! | [`distance_3d`] | Surface distance combined with an elevation delta |
//! | [`polyline_length`] | Total length of a GPS track in meters |
//! | [`compute_bounds`] | Bounding box of a GPS track |
//! | [`to_web_mercator`] | WGS84 degrees to EPSG:3857 meters |
//!
//! ## Example
//!
//! ```rust
//! use track_insights::{GpsPoint, geo_utils};
//!
//! let track = vec![
//!     GpsPoint::new(41.8902, 12.4922),  // Colosseo
//!     GpsPoint::new(41.8925, 12.4853),
//!     GpsPoint::new(41.8986, 12.4769),
//! ];
//!
//! let length = geo_utils::polyline_length(&track);
//! println!("Track length: {:.0}m", length);
//!
//! let bounds = geo_utils::compute_bounds(&track);
//! println!("Bounds: {:.4}N to {:.4}N", bounds.min_lat, bounds.max_lat);
//! ```
//!
//! ## Coordinate System
//!
//! Inputs are WGS84 degrees (EPSG:4326). Plot coordinates are Web Mercator
//! meters (EPSG:3857), the projection used by tiled basemaps.

use crate::{Bounds, GpsPoint, XyPoint};
use geo::{Distance, Haversine, Point};

/// Spherical earth radius used by EPSG:3857.
pub const WEB_MERCATOR_RADIUS: f64 = 6_378_137.0;

/// Latitude limit of the Web Mercator square.
pub const WEB_MERCATOR_MAX_LAT: f64 = 85.051_128_779_806_59;

// =============================================================================
// Distance Functions
// =============================================================================

/// Great-circle distance between two GPS points in meters.
///
/// # Example
///
/// ```rust
/// use track_insights::{GpsPoint, geo_utils};
///
/// let roma = GpsPoint::new(41.9028, 12.4964);
/// let milano = GpsPoint::new(45.4642, 9.1900);
///
/// let distance = geo_utils::haversine_distance(&roma, &milano);
/// assert!((distance - 477_000.0).abs() < 5_000.0);
/// ```
#[inline]
pub fn haversine_distance(p1: &GpsPoint, p2: &GpsPoint) -> f64 {
    let point1 = Point::new(p1.longitude, p1.latitude);
    let point2 = Point::new(p2.longitude, p2.latitude);
    Haversine::distance(point1, point2)
}

/// Distance between two points including the elevation change.
///
/// Falls back to the surface distance when either elevation is missing.
#[inline]
pub fn distance_3d(p1: &GpsPoint, e1: Option<f64>, p2: &GpsPoint, e2: Option<f64>) -> f64 {
    let surface = haversine_distance(p1, p2);
    match (e1, e2) {
        (Some(a), Some(b)) => (surface * surface + (b - a) * (b - a)).sqrt(),
        _ => surface,
    }
}

/// Total length of a polyline in meters. Empty or single-point input returns 0.0.
pub fn polyline_length(points: &[GpsPoint]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }

    points
        .windows(2)
        .map(|w| haversine_distance(&w[0], &w[1]))
        .sum()
}

// =============================================================================
// Bounding Box Functions
// =============================================================================

/// Compute the bounding box of a GPS track.
///
/// For empty input, returns bounds with MIN/MAX sentinels; use
/// [`Bounds::from_points`] when emptiness must be detected.
///
/// ```rust
/// use track_insights::{GpsPoint, geo_utils};
///
/// let track = vec![
///     GpsPoint::new(45.0700, 7.6800),
///     GpsPoint::new(45.0800, 7.6900),
///     GpsPoint::new(45.0750, 7.6850),
/// ];
///
/// let bounds = geo_utils::compute_bounds(&track);
/// assert_eq!(bounds.min_lat, 45.0700);
/// assert_eq!(bounds.max_lng, 7.6900);
/// ```
pub fn compute_bounds(points: &[GpsPoint]) -> Bounds {
    let mut min_lat = f64::MAX;
    let mut max_lat = f64::MIN;
    let mut min_lng = f64::MAX;
    let mut max_lng = f64::MIN;

    for p in points {
        min_lat = min_lat.min(p.latitude);
        max_lat = max_lat.max(p.latitude);
        min_lng = min_lng.min(p.longitude);
        max_lng = max_lng.max(p.longitude);
    }

    Bounds {
        min_lat,
        max_lat,
        min_lng,
        max_lng,
    }
}

// =============================================================================
// Projection
// =============================================================================

/// Project WGS84 degrees to Web Mercator meters (EPSG:3857).
///
/// Latitudes beyond the Mercator limit are clamped.
#[inline]
pub fn to_web_mercator(point: &GpsPoint) -> XyPoint {
    let lat = point
        .latitude
        .clamp(-WEB_MERCATOR_MAX_LAT, WEB_MERCATOR_MAX_LAT);
    let x = WEB_MERCATOR_RADIUS * point.longitude.to_radians();
    let y = WEB_MERCATOR_RADIUS
        * (std::f64::consts::FRAC_PI_4 + lat.to_radians() / 2.0).tan().ln();
    XyPoint::new(x, y)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
        (a - b).abs() < epsilon
    }

    #[test]
    fn test_haversine_distance_same_point() {
        let p = GpsPoint::new(41.9028, 12.4964);
        assert_eq!(haversine_distance(&p, &p), 0.0);
    }

    #[test]
    fn test_haversine_distance_known_value() {
        // London to Paris is approximately 344 km
        let london = GpsPoint::new(51.5074, -0.1278);
        let paris = GpsPoint::new(48.8566, 2.3522);
        let dist = haversine_distance(&london, &paris);
        assert!(approx_eq(dist, 343_560.0, 5000.0));
    }

    #[test]
    fn test_distance_3d() {
        let a = GpsPoint::new(45.0, 7.0);
        let b = GpsPoint::new(45.0, 7.0);
        // same position, pure climb
        assert!(approx_eq(distance_3d(&a, Some(100.0), &b, Some(130.0)), 30.0, 1e-9));

        let c = GpsPoint::new(45.001, 7.0);
        let flat = haversine_distance(&a, &c);
        assert_eq!(distance_3d(&a, None, &c, Some(500.0)), flat);
        assert!(distance_3d(&a, Some(0.0), &c, Some(50.0)) > flat);
    }

    #[test]
    fn test_polyline_length_empty_and_single() {
        let empty: Vec<GpsPoint> = vec![];
        assert_eq!(polyline_length(&empty), 0.0);
        assert_eq!(polyline_length(&[GpsPoint::new(41.9, 12.5)]), 0.0);
    }

    #[test]
    fn test_polyline_length_two_points() {
        let track = vec![
            GpsPoint::new(51.5074, -0.1278),
            GpsPoint::new(51.5080, -0.1280),
        ];
        let length = polyline_length(&track);
        assert!(length > 0.0);
        assert!(length < 100.0);
    }

    #[test]
    fn test_compute_bounds() {
        let track = vec![
            GpsPoint::new(51.50, -0.13),
            GpsPoint::new(51.51, -0.12),
            GpsPoint::new(51.505, -0.125),
        ];
        let bounds = compute_bounds(&track);
        assert_eq!(bounds.min_lat, 51.50);
        assert_eq!(bounds.max_lat, 51.51);
        assert_eq!(bounds.min_lng, -0.13);
        assert_eq!(bounds.max_lng, -0.12);
    }

    #[test]
    fn test_web_mercator_origin_and_known_value() {
        let origin = to_web_mercator(&GpsPoint::new(0.0, 0.0));
        assert!(approx_eq(origin.x, 0.0, 1e-6));
        assert!(approx_eq(origin.y, 0.0, 1e-6));

        // Roma, reference values from EPSG:3857
        let roma = to_web_mercator(&GpsPoint::new(41.9028, 12.4964));
        assert!(approx_eq(roma.x, 1_391_092.9, 1.0));
        assert!(approx_eq(roma.y, 5_146_430.5, 1.0));
    }

    #[test]
    fn test_web_mercator_clamps_poles() {
        let north = to_web_mercator(&GpsPoint::new(90.0, 0.0));
        assert!(north.y.is_finite());
    }
}
