//! Stop detection and stop-to-stop deltas.
//!
//! A stop is a stretch of a trajectory whose points all fit inside a box of
//! diagonal `max_diameter_m` for at least `min_duration`. Each detected stop
//! becomes one [`StopPoint`] located at its first point, elevation included.

use crate::error::{InsightsError, Result};
use crate::geo_table::PointZ;
use crate::geo_utils::haversine_distance;
use crate::table::{PointRow, PointTable};
use crate::trajectory::Trajectory;
use crate::units::round2;
use crate::{Bounds, GpsPoint};
use chrono::{Duration, NaiveDateTime};
use log::debug;
use serde::{Deserialize, Serialize};

/// Stop detection thresholds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StopDetectionConfig {
    /// Largest extent (bounding box diagonal, meters) a stop may cover
    pub max_diameter_m: f64,
    /// Shortest dwell that counts as a stop
    pub min_duration: Duration,
}

impl Default for StopDetectionConfig {
    fn default() -> Self {
        Self {
            max_diameter_m: 30.0,
            min_duration: Duration::seconds(60),
        }
    }
}

/// A detected dwell location.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StopPoint {
    /// Identifier of the trajectory the stop belongs to
    pub traj_id: usize,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    /// Location with elevation as z
    pub geometry: PointZ,
}

impl StopPoint {
    pub fn duration(&self) -> Duration {
        self.end_time - self.start_time
    }
}

/// Time-ordered stops.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StopTable {
    stops: Vec<StopPoint>,
}

impl StopTable {
    pub fn new(mut stops: Vec<StopPoint>) -> Self {
        stops.sort_by_key(|s| s.start_time);
        Self { stops }
    }

    pub fn stops(&self) -> &[StopPoint] {
        &self.stops
    }

    pub fn len(&self) -> usize {
        self.stops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stops.is_empty()
    }
}

/// Bounding-box diagonal of the rows in meters.
fn diameter(rows: &[PointRow]) -> f64 {
    let positions: Vec<GpsPoint> = rows.iter().map(PointRow::position).collect();
    match Bounds::from_points(&positions) {
        Some(b) => haversine_distance(
            &GpsPoint::new(b.min_lat, b.min_lng),
            &GpsPoint::new(b.max_lat, b.max_lng),
        ),
        None => 0.0,
    }
}

/// Detect stops along a trajectory.
///
/// A window of recent points is trimmed to less than `min_duration` while
/// moving. Once the window fits inside `max_diameter_m` it grows until a
/// point leaves the box; the stretch is kept if it lasted `min_duration`.
pub fn detect_stops(traj: &Trajectory, config: &StopDetectionConfig) -> StopTable {
    let rows = traj.rows();
    let time = |i: usize| rows[i].time.unwrap_or_default();

    let mut stops = Vec::new();
    let mut start = 0;
    let mut stopped = false;

    let push_stop = |first: usize, last: usize, stops: &mut Vec<StopPoint>| {
        if time(last) - time(first) >= config.min_duration {
            stops.push(StopPoint {
                traj_id: traj.id(),
                start_time: time(first),
                end_time: time(last),
                geometry: PointZ::from(&rows[first]),
            });
        }
    };

    for i in 0..rows.len() {
        if !stopped {
            while i - start + 1 > 2 && time(i) - time(start) >= config.min_duration {
                start += 1;
            }
        }

        let now_stopped = i > start && diameter(&rows[start..=i]) < config.max_diameter_m;

        if stopped && !now_stopped {
            push_stop(start, i - 1, &mut stops);
            start = i;
        }
        stopped = now_stopped;
    }

    if stopped {
        push_stop(start, rows.len() - 1, &mut stops);
    }

    debug!("[Stops] Trajectory {} -> {} stops", traj.id(), stops.len());
    StopTable::new(stops)
}

/// A stop with its deltas from the previous stop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StopDiff {
    pub stop: StopPoint,
    /// Meters climbed since the previous stop, rounded to 2 decimals
    pub elevation_diff: f64,
    /// Time since the previous stop ended
    pub time_diff: Duration,
}

/// Elevation and time differences between consecutive stops.
///
/// The first stop is compared with the first point of `start`: its z minus
/// the start elevation, and its start time minus the start timestamp. Every
/// later stop is compared with the one before it: z difference, and its
/// start time minus the previous stop's end time.
pub fn stop_elevation_diff(stops: &StopTable, start: &Trajectory) -> Result<Vec<StopDiff>> {
    let first = stops.stops().first().ok_or(InsightsError::EmptyStopTable)?;

    let start_elevation = start.start_elevation().ok_or_else(|| {
        InsightsError::MissingElevation(format!(
            "trajectory {} has no elevation at its first point",
            start.id()
        ))
    })?;
    let z = |i: usize, stop: &StopPoint| {
        stop.geometry.z.ok_or_else(|| {
            InsightsError::MissingElevation(format!("stop {} has no z coordinate", i))
        })
    };

    let mut diffs = Vec::with_capacity(stops.len());
    diffs.push(StopDiff {
        stop: *first,
        elevation_diff: round2(z(0, first)? - start_elevation),
        time_diff: first.start_time - start.start_time(),
    });

    for (i, pair) in stops.stops().windows(2).enumerate() {
        let (prev, stop) = (&pair[0], &pair[1]);
        diffs.push(StopDiff {
            stop: *stop,
            elevation_diff: round2(z(i + 1, stop)? - z(i, prev)?),
            time_diff: stop.start_time - prev.end_time,
        });
    }

    Ok(diffs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo_table::GeoTable;
    use chrono::NaiveDate;

    fn at(secs: i64) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 10)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap()
            + Duration::seconds(secs)
    }

    fn traj(points: &[(f64, Option<f64>, i64)]) -> Trajectory {
        let rows = points
            .iter()
            .map(|&(lat, ele, secs)| PointRow::new(12.5, lat, ele, Some(at(secs))))
            .collect();
        Trajectory::new(GeoTable::from_rows(rows), 0).unwrap()
    }

    fn stop(start: i64, end: i64, z: Option<f64>) -> StopPoint {
        StopPoint {
            traj_id: 0,
            start_time: at(start),
            end_time: at(end),
            geometry: PointZ::new(12.5, 41.9, z),
        }
    }

    fn two_stop_ride() -> Trajectory {
        traj(&[
            (41.900, Some(5.0), 0),
            (41.902, Some(8.0), 30),
            (41.904, Some(10.0), 60),
            (41.90401, Some(10.0), 90),
            (41.90402, Some(10.0), 120),
            (41.90401, Some(10.0), 150),
            (41.906, Some(18.0), 180),
            (41.908, Some(25.0), 210),
            (41.90801, Some(25.0), 240),
            (41.90802, Some(25.0), 270),
            (41.908, Some(25.0), 300),
        ])
    }

    #[test]
    fn test_detect_two_stops() {
        let stops = detect_stops(&two_stop_ride(), &StopDetectionConfig::default());
        assert_eq!(stops.len(), 2);

        let a = stops.stops()[0];
        assert_eq!(a.start_time, at(60));
        assert_eq!(a.end_time, at(150));
        assert_eq!(a.geometry, PointZ::new(12.5, 41.904, Some(10.0)));

        let b = stops.stops()[1];
        assert_eq!(b.start_time, at(210));
        assert_eq!(b.end_time, at(300));
        assert_eq!(b.duration(), Duration::seconds(90));
    }

    #[test]
    fn test_short_dwell_is_not_a_stop() {
        let config = StopDetectionConfig {
            min_duration: Duration::seconds(120),
            ..Default::default()
        };
        assert!(detect_stops(&two_stop_ride(), &config).is_empty());
    }

    #[test]
    fn test_constant_motion_has_no_stops() {
        let t = traj(&[
            (41.900, None, 0),
            (41.901, None, 30),
            (41.902, None, 60),
            (41.903, None, 90),
        ]);
        assert!(detect_stops(&t, &StopDetectionConfig::default()).is_empty());
    }

    #[test]
    fn test_three_stop_deltas() {
        let start = traj(&[(41.900, Some(12.345), 0), (41.901, Some(13.0), 30)]);
        let stops = StopTable::new(vec![
            stop(300, 420, Some(20.0)),
            stop(900, 960, Some(17.555)),
            stop(1500, 1800, Some(40.1)),
        ]);

        let diffs = stop_elevation_diff(&stops, &start).unwrap();
        assert_eq!(diffs.len(), 3);

        assert_eq!(diffs[0].elevation_diff, round2(20.0 - 12.345));
        assert_eq!(diffs[0].elevation_diff, 7.65);
        assert_eq!(diffs[0].time_diff, Duration::seconds(300));

        assert_eq!(diffs[1].elevation_diff, round2(17.555 - 20.0));
        assert_eq!(diffs[1].time_diff, Duration::seconds(900 - 420));

        assert_eq!(diffs[2].elevation_diff, round2(40.1 - 17.555));
        assert_eq!(diffs[2].time_diff, Duration::seconds(1500 - 960));
        assert_eq!(diffs[2].stop, stops.stops()[2]);
    }

    #[test]
    fn test_input_table_left_untouched() {
        let start = traj(&[(41.900, Some(0.0), 0), (41.901, Some(0.0), 30)]);
        let stops = StopTable::new(vec![stop(60, 120, Some(3.0))]);
        let before = stops.clone();
        stop_elevation_diff(&stops, &start).unwrap();
        assert_eq!(stops, before);
    }

    #[test]
    fn test_empty_or_missing_elevation_errors() {
        let start = traj(&[(41.900, Some(0.0), 0), (41.901, Some(0.0), 30)]);
        let err = stop_elevation_diff(&StopTable::default(), &start).unwrap_err();
        assert!(matches!(err, InsightsError::EmptyStopTable));

        let stops = StopTable::new(vec![stop(60, 120, Some(3.0)), stop(200, 260, None)]);
        let err = stop_elevation_diff(&stops, &start).unwrap_err();
        assert!(matches!(err, InsightsError::MissingElevation(_)));

        let flat = traj(&[(41.900, None, 0), (41.901, None, 30)]);
        let stops = StopTable::new(vec![stop(60, 120, Some(3.0))]);
        assert!(matches!(
            stop_elevation_diff(&stops, &flat).unwrap_err(),
            InsightsError::MissingElevation(_)
        ));
    }
}
