//! Trajectories: time-ordered, identified point tables.

use crate::error::{InsightsError, Result};
use crate::geo_table::GeoTable;
use crate::geo_utils::haversine_distance;
use crate::progress::progress_bar;
use crate::table::{PointRow, PointTable};
use crate::units::ms_to_km;
use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Minimum number of points a trajectory needs.
pub const MIN_TRAJECTORY_POINTS: usize = 2;

/// One continuous movement path with a sequential identifier.
///
/// Rows are ordered by time and every row carries a timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    id: usize,
    table: GeoTable,
}

impl Trajectory {
    pub fn new(table: GeoTable, id: usize) -> Result<Self> {
        if table.len() < MIN_TRAJECTORY_POINTS {
            return Err(InsightsError::InsufficientPoints {
                id,
                found: table.len(),
                required: MIN_TRAJECTORY_POINTS,
            });
        }
        if let Some(row) = table.rows().iter().position(|r| r.time.is_none()) {
            return Err(InsightsError::MissingTimestamp { id, row });
        }

        let mut rows = table.into_rows();
        // Stable: equal timestamps keep recording order
        rows.sort_by_key(|r| r.time);

        Ok(Self {
            id,
            table: GeoTable::from_rows(rows),
        })
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn table(&self) -> &GeoTable {
        &self.table
    }

    fn time_at(&self, i: usize) -> NaiveDateTime {
        // Every row has a time, checked in new()
        self.table.rows()[i].time.unwrap_or_default()
    }

    pub fn start_time(&self) -> NaiveDateTime {
        self.time_at(0)
    }

    pub fn end_time(&self) -> NaiveDateTime {
        self.time_at(self.table.len() - 1)
    }

    pub fn duration(&self) -> Duration {
        self.end_time() - self.start_time()
    }

    /// Elevation of the first point, if recorded.
    pub fn start_elevation(&self) -> Option<f64> {
        self.table.rows()[0].elevation
    }

    /// Planar length in meters.
    pub fn length(&self) -> f64 {
        self.table.length()
    }

    /// Speed at each point in m/s, from the step arriving at it.
    ///
    /// The first point takes the speed of the second. Steps with no elapsed
    /// time have speed 0.
    pub fn speeds(&self) -> Vec<f64> {
        let rows = self.table.rows();
        let mut speeds = Vec::with_capacity(rows.len());
        speeds.push(0.0);
        for (i, pair) in rows.windows(2).enumerate() {
            let secs = (self.time_at(i + 1) - self.time_at(i)).num_milliseconds() as f64 / 1000.0;
            let meters = step_distance(&pair[0], &pair[1]);
            speeds.push(if secs > 0.0 { meters / secs } else { 0.0 });
        }
        speeds[0] = speeds[1];
        speeds
    }

    /// Average speed over the whole trajectory in km/h.
    pub fn average_speed_kmh(&self) -> f64 {
        let secs = self.duration().num_milliseconds() as f64 / 1000.0;
        if secs <= 0.0 {
            return 0.0;
        }
        ms_to_km(self.length() / secs)
    }
}

impl PointTable for Trajectory {
    fn rows(&self) -> &[PointRow] {
        self.table.rows()
    }
}

fn step_distance(a: &PointRow, b: &PointRow) -> f64 {
    haversine_distance(&a.position(), &b.position())
}

/// Wrap each geometry table into a trajectory identified by its position.
pub fn to_trajectories(tables: Vec<GeoTable>) -> Result<Vec<Trajectory>> {
    let pb = progress_bar(tables.len(), "Building trajectories");
    let mut trajectories = Vec::with_capacity(tables.len());

    for (id, table) in tables.into_iter().enumerate() {
        trajectories.push(Trajectory::new(table, id)?);
        pb.inc(1);
    }

    pb.finish_and_clear();
    Ok(trajectories)
}
