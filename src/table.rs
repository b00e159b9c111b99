//! Flattened point tables.
//!
//! Each activity's first segment becomes one row per point with the columns
//! `longitude`, `latitude`, `elevation`, `time`. Timestamps lose their
//! offset on the way in: the recorded wall-clock time is kept as a naive
//! datetime.

use crate::activity::{Activity, TrackPoint, TrackSegment};
use crate::error::{InsightsError, Result};
use crate::progress::progress_bar;
use crate::GpsPoint;
use chrono::NaiveDateTime;
use log::debug;
use serde::{Deserialize, Serialize};

/// Column names in row order.
pub const COLUMNS: [&str; 4] = ["longitude", "latitude", "elevation", "time"];

/// One point of a flattened table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointRow {
    pub longitude: f64,
    pub latitude: f64,
    pub elevation: Option<f64>,
    /// Wall-clock time without timezone
    pub time: Option<NaiveDateTime>,
}

impl PointRow {
    pub fn new(
        longitude: f64,
        latitude: f64,
        elevation: Option<f64>,
        time: Option<NaiveDateTime>,
    ) -> Self {
        Self {
            longitude,
            latitude,
            elevation,
            time,
        }
    }

    pub fn position(&self) -> GpsPoint {
        GpsPoint::new(self.latitude, self.longitude)
    }
}

impl From<&TrackPoint> for PointRow {
    fn from(p: &TrackPoint) -> Self {
        PointRow {
            longitude: p.longitude,
            latitude: p.latitude,
            elevation: p.elevation,
            time: p.time.map(|t| t.naive_local()),
        }
    }
}

/// Read access shared by every row-oriented point table.
pub trait PointTable {
    fn rows(&self) -> &[PointRow];

    fn len(&self) -> usize {
        self.rows().len()
    }

    fn is_empty(&self) -> bool {
        self.rows().is_empty()
    }

    fn longitudes(&self) -> Vec<f64> {
        self.rows().iter().map(|r| r.longitude).collect()
    }

    fn latitudes(&self) -> Vec<f64> {
        self.rows().iter().map(|r| r.latitude).collect()
    }

    fn elevations(&self) -> Vec<Option<f64>> {
        self.rows().iter().map(|r| r.elevation).collect()
    }

    fn times(&self) -> Vec<Option<NaiveDateTime>> {
        self.rows().iter().map(|r| r.time).collect()
    }

    fn positions(&self) -> Vec<GpsPoint> {
        self.rows().iter().map(PointRow::position).collect()
    }
}

/// The flattened points of one activity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivityTable {
    rows: Vec<PointRow>,
}

impl ActivityTable {
    pub fn new(rows: Vec<PointRow>) -> Self {
        Self { rows }
    }

    pub fn from_segment(segment: &TrackSegment) -> Self {
        Self {
            rows: segment.points.iter().map(PointRow::from).collect(),
        }
    }

    /// Table of an activity's first segment.
    pub fn from_activity(activity: &Activity, index: usize) -> Result<Self> {
        let segment = activity
            .first_segment()
            .ok_or(InsightsError::MissingSegment { index })?;
        Ok(Self::from_segment(segment))
    }

    pub fn into_rows(self) -> Vec<PointRow> {
        self.rows
    }
}

impl PointTable for ActivityTable {
    fn rows(&self) -> &[PointRow] {
        &self.rows
    }
}

/// Flatten every activity into a point table, input order preserved.
///
/// Fails on the first activity without a track segment.
pub fn to_tables(activities: &[Activity]) -> Result<Vec<ActivityTable>> {
    let pb = progress_bar(activities.len(), "Flattening activities");
    let mut tables = Vec::with_capacity(activities.len());

    for (index, activity) in activities.iter().enumerate() {
        let table = ActivityTable::from_activity(activity, index)?;
        debug!("[Tables] Activity {} -> {} rows", index, table.len());
        tables.push(table);
        pb.inc(1);
    }

    pb.finish_and_clear();
    Ok(tables)
}

/// Parallel [`to_tables`]; output order matches input order.
#[cfg(feature = "parallel")]
pub fn to_tables_parallel(activities: &[Activity]) -> Result<Vec<ActivityTable>> {
    use rayon::prelude::*;

    let pb = progress_bar(activities.len(), "Flattening activities");
    let tables = activities
        .par_iter()
        .enumerate()
        .map(|(index, activity)| {
            let table = ActivityTable::from_activity(activity, index);
            pb.inc(1);
            table
        })
        .collect::<Result<Vec<_>>>();

    pb.finish_and_clear();
    tables
}
