//! Parsed GPS activities.
//!
//! An [`Activity`] mirrors the structure of a GPX document: tracks made of
//! segments made of timestamped points. It exposes the handful of
//! capabilities the rest of the crate relies on through the
//! [`ActivityRecord`] trait, so rankings can run over any record type.

use crate::error::{InsightsError, Result};
use crate::geo_utils;
use crate::GpsPoint;
use chrono::{DateTime, FixedOffset};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

/// A single recorded position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackPoint {
    pub latitude: f64,
    pub longitude: f64,
    /// Meters above sea level
    pub elevation: Option<f64>,
    /// Timestamp with the offset it was recorded in
    pub time: Option<DateTime<FixedOffset>>,
}

impl TrackPoint {
    pub fn new(
        latitude: f64,
        longitude: f64,
        elevation: Option<f64>,
        time: Option<DateTime<FixedOffset>>,
    ) -> Self {
        Self {
            latitude,
            longitude,
            elevation,
            time,
        }
    }

    pub fn position(&self) -> GpsPoint {
        GpsPoint::new(self.latitude, self.longitude)
    }
}

/// A continuous run of points.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackSegment {
    pub points: Vec<TrackPoint>,
}

impl TrackSegment {
    pub fn new(points: Vec<TrackPoint>) -> Self {
        Self { points }
    }

    /// Seconds between the first and last timestamped points.
    pub fn duration_secs(&self) -> f64 {
        let first = self.points.iter().find_map(|p| p.time);
        let last = self.points.iter().rev().find_map(|p| p.time);
        match (first, last) {
            (Some(start), Some(end)) => (end - start).num_milliseconds() as f64 / 1000.0,
            _ => 0.0,
        }
    }

    /// Path length in meters, elevation changes included.
    pub fn length_3d(&self) -> f64 {
        self.points
            .windows(2)
            .map(|w| {
                geo_utils::distance_3d(
                    &w[0].position(),
                    w[0].elevation,
                    &w[1].position(),
                    w[1].elevation,
                )
            })
            .sum()
    }
}

/// A named track with a declared activity type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub name: Option<String>,
    /// Declared activity type, e.g. "running" or "cycling"
    pub kind: Option<String>,
    pub segments: Vec<TrackSegment>,
}

/// Lowest and highest elevation seen in an activity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ElevationExtremes {
    pub minimum: f64,
    pub maximum: f64,
}

impl ElevationExtremes {
    pub fn range(&self) -> f64 {
        self.maximum - self.minimum
    }
}

/// Capabilities of a recorded activity used by the summarizers.
pub trait ActivityRecord {
    /// Total moving-clock duration in seconds.
    fn duration_secs(&self) -> f64;

    /// Path length in meters including elevation changes.
    fn length_3d(&self) -> f64;

    /// Elevation range, `None` when no point carries an elevation.
    fn elevation_extremes(&self) -> Option<ElevationExtremes>;

    /// Declared type of the first track.
    fn activity_type(&self) -> Option<&str>;
}

/// One parsed activity file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub name: Option<String>,
    /// File the activity was loaded from, if any
    pub source: Option<PathBuf>,
    pub tracks: Vec<Track>,
}

impl Activity {
    /// Build an activity directly from tracks.
    pub fn new(tracks: Vec<Track>) -> Self {
        Self {
            name: None,
            source: None,
            tracks,
        }
    }

    /// Convert a parsed GPX document.
    pub fn from_gpx(doc: gpx::Gpx) -> Self {
        let name = doc.metadata.as_ref().and_then(|m| m.name.clone());
        let tracks = doc
            .tracks
            .into_iter()
            .map(|track| Track {
                name: track.name,
                kind: track.type_,
                segments: track
                    .segments
                    .into_iter()
                    .map(|segment| TrackSegment {
                        points: segment.points.iter().map(waypoint_to_point).collect(),
                    })
                    .collect(),
            })
            .collect();

        Self {
            name,
            source: None,
            tracks,
        }
    }

    /// Parse GPX from any reader.
    ///
    /// The `gpx` crate normalizes every timestamp to UTC; the offset each
    /// `<time>` was written with is read back from the document text.
    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self> {
        let mut xml = String::new();
        reader
            .read_to_string(&mut xml)
            .map_err(|e| InsightsError::GpxParse(e.to_string()))?;
        let doc = gpx::read(xml.as_bytes()).map_err(|e| InsightsError::GpxParse(e.to_string()))?;

        let mut activity = Self::from_gpx(doc);
        activity.restore_offsets(&recorded_offsets(&xml));
        Ok(activity)
    }

    /// Re-express each track point time in its recorded offset.
    fn restore_offsets(&mut self, offsets: &[Option<FixedOffset>]) {
        let count = self.points().count();
        if offsets.len() != count {
            debug!(
                "[Activities] {} <trkpt> timestamps for {} points, keeping UTC",
                offsets.len(),
                count
            );
            return;
        }

        let points = self
            .tracks
            .iter_mut()
            .flat_map(|t| t.segments.iter_mut())
            .flat_map(|s| s.points.iter_mut());
        for (point, offset) in points.zip(offsets) {
            if let (Some(time), Some(offset)) = (point.time, offset) {
                point.time = Some(time.with_timezone(offset));
            }
        }
    }

    /// Parse a GPX file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| InsightsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut activity = Self::from_reader(BufReader::new(file)).map_err(|e| match e {
            InsightsError::GpxParse(msg) => {
                InsightsError::GpxParse(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })?;
        activity.source = Some(path.to_path_buf());
        Ok(activity)
    }

    /// First segment of the first track.
    pub fn first_segment(&self) -> Option<&TrackSegment> {
        self.tracks.first()?.segments.first()
    }

    /// Every point of every segment, in document order.
    pub fn points(&self) -> impl Iterator<Item = &TrackPoint> {
        self.tracks
            .iter()
            .flat_map(|t| t.segments.iter())
            .flat_map(|s| s.points.iter())
    }
}

impl ActivityRecord for Activity {
    fn duration_secs(&self) -> f64 {
        self.tracks
            .iter()
            .flat_map(|t| t.segments.iter())
            .map(TrackSegment::duration_secs)
            .sum()
    }

    fn length_3d(&self) -> f64 {
        self.tracks
            .iter()
            .flat_map(|t| t.segments.iter())
            .map(TrackSegment::length_3d)
            .sum()
    }

    fn elevation_extremes(&self) -> Option<ElevationExtremes> {
        let mut extremes: Option<ElevationExtremes> = None;
        for ele in self.points().filter_map(|p| p.elevation) {
            extremes = Some(match extremes {
                None => ElevationExtremes {
                    minimum: ele,
                    maximum: ele,
                },
                Some(e) => ElevationExtremes {
                    minimum: e.minimum.min(ele),
                    maximum: e.maximum.max(ele),
                },
            });
        }
        extremes
    }

    fn activity_type(&self) -> Option<&str> {
        self.tracks.first()?.kind.as_deref()
    }
}

/// Convert gpx Time to chrono, keeping the recorded offset.
fn gpx_time_to_chrono(time: gpx::Time) -> Option<DateTime<FixedOffset>> {
    // gpx::Time wraps time::OffsetDateTime, convert via string format
    let formatted = time.format().ok()?;
    DateTime::parse_from_rfc3339(&formatted).ok()
}

/// UTC offset of every `<trkpt>` timestamp, in document order.
///
/// Points without a `<time>`, or with one that is not RFC 3339, yield `None`.
fn recorded_offsets(xml: &str) -> Vec<Option<FixedOffset>> {
    let mut offsets = Vec::new();
    let mut rest = xml;

    while let Some(start) = rest.find("<trkpt") {
        rest = &rest[start + "<trkpt".len()..];
        let Some(tag_end) = rest.find('>') else {
            break;
        };
        if rest[..tag_end].ends_with('/') {
            offsets.push(None);
            rest = &rest[tag_end + 1..];
            continue;
        }

        let body_end = rest.find("</trkpt>").unwrap_or(rest.len());
        let body = &rest[..body_end];
        let offset = body.find("<time>").and_then(|open| {
            let text = &body[open + "<time>".len()..];
            let close = text.find("</time>")?;
            DateTime::parse_from_rfc3339(text[..close].trim())
                .ok()
                .map(|t| *t.offset())
        });
        offsets.push(offset);
        rest = &rest[body_end..];
    }

    offsets
}

fn waypoint_to_point(wp: &gpx::Waypoint) -> TrackPoint {
    let point = wp.point();
    TrackPoint {
        latitude: point.y(),
        longitude: point.x(),
        elevation: wp.elevation,
        time: wp.time.clone().and_then(gpx_time_to_chrono),
    }
}

/// Load every `.gpx` file in a directory, sorted by file name.
pub fn load_activities<P: AsRef<Path>>(dir: P) -> Result<Vec<Activity>> {
    let dir = dir.as_ref();
    let io_err = |source| InsightsError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        let is_gpx = path
            .extension()
            .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case("gpx"))
            .unwrap_or(false);
        if path.is_file() && is_gpx {
            files.push(path);
        }
    }

    // Sort files for consistent activity indices
    files.sort();

    let activities = files
        .iter()
        .map(|path| {
            debug!("[Activities] Parsing {}", path.display());
            Activity::from_path(path)
        })
        .collect::<Result<Vec<_>>>()?;

    info!("[Activities] Loaded {} activities from {}", activities.len(), dir.display());
    Ok(activities)
}
