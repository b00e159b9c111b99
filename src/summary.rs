//! Top-N activity rankings.
//!
//! Activities are ranked by one numeric key (duration, 3D length, or
//! elevation range), descending. Ties keep input order. Each ranking line
//! names the 1-based rank, the formatted value, the activity's original
//! index and its declared type:
//!
//! ```text
//! 1° longest activity duration: 02:14:09, activity n° 7, type: cycling
//! 2° longest activity duration: 01:03:44, activity n° 2, type: running
//! ```

use crate::activity::ActivityRecord;
use crate::units::format_hms;
use serde::{Deserialize, Serialize};
use std::io::{self, Write};

/// Key used to rank activities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RankMetric {
    /// Duration in seconds, printed as `HH:MM:SS`
    Duration,
    /// 3D path length in meters
    Length3d,
    /// Highest minus lowest elevation in meters
    ElevationDifference,
}

impl RankMetric {
    /// Numeric key of an activity for this metric.
    pub fn key<A: ActivityRecord + ?Sized>(&self, activity: &A) -> f64 {
        match self {
            RankMetric::Duration => activity.duration_secs(),
            RankMetric::Length3d => activity.length_3d(),
            RankMetric::ElevationDifference => activity
                .elevation_extremes()
                .map(|e| e.range())
                .unwrap_or(0.0),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RankMetric::Duration => "longest activity duration",
            RankMetric::Length3d => "longest activity length",
            RankMetric::ElevationDifference => "highest elevation difference",
        }
    }

    pub fn format_value(&self, value: f64) -> String {
        match self {
            RankMetric::Duration => format_hms(value),
            RankMetric::Length3d | RankMetric::ElevationDifference => format!("{:.2}", value),
        }
    }
}

/// One row of a ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedActivity {
    /// 1-based position in the ranking
    pub rank: usize,
    /// Index of the activity in the input sequence
    pub index: usize,
    pub value: f64,
    pub activity_type: Option<String>,
}

impl RankedActivity {
    /// The printed ranking line for this row.
    pub fn line(&self, metric: RankMetric) -> String {
        format!(
            "{}° {}: {}, activity n° {}, type: {}",
            self.rank,
            metric.label(),
            metric.format_value(self.value),
            self.index,
            self.activity_type.as_deref().unwrap_or("None")
        )
    }
}

/// Rank activities by `metric`, descending, keeping at most `top` rows.
///
/// `top == 0` yields nothing; `top` past the end yields every activity.
pub fn rank_activities<A: ActivityRecord>(
    activities: &[A],
    metric: RankMetric,
    top: usize,
) -> Vec<RankedActivity> {
    let mut keyed: Vec<(usize, f64)> = activities
        .iter()
        .enumerate()
        .map(|(i, a)| (i, metric.key(a)))
        .collect();

    // sort_by is stable, equal keys keep input order
    keyed.sort_by(|a, b| b.1.total_cmp(&a.1));

    keyed
        .into_iter()
        .take(top)
        .enumerate()
        .map(|(pos, (index, value))| RankedActivity {
            rank: pos + 1,
            index,
            value,
            activity_type: activities[index].activity_type().map(str::to_string),
        })
        .collect()
}

/// Write the top `top` ranking lines to `out`.
pub fn write_top<A: ActivityRecord, W: Write>(
    out: &mut W,
    activities: &[A],
    metric: RankMetric,
    top: usize,
) -> io::Result<Vec<RankedActivity>> {
    let ranking = rank_activities(activities, metric, top);
    for row in &ranking {
        writeln!(out, "{}", row.line(metric))?;
    }
    Ok(ranking)
}

fn print_top<A: ActivityRecord>(
    activities: &[A],
    metric: RankMetric,
    top: usize,
) -> io::Result<Vec<RankedActivity>> {
    write_top(&mut io::stdout().lock(), activities, metric, top)
}

/// Print the `top` longest activities by duration to stdout.
pub fn print_top_longest_travel_time<A: ActivityRecord>(
    activities: &[A],
    top: usize,
) -> io::Result<Vec<RankedActivity>> {
    print_top(activities, RankMetric::Duration, top)
}

/// Print the `top` longest activities by 3D length to stdout.
pub fn print_top_longest_travel<A: ActivityRecord>(
    activities: &[A],
    top: usize,
) -> io::Result<Vec<RankedActivity>> {
    print_top(activities, RankMetric::Length3d, top)
}

/// Print the `top` activities by elevation range to stdout.
pub fn print_top_elevation_difference<A: ActivityRecord>(
    activities: &[A],
    top: usize,
) -> io::Result<Vec<RankedActivity>> {
    print_top(activities, RankMetric::ElevationDifference, top)
}
