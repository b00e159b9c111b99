//! Running performance over time: distance, average speed and VO2 max in
//! three stacked panels sharing the date axis.

use super::{plot_err, render_to_file, Figure, PlotSize};
use crate::error::{InsightsError, Result};
use crate::trajectory::Trajectory;
use chrono::{Duration, NaiveDate};
use plotters::coord::Shift;
use plotters::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;

const ORANGE: RGBColor = RGBColor(255, 165, 0);
const MAX_DATE_LABELS: usize = 25;

/// One run in a comparison series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub date: NaiveDate,
    pub length_km: f64,
    pub avg_speed_kmh: f64,
    /// ml/kg/min
    pub vo2_max: f64,
}

impl RunRecord {
    /// Summarize a trajectory; VO2 max comes from the watch, not the track.
    pub fn from_trajectory(traj: &Trajectory, vo2_max: f64) -> Self {
        Self {
            date: traj.start_time().date(),
            length_km: traj.length() / 1000.0,
            avg_speed_kmh: traj.average_speed_kmh(),
            vo2_max,
        }
    }
}

struct Panel {
    unit: &'static str,
    color: RGBColor,
    value: fn(&RunRecord) -> f64,
}

const PANELS: [Panel; 3] = [
    Panel {
        unit: "km",
        color: ORANGE,
        value: |r| r.length_km,
    },
    Panel {
        unit: "km/h",
        color: BLUE,
        value: |r| r.avg_speed_kmh,
    },
    Panel {
        unit: "ml/kg/min",
        color: RED,
        value: |r| r.vo2_max,
    },
];

/// Value range with 5% headroom; flat series get a unit band.
fn value_range(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let (lo, hi) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if !lo.is_finite() {
        return (0.0, 1.0);
    }
    if hi - lo < f64::EPSILON {
        return (lo - 1.0, hi + 1.0);
    }
    let pad = (hi - lo) * 0.05;
    (lo - pad, hi + pad)
}

/// Three-panel comparison of runs ordered by date.
pub struct RunComparisonPlot {
    records: Vec<RunRecord>,
    pub size: PlotSize,
}

impl RunComparisonPlot {
    pub fn new(mut records: Vec<RunRecord>) -> Result<Self> {
        if records.is_empty() {
            return Err(InsightsError::InvalidParameter("no runs to compare".into()));
        }
        records.sort_by_key(|r| r.date);
        Ok(Self {
            records,
            size: PlotSize::new(1500, 1000),
        })
    }

    pub fn records(&self) -> &[RunRecord] {
        &self.records
    }

    /// Day offset of each run from the first one.
    fn day_offsets(&self) -> Vec<f64> {
        let first = self.records[0].date;
        self.records
            .iter()
            .map(|r| (r.date - first).num_days() as f64)
            .collect()
    }
}

impl Figure for RunComparisonPlot {
    fn size(&self) -> PlotSize {
        self.size
    }

    fn draw<DB: DrawingBackend>(&self, root: &DrawingArea<DB, Shift>, text: bool) -> Result<()> {
        root.fill(&WHITE).map_err(plot_err)?;
        let body = if text {
            root.titled("Running performances comparison", ("sans-serif", 28))
                .map_err(plot_err)?
        } else {
            root.clone()
        };

        let first = self.records[0].date;
        let days = self.day_offsets();
        let span = days.last().copied().unwrap_or(0.0).max(1.0);
        let label_date = |v: &f64| {
            (first + Duration::days(v.round() as i64))
                .format("%Y-%m-%d")
                .to_string()
        };

        let areas = body.split_evenly((PANELS.len(), 1));
        for (index, (area, panel)) in areas.iter().zip(PANELS.iter()).enumerate() {
            let bottom = index + 1 == PANELS.len();
            let (lo, hi) = value_range(self.records.iter().map(panel.value));

            let mut chart = ChartBuilder::on(area)
                .margin(10)
                .x_label_area_size(if text && bottom { 90 } else { 0 })
                .y_label_area_size(if text { 70 } else { 0 })
                .build_cartesian_2d(0f64..span, lo..hi)
                .map_err(plot_err)?;

            let mut mesh = chart.configure_mesh();
            mesh.x_labels(MAX_DATE_LABELS).x_label_formatter(&label_date);
            if text {
                let rotated = ("sans-serif", 12)
                    .into_font()
                    .transform(FontTransform::Rotate90);
                mesh.y_desc(panel.unit).x_label_style(rotated);
                if bottom {
                    mesh.x_desc("date");
                }
            }
            mesh.draw().map_err(plot_err)?;

            let series = days
                .iter()
                .zip(&self.records)
                .map(|(&d, r)| (d, (panel.value)(r)))
                .filter(|(_, v)| v.is_finite());
            chart
                .draw_series(LineSeries::new(series, panel.color.stroke_width(2)))
                .map_err(plot_err)?;
        }
        Ok(())
    }
}

/// Render the three-panel run comparison to `path`.
pub fn render_run_comparison<P: AsRef<Path>>(records: Vec<RunRecord>, path: P) -> Result<()> {
    render_to_file(&RunComparisonPlot::new(records)?, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo_table::GeoTable;
    use crate::plot::tests::render_svg;
    use crate::table::{PointRow, PointTable};

    fn run(day: u32, length_km: f64, avg_speed_kmh: f64, vo2_max: f64) -> RunRecord {
        RunRecord {
            date: NaiveDate::from_ymd_opt(2024, 5, day).unwrap(),
            length_km,
            avg_speed_kmh,
            vo2_max,
        }
    }

    #[test]
    fn test_records_sorted_by_date() {
        let runs = vec![run(9, 8.0, 11.0, 50.0), run(2, 5.0, 10.0, 49.0)];
        let plot = RunComparisonPlot::new(runs).unwrap();
        assert_eq!(plot.records()[0].date.to_string(), "2024-05-02");
        assert_eq!(plot.day_offsets(), vec![0.0, 7.0]);
    }

    #[test]
    fn test_empty_rejected() {
        assert!(matches!(
            RunComparisonPlot::new(vec![]),
            Err(InsightsError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_value_range() {
        assert_eq!(value_range([2.0, 4.0].into_iter()), (1.9, 4.1));
        assert_eq!(value_range([3.0].into_iter()), (2.0, 4.0));
        assert_eq!(value_range([f64::NAN].into_iter()), (0.0, 1.0));
    }

    #[test]
    fn test_from_trajectory() {
        let t0 = NaiveDate::from_ymd_opt(2024, 5, 2).unwrap().and_hms_opt(7, 0, 0).unwrap();
        let rows = vec![
            PointRow::new(12.5, 41.90, None, Some(t0)),
            PointRow::new(12.5, 41.91, None, Some(t0 + Duration::seconds(400))),
        ];
        let traj = Trajectory::new(GeoTable::from_rows(rows), 0).unwrap();
        let record = RunRecord::from_trajectory(&traj, 51.0);
        assert_eq!(record.date, t0.date());
        assert!((record.length_km - 1.112).abs() < 0.01);
        assert!((record.avg_speed_kmh - 10.0).abs() < 0.1);
        assert_eq!(traj.len(), 2);
    }

    #[test]
    fn test_draw_svg_three_series() {
        let mut plot = RunComparisonPlot::new(vec![
            run(1, 5.0, 10.2, 48.0),
            run(4, 7.5, 10.8, 48.5),
            run(8, 10.0, 11.1, 49.0),
            run(12, 6.0, 11.5, 49.0),
        ])
        .unwrap();
        plot.size = PlotSize::new(600, 400);
        let svg = render_svg(&plot, (600, 400));
        assert!(svg.matches("<polyline").count() >= 3);
        assert!(svg.contains("Running performances comparison"));
        assert!(svg.contains("ml/kg/min"));
    }
}
