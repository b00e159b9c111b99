//! Summarize a directory of GPX activities.
//!
//! Run with: cargo run --example activity_report -- <gpx-directory>

use track_insights::summary::{
    print_top_elevation_difference, print_top_longest_travel, print_top_longest_travel_time,
};
use track_insights::{
    detect_stops, load_activities, stop_elevation_diff, to_geo_tables, to_tables,
    to_trajectories, StopDetectionConfig,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let dir = std::env::args().nth(1).unwrap_or_else(|| "activities".to_string());
    let activities = load_activities(&dir)?;
    println!("Loaded {} activities from {}\n", activities.len(), dir);

    let top = activities.len().min(3);
    print_top_longest_travel_time(&activities, top)?;
    println!();
    print_top_longest_travel(&activities, top)?;
    println!();
    print_top_elevation_difference(&activities, top)?;
    println!();

    let tables = to_tables(&activities)?;
    let trajectories = to_trajectories(to_geo_tables(tables))?;

    let config = StopDetectionConfig::default();
    for traj in &trajectories {
        println!(
            "Trajectory {}: {:.2} km in {} min, {:.1} km/h",
            traj.id(),
            traj.length() / 1000.0,
            traj.duration().num_minutes(),
            traj.average_speed_kmh()
        );

        let stops = detect_stops(traj, &config);
        if stops.is_empty() {
            continue;
        }
        match stop_elevation_diff(&stops, traj) {
            Ok(diffs) => {
                for d in diffs {
                    println!(
                        "  stop at {}: {:+.2} m, {} s since previous",
                        d.stop.start_time,
                        d.elevation_diff,
                        d.time_diff.num_seconds()
                    );
                }
            }
            Err(e) => println!("  stops without elevation: {}", e),
        }
    }

    Ok(())
}
