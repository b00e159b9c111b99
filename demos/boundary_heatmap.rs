//! Fetch a city boundary and draw a hexbin heatmap of activities inside it.
//!
//! Run with:
//!   cargo run --example boundary_heatmap -- <city> <gpx-directory> <basemap.png> [out.png]
//!
//! The basemap image is assumed to cover the boundary's Web Mercator extent.

use track_insights::plot::{render_hexbin, Basemap, HexbinConfig};
use track_insights::{get_boundary, load_activities, plot_points, to_geo_tables, to_tables};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.len() < 3 {
        eprintln!("usage: boundary_heatmap <city> <gpx-directory> <basemap.png> [out.png]");
        std::process::exit(2);
    }
    let (city, dir, basemap_path) = (&args[0], &args[1], &args[2]);
    let out = args.get(3).cloned().unwrap_or_else(|| "hexbin.png".to_string());

    let boundary = get_boundary(city)?;
    let extent = boundary
        .extent_web_mercator()
        .ok_or("boundary has no extent")?;
    println!("{} boundary: {} feature(s), {}", city, boundary.len(), boundary.crs());

    let activities = load_activities(dir)?;
    let points = plot_points(&to_geo_tables(to_tables(&activities)?));
    let inside: Vec<_> = points.into_iter().filter(|p| extent.contains(p)).collect();
    println!("{} points inside the boundary extent", inside.len());

    // 5% margin around the boundary
    let view = extent.padded(0.05);
    let basemap = Basemap::open(basemap_path, extent)?;
    render_hexbin(&inside, view, &basemap, HexbinConfig::default(), &out)?;
    println!("Wrote {}", out);

    Ok(())
}
