extern crate cgmath;
extern crate loopclose;
extern crate rand;
extern crate structopt;

use cgmath::{Matrix4, Point3, Vector3};
use rand::distributions::{Distribution, Normal};
use rand::rngs::StdRng;
use rand::SeedableRng;
use structopt::StructOpt;

use loopclose::*;

use std::fs;
use std::path::PathBuf;

#[derive(StructOpt, Debug)]
#[structopt(
    name = "synthetic",
    about = "Generate a synthetic drifted scan set on a closed square path"
)]
struct Opt {
    /// Output scan-set description. Cloud files are written to a data/
    /// directory next to it.
    #[structopt(name = "OUTPUT", parse(from_os_str))]
    output: PathBuf,

    /// Number of scans on the path.
    #[structopt(long = "scans", default_value = "6")]
    num_scans: usize,

    /// Side length of the square path.
    #[structopt(long = "side", default_value = "10")]
    side: f64,

    /// How close the last scan comes back to the second one.
    #[structopt(long = "gap", default_value = "0.5")]
    gap: f64,

    /// Landmark grid resolution per axis.
    #[structopt(long = "landmarks", default_value = "5")]
    landmarks: usize,

    /// Standard deviation of per-step translational drift added to the
    /// stored poses.
    #[structopt(long = "drift-std", default_value = "0.02")]
    drift_std: f64,

    /// Write binary clouds instead of ascii.
    #[structopt(long = "binary")]
    binary: bool,

    /// Random seed.
    #[structopt(long = "seed", default_value = "42")]
    seed: u64,
}

/// True scan positions: start of the square, a point `gap` along the first
/// edge, the remaining scans spread over the far three corners, and a final
/// scan coming back to `gap` up the last edge. The last position is within
/// `gap * sqrt(2)` of the second, closing the loop.
fn path_positions(n: usize, side: f64, gap: f64) -> Vec<Vector3<f64>> {
    assert!(n >= 5, "need at least 5 scans to close a loop");
    let mut positions = vec![Vector3::new(0.0, 0.0, 0.0), Vector3::new(gap, 0.0, 0.0)];
    let middle = n - 3;
    for j in 0..middle {
        let t = if middle == 1 {
            0.5
        } else {
            j as f64 / (middle - 1) as f64
        };
        // polyline (side,0) -> (side,side) -> (0,side)
        let d = t * 2.0 * side;
        let p = if d <= side {
            Vector3::new(side, d, 0.0)
        } else {
            Vector3::new(side - (d - side), side, 0.0)
        };
        positions.push(p);
    }
    positions.push(Vector3::new(0.0, gap, 0.0));
    positions
}

/// Fixed world structure every scan observes: a grid of landmarks covering
/// the square, at two heights.
fn landmark_grid(per_axis: usize, side: f64) -> Vec<Point3<f64>> {
    assert!(per_axis >= 2);
    let mut points = Vec::new();
    for i in 0..per_axis {
        for j in 0..per_axis {
            let x = i as f64 / (per_axis - 1) as f64 * side;
            let y = j as f64 / (per_axis - 1) as f64 * side;
            points.push(Point3::new(x, y, 0.0));
            points.push(Point3::new(x, y, 2.0));
        }
    }
    points
}

fn main() -> Result<(), Error> {
    let opt = Opt::from_args();
    let mut rng = StdRng::seed_from_u64(opt.seed);
    let noise = Normal::new(0.0, opt.drift_std);

    let data_dir = opt
        .output
        .parent()
        .map(|p| p.join("data"))
        .unwrap_or_else(|| PathBuf::from("data"));
    fs::create_dir_all(&data_dir)?;

    let positions = path_positions(opt.num_scans, opt.side, opt.gap);
    let world = landmark_grid(opt.landmarks, opt.side);

    let mut drift = Vector3::new(0.0, 0.0, 0.0);
    let mut scans = Vec::with_capacity(positions.len());
    for (i, position) in positions.iter().enumerate() {
        if i > 0 {
            drift += Vector3::new(
                noise.sample(&mut rng),
                noise.sample(&mut rng),
                noise.sample(&mut rng),
            );
        }

        // the raw cloud is the world structure seen from the scan's true
        // position; the stored pose carries the accumulated drift
        let local: Cloud = world.iter().map(|p| *p - *position).collect();
        let file = format!("scan{:03}.pcd", i);
        write_pcd(&data_dir.join(&file), &local, opt.binary)?;

        scans.push(Scan {
            id: format!("scan{:03}", i),
            file,
            pose: Matrix4::from_translation(*position + drift),
        });
    }

    let model = ScanModel::new(data_dir.to_string_lossy().to_string(), scans);
    model.write(&opt.output)?;

    println!(
        "Scan set with {} scans, {} points each, drift std {}",
        model.num_scans(),
        world.len(),
        opt.drift_std
    );
    Ok(())
}
