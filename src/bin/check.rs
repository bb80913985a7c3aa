extern crate cgmath;
extern crate loopclose;
extern crate structopt;

use cgmath::Point3;
use structopt::StructOpt;

use loopclose::*;

#[derive(StructOpt, Debug)]
#[structopt(name = "check", about = "Print a summary of a scan-set description")]
struct Opt {
    #[structopt(name = "FILE", parse(from_os_str))]
    input: std::path::PathBuf,
}

fn main() -> Result<(), Error> {
    let opt = Opt::from_args();

    let model = ScanModel::from_file(&opt.input)?;
    println!("{} scans, data path {}", model.num_scans(), model.data_path());

    if model.num_scans() > 0 {
        let origins: Vec<Point3<f64>> = (0..model.num_scans()).map(|i| model.origin(i)).collect();
        let min = origins.iter().fold(
            Point3::new(std::f64::INFINITY, std::f64::INFINITY, std::f64::INFINITY),
            |a, p| Point3::new(a.x.min(p.x), a.y.min(p.y), a.z.min(p.z)),
        );
        let max = origins.iter().fold(
            Point3::new(
                -std::f64::INFINITY,
                -std::f64::INFINITY,
                -std::f64::INFINITY,
            ),
            |a, p| Point3::new(a.x.max(p.x), a.y.max(p.y), a.z.max(p.z)),
        );
        println!(
            "origin extent ({}, {}, {}) to ({}, {}, {})",
            min.x, min.y, min.z, max.x, max.y, max.z
        );
    }
    Ok(())
}
