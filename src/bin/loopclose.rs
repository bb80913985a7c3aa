extern crate loopclose;
extern crate structopt;

use structopt::StructOpt;

use loopclose::*;

use std::path::PathBuf;
use std::process::exit;

#[derive(StructOpt, Debug)]
#[structopt(
    name = "loopclose",
    about = "Correct accumulated drift in a registered scan set via loop closure"
)]
struct Opt {
    /// Input and output scan-set descriptions, identified by their .xml
    /// extension. The input comes first.
    #[structopt(name = "MODELS", parse(from_os_str))]
    models: Vec<PathBuf>,

    /// Maximum distance threshold between two correspondent points in source <-> target.
    #[structopt(short = "d", default_value = "0.15")]
    max_correspondence_distance: f64,

    /// Inlier distance threshold for the internal RANSAC outlier rejection loop.
    #[structopt(short = "r", default_value = "0.15")]
    ransac_threshold: f64,

    /// Maximum number of iterations the internal optimization should run for.
    #[structopt(short = "i", default_value = "100")]
    max_iterations: usize,

    /// Maximum distance between scans to consider a loop.
    #[structopt(short = "l", default_value = "3.0")]
    loop_detection_distance: f64,

    /// Data set root written to the output description. Defaults to the
    /// input's.
    #[structopt(long = "data-path")]
    data_path: Option<String>,
}

fn usage() {
    println!("Usage:");
    println!("loopclose inputModel.xml outputModel.xml parameters");
    println!(" -d\tSets the maximum distance threshold between two correspondent points in source <-> target.\tDefault: 0.15");
    println!(" -r\tSets the inlier distance threshold for the internal RANSAC outlier rejection loop.\tDefault: 0.15");
    println!(" -i\tSets the maximum number of iterations the internal optimization should run for.\tDefault: 100");
    println!(" -l\tSets the maximum distance between scans to consider a loop.\tDefault: 3.0");
    println!(" --data-path\tSets the data set root of the output model.\tDefault: the input's");
}

fn main() -> Result<(), Error> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 3 {
        usage();
        exit(-1);
    }
    let opt = match Opt::from_iter_safe(&args) {
        Ok(opt) => opt,
        Err(_) => {
            usage();
            exit(-1);
        }
    };

    let xml: Vec<&PathBuf> = opt
        .models
        .iter()
        .filter(|p| p.extension().map(|e| e == "xml").unwrap_or(false))
        .collect();
    if xml.len() != 2 {
        exit(-2);
    }
    let input = xml[0];
    let output = xml[1];

    let model = ScanModel::from_file(input)?;
    let (mut working, pristine) = load_clouds(&model)?;

    let corrector = ElchCorrector::new(IcpConfig {
        max_correspondence_distance: opt.max_correspondence_distance,
        ransac_threshold: opt.ransac_threshold,
        max_iterations: opt.max_iterations,
    });
    run_loop_closure(&model, opt.loop_detection_distance, &corrector, &mut working);

    let poses = recover_poses(&model, &pristine, &working);
    let mut out = corrected_model(&model, poses, model.data_path().to_string());
    if let Some(data_path) = opt.data_path {
        out.set_data_path(data_path);
    }
    out.write(output)
}
