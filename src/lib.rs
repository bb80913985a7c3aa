//! Loop-closure drift correction for registered point cloud scans.
//!
//! An ordered set of scans, each already placed into a common frame by a
//! stored rigid pose, accumulates small per-step registration errors into
//! visible drift once the scan path revisits a location. This crate detects
//! when the path closes a loop (a hysteresis over inter-origin distance),
//! redistributes the accumulated error across the scans between the loop
//! endpoints, and recovers the net rigid update each scan's stored pose
//! needs.
//!
//! Example usage:
//! ```no_run
//! use loopclose::*;
//! use std::path::Path;
//!
//! let model = ScanModel::from_file(Path::new("model.xml")).unwrap();
//! let (mut working, pristine) = load_clouds(&model).unwrap();
//! let corrector = ElchCorrector::new(IcpConfig::default());
//! run_loop_closure(&model, 3.0, &corrector, &mut working);
//! let poses = recover_poses(&model, &pristine, &working);
//! let out = corrected_model(&model, poses, model.data_path().to_string());
//! out.write(Path::new("corrected.xml")).unwrap();
//! ```

pub mod cloud;
pub mod detect;
pub mod model;
pub mod pipeline;
pub mod register;
pub mod rigid;

pub use crate::cloud::{load_pcd, transform_cloud, write_pcd, Cloud};
pub use crate::detect::LoopDetector;
pub use crate::model::{Error, Scan, ScanModel};
pub use crate::pipeline::{corrected_model, load_clouds, recover_poses, run_loop_closure};
pub use crate::register::{ElchCorrector, IcpConfig, LoopCorrector};
pub use crate::rigid::estimate_rigid;
