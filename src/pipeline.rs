//! Pipeline orchestration: load scans, walk the sequence detecting loops and
//! correcting them as they trigger, then recover per-scan pose updates.

extern crate cgmath;
extern crate itertools;

use cgmath::{Matrix4, Point3};
use itertools::izip;

use crate::cloud::{load_pcd, transform_cloud, Cloud};
use crate::detect::LoopDetector;
use crate::model::{Error, Scan, ScanModel};
use crate::register::LoopCorrector;
use crate::rigid::estimate_rigid;

/// Load every scan's raw cloud and apply its stored pose. Returns the
/// working set plus a pristine snapshot of each cloud; the snapshots are
/// never mutated and are compared against the working clouds after
/// correction to recover each scan's rigid delta.
pub fn load_clouds(model: &ScanModel) -> Result<(Vec<Cloud>, Vec<Cloud>), Error> {
    let mut working = Vec::with_capacity(model.num_scans());
    let mut pristine = Vec::with_capacity(model.num_scans());
    for scan in &model.scans {
        let path = model.full_path(scan);
        let mut cloud = load_pcd(&path)?;
        transform_cloud(&mut cloud, &scan.pose);
        println!("loading file: {} size: {}", path.display(), cloud.len());
        pristine.push(cloud.clone());
        working.push(cloud);
    }
    Ok((working, pristine))
}

/// Walk the scan sequence in order, running loop detection for every scan
/// index and invoking the corrector as soon as a loop triggers. Corrections
/// are never deferred; each one sees the working set as left by the previous
/// ones. Returns the corrected loop ranges in trigger order.
pub fn run_loop_closure<C: LoopCorrector>(
    model: &ScanModel,
    dist: f64,
    corrector: &C,
    clouds: &mut [Cloud],
) -> Vec<(usize, usize)> {
    let mut detector = LoopDetector::new(dist);
    let mut loops = Vec::new();
    for end in 0..clouds.len() {
        // origins come from the stored poses, recomputed on demand, never
        // from the (possibly already corrected) working clouds
        let origins: Vec<Point3<f64>> = (0..model.num_scans()).map(|i| model.origin(i)).collect();
        if let Some((first, last)) = detector.detect(end, &origins) {
            println!(
                "Loop between {} ({}) and {} ({})",
                first, model.scans[first].id, last, model.scans[last].id
            );
            corrector.correct(clouds, first, last);
            loops.push((first, last));
        }
    }
    loops
}

/// Recover each scan's corrected pose: estimate the rigid delta between the
/// pristine snapshot and the corrected working cloud, then compose it onto
/// the originally stored pose.
pub fn recover_poses(
    model: &ScanModel,
    pristine: &[Cloud],
    working: &[Cloud],
) -> Vec<Matrix4<f64>> {
    izip!(&model.scans, pristine, working)
        .map(|(scan, before, after)| estimate_rigid(before, after) * scan.pose)
        .collect()
}

/// Output scan set: identifiers and relative file references carried over
/// from the input, poses replaced, data set root set independently.
pub fn corrected_model(model: &ScanModel, poses: Vec<Matrix4<f64>>, data_path: String) -> ScanModel {
    let scans = model
        .scans
        .iter()
        .zip(poses)
        .map(|(scan, pose)| Scan {
            id: scan.id.clone(),
            file: scan.file.clone(),
            pose,
        })
        .collect();
    ScanModel::new(data_path, scans)
}
