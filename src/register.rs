//! The loop-closure correction collaborator.
//!
//! Correction is an opaque capability behind [LoopCorrector]: given the
//! working cloud set and the endpoints of a detected loop, mutate the clouds
//! in place to redistribute the accumulated error. The shipped implementation
//! aligns the loop-end cloud onto the loop-start cloud with point-to-point
//! ICP and spreads the correcting transform over the scans in between.

extern crate cgmath;
extern crate rayon;

use cgmath::{InnerSpace, Matrix3, Matrix4, One, Point3, Quaternion, Transform};
use rayon::prelude::*;

use crate::cloud::{transform_cloud, Cloud};
use crate::rigid::estimate_rigid;

/// Registration engine configuration.
#[derive(Debug, Clone, Copy)]
pub struct IcpConfig {
    /// Maximum distance between two points for them to count as a
    /// correspondence.
    pub max_correspondence_distance: f64,
    /// Residual threshold above which a correspondence is rejected as an
    /// outlier when re-estimating the transform.
    pub ransac_threshold: f64,
    /// Maximum number of alignment iterations.
    pub max_iterations: usize,
}

impl Default for IcpConfig {
    fn default() -> Self {
        IcpConfig {
            max_correspondence_distance: 0.15,
            ransac_threshold: 0.15,
            max_iterations: 100,
        }
    }
}

/// Loop-closure correction over a working cloud set. The clouds are owned by
/// the caller; correction mutates them in place and returns nothing.
pub trait LoopCorrector {
    fn correct(&self, clouds: &mut [Cloud], first: usize, last: usize);
}

/// ELCH-style corrector: ICP-align `clouds[last]` onto `clouds[first]`, then
/// apply a linearly growing fraction of the resulting transform to every
/// cloud in the loop range.
#[derive(Debug)]
pub struct ElchCorrector {
    config: IcpConfig,
}

impl ElchCorrector {
    pub fn new(config: IcpConfig) -> Self {
        ElchCorrector { config }
    }

    /// Nearest-neighbor correspondences from `source` into `target`, gated
    /// by the maximum correspondence distance.
    fn correspondences(
        &self,
        source: &[Point3<f64>],
        target: &[Point3<f64>],
    ) -> Vec<(Point3<f64>, Point3<f64>)> {
        source
            .par_iter()
            .filter_map(|s| {
                let mut best = None;
                let mut best_dist = self.config.max_correspondence_distance;
                for t in target {
                    let d = (s - t).magnitude();
                    if d < best_dist {
                        best_dist = d;
                        best = Some(*t);
                    }
                }
                best.map(|t| (*s, t))
            })
            .collect()
    }

    /// Rigid transform aligning `source` onto `target`.
    fn align(&self, source: &Cloud, target: &Cloud) -> Matrix4<f64> {
        let mut total = <Matrix4<f64> as One>::one();
        let mut moved = source.clone();

        for _ in 0..self.config.max_iterations {
            let pairs = self.correspondences(&moved, target);
            if pairs.len() < 3 {
                break;
            }

            let src: Vec<_> = pairs.iter().map(|p| p.0).collect();
            let tgt: Vec<_> = pairs.iter().map(|p| p.1).collect();
            let mut step = estimate_rigid(&src, &tgt);

            // outlier rejection pass: drop pairs whose residual under the
            // candidate transform exceeds the threshold, then re-estimate
            let inliers: Vec<_> = pairs
                .iter()
                .filter(|(s, t)| {
                    (step.transform_point(*s) - t).magnitude() <= self.config.ransac_threshold
                })
                .cloned()
                .collect();
            if inliers.len() >= 3 && inliers.len() < pairs.len() {
                let src: Vec<_> = inliers.iter().map(|p| p.0).collect();
                let tgt: Vec<_> = inliers.iter().map(|p| p.1).collect();
                step = estimate_rigid(&src, &tgt);
            }

            transform_cloud(&mut moved, &step);
            total = step * total;

            let translation = step.w.truncate().magnitude();
            if translation < 1e-10 {
                break;
            }
        }

        total
    }
}

/// Split a rigid transform into its rotation and translation parts.
fn decompose(m: &Matrix4<f64>) -> (Quaternion<f64>, cgmath::Vector3<f64>) {
    let r = Matrix3::from_cols(m.x.truncate(), m.y.truncate(), m.z.truncate());
    (Quaternion::from(r), m.w.truncate())
}

impl LoopCorrector for ElchCorrector {
    fn correct(&self, clouds: &mut [Cloud], first: usize, last: usize) {
        if last <= first {
            return;
        }

        let correction = self.align(&clouds[last], &clouds[first]);

        let (q, t) = decompose(&correction);
        let span = (last - first) as f64;
        for i in first..=last {
            let f = (i - first) as f64 / span;
            let qi = Quaternion::one().slerp(q, f);
            let mi = Matrix4::from_translation(t * f) * Matrix4::from(Matrix3::from(qi));
            transform_cloud(&mut clouds[i], &mi);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{AbsDiffEq, Vector3};

    fn grid() -> Cloud {
        let mut cloud = Vec::new();
        for x in 0..4 {
            for y in 0..4 {
                cloud.push(Point3::new(x as f64, y as f64, (x + y) as f64 * 0.25));
            }
        }
        cloud
    }

    #[test]
    fn test_align_recovers_small_offset() {
        let corrector = ElchCorrector::new(IcpConfig::default());
        let target = grid();
        let offset = Vector3::new(0.05, -0.03, 0.02);
        let source: Cloud = target.iter().map(|p| *p + offset).collect();

        let m = corrector.align(&source, &target);
        assert!(m.abs_diff_eq(&Matrix4::from_translation(-offset), 1e-6));
    }

    #[test]
    fn test_correct_closes_the_loop() {
        let corrector = ElchCorrector::new(IcpConfig::default());
        let offset = Vector3::new(0.05, 0.0, 0.0);
        let mut clouds: Vec<Cloud> = vec![
            grid(),
            grid().iter().map(|p| *p + offset / 2.0).collect(),
            grid().iter().map(|p| *p + offset).collect(),
        ];
        corrector.correct(&mut clouds, 0, 2);

        // loop start untouched, loop end pulled back onto it
        assert_eq!(clouds[0], grid());
        for (p, q) in clouds[2].iter().zip(grid().iter()) {
            assert!(p.abs_diff_eq(q, 1e-6));
        }
    }

    #[test]
    fn test_correct_ignores_degenerate_range() {
        let corrector = ElchCorrector::new(IcpConfig::default());
        let mut clouds: Vec<Cloud> = vec![grid(), grid()];
        corrector.correct(&mut clouds, 1, 1);
        assert_eq!(clouds[0], grid());
        assert_eq!(clouds[1], grid());
    }
}
