//! Rigid motion recovery between position-paired point sets.

extern crate cgmath;
extern crate nalgebra as na;

use cgmath::{Matrix4, Point3};

/// Estimate the rigid transform (rotation + translation, no scale) that best
/// maps `source` onto `target` in the least-squares sense. The two sets must
/// have the same length; points are paired by array position.
///
/// Kabsch: center both sets, SVD of the cross-covariance, R = V Uᵀ with a
/// determinant sign flip to rule out reflections, t = tc − R sc.
pub fn estimate_rigid(source: &[Point3<f64>], target: &[Point3<f64>]) -> Matrix4<f64> {
    assert_eq!(source.len(), target.len());
    if source.is_empty() {
        return Matrix4::from_scale(1.0);
    }

    let n = source.len() as f64;
    let sc = source
        .iter()
        .fold(na::Vector3::zeros(), |a, p| a + na::Vector3::new(p.x, p.y, p.z))
        / n;
    let tc = target
        .iter()
        .fold(na::Vector3::zeros(), |a, p| a + na::Vector3::new(p.x, p.y, p.z))
        / n;

    let mut h = na::Matrix3::zeros();
    for (s, t) in source.iter().zip(target) {
        let ps = na::Vector3::new(s.x, s.y, s.z) - sc;
        let pt = na::Vector3::new(t.x, t.y, t.z) - tc;
        h += ps * pt.transpose();
    }

    let svd = na::linalg::SVD::new(h, true, true);
    let u = svd.u.unwrap();
    let v = svd.v_t.unwrap().transpose();

    let mut r = v * u.transpose();
    if r.determinant() < 0.0 {
        // improper rotation, flip the axis of least variance
        let d = na::Matrix3::from_diagonal(&na::Vector3::new(1.0, 1.0, -1.0));
        r = v * d * u.transpose();
    }

    let t = tc - r * sc;

    Matrix4::new(
        r[(0, 0)], r[(1, 0)], r[(2, 0)], 0.0, //
        r[(0, 1)], r[(1, 1)], r[(2, 1)], 0.0, //
        r[(0, 2)], r[(1, 2)], r[(2, 2)], 0.0, //
        t.x, t.y, t.z, 1.0,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{AbsDiffEq, Transform, Vector3};

    fn box_points() -> Vec<Point3<f64>> {
        vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(0.0, 0.0, 1.0),
            Point3::new(1.0, 1.0, 0.5),
        ]
    }

    #[test]
    fn test_pure_translation() {
        let source = box_points();
        let t = Vector3::new(0.5, -2.0, 1.25);
        let target: Vec<_> = source.iter().map(|p| *p + t).collect();

        let m = estimate_rigid(&source, &target);
        assert!(m.abs_diff_eq(&Matrix4::from_translation(t), 1e-9));
    }

    #[test]
    fn test_pure_rotation() {
        let source = box_points();
        let r = Matrix4::from_angle_z(cgmath::Deg(90.0));
        let target: Vec<_> = source.iter().map(|p| r.transform_point(*p)).collect();

        let m = estimate_rigid(&source, &target);
        assert!(m.abs_diff_eq(&r, 1e-9));
    }

    #[test]
    fn test_rotation_and_translation() {
        let source = box_points();
        let m0 = Matrix4::from_translation(Vector3::new(1.0, 2.0, 3.0))
            * Matrix4::from_angle_y(cgmath::Deg(30.0));
        let target: Vec<_> = source.iter().map(|p| m0.transform_point(*p)).collect();

        let m = estimate_rigid(&source, &target);
        assert!(m.abs_diff_eq(&m0, 1e-9));
        for (s, t) in source.iter().zip(&target) {
            assert!(m.transform_point(*s).abs_diff_eq(t, 1e-9));
        }
    }

    #[test]
    fn test_identity_on_equal_sets() {
        let source = box_points();
        let m = estimate_rigid(&source, &source);
        assert!(m.abs_diff_eq(&Matrix4::from_scale(1.0), 1e-9));
    }
}
