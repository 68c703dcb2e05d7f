//! Linear initialization: board poses from plane homographies and averaging
//! of per-sample relative poses.

use nalgebra::{
    Isometry3, Matrix3, Point2, Point3, Quaternion, Rotation3, Translation3, UnitQuaternion,
    Vector3, Vector4,
};
use rig_calib_core::estimate_homography;

/// Decompose a homography mapping board `(X, Y)` on `Z = 0` to normalized
/// image coordinates into the board pose `T_cam_board`.
///
/// The board is placed in front of the camera (`t.z > 0`).
pub fn pose_from_homography(h: &Matrix3<f64>) -> Option<Isometry3<f64>> {
    let h1 = h.column(0).into_owned();
    let h2 = h.column(1).into_owned();
    let h3 = h.column(2).into_owned();

    let n1 = h1.norm();
    let n2 = h2.norm();
    if n1 <= 1e-12 || n2 <= 1e-12 {
        return None;
    }
    let mut lambda = 2.0 / (n1 + n2);
    if h3.z * lambda < 0.0 {
        lambda = -lambda;
    }

    let r1 = h1 * lambda;
    let r2 = h2 * lambda;
    let r3 = r1.cross(&r2);
    if r3.norm() <= 1e-12 {
        return None;
    }
    let t = h3 * lambda;

    let r = Matrix3::from_columns(&[r1, r2, r3]);
    let svd = r.svd(true, true);
    let u = svd.u?;
    let v_t = svd.v_t?;
    let mut r_orth = u * v_t;
    if r_orth.determinant() < 0.0 {
        let mut u_flipped = u;
        u_flipped.column_mut(2).neg_mut();
        r_orth = u_flipped * v_t;
    }

    let rot = UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(r_orth));
    Some(Isometry3::from_parts(Translation3::from(t), rot))
}

/// Homography plus decomposition for one view of a planar board.
///
/// `world` must lie on `Z = 0`; `normalized` are undistorted normalized
/// image coordinates in the same order.
pub fn board_pose(world: &[Point3<f64>], normalized: &[Point2<f64>]) -> Option<Isometry3<f64>> {
    let plane: Vec<Point2<f64>> = world.iter().map(|p| Point2::new(p.x, p.y)).collect();
    let h = estimate_homography(&plane, normalized)?;
    pose_from_homography(&h.h)
}

/// Mean translation plus normalized quaternion mean, with every rotation
/// flipped into the hemisphere of the first.
pub fn average_isometries(poses: &[Isometry3<f64>]) -> Option<Isometry3<f64>> {
    let first = poses.first()?;
    let n = poses.len() as f64;

    let t_avg = poses
        .iter()
        .fold(Vector3::<f64>::zeros(), |acc, iso| acc + iso.translation.vector)
        / n;

    let q0 = first.rotation.coords;
    let acc = poses.iter().fold(Vector4::<f64>::zeros(), |acc, iso| {
        let c = iso.rotation.coords;
        if q0.dot(&c) < 0.0 {
            acc - c
        } else {
            acc + c
        }
    });
    if acc.norm_squared() == 0.0 {
        return Some(Isometry3::from_parts(
            Translation3::from(t_avg),
            UnitQuaternion::identity(),
        ));
    }
    let q = UnitQuaternion::from_quaternion(Quaternion::from_vector(acc / n));
    Some(Isometry3::from_parts(Translation3::from(t_avg), q))
}
