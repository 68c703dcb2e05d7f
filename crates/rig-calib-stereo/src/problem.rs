//! Joint reprojection residuals of one camera pair.
//!
//! Parameter vector layout:
//! `[ω_sr(3), t_sr(3), ω_0(3), t_0(3), …, ω_{K-1}(3), t_{K-1}(3)]`
//! where `(ω_sr, t_sr)` is `T_sec_ref` and `(ω_k, t_k)` is the board pose
//! `T_ref_board` of sample `k`; rotations are axis-angle vectors.

use nalgebra::{DVector, Isometry3, Point2, Point3, Translation3, UnitQuaternion, Vector3};
use rig_calib_core::CameraModel;

use crate::lm::ResidualModel;

pub(crate) const POSE_DOF: usize = 6;

pub(crate) struct StereoReprojection<'a> {
    pub world: &'a [Point3<f64>],
    pub reference: Vec<Vec<Point2<f64>>>,
    pub secondary: Vec<Vec<Point2<f64>>>,
    pub reference_camera: &'a CameraModel,
    pub secondary_camera: &'a CameraModel,
}

impl StereoReprojection<'_> {
    pub fn residual_count(&self) -> usize {
        4 * self.world.len() * self.reference.len()
    }

    pub fn pack(sec_from_ref: &Isometry3<f64>, boards: &[Isometry3<f64>]) -> DVector<f64> {
        let mut x = DVector::zeros(POSE_DOF * (1 + boards.len()));
        write_pose(&mut x, 0, sec_from_ref);
        for (k, board) in boards.iter().enumerate() {
            write_pose(&mut x, POSE_DOF * (k + 1), board);
        }
        x
    }

    pub fn sec_from_ref(x: &DVector<f64>) -> Isometry3<f64> {
        read_pose(x, 0)
    }

    pub fn board(x: &DVector<f64>, sample: usize) -> Isometry3<f64> {
        read_pose(x, POSE_DOF * (sample + 1))
    }
}

impl ResidualModel for StereoReprojection<'_> {
    fn residuals(&self, x: &DVector<f64>) -> DVector<f64> {
        let sec_from_ref = Self::sec_from_ref(x);
        let mut r = DVector::zeros(self.residual_count());
        let mut i = 0;
        for (k, (ref_obs, sec_obs)) in self.reference.iter().zip(&self.secondary).enumerate() {
            let ref_from_board = Self::board(x, k);
            for ((p, ref_px), sec_px) in self.world.iter().zip(ref_obs).zip(sec_obs) {
                let in_ref = ref_from_board * p;
                let in_sec = sec_from_ref * in_ref;
                let pr = self.reference_camera.project(&in_ref);
                let ps = self.secondary_camera.project(&in_sec);
                r[i] = pr.x - ref_px.x;
                r[i + 1] = pr.y - ref_px.y;
                r[i + 2] = ps.x - sec_px.x;
                r[i + 3] = ps.y - sec_px.y;
                i += 4;
            }
        }
        r
    }
}

fn write_pose(x: &mut DVector<f64>, offset: usize, pose: &Isometry3<f64>) {
    let w = pose.rotation.scaled_axis();
    let t = pose.translation.vector;
    x.rows_mut(offset, 3).copy_from(&w);
    x.rows_mut(offset + 3, 3).copy_from(&t);
}

fn read_pose(x: &DVector<f64>, offset: usize) -> Isometry3<f64> {
    let w = Vector3::new(x[offset], x[offset + 1], x[offset + 2]);
    let t = Translation3::new(x[offset + 3], x[offset + 4], x[offset + 5]);
    Isometry3::from_parts(t, UnitQuaternion::from_scaled_axis(w))
}
