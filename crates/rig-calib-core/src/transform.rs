use nalgebra::{
    Isometry3, Matrix3, Matrix4, Point3, Rotation3, Translation3, UnitQuaternion, Vector3,
};
use serde::{Deserialize, Serialize};

/// Tolerance on `max |RᵀR - I|` above which a rotation gets re-orthogonalized.
pub const ORTHONORMAL_TOLERANCE: f64 = 1e-6;

/// Rotation + translation mapping points from one camera frame into another.
///
/// For a secondary camera calibrated against the reference camera,
/// `apply(p_secondary) == p_reference`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RigidTransform {
    pub rotation: Matrix3<f64>,
    pub translation: Vector3<f64>,
}

impl Default for RigidTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl RigidTransform {
    pub fn new(rotation: Matrix3<f64>, translation: Vector3<f64>) -> Self {
        Self {
            rotation,
            translation,
        }
    }

    pub fn identity() -> Self {
        Self::new(Matrix3::identity(), Vector3::zeros())
    }

    /// Take the upper-left 3×3 block as rotation and the last column as translation.
    pub fn from_homogeneous(h: &Matrix4<f64>) -> Self {
        Self {
            rotation: h.fixed_view::<3, 3>(0, 0).into_owned(),
            translation: Vector3::new(h[(0, 3)], h[(1, 3)], h[(2, 3)]),
        }
    }

    /// `[R | t; 0 0 0 1]`.
    pub fn to_homogeneous(&self) -> Matrix4<f64> {
        let mut h = Matrix4::identity();
        h.fixed_view_mut::<3, 3>(0, 0).copy_from(&self.rotation);
        h.fixed_view_mut::<3, 1>(0, 3).copy_from(&self.translation);
        h
    }

    /// Homogeneous product `H_self * H_second`: applies `second` first,
    /// then `self`.
    pub fn compose_with(&self, second: &RigidTransform) -> RigidTransform {
        RigidTransform::from_homogeneous(&(self.to_homogeneous() * second.to_homogeneous()))
    }

    /// Inverse mapping. Assumes `rotation` is orthonormal.
    pub fn inverse(&self) -> RigidTransform {
        let rt = self.rotation.transpose();
        RigidTransform::new(rt, -(rt * self.translation))
    }

    #[inline]
    pub fn apply(&self, p: &Point3<f64>) -> Point3<f64> {
        Point3::from(self.rotation * p.coords + self.translation)
    }

    pub fn from_isometry(iso: &Isometry3<f64>) -> Self {
        Self::new(
            *iso.rotation.to_rotation_matrix().matrix(),
            iso.translation.vector,
        )
    }

    pub fn to_isometry(&self) -> Isometry3<f64> {
        let rot = UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(
            self.rotation,
        ));
        Isometry3::from_parts(Translation3::from(self.translation), rot)
    }

    /// Largest absolute entry of `RᵀR - I`.
    pub fn orthonormality_error(&self) -> f64 {
        (self.rotation.transpose() * self.rotation - Matrix3::identity()).amax()
    }

    /// Project the rotation onto SO(3) (closest rotation in Frobenius norm).
    ///
    /// Returns `None` if the rotation block is not finite.
    pub fn orthonormalized(&self) -> Option<RigidTransform> {
        if !self.rotation.iter().all(|v| v.is_finite()) {
            return None;
        }
        let svd = self.rotation.svd(true, true);
        let mut u = svd.u?;
        let v_t = svd.v_t?;
        if (u * v_t).determinant() < 0.0 {
            u.column_mut(2).neg_mut();
        }
        Some(RigidTransform::new(u * v_t, self.translation))
    }

    /// Re-orthogonalize only when the rotation drifted beyond `tolerance`.
    pub fn normalized(&self, tolerance: f64) -> Option<RigidTransform> {
        if self.orthonormality_error() <= tolerance && self.rotation.determinant() > 0.0 {
            return Some(*self);
        }
        self.orthonormalized()
    }

    /// Rotation as an axis-angle (Rodrigues) vector: unit axis scaled by the
    /// angle in radians.
    pub fn axis_angle(&self) -> Vector3<f64> {
        Rotation3::from_matrix(&self.rotation).scaled_axis()
    }

    /// Rotation angle in radians.
    pub fn angle(&self) -> f64 {
        Rotation3::from_matrix(&self.rotation).angle()
    }
}
