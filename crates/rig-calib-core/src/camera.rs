//! Pinhole camera model with the 8-coefficient rational distortion.
//!
//! Coefficient order is `k1, k2, p1, p2, k3, k4, k5, k6`, the layout every
//! host-side intrinsics export uses.

use nalgebra::{Matrix3, Point2, Point3, Vector2};
use serde::{Deserialize, Serialize};

/// Number of `f32` values per camera in a flat intrinsics array.
pub const INTRINSICS_STRIDE: usize = 4;
/// Number of `f32` values per camera in a flat distortion array.
pub const DISTORTION_STRIDE: usize = 8;

/// Focal lengths and principal point in pixels. Skew is zero.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CameraIntrinsics {
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
}

impl CameraIntrinsics {
    pub fn new(fx: f64, fy: f64, cx: f64, cy: f64) -> Self {
        Self { fx, fy, cx, cy }
    }

    /// The 3×3 camera matrix `K`.
    pub fn matrix(&self) -> Matrix3<f64> {
        Matrix3::new(
            self.fx, 0.0, self.cx, //
            0.0, self.fy, self.cy, //
            0.0, 0.0, 1.0,
        )
    }
}

/// Rational radial + tangential lens distortion.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Distortion {
    pub k1: f64,
    pub k2: f64,
    pub p1: f64,
    pub p2: f64,
    pub k3: f64,
    #[serde(default)]
    pub k4: f64,
    #[serde(default)]
    pub k5: f64,
    #[serde(default)]
    pub k6: f64,
}

impl Distortion {
    pub fn from_array(c: [f64; DISTORTION_STRIDE]) -> Self {
        Self {
            k1: c[0],
            k2: c[1],
            p1: c[2],
            p2: c[3],
            k3: c[4],
            k4: c[5],
            k5: c[6],
            k6: c[7],
        }
    }

    pub fn to_array(&self) -> [f64; DISTORTION_STRIDE] {
        [
            self.k1, self.k2, self.p1, self.p2, self.k3, self.k4, self.k5, self.k6,
        ]
    }

    fn is_finite(&self) -> bool {
        self.to_array().iter().all(|c| c.is_finite())
    }

    /// Radial numerator and denominator at squared radius `r2`.
    #[inline]
    fn radial_terms(&self, r2: f64) -> (f64, f64) {
        let r4 = r2 * r2;
        let r6 = r4 * r2;
        let num = 1.0 + self.k1 * r2 + self.k2 * r4 + self.k3 * r6;
        let den = 1.0 + self.k4 * r2 + self.k5 * r4 + self.k6 * r6;
        (num, den)
    }

    #[inline]
    fn tangential(&self, x: f64, y: f64, r2: f64) -> (f64, f64) {
        let xy = x * y;
        (
            2.0 * self.p1 * xy + self.p2 * (r2 + 2.0 * x * x),
            self.p1 * (r2 + 2.0 * y * y) + 2.0 * self.p2 * xy,
        )
    }

    /// Map an ideal normalized point to its distorted normalized position.
    pub fn distort(&self, n: &Vector2<f64>) -> Vector2<f64> {
        let (x, y) = (n.x, n.y);
        let r2 = x * x + y * y;
        let (num, den) = self.radial_terms(r2);
        let radial = num / den;
        let (dx, dy) = self.tangential(x, y, r2);
        Vector2::new(x * radial + dx, y * radial + dy)
    }

    /// Invert [`Distortion::distort`] by fixed-point iteration.
    pub fn undistort(&self, n_dist: &Vector2<f64>, iters: u32) -> Vector2<f64> {
        let mut x = n_dist.x;
        let mut y = n_dist.y;
        for _ in 0..iters.max(1) {
            let r2 = x * x + y * y;
            let (num, den) = self.radial_terms(r2);
            let inv_radial = den / num;
            if !inv_radial.is_finite() || inv_radial <= 0.0 {
                break;
            }
            let (dx, dy) = self.tangential(x, y, r2);
            x = (n_dist.x - dx) * inv_radial;
            y = (n_dist.y - dy) * inv_radial;
        }
        Vector2::new(x, y)
    }
}

/// Camera model validation errors.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum CameraError {
    #[error("camera {camera}: focal lengths must be finite and > 0 (fx={fx}, fy={fy})")]
    InvalidFocalLength { camera: usize, fx: f64, fy: f64 },
    #[error("camera {camera}: principal point must be finite")]
    InvalidPrincipalPoint { camera: usize },
    #[error("camera {camera}: distortion coefficients must be finite")]
    InvalidDistortion { camera: usize },
    #[error("expected {expected} {what} values for {cameras} cameras, got {got}")]
    FlatLength {
        what: &'static str,
        cameras: usize,
        expected: usize,
        got: usize,
    },
}

/// Intrinsics plus distortion of one camera.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CameraModel {
    pub intrinsics: CameraIntrinsics,
    #[serde(default)]
    pub distortion: Distortion,
}

impl CameraModel {
    pub fn new(intrinsics: CameraIntrinsics, distortion: Distortion) -> Self {
        Self {
            intrinsics,
            distortion,
        }
    }

    /// Build from the `fx, fy, cx, cy` and `k1..k6` flat records.
    pub fn from_flat(
        intrinsics: &[f32; INTRINSICS_STRIDE],
        distortion: &[f32; DISTORTION_STRIDE],
    ) -> Self {
        let [fx, fy, cx, cy] = (*intrinsics).map(f64::from);
        Self {
            intrinsics: CameraIntrinsics { fx, fy, cx, cy },
            distortion: Distortion::from_array((*distortion).map(f64::from)),
        }
    }

    /// Check that the model can be used for projection. `camera` is only
    /// used for error reporting.
    pub fn validate(&self, camera: usize) -> Result<(), CameraError> {
        let k = &self.intrinsics;
        if !(k.fx.is_finite() && k.fy.is_finite() && k.fx > 0.0 && k.fy > 0.0) {
            return Err(CameraError::InvalidFocalLength {
                camera,
                fx: k.fx,
                fy: k.fy,
            });
        }
        if !(k.cx.is_finite() && k.cy.is_finite()) {
            return Err(CameraError::InvalidPrincipalPoint { camera });
        }
        if !self.distortion.is_finite() {
            return Err(CameraError::InvalidDistortion { camera });
        }
        Ok(())
    }

    /// Project a point given in this camera's frame to pixels.
    ///
    /// The caller is responsible for `p.z > 0`.
    #[inline]
    pub fn project(&self, p: &Point3<f64>) -> Point2<f64> {
        let n = Vector2::new(p.x / p.z, p.y / p.z);
        let d = self.distortion.distort(&n);
        let k = &self.intrinsics;
        Point2::new(k.fx * d.x + k.cx, k.fy * d.y + k.cy)
    }

    /// Undistorted normalized image coordinates of a pixel.
    pub fn normalize(&self, pixel: &Point2<f64>, undistort_iters: u32) -> Point2<f64> {
        let k = &self.intrinsics;
        let n_dist = Vector2::new((pixel.x - k.cx) / k.fx, (pixel.y - k.cy) / k.fy);
        let n = self.distortion.undistort(&n_dist, undistort_iters);
        Point2::new(n.x, n.y)
    }
}

/// Parse per-camera models from flat host arrays (4 intrinsics and 8
/// distortion floats per camera, camera 0 first).
pub fn cameras_from_flat(
    cameras: usize,
    intrinsics: &[f32],
    distortion: &[f32],
) -> Result<Vec<CameraModel>, CameraError> {
    check_flat_len("intrinsics", cameras, INTRINSICS_STRIDE, intrinsics.len())?;
    check_flat_len("distortion", cameras, DISTORTION_STRIDE, distortion.len())?;

    intrinsics
        .chunks_exact(INTRINSICS_STRIDE)
        .zip(distortion.chunks_exact(DISTORTION_STRIDE))
        .enumerate()
        .map(|(idx, (k, d))| {
            let mut k_rec = [0.0_f32; INTRINSICS_STRIDE];
            k_rec.copy_from_slice(k);
            let mut d_rec = [0.0_f32; DISTORTION_STRIDE];
            d_rec.copy_from_slice(d);
            let model = CameraModel::from_flat(&k_rec, &d_rec);
            model.validate(idx)?;
            Ok(model)
        })
        .collect()
}

fn check_flat_len(
    what: &'static str,
    cameras: usize,
    stride: usize,
    got: usize,
) -> Result<(), CameraError> {
    let expected = cameras.saturating_mul(stride);
    if got != expected {
        return Err(CameraError::FlatLength {
            what,
            cameras,
            expected,
            got,
        });
    }
    Ok(())
}
