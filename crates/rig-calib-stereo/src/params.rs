use serde::{Deserialize, Serialize};

/// Parameters of the fixed-intrinsics stereo solve.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StereoSolverParams {
    /// Levenberg–Marquardt patience: the evaluation budget is
    /// `max_iters · (parameters + 1)`.
    pub max_iters: usize,
    /// Relative cost reduction tolerance.
    pub ftol: f64,
    /// Relative step size tolerance.
    pub xtol: f64,
    /// Orthogonality tolerance between residuals and Jacobian columns.
    pub gtol: f64,
    /// Initial trust-region step bound.
    pub stepbound: f64,
    /// Fixed-point iterations used to undistort corners for initialization.
    pub undistort_iters: u32,
    /// Reject solutions whose RMS reprojection error (pixels) exceeds this.
    ///
    /// `None` accepts any converged solution.
    pub max_rms_px: Option<f64>,
}

impl Default for StereoSolverParams {
    fn default() -> Self {
        Self {
            max_iters: 100,
            ftol: 1e-12,
            xtol: 1e-12,
            gtol: 1e-10,
            stepbound: 100.0,
            undistort_iters: 20,
            max_rms_px: None,
        }
    }
}
