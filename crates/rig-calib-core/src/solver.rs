//! Stereo extrinsics solve capability.
//!
//! A solver receives the accumulated samples of one camera pair and returns
//! the pose of the secondary camera in the reference camera frame, with both
//! cameras' intrinsics held fixed.

use crate::{CameraModel, CornerObservation, ImageSize, RigidTransform};
use nalgebra::Point3;
use serde::{Deserialize, Serialize};

/// Input of a stereo extrinsics solve.
///
/// `reference[k]` and `secondary[k]` are the k-th sample, each holding one
/// image point per entry of `world`, in the same order.
#[derive(Clone, Copy, Debug)]
pub struct StereoProblem<'a> {
    pub world: &'a [Point3<f64>],
    pub reference: &'a [CornerObservation],
    pub secondary: &'a [CornerObservation],
    pub reference_camera: &'a CameraModel,
    pub secondary_camera: &'a CameraModel,
    pub image_size: ImageSize,
}

impl StereoProblem<'_> {
    #[inline]
    pub fn sample_count(&self) -> usize {
        self.reference.len()
    }
}

/// Output of a successful stereo extrinsics solve.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct StereoSolution {
    /// Maps secondary-camera coordinates into reference-camera coordinates.
    pub transform: RigidTransform,
    /// RMS reprojection error over all corners of both cameras, in pixels.
    pub rms_error: f64,
}

/// Reasons a stereo solve gives up.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum SolveError {
    #[error("no samples to solve from")]
    NoSamples,
    #[error("sample {sample}: expected {expected} points per view, got {got}")]
    PointCountMismatch {
        sample: usize,
        expected: usize,
        got: usize,
    },
    #[error("sample {sample}: degenerate board geometry ({reason})")]
    DegenerateGeometry { sample: usize, reason: &'static str },
    #[error("optimizer did not converge (rms={rms_error:.4} px after {evaluations} evaluations)")]
    NotConverged { rms_error: f64, evaluations: usize },
    #[error("reprojection error {rms_error:.4} px exceeds limit {limit:.4} px")]
    ReprojectionTooLarge { rms_error: f64, limit: f64 },
    #[error("solver produced a non-finite estimate")]
    NonFinite,
}

/// Capability: estimate the relative pose of two cameras from matched
/// chessboard observations.
pub trait StereoExtrinsicsSolver {
    fn solve(&self, problem: &StereoProblem<'_>) -> Result<StereoSolution, SolveError>;
}

impl<S: StereoExtrinsicsSolver + ?Sized> StereoExtrinsicsSolver for &S {
    fn solve(&self, problem: &StereoProblem<'_>) -> Result<StereoSolution, SolveError> {
        (**self).solve(problem)
    }
}
