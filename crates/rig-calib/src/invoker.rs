use log::{info, warn};
use nalgebra::Point3;
use rig_calib_core::{
    CameraModel, ChessboardPattern, CornerObservation, CorrespondencePair, ImageSize,
    PatternError, RigidTransform, SolveError, StereoExtrinsicsSolver, StereoProblem,
    ORTHONORMAL_TOLERANCE,
};
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Errors returned by a pair calibration.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum CalibrationError {
    #[error(transparent)]
    InvalidPattern(#[from] PatternError),
    #[error("calibration did not converge: {0}")]
    DidNotConverge(#[from] SolveError),
}

/// Calibrated pose of one secondary camera.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PairCalibration {
    /// Maps secondary-camera coordinates into the reference camera frame.
    /// Translation is in the unit of the pattern's square size.
    pub transform: RigidTransform,
    /// RMS reprojection error in pixels.
    pub rms_error: f64,
    /// Number of samples the solve used.
    pub samples: usize,
}

/// Runs a [`StereoExtrinsicsSolver`] over the samples accumulated for one
/// camera pair and normalizes its output.
#[derive(Clone, Debug, Default)]
pub struct PairCalibrationInvoker<S> {
    solver: S,
}

impl<S: StereoExtrinsicsSolver> PairCalibrationInvoker<S> {
    pub fn new(solver: S) -> Self {
        Self { solver }
    }

    #[inline]
    pub fn solver(&self) -> &S {
        &self.solver
    }

    /// Solve for the secondary camera pose with both intrinsics fixed.
    ///
    /// `reference[k]` and `secondary[k]` must each hold one point per entry
    /// of `world`. The returned rotation is orthonormal to
    /// [`ORTHONORMAL_TOLERANCE`].
    pub fn calibrate(
        &self,
        world: &[Point3<f64>],
        reference: &[CornerObservation],
        secondary: &[CornerObservation],
        reference_camera: &CameraModel,
        secondary_camera: &CameraModel,
        image_size: ImageSize,
    ) -> Result<PairCalibration, CalibrationError> {
        check_samples(world.len(), reference, secondary)?;

        let problem = StereoProblem {
            world,
            reference,
            secondary,
            reference_camera,
            secondary_camera,
            image_size,
        };
        let solution = self.solver.solve(&problem)?;

        if !solution.rms_error.is_finite()
            || !solution.transform.translation.iter().all(|v| v.is_finite())
        {
            return Err(SolveError::NonFinite.into());
        }
        let drift = solution.transform.orthonormality_error();
        let transform = solution
            .transform
            .normalized(ORTHONORMAL_TOLERANCE)
            .ok_or(SolveError::NonFinite)?;
        if drift > ORTHONORMAL_TOLERANCE {
            warn!("solver rotation drifted by {drift:.3e}, re-orthogonalized");
        }

        Ok(PairCalibration {
            transform,
            rms_error: solution.rms_error,
            samples: reference.len(),
        })
    }

    /// [`PairCalibrationInvoker::calibrate`] on accumulated correspondence
    /// pairs of `pattern`.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip_all, fields(samples = pairs.len()))
    )]
    pub fn calibrate_pairs(
        &self,
        pattern: &ChessboardPattern,
        pairs: &[CorrespondencePair],
        reference_camera: &CameraModel,
        secondary_camera: &CameraModel,
        image_size: ImageSize,
    ) -> Result<PairCalibration, CalibrationError> {
        pattern.validate()?;
        let world = pattern.world_points();
        let (reference, secondary): (Vec<_>, Vec<_>) = pairs
            .iter()
            .map(|p| (p.reference.clone(), p.secondary.clone()))
            .unzip();
        let out = self.calibrate(
            &world,
            &reference,
            &secondary,
            reference_camera,
            secondary_camera,
            image_size,
        );
        if let Ok(cal) = &out {
            info!(
                "pair solved from {} samples: |t|={:.3}, angle={:.4} rad, rms={:.4} px",
                cal.samples,
                cal.transform.translation.norm(),
                cal.transform.angle(),
                cal.rms_error
            );
        }
        out
    }
}

fn check_samples(
    expected: usize,
    reference: &[CornerObservation],
    secondary: &[CornerObservation],
) -> Result<(), SolveError> {
    if reference.is_empty() {
        return Err(SolveError::NoSamples);
    }
    if reference.len() != secondary.len() {
        return Err(SolveError::PointCountMismatch {
            sample: reference.len().min(secondary.len()),
            expected: reference.len(),
            got: secondary.len(),
        });
    }
    for (sample, (r, s)) in reference.iter().zip(secondary).enumerate() {
        for got in [r.len(), s.len()] {
            if got != expected {
                return Err(SolveError::PointCountMismatch {
                    sample,
                    expected,
                    got,
                });
            }
        }
    }
    Ok(())
}
