use log::{debug, warn};
use nalgebra::{Isometry3, Point2, Point3};
use rig_calib_core::{
    CameraModel, CornerObservation, RigidTransform, SolveError, StereoExtrinsicsSolver,
    StereoProblem, StereoSolution,
};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::lm::{refine, RefineOptions, RefineReport};
use crate::params::StereoSolverParams;
use crate::planar_pose::{average_isometries, board_pose};
use crate::problem::StereoReprojection;

const PLANAR_TOLERANCE: f64 = 1e-9;

/// Stereo extrinsics from planar board samples with both intrinsics fixed.
///
/// Initializes every board pose from its homography, averages the per-sample
/// relative poses, then refines the relative pose and all board poses jointly
/// by minimizing the reprojection error in both cameras.
#[derive(Clone, Debug, Default)]
pub struct PlanarStereoSolver {
    pub params: StereoSolverParams,
}

/// Full result of a solve, including the optimizer report.
#[derive(Clone, Debug)]
pub struct StereoSolveReport {
    pub solution: StereoSolution,
    pub lm: RefineReport,
    /// Board poses in the reference camera frame, one per sample.
    pub board_poses: Vec<Isometry3<f64>>,
}

impl PlanarStereoSolver {
    pub fn new(params: StereoSolverParams) -> Self {
        Self { params }
    }

    fn refine_options(&self) -> RefineOptions {
        RefineOptions {
            ftol: self.params.ftol,
            xtol: self.params.xtol,
            gtol: self.params.gtol,
            stepbound: self.params.stepbound,
            patience: self.params.max_iters,
        }
    }

    /// Solve and return the optimizer report alongside the solution.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, problem), fields(samples = problem.sample_count()))
    )]
    pub fn solve_with_report(
        &self,
        problem: &StereoProblem<'_>,
    ) -> Result<StereoSolveReport, SolveError> {
        check_problem(problem)?;

        let iters = self.params.undistort_iters;
        let reference = to_pixels(problem.reference);
        let secondary = to_pixels(problem.secondary);

        let mut boards = Vec::with_capacity(reference.len());
        let mut relative = Vec::with_capacity(reference.len());
        for (k, (ref_px, sec_px)) in reference.iter().zip(&secondary).enumerate() {
            let ref_board = initial_pose(problem.world, ref_px, problem.reference_camera, iters)
                .ok_or(SolveError::DegenerateGeometry {
                    sample: k,
                    reason: "reference view homography",
                })?;
            let sec_board = initial_pose(problem.world, sec_px, problem.secondary_camera, iters)
                .ok_or(SolveError::DegenerateGeometry {
                    sample: k,
                    reason: "secondary view homography",
                })?;
            relative.push(sec_board * ref_board.inverse());
            boards.push(ref_board);
        }
        let sec_from_ref = average_isometries(&relative).ok_or(SolveError::NoSamples)?;
        debug!(
            "stereo init: {} samples, |t|={:.4}, angle={:.5} rad",
            boards.len(),
            sec_from_ref.translation.vector.norm(),
            sec_from_ref.rotation.angle()
        );

        let residuals = StereoReprojection {
            world: problem.world,
            reference,
            secondary,
            reference_camera: problem.reference_camera,
            secondary_camera: problem.secondary_camera,
        };
        let x0 = StereoReprojection::pack(&sec_from_ref, &boards);
        let (x, lm) = refine(&residuals, x0, &self.refine_options());

        if !x.iter().all(|v| v.is_finite()) || !lm.final_cost.is_finite() {
            return Err(SolveError::NonFinite);
        }
        let point_count = (residuals.residual_count() / 2) as f64;
        let rms_error = (2.0 * lm.final_cost / point_count).sqrt();
        debug!(
            "stereo refine: {} after {} evaluations, rms {:.6} px (initial {:.6} px)",
            lm.termination,
            lm.evaluations,
            rms_error,
            (2.0 * lm.initial_cost / point_count).sqrt()
        );
        if !lm.converged {
            warn!(
                "stereo refine stopped with {}, rms {:.4} px",
                lm.termination, rms_error
            );
            return Err(SolveError::NotConverged {
                rms_error,
                evaluations: lm.evaluations,
            });
        }
        if let Some(limit) = self.params.max_rms_px {
            if rms_error > limit {
                return Err(SolveError::ReprojectionTooLarge { rms_error, limit });
            }
        }

        let sec_from_ref = StereoReprojection::sec_from_ref(&x);
        let board_poses: Vec<Isometry3<f64>> = (0..residuals.reference.len())
            .map(|k| StereoReprojection::board(&x, k))
            .collect();
        for (k, board) in board_poses.iter().enumerate() {
            let centre = board.translation.vector;
            let in_sec = sec_from_ref * Point3::from(centre);
            if centre.z <= 0.0 || in_sec.z <= 0.0 {
                return Err(SolveError::DegenerateGeometry {
                    sample: k,
                    reason: "board behind camera",
                });
            }
        }

        Ok(StereoSolveReport {
            solution: StereoSolution {
                transform: RigidTransform::from_isometry(&sec_from_ref.inverse()),
                rms_error,
            },
            lm,
            board_poses,
        })
    }
}

impl StereoExtrinsicsSolver for PlanarStereoSolver {
    fn solve(&self, problem: &StereoProblem<'_>) -> Result<StereoSolution, SolveError> {
        self.solve_with_report(problem).map(|r| r.solution)
    }
}

fn check_problem(problem: &StereoProblem<'_>) -> Result<(), SolveError> {
    if problem.reference.is_empty() {
        return Err(SolveError::NoSamples);
    }
    let expected = problem.world.len();
    if problem.secondary.len() != problem.reference.len() {
        return Err(SolveError::PointCountMismatch {
            sample: problem.reference.len().min(problem.secondary.len()),
            expected: problem.reference.len(),
            got: problem.secondary.len(),
        });
    }
    for (k, (r, s)) in problem.reference.iter().zip(problem.secondary).enumerate() {
        for obs in [r, s] {
            if obs.len() != expected {
                return Err(SolveError::PointCountMismatch {
                    sample: k,
                    expected,
                    got: obs.len(),
                });
            }
        }
    }
    if expected < 4 {
        return Err(SolveError::DegenerateGeometry {
            sample: 0,
            reason: "fewer than 4 corners",
        });
    }
    if problem.world.iter().any(|p| p.z.abs() > PLANAR_TOLERANCE) {
        return Err(SolveError::DegenerateGeometry {
            sample: 0,
            reason: "world points not on z = 0",
        });
    }
    Ok(())
}

fn to_pixels(samples: &[CornerObservation]) -> Vec<Vec<Point2<f64>>> {
    samples
        .iter()
        .map(|obs| {
            obs.points
                .iter()
                .map(|p| Point2::new(f64::from(p.x), f64::from(p.y)))
                .collect()
        })
        .collect()
}

fn initial_pose(
    world: &[Point3<f64>],
    pixels: &[Point2<f64>],
    camera: &CameraModel,
    undistort_iters: u32,
) -> Option<Isometry3<f64>> {
    let normalized: Vec<Point2<f64>> = pixels
        .iter()
        .map(|p| camera.normalize(p, undistort_iters))
        .collect();
    board_pose(world, &normalized)
}
