//! Stereo extrinsics for a camera pair observing a planar chessboard.
//!
//! Both cameras' intrinsics are held fixed. The solver returns the rigid
//! transform mapping secondary-camera coordinates into the reference camera
//! frame plus the RMS reprojection error in pixels.
//!
//! ```no_run
//! use rig_calib_stereo::{PlanarStereoSolver, StereoSolverParams};
//!
//! let solver = PlanarStereoSolver::new(StereoSolverParams {
//!     max_rms_px: Some(1.0),
//!     ..StereoSolverParams::default()
//! });
//! # let _ = solver;
//! ```

pub mod lm;
mod params;
mod planar_pose;
mod problem;
mod solver;

pub use params::StereoSolverParams;
pub use planar_pose::{average_isometries, board_pose, pose_from_homography};
pub use solver::{PlanarStereoSolver, StereoSolveReport};
