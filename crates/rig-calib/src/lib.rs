//! Incremental extrinsic calibration of a multi-camera rig from chessboard
//! observations.
//!
//! Camera 0 is the reference. Each submitted batch holds one frame per
//! camera; the board is detected in every frame, secondary detections are
//! reordered to match the reference, and each camera pair is solved once it
//! has strictly more samples than required. When every pair solves in the
//! same batch the session reports completion and starts over.
//!
//! ## Quickstart
//!
//! ```no_run
//! use rig_calib::{AccumulationSession, FrameBatch, PatternDetector, SessionConfig};
//! use rig_calib::core::{CameraModel, ChessboardPattern, CornerObservation, FrameView};
//! use rig_calib::stereo::PlanarStereoSolver;
//!
//! struct MyDetector;
//! impl PatternDetector for MyDetector {
//!     fn detect(&self, _: &FrameView<'_>, _: &ChessboardPattern) -> Option<CornerObservation> {
//!         None
//!     }
//! }
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! # let cameras: Vec<CameraModel> = Vec::new();
//! # let buffer: Vec<u8> = Vec::new();
//! let config = SessionConfig::new(ChessboardPattern::new(6, 9, 25.0)?, 10);
//! let mut session =
//!     AccumulationSession::new(MyDetector, PlanarStereoSolver::default(), cameras, config)?;
//! let batch = FrameBatch::from_interleaved(&buffer, 3, 1280, 720, 4)?;
//! let result = session.submit(&batch)?;
//! if let Some(transforms) = result.transforms() {
//!     println!("calibrated {} cameras", transforms.len());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `rig_calib::core`: camera model, observations, patterns, transforms.
//! - `rig_calib::stereo`: the planar stereo extrinsics solver.
//! - [`AccumulationSession`]: the per-batch state machine.
//! - [`FlatCalibrator`]: flat-array entry point for native hosts.

pub use rig_calib_core as core;
pub use rig_calib_stereo as stereo;

mod boundary;
mod detect;
mod invoker;
mod io;
mod resolve;
mod session;

pub use boundary::{BoundaryError, FlatCalibrationInput, FlatCalibrationOutput, FlatCalibrator};
pub use detect::{FrameBatch, FrameError, PatternDetector};
pub use invoker::{CalibrationError, PairCalibration, PairCalibrationInvoker};
pub use io::{RigCalibConfig, RigCalibIoError};
pub use resolve::{resolve, ResolveError};
pub use session::{
    AccumulationSession, CameraOutcome, DetectionStatus, PairAccumulator, PairStatus,
    SessionConfig, SessionError, SessionResult,
};

pub use rig_calib_core::{
    generate_world_points, init_from_env, init_with_level, CameraModel, ChessboardPattern,
    CornerObservation, CorrespondencePair, RigidTransform, TransformLayout,
};

#[cfg(feature = "tracing")]
pub use rig_calib_core::init_tracing;
