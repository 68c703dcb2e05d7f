//! Core types for multi-camera rig calibration.
//!
//! This crate is intentionally small and purely geometric. It does *not*
//! depend on any concrete corner detector or stereo solver; those are the
//! [`StereoExtrinsicsSolver`] capability here and the `PatternDetector`
//! capability in `rig-calib`.
//!
//! Camera index 0 is always the reference camera.

mod camera;
mod homography;
mod image;
mod layout;
mod logger;
mod observation;
mod pattern;
mod solver;
mod transform;

pub use camera::{
    cameras_from_flat, CameraError, CameraIntrinsics, CameraModel, Distortion, DISTORTION_STRIDE,
    INTRINSICS_STRIDE,
};
pub use homography::{estimate_homography, Homography};
pub use image::{FrameView, ImageSize};
pub use layout::{TransformLayout, TRANSFORM_BLOCK_LEN};
pub use observation::{CornerObservation, CorrespondencePair};
pub use pattern::{generate_world_points, ChessboardPattern, PatternError};
pub use solver::{SolveError, StereoExtrinsicsSolver, StereoProblem, StereoSolution};
pub use transform::{RigidTransform, ORTHONORMAL_TOLERANCE};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::{init_from_env, init_with_level, LOG_ENV};

/// Index of the reference camera in every per-camera array.
pub const REFERENCE_CAMERA: usize = 0;
