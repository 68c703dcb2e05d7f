use crate::detect::FrameError;
use rig_calib_core::{CameraError, ImageSize, PatternError};

/// Configuration errors. Returned before any accumulator is touched.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    #[error(transparent)]
    InvalidPattern(#[from] PatternError),
    #[error(transparent)]
    Camera(#[from] CameraError),
    #[error(transparent)]
    Frame(#[from] FrameError),
    #[error("a session needs the reference camera and at least one secondary camera (got {0})")]
    TooFewCameras(usize),
    #[error("session calibrates {expected} cameras, batch has {got}")]
    CameraCount { expected: usize, got: usize },
    #[error("frame size changed from {expected:?} to {got:?} while samples are accumulated")]
    ImageSizeChanged { expected: ImageSize, got: ImageSize },
}
