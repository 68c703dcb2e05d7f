use rig_calib_core::RigidTransform;

use crate::invoker::{CalibrationError, PairCalibration};

/// What happened to one secondary camera's detection this batch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DetectionStatus {
    /// Resolved against the reference and appended to the accumulator.
    Accepted,
    /// The board was not found in this camera's frame.
    NotFound,
    /// The detection did not match the pattern or the reference detection.
    Mismatch,
    /// The secondary detection was usable but the reference frame had none.
    ReferenceMissing,
}

/// State of one camera pair after the evaluation step of a submit.
#[derive(Clone, Debug, PartialEq)]
pub enum PairStatus {
    InsufficientData { samples: usize, required: usize },
    DidNotConverge(CalibrationError),
    Calibrated(PairCalibration),
}

impl PairStatus {
    pub fn calibration(&self) -> Option<&PairCalibration> {
        match self {
            PairStatus::Calibrated(cal) => Some(cal),
            _ => None,
        }
    }

    #[inline]
    pub fn is_calibrated(&self) -> bool {
        matches!(self, PairStatus::Calibrated(_))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct CameraOutcome {
    pub camera: usize,
    pub detection: DetectionStatus,
    /// Samples held for this camera when the pair was evaluated.
    pub samples: usize,
    pub status: PairStatus,
}

/// Output of one submit.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionResult {
    /// Every camera, reference included, produced a usable detection.
    pub all_found: bool,
    /// Every pair calibrated in this submit; accumulators were cleared.
    pub completed: bool,
    /// One entry per secondary camera, in camera order.
    pub cameras: Vec<CameraOutcome>,
}

impl SessionResult {
    /// Per-secondary transforms, only when the session completed.
    pub fn transforms(&self) -> Option<Vec<RigidTransform>> {
        self.calibrations()
            .map(|cals| cals.into_iter().map(|c| c.transform).collect())
    }

    pub fn calibrations(&self) -> Option<Vec<PairCalibration>> {
        if !self.completed {
            return None;
        }
        self.cameras
            .iter()
            .map(|c| c.status.calibration().copied())
            .collect()
    }

    pub fn outcome(&self, camera: usize) -> Option<&CameraOutcome> {
        self.cameras.iter().find(|c| c.camera == camera)
    }
}
