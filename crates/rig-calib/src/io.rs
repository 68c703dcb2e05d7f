//! JSON configuration for a calibration rig.

use std::{fs, path::Path};

use rig_calib_core::{CameraModel, TransformLayout};
use rig_calib_stereo::{PlanarStereoSolver, StereoSolverParams};
use serde::{Deserialize, Serialize};

use crate::boundary::FlatCalibrator;
use crate::detect::PatternDetector;
use crate::session::{AccumulationSession, SessionConfig, SessionError};

#[derive(thiserror::Error, Debug)]
pub enum RigCalibIoError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Cameras, session and solver settings of one rig.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RigCalibConfig {
    pub session: SessionConfig,
    /// One model per camera, reference first.
    pub cameras: Vec<CameraModel>,
    #[serde(default)]
    pub solver: StereoSolverParams,
    #[serde(default)]
    pub layout: TransformLayout,
}

impl RigCalibConfig {
    /// Load a JSON config from disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, RigCalibIoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this config to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), RigCalibIoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn build_solver(&self) -> PlanarStereoSolver {
        PlanarStereoSolver::new(self.solver.clone())
    }

    /// Build a session using the stereo solver configured here.
    pub fn build_session<D: PatternDetector>(
        &self,
        detector: D,
    ) -> Result<AccumulationSession<D, PlanarStereoSolver>, SessionError> {
        AccumulationSession::new(
            detector,
            self.build_solver(),
            self.cameras.clone(),
            self.session,
        )
    }

    /// Flat-boundary calibrator using the configured solver and layout.
    pub fn build_flat_calibrator<D: PatternDetector + Clone>(
        &self,
        detector: D,
    ) -> FlatCalibrator<D, PlanarStereoSolver> {
        FlatCalibrator::new(detector, self.build_solver()).with_layout(self.layout)
    }
}
