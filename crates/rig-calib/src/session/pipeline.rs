use std::collections::BTreeMap;

use log::{debug, info, warn};
use rig_calib_core::{
    CameraModel, CornerObservation, CorrespondencePair, ImageSize, StereoExtrinsicsSolver,
    REFERENCE_CAMERA,
};

#[cfg(feature = "tracing")]
use tracing::instrument;

use super::{
    CameraOutcome, DetectionStatus, PairAccumulator, PairStatus, SessionConfig, SessionError,
    SessionResult,
};
use crate::detect::{FrameBatch, PatternDetector};
use crate::invoker::PairCalibrationInvoker;
use crate::resolve::resolve;

/// Stateful calibration of a reference camera against N secondary cameras.
///
/// Not thread-safe by itself: one writer submits batches in order.
pub struct AccumulationSession<D, S> {
    detector: D,
    invoker: PairCalibrationInvoker<S>,
    cameras: Vec<CameraModel>,
    config: SessionConfig,
    accumulators: BTreeMap<usize, PairAccumulator>,
    /// Frame size shared by every accumulated sample.
    image_size: Option<ImageSize>,
}

impl<D, S> AccumulationSession<D, S>
where
    D: PatternDetector,
    S: StereoExtrinsicsSolver,
{
    /// Create a session for `cameras` (index 0 is the reference).
    pub fn new(
        detector: D,
        solver: S,
        cameras: Vec<CameraModel>,
        config: SessionConfig,
    ) -> Result<Self, SessionError> {
        config.pattern.validate()?;
        if cameras.len() < 2 {
            return Err(SessionError::TooFewCameras(cameras.len()));
        }
        for (idx, cam) in cameras.iter().enumerate() {
            cam.validate(idx)?;
        }
        let accumulators = (1..cameras.len())
            .map(|camera| (camera, PairAccumulator::new(camera)))
            .collect();
        Ok(Self {
            detector,
            invoker: PairCalibrationInvoker::new(solver),
            cameras,
            config,
            accumulators,
            image_size: None,
        })
    }

    #[inline]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    #[inline]
    pub fn cameras(&self) -> &[CameraModel] {
        &self.cameras
    }

    #[inline]
    pub fn camera_count(&self) -> usize {
        self.cameras.len()
    }

    #[inline]
    pub fn detector(&self) -> &D {
        &self.detector
    }

    #[inline]
    pub fn invoker(&self) -> &PairCalibrationInvoker<S> {
        &self.invoker
    }

    /// Accumulator of secondary camera `camera`.
    pub fn accumulator(&self, camera: usize) -> Option<&PairAccumulator> {
        self.accumulators.get(&camera)
    }

    /// Samples currently held for secondary camera `camera`.
    pub fn sample_count(&self, camera: usize) -> Option<usize> {
        self.accumulator(camera).map(PairAccumulator::len)
    }

    /// Drop every accumulated sample.
    pub fn reset(&mut self) {
        for acc in self.accumulators.values_mut() {
            acc.clear();
        }
        self.image_size = None;
        debug!("session reset");
    }

    /// Detect the board in every frame of `batch`, accumulate resolved
    /// pairs and solve the pairs that have enough samples.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip_all, fields(cameras = batch.camera_count()))
    )]
    pub fn submit(&mut self, batch: &FrameBatch<'_>) -> Result<SessionResult, SessionError> {
        if batch.camera_count() != self.camera_count() {
            return Err(SessionError::CameraCount {
                expected: self.camera_count(),
                got: batch.camera_count(),
            });
        }
        self.check_image_size(batch.image_size())?;

        let pattern = self.config.pattern;
        let reference = self.detector.detect(batch.reference(), &pattern);
        let secondary = batch.frames()[1..]
            .iter()
            .map(|frame| self.detector.detect(frame, &pattern))
            .collect();
        Ok(self.process(reference, secondary, batch.image_size()))
    }

    /// Same as [`AccumulationSession::submit`] for hosts that run their own
    /// detector. `secondary[i]` belongs to camera `i + 1`.
    pub fn submit_detections(
        &mut self,
        reference: Option<CornerObservation>,
        secondary: Vec<Option<CornerObservation>>,
        image_size: ImageSize,
    ) -> Result<SessionResult, SessionError> {
        if secondary.len() + 1 != self.camera_count() {
            return Err(SessionError::CameraCount {
                expected: self.camera_count(),
                got: secondary.len() + 1,
            });
        }
        self.check_image_size(image_size)?;
        Ok(self.process(reference, secondary, image_size))
    }

    fn check_image_size(&self, got: ImageSize) -> Result<(), SessionError> {
        match self.image_size {
            Some(expected) if expected != got && self.accumulators.values().any(|a| !a.is_empty()) => {
                Err(SessionError::ImageSizeChanged { expected, got })
            }
            _ => Ok(()),
        }
    }

    fn process(
        &mut self,
        reference: Option<CornerObservation>,
        secondary: Vec<Option<CornerObservation>>,
        image_size: ImageSize,
    ) -> SessionResult {
        let expected = self.config.pattern.corner_count();
        let reference = match reference {
            Some(obs) if obs.len() != expected => {
                warn!(
                    "camera {REFERENCE_CAMERA}: detection has {} corners, pattern has {expected}",
                    obs.len()
                );
                None
            }
            other => other,
        };
        let mut all_found = reference.is_some();
        if reference.is_none() {
            debug!("camera {REFERENCE_CAMERA}: board not found");
        }

        let mut detections = Vec::with_capacity(secondary.len());
        for (offset, detection) in secondary.into_iter().enumerate() {
            let camera = offset + 1;
            let status = self.accept(camera, reference.as_ref(), detection, expected);
            if status != DetectionStatus::Accepted {
                all_found = false;
            }
            detections.push(status);
        }
        if detections.contains(&DetectionStatus::Accepted) {
            self.image_size = Some(image_size);
        }

        let required = self.config.required_samples;
        let mut cameras = Vec::with_capacity(detections.len());
        for (offset, detection) in detections.into_iter().enumerate() {
            let camera = offset + 1;
            let samples = self.sample_count(camera).unwrap_or(0);
            let status = if samples > required {
                self.evaluate(camera, image_size)
            } else {
                PairStatus::InsufficientData { samples, required }
            };
            cameras.push(CameraOutcome {
                camera,
                detection,
                samples,
                status,
            });
        }

        let completed = cameras.iter().all(|c| c.status.is_calibrated());
        if completed {
            info!(
                "all {} secondary cameras calibrated, starting a new pass",
                cameras.len()
            );
            self.reset();
        }
        SessionResult {
            all_found,
            completed,
            cameras,
        }
    }

    /// Resolve one secondary detection and append it when usable.
    fn accept(
        &mut self,
        camera: usize,
        reference: Option<&CornerObservation>,
        detection: Option<CornerObservation>,
        expected: usize,
    ) -> DetectionStatus {
        let Some(detection) = detection else {
            debug!("camera {camera}: board not found");
            return DetectionStatus::NotFound;
        };
        if detection.len() != expected {
            warn!(
                "camera {camera}: detection has {} corners, pattern has {expected}",
                detection.len()
            );
            return DetectionStatus::Mismatch;
        }
        let Some(reference) = reference else {
            return DetectionStatus::ReferenceMissing;
        };
        let secondary = match resolve(reference, detection) {
            Ok(secondary) => secondary,
            Err(err) => {
                warn!("camera {camera}: {err}");
                return DetectionStatus::Mismatch;
            }
        };
        let Some(acc) = self.accumulators.get_mut(&camera) else {
            return DetectionStatus::Mismatch;
        };
        acc.push(CorrespondencePair {
            reference: reference.clone(),
            secondary,
        });
        debug!("camera {camera}: sample {} accepted", acc.len());
        DetectionStatus::Accepted
    }

    /// Solve pair `camera`, reusing the last outcome when no sample was added.
    fn evaluate(&mut self, camera: usize, image_size: ImageSize) -> PairStatus {
        let Some(acc) = self.accumulators.get(&camera) else {
            return PairStatus::InsufficientData {
                samples: 0,
                required: self.config.required_samples,
            };
        };
        if let Some(status) = acc.cached() {
            return status.clone();
        }

        let size = self.image_size.unwrap_or(image_size);
        let status = match self.invoker.calibrate_pairs(
            &self.config.pattern,
            acc.pairs(),
            &self.cameras[REFERENCE_CAMERA],
            &self.cameras[camera],
            size,
        ) {
            Ok(cal) => PairStatus::Calibrated(cal),
            Err(err) => {
                warn!("camera {camera}: {err}; collecting more samples");
                PairStatus::DidNotConverge(err)
            }
        };
        if let Some(acc) = self.accumulators.get_mut(&camera) {
            acc.remember(status.clone());
        }
        status
    }
}
