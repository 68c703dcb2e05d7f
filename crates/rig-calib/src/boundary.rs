//! Flat-buffer entry point for hosts that pass raw arrays.
//!
//! Input: camera count, frames stored back to back (reference first), frame
//! geometry, pattern width/height in inner corners, square length, 4
//! intrinsics floats (`fx fy cx cy`) and 8 distortion floats per camera.
//! Output: `all_found`, `completed` and one [`TRANSFORM_BLOCK_LEN`]-float
//! block per secondary camera.

use log::info;
use rig_calib_core::{
    cameras_from_flat, CameraError, CameraModel, ChessboardPattern, ImageSize, PatternError,
    StereoExtrinsicsSolver, TransformLayout, TRANSFORM_BLOCK_LEN,
};

use crate::detect::{FrameBatch, FrameError, PatternDetector};
use crate::session::{AccumulationSession, SessionConfig, SessionError, SessionResult};

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum BoundaryError {
    #[error(transparent)]
    Pattern(#[from] PatternError),
    #[error(transparent)]
    Camera(#[from] CameraError),
    #[error(transparent)]
    Frame(#[from] FrameError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("output buffer holds {got} floats, expected {expected}")]
    OutputLength { expected: usize, got: usize },
}

/// Raw arguments of one calibration call.
#[derive(Clone, Copy, Debug)]
pub struct FlatCalibrationInput<'a> {
    pub camera_count: usize,
    /// Samples a pair needs to exceed before it is solved.
    pub required_samples: usize,
    pub frames: &'a [u8],
    pub width: u32,
    pub height: u32,
    pub pixel_size: usize,
    /// Inner corners per row.
    pub pattern_width: i32,
    /// Inner corners per column.
    pub pattern_height: i32,
    pub square_length: f32,
    pub intrinsics: &'a [f32],
    pub distortion: &'a [f32],
}

impl FlatCalibrationInput<'_> {
    pub fn pattern(&self) -> Result<ChessboardPattern, PatternError> {
        ChessboardPattern::from_signed(
            self.pattern_height,
            self.pattern_width,
            f64::from(self.square_length),
        )
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FlatCalibrationOutput {
    pub all_found: bool,
    pub completed: bool,
    /// `(camera_count - 1) * 16` floats; all zero unless `completed`.
    pub transforms: Vec<f32>,
}

/// Everything that must stay fixed for samples to be mixed in one session.
#[derive(Clone, Debug, PartialEq)]
struct SessionKey {
    config: SessionConfig,
    cameras: Vec<CameraModel>,
    image_size: ImageSize,
    pixel_size: usize,
}

/// Keeps an [`AccumulationSession`] alive across flat calls and rebuilds it
/// when the call configuration changes.
pub struct FlatCalibrator<D, S> {
    detector: D,
    solver: S,
    layout: TransformLayout,
    session: Option<(SessionKey, AccumulationSession<D, S>)>,
}

impl<D, S> FlatCalibrator<D, S>
where
    D: PatternDetector + Clone,
    S: StereoExtrinsicsSolver + Clone,
{
    pub fn new(detector: D, solver: S) -> Self {
        Self {
            detector,
            solver,
            layout: TransformLayout::default(),
            session: None,
        }
    }

    pub fn with_layout(mut self, layout: TransformLayout) -> Self {
        self.layout = layout;
        self
    }

    #[inline]
    pub fn layout(&self) -> TransformLayout {
        self.layout
    }

    /// Current session, if a call has created one.
    pub fn session(&self) -> Option<&AccumulationSession<D, S>> {
        self.session.as_ref().map(|(_, s)| s)
    }

    /// Drop accumulated samples; the next call starts fresh.
    pub fn reset(&mut self) {
        if let Some((_, session)) = self.session.as_mut() {
            session.reset();
        }
    }

    /// Run one batch. The transform array is zero-filled unless the session
    /// completed.
    pub fn try_calibrate(
        &mut self,
        input: &FlatCalibrationInput<'_>,
    ) -> Result<FlatCalibrationOutput, BoundaryError> {
        let result = self.submit(input)?;
        let mut transforms = vec![0.0; output_len(input.camera_count)];
        if let Some(calibrated) = result.transforms() {
            transforms = self.layout.write_all(&calibrated);
        }
        Ok(FlatCalibrationOutput {
            all_found: result.all_found,
            completed: result.completed,
            transforms,
        })
    }

    /// Run one batch and write blocks into `out` only if the session
    /// completed; otherwise `out` is left as it was. Returns
    /// `(all_found, completed)`.
    pub fn try_calibrate_into(
        &mut self,
        input: &FlatCalibrationInput<'_>,
        out: &mut [f32],
    ) -> Result<(bool, bool), BoundaryError> {
        let expected = output_len(input.camera_count);
        if out.len() != expected {
            return Err(BoundaryError::OutputLength {
                expected,
                got: out.len(),
            });
        }
        let result = self.submit(input)?;
        if let Some(calibrated) = result.transforms() {
            for (block, t) in out.chunks_exact_mut(TRANSFORM_BLOCK_LEN).zip(&calibrated) {
                block.copy_from_slice(&self.layout.write_block(t));
            }
        }
        Ok((result.all_found, result.completed))
    }

    fn submit(&mut self, input: &FlatCalibrationInput<'_>) -> Result<SessionResult, BoundaryError> {
        let pattern = input.pattern()?;
        let batch = FrameBatch::from_interleaved(
            input.frames,
            input.camera_count,
            input.width,
            input.height,
            input.pixel_size,
        )?;
        let cameras = cameras_from_flat(input.camera_count, input.intrinsics, input.distortion)?;
        let key = SessionKey {
            config: SessionConfig::new(pattern, input.required_samples),
            cameras,
            image_size: batch.image_size(),
            pixel_size: input.pixel_size,
        };

        let session = match self.session.take() {
            Some((current, session)) if current == key => (current, session),
            previous => {
                if previous.is_some() {
                    info!("calibration inputs changed, starting a new session");
                }
                let session = AccumulationSession::new(
                    self.detector.clone(),
                    self.solver.clone(),
                    key.cameras.clone(),
                    key.config,
                )?;
                (key, session)
            }
        };
        let (_, active) = self.session.insert(session);
        Ok(active.submit(&batch)?)
    }
}

fn output_len(camera_count: usize) -> usize {
    camera_count.saturating_sub(1) * TRANSFORM_BLOCK_LEN
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{Matrix3, Point2, Vector3};
    use rig_calib_core::{
        CornerObservation, FrameView, RigidTransform, SolveError, StereoProblem, StereoSolution,
    };

    /// First byte 1 = board found, anything else = not found.
    #[derive(Clone)]
    struct FlagDetector;

    impl PatternDetector for FlagDetector {
        fn detect(
            &self,
            frame: &FrameView<'_>,
            pattern: &ChessboardPattern,
        ) -> Option<CornerObservation> {
            if frame.data.first() != Some(&1) {
                return None;
            }
            Some(
                (0..pattern.corner_count())
                    .map(|i| Point2::new(i as f32, 0.5 * i as f32))
                    .collect::<Vec<_>>()
                    .into(),
            )
        }
    }

    #[derive(Clone)]
    struct FixedSolver(RigidTransform);

    impl StereoExtrinsicsSolver for FixedSolver {
        fn solve(&self, _: &StereoProblem<'_>) -> Result<StereoSolution, SolveError> {
            Ok(StereoSolution {
                transform: self.0,
                rms_error: 0.05,
            })
        }
    }

    const INTRINSICS: [f32; 8] = [500.0, 500.0, 2.0, 2.0, 510.0, 505.0, 2.0, 2.0];
    const DISTORTION: [f32; 16] = [0.0; 16];

    fn transform() -> RigidTransform {
        RigidTransform::new(
            nalgebra::Rotation3::from_euler_angles(0.0, 0.3, 0.0).into_inner(),
            Vector3::new(-120.0, 1.0, 2.0),
        )
    }

    fn input<'a>(frames: &'a [u8], square: f32, required: usize) -> FlatCalibrationInput<'a> {
        FlatCalibrationInput {
            camera_count: 2,
            required_samples: required,
            frames,
            width: 2,
            height: 2,
            pixel_size: 1,
            pattern_width: 3,
            pattern_height: 2,
            square_length: square,
            intrinsics: &INTRINSICS,
            distortion: &DISTORTION,
        }
    }

    #[test]
    fn zero_filled_until_completed_then_homogeneous_blocks() {
        let mut cal = FlatCalibrator::new(FlagDetector, FixedSolver(transform()));
        let frames = [1u8; 8];

        let out = cal.try_calibrate(&input(&frames, 10.0, 1)).expect("call");
        assert!(out.all_found);
        assert!(!out.completed);
        assert_eq!(out.transforms, vec![0.0; 16]);

        let out = cal.try_calibrate(&input(&frames, 10.0, 1)).expect("call");
        assert!(out.completed);
        let t = transform();
        assert_eq!(out.transforms.len(), 16);
        assert_eq!(out.transforms[3], t.translation.x as f32);
        assert_eq!(out.transforms[2], t.rotation[(0, 2)] as f32);
        assert_eq!(&out.transforms[12..], &[0.0, 0.0, 0.0, 1.0]);
        assert_eq!(cal.session().and_then(|s| s.sample_count(1)), Some(0));
    }

    #[test]
    fn legacy_layout_into_caller_buffer() {
        let mut cal =
            FlatCalibrator::new(FlagDetector, FixedSolver(transform())).with_layout(TransformLayout::Legacy);
        let frames = [1u8; 8];
        let mut out = [7.0_f32; 16];

        let (found, done) = cal
            .try_calibrate_into(&input(&frames, 10.0, 0), &mut out)
            .expect("call");
        assert!(found && done);
        let t = transform();
        assert_eq!(out[0], -120.0);
        assert_eq!(out[3], t.axis_angle().x as f32);
        assert_eq!(out[4], t.rotation[(1, 0)] as f32);
        assert_eq!(out[11], t.rotation[(2, 2)] as f32);
        assert_eq!(&out[12..], &[0.0; 4]);
    }

    #[test]
    fn caller_buffer_untouched_when_not_completed() {
        let mut cal = FlatCalibrator::new(FlagDetector, FixedSolver(transform()));
        let frames = [1u8, 1, 1, 1, 0, 0, 0, 0];
        let mut out = [7.0_f32; 16];
        let (found, done) = cal
            .try_calibrate_into(&input(&frames, 10.0, 0), &mut out)
            .expect("call");
        assert!(!found);
        assert!(!done);
        assert_eq!(out, [7.0; 16]);

        let mut short = [0.0_f32; 15];
        assert_eq!(
            cal.try_calibrate_into(&input(&frames, 10.0, 0), &mut short),
            Err(BoundaryError::OutputLength {
                expected: 16,
                got: 15
            })
        );
    }

    #[test]
    fn changed_square_length_starts_a_new_session() {
        let mut cal = FlatCalibrator::new(FlagDetector, FixedSolver(RigidTransform::identity()));
        let frames = [1u8; 8];
        cal.try_calibrate(&input(&frames, 10.0, 5)).expect("call");
        cal.try_calibrate(&input(&frames, 10.0, 5)).expect("call");
        assert_eq!(cal.session().and_then(|s| s.sample_count(1)), Some(2));

        cal.try_calibrate(&input(&frames, 12.5, 5)).expect("call");
        assert_eq!(cal.session().and_then(|s| s.sample_count(1)), Some(1));
        assert_eq!(
            cal.session().map(|s| s.config().pattern.square_size),
            Some(12.5)
        );
    }

    #[test]
    fn invalid_arguments_are_rejected_before_accumulating() {
        let mut cal = FlatCalibrator::new(FlagDetector, FixedSolver(RigidTransform::identity()));
        let frames = [1u8; 8];
        cal.try_calibrate(&input(&frames, 10.0, 5)).expect("call");

        let mut bad = input(&frames, 10.0, 5);
        bad.pattern_width = 0;
        assert_eq!(
            cal.try_calibrate(&bad).map(|_| ()),
            Err(BoundaryError::Pattern(PatternError::InvalidCols))
        );

        let bad = FlatCalibrationInput {
            intrinsics: &INTRINSICS[..7],
            ..input(&frames, 10.0, 5)
        };
        assert!(matches!(
            cal.try_calibrate(&bad),
            Err(BoundaryError::Camera(CameraError::FlatLength { .. }))
        ));

        let bad = FlatCalibrationInput {
            frames: &frames[..7],
            ..input(&frames, 10.0, 5)
        };
        assert!(matches!(
            cal.try_calibrate(&bad),
            Err(BoundaryError::Frame(FrameError::BufferLength { .. }))
        ));

        let bad = input(&frames, -1.0, 5);
        assert!(matches!(
            cal.try_calibrate(&bad),
            Err(BoundaryError::Pattern(PatternError::InvalidSquareSize(_)))
        ));
        assert_eq!(cal.session().and_then(|s| s.sample_count(1)), Some(1));
    }

    #[test]
    fn identity_rotation_survives_every_layout() {
        let id = RigidTransform::new(Matrix3::identity(), Vector3::zeros());
        for layout in [
            TransformLayout::Homogeneous,
            TransformLayout::TranslationAxisAngle,
            TransformLayout::Legacy,
        ] {
            let mut cal = FlatCalibrator::new(FlagDetector, FixedSolver(id)).with_layout(layout);
            let out = cal.try_calibrate(&input(&[1u8; 8], 1.0, 0)).expect("call");
            assert!(out.completed);
            assert!(out.transforms.iter().all(|v| v.is_finite()));
        }
    }
}
