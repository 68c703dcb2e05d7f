use std::collections::HashMap;

use approx::assert_abs_diff_eq;
use nalgebra::{Isometry3, Point2, Translation3, UnitQuaternion};
use rig_calib::core::{CameraIntrinsics, Distortion, FrameView};
use rig_calib::stereo::PlanarStereoSolver;
use rig_calib::{
    AccumulationSession, CameraModel, ChessboardPattern, CornerObservation, DetectionStatus,
    FlatCalibrationInput, FrameBatch, PatternDetector, SessionConfig, TransformLayout,
};

const POSES: usize = 7;

/// Looks up precomputed corners by `(camera, pose)` read from the first two
/// bytes of the frame. Pose byte 0 means no board in view.
#[derive(Clone)]
struct TableDetector {
    table: HashMap<(u8, u8), CornerObservation>,
}

impl PatternDetector for TableDetector {
    fn detect(&self, frame: &FrameView<'_>, _: &ChessboardPattern) -> Option<CornerObservation> {
        let camera = *frame.data.first()?;
        let pose = *frame.data.get(1)?;
        self.table.get(&(camera, pose)).cloned()
    }
}

fn pattern() -> ChessboardPattern {
    ChessboardPattern::new(6, 9, 25.0).expect("pattern")
}

fn cameras() -> Vec<CameraModel> {
    vec![
        CameraModel::new(
            CameraIntrinsics::new(800.0, 800.0, 640.0, 360.0),
            Distortion {
                k1: -0.06,
                k2: 0.01,
                ..Distortion::default()
            },
        ),
        CameraModel::new(
            CameraIntrinsics::new(810.0, 805.0, 635.0, 365.0),
            Distortion::default(),
        ),
        CameraModel::new(
            CameraIntrinsics::new(790.0, 792.0, 645.0, 355.0),
            Distortion {
                k1: -0.04,
                p1: 0.0005,
                ..Distortion::default()
            },
        ),
    ]
}

/// `ref_from_cam[i]`: pose of camera `i` in the reference frame.
fn rig() -> Vec<Isometry3<f64>> {
    vec![
        Isometry3::identity(),
        Isometry3::from_parts(
            Translation3::new(-140.0, 5.0, 10.0),
            UnitQuaternion::from_euler_angles(0.02, -0.25, 0.01),
        ),
        Isometry3::from_parts(
            Translation3::new(130.0, -8.0, 15.0),
            UnitQuaternion::from_euler_angles(-0.03, 0.22, -0.02),
        ),
    ]
}

fn boards() -> Vec<Isometry3<f64>> {
    (0..POSES)
        .map(|i| {
            let a = i as f64;
            Isometry3::from_parts(
                Translation3::new(-100.0 + 8.0 * a, -65.0 + 4.0 * a, 720.0 + 20.0 * a),
                UnitQuaternion::from_euler_angles(
                    0.25 * (a * 1.3).sin(),
                    0.3 * (a * 0.9).cos(),
                    0.1 * (a * 0.5).sin(),
                ),
            )
        })
        .collect()
}

/// Camera 2 reports every board in reversed order.
fn detector() -> TableDetector {
    let world = pattern().world_points();
    let mut table = HashMap::new();
    for (cam_idx, (cam, ref_from_cam)) in cameras().iter().zip(rig()).enumerate() {
        let cam_from_ref = ref_from_cam.inverse();
        for (pose_idx, board) in boards().iter().enumerate() {
            let cam_from_board = cam_from_ref * board;
            let mut points: Vec<Point2<f32>> = world
                .iter()
                .map(|p| {
                    let px = cam.project(&(cam_from_board * p));
                    Point2::new(px.x as f32, px.y as f32)
                })
                .collect();
            if cam_idx == 2 {
                points.reverse();
            }
            table.insert((cam_idx as u8, pose_idx as u8 + 1), points.into());
        }
    }
    TableDetector { table }
}

/// Three 2×1 single-channel frames: `[camera, pose]` each.
fn frames(poses: [u8; 3]) -> Vec<u8> {
    poses
        .iter()
        .enumerate()
        .flat_map(|(cam, &pose)| [cam as u8, pose])
        .collect()
}

fn assert_matches_rig(transforms: &[rig_calib::RigidTransform]) {
    for (got, truth) in transforms.iter().zip(rig().iter().skip(1)) {
        let got = got.to_isometry();
        let t_err = (got.translation.vector - truth.translation.vector).norm()
            / truth.translation.vector.norm();
        assert!(t_err < 1e-3, "relative translation error {t_err}");
        assert!(got.rotation.angle_to(&truth.rotation) < 1e-4);
    }
}

#[test]
fn session_recovers_rig_after_threshold() {
    let _ = env_logger::builder().is_test(true).try_init();
    let config = SessionConfig::new(pattern(), 4);
    let mut session =
        AccumulationSession::new(detector(), PlanarStereoSolver::default(), cameras(), config)
            .expect("session");

    // Camera 2 misses the first board.
    let buf = frames([1, 1, 0]);
    let batch = FrameBatch::from_interleaved(&buf, 3, 2, 1, 1).expect("batch");
    let r = session.submit(&batch).expect("submit");
    assert!(!r.all_found);
    assert_eq!(r.cameras[1].detection, DetectionStatus::NotFound);

    let mut completed = None;
    for pose in 2..=POSES as u8 {
        let buf = frames([pose; 3]);
        let batch = FrameBatch::from_interleaved(&buf, 3, 2, 1, 1).expect("batch");
        let r = session.submit(&batch).expect("submit");
        assert!(r.all_found);
        if r.completed {
            completed = Some((pose, r));
            break;
        }
    }

    let (pose, result) = completed.expect("session completed");
    // Camera 1 exceeds 4 samples at pose 5, camera 2 (one behind) at pose 6.
    assert_eq!(pose, 6);
    assert_eq!(result.cameras[0].samples, 6);
    assert_eq!(result.cameras[1].samples, 5);
    let transforms = result.transforms().expect("transforms");
    assert_eq!(transforms.len(), 2);
    assert_matches_rig(&transforms);
    for cal in result.calibrations().expect("calibrations") {
        assert!(cal.rms_error < 1e-2, "rms {}", cal.rms_error);
    }
    assert_eq!(session.sample_count(1), Some(0));
    assert_eq!(session.sample_count(2), Some(0));
}

#[test]
fn flat_boundary_emits_homogeneous_blocks() {
    let intrinsics: Vec<f32> = cameras()
        .iter()
        .flat_map(|c| {
            let k = c.intrinsics;
            [k.fx as f32, k.fy as f32, k.cx as f32, k.cy as f32]
        })
        .collect();
    let distortion: Vec<f32> = cameras()
        .iter()
        .flat_map(|c| c.distortion.to_array().map(|v| v as f32))
        .collect();

    let mut calibrator = rig_calib::FlatCalibrator::new(detector(), PlanarStereoSolver::default())
        .with_layout(TransformLayout::Homogeneous);
    let mut last = None;
    for pose in 1..=4u8 {
        let buf = frames([pose; 3]);
        let input = FlatCalibrationInput {
            camera_count: 3,
            required_samples: 3,
            frames: &buf,
            width: 2,
            height: 1,
            pixel_size: 1,
            pattern_width: 9,
            pattern_height: 6,
            square_length: 25.0,
            intrinsics: &intrinsics,
            distortion: &distortion,
        };
        let out = calibrator.try_calibrate(&input).expect("call");
        assert!(out.all_found);
        assert_eq!(out.completed, pose == 4);
        last = Some(out);
    }

    let out = last.expect("output");
    assert_eq!(out.transforms.len(), 32);
    for (block, truth) in out.transforms.chunks_exact(16).zip(rig().iter().skip(1)) {
        let t = truth.translation.vector;
        assert_abs_diff_eq!(f64::from(block[3]), t.x, epsilon = 0.2);
        assert_abs_diff_eq!(f64::from(block[7]), t.y, epsilon = 0.2);
        assert_abs_diff_eq!(f64::from(block[11]), t.z, epsilon = 0.2);
        assert_eq!(&block[12..], &[0.0, 0.0, 0.0, 1.0]);
    }
}
