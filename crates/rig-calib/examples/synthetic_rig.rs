//! Calibrate a simulated three-camera rig from pre-detected corners.
//!
//! Usage: `synthetic_rig [config.json]`. Without a config a default rig is
//! used; with one, its cameras, pattern and solver settings drive the run.

use nalgebra::{Isometry3, Point2, Translation3, UnitQuaternion};
use rig_calib::core::{CameraIntrinsics, Distortion, ImageSize};
use rig_calib::{
    CameraModel, ChessboardPattern, CornerObservation, PairStatus, RigCalibConfig, SessionConfig,
    TransformLayout,
};
use rig_calib_stereo::StereoSolverParams;

#[cfg(feature = "tracing")]
use rig_calib::init_tracing;

struct NoDetector;

impl rig_calib::PatternDetector for NoDetector {
    fn detect(
        &self,
        _: &rig_calib::core::FrameView<'_>,
        _: &ChessboardPattern,
    ) -> Option<CornerObservation> {
        None
    }
}

fn default_config() -> Result<RigCalibConfig, Box<dyn std::error::Error>> {
    let camera = CameraModel::new(
        CameraIntrinsics::new(800.0, 800.0, 640.0, 360.0),
        Distortion {
            k1: -0.05,
            ..Distortion::default()
        },
    );
    Ok(RigCalibConfig {
        session: SessionConfig::new(ChessboardPattern::new(6, 9, 25.0)?, 5),
        cameras: vec![camera; 3],
        solver: StereoSolverParams::default(),
        layout: TransformLayout::Homogeneous,
    })
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    #[cfg(feature = "tracing")]
    init_tracing(false);
    #[cfg(not(feature = "tracing"))]
    rig_calib::init_from_env(log::LevelFilter::Info)?;

    let config = match std::env::args().nth(1) {
        Some(path) => RigCalibConfig::load_json(path)?,
        None => default_config()?,
    };

    let rig: Vec<Isometry3<f64>> = (0..config.cameras.len())
        .map(|i| {
            let side = i as f64 - 1.0;
            Isometry3::from_parts(
                Translation3::new(120.0 * side, 0.0, 10.0 * side.abs()),
                UnitQuaternion::from_euler_angles(0.0, -0.2 * side, 0.0),
            )
        })
        .collect();
    let ref_from_rig = rig[0].inverse();
    let world = config.session.pattern.world_points();
    let mut session = config.build_session(NoDetector)?;

    for k in 0..50 {
        let a = k as f64;
        let board = ref_from_rig
            * Isometry3::from_parts(
                Translation3::new(-100.0 + 3.0 * a, -60.0, 750.0 + 5.0 * a),
                UnitQuaternion::from_euler_angles(0.3 * (0.7 * a).sin(), 0.3 * (0.4 * a).cos(), 0.0),
            );
        let views: Vec<CornerObservation> = config
            .cameras
            .iter()
            .zip(&rig)
            .map(|(cam, pose)| {
                let cam_from_board = pose.inverse() * rig[0] * board;
                world
                    .iter()
                    .map(|p| {
                        let px = cam.project(&(cam_from_board * p));
                        Point2::new(px.x as f32, px.y as f32)
                    })
                    .collect::<Vec<_>>()
                    .into()
            })
            .collect();
        let mut views = views.into_iter();
        let reference = views.next();
        let result = session.submit_detections(
            reference,
            views.map(Some).collect(),
            ImageSize::new(1280, 720),
        )?;

        if let Some(cals) = result.calibrations() {
            println!("completed after {} batches", k + 1);
            for (outcome, cal) in result.cameras.iter().zip(cals) {
                let t = cal.transform.translation;
                println!(
                    "camera {}: t = [{:.2}, {:.2}, {:.2}], angle = {:.4} rad, rms = {:.5} px",
                    outcome.camera,
                    t.x,
                    t.y,
                    t.z,
                    cal.transform.angle(),
                    cal.rms_error
                );
            }
            let flat = config.layout.write_all(&result.transforms().unwrap_or_default());
            println!("flat output: {} floats", flat.len());
            return Ok(());
        }
        for outcome in &result.cameras {
            if let PairStatus::DidNotConverge(err) = &outcome.status {
                println!("camera {}: {err}", outcome.camera);
            }
        }
    }
    println!("session did not complete");
    Ok(())
}
