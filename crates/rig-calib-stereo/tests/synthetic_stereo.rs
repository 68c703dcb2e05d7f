use nalgebra::{Isometry3, Point2, Point3, Translation3, UnitQuaternion, Vector3};
use rig_calib_core::{
    generate_world_points, CameraIntrinsics, CameraModel, CornerObservation, Distortion,
    ImageSize, StereoExtrinsicsSolver, StereoProblem,
};
use rig_calib_stereo::{PlanarStereoSolver, StereoSolverParams};

fn reference_camera() -> CameraModel {
    CameraModel::new(
        CameraIntrinsics::new(800.0, 800.0, 640.0, 360.0),
        Distortion {
            k1: -0.08,
            k2: 0.02,
            p1: 0.0005,
            p2: -0.0003,
            ..Distortion::default()
        },
    )
}

fn secondary_camera() -> CameraModel {
    CameraModel::new(
        CameraIntrinsics::new(820.0, 815.0, 630.0, 350.0),
        Distortion {
            k1: -0.05,
            k2: 0.01,
            ..Distortion::default()
        },
    )
}

/// Maps secondary-camera coordinates into the reference frame.
fn ref_from_sec() -> Isometry3<f64> {
    Isometry3::from_parts(
        Translation3::new(-150.0, 10.0, 20.0),
        UnitQuaternion::from_euler_angles(0.05, -0.3, 0.02),
    )
}

fn board_poses() -> Vec<Isometry3<f64>> {
    let tilts = [
        (0.0, 0.0, 0.0),
        (0.25, 0.1, 0.05),
        (-0.2, 0.25, -0.1),
        (0.15, -0.3, 0.2),
        (-0.3, -0.15, 0.0),
        (0.1, 0.35, -0.15),
    ];
    tilts
        .iter()
        .enumerate()
        .map(|(i, &(rx, ry, rz))| {
            let shift = i as f64 * 15.0;
            Isometry3::from_parts(
                Translation3::new(-100.0 + shift, -60.0 + 0.5 * shift, 750.0 + 4.0 * shift),
                UnitQuaternion::from_euler_angles(rx, ry, rz),
            )
        })
        .collect()
}

/// Deterministic zero-mean noise in [-amplitude, amplitude].
struct Lcg(u64);

impl Lcg {
    fn next(&mut self, amplitude: f64) -> f64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        let unit = (self.0 >> 11) as f64 / (1u64 << 53) as f64;
        (2.0 * unit - 1.0) * amplitude
    }
}

fn observe(
    cam: &CameraModel,
    cam_from_board: &Isometry3<f64>,
    world: &[Point3<f64>],
    noise: &mut Lcg,
    amplitude: f64,
) -> CornerObservation {
    world
        .iter()
        .map(|p| {
            let px = cam.project(&(cam_from_board * p));
            Point2::new(
                (px.x + noise.next(amplitude)) as f32,
                (px.y + noise.next(amplitude)) as f32,
            )
        })
        .collect::<Vec<_>>()
        .into()
}

fn synthesize(
    world: &[Point3<f64>],
    amplitude: f64,
) -> (Vec<CornerObservation>, Vec<CornerObservation>) {
    let (ref_cam, sec_cam) = (reference_camera(), secondary_camera());
    let sec_from_ref = ref_from_sec().inverse();
    let mut noise = Lcg(7);
    board_poses()
        .iter()
        .map(|board| {
            let reference = observe(&ref_cam, board, world, &mut noise, amplitude);
            let secondary = observe(&sec_cam, &(sec_from_ref * board), world, &mut noise, amplitude);
            (reference, secondary)
        })
        .unzip()
}

#[test]
fn recovers_relative_pose_from_exact_corners() {
    let _ = env_logger::builder().is_test(true).try_init();
    let world = generate_world_points(6, 9, 25.0).expect("pattern");
    let (reference, secondary) = synthesize(&world, 0.0);
    let (ref_cam, sec_cam) = (reference_camera(), secondary_camera());

    let problem = StereoProblem {
        world: &world,
        reference: &reference,
        secondary: &secondary,
        reference_camera: &ref_cam,
        secondary_camera: &sec_cam,
        image_size: ImageSize::new(1280, 720),
    };
    let solution = PlanarStereoSolver::default().solve(&problem).expect("solve");

    let truth = ref_from_sec();
    let est = solution.transform.to_isometry();
    let t_err = (est.translation.vector - truth.translation.vector).norm()
        / truth.translation.vector.norm();
    assert!(t_err < 1e-3, "relative translation error {t_err}");
    assert!(est.rotation.angle_to(&truth.rotation) < 1e-4);
    assert!(solution.rms_error < 1e-2, "rms {}", solution.rms_error);
    assert!(solution.transform.orthonormality_error() < 1e-9);
}

#[test]
fn tolerates_subpixel_noise() {
    let world = generate_world_points(6, 9, 25.0).expect("pattern");
    let (reference, secondary) = synthesize(&world, 0.2);
    let (ref_cam, sec_cam) = (reference_camera(), secondary_camera());

    let problem = StereoProblem {
        world: &world,
        reference: &reference,
        secondary: &secondary,
        reference_camera: &ref_cam,
        secondary_camera: &sec_cam,
        image_size: ImageSize::new(1280, 720),
    };
    let solver = PlanarStereoSolver::new(StereoSolverParams {
        max_rms_px: Some(0.5),
        ..StereoSolverParams::default()
    });
    let report = solver.solve_with_report(&problem).expect("solve");

    let truth = ref_from_sec();
    let est = report.solution.transform.to_isometry();
    let t_err = (est.translation.vector - truth.translation.vector).norm()
        / truth.translation.vector.norm();
    assert!(t_err < 0.02, "relative translation error {t_err}");
    assert!(est.rotation.angle_to(&truth.rotation) < 5e-3);
    assert!(report.solution.rms_error > 0.0);
    assert!(report.lm.converged, "{}", report.lm.termination);
    assert!(report.lm.final_cost <= report.lm.initial_cost);
    assert_eq!(report.board_poses.len(), board_poses().len());
}

#[test]
fn translation_scales_with_square_size() {
    let world_mm = generate_world_points(6, 9, 25.0).expect("pattern");
    let world_m = generate_world_points(6, 9, 0.025).expect("pattern");
    let (reference, secondary) = synthesize(&world_mm, 0.0);
    let (ref_cam, sec_cam) = (reference_camera(), secondary_camera());
    let solver = PlanarStereoSolver::default();

    let solve = |world: &[Point3<f64>]| {
        solver
            .solve(&StereoProblem {
                world,
                reference: &reference,
                secondary: &secondary,
                reference_camera: &ref_cam,
                secondary_camera: &sec_cam,
                image_size: ImageSize::new(1280, 720),
            })
            .expect("solve")
    };
    let t_mm: Vector3<f64> = solve(&world_mm).transform.translation;
    let t_m: Vector3<f64> = solve(&world_m).transform.translation;
    assert!((t_mm * 1e-3 - t_m).norm() < 1e-4, "{t_mm:?} vs {t_m:?}");
}
