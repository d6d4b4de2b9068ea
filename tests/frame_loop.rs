// Frame loop behaviour when the accelerator is missing or misbehaves.
//
// A scripted runner stands in for the device so failures can be injected at
// exact ticks.

use std::{cell::Cell, f32::consts::TAU, rc::Rc, sync::Arc};

use rotating_sphere_demo::{
    frame_loop::advance_angle, point_cloud, BackendInfo, ComputePath, CrateResult, FrameLoop,
    FrameTransformer, PixelCanvas, Point3D, ScreenCoord, SphereError, TransformRunner,
};
use shared::{ANGLE_STEP, DEFAULT_FOCAL};

/// Host math behind a fake device that fails on chosen calls.
struct ScriptedAccelerator {
    points: Arc<[Point3D]>,
    fail_on_call: Option<u32>,
    calls: Rc<Cell<u32>>,
}

impl TransformRunner for ScriptedAccelerator {
    fn backend_info(&self) -> BackendInfo {
        BackendInfo {
            runner: "scripted",
            api: None,
            adapter: Some("test double".into()),
            driver: None,
        }
    }

    fn num_points(&self) -> usize {
        self.points.len()
    }

    fn transform_into(
        &mut self,
        angle: f32,
        focal: f32,
        out: &mut [ScreenCoord],
    ) -> CrateResult<()> {
        let call = self.calls.get() + 1;
        self.calls.set(call);
        if self.fail_on_call == Some(call) {
            // leave garbage behind, as a half-finished readback would
            out.fill(ScreenCoord::new(f32::NAN, f32::NAN));
            return Err(SphereError::Dispatch("simulated enqueue failure".into()));
        }
        for (p, o) in self.points.iter().zip(out.iter_mut()) {
            *o = kernel::project_point(p, angle, focal);
        }
        Ok(())
    }
}

fn cloud() -> Arc<[Point3D]> {
    point_cloud::generate(10, 20).unwrap().into()
}

fn expected(points: &[Point3D], angle: f32) -> Vec<ScreenCoord> {
    points
        .iter()
        .map(|p| kernel::project_point(p, angle, DEFAULT_FOCAL))
        .collect()
}

fn scripted_loop(fail_on_call: Option<u32>) -> (FrameLoop, Rc<Cell<u32>>, Arc<[Point3D]>) {
    let points = cloud();
    let calls = Rc::new(Cell::new(0));
    let accelerator = ScriptedAccelerator {
        points: points.clone(),
        fail_on_call,
        calls: calls.clone(),
    };
    let transformer =
        FrameTransformer::with_accelerator(points.clone(), Box::new(accelerator)).unwrap();
    (FrameLoop::new(transformer), calls, points)
}

#[test]
fn healthy_accelerator_serves_every_tick() {
    let (mut frame_loop, calls, points) = scripted_loop(None);
    let mut sink = |_: &[ScreenCoord]| {};

    for _ in 0..5 {
        assert_eq!(frame_loop.tick(&mut sink).path, ComputePath::Accelerator);
    }
    assert_eq!(calls.get(), 5);
    assert_eq!(frame_loop.coords(), expected(&points, frame_loop.state().angle));
}

#[test]
fn dispatch_failure_falls_back_and_demotes_for_good() {
    let (mut frame_loop, calls, points) = scripted_loop(Some(3));
    let mut delivered: Vec<Vec<ScreenCoord>> = Vec::new();
    let mut sink = |coords: &[ScreenCoord]| delivered.push(coords.to_vec());

    let paths: Vec<_> = (0..6).map(|_| frame_loop.tick(&mut sink).path).collect();

    assert_eq!(
        paths,
        [
            ComputePath::Accelerator,
            ComputePath::Accelerator,
            ComputePath::Fallback,
            ComputePath::Fallback,
            ComputePath::Fallback,
            ComputePath::Fallback,
        ]
    );
    // the accelerator was never retried after the failure
    assert_eq!(calls.get(), 3);
    assert!(!frame_loop.state().accelerator_available);
    assert!(!frame_loop.transformer().has_accelerator());

    // the failing tick still delivered complete, valid coordinates
    assert_eq!(delivered.len(), 6);
    let third = (0..3).fold(0.0, |a, _| advance_angle(a, ANGLE_STEP));
    assert_eq!(delivered[2], expected(&points, third));
    assert!(delivered.iter().flatten().all(|c| c.x.is_finite() && c.y.is_finite()));
}

#[cfg(feature = "wgpu")]
#[test]
fn no_platforms_still_renders_every_tick() {
    use rotating_sphere_demo::AcceleratorOptions;

    let points = cloud();
    let options = AcceleratorOptions {
        backends: wgpu::Backends::empty(),
        ..Default::default()
    };
    let transformer = FrameTransformer::initialize(points.clone(), &options);
    assert!(!transformer.has_accelerator());

    let mut frame_loop = FrameLoop::new(transformer);
    assert!(!frame_loop.state().accelerator_available);

    let mut canvas = PixelCanvas::new(64, 48);
    for _ in 0..3 {
        let report = frame_loop.tick(&mut canvas);
        assert_eq!(report.path, ComputePath::Fallback);
        assert_eq!(frame_loop.coords(), expected(&points, report.angle));
        assert!(canvas.drawn() > 0);
    }
}

#[test]
fn angle_stays_in_range_over_many_turns() {
    let mut frame_loop = FrameLoop::new(FrameTransformer::new(cloud()));
    let mut sink = |_: &[ScreenCoord]| {};
    let turns = (2.0 * TAU / ANGLE_STEP) as usize;
    for _ in 0..turns {
        let angle = frame_loop.tick(&mut sink).angle;
        assert!((0.0..TAU).contains(&angle));
    }
    assert_eq!(frame_loop.frames(), turns as u64);
}

#[test]
fn concrete_scenarios_through_the_loop_path() {
    let points: Arc<[Point3D]> = vec![
        Point3D::new(0.0, 1.0, 0.0),
        Point3D::new(0.0, 0.0, 1.0),
        Point3D::new(4.0, 0.0, 0.0),
    ]
    .into();
    let mut transformer = FrameTransformer::new(points);

    let at_zero = transformer.transform(0.0, DEFAULT_FOCAL).unwrap();
    assert!(at_zero[0].x.abs() < 1e-6 && (at_zero[0].y - 0.4).abs() < 1e-6);

    let quarter = transformer
        .transform(std::f32::consts::FRAC_PI_2, DEFAULT_FOCAL)
        .unwrap();
    assert!((quarter[1].x - 0.4).abs() < 1e-5 && quarter[1].y.abs() < 1e-6);
    // (4, 0, 0) rotated a quarter turn sits at z = -4, behind the camera
    assert_eq!(quarter[2], ScreenCoord::new(2.0, 2.0));
}
