//! Host-side reference of the `rotate_project` compute kernel.
//!
//! The device entry point in `shaders/rotate_project.wgsl` and the functions
//! here perform the same arithmetic in the same order. The CPU runner calls
//! [`rotate_project`] once per point index, the same way the GPU calls its
//! entry point once per invocation.

use shared::{Point3D, ScreenCoord, ThreadId, TransformParams, CAMERA_DISTANCE, NEAR_LIMIT};

/// Rotation about the vertical (y) axis, as the cosine/sine pair.
#[derive(Copy, Clone, Debug)]
pub struct YRotation {
    c: f32,
    s: f32,
}

impl YRotation {
    #[inline]
    pub fn from_angle(angle: f32) -> Self {
        Self {
            c: angle.cos(),
            s: angle.sin(),
        }
    }

    /// Returns the rotated `(x, y, z)`.
    #[inline]
    pub fn apply(&self, p: &Point3D) -> (f32, f32, f32) {
        let xr = self.c * p.x + self.s * p.z;
        let yr = p.y;
        let zr = -self.s * p.x + self.c * p.z;
        (xr, yr, zr)
    }
}

/// Camera-space depth of a rotated point.
#[inline]
pub fn camera_depth(zr: f32) -> f32 {
    zr + CAMERA_DISTANCE
}

/// Rotate one point and project it, or return the off-screen sentinel.
#[inline]
pub fn project_rotated(rotation: YRotation, p: &Point3D, focal: f32) -> ScreenCoord {
    let (xr, yr, zr) = rotation.apply(p);
    let zcam = camera_depth(zr);

    if zcam <= NEAR_LIMIT {
        return ScreenCoord::OFF_SCREEN;
    }

    // No clamping: out-of-range values are filtered by the renderer.
    ScreenCoord::new((xr * focal) / zcam, (yr * focal) / zcam)
}

/// Single-point convenience over [`project_rotated`].
#[inline]
pub fn project_point(p: &Point3D, angle: f32, focal: f32) -> ScreenCoord {
    project_rotated(YRotation::from_angle(angle), p, focal)
}

/// One invocation of the transform kernel: writes `output[i]` from `input[i]`.
#[inline]
pub fn rotate_project(
    thread_id: ThreadId,
    input: &[Point3D],
    output: &mut [ScreenCoord],
    params: &TransformParams,
) {
    // Early exit for out-of-bounds threads
    if thread_id.as_u32() >= params.num_points {
        return;
    }

    let i = thread_id.as_usize();
    output[i] = project_point(&input[i], params.angle, params.focal);
}
