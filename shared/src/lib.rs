//! Shared types for the sphere transform
//!
//! Everything in here is plain data that crosses the host/device boundary,
//! so every record is `#[repr(C)]` and `Pod`. The device buffers declared in
//! `shaders/rotate_project.wgsl` use exactly these strides.
#![no_std]

use bytemuck::{Pod, Zeroable};
use core::fmt::{self, Display};

/// Distance the camera sits back from the sphere centre along +z.
pub const CAMERA_DISTANCE: f32 = 3.0;
/// Camera-space depth at or below which a point is not projected.
pub const NEAR_LIMIT: f32 = 0.01;
/// Coordinate value written for points behind the camera.
pub const SENTINEL: f32 = 2.0;
/// Field-of-view factor used by the frame loop.
pub const DEFAULT_FOCAL: f32 = 1.2;
/// Rotation applied per tick, in radians.
pub const ANGLE_STEP: f32 = 0.02;
/// Anything beyond this on either axis is not drawn.
pub const VISIBLE_LIMIT: f32 = 1.5;

/// Workgroup size for the compute shader
/// IMPORTANT: This must be kept in sync with the literal value in shaders/rotate_project.wgsl
pub const WORKGROUP_SIZE: u32 = 64;

#[inline]
pub const fn div_ceil_u32(n: u32, d: u32) -> u32 {
    // Precondition: d > 0
    n / d + ((n % d) != 0) as u32
}

pub fn num_workgroups_1d(num_elements: u32) -> [u32; 3] {
    [div_ceil_u32(num_elements, WORKGROUP_SIZE), 1, 1]
}

/// Newtype wrapper for invocation ids to ensure type safety
#[derive(Copy, Clone, Debug)]
pub struct ThreadId(u32);

impl ThreadId {
    #[inline]
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    #[inline]
    pub fn as_u32(&self) -> u32 {
        self.0
    }

    #[inline]
    pub fn as_usize(&self) -> usize {
        self.0 as usize
    }
}

/// Homogeneous point on the unit sphere. `w` is always 1.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct Point3D {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Point3D {
    #[inline]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z, w: 1.0 }
    }
}

/// Projected position in normalized device coordinates.
///
/// Two contiguous `f32`s with no padding, matching `vec2<f32>` in a storage
/// array. Readback casts the mapped bytes straight into a slice of these.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct ScreenCoord {
    pub x: f32,
    pub y: f32,
}

impl ScreenCoord {
    pub const OFF_SCREEN: Self = Self {
        x: SENTINEL,
        y: SENTINEL,
    };

    #[inline]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    #[inline]
    pub fn is_sentinel(&self) -> bool {
        self.x == SENTINEL && self.y == SENTINEL
    }

    /// Whether the renderer should draw this coordinate at all.
    #[inline]
    pub fn is_visible(&self) -> bool {
        self.x.abs() <= VISIBLE_LIMIT && self.y.abs() <= VISIBLE_LIMIT
    }
}

impl Display for ScreenCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.4}, {:.4})", self.x, self.y)
    }
}

/// Per-dispatch parameters shared between CPU and GPU (uniform block)
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct TransformParams {
    pub angle: f32,
    pub focal: f32,
    pub num_points: u32,
    pub _pad: u32,
}

impl TransformParams {
    #[inline]
    pub fn new(angle: f32, focal: f32, num_points: u32) -> Self {
        Self {
            angle,
            focal,
            num_points,
            _pad: 0,
        }
    }
}

const _: () = assert!(core::mem::size_of::<Point3D>() == 16);
const _: () = assert!(core::mem::size_of::<ScreenCoord>() == 8);
const _: () = assert!(core::mem::align_of::<ScreenCoord>() == 4);
const _: () = assert!(core::mem::size_of::<TransformParams>() == 16);
