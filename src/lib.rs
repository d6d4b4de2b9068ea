//! Rotating Sphere Demo Library
//!
//! Projects a sampled unit sphere to screen space once per frame using:
//! - a wgpu compute kernel when an adapter is usable
//! - native Rust on the host otherwise (same arithmetic, see the `kernel` crate)

pub mod config;
pub mod error;
pub mod frame_loop;
pub mod point_cloud;
pub mod render;
pub mod runners;
pub mod transformer;

pub use error::{CrateResult, ErrorCategory, SphereError};
pub use frame_loop::{ComputePath, FrameLoop, FrameScheduler, RunState, TickReport};
pub use render::{FrameSink, PixelCanvas};
pub use runners::CpuRunner;
#[cfg(feature = "wgpu")]
pub use runners::{wgpu::list_devices, AcceleratorContext, AcceleratorOptions, WgpuRunner};
pub use shared::{Point3D, ScreenCoord};
pub use transformer::FrameTransformer;

/// WGSL source of the `rotate_project` compute kernel.
pub const ROTATE_PROJECT_WGSL: &str = include_str!("../shaders/rotate_project.wgsl");
/// Name of the kernel entry point.
pub const KERNEL_ENTRY_POINT: &str = "rotate_project";

/// Description of where a runner executes, for diagnostics.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackendInfo {
    pub runner: &'static str,
    pub api: Option<&'static str>,
    pub adapter: Option<String>,
    pub driver: Option<String>,
}

impl std::fmt::Display for BackendInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.runner)?;
        if let Some(api) = self.api {
            write!(f, " [{api}]")?;
        }
        if let Some(adapter) = &self.adapter {
            write!(f, " on {adapter}")?;
        }
        if let Some(driver) = self.driver.as_deref().filter(|d| !d.is_empty()) {
            write!(f, " ({driver})")?;
        }
        Ok(())
    }
}

/// A backend that runs the rotate/project transform over a fixed point cloud.
///
/// The point cloud is bound when the runner is built; each call only varies
/// the angle and focal length. `out` has one slot per point, index-aligned
/// with the input.
pub trait TransformRunner {
    fn backend_info(&self) -> BackendInfo;

    /// Number of points the runner was built for.
    fn num_points(&self) -> usize;

    fn transform_into(
        &mut self,
        angle: f32,
        focal: f32,
        out: &mut [ScreenCoord],
    ) -> CrateResult<()>;

    /// Allocating variant of [`TransformRunner::transform_into`].
    fn transform(&mut self, angle: f32, focal: f32) -> CrateResult<Vec<ScreenCoord>> {
        let mut out = vec![ScreenCoord::default(); self.num_points()];
        self.transform_into(angle, focal, &mut out)?;
        Ok(out)
    }
}

pub(crate) fn check_output_len(expected: usize, out: &[ScreenCoord]) -> CrateResult<()> {
    if out.len() != expected {
        return Err(SphereError::InvalidArgument(format!(
            "output holds {} coordinates but the cloud has {expected} points",
            out.len()
        )));
    }
    Ok(())
}
