//! wgpu runner implementation

pub mod context;
pub mod device;
pub mod resources;

use std::sync::Arc;

use shared::{Point3D, ScreenCoord};

pub use self::context::{AcceleratorContext, AcceleratorOptions};
pub use self::device::{list_devices, DeviceClass, DeviceSummary};
use crate::{error::CrateResult, BackendInfo, TransformRunner};

/// WebGPU-based runner supporting multiple backends (Vulkan, Metal, DX12, etc.)
pub struct WgpuRunner {
    context: AcceleratorContext,
    backend_name: &'static str,
    adapter_name: String,
    driver_info: String,
}

impl WgpuRunner {
    /// Set up the accelerator for `points`, automatically picking a device
    pub fn new(points: &Arc<[Point3D]>, options: &AcceleratorOptions) -> CrateResult<Self> {
        let context = AcceleratorContext::new(points, options)?;
        let info = context.adapter_info();

        Ok(Self {
            backend_name: device::backend_name(info.backend),
            adapter_name: info.name.clone(),
            driver_info: info.driver.clone(),
            context,
        })
    }

    pub fn context(&self) -> &AcceleratorContext {
        &self.context
    }

    /// Release the accelerator ahead of drop; later transforms fail.
    pub fn release(&mut self) {
        self.context.release();
    }
}

impl TransformRunner for WgpuRunner {
    fn backend_info(&self) -> BackendInfo {
        BackendInfo {
            runner: "wgpu",
            api: Some(self.backend_name),
            adapter: Some(self.adapter_name.clone()),
            driver: Some(self.driver_info.clone()),
        }
    }

    fn num_points(&self) -> usize {
        self.context.num_points()
    }

    fn transform_into(
        &mut self,
        angle: f32,
        focal: f32,
        out: &mut [ScreenCoord],
    ) -> CrateResult<()> {
        self.context.dispatch(angle, focal, out)
    }
}
