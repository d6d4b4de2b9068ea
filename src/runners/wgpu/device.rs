//! Platform and device discovery for the accelerator
//!
//! A wgpu backend plays the role of a compute platform and an adapter the
//! role of a device on it. Selection is deliberately simple:
//! 1. Take the backend of the first enumerated adapter
//! 2. On that backend, take the first GPU-class adapter
//! 3. Otherwise take the first CPU-class adapter on the same backend

use std::fmt;

use tracing::{debug, info};

use crate::error::{CrateResult, SphereError};

/// Coarse device class used for selection.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DeviceClass {
    Gpu,
    Cpu,
    /// Cannot run the kernel (no compute support or unknown type).
    Unsupported,
}

impl DeviceClass {
    pub fn classify(device_type: wgpu::DeviceType, supports_compute: bool) -> Self {
        if !supports_compute {
            return DeviceClass::Unsupported;
        }
        match device_type {
            wgpu::DeviceType::DiscreteGpu
            | wgpu::DeviceType::IntegratedGpu
            | wgpu::DeviceType::VirtualGpu => DeviceClass::Gpu,
            wgpu::DeviceType::Cpu => DeviceClass::Cpu,
            _ => DeviceClass::Unsupported,
        }
    }
}

/// Pick a device from `(platform, class)` pairs listed in enumeration order.
///
/// Returns the index of the chosen entry, or `None` when the first platform
/// has neither a GPU-class nor a CPU-class device.
pub fn select_device(candidates: &[(wgpu::Backend, DeviceClass)]) -> Option<usize> {
    let (platform, _) = *candidates.first()?;
    let first_of = |wanted: DeviceClass| {
        candidates
            .iter()
            .position(|&(backend, class)| backend == platform && class == wanted)
    };

    first_of(DeviceClass::Gpu).or_else(|| first_of(DeviceClass::Cpu))
}

/// Human readable backend name.
pub fn backend_name(backend: wgpu::Backend) -> &'static str {
    match backend {
        wgpu::Backend::Vulkan => "Vulkan",
        wgpu::Backend::Metal => "Metal",
        wgpu::Backend::Dx12 => "DirectX 12",
        wgpu::Backend::Gl => "OpenGL",
        wgpu::Backend::BrowserWebGpu => "WebGPU",
        _ => "Unknown",
    }
}

/// One enumerated adapter, for the `devices` listing.
#[derive(Clone, Debug)]
pub struct DeviceSummary {
    pub backend: wgpu::Backend,
    pub name: String,
    pub device_type: wgpu::DeviceType,
    pub driver: String,
    pub class: DeviceClass,
}

impl fmt::Display for DeviceSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<10} {} ({:?}, {:?})",
            backend_name(self.backend),
            self.name,
            self.device_type,
            self.class
        )?;
        if !self.driver.is_empty() {
            write!(f, " driver: {}", self.driver)?;
        }
        Ok(())
    }
}

fn supports_compute(adapter: &wgpu::Adapter) -> bool {
    adapter
        .get_downlevel_capabilities()
        .flags
        .contains(wgpu::DownlevelFlags::COMPUTE_SHADERS)
}

fn summarize(adapter: &wgpu::Adapter) -> DeviceSummary {
    let info = adapter.get_info();
    DeviceSummary {
        backend: info.backend,
        class: DeviceClass::classify(info.device_type, supports_compute(adapter)),
        name: info.name,
        device_type: info.device_type,
        driver: info.driver,
    }
}

/// Enumerate every adapter visible through `backends`.
pub fn list_devices(backends: wgpu::Backends) -> Vec<DeviceSummary> {
    if backends.is_empty() {
        return Vec::new();
    }
    let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends,
        ..Default::default()
    });
    instance
        .enumerate_adapters(backends)
        .iter()
        .map(summarize)
        .collect()
}

/// Enumerate adapters on `instance` and apply [`select_device`].
pub(super) fn pick_adapter(
    instance: &wgpu::Instance,
    backends: wgpu::Backends,
) -> CrateResult<wgpu::Adapter> {
    let mut adapters = instance.enumerate_adapters(backends);
    if adapters.is_empty() {
        return Err(SphereError::Enumeration(
            "no compute platforms available".into(),
        ));
    }

    let candidates: Vec<_> = adapters
        .iter()
        .map(|adapter| {
            let summary = summarize(adapter);
            debug!("Adapter: {summary}");
            (summary.backend, summary.class)
        })
        .collect();

    let index = select_device(&candidates).ok_or_else(|| {
        SphereError::Enumeration(format!(
            "no GPU or CPU device on platform {}",
            backend_name(candidates[0].0)
        ))
    })?;

    let adapter = adapters.swap_remove(index);
    let info = adapter.get_info();
    info!(
        "Selected {} device {} ({:?})",
        backend_name(info.backend),
        info.name,
        info.device_type
    );
    Ok(adapter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wgpu::Backend::{Gl, Vulkan};

    #[test]
    fn prefers_gpu_on_first_platform() {
        let candidates = [
            (Vulkan, DeviceClass::Cpu),
            (Vulkan, DeviceClass::Gpu),
            (Gl, DeviceClass::Gpu),
        ];
        assert_eq!(select_device(&candidates), Some(1));
    }

    #[test]
    fn falls_back_to_cpu_on_same_platform() {
        let candidates = [
            (Vulkan, DeviceClass::Unsupported),
            (Vulkan, DeviceClass::Cpu),
            (Gl, DeviceClass::Gpu),
        ];
        assert_eq!(select_device(&candidates), Some(1));
    }

    #[test]
    fn never_switches_platform() {
        let candidates = [(Vulkan, DeviceClass::Unsupported), (Gl, DeviceClass::Gpu)];
        assert_eq!(select_device(&candidates), None);
        assert_eq!(select_device(&[]), None);
    }

    #[test]
    fn classification() {
        assert_eq!(
            DeviceClass::classify(wgpu::DeviceType::IntegratedGpu, true),
            DeviceClass::Gpu
        );
        assert_eq!(
            DeviceClass::classify(wgpu::DeviceType::Cpu, true),
            DeviceClass::Cpu
        );
        assert_eq!(
            DeviceClass::classify(wgpu::DeviceType::DiscreteGpu, false),
            DeviceClass::Unsupported
        );
        assert_eq!(
            DeviceClass::classify(wgpu::DeviceType::Other, true),
            DeviceClass::Unsupported
        );
    }

    #[test]
    fn empty_backend_mask_lists_nothing() {
        assert!(list_devices(wgpu::Backends::empty()).is_empty());
    }
}
