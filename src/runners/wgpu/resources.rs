//! Owned accelerator handles with ordered teardown
//!
//! Every handle is optional so a bundle that failed half way through setup
//! can still be released. Release walks [`RELEASE_ORDER`], which is the exact
//! reverse of acquisition.

use tracing::trace;

/// The handles, in the order they are acquired.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ResourceKind {
    Platform,
    Device,
    Context,
    Queue,
    Program,
    Kernel,
    InputBuffer,
    OutputBuffer,
    StagingBuffer,
    ParamsBuffer,
    BindGroup,
}

pub const ACQUIRE_ORDER: [ResourceKind; 11] = [
    ResourceKind::Platform,
    ResourceKind::Device,
    ResourceKind::Context,
    ResourceKind::Queue,
    ResourceKind::Program,
    ResourceKind::Kernel,
    ResourceKind::InputBuffer,
    ResourceKind::OutputBuffer,
    ResourceKind::StagingBuffer,
    ResourceKind::ParamsBuffer,
    ResourceKind::BindGroup,
];

pub const RELEASE_ORDER: [ResourceKind; 11] = {
    let mut order = ACQUIRE_ORDER;
    let mut i = 0;
    while i < order.len() / 2 {
        let tmp = order[i];
        order[i] = order[order.len() - 1 - i];
        order[order.len() - 1 - i] = tmp;
        i += 1;
    }
    order
};

/// Compiled entry point plus the layout its bind group is built against.
pub struct Kernel {
    pub pipeline: wgpu::ComputePipeline,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

/// Every accelerator handle owned by one [`super::AcceleratorContext`].
#[derive(Default)]
pub struct AcceleratorResources {
    pub platform: Option<wgpu::Instance>,
    pub device: Option<wgpu::Adapter>,
    pub context: Option<wgpu::Device>,
    pub queue: Option<wgpu::Queue>,
    pub program: Option<wgpu::ShaderModule>,
    pub kernel: Option<Kernel>,
    pub input: Option<wgpu::Buffer>,
    pub output: Option<wgpu::Buffer>,
    pub staging: Option<wgpu::Buffer>,
    pub params: Option<wgpu::Buffer>,
    pub bind_group: Option<wgpu::BindGroup>,
}

fn release_buffer(buffer: Option<wgpu::Buffer>) -> bool {
    buffer.map(|b| b.destroy()).is_some()
}

impl AcceleratorResources {
    pub fn is_held(&self, kind: ResourceKind) -> bool {
        match kind {
            ResourceKind::Platform => self.platform.is_some(),
            ResourceKind::Device => self.device.is_some(),
            ResourceKind::Context => self.context.is_some(),
            ResourceKind::Queue => self.queue.is_some(),
            ResourceKind::Program => self.program.is_some(),
            ResourceKind::Kernel => self.kernel.is_some(),
            ResourceKind::InputBuffer => self.input.is_some(),
            ResourceKind::OutputBuffer => self.output.is_some(),
            ResourceKind::StagingBuffer => self.staging.is_some(),
            ResourceKind::ParamsBuffer => self.params.is_some(),
            ResourceKind::BindGroup => self.bind_group.is_some(),
        }
    }

    /// Whether every handle needed for a dispatch is present.
    pub fn is_complete(&self) -> bool {
        ACQUIRE_ORDER.iter().all(|&kind| self.is_held(kind))
    }

    fn release_one(&mut self, kind: ResourceKind) -> bool {
        match kind {
            ResourceKind::Platform => self.platform.take().is_some(),
            ResourceKind::Device => self.device.take().is_some(),
            ResourceKind::Context => self.context.take().map(|d| d.destroy()).is_some(),
            ResourceKind::Queue => self.queue.take().is_some(),
            ResourceKind::Program => self.program.take().is_some(),
            ResourceKind::Kernel => self.kernel.take().is_some(),
            ResourceKind::InputBuffer => release_buffer(self.input.take()),
            ResourceKind::OutputBuffer => release_buffer(self.output.take()),
            ResourceKind::StagingBuffer => release_buffer(self.staging.take()),
            ResourceKind::ParamsBuffer => release_buffer(self.params.take()),
            ResourceKind::BindGroup => self.bind_group.take().is_some(),
        }
    }

    /// Release whatever is held, newest first. Safe to call repeatedly.
    ///
    /// Returns the kinds that were actually released, in release order.
    pub fn release(&mut self) -> Vec<ResourceKind> {
        let released: Vec<_> = RELEASE_ORDER
            .into_iter()
            .filter(|&kind| self.release_one(kind))
            .collect();
        if !released.is_empty() {
            trace!("Released accelerator resources: {released:?}");
        }
        released
    }
}

impl Drop for AcceleratorResources {
    fn drop(&mut self) {
        self.release();
    }
}
