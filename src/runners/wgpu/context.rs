//! Accelerator setup and dispatch
//!
//! Setup walks platform → device → context/queue → program → kernel →
//! buffers. Each wgpu handle is reference counted, so the bundle keeps one
//! clone and the setup code works with local clones until it returns.

use std::borrow::Cow;

use shared::{num_workgroups_1d, Point3D, ScreenCoord, TransformParams};
use tracing::{debug, error, info};
use wgpu::util::DeviceExt;

use super::{
    device::{backend_name, pick_adapter},
    resources::{AcceleratorResources, Kernel},
};
use crate::{
    error::{CrateResult, SphereError},
    KERNEL_ENTRY_POINT, ROTATE_PROJECT_WGSL,
};

/// Knobs for accelerator setup.
#[derive(Clone, Debug)]
pub struct AcceleratorOptions {
    /// Backends to enumerate. `Backends::empty()` means no platforms at all.
    pub backends: wgpu::Backends,
    /// Kernel program source; must define the `rotate_project` entry point.
    pub kernel_source: Cow<'static, str>,
}

impl Default for AcceleratorOptions {
    fn default() -> Self {
        Self {
            backends: wgpu::Backends::all(),
            kernel_source: Cow::Borrowed(ROTATE_PROJECT_WGSL),
        }
    }
}

/// Run `f` inside validation and out-of-memory error scopes.
fn scoped<T>(device: &wgpu::Device, f: impl FnOnce() -> T) -> (T, Option<wgpu::Error>) {
    device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let value = f();
    let validation = futures::executor::block_on(device.pop_error_scope());
    let oom = futures::executor::block_on(device.pop_error_scope());
    (value, validation.or(oom))
}

/// Format the compiler messages for a shader module as a build log.
fn build_log(module: &wgpu::ShaderModule, fallback: &wgpu::Error) -> String {
    let info = futures::executor::block_on(module.get_compilation_info());
    let lines: Vec<String> = info
        .messages
        .iter()
        .map(|msg| {
            let kind = match msg.message_type {
                wgpu::CompilationMessageType::Error => "error",
                wgpu::CompilationMessageType::Warning => "warning",
                wgpu::CompilationMessageType::Info => "info",
                #[allow(unreachable_patterns)]
                _ => "note",
            };
            match &msg.location {
                Some(loc) => format!(
                    "{}:{}: {kind}: {}",
                    loc.line_number, loc.line_position, msg.message
                ),
                None => format!("{kind}: {}", msg.message),
            }
        })
        .collect();

    if lines.is_empty() {
        fallback.to_string()
    } else {
        lines.join("\n")
    }
}

fn storage_entry(binding: u32, read_only: bool) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

/// Resolve the entry point and build the pipeline around it.
///
/// Bindings: 0 = points (read), 1 = coords (write), 2 = params (uniform).
fn create_kernel(device: &wgpu::Device, module: &wgpu::ShaderModule) -> Kernel {
    let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("Rotate Project Bind Group Layout"),
        entries: &[
            storage_entry(0, true),
            storage_entry(1, false),
            wgpu::BindGroupLayoutEntry {
                binding: 2,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: wgpu::BufferSize::new(
                        std::mem::size_of::<TransformParams>() as u64,
                    ),
                },
                count: None,
            },
        ],
    });

    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Rotate Project Pipeline Layout"),
        bind_group_layouts: &[&bind_group_layout],
        push_constant_ranges: &[],
    });

    let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
        label: Some("Rotate Project Pipeline"),
        layout: Some(&pipeline_layout),
        module,
        entry_point: Some(KERNEL_ENTRY_POINT),
        compilation_options: Default::default(),
        cache: None,
    });

    Kernel {
        pipeline,
        bind_group_layout,
    }
}

/// Owns every accelerator handle for the lifetime of the run.
///
/// The point cloud is uploaded once during [`AcceleratorContext::new`];
/// afterwards only the uniform parameters change between dispatches.
pub struct AcceleratorContext {
    resources: AcceleratorResources,
    adapter_info: wgpu::AdapterInfo,
    num_points: u32,
}

impl AcceleratorContext {
    /// Acquire a device and upload `points`.
    ///
    /// Any failure releases what was acquired so far, newest first, and
    /// returns an initialization-category error.
    pub fn new(points: &[Point3D], options: &AcceleratorOptions) -> CrateResult<Self> {
        let mut resources = AcceleratorResources::default();
        match Self::acquire(&mut resources, points, options) {
            Ok(adapter_info) => Ok(Self {
                resources,
                adapter_info,
                num_points: points.len() as u32,
            }),
            Err(e) => {
                let released = resources.release();
                debug!("Accelerator setup failed, released {released:?}");
                Err(e)
            }
        }
    }

    fn acquire(
        res: &mut AcceleratorResources,
        points: &[Point3D],
        options: &AcceleratorOptions,
    ) -> CrateResult<wgpu::AdapterInfo> {
        if points.is_empty() {
            return Err(SphereError::Resource("point cloud is empty".into()));
        }
        let num_points = u32::try_from(points.len())
            .map_err(|_| SphereError::Resource(format!("{} points exceed u32", points.len())))?;

        // 1. Platforms
        if options.backends.is_empty() {
            return Err(SphereError::Enumeration(
                "no compute platforms enabled".into(),
            ));
        }
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: options.backends,
            ..Default::default()
        });
        res.platform = Some(instance.clone());

        // 2-3. First platform, GPU preferred over CPU
        let adapter = pick_adapter(&instance, options.backends)?;
        res.device = Some(adapter.clone());
        let adapter_info = adapter.get_info();

        // 4-5. Context and its single in-order queue
        let (device, queue) =
            futures::executor::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
                label: Some("Sphere Device"),
                required_features: wgpu::Features::empty(),
                required_limits: adapter.limits(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::default(),
            }))
            .map_err(|e| SphereError::Resource(format!("device request failed: {e}")))?;
        res.context = Some(device.clone());
        res.queue = Some(queue);

        let limits = device.limits();
        let [num_workgroups, _, _] = num_workgroups_1d(num_points);
        if num_workgroups > limits.max_compute_workgroups_per_dimension {
            return Err(SphereError::Resource(format!(
                "{num_points} points need {num_workgroups} workgroups, device allows {}",
                limits.max_compute_workgroups_per_dimension
            )));
        }
        let input_size = std::mem::size_of_val(points) as u64;
        if input_size > limits.max_storage_buffer_binding_size as u64 {
            return Err(SphereError::Resource(format!(
                "input buffer of {input_size} bytes exceeds binding limit {}",
                limits.max_storage_buffer_binding_size
            )));
        }

        // 6. Program
        let (module, err) = scoped(&device, || {
            device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("Rotate Project Kernel"),
                source: wgpu::ShaderSource::Wgsl(options.kernel_source.clone()),
            })
        });
        if let Some(err) = err {
            let log = build_log(&module, &err);
            error!("Kernel build log:\n{log}");
            return Err(SphereError::Compile { log });
        }
        res.program = Some(module.clone());

        // 7. Entry point
        let (kernel, err) = scoped(&device, || create_kernel(&device, &module));
        if let Some(err) = err {
            return Err(SphereError::Resource(format!(
                "entry point `{KERNEL_ENTRY_POINT}`: {err}"
            )));
        }
        let layout = kernel.bind_group_layout.clone();
        res.kernel = Some(kernel);

        // 8-9. Input uploaded once; output, readback staging and params
        let output_size = (points.len() * std::mem::size_of::<ScreenCoord>()) as u64;
        let ((input, output, staging, params), err) = scoped(&device, || {
            let input = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Point Cloud Buffer"),
                contents: bytemuck::cast_slice(points),
                usage: wgpu::BufferUsages::STORAGE,
            });
            let output = device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("Screen Coord Buffer"),
                size: output_size,
                usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
                mapped_at_creation: false,
            });
            let staging = device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("Screen Coord Staging Buffer"),
                size: output_size,
                usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });
            let params = device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("Transform Params Buffer"),
                size: std::mem::size_of::<TransformParams>() as u64,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });
            (input, output, staging, params)
        });
        res.input = Some(input.clone());
        res.output = Some(output.clone());
        res.staging = Some(staging);
        res.params = Some(params.clone());
        if let Some(err) = err {
            return Err(SphereError::Resource(format!("buffer allocation: {err}")));
        }

        let (bind_group, err) = scoped(&device, || {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Rotate Project Bind Group"),
                layout: &layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: input.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: output.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: params.as_entire_binding(),
                    },
                ],
            })
        });
        res.bind_group = Some(bind_group);
        if let Some(err) = err {
            return Err(SphereError::Resource(format!("bind group: {err}")));
        }

        info!(
            "Accelerator ready: {} on {}, {num_points} points",
            adapter_info.name,
            backend_name(adapter_info.backend)
        );
        Ok(adapter_info)
    }

    pub fn adapter_info(&self) -> &wgpu::AdapterInfo {
        &self.adapter_info
    }

    pub fn num_points(&self) -> usize {
        self.num_points as usize
    }

    /// Whether the context still holds a complete set of handles.
    pub fn is_live(&self) -> bool {
        self.resources.is_complete()
    }

    /// Release every handle now instead of at drop. Idempotent.
    pub fn release(&mut self) {
        let released = self.resources.release();
        if !released.is_empty() {
            info!("Accelerator released");
        }
    }

    /// Bind `angle`/`focal`, run the kernel over every point, and copy the
    /// result into `out` before returning.
    ///
    /// `out` must hold exactly one coordinate per point.
    pub fn dispatch(&self, angle: f32, focal: f32, out: &mut [ScreenCoord]) -> CrateResult<()> {
        let res = &self.resources;
        let (
            Some(device),
            Some(queue),
            Some(kernel),
            Some(output),
            Some(staging),
            Some(params),
            Some(bind_group),
        ) = (
            res.context.as_ref(),
            res.queue.as_ref(),
            res.kernel.as_ref(),
            res.output.as_ref(),
            res.staging.as_ref(),
            res.params.as_ref(),
            res.bind_group.as_ref(),
        )
        else {
            return Err(SphereError::Dispatch(
                "accelerator resources have been released".into(),
            ));
        };

        let expected = self.num_points();
        if out.len() != expected {
            return Err(SphereError::InvalidArgument(format!(
                "output holds {} coordinates but the cloud has {expected} points",
                out.len()
            )));
        }
        let size = std::mem::size_of_val(out) as u64;

        let params_data = TransformParams::new(angle, focal, self.num_points);
        let [num_workgroups, _, _] = num_workgroups_1d(self.num_points);

        let (_, err) = scoped(device, || {
            queue.write_buffer(params, 0, bytemuck::bytes_of(&params_data));

            let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Rotate Project Encoder"),
            });
            {
                let mut compute_pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                    label: Some("Rotate Project Pass"),
                    timestamp_writes: None,
                });
                compute_pass.set_pipeline(&kernel.pipeline);
                compute_pass.set_bind_group(0, bind_group, &[]);
                compute_pass.dispatch_workgroups(num_workgroups, 1, 1);
            }
            encoder.copy_buffer_to_buffer(output, 0, staging, 0, size);
            queue.submit(Some(encoder.finish()));
        });
        if let Some(err) = err {
            return Err(SphereError::Dispatch(format!("kernel submit: {err}")));
        }

        // Read results
        let buffer_slice = staging.slice(..);
        let (sender, receiver) = futures::channel::oneshot::channel();
        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });

        device
            .poll(wgpu::PollType::Wait)
            .map_err(|e| SphereError::Dispatch(format!("device poll: {e}")))?;
        futures::executor::block_on(receiver)
            .map_err(|e| SphereError::Dispatch(format!("channel error: {e:?}")))?
            .map_err(|e| SphereError::Dispatch(format!("buffer map: {e}")))?;

        let copied = {
            let view = buffer_slice.get_mapped_range();
            // Mapped bytes are reinterpreted as 8-byte ScreenCoord records;
            // any length or alignment mismatch is reported, never assumed away.
            match bytemuck::try_cast_slice::<u8, ScreenCoord>(&view) {
                Ok(coords) if coords.len() == out.len() => {
                    out.copy_from_slice(coords);
                    Ok(())
                }
                Ok(coords) => Err(SphereError::Dispatch(format!(
                    "readback holds {} coordinates, expected {}",
                    coords.len(),
                    out.len()
                ))),
                Err(e) => Err(SphereError::Dispatch(format!("readback layout: {e}"))),
            }
        };
        staging.unmap();
        copied
    }
}
