//! GPU device context for dequantization offload.
//!
//! Grounded on the reference Vulkan context: one instance/device/queue, a
//! persistent pair of device-local input/output buffers sized by the
//! largest `k` seen so far, and a one-shot command sequence per
//! `dequantize` call (write input, dispatch, copy to a host-visible staging
//! buffer, map, read back). `wgpu` stands in for the original's raw Vulkan
//! calls; the shape of the lifecycle (`init` once, `prepare` to
//! (re)allocate on growth, `dequantize` per call, teardown in reverse
//! order) is unchanged.
//!
//! `wgpu` concept mapping used throughout this module:
//!
//! | Vulkan                              | wgpu                                   |
//! |--------------------------------------|-----------------------------------------|
//! | `VkInstance`                         | `wgpu::Instance`                        |
//! | `VkPhysicalDevice`                    | `wgpu::Adapter`                         |
//! | `VkDevice` / `VkQueue`                | `wgpu::Device` / `wgpu::Queue`           |
//! | `VkDescriptorSetLayout`               | `wgpu::BindGroupLayout`                 |
//! | `VkDescriptorSet`                     | `wgpu::BindGroup`                       |
//! | `VkShaderModule` (SPIR-V blob)         | `wgpu::ShaderModule` (WGSL source)       |
//! | `VkPipeline` (compute)                | `wgpu::ComputePipeline`                 |
//! | `VkCommandBuffer` + one-time submit    | `wgpu::CommandEncoder` + `queue.submit`  |
//! | staging buffer + `vkMapMemory`         | `wgpu::Buffer::map_async` + `get_mapped_range` |

use crate::block::{BLOCK_BYTES, block_count};
use crate::config;
use crate::error::{VextraError, VextraResult};

const SHADER_SOURCE: &str = include_str!("shader.wgsl");
const WORDS_PER_BLOCK: usize = 18;

/// A prepared GPU device ready to dequantize Q2_K tensors.
///
/// Not `Sync`: `dequantize` takes `&mut self` because it reuses a single
/// pair of persistent buffers across calls, the same single-threaded-use
/// assumption the reference Vulkan context makes (one context, one queue,
/// no concurrent dispatch).
pub struct DeviceContext {
    device: wgpu::Device,
    queue: wgpu::Queue,
    pipeline: wgpu::ComputePipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    input_buffer: wgpu::Buffer,
    output_buffer: wgpu::Buffer,
    current_max_k: usize,
}

impl DeviceContext {
    /// Create an instance, request an adapter and device, and build the
    /// compute pipeline. Does not allocate the input/output buffers yet;
    /// call [`Self::prepare`] (or just [`Self::dequantize`], which prepares
    /// lazily) before issuing work.
    pub fn init() -> VextraResult<Self> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .ok_or_else(|| VextraError::NoComputeCapability("no adapter found".into()))?;

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("vextra-device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_defaults(),
            },
            None,
        ))
        .map_err(|e| VextraError::NoComputeCapability(e.to_string()))?;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("vextra-dequantize-shader"),
            source: wgpu::ShaderSource::Wgsl(SHADER_SOURCE.into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("vextra-bind-group-layout"),
            entries: &[storage_entry(0, true), storage_entry(1, false)],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("vextra-pipeline-layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("vextra-dequantize-pipeline"),
            layout: Some(&pipeline_layout),
            module: &shader,
            entry_point: "main",
        });

        // Size the persistent buffers from the start for `DEFAULT_GPU_MAX_K`
        // elements rather than a single block, so a host's first
        // real-sized `dequantize` call doesn't immediately force a
        // `prepare` reallocation.
        let initial_max_k = config::DEFAULT_GPU_MAX_K;
        let initial_nb = block_count(initial_max_k)?;
        let input_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("vextra-input-buffer"),
            size: (initial_nb * BLOCK_BYTES) as u64,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let output_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("vextra-output-buffer"),
            size: (initial_max_k * std::mem::size_of::<f32>()) as u64,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });

        Ok(Self {
            device,
            queue,
            pipeline,
            bind_group_layout,
            input_buffer,
            output_buffer,
            current_max_k: initial_max_k,
        })
    }

    /// Ensure the persistent input/output buffers can hold `max_k`
    /// elements, (re)allocating only if `max_k` exceeds the current
    /// capacity. A no-op otherwise, mirroring the reference context's
    /// non-growing `prepare`.
    ///
    /// `create_buffer` itself never returns a `Result` — wgpu surfaces
    /// out-of-memory and validation failures asynchronously through error
    /// scopes rather than at the call site — so both allocations are made
    /// under a pushed `OutOfMemory` scope and only committed to `self` once
    /// the scope confirms neither one failed. On failure `self.input_buffer`,
    /// `self.output_buffer`, and `self.current_max_k` are left exactly as
    /// they were, per the "prior state is preserved on `prepare`" contract.
    pub fn prepare(&mut self, max_k: usize) -> VextraResult<()> {
        if max_k <= self.current_max_k {
            return Ok(());
        }

        let nb = block_count(max_k)?;
        let in_size = (nb * BLOCK_BYTES) as u64;
        let out_size = (max_k * std::mem::size_of::<f32>()) as u64;

        self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        let input_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("vextra-input-buffer"),
            size: in_size,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let output_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("vextra-output-buffer"),
            size: out_size,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });
        if let Some(err) = pollster::block_on(self.device.pop_error_scope()) {
            return Err(VextraError::DeviceAllocationFailed(err.to_string()));
        }

        self.input_buffer = input_buffer;
        self.output_buffer = output_buffer;
        self.current_max_k = max_k;
        Ok(())
    }

    /// Dequantize `k` Q2_K-packed elements from `src` into `dst` on the
    /// GPU: write the input bytes, dispatch one thread per output element,
    /// copy into a host-visible staging buffer, map it, and copy out.
    pub fn dequantize(&mut self, src: &[u8], dst: &mut [f32], k: usize) -> VextraResult<()> {
        let nb = block_count(k)?;
        let expected_src = nb * BLOCK_BYTES;
        if src.len() != expected_src {
            return Err(VextraError::SizeMismatch {
                expected: expected_src,
                actual: src.len(),
            });
        }
        if dst.len() != k {
            return Err(VextraError::SizeMismatch {
                expected: k,
                actual: dst.len(),
            });
        }

        if k > self.current_max_k {
            self.prepare(k)?;
        }

        debug_assert_eq!(expected_src % 4, 0);
        debug_assert_eq!(nb * WORDS_PER_BLOCK * 4, expected_src);

        self.queue.write_buffer(&self.input_buffer, 0, src);

        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("vextra-bind-group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.input_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: self.output_buffer.as_entire_binding(),
                },
            ],
        });

        let out_size = (k * std::mem::size_of::<f32>()) as u64;
        let staging = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("vextra-readback-staging-buffer"),
            size: out_size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("vextra-dequantize-encoder"),
            });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("vextra-dequantize-pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            // One workgroup per Q2_K block, per the workgroup contract.
            pass.dispatch_workgroups(nb as u32, 1, 1);
        }
        encoder.copy_buffer_to_buffer(&self.output_buffer, 0, &staging, 0, out_size);
        self.queue.submit(Some(encoder.finish()));

        let slice = staging.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        self.device.poll(wgpu::Maintain::Wait);
        rx.recv()
            .map_err(|e| VextraError::DeviceAllocationFailed(e.to_string()))?
            .map_err(|e| VextraError::DeviceAllocationFailed(e.to_string()))?;

        {
            let mapped = slice.get_mapped_range();
            let floats: &[f32] = bytemuck::cast_slice(&mapped);
            dst.copy_from_slice(floats);
        }
        staging.unmap();

        Ok(())
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

