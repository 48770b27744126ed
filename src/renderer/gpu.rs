// renderer/gpu.rs
// wgpu implementation of GraphicsDevice drawing into a window surface.

use std::collections::HashMap;
use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec4};
use wgpu::util::DeviceExt;
use winit::dpi::PhysicalSize;
use winit::window::Window;

use super::device::{BlendMode, BufferId, BufferKind, DrawIndexed, GraphicsDevice, TextureId, Topology};
use super::pipeline_builder::PipelineBuilder;
use super::shader::{Shader, TINT, VIEW_PROJECTION};
use super::vertex::Vertex2D;
use crate::asset::ImageData;
use crate::error::{EngineError, LoadError};
use crate::settings::EngineSettings;

/// Texture bindings in the batch shader. Matches `shaders/batch.wgsl`.
pub const TEXTURE_UNITS: u32 = 16;

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct BatchUniform {
    view_proj: [[f32; 4]; 4],
    tint: [f32; 4],
}

impl BatchUniform {
    fn new(view_proj: Mat4, tint: Vec4) -> Self {
        Self {
            view_proj: view_proj.to_cols_array_2d(),
            tint: tint.to_array(),
        }
    }
}

struct GpuTexture {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
}

struct Frame {
    surface_texture: wgpu::SurfaceTexture,
    view: wgpu::TextureView,
}

pub struct WgpuDevice {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    size: PhysicalSize<u32>,

    globals_buffer: wgpu::Buffer,
    globals_bind_group: wgpu::BindGroup,
    texture_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    pipelines: HashMap<(BlendMode, Topology), wgpu::RenderPipeline>,

    buffers: HashMap<BufferId, wgpu::Buffer>,
    textures: HashMap<TextureId, GpuTexture>,
    fallback: GpuTexture,
    units: [Option<TextureId>; TEXTURE_UNITS as usize],
    blend: BlendMode,
    shader_bound: bool,
    pending_clear: Option<wgpu::Color>,
    frame: Option<Frame>,
    next_id: u32,
}

fn device_error(context: &str, err: impl std::fmt::Display) -> EngineError {
    EngineError::Device(format!("{context}: {err}"))
}

impl WgpuDevice {
    pub async fn new(window: Arc<Window>, settings: &EngineSettings) -> Result<Self, EngineError> {
        let size = window.inner_size();
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance
            .create_surface(window)
            .map_err(|err| device_error("failed to create surface", err))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|err| device_error("no suitable adapter", err))?;
        log::info!("Using adapter: {:?}", adapter.get_info());

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("Device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
            })
            .await
            .map_err(|err| device_error("failed to create device", err))?;

        let surface_caps = surface.get_capabilities(&adapter);
        let format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or_else(|| EngineError::Device("surface reports no formats".into()))?;
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: settings.present_mode(&surface_caps.present_modes),
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let uniform = BatchUniform::new(Mat4::IDENTITY, Vec4::ONE);
        let globals_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Batch Globals"),
            contents: bytemuck::bytes_of(&uniform),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let globals_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Batch Globals Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });
        let globals_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Batch Globals"),
            layout: &globals_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: globals_buffer.as_entire_binding(),
            }],
        });

        let mut texture_entries: Vec<wgpu::BindGroupLayoutEntry> = (0..TEXTURE_UNITS)
            .map(|binding| wgpu::BindGroupLayoutEntry {
                binding,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            })
            .collect();
        texture_entries.push(wgpu::BindGroupLayoutEntry {
            binding: TEXTURE_UNITS,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
            count: None,
        });
        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Batch Texture Layout"),
            entries: &texture_entries,
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Batch Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Batch Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/batch.wgsl").into()),
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Batch Pipeline Layout"),
            bind_group_layouts: &[&globals_layout, &texture_layout],
            push_constant_ranges: &[],
        });

        let mut pipelines = HashMap::new();
        for blend in [BlendMode::Alpha, BlendMode::Additive, BlendMode::Opaque] {
            for topology in [Topology::Triangles, Topology::Lines] {
                let pipeline = PipelineBuilder::new(&device, &pipeline_layout, &shader)
                    .with_label("Batch Pipeline")
                    .with_vertex_buffer(Vertex2D::layout())
                    .with_color_target(config.format, blend)
                    .with_topology(topology)
                    .build();
                pipelines.insert((blend, topology), pipeline);
            }
        }

        let fallback = Self::upload_texture(&device, &queue, &ImageData::solid([255; 4]), "Fallback Texture")?;

        log::info!(
            "wgpu device ready: {:?} {}x{}, {} texture units",
            config.format,
            config.width,
            config.height,
            TEXTURE_UNITS
        );

        Ok(Self {
            surface,
            device,
            queue,
            config,
            size,
            globals_buffer,
            globals_bind_group,
            texture_layout,
            sampler,
            pipelines,
            buffers: HashMap::new(),
            textures: HashMap::new(),
            fallback,
            units: [None; TEXTURE_UNITS as usize],
            blend: BlendMode::Alpha,
            shader_bound: false,
            pending_clear: None,
            frame: None,
            next_id: 1,
        })
    }

    fn upload_texture(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        image: &ImageData,
        label: &str,
    ) -> Result<GpuTexture, LoadError> {
        let max = device.limits().max_texture_dimension_2d;
        if image.width > max || image.height > max {
            return Err(LoadError::TextureTooLarge {
                label: label.to_string(),
                width: image.width,
                height: image.height,
                max,
            });
        }

        let size = wgpu::Extent3d {
            width: image.width,
            height: image.height,
            depth_or_array_layers: 1,
        };
        let format = if image.srgb {
            wgpu::TextureFormat::Rgba8UnormSrgb
        } else {
            wgpu::TextureFormat::Rgba8Unorm
        };

        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &image.pixels,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * image.width),
                rows_per_image: Some(image.height),
            },
            size,
        );
        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            return Err(LoadError::TextureCreation {
                label: label.to_string(),
                reason: err.to_string(),
            });
        }

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Ok(GpuTexture {
            _texture: texture,
            view,
        })
    }

    fn next_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn size(&self) -> PhysicalSize<u32> {
        self.size
    }

    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        self.size = new_size;
        self.config.width = new_size.width;
        self.config.height = new_size.height;
        self.surface.configure(&self.device, &self.config);
    }

    /// Acquire the next surface texture. `Ok(false)` means skip this frame.
    pub fn begin_frame(&mut self) -> Result<bool, EngineError> {
        let surface_texture = match self.surface.get_current_texture() {
            Ok(texture) => texture,
            Err(wgpu::SurfaceError::OutOfMemory) => {
                return Err(EngineError::Device("surface out of memory".into()));
            }
            Err(err) => {
                log::warn!("Surface unavailable ({err}), reconfiguring");
                self.surface.configure(&self.device, &self.config);
                return Ok(false);
            }
        };
        let view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        self.frame = Some(Frame {
            surface_texture,
            view,
        });
        Ok(true)
    }

    /// Apply a clear that no draw consumed, then present.
    pub fn end_frame(&mut self) {
        let Some(frame) = self.frame.take() else {
            return;
        };
        if let Some(color) = self.pending_clear.take() {
            let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Clear Encoder"),
            });
            encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Clear Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &frame.view,
                    resolve_target: None,
                    depth_slice: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(color),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            self.queue.submit(Some(encoder.finish()));
        }
        frame.surface_texture.present();
    }

    fn texture_bind_group(&self) -> wgpu::BindGroup {
        let views: Vec<&wgpu::TextureView> = self
            .units
            .iter()
            .map(|unit| {
                unit.and_then(|id| self.textures.get(&id))
                    .map_or(&self.fallback.view, |texture| &texture.view)
            })
            .collect();

        let mut entries: Vec<wgpu::BindGroupEntry> = views
            .iter()
            .copied()
            .enumerate()
            .map(|(binding, view)| wgpu::BindGroupEntry {
                binding: binding as u32,
                resource: wgpu::BindingResource::TextureView(view),
            })
            .collect();
        entries.push(wgpu::BindGroupEntry {
            binding: TEXTURE_UNITS,
            resource: wgpu::BindingResource::Sampler(&self.sampler),
        });

        self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Batch Textures"),
            layout: &self.texture_layout,
            entries: &entries,
        })
    }
}

impl GraphicsDevice for WgpuDevice {
    fn create_buffer(&mut self, kind: BufferKind, size: usize, label: &str) -> BufferId {
        let usage = match kind {
            BufferKind::Vertex => wgpu::BufferUsages::VERTEX,
            BufferKind::Index => wgpu::BufferUsages::INDEX,
        } | wgpu::BufferUsages::COPY_DST;
        let size = (size as wgpu::BufferAddress).max(wgpu::COPY_BUFFER_ALIGNMENT);
        let size = size.next_multiple_of(wgpu::COPY_BUFFER_ALIGNMENT);

        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size,
            usage,
            mapped_at_creation: false,
        });
        let id = BufferId(self.next_id());
        self.buffers.insert(id, buffer);
        id
    }

    fn write_buffer(&mut self, id: BufferId, offset: usize, data: &[u8]) {
        match self.buffers.get(&id) {
            Some(buffer) if (offset + data.len()) as u64 <= buffer.size() => {
                self.queue.write_buffer(buffer, offset as wgpu::BufferAddress, data);
            }
            Some(buffer) => log::error!(
                "Write of {} bytes at {} overflows buffer of {} bytes",
                data.len(),
                offset,
                buffer.size()
            ),
            None => log::error!("Write to unknown buffer {:?}", id),
        }
    }

    fn destroy_buffer(&mut self, id: BufferId) {
        if let Some(buffer) = self.buffers.remove(&id) {
            buffer.destroy();
        }
    }

    fn create_texture(&mut self, image: &ImageData, label: &str) -> Result<TextureId, LoadError> {
        let texture = Self::upload_texture(&self.device, &self.queue, image, label)?;
        let id = TextureId(self.next_id());
        self.textures.insert(id, texture);
        Ok(id)
    }

    fn destroy_texture(&mut self, id: TextureId) {
        self.textures.remove(&id);
        for unit in self.units.iter_mut().filter(|unit| **unit == Some(id)) {
            *unit = None;
        }
    }

    fn bind_texture(&mut self, unit: u32, texture: TextureId) {
        match self.units.get_mut(unit as usize) {
            Some(slot) => *slot = Some(texture),
            None => log::error!("Texture unit {} out of range ({} units)", unit, TEXTURE_UNITS),
        }
    }

    fn bind_shader(&mut self, shader: &Shader) {
        let view_proj = shader.mat4(VIEW_PROJECTION).unwrap_or(Mat4::IDENTITY);
        let tint = shader.float4(TINT).unwrap_or(Vec4::ONE);
        let uniform = BatchUniform::new(view_proj, tint);
        self.queue
            .write_buffer(&self.globals_buffer, 0, bytemuck::bytes_of(&uniform));
        self.shader_bound = true;
    }

    fn unbind_shader(&mut self) {
        self.shader_bound = false;
    }

    fn set_viewport(&mut self, width: u32, height: u32) {
        if (width, height) != (self.config.width, self.config.height) {
            self.resize(PhysicalSize::new(width, height));
        }
    }

    fn clear(&mut self, color: [f32; 4]) {
        self.pending_clear = Some(wgpu::Color {
            r: color[0] as f64,
            g: color[1] as f64,
            b: color[2] as f64,
            a: color[3] as f64,
        });
    }

    fn set_blend_mode(&mut self, mode: BlendMode) {
        self.blend = mode;
    }

    /// Each draw is submitted on its own so the next `write_buffer` to the
    /// shared vertex buffer cannot overtake it.
    fn draw_indexed(&mut self, draw: &DrawIndexed) {
        let Some(frame) = self.frame.as_ref() else {
            log::trace!("Draw outside of a frame dropped");
            return;
        };
        if !self.shader_bound {
            log::warn!("Draw without a bound shader dropped");
            return;
        }
        let (Some(vertex_buffer), Some(index_buffer)) =
            (self.buffers.get(&draw.vertex_buffer), self.buffers.get(&draw.index_buffer))
        else {
            log::error!("Draw references a destroyed buffer");
            return;
        };
        let Some(pipeline) = self.pipelines.get(&(self.blend, draw.topology)) else {
            return;
        };

        let textures = self.texture_bind_group();
        let load = self
            .pending_clear
            .take()
            .map_or(wgpu::LoadOp::Load, wgpu::LoadOp::Clear);

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Batch Encoder"),
        });
        {
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Batch Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &frame.view,
                    resolve_target: None,
                    depth_slice: None,
                    ops: wgpu::Operations {
                        load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            rpass.set_pipeline(pipeline);
            rpass.set_bind_group(0, &self.globals_bind_group, &[]);
            rpass.set_bind_group(1, &textures, &[]);
            rpass.set_vertex_buffer(0, vertex_buffer.slice(..));
            rpass.set_index_buffer(index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            rpass.draw_indexed(0..draw.index_count, 0, 0..1);
        }
        self.queue.submit(Some(encoder.finish()));
    }

    fn max_texture_units(&self) -> u32 {
        TEXTURE_UNITS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_uniform_matches_wgsl_layout() {
        // mat4x4<f32> + vec4<f32>
        assert_eq!(std::mem::size_of::<BatchUniform>(), 80);
    }
}
