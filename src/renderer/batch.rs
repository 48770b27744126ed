// renderer/batch.rs
// Quad batching with auto-flush on buffer or texture-slot exhaustion.

use glam::{Mat4, Vec2, Vec3, Vec4};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use super::shader::{Shader, ShaderLibrary, BATCH_SHADER, TEXTURES, VIEW_PROJECTION};
use super::{BufferId, BufferKind, DrawIndexed, GraphicsDevice, Texture, TextureId, Topology, Vertex2D};
use crate::error::{EngineError, LoadError};
use crate::math::{quad_transform, QUAD_TEX_COORDS, UNIT_QUAD};
use crate::scene::Camera;

const QUAD_INDICES: [u32; 6] = [0, 1, 2, 2, 3, 0];

/// Batch capacities. Everything else is derived from these two numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Quads per draw call.
    #[serde(default = "BatchConfig::default_max_batch_count")]
    pub max_batch_count: u32,
    /// Texture slots per draw call, including the reserved white slot 0.
    #[serde(default = "BatchConfig::default_max_textures")]
    pub max_textures: u32,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_batch_count: Self::default_max_batch_count(),
            max_textures: Self::default_max_textures(),
        }
    }
}

impl BatchConfig {
    pub const MIN_TEXTURES: u32 = 2;
    pub const MAX_TEXTURES: u32 = 32;

    pub fn with_max_batch_count(mut self, count: u32) -> Self {
        self.max_batch_count = count;
        self
    }

    pub fn with_max_textures(mut self, count: u32) -> Self {
        self.max_textures = count;
        self
    }

    pub fn max_vertex_count(&self) -> usize {
        self.max_batch_count as usize * 4
    }

    pub fn max_index_count(&self) -> u32 {
        self.max_batch_count.saturating_mul(6)
    }

    pub fn validate(mut self) -> Self {
        if self.max_batch_count == 0 {
            warn!("Batch size must hold at least one quad. Using 1 instead.");
            self.max_batch_count = 1;
        }

        // Index math stays in u32.
        let limit = u32::MAX / 6;
        if self.max_batch_count > limit {
            warn!("Batch size {} too large. Using {} instead.", self.max_batch_count, limit);
            self.max_batch_count = limit;
        }

        let clamped = self.max_textures.clamp(Self::MIN_TEXTURES, Self::MAX_TEXTURES);
        if clamped != self.max_textures {
            warn!(
                "Texture slot count {} outside [{}, {}]. Using {} instead.",
                self.max_textures,
                Self::MIN_TEXTURES,
                Self::MAX_TEXTURES,
                clamped
            );
            self.max_textures = clamped;
        }

        self
    }

    const fn default_max_batch_count() -> u32 {
        1024 * 1024
    }

    const fn default_max_textures() -> u32 {
        32
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchStats {
    pub quad_count: u32,
    pub draw_count: u32,
}

/// One quad submission. Missing vertices or UVs use the centered unit quad.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quad {
    pub position: Vec3,
    pub scale: Vec2,
    /// Radians around Z.
    pub rotation: f32,
    pub color: Vec4,
    pub vertices: Option<[Vec3; 4]>,
    pub tex_coords: Option<[Vec2; 4]>,
    pub texture: Option<TextureId>,
}

impl Default for Quad {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            scale: Vec2::ONE,
            rotation: 0.0,
            color: Vec4::ONE,
            vertices: None,
            tex_coords: None,
            texture: None,
        }
    }
}

impl Quad {
    pub fn new(position: Vec3, scale: Vec2) -> Self {
        Self {
            position,
            scale,
            ..Self::default()
        }
    }

    pub fn with_rotation(mut self, radians: f32) -> Self {
        self.rotation = radians;
        self
    }

    pub fn with_color(mut self, color: Vec4) -> Self {
        self.color = color;
        self
    }

    pub fn with_texture(mut self, texture: TextureId) -> Self {
        self.texture = Some(texture);
        self
    }

    pub fn with_vertices(mut self, vertices: [Vec3; 4]) -> Self {
        self.vertices = Some(vertices);
        self
    }

    pub fn with_tex_coords(mut self, tex_coords: [Vec2; 4]) -> Self {
        self.tex_coords = Some(tex_coords);
        self
    }

    pub fn transform(&self) -> Mat4 {
        quad_transform(self.position, self.scale, self.rotation)
    }
}

/// Accumulates quads on the CPU and submits them in as few draws as the
/// buffer and texture-slot limits allow.
///
/// Usage per frame: `begin_batch`, any number of `add_batch`, then `flush`.
/// Quads reach the device in submission order; when a limit is hit the
/// current batch is drawn before the incoming quad is appended. The shader
/// bound at that point stays bound for the rest of the batch.
///
/// The batch shader lives in the [`ShaderLibrary`] under [`BATCH_SHADER`];
/// `begin_batch` writes the camera into that entry before binding it.
pub struct BatchRenderer {
    config: BatchConfig,
    /// Length is the write cursor.
    vertices: Vec<Vertex2D>,
    vertex_buffer: BufferId,
    index_buffer: BufferId,
    white_texture: Texture,
    /// Length is the slot cursor. Slot 0 is always the white texture.
    slots: Vec<TextureId>,
    index_count: u32,
    stats: BatchStats,
}

impl BatchRenderer {
    /// Creates the device buffers and registers the batch shader in `shaders`.
    pub fn new(
        device: &mut dyn GraphicsDevice,
        shaders: &mut ShaderLibrary,
        config: BatchConfig,
    ) -> Result<Self, LoadError> {
        let mut config = config.validate();

        let units = device.max_texture_units();
        if config.max_textures > units {
            warn!(
                "Device exposes {} texture units, reducing batch slots from {}",
                units, config.max_textures
            );
            config.max_textures = units.max(BatchConfig::MIN_TEXTURES);
        }

        let white_texture = Texture::placeholder(device)?;
        let vertex_buffer = device.create_buffer(
            BufferKind::Vertex,
            config.max_vertex_count() * Vertex2D::SIZE,
            "Batch Vertex Buffer",
        );

        let indices: Vec<u32> = (0..config.max_batch_count)
            .flat_map(|quad| QUAD_INDICES.iter().map(move |i| i + quad * 4))
            .collect();
        let index_buffer = device.create_buffer(
            BufferKind::Index,
            indices.len() * std::mem::size_of::<u32>(),
            "Batch Index Buffer",
        );
        device.write_buffer(index_buffer, 0, bytemuck::cast_slice(&indices));

        let mut shader = Shader::new(BATCH_SHADER);
        let samplers: Vec<i32> = (0..config.max_textures as i32).collect();
        shader.set_int_array(TEXTURES, &samplers);
        shader.set_mat4(VIEW_PROJECTION, Mat4::IDENTITY);
        shaders.insert(shader);

        info!(
            "Batch renderer ready: {} quads per draw, {} texture slots",
            config.max_batch_count, config.max_textures
        );

        let mut slots = Vec::with_capacity(config.max_textures as usize);
        slots.push(white_texture.id);

        Ok(Self {
            config,
            vertices: Vec::new(),
            vertex_buffer,
            index_buffer,
            white_texture,
            slots,
            index_count: 0,
            stats: BatchStats::default(),
        })
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    pub fn begin_batch(
        &mut self,
        device: &mut dyn GraphicsDevice,
        shaders: &mut ShaderLibrary,
        camera: &Camera,
    ) -> Result<(), EngineError> {
        self.begin_batch_with(device, shaders, camera.view_proj())
    }

    pub fn begin_batch_with(
        &mut self,
        device: &mut dyn GraphicsDevice,
        shaders: &mut ShaderLibrary,
        view_projection: Mat4,
    ) -> Result<(), EngineError> {
        let shader = shaders.get_mut(BATCH_SHADER)?;
        shader.set_mat4(VIEW_PROJECTION, view_projection);
        shader.bind(device);
        self.vertices.clear();
        Ok(())
    }

    pub fn add_batch(&mut self, device: &mut dyn GraphicsDevice, quad: &Quad) {
        let bound_slot = quad.texture.and_then(|texture| self.find_slot(texture));
        let buffer_full = self.index_count >= self.config.max_index_count();
        let slots_full = quad.texture.is_some()
            && bound_slot.is_none()
            && self.slots.len() as u32 >= self.config.max_textures;

        let slot = if buffer_full || slots_full {
            debug!(
                "Auto-flush after {} indices ({})",
                self.index_count,
                if buffer_full { "buffer full" } else { "texture slots full" }
            );
            self.flush(device);
            quad.texture.map(|texture| self.bind_slot(texture))
        } else {
            bound_slot.or_else(|| quad.texture.map(|texture| self.bind_slot(texture)))
        };

        let tex_index = slot.unwrap_or(0) as f32;
        let transform = quad.transform();
        let corners = quad.vertices.unwrap_or(UNIT_QUAD);
        let tex_coords = quad.tex_coords.unwrap_or(QUAD_TEX_COORDS);
        let color = quad.color.to_array();

        self.vertices.extend(corners.iter().zip(tex_coords.iter()).map(|(corner, uv)| Vertex2D {
            position: transform.transform_point3(*corner).to_array(),
            tex_coord: uv.to_array(),
            color,
            tex_index,
        }));

        self.index_count += 6;
        self.stats.quad_count += 1;
    }

    fn find_slot(&self, texture: TextureId) -> Option<usize> {
        self.slots
            .iter()
            .skip(1)
            .position(|bound| *bound == texture)
            .map(|offset| offset + 1)
    }

    fn bind_slot(&mut self, texture: TextureId) -> usize {
        self.slots.push(texture);
        self.slots.len() - 1
    }

    /// Upload the quads written since `begin_batch`.
    pub fn end_batch(&mut self, device: &mut dyn GraphicsDevice) {
        if self.vertices.is_empty() {
            return;
        }
        device.write_buffer(self.vertex_buffer, 0, bytemuck::cast_slice(&self.vertices));
    }

    /// Draw the uploaded quads and start over with only the white slot bound.
    pub fn draw_batch(&mut self, device: &mut dyn GraphicsDevice) {
        if self.index_count > 0 {
            for (unit, texture) in self.slots.iter().enumerate() {
                device.bind_texture(unit as u32, *texture);
            }
            device.draw_indexed(&DrawIndexed {
                vertex_buffer: self.vertex_buffer,
                index_buffer: self.index_buffer,
                index_count: self.index_count,
                topology: Topology::Triangles,
            });
            self.stats.draw_count += 1;
        }

        self.index_count = 0;
        self.slots.truncate(1);
        self.vertices.clear();
    }

    pub fn flush(&mut self, device: &mut dyn GraphicsDevice) {
        self.end_batch(device);
        self.draw_batch(device);
    }

    pub fn stats(&self) -> BatchStats {
        self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = BatchStats::default();
    }

    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    pub fn slot_cursor(&self) -> usize {
        self.slots.len()
    }

    pub fn white_texture(&self) -> &Texture {
        &self.white_texture
    }

    pub fn shutdown(self, device: &mut dyn GraphicsDevice) {
        info!(
            "Batch renderer shutting down ({} quads in {} draws since last reset)",
            self.stats.quad_count, self.stats.draw_count
        );
        device.destroy_buffer(self.vertex_buffer);
        device.destroy_buffer(self.index_buffer);
        self.white_texture.destroy(device);
    }
}
