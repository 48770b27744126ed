// renderer/device.rs
// The seam between batching logic and the GPU API.

use std::collections::{BTreeMap, HashMap};

use glam::{Mat4, Vec4};

use super::shader::{Shader, TINT, VIEW_PROJECTION};
use super::vertex::Vertex2D;
use crate::asset::ImageData;
use crate::error::LoadError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(pub(crate) u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub(crate) u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferKind {
    Vertex,
    Index,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Topology {
    #[default]
    Triangles,
    Lines,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlendMode {
    #[default]
    Alpha,
    Additive,
    Opaque,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawIndexed {
    pub vertex_buffer: BufferId,
    pub index_buffer: BufferId,
    pub index_count: u32,
    pub topology: Topology,
}

/// What the batch renderer needs from a graphics API.
///
/// Everything is called from the thread that owns the device. Index buffers
/// hold `u32` indices.
pub trait GraphicsDevice {
    fn create_buffer(&mut self, kind: BufferKind, size: usize, label: &str) -> BufferId;
    fn write_buffer(&mut self, buffer: BufferId, offset: usize, data: &[u8]);
    fn destroy_buffer(&mut self, buffer: BufferId);

    /// Fails without creating anything when the device cannot hold `image`.
    fn create_texture(&mut self, image: &ImageData, label: &str) -> Result<TextureId, LoadError>;
    fn destroy_texture(&mut self, texture: TextureId);
    fn bind_texture(&mut self, unit: u32, texture: TextureId);

    /// Makes `shader` current and uploads its uniforms.
    fn bind_shader(&mut self, shader: &Shader);
    fn unbind_shader(&mut self);

    fn set_viewport(&mut self, width: u32, height: u32);
    fn clear(&mut self, color: [f32; 4]);
    fn set_blend_mode(&mut self, mode: BlendMode);
    fn draw_indexed(&mut self, draw: &DrawIndexed);

    fn max_texture_units(&self) -> u32;
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCommand {
    CreateBuffer { id: BufferId, kind: BufferKind, size: usize },
    WriteBuffer { id: BufferId, offset: usize, len: usize },
    DestroyBuffer(BufferId),
    CreateTexture { id: TextureId, width: u32, height: u32 },
    DestroyTexture(TextureId),
    BindTexture { unit: u32, texture: TextureId },
    BindShader(String),
    UnbindShader,
    SetViewport { width: u32, height: u32 },
    Clear([f32; 4]),
    SetBlendMode(BlendMode),
    DrawIndexed { index_count: u32, topology: Topology },
}

/// Device state captured at the moment of a draw call.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawSnapshot {
    pub index_count: u32,
    pub topology: Topology,
    pub blend: BlendMode,
    pub indices: Vec<u32>,
    pub vertices: Vec<Vertex2D>,
    /// Units up to the highest one a vertex of this draw samples.
    pub textures: BTreeMap<u32, TextureId>,
    pub shader: Option<String>,
    pub view_projection: Option<Mat4>,
    pub tint: Option<Vec4>,
}

impl DrawSnapshot {
    pub fn quad_count(&self) -> u32 {
        self.index_count / 6
    }

    /// Texture actually sampled by a vertex, through the unit it names.
    pub fn texture_for(&self, vertex: &Vertex2D) -> Option<TextureId> {
        self.textures.get(&vertex.texture_unit()).copied()
    }
}

#[derive(Debug)]
struct RecordedBuffer {
    kind: BufferKind,
    data: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordedTexture {
    pub width: u32,
    pub height: u32,
}

/// Headless device that keeps buffer contents in memory and logs every call.
/// Used by tests and by the renderer when no window is available.
#[derive(Debug)]
pub struct RecordingDevice {
    commands: Vec<DeviceCommand>,
    draws: Vec<DrawSnapshot>,
    buffers: HashMap<BufferId, RecordedBuffer>,
    textures: HashMap<TextureId, RecordedTexture>,
    bound_textures: BTreeMap<u32, TextureId>,
    bound_shader: Option<Shader>,
    blend: BlendMode,
    max_texture_units: u32,
    max_texture_dimension: u32,
    rejected_writes: usize,
    next_id: u32,
}

impl RecordingDevice {
    pub const DEFAULT_TEXTURE_UNITS: u32 = 32;
    /// Matches wgpu's default `max_texture_dimension_2d`.
    pub const DEFAULT_TEXTURE_DIMENSION: u32 = 8192;

    pub fn new() -> Self {
        Self::with_texture_units(Self::DEFAULT_TEXTURE_UNITS)
    }

    pub fn with_texture_units(max_texture_units: u32) -> Self {
        Self {
            commands: Vec::new(),
            draws: Vec::new(),
            buffers: HashMap::new(),
            textures: HashMap::new(),
            bound_textures: BTreeMap::new(),
            bound_shader: None,
            blend: BlendMode::default(),
            max_texture_units,
            max_texture_dimension: Self::DEFAULT_TEXTURE_DIMENSION,
            rejected_writes: 0,
            next_id: 1,
        }
    }

    pub fn with_max_texture_dimension(mut self, max: u32) -> Self {
        self.max_texture_dimension = max;
        self
    }

    fn next_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn commands(&self) -> &[DeviceCommand] {
        &self.commands
    }

    pub fn draws(&self) -> &[DrawSnapshot] {
        &self.draws
    }

    pub fn draw_count(&self) -> usize {
        self.draws.len()
    }

    pub fn live_buffers(&self) -> usize {
        self.buffers.len()
    }

    pub fn live_textures(&self) -> usize {
        self.textures.len()
    }

    pub fn texture(&self, id: TextureId) -> Option<RecordedTexture> {
        self.textures.get(&id).copied()
    }

    pub fn buffer_contents(&self, id: BufferId) -> Option<&[u8]> {
        self.buffers.get(&id).map(|b| b.data.as_slice())
    }

    pub fn bound_texture(&self, unit: u32) -> Option<TextureId> {
        self.bound_textures.get(&unit).copied()
    }

    pub fn rejected_writes(&self) -> usize {
        self.rejected_writes
    }

    /// Forget recorded commands and draws; resources stay alive.
    pub fn clear_log(&mut self) {
        self.commands.clear();
        self.draws.clear();
    }

    fn snapshot(&self, draw: &DrawIndexed) -> DrawSnapshot {
        let indices: Vec<u32> = self
            .buffers
            .get(&draw.index_buffer)
            .map(|buffer| {
                buffer
                    .data
                    .chunks_exact(4)
                    .take(draw.index_count as usize)
                    .map(bytemuck::pod_read_unaligned::<u32>)
                    .collect()
            })
            .unwrap_or_default();

        let vertex_count = indices.iter().max().map_or(0, |max| *max as usize + 1);
        let vertices: Vec<Vertex2D> = self
            .buffers
            .get(&draw.vertex_buffer)
            .map(|buffer| {
                buffer
                    .data
                    .chunks_exact(Vertex2D::SIZE)
                    .take(vertex_count)
                    .map(bytemuck::pod_read_unaligned::<Vertex2D>)
                    .collect()
            })
            .unwrap_or_default();

        let textures = match vertices.iter().map(Vertex2D::texture_unit).max() {
            Some(highest) => self
                .bound_textures
                .range(..=highest)
                .map(|(unit, texture)| (*unit, *texture))
                .collect(),
            None => BTreeMap::new(),
        };

        DrawSnapshot {
            index_count: draw.index_count,
            topology: draw.topology,
            blend: self.blend,
            indices,
            vertices,
            textures,
            shader: self.bound_shader.as_ref().map(|s| s.name().to_string()),
            view_projection: self.bound_shader.as_ref().and_then(|s| s.mat4(VIEW_PROJECTION)),
            tint: self.bound_shader.as_ref().and_then(|s| s.float4(TINT)),
        }
    }
}

impl Default for RecordingDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphicsDevice for RecordingDevice {
    fn create_buffer(&mut self, kind: BufferKind, size: usize, label: &str) -> BufferId {
        let id = BufferId(self.next_id());
        log::debug!("Created {:?} buffer '{}' ({} bytes)", kind, label, size);
        self.buffers.insert(
            id,
            RecordedBuffer {
                kind,
                data: vec![0; size],
            },
        );
        self.commands.push(DeviceCommand::CreateBuffer { id, kind, size });
        id
    }

    fn write_buffer(&mut self, id: BufferId, offset: usize, data: &[u8]) {
        let Some(buffer) = self.buffers.get_mut(&id) else {
            log::error!("Write to unknown buffer {:?}", id);
            self.rejected_writes += 1;
            return;
        };
        let end = offset + data.len();
        if end > buffer.data.len() {
            log::error!(
                "Write of {} bytes at {} overflows {:?} buffer of {} bytes",
                data.len(),
                offset,
                buffer.kind,
                buffer.data.len()
            );
            self.rejected_writes += 1;
            return;
        }
        buffer.data[offset..end].copy_from_slice(data);
        self.commands.push(DeviceCommand::WriteBuffer {
            id,
            offset,
            len: data.len(),
        });
    }

    fn destroy_buffer(&mut self, id: BufferId) {
        self.buffers.remove(&id);
        self.commands.push(DeviceCommand::DestroyBuffer(id));
    }

    fn create_texture(&mut self, image: &ImageData, label: &str) -> Result<TextureId, LoadError> {
        let max = self.max_texture_dimension;
        if image.width > max || image.height > max {
            return Err(LoadError::TextureTooLarge {
                label: label.to_string(),
                width: image.width,
                height: image.height,
                max,
            });
        }

        let id = TextureId(self.next_id());
        log::debug!("Created texture '{}' {}x{}", label, image.width, image.height);
        self.textures.insert(
            id,
            RecordedTexture {
                width: image.width,
                height: image.height,
            },
        );
        self.commands.push(DeviceCommand::CreateTexture {
            id,
            width: image.width,
            height: image.height,
        });
        Ok(id)
    }

    fn destroy_texture(&mut self, id: TextureId) {
        self.textures.remove(&id);
        self.bound_textures.retain(|_, bound| *bound != id);
        self.commands.push(DeviceCommand::DestroyTexture(id));
    }

    fn bind_texture(&mut self, unit: u32, texture: TextureId) {
        if unit >= self.max_texture_units {
            log::error!("Texture unit {} out of range ({} units)", unit, self.max_texture_units);
            return;
        }
        self.bound_textures.insert(unit, texture);
        self.commands.push(DeviceCommand::BindTexture { unit, texture });
    }

    fn bind_shader(&mut self, shader: &Shader) {
        self.bound_shader = Some(shader.clone());
        self.commands.push(DeviceCommand::BindShader(shader.name().to_string()));
    }

    fn unbind_shader(&mut self) {
        self.bound_shader = None;
        self.commands.push(DeviceCommand::UnbindShader);
    }

    fn set_viewport(&mut self, width: u32, height: u32) {
        self.commands.push(DeviceCommand::SetViewport { width, height });
    }

    fn clear(&mut self, color: [f32; 4]) {
        self.commands.push(DeviceCommand::Clear(color));
    }

    fn set_blend_mode(&mut self, mode: BlendMode) {
        self.blend = mode;
        self.commands.push(DeviceCommand::SetBlendMode(mode));
    }

    fn draw_indexed(&mut self, draw: &DrawIndexed) {
        let snapshot = self.snapshot(draw);
        self.draws.push(snapshot);
        self.commands.push(DeviceCommand::DrawIndexed {
            index_count: draw.index_count,
            topology: draw.topology,
        });
    }

    fn max_texture_units(&self) -> u32 {
        self.max_texture_units
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_bounds_write_is_rejected() {
        let mut device = RecordingDevice::new();
        let buffer = device.create_buffer(BufferKind::Index, 8, "test");

        device.write_buffer(buffer, 4, &[1, 2, 3, 4]);
        device.write_buffer(buffer, 6, &[1, 2, 3, 4]);

        assert_eq!(device.rejected_writes(), 1);
        assert_eq!(device.buffer_contents(buffer), Some(&[0, 0, 0, 0, 1, 2, 3, 4][..]));
    }

    #[test]
    fn draw_snapshot_decodes_referenced_vertices() {
        let mut device = RecordingDevice::new();
        let vertices = device.create_buffer(BufferKind::Vertex, Vertex2D::SIZE * 4, "v");
        let indices = device.create_buffer(BufferKind::Index, 4 * 6, "i");

        let corner = Vertex2D {
            position: [1.0, 2.0, 0.0],
            tex_coord: [0.0, 1.0],
            color: [1.0; 4],
            tex_index: 2.0,
        };
        device.write_buffer(vertices, 0, bytemuck::cast_slice(&[corner; 3]));
        device.write_buffer(indices, 0, bytemuck::cast_slice(&[0u32, 1, 2]));

        let texture = device.create_texture(&ImageData::solid([255; 4]), "white").unwrap();
        device.bind_texture(2, texture);
        device.draw_indexed(&DrawIndexed {
            vertex_buffer: vertices,
            index_buffer: indices,
            index_count: 3,
            topology: Topology::Triangles,
        });

        let draw = &device.draws()[0];
        assert_eq!(draw.indices, vec![0, 1, 2]);
        assert_eq!(draw.vertices.len(), 3);
        assert_eq!(draw.texture_for(&draw.vertices[0]), Some(texture));
    }

    #[test]
    fn destroying_a_texture_unbinds_it() {
        let mut device = RecordingDevice::with_texture_units(4);
        let texture = device.create_texture(&ImageData::solid([0; 4]), "black").unwrap();
        device.bind_texture(1, texture);
        device.bind_texture(9, texture);
        assert_eq!(device.bound_texture(1), Some(texture));

        device.destroy_texture(texture);
        assert_eq!(device.bound_texture(1), None);
        assert_eq!(device.live_textures(), 0);
    }

    #[test]
    fn oversized_texture_is_rejected() {
        let mut device = RecordingDevice::new().with_max_texture_dimension(4);
        let image = ImageData::checkerboard(8, 2, [255; 4], [0, 0, 0, 255]);

        let err = device.create_texture(&image, "big").unwrap_err();
        assert!(matches!(
            err,
            LoadError::TextureTooLarge { width: 8, height: 8, max: 4, .. }
        ));
        assert_eq!(device.live_textures(), 0);
        assert!(device.create_texture(&ImageData::solid([0; 4]), "small").is_ok());
    }

    #[test]
    fn snapshot_drops_units_above_the_highest_sampled() {
        let mut device = RecordingDevice::new();
        let vertices = device.create_buffer(BufferKind::Vertex, Vertex2D::SIZE * 4, "v");
        let indices = device.create_buffer(BufferKind::Index, 4 * 6, "i");
        let stale: Vec<TextureId> = (0..4)
            .map(|_| device.create_texture(&ImageData::solid([0; 4]), "t").unwrap())
            .collect();
        for (unit, texture) in stale.iter().enumerate() {
            device.bind_texture(unit as u32, *texture);
        }

        let corner = Vertex2D {
            position: [0.0; 3],
            tex_coord: [0.0; 2],
            color: [1.0; 4],
            tex_index: 1.0,
        };
        device.write_buffer(vertices, 0, bytemuck::cast_slice(&[corner; 3]));
        device.write_buffer(indices, 0, bytemuck::cast_slice(&[0u32, 1, 2]));
        device.draw_indexed(&DrawIndexed {
            vertex_buffer: vertices,
            index_buffer: indices,
            index_count: 3,
            topology: Topology::Triangles,
        });

        let draw = &device.draws()[0];
        assert_eq!(draw.textures.keys().copied().collect::<Vec<_>>(), vec![0, 1]);
        assert_eq!(device.bound_texture(3), Some(stale[3]));
    }
}
