use bytemuck::{Pod, Zeroable};
use std::mem;

/// One corner of a batched quad. `tex_index` is the texture unit to sample,
/// stored as a float so it travels in the same buffer as the rest.
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable, Debug, PartialEq)]
pub struct Vertex2D {
    pub position: [f32; 3],
    pub tex_coord: [f32; 2],
    pub color: [f32; 4],
    pub tex_index: f32,
}

impl Vertex2D {
    pub const SIZE: usize = mem::size_of::<Self>();

    pub const ATTRS: [wgpu::VertexAttribute; 4] = wgpu::vertex_attr_array![
        0 => Float32x3,
        1 => Float32x2,
        2 => Float32x4,
        3 => Float32
    ];

    pub fn layout<'a>() -> wgpu::VertexBufferLayout<'a> {
        wgpu::VertexBufferLayout {
            array_stride: Self::SIZE as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }

    /// Texture unit as an integer. Negative or fractional values round down to a valid unit.
    pub fn texture_unit(&self) -> u32 {
        self.tex_index.max(0.0) as u32
    }
}
