pub mod batch;
pub mod device;
pub mod gpu;
pub mod material;
pub mod pipeline_builder;
pub mod render_pass;
pub mod renderer;
pub mod shader;
pub mod sprite_pass;
pub mod texture;
pub mod vertex;

pub use batch::{BatchConfig, BatchRenderer, BatchStats, Quad};
pub use device::{
    BlendMode, BufferId, BufferKind, DeviceCommand, DrawIndexed, DrawSnapshot, GraphicsDevice,
    RecordingDevice, TextureId, Topology,
};
pub use gpu::WgpuDevice;
pub use material::{is_texture_valid, Material, MaterialDesc, TextureSlotType};
pub use render_pass::{PassContext, PassState, RenderPass, RenderPassBase};
pub use renderer::{FrameStats, Renderer2D};
pub use shader::{Shader, ShaderLibrary};
pub use sprite_pass::SpritePass;
pub use texture::Texture;
pub use vertex::Vertex2D;
