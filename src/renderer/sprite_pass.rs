// renderer/sprite_pass.rs
// Culls sprite entities and feeds survivors and particles to the batch renderer.

use glam::Vec4;

use super::batch::Quad;
use super::device::BlendMode;
use super::render_pass::{PassContext, RenderPass, RenderPassBase};
use super::shader::{BATCH_SHADER, TINT};
use crate::error::EngineError;
use crate::scene::{ParticleSystem, Renderable, Scene, Sprite, Transform2D};

pub struct SpritePass {
    base: RenderPassBase,
    tint: Vec4,
    blend: BlendMode,
    draw_particles: bool,
    queue: Vec<Quad>,
}

impl SpritePass {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            base: RenderPassBase::new(name),
            tint: Vec4::ONE,
            blend: BlendMode::Alpha,
            draw_particles: true,
            queue: Vec::new(),
        }
    }

    pub fn with_tint(mut self, tint: Vec4) -> Self {
        self.tint = tint;
        self
    }

    pub fn with_blend_mode(mut self, blend: BlendMode) -> Self {
        self.blend = blend;
        self
    }

    pub fn with_particles(mut self, draw_particles: bool) -> Self {
        self.draw_particles = draw_particles;
        self
    }

    pub fn set_tint(&mut self, tint: Vec4) {
        self.tint = tint;
    }
}

impl RenderPass for SpritePass {
    fn base(&self) -> &RenderPassBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut RenderPassBase {
        &mut self.base
    }

    fn init(&mut self, _ctx: &mut PassContext<'_>) -> Result<(), EngineError> {
        self.base.mark_initialized()?;
        log::info!("Initialized sprite pass '{}'", self.base.name());
        Ok(())
    }

    fn begin_render_pass(&mut self, ctx: &mut PassContext<'_>) -> Result<(), EngineError> {
        self.base.mark_recording()?;
        ctx.device.set_blend_mode(self.blend);
        ctx.batch.begin_batch(ctx.device, ctx.shaders, ctx.camera)
    }

    fn end_render_pass(&mut self, ctx: &mut PassContext<'_>) -> Result<(), EngineError> {
        ctx.batch.flush(ctx.device);
        self.base.mark_finished()
    }

    /// Sprites in ascending z, ties in query order, then particle systems.
    fn render(&mut self, ctx: &mut PassContext<'_>, scene: &mut Scene) -> Result<(), EngineError> {
        self.base.ensure_recording()?;

        self.queue.clear();
        for (_, (transform, sprite, renderable)) in scene
            .world
            .query_mut::<(&Transform2D, &Sprite, &mut Renderable)>()
        {
            if !self.base.cull(&mut renderable.0) {
                continue;
            }

            let texture = sprite
                .texture
                .as_ref()
                .map(|handle| ctx.textures.resolve(Some(handle)).id);
            let mut quad = Quad::new(transform.position, transform.scale)
                .with_rotation(transform.rotation)
                .with_color(sprite.color);
            quad.texture = texture;
            quad.tex_coords = sprite.tex_coords;
            self.queue.push(quad);
        }
        self.queue.sort_by(|a, b| a.position.z.total_cmp(&b.position.z));

        for quad in &self.queue {
            ctx.batch.add_batch(ctx.device, quad);
        }

        if self.draw_particles {
            for (_, particles) in scene.world.query_mut::<&ParticleSystem>() {
                for quad in particles.quads() {
                    ctx.batch.add_batch(ctx.device, &quad);
                }
            }
        }

        let stats = self.base.stats();
        log::debug!(
            "Pass '{}': {} of {} sprites culled",
            self.base.name(),
            stats.culled,
            stats.tested
        );
        Ok(())
    }

    fn update_shader(&mut self, ctx: &mut PassContext<'_>) -> Result<(), EngineError> {
        ctx.shaders.get_mut(BATCH_SHADER)?.set_float4(TINT, self.tint);
        Ok(())
    }
}
