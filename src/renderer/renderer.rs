// renderer/renderer.rs
// Owns the device, batch renderer, assets and passes, and runs a frame.

use std::path::Path;
use std::time::Duration;

use crate::asset::{Assets, LoadMode, ResourceHandle};
use crate::error::{EngineError, ErrorQueue};
use crate::math::Frustum;
use crate::renderer::batch::{BatchRenderer, BatchStats};
use crate::renderer::render_pass::{PassContext, RenderPass};
use crate::renderer::shader::ShaderLibrary;
use crate::renderer::{GraphicsDevice, Texture};
use crate::scene::Scene;
use crate::settings::{CullingSettings, EngineSettings};

const SHUTDOWN_LOAD_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub batch: BatchStats,
    pub tested: u32,
    pub culled: u32,
    pub published: usize,
    pub errors: usize,
}

pub struct Renderer2D<D: GraphicsDevice> {
    device: D,
    batch: BatchRenderer,
    assets: Assets,
    shaders: ShaderLibrary,
    errors: ErrorQueue,
    passes: Vec<Box<dyn RenderPass>>,
    culling: CullingSettings,
    load_mode: LoadMode,
    clear_color: [f32; 4],
}

impl<D: GraphicsDevice> Renderer2D<D> {
    pub fn new(mut device: D, settings: &EngineSettings) -> Result<Self, EngineError> {
        let errors = ErrorQueue::new();
        let mut shaders = ShaderLibrary::new();
        let batch = BatchRenderer::new(&mut device, &mut shaders, settings.batch)?;
        let assets = Assets::new(&mut device, errors.clone())?;

        let load_mode = if settings.async_textures {
            LoadMode::Async
        } else {
            LoadMode::Blocking
        };

        Ok(Self {
            device,
            batch,
            assets,
            shaders,
            errors,
            passes: Vec::new(),
            culling: settings.culling,
            load_mode,
            clear_color: settings.clear_color,
        })
    }

    /// Initialize `pass`, apply the configured culling flags and append it.
    /// Passes run in the order they were added.
    pub fn add_pass(&mut self, mut pass: Box<dyn RenderPass>) -> Result<(), EngineError> {
        let culling = self.culling;
        pass.set_vf_culling_param(culling.frustum, Frustum::unbounded(), glam::Mat4::IDENTITY);
        pass.set_distance_culling_param(culling.distance, glam::Vec3::ZERO, culling.near, culling.far);

        let camera = crate::scene::Camera::default();
        let mut ctx = PassContext {
            device: &mut self.device,
            batch: &mut self.batch,
            shaders: &mut self.shaders,
            textures: &self.assets.textures,
            camera: &camera,
        };
        pass.init(&mut ctx)?;
        self.passes.push(pass);
        Ok(())
    }

    pub fn request_texture(&mut self, name: &str, path: impl AsRef<Path>) -> ResourceHandle<Texture> {
        self.assets
            .request_texture(&mut self.device, name, path, self.load_mode)
    }

    pub fn load_mode(&self) -> LoadMode {
        self.load_mode
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    /// Split borrow for callers that need the device and assets at once.
    pub fn device_and_assets(&mut self) -> (&mut D, &mut Assets) {
        (&mut self.device, &mut self.assets)
    }

    pub fn assets(&self) -> &Assets {
        &self.assets
    }

    pub fn batch(&self) -> &BatchRenderer {
        &self.batch
    }

    pub fn shaders(&self) -> &ShaderLibrary {
        &self.shaders
    }

    pub fn shaders_mut(&mut self) -> &mut ShaderLibrary {
        &mut self.shaders
    }

    pub fn errors(&self) -> &ErrorQueue {
        &self.errors
    }

    pub fn passes(&self) -> impl Iterator<Item = &dyn RenderPass> {
        self.passes.iter().map(|pass| pass.as_ref())
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.device.set_viewport(width, height);
    }

    /// Publish finished loads, run every pass against `scene`, then drain and
    /// log queued load errors.
    pub fn render_frame(&mut self, scene: &mut Scene) -> Result<FrameStats, EngineError> {
        let mut stats = FrameStats {
            published: self.assets.poll(&mut self.device),
            ..FrameStats::default()
        };

        self.batch.reset_stats();
        self.device.clear(self.clear_color);

        let camera = *scene.camera();
        for pass in self.passes.iter_mut() {
            let mut ctx = PassContext {
                device: &mut self.device,
                batch: &mut self.batch,
                shaders: &mut self.shaders,
                textures: &self.assets.textures,
                camera: &camera,
            };

            pass.update_shader(&mut ctx)?;
            pass.base_mut().update_culling_from_camera(&camera);
            pass.begin_render_pass(&mut ctx)?;
            pass.render(&mut ctx, scene)?;
            pass.end_render_pass(&mut ctx)?;

            let culling = pass.base().stats();
            stats.tested += culling.tested;
            stats.culled += culling.culled;
        }
        stats.batch = self.batch.stats();

        for queued in self.errors.drain() {
            log::error!("Failed to load {}", queued);
            stats.errors += 1;
        }

        Ok(stats)
    }

    /// Wait briefly for in-flight loads, release GPU resources and hand the
    /// device back.
    pub fn shutdown(mut self) -> D {
        if !self.assets.wait_idle(&mut self.device, SHUTDOWN_LOAD_TIMEOUT) {
            log::warn!("Shutting down with {} loads in flight", self.assets.in_flight());
        }
        self.assets.shutdown(&mut self.device);
        self.batch.shutdown(&mut self.device);
        log::info!("Renderer shut down");
        self.device
    }
}
