// app.rs
use std::sync::Arc;
use std::time::Instant;

use winit::{
    application::ApplicationHandler,
    event::*,
    event_loop::ActiveEventLoop,
    keyboard::{Key, NamedKey},
    window::{Window, WindowId},
};

use crate::error::EngineError;
use crate::renderer::{Renderer2D, SpritePass, WgpuDevice};
use crate::scene::{Camera, Scene};
use crate::settings::EngineSettings;

pub struct StartupContext<'a> {
    pub renderer: &'a mut Renderer2D<WgpuDevice>,
    pub scene: &'a mut Scene,
}

pub struct UpdateContext<'a> {
    pub scene: &'a mut Scene,
    /// Seconds since the previous frame.
    pub dt: f64,
}

pub type StartupSystem = Box<dyn for<'a> FnOnce(&mut StartupContext<'a>)>;
pub type UpdateSystem = Box<dyn for<'a> FnMut(&mut UpdateContext<'a>)>;

/// Something that registers startup and per-frame systems on an app.
pub trait Plugin {
    fn build(&self, app: &mut AppBuilder);
}

pub struct AppBuilder {
    title: String,
    settings: EngineSettings,
    startup: Vec<StartupSystem>,
    systems: Vec<UpdateSystem>,
    default_pass: bool,
}

impl Default for AppBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AppBuilder {
    pub fn new() -> Self {
        Self {
            title: "wgpu sprites".to_string(),
            settings: EngineSettings::load(),
            startup: Vec::new(),
            systems: Vec::new(),
            default_pass: true,
        }
    }

    pub fn with_title(&mut self, title: impl Into<String>) -> &mut Self {
        self.title = title.into();
        self
    }

    pub fn with_settings(&mut self, settings: EngineSettings) -> &mut Self {
        self.settings = settings.validate();
        self
    }

    pub fn settings_mut(&mut self) -> &mut EngineSettings {
        &mut self.settings
    }

    /// Skip the sprite pass added at startup; plugins then add their own.
    pub fn disable_default_pass(&mut self) -> &mut Self {
        self.default_pass = false;
        self
    }

    pub fn add_plugin(&mut self, plugin: impl Plugin) -> &mut Self {
        plugin.build(self);
        self
    }

    pub fn add_startup_system(
        &mut self,
        system: impl for<'a> FnOnce(&mut StartupContext<'a>) + 'static,
    ) -> &mut Self {
        self.startup.push(Box::new(system));
        self
    }

    pub fn add_system(&mut self, system: impl for<'a> FnMut(&mut UpdateContext<'a>) + 'static) -> &mut Self {
        self.systems.push(Box::new(system));
        self
    }

    pub fn build(self) -> App {
        App {
            title: self.title,
            settings: self.settings,
            startup: self.startup,
            systems: self.systems,
            default_pass: self.default_pass,
            window: None,
            renderer: None,
            scene: Scene::default(),
            last_frame: Instant::now(),
            frame_index: 0,
        }
    }
}

pub struct App {
    title: String,
    settings: EngineSettings,
    startup: Vec<StartupSystem>,
    systems: Vec<UpdateSystem>,
    default_pass: bool,
    window: Option<Arc<Window>>,
    renderer: Option<Renderer2D<WgpuDevice>>,
    scene: Scene,
    last_frame: Instant,
    frame_index: u64,
}

impl App {
    fn init(&mut self, window: Arc<Window>) -> Result<(), EngineError> {
        let size = window.inner_size();
        let device = pollster::block_on(WgpuDevice::new(window.clone(), &self.settings))?;
        let mut renderer = Renderer2D::new(device, &self.settings)?;
        if self.default_pass {
            renderer.add_pass(Box::new(SpritePass::new("sprites")))?;
        }

        let mut camera = Camera::default();
        camera.set_aspect(size.width, size.height);
        self.scene.set_camera(camera);

        let mut ctx = StartupContext {
            renderer: &mut renderer,
            scene: &mut self.scene,
        };
        for system in self.startup.drain(..) {
            system(&mut ctx);
        }
        log::info!("Scene ready: {} entities", self.scene.world.len());

        self.renderer = Some(renderer);
        self.window = Some(window);
        self.last_frame = Instant::now();
        Ok(())
    }

    fn redraw(&mut self) -> Result<(), EngineError> {
        let Some(renderer) = self.renderer.as_mut() else {
            return Ok(());
        };

        let now = Instant::now();
        let dt = (now - self.last_frame).as_secs_f64();
        self.last_frame = now;

        let mut ctx = UpdateContext {
            scene: &mut self.scene,
            dt,
        };
        for system in self.systems.iter_mut() {
            system(&mut ctx);
        }
        self.scene.update(dt);

        if !renderer.device_mut().begin_frame()? {
            return Ok(());
        }
        let stats = renderer.render_frame(&mut self.scene)?;
        renderer.device_mut().end_frame();

        self.frame_index += 1;
        if self.frame_index % 300 == 0 {
            log::info!(
                "Frame {}: {} quads in {} draws, {}/{} culled",
                self.frame_index,
                stats.batch.quad_count,
                stats.batch.draw_count,
                stats.culled,
                stats.tested
            );
        }
        Ok(())
    }

    fn shutdown(&mut self) {
        if let Some(renderer) = self.renderer.take() {
            renderer.shutdown();
        }
        self.window = None;
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let (width, height) = (self.settings.resolution.width, self.settings.resolution.height);
        let attributes = Window::default_attributes()
            .with_title(self.title.clone())
            .with_inner_size(winit::dpi::PhysicalSize::new(width, height));
        let window = match event_loop.create_window(attributes) {
            Ok(window) => Arc::new(window),
            Err(err) => {
                log::error!("Failed to create window: {}", err);
                event_loop.exit();
                return;
            }
        };

        if let Err(err) = self.init(window) {
            log::error!("Failed to initialize renderer: {}", err);
            event_loop.exit();
            return;
        }

        if let Some(w) = &self.window {
            w.request_redraw();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, id: WindowId, event: WindowEvent) {
        if self.window.as_ref().map(|w| w.id()) != Some(id) {
            return;
        }

        match event {
            WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                self.shutdown();
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                if let Some(renderer) = self.renderer.as_mut() {
                    renderer.device_mut().resize(size);
                }
                self.scene.camera_mut().set_aspect(size.width, size.height);
            }
            WindowEvent::RedrawRequested => {
                if let Err(err) = self.redraw() {
                    log::error!("Render error: {}", err);
                    self.shutdown();
                    event_loop.exit();
                    return;
                }
                if let Some(w) = &self.window {
                    w.request_redraw();
                }
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        logical_key: Key::Named(NamedKey::Escape),
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } => {
                self.shutdown();
                event_loop.exit();
            }
            _ => {}
        }
    }
}
