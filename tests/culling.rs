use std::cell::RefCell;
use std::rc::Rc;

use glam::{Vec2, Vec3, Vec4};
use wgpu_sprites::renderer::{
    PassContext, PassState, RecordingDevice, RenderPass, RenderPassBase, Renderer2D, SpritePass,
};
use wgpu_sprites::scene::{Camera, Renderable, Scene, Sprite, Transform2D};
use wgpu_sprites::settings::{CullingSettings, EngineSettings};
use wgpu_sprites::EngineError;

fn sprite_renderer(culling: CullingSettings) -> Renderer2D<RecordingDevice> {
    let settings = EngineSettings {
        culling,
        async_textures: false,
        ..EngineSettings::default()
    };
    let mut renderer = Renderer2D::new(RecordingDevice::new(), &settings).unwrap();
    renderer
        .add_pass(Box::new(SpritePass::new("sprites")))
        .unwrap();
    renderer
}

fn spawn_sprite(scene: &mut Scene, position: Vec3, color: Vec4) -> hecs::Entity {
    scene
        .spawn()
        .with_transform(Transform2D::new(position, Vec2::ONE))
        .with_sprite(Sprite::colored(color))
        .spawn()
}

fn is_culled(scene: &Scene, entity: hecs::Entity) -> bool {
    scene.world.get::<&Renderable>(entity).unwrap().0.is_culled()
}

#[test]
fn sprite_outside_the_view_is_not_drawn() {
    let mut renderer = sprite_renderer(CullingSettings::default());
    let mut scene = Scene::default();
    let visible = spawn_sprite(&mut scene, Vec3::ZERO, Vec4::ONE);
    let hidden = spawn_sprite(&mut scene, Vec3::new(100.0, 0.0, 0.0), Vec4::ONE);
    scene.sync_shapes();

    let stats = renderer.render_frame(&mut scene).unwrap();

    assert_eq!(stats.tested, 2);
    assert_eq!(stats.culled, 1);
    assert_eq!(stats.batch.quad_count, 1);
    assert!(!is_culled(&scene, visible));
    assert!(is_culled(&scene, hidden));
    assert_eq!(renderer.device().draws()[0].quad_count(), 1);
}

#[test]
fn sprite_touching_the_view_edge_is_kept() {
    let mut renderer = sprite_renderer(CullingSettings::default());
    // 16 units tall so the top plane sits exactly at y = 8.
    let mut scene = Scene::new(Camera::orthographic_2d(Vec2::ZERO, 16.0, 1.0));
    let touching = spawn_sprite(&mut scene, Vec3::new(0.0, 8.5, 0.0), Vec4::ONE);
    let beyond = spawn_sprite(&mut scene, Vec3::new(0.0, 9.0, 0.0), Vec4::ONE);
    scene.sync_shapes();

    renderer.render_frame(&mut scene).unwrap();
    assert!(!is_culled(&scene, touching));
    assert!(is_culled(&scene, beyond));
}

#[test]
fn distance_range_culls_near_and_far() {
    let culling = CullingSettings {
        frustum: false,
        distance: true,
        near: 0.0,
        far: 15.0,
    };
    let mut renderer = sprite_renderer(culling);
    let mut scene = Scene::default();
    // Camera eye is 10 units in front of the z = 0 plane.
    let close = spawn_sprite(&mut scene, Vec3::ZERO, Vec4::ONE);
    let far = spawn_sprite(&mut scene, Vec3::new(0.0, 20.0, 0.0), Vec4::ONE);
    scene.sync_shapes();

    let stats = renderer.render_frame(&mut scene).unwrap();
    assert_eq!(stats.culled, 1);
    assert!(!is_culled(&scene, close));
    assert!(is_culled(&scene, far));

    let culling = CullingSettings {
        near: 11.0,
        ..culling
    };
    let mut renderer = sprite_renderer(culling);
    let stats = renderer.render_frame(&mut scene).unwrap();
    assert_eq!(stats.culled, 2);
    assert_eq!(renderer.device().draw_count(), 0);
}

#[test]
fn sprites_are_drawn_back_to_front() {
    let mut renderer = sprite_renderer(CullingSettings::default());
    let mut scene = Scene::default();
    let front = Vec4::new(1.0, 0.0, 0.0, 1.0);
    let back = Vec4::new(0.0, 0.0, 1.0, 1.0);
    spawn_sprite(&mut scene, Vec3::new(0.0, 0.0, 0.5), front);
    spawn_sprite(&mut scene, Vec3::new(0.0, 0.0, -0.5), back);
    scene.sync_shapes();

    renderer.render_frame(&mut scene).unwrap();

    let draw = &renderer.device().draws()[0];
    assert_eq!(draw.vertices[0].color, back.to_array());
    assert_eq!(draw.vertices[4].color, front.to_array());
}

#[test]
fn moving_camera_brings_sprite_into_view() {
    let mut renderer = sprite_renderer(CullingSettings::default());
    let mut scene = Scene::default();
    let sprite = spawn_sprite(&mut scene, Vec3::new(100.0, 0.0, 0.0), Vec4::ONE);
    scene.sync_shapes();

    renderer.render_frame(&mut scene).unwrap();
    assert!(is_culled(&scene, sprite));

    scene.camera_mut().translate(Vec3::new(100.0, 0.0, 0.0));
    renderer.render_frame(&mut scene).unwrap();
    assert!(!is_culled(&scene, sprite));
}

#[test]
fn pass_tint_and_camera_reach_the_draw() {
    let mut renderer = Renderer2D::new(RecordingDevice::new(), &EngineSettings::default()).unwrap();
    let tint = Vec4::new(1.0, 0.8, 0.6, 1.0);
    renderer
        .add_pass(Box::new(SpritePass::new("tinted").with_tint(tint)))
        .unwrap();
    let mut scene = Scene::new(Camera::orthographic_2d(Vec2::new(2.0, 1.0), 12.0, 1.0));
    spawn_sprite(&mut scene, Vec3::new(2.0, 1.0, 0.0), Vec4::ONE);
    scene.sync_shapes();

    renderer.render_frame(&mut scene).unwrap();

    let draw = &renderer.device().draws()[0];
    assert_eq!(draw.tint, Some(tint));
    assert_eq!(draw.view_projection, Some(scene.camera().view_proj()));
}

/// Records the order in which the frame drives it.
struct TracePass {
    base: RenderPassBase,
    calls: Rc<RefCell<Vec<&'static str>>>,
}

impl TracePass {
    fn log(&self, call: &'static str) {
        self.calls.borrow_mut().push(call);
    }
}

impl RenderPass for TracePass {
    fn base(&self) -> &RenderPassBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut RenderPassBase {
        &mut self.base
    }

    fn init(&mut self, _ctx: &mut PassContext<'_>) -> Result<(), EngineError> {
        self.log("init");
        self.base.mark_initialized()
    }

    fn begin_render_pass(&mut self, _ctx: &mut PassContext<'_>) -> Result<(), EngineError> {
        self.log("begin");
        self.base.mark_recording()
    }

    fn end_render_pass(&mut self, _ctx: &mut PassContext<'_>) -> Result<(), EngineError> {
        self.log("end");
        self.base.mark_finished()
    }

    fn render(&mut self, _ctx: &mut PassContext<'_>, _scene: &mut Scene) -> Result<(), EngineError> {
        self.log("render");
        self.base.ensure_recording()
    }

    fn update_shader(&mut self, _ctx: &mut PassContext<'_>) -> Result<(), EngineError> {
        self.log("update_shader");
        Ok(())
    }
}

#[test]
fn frame_drives_pass_lifecycle_in_order() {
    let calls = Rc::new(RefCell::new(Vec::new()));
    let mut renderer = Renderer2D::new(RecordingDevice::new(), &EngineSettings::default()).unwrap();
    renderer
        .add_pass(Box::new(TracePass {
            base: RenderPassBase::new("trace"),
            calls: Rc::clone(&calls),
        }))
        .unwrap();

    let mut scene = Scene::default();
    renderer.render_frame(&mut scene).unwrap();
    renderer.render_frame(&mut scene).unwrap();

    let frame = ["update_shader", "begin", "render", "end"];
    let mut expected = vec!["init"];
    expected.extend(frame);
    expected.extend(frame);
    assert_eq!(*calls.borrow(), expected);

    let pass = renderer.passes().next().unwrap();
    assert_eq!(pass.name(), "trace");
    assert_eq!(pass.base().state(), PassState::Initialized);
}

#[test]
fn adding_an_initialized_pass_fails() {
    let mut renderer = Renderer2D::new(RecordingDevice::new(), &EngineSettings::default()).unwrap();
    let mut base = RenderPassBase::new("twice");
    base.mark_initialized().unwrap();
    let err = renderer
        .add_pass(Box::new(TracePass {
            base,
            calls: Rc::default(),
        }))
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidPassTransition { .. }));
    assert_eq!(renderer.passes().count(), 0);
}
