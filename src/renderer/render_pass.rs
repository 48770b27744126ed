// renderer/render_pass.rs
// Pass lifecycle and the culling tests every pass shares.

use glam::{Mat4, Vec3};

use super::batch::BatchRenderer;
use super::shader::ShaderLibrary;
use super::GraphicsDevice;
use crate::asset::TextureRegistry;
use crate::error::EngineError;
use crate::math::{max_axis_scale, Frustum};
use crate::scene::{Bounds, Camera, Scene, Shape};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassState {
    Uninitialized,
    Initialized,
    Recording,
}

/// View-frustum culling input. The frustum is in view space; shapes are
/// brought there with `world_to_view`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VfcParam {
    pub enabled: bool,
    pub frustum: Frustum,
    pub world_to_view: Mat4,
}

impl Default for VfcParam {
    fn default() -> Self {
        Self {
            enabled: false,
            frustum: Frustum::unbounded(),
            world_to_view: Mat4::IDENTITY,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceCullingParam {
    pub enabled: bool,
    pub center: Vec3,
    pub near: f32,
    pub far: f32,
}

impl Default for DistanceCullingParam {
    fn default() -> Self {
        Self {
            enabled: false,
            center: Vec3::ZERO,
            near: 0.0,
            far: f32::MAX,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CullingStats {
    pub tested: u32,
    pub culled: u32,
}

/// State shared by all passes: name, lifecycle and culling parameters.
#[derive(Debug, Clone)]
pub struct RenderPassBase {
    name: String,
    state: PassState,
    vfc: VfcParam,
    distance: DistanceCullingParam,
    stats: CullingStats,
}

impl RenderPassBase {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: PassState::Uninitialized,
            vfc: VfcParam::default(),
            distance: DistanceCullingParam::default(),
            stats: CullingStats::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> PassState {
        self.state
    }

    fn transition(&mut self, from: PassState, to: PassState) -> Result<(), EngineError> {
        if self.state != from {
            return Err(EngineError::InvalidPassTransition {
                pass: self.name.clone(),
                from: self.state,
                to,
            });
        }
        self.state = to;
        Ok(())
    }

    /// Uninitialized -> Initialized. Only valid once.
    pub fn mark_initialized(&mut self) -> Result<(), EngineError> {
        self.transition(PassState::Uninitialized, PassState::Initialized)
    }

    /// Initialized -> Recording.
    pub fn mark_recording(&mut self) -> Result<(), EngineError> {
        self.transition(PassState::Initialized, PassState::Recording)?;
        self.stats = CullingStats::default();
        Ok(())
    }

    /// Recording -> Initialized.
    pub fn mark_finished(&mut self) -> Result<(), EngineError> {
        self.transition(PassState::Recording, PassState::Initialized)
    }

    pub fn ensure_recording(&self) -> Result<(), EngineError> {
        if self.state == PassState::Recording {
            Ok(())
        } else {
            Err(EngineError::InvalidPassTransition {
                pass: self.name.clone(),
                from: self.state,
                to: PassState::Recording,
            })
        }
    }

    pub fn set_vf_culling_param(&mut self, enabled: bool, frustum: Frustum, world_to_view: Mat4) {
        self.vfc = VfcParam {
            enabled,
            frustum,
            world_to_view,
        };
    }

    pub fn set_distance_culling_param(&mut self, enabled: bool, center: Vec3, near: f32, far: f32) {
        self.distance = DistanceCullingParam {
            enabled,
            center,
            near,
            far,
        };
    }

    pub fn vf_culling_param(&self) -> &VfcParam {
        &self.vfc
    }

    pub fn distance_culling_param(&self) -> &DistanceCullingParam {
        &self.distance
    }

    /// Refresh both parameter sets from `camera`, keeping the enabled flags and
    /// the distance range.
    pub fn update_culling_from_camera(&mut self, camera: &Camera) {
        self.vfc.frustum = Frustum::from_projection(camera.proj());
        self.vfc.world_to_view = camera.view();
        self.distance.center = camera.position();
    }

    /// True unless the shape lies entirely outside one frustum plane.
    /// Touching a plane counts as inside.
    pub fn view_frustum_culling_test(&self, shape: &Shape) -> bool {
        if !self.vfc.enabled {
            return true;
        }

        let to_view = self.vfc.world_to_view * shape.transform();
        match shape.bounds() {
            Bounds::Circle { center, radius } => {
                let center = to_view.transform_point3(*center);
                let radius = radius * max_axis_scale(&to_view);
                self.vfc.frustum.intersects_sphere(center, radius)
            }
            Bounds::Aabb { .. } | Bounds::Oobb { .. } => match shape.corners() {
                Some(corners) => {
                    let corners = corners.map(|corner| to_view.transform_point3(corner));
                    self.vfc.frustum.intersects_points(&corners)
                }
                None => true,
            },
        }
    }

    /// True when the shape's world center is within `[near, far]` of the
    /// culling center, bounds included.
    pub fn distance_culling_test(&self, shape: &Shape) -> bool {
        if !self.distance.enabled {
            return true;
        }
        let distance = self.distance.center.distance(shape.world_center());
        distance >= self.distance.near && distance <= self.distance.far
    }

    /// Run both tests, store the outcome on the shape and count it.
    pub fn cull(&mut self, shape: &mut Shape) -> bool {
        let visible = self.view_frustum_culling_test(shape) && self.distance_culling_test(shape);
        shape.set_culled(!visible);
        self.stats.tested += 1;
        if !visible {
            self.stats.culled += 1;
        }
        visible
    }

    pub fn stats(&self) -> CullingStats {
        self.stats
    }
}

/// Everything a pass may touch while recording.
pub struct PassContext<'a> {
    pub device: &'a mut dyn GraphicsDevice,
    pub batch: &'a mut BatchRenderer,
    pub shaders: &'a mut ShaderLibrary,
    pub textures: &'a TextureRegistry,
    pub camera: &'a Camera,
}

/// A stage of the frame. Implementors drive their `RenderPassBase` through
/// `init`, then `begin_render_pass`/`end_render_pass` once per frame.
pub trait RenderPass {
    fn base(&self) -> &RenderPassBase;
    fn base_mut(&mut self) -> &mut RenderPassBase;

    fn init(&mut self, ctx: &mut PassContext<'_>) -> Result<(), EngineError>;
    fn begin_render_pass(&mut self, ctx: &mut PassContext<'_>) -> Result<(), EngineError>;
    fn end_render_pass(&mut self, ctx: &mut PassContext<'_>) -> Result<(), EngineError>;
    fn render(&mut self, ctx: &mut PassContext<'_>, scene: &mut Scene) -> Result<(), EngineError>;
    fn update_shader(&mut self, ctx: &mut PassContext<'_>) -> Result<(), EngineError>;

    fn name(&self) -> &str {
        self.base().name()
    }

    fn set_vf_culling_param(&mut self, enabled: bool, frustum: Frustum, world_to_view: Mat4) {
        self.base_mut().set_vf_culling_param(enabled, frustum, world_to_view);
    }

    fn set_distance_culling_param(&mut self, enabled: bool, center: Vec3, near: f32, far: f32) {
        self.base_mut().set_distance_culling_param(enabled, center, near, far);
    }

    fn view_frustum_culling_test(&self, shape: &Shape) -> bool {
        self.base().view_frustum_culling_test(shape)
    }

    fn distance_culling_test(&self, shape: &Shape) -> bool {
        self.base().distance_culling_test(shape)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // View space: x and y in [-8, 8], z in [-65, -1].
    fn culling_base() -> RenderPassBase {
        let mut base = RenderPassBase::new("test");
        base.set_vf_culling_param(
            true,
            Frustum::from_projection(Mat4::orthographic_rh(-8.0, 8.0, -8.0, 8.0, 1.0, 65.0)),
            Mat4::IDENTITY,
        );
        base
    }

    #[test]
    fn lifecycle_rejects_out_of_order_calls() {
        let mut base = RenderPassBase::new("sprites");
        assert!(matches!(
            base.mark_recording(),
            Err(EngineError::InvalidPassTransition {
                from: PassState::Uninitialized,
                to: PassState::Recording,
                ..
            })
        ));

        base.mark_initialized().unwrap();
        assert!(base.mark_initialized().is_err());
        base.mark_recording().unwrap();
        assert!(base.ensure_recording().is_ok());
        base.mark_finished().unwrap();
        assert_eq!(base.state(), PassState::Initialized);
        assert!(base.mark_finished().is_err());
    }

    #[test]
    fn disabled_culling_accepts_everything() {
        let base = RenderPassBase::new("test");
        let far_away = Shape::circle(Vec3::new(1e6, 0.0, 0.0), 1.0);
        assert!(base.view_frustum_culling_test(&far_away));
        assert!(base.distance_culling_test(&far_away));
    }

    #[test]
    fn circle_inside_outside_straddling() {
        let base = culling_base();
        assert!(base.view_frustum_culling_test(&Shape::circle(Vec3::new(0.0, 0.0, -10.0), 1.0)));
        assert!(!base.view_frustum_culling_test(&Shape::circle(Vec3::new(20.0, 0.0, -10.0), 1.0)));
        assert!(base.view_frustum_culling_test(&Shape::circle(Vec3::new(8.5, 0.0, -10.0), 1.0)));
        // Touching the right plane from outside.
        assert!(base.view_frustum_culling_test(&Shape::circle(Vec3::new(9.0, 0.0, -10.0), 1.0)));
        // Behind the near plane.
        assert!(!base.view_frustum_culling_test(&Shape::circle(Vec3::new(0.0, 0.0, 5.0), 1.0)));
    }

    #[test]
    fn box_rejected_only_when_all_corners_behind_one_plane() {
        let base = culling_base();
        let outside = Shape::aabb(Vec3::new(9.0, -1.0, -11.0), Vec3::new(10.0, 1.0, -9.0));
        let straddling = Shape::aabb(Vec3::new(7.0, -1.0, -11.0), Vec3::new(9.0, 1.0, -9.0));
        let touching = Shape::aabb(Vec3::new(8.0, -1.0, -11.0), Vec3::new(10.0, 1.0, -9.0));

        assert!(!base.view_frustum_culling_test(&outside));
        assert!(base.view_frustum_culling_test(&straddling));
        assert!(base.view_frustum_culling_test(&touching));
    }

    #[test]
    fn circle_radius_follows_shape_scale() {
        let base = culling_base();
        let transform = Mat4::from_translation(Vec3::new(10.0, 0.0, -10.0));
        let small = Shape::circle(Vec3::ZERO, 1.0).with_transform(transform);
        let scaled = Shape::circle(Vec3::ZERO, 1.0)
            .with_transform(transform * Mat4::from_scale(Vec3::splat(3.0)));

        assert!(!base.view_frustum_culling_test(&small));
        assert!(base.view_frustum_culling_test(&scaled));
    }

    #[test]
    fn distance_bounds_are_inclusive() {
        let mut base = RenderPassBase::new("test");
        base.set_distance_culling_param(true, Vec3::ZERO, 2.0, 10.0);
        let at = |x: f32| Shape::circle(Vec3::new(x, 0.0, 0.0), 0.1);

        assert!(base.distance_culling_test(&at(2.0)));
        assert!(base.distance_culling_test(&at(10.0)));
        assert!(!base.distance_culling_test(&at(2.0 - 1e-3)));
        assert!(!base.distance_culling_test(&at(10.0 + 1e-3)));
    }

    #[test]
    fn cull_records_flag_and_stats() {
        let mut base = culling_base();
        let mut visible = Shape::circle(Vec3::new(0.0, 0.0, -10.0), 1.0);
        let mut hidden = Shape::circle(Vec3::new(50.0, 0.0, -10.0), 1.0);

        assert!(base.cull(&mut visible));
        assert!(!base.cull(&mut hidden));
        assert!(!visible.is_culled());
        assert!(hidden.is_culled());
        assert_eq!(base.stats(), CullingStats { tested: 2, culled: 1 });
    }

    #[test]
    fn camera_update_keeps_flags_and_range() {
        let mut base = RenderPassBase::new("test");
        base.set_distance_culling_param(true, Vec3::ZERO, 1.0, 50.0);
        let camera = Camera::default();

        base.update_culling_from_camera(&camera);

        assert!(!base.vf_culling_param().enabled);
        assert_eq!(base.vf_culling_param().world_to_view, camera.view());
        let distance = base.distance_culling_param();
        assert!(distance.enabled);
        assert_eq!(distance.center, camera.position());
        assert_eq!((distance.near, distance.far), (1.0, 50.0));
    }
}
