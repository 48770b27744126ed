// scene/scene.rs

use glam::Vec2;
use hecs::World;

use super::builder::EntityBuilder;
use super::components::{Renderable, Spin, Velocity};
use super::particles::ParticleSystem;
use super::transform::Transform2D;
use super::Camera;

pub struct Scene {
    pub world: World,
    camera: Camera,
    time: f64,
}

impl Scene {
    pub fn new(camera: Camera) -> Self {
        Self {
            world: World::new(),
            camera,
            time: 0.0,
        }
    }

    pub fn spawn(&mut self) -> EntityBuilder<'_> {
        EntityBuilder::new(&mut self.world)
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    pub fn set_camera(&mut self, camera: Camera) {
        self.camera = camera;
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn update(&mut self, dt: f64) {
        self.time += dt;
        let dt = dt as f32;

        self.system_spin(dt);
        self.system_velocity(dt);
        self.system_particles(dt);
        self.sync_shapes();
    }

    fn system_spin(&mut self, dt: f32) {
        for (_, (transform, spin)) in self.world.query_mut::<(&mut Transform2D, &Spin)>() {
            transform.rotation = (transform.rotation + spin.0 * dt).rem_euclid(std::f32::consts::TAU);
        }
    }

    fn system_velocity(&mut self, dt: f32) {
        for (_, (transform, velocity)) in self.world.query_mut::<(&mut Transform2D, &Velocity)>() {
            transform.position += (velocity.0 * dt).extend(0.0);
        }
    }

    fn system_particles(&mut self, dt: f32) {
        for (_, particles) in self.world.query_mut::<&mut ParticleSystem>() {
            particles.update(dt);
        }
    }

    /// Copy every entity's world transform into its culling shape.
    pub fn sync_shapes(&mut self) {
        for (_, (transform, renderable)) in self.world.query_mut::<(&Transform2D, &mut Renderable)>() {
            renderable.0.set_transform(transform.matrix());
        }
    }

    /// Renderable entities currently marked culled.
    pub fn culled_count(&self) -> usize {
        self.world
            .query::<&Renderable>()
            .iter()
            .filter(|(_, r)| r.0.is_culled())
            .count()
    }

    pub fn emit_particles(&mut self, entity: hecs::Entity, count: usize, props: &super::ParticleProps) -> bool {
        let origin = match self.world.get::<&Transform2D>(entity) {
            Ok(transform) => Vec2::new(transform.position.x, transform.position.y),
            Err(_) => Vec2::ZERO,
        };
        match self.world.get::<&mut ParticleSystem>(entity) {
            Ok(mut particles) => {
                for _ in 0..count {
                    particles.emit(origin, props);
                }
                true
            }
            Err(err) => {
                log::warn!("Cannot emit particles on {:?}: {}", entity, err);
                false
            }
        }
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new(Camera::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::ParticleProps;
    use glam::{Mat4, Vec3, Vec4};

    #[test]
    fn update_moves_spins_and_syncs_shapes() {
        let mut scene = Scene::default();
        let entity = scene
            .spawn()
            .with_transform(Transform2D::new(Vec3::ZERO, Vec2::ONE))
            .with_color(Vec4::ONE)
            .with_velocity(Vec2::new(2.0, 0.0))
            .with_spin(1.0)
            .spawn();

        scene.update(0.5);

        let transform = *scene.world.get::<&Transform2D>(entity).unwrap();
        assert_eq!(transform.position, Vec3::new(1.0, 0.0, 0.0));
        assert!((transform.rotation - 0.5).abs() < 1e-6);

        let shape = scene.world.get::<&Renderable>(entity).unwrap().0;
        assert!(shape.transform().abs_diff_eq(transform.matrix(), 1e-6));
        assert_ne!(shape.transform(), Mat4::IDENTITY);
    }

    #[test]
    fn emit_particles_requires_a_particle_system() {
        let mut scene = Scene::default();
        let plain = scene.spawn().with_transform(Transform2D::default()).spawn();
        let emitter = scene
            .spawn()
            .with_transform(Transform2D::default())
            .with_particles(ParticleSystem::new(16, 9))
            .spawn();

        assert!(!scene.emit_particles(plain, 4, &ParticleProps::default()));
        assert!(scene.emit_particles(emitter, 4, &ParticleProps::default()));
        assert_eq!(scene.world.get::<&ParticleSystem>(emitter).unwrap().alive(), 4);
    }
}
