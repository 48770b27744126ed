// scene/builder.rs
// Fluent helper for spawning sprite entities into a hecs world.

use glam::{Vec2, Vec4};
use hecs::World;

use super::components::*;
use super::particles::ParticleSystem;
use super::shape::Shape;
use super::transform::Transform2D;

pub struct EntityBuilder<'w> {
    world: &'w mut World,
    builder: hecs::EntityBuilder,
    shape: Option<Shape>,
}

impl<'w> EntityBuilder<'w> {
    pub fn new(world: &'w mut World) -> Self {
        Self {
            world,
            builder: hecs::EntityBuilder::new(),
            shape: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.builder.add(Name::new(name));
        self
    }

    pub fn with_transform(mut self, transform: Transform2D) -> Self {
        self.builder.add(transform);
        self
    }

    /// Adds the sprite and, unless another shape was given, a unit-quad
    /// culling shape.
    pub fn with_sprite(mut self, sprite: Sprite) -> Self {
        self.builder.add(sprite);
        self.shape.get_or_insert_with(Shape::unit_quad);
        self
    }

    pub fn with_color(self, color: Vec4) -> Self {
        self.with_sprite(Sprite::colored(color))
    }

    pub fn with_shape(mut self, shape: Shape) -> Self {
        self.shape = Some(shape);
        self
    }

    pub fn with_spin(mut self, radians_per_second: f32) -> Self {
        self.builder.add(Spin(radians_per_second));
        self
    }

    pub fn with_velocity(mut self, velocity: Vec2) -> Self {
        self.builder.add(Velocity(velocity));
        self
    }

    pub fn with_particles(mut self, particles: ParticleSystem) -> Self {
        self.builder.add(particles);
        self
    }

    /// Spawn the entity. The shape's owner is set to the new entity.
    pub fn spawn(mut self) -> hecs::Entity {
        let entity = self.world.reserve_entity();
        if let Some(shape) = self.shape.take() {
            self.builder.add(Renderable(shape.with_owner(entity)));
        }
        self.world.spawn_at(entity, self.builder.build());
        entity
    }
}
