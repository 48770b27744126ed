use glam::{Mat4, Vec2, Vec3};

use crate::math::quad_transform;

/// Position, Z rotation in radians and XY scale of a 2D entity.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform2D {
    pub position: Vec3,
    pub rotation: f32,
    pub scale: Vec2,
}

impl Default for Transform2D {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: 0.0,
            scale: Vec2::ONE,
        }
    }
}

impl Transform2D {
    pub fn new(position: Vec3, scale: Vec2) -> Self {
        Self {
            position,
            scale,
            ..Self::default()
        }
    }

    pub fn with_rotation(mut self, radians: f32) -> Self {
        self.rotation = radians;
        self
    }

    pub fn matrix(&self) -> Mat4 {
        quad_transform(self.position, self.scale, self.rotation)
    }
}
