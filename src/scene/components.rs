// scene/components.rs
// Plain hecs components.

use glam::{Vec2, Vec4};

use super::shape::Shape;
use crate::asset::ResourceHandle;
use crate::renderer::Texture;

/// Textured or flat-colored quad drawn by the sprite pass.
#[derive(Debug, Clone)]
pub struct Sprite {
    pub color: Vec4,
    pub texture: Option<ResourceHandle<Texture>>,
    pub tex_coords: Option<[Vec2; 4]>,
}

impl Sprite {
    pub fn colored(color: Vec4) -> Self {
        Self {
            color,
            texture: None,
            tex_coords: None,
        }
    }

    pub fn textured(texture: ResourceHandle<Texture>) -> Self {
        Self {
            color: Vec4::ONE,
            texture: Some(texture),
            tex_coords: None,
        }
    }

    pub fn with_color(mut self, color: Vec4) -> Self {
        self.color = color;
        self
    }
}

/// Culling volume of a drawable entity.
#[derive(Debug, Clone, Copy)]
pub struct Renderable(pub Shape);

/// Constant rotation in radians per second.
#[derive(Debug, Clone, Copy)]
pub struct Spin(pub f32);

/// Constant velocity in world units per second.
#[derive(Debug, Clone, Copy)]
pub struct Velocity(pub Vec2);

#[derive(Debug, Clone)]
pub struct Name(pub String);

impl Name {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}
