// scene/mod.rs

pub mod builder;
pub mod camera;
pub mod components;
pub mod particles;
pub mod scene;
pub mod shape;
pub mod transform;

pub use builder::EntityBuilder;
pub use camera::{Camera, Projection};
pub use components::{Name, Renderable, Spin, Sprite, Velocity};
pub use particles::{ParticleProps, ParticleSystem};
pub use scene::Scene;
pub use shape::{Bounds, Shape};
pub use transform::Transform2D;
