// scene/shape.rs
// Bounding volumes attached to renderable entities.

use glam::{Mat4, Quat, Vec3};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Bounds {
    Circle { center: Vec3, radius: f32 },
    Aabb { min: Vec3, max: Vec3 },
    Oobb { center: Vec3, half_extents: Vec3, orientation: Quat },
}

/// Object-space bounds plus the object-to-world transform they were last
/// synced with and the result of the last culling test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shape {
    bounds: Bounds,
    owner: Option<hecs::Entity>,
    transform: Mat4,
    culled: bool,
}

impl Shape {
    fn from_bounds(bounds: Bounds) -> Self {
        Self {
            bounds,
            owner: None,
            transform: Mat4::IDENTITY,
            culled: false,
        }
    }

    pub fn circle(center: Vec3, radius: f32) -> Self {
        Self::from_bounds(Bounds::Circle {
            center,
            radius: radius.abs(),
        })
    }

    /// Corners may be given in any order.
    pub fn aabb(a: Vec3, b: Vec3) -> Self {
        Self::from_bounds(Bounds::Aabb {
            min: a.min(b),
            max: a.max(b),
        })
    }

    pub fn oobb(center: Vec3, half_extents: Vec3, orientation: Quat) -> Self {
        Self::from_bounds(Bounds::Oobb {
            center,
            half_extents: half_extents.abs(),
            orientation,
        })
    }

    /// Flat box matching the batch renderer's unit quad.
    pub fn unit_quad() -> Self {
        Self::aabb(Vec3::new(-0.5, -0.5, 0.0), Vec3::new(0.5, 0.5, 0.0))
    }

    pub fn with_owner(mut self, owner: hecs::Entity) -> Self {
        self.owner = Some(owner);
        self
    }

    pub fn with_transform(mut self, transform: Mat4) -> Self {
        self.transform = transform;
        self
    }

    pub fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    pub fn owner(&self) -> Option<hecs::Entity> {
        self.owner
    }

    pub fn set_owner(&mut self, owner: hecs::Entity) {
        self.owner = Some(owner);
    }

    pub fn transform(&self) -> Mat4 {
        self.transform
    }

    pub fn set_transform(&mut self, transform: Mat4) {
        self.transform = transform;
    }

    pub fn is_culled(&self) -> bool {
        self.culled
    }

    pub fn set_culled(&mut self, culled: bool) {
        self.culled = culled;
    }

    pub fn local_center(&self) -> Vec3 {
        match self.bounds {
            Bounds::Circle { center, .. } | Bounds::Oobb { center, .. } => center,
            Bounds::Aabb { min, max } => (min + max) * 0.5,
        }
    }

    pub fn world_center(&self) -> Vec3 {
        self.transform.transform_point3(self.local_center())
    }

    /// The eight object-space box corners. `None` for circles.
    pub fn corners(&self) -> Option<[Vec3; 8]> {
        let (center, half, orientation) = match self.bounds {
            Bounds::Circle { .. } => return None,
            Bounds::Aabb { min, max } => ((min + max) * 0.5, (max - min) * 0.5, Quat::IDENTITY),
            Bounds::Oobb {
                center,
                half_extents,
                orientation,
            } => (center, half_extents, orientation),
        };

        let mut corners = [Vec3::ZERO; 8];
        for (i, corner) in corners.iter_mut().enumerate() {
            let sign = Vec3::new(
                if i & 1 == 0 { -1.0 } else { 1.0 },
                if i & 2 == 0 { -1.0 } else { 1.0 },
                if i & 4 == 0 { -1.0 } else { 1.0 },
            );
            *corner = center + orientation * (half * sign);
        }
        Some(corners)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_4;

    #[test]
    fn aabb_corners_are_normalized() {
        let shape = Shape::aabb(Vec3::new(1.0, -1.0, 2.0), Vec3::new(-1.0, 1.0, 0.0));
        assert_eq!(
            shape.bounds(),
            &Bounds::Aabb {
                min: Vec3::new(-1.0, -1.0, 0.0),
                max: Vec3::new(1.0, 1.0, 2.0),
            }
        );
    }

    #[test]
    fn world_center_follows_transform() {
        let shape = Shape::circle(Vec3::new(1.0, 0.0, 0.0), 0.5)
            .with_transform(Mat4::from_translation(Vec3::new(0.0, 3.0, 0.0)));
        assert_eq!(shape.world_center(), Vec3::new(1.0, 3.0, 0.0));
    }

    #[test]
    fn oobb_corners_are_rotated() {
        let shape = Shape::oobb(Vec3::ZERO, Vec3::new(1.0, 1.0, 0.0), Quat::from_rotation_z(FRAC_PI_4));
        let corners = shape.corners().unwrap();
        let max_x = corners.iter().map(|c| c.x).fold(f32::MIN, f32::max);
        assert!((max_x - 2f32.sqrt()).abs() < 1e-5);
    }

    #[test]
    fn circle_has_no_corners() {
        assert!(Shape::circle(Vec3::ZERO, 1.0).corners().is_none());
    }
}
