// math/mod.rs
// Quad transform composition and culling geometry on top of glam.

pub mod frustum;
pub mod plane;

pub use frustum::{Frustum, FrustumSide};
pub use plane::Plane;

use glam::{Mat4, Vec2, Vec3};

/// Unit quad centered at the origin, counter-clockwise from the bottom-left corner.
pub const UNIT_QUAD: [Vec3; 4] = [
    Vec3::new(-0.5, -0.5, 0.0),
    Vec3::new(0.5, -0.5, 0.0),
    Vec3::new(0.5, 0.5, 0.0),
    Vec3::new(-0.5, 0.5, 0.0),
];

/// Texture coordinates matching [`UNIT_QUAD`].
pub const QUAD_TEX_COORDS: [Vec2; 4] = [
    Vec2::new(0.0, 0.0),
    Vec2::new(1.0, 0.0),
    Vec2::new(1.0, 1.0),
    Vec2::new(0.0, 1.0),
];

/// translate(position) * rotate_z(rotation) * scale(x, y, 1)
pub fn quad_transform(position: Vec3, scale: Vec2, rotation: f32) -> Mat4 {
    Mat4::from_translation(position)
        * Mat4::from_rotation_z(rotation)
        * Mat4::from_scale(scale.extend(1.0))
}

/// Largest scale factor along the three basis axes of `m`.
pub fn max_axis_scale(m: &Mat4) -> f32 {
    m.x_axis
        .truncate()
        .length()
        .max(m.y_axis.truncate().length())
        .max(m.z_axis.truncate().length())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn quad_transform_scales_before_rotating() {
        let m = quad_transform(Vec3::new(10.0, 0.0, 0.0), Vec2::new(2.0, 1.0), FRAC_PI_2);
        // (0.5, 0) -> scaled (1, 0) -> rotated (0, 1) -> translated (10, 1)
        let p = m.transform_point3(Vec3::new(0.5, 0.0, 0.0));
        assert!(p.abs_diff_eq(Vec3::new(10.0, 1.0, 0.0), 1e-5), "got {p:?}");
    }

    #[test]
    fn quad_transform_keeps_z_scale() {
        let m = quad_transform(Vec3::ZERO, Vec2::splat(4.0), 0.0);
        let p = m.transform_point3(Vec3::new(0.0, 0.0, 1.0));
        assert_eq!(p, Vec3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn max_axis_scale_picks_largest_axis() {
        let m = Mat4::from_scale(Vec3::new(1.0, 3.0, 2.0));
        assert_eq!(max_axis_scale(&m), 3.0);
    }
}
