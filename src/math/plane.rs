use glam::{Vec3, Vec4};

/// Plane in Hessian normal form: points with `normal.dot(p) + d >= 0` are on the
/// positive (inside) side.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Plane {
    pub normal: Vec3,
    pub d: f32,
}

impl Plane {
    /// A plane every point lies in front of. Used for disabled frustum sides.
    pub const EVERYTHING: Self = Self {
        normal: Vec3::ZERO,
        d: f32::MAX,
    };

    pub fn new(normal: Vec3, d: f32) -> Self {
        Self { normal, d }
    }

    /// Build from raw `(a, b, c, d)` coefficients, normalizing so that
    /// `signed_distance` returns true distances.
    pub fn from_coefficients(coefficients: Vec4) -> Self {
        let normal = coefficients.truncate();
        let length = normal.length();
        if length <= f32::EPSILON {
            return Self::new(normal, coefficients.w);
        }
        Self::new(normal / length, coefficients.w / length)
    }

    pub fn signed_distance(&self, point: Vec3) -> f32 {
        self.normal.dot(point) + self.d
    }

    /// Point on the plane or on its positive side.
    pub fn is_in_front(&self, point: Vec3) -> bool {
        self.signed_distance(point) >= 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coefficients_are_normalized() {
        let plane = Plane::from_coefficients(Vec4::new(0.0, 2.0, 0.0, 4.0));
        assert_eq!(plane.normal, Vec3::Y);
        assert_eq!(plane.d, 2.0);
        assert_eq!(plane.signed_distance(Vec3::new(0.0, -2.0, 0.0)), 0.0);
    }

    #[test]
    fn everything_plane_contains_far_points() {
        assert!(Plane::EVERYTHING.is_in_front(Vec3::splat(-1.0e30)));
    }
}
