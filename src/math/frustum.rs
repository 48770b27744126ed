// math/frustum.rs
// Gribb/Hartmann plane extraction for wgpu-style clip space (depth in [0, 1]).

use glam::{Mat4, Vec3};

use super::Plane;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrustumSide {
    Left = 0,
    Right = 1,
    Bottom = 2,
    Top = 3,
    Near = 4,
    Far = 5,
}

impl FrustumSide {
    pub const ALL: [Self; 6] = [
        Self::Left,
        Self::Right,
        Self::Bottom,
        Self::Top,
        Self::Near,
        Self::Far,
    ];
}

/// Six inward-facing planes. The space the planes live in is the input space of
/// the matrix they were extracted from: a projection matrix yields view-space
/// planes, a view-projection matrix yields world-space planes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Frustum {
    pub planes: [Plane; 6],
}

impl Default for Frustum {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl Frustum {
    /// A frustum that contains everything.
    pub const fn unbounded() -> Self {
        Self {
            planes: [Plane::EVERYTHING; 6],
        }
    }

    pub fn from_planes(planes: [Plane; 6]) -> Self {
        Self { planes }
    }

    /// Planes in view space, from a projection matrix.
    pub fn from_projection(projection: Mat4) -> Self {
        Self::from_clip_matrix(projection)
    }

    /// Planes in world space, from a combined view-projection matrix.
    pub fn from_view_projection(view_proj: Mat4) -> Self {
        Self::from_clip_matrix(view_proj)
    }

    fn from_clip_matrix(m: Mat4) -> Self {
        let r0 = m.row(0);
        let r1 = m.row(1);
        let r2 = m.row(2);
        let r3 = m.row(3);

        Self {
            planes: [
                Plane::from_coefficients(r3 + r0),
                Plane::from_coefficients(r3 - r0),
                Plane::from_coefficients(r3 + r1),
                Plane::from_coefficients(r3 - r1),
                // 0 <= z_clip
                Plane::from_coefficients(r2),
                // z_clip <= w_clip
                Plane::from_coefficients(r3 - r2),
            ],
        }
    }

    pub fn plane(&self, side: FrustumSide) -> &Plane {
        &self.planes[side as usize]
    }

    pub fn contains_point(&self, point: Vec3) -> bool {
        self.planes.iter().all(|plane| plane.is_in_front(point))
    }

    /// False only when the sphere lies entirely behind at least one plane.
    /// Touching a plane counts as intersecting.
    pub fn intersects_sphere(&self, center: Vec3, radius: f32) -> bool {
        self.planes
            .iter()
            .all(|plane| plane.signed_distance(center) >= -radius)
    }

    /// False only when every point lies behind the same plane.
    pub fn intersects_points(&self, points: &[Vec3]) -> bool {
        if points.is_empty() {
            return false;
        }
        self.planes
            .iter()
            .all(|plane| points.iter().any(|&p| plane.is_in_front(p)))
    }

    /// Axis-aligned box test using the positive vertex per plane.
    pub fn intersects_aabb(&self, min: Vec3, max: Vec3) -> bool {
        self.planes.iter().all(|plane| {
            let positive = Vec3::new(
                if plane.normal.x >= 0.0 { max.x } else { min.x },
                if plane.normal.y >= 0.0 { max.y } else { min.y },
                if plane.normal.z >= 0.0 { max.z } else { min.z },
            );
            plane.is_in_front(positive)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Chosen so every plane coefficient is exactly representable.
    fn ortho() -> Frustum {
        Frustum::from_projection(Mat4::orthographic_rh(-8.0, 8.0, -8.0, 8.0, 1.0, 65.0))
    }

    #[test]
    fn orthographic_planes_match_box_bounds() {
        let frustum = ortho();
        assert_eq!(frustum.plane(FrustumSide::Right).signed_distance(Vec3::new(8.0, 0.0, -2.0)), 0.0);
        assert_eq!(frustum.plane(FrustumSide::Left).signed_distance(Vec3::new(-8.0, 0.0, -2.0)), 0.0);
        assert_eq!(frustum.plane(FrustumSide::Near).signed_distance(Vec3::new(0.0, 0.0, -1.0)), 0.0);
        assert_eq!(frustum.plane(FrustumSide::Far).signed_distance(Vec3::new(0.0, 0.0, -65.0)), 0.0);
    }

    #[test]
    fn point_containment() {
        let frustum = ortho();
        assert!(frustum.contains_point(Vec3::new(0.0, 0.0, -10.0)));
        assert!(!frustum.contains_point(Vec3::new(0.0, 0.0, 5.0)));
        assert!(!frustum.contains_point(Vec3::new(9.0, 0.0, -10.0)));
    }

    #[test]
    fn sphere_touching_plane_is_inside() {
        let frustum = ortho();
        assert!(frustum.intersects_sphere(Vec3::new(8.5, 0.0, -10.0), 0.5));
        assert!(!frustum.intersects_sphere(Vec3::new(8.5, 0.0, -10.0), 0.25));
    }

    #[test]
    fn perspective_frustum_sees_forward_not_behind() {
        let proj = Mat4::perspective_rh(60f32.to_radians(), 1.0, 0.1, 100.0);
        let frustum = Frustum::from_projection(proj);
        assert!(frustum.contains_point(Vec3::new(0.0, 0.0, -5.0)));
        assert!(!frustum.contains_point(Vec3::new(0.0, 0.0, 5.0)));
        assert!(!frustum.contains_point(Vec3::new(0.0, 0.0, -200.0)));
    }

    #[test]
    fn world_space_planes_follow_camera() {
        let view = Mat4::look_at_rh(Vec3::new(100.0, 0.0, 10.0), Vec3::new(100.0, 0.0, 0.0), Vec3::Y);
        let proj = Mat4::orthographic_rh(-8.0, 8.0, -8.0, 8.0, 1.0, 65.0);
        let frustum = Frustum::from_view_projection(proj * view);
        assert!(frustum.contains_point(Vec3::new(100.0, 0.0, 0.0)));
        assert!(!frustum.contains_point(Vec3::ZERO));
    }

    #[test]
    fn aabb_and_point_tests_agree_on_straddling_box() {
        let frustum = ortho();
        let min = Vec3::new(7.0, -1.0, -11.0);
        let max = Vec3::new(9.0, 1.0, -9.0);
        assert!(frustum.intersects_aabb(min, max));
        assert!(frustum.intersects_points(&[min, max]));
        assert!(!frustum.intersects_aabb(min + Vec3::X * 5.0, max + Vec3::X * 5.0));
    }

    #[test]
    fn unbounded_contains_everything() {
        let frustum = Frustum::unbounded();
        assert!(frustum.intersects_sphere(Vec3::splat(1.0e6), 0.0));
        assert!(frustum.intersects_points(&[Vec3::splat(-1.0e6)]));
    }
}
