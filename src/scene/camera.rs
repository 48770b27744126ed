use glam::{Mat4, Vec2, Vec3};

use crate::math::Frustum;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Projection {
    /// `height` world units fit vertically on screen.
    Orthographic { height: f32 },
    Perspective { fov_y_radians: f32 },
}

#[derive(Clone, Copy, Debug)]
pub struct Camera {
    pub eye: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub projection: Projection,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Camera {
    /// Looks down -Z at `center`, sprites at z = 0 sit mid-range.
    pub fn orthographic_2d(center: Vec2, height: f32, aspect: f32) -> Self {
        Self {
            eye: center.extend(10.0),
            target: center.extend(0.0),
            up: Vec3::Y,
            projection: Projection::Orthographic { height },
            aspect,
            near: 0.1,
            far: 100.0,
        }
    }

    pub fn perspective(eye: Vec3, target: Vec3, fov_y_radians: f32, aspect: f32) -> Self {
        Self {
            eye,
            target,
            up: Vec3::Y,
            projection: Projection::Perspective { fov_y_radians },
            aspect,
            near: 0.1,
            far: 100.0,
        }
    }

    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye, self.target, self.up)
    }

    pub fn proj(&self) -> Mat4 {
        match self.projection {
            Projection::Orthographic { height } => {
                let half_h = height * 0.5;
                let half_w = half_h * self.aspect;
                Mat4::orthographic_rh(-half_w, half_w, -half_h, half_h, self.near, self.far)
            }
            Projection::Perspective { fov_y_radians } => {
                Mat4::perspective_rh(fov_y_radians, self.aspect, self.near, self.far)
            }
        }
    }

    pub fn view_proj(&self) -> Mat4 {
        self.proj() * self.view()
    }

    pub fn position(&self) -> Vec3 {
        self.eye
    }

    pub fn set_aspect(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.aspect = width as f32 / height as f32;
        }
    }

    /// Pans eye and target together.
    pub fn translate(&mut self, delta: Vec3) {
        self.eye += delta;
        self.target += delta;
    }

    /// World-space frustum.
    pub fn frustum(&self) -> Frustum {
        Frustum::from_view_projection(self.view_proj())
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::orthographic_2d(Vec2::ZERO, 20.0, 16.0 / 9.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_proj_is_reasonable() {
        let cam = Camera::perspective(Vec3::new(0.0, 0.0, 3.0), Vec3::ZERO, 60f32.to_radians(), 16.0 / 9.0);
        let vp = cam.view_proj();
        let id = vp * vp.inverse();
        assert!(id.abs_diff_eq(Mat4::IDENTITY, 1e-4));
    }

    #[test]
    fn orthographic_maps_visible_height_to_clip_range() {
        let cam = Camera::orthographic_2d(Vec2::new(5.0, 0.0), 10.0, 2.0);
        let vp = cam.view_proj();

        let top_right = vp.project_point3(Vec3::new(15.0, 5.0, 0.0));
        assert!(top_right.truncate().abs_diff_eq(Vec2::ONE, 1e-5));
    }

    #[test]
    fn world_frustum_contains_target() {
        let cam = Camera::default();
        let frustum = cam.frustum();
        assert!(frustum.contains_point(cam.target));
        assert!(!frustum.contains_point(Vec3::new(1000.0, 0.0, 0.0)));
    }
}
