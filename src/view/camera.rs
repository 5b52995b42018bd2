//! Orbit camera for the host viewport
//!
//! Provides camera positioning and orientation plus the forward and inverse
//! projections the snap engine needs from a viewport. Screen space is pixels,
//! origin top-left, y growing downward.

use super::math::{Mat4, Vec2, Vec3};
use super::ray::Ray;

/// Projection mode
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Projection {
    Perspective,
    /// Parallel projection framing the same height as the perspective view
    /// would at the orbit target
    Orthographic,
}

/// Camera state for 3D viewports
#[derive(Clone, Debug)]
pub struct Camera {
    pub target: Vec3,
    pub distance: f32,
    pub yaw: f32,   // radians, 0 looks down -Z
    pub pitch: f32, // radians, positive looks down
    pub fov_y: f32, // radians
    pub near: f32,
    pub projection: Projection,
    pub width: f32,
    pub height: f32,

    // Computed from the orbit parameters
    pub position: Vec3,
    pub basis_x: Vec3, // Right
    pub basis_y: Vec3, // Up
    pub basis_z: Vec3, // Forward (into the scene)
}

impl Camera {
    pub fn new(width: f32, height: f32) -> Self {
        let mut cam = Self {
            target: Vec3::ZERO,
            distance: 10.0,
            yaw: 0.0,
            pitch: 0.0,
            fov_y: 50.0f32.to_radians(),
            near: 0.1,
            projection: Projection::Perspective,
            width,
            height,
            position: Vec3::ZERO,
            basis_x: Vec3::X,
            basis_y: Vec3::Y,
            basis_z: -Vec3::Z,
        };
        cam.update_basis();
        cam
    }

    /// Camera looking straight down -Z at `target` from `distance`
    pub fn looking_at(target: Vec3, distance: f32, width: f32, height: f32) -> Self {
        let mut cam = Self::new(width, height);
        cam.target = target;
        cam.distance = distance;
        cam.update_basis();
        cam
    }

    pub fn update_basis(&mut self) {
        let upward = Vec3::Y;

        self.basis_z = Vec3 {
            x: self.pitch.cos() * self.yaw.sin(),
            y: -self.pitch.sin(),
            z: -self.pitch.cos() * self.yaw.cos(),
        };

        // Right vector
        self.basis_x = self.basis_z.cross(upward).normalize();

        // Up vector
        self.basis_y = self.basis_x.cross(self.basis_z);

        self.position = self.target - self.basis_z * self.distance;
    }

    pub fn rotate(&mut self, d_yaw: f32, d_pitch: f32) {
        self.yaw += d_yaw;
        self.pitch = (self.pitch + d_pitch).clamp(
            -std::f32::consts::FRAC_PI_2 + 0.01,
            std::f32::consts::FRAC_PI_2 - 0.01,
        );
        self.update_basis();
    }

    pub fn zoom(&mut self, factor: f32) {
        self.distance = (self.distance * factor).clamp(0.5, 500.0);
        self.update_basis();
    }

    pub fn set_viewport(&mut self, width: f32, height: f32) {
        self.width = width;
        self.height = height;
    }

    /// Pixels per world unit at unit depth (perspective) or everywhere (ortho)
    fn focal(&self) -> f32 {
        let half_h = self.height / 2.0;
        match self.projection {
            Projection::Perspective => half_h / (self.fov_y / 2.0).tan(),
            Projection::Orthographic => half_h / (self.distance * (self.fov_y / 2.0).tan()),
        }
    }

    /// World to view space: x right, y up, z depth in front of the camera
    pub fn to_view(&self, world_pos: Vec3) -> Vec3 {
        let rel = world_pos - self.position;
        Vec3::new(rel.dot(self.basis_x), rel.dot(self.basis_y), rel.dot(self.basis_z))
    }

    /// Project a world-space point to screen coordinates.
    /// Returns None for points behind the near plane in perspective mode.
    pub fn world_to_screen(&self, world_pos: Vec3) -> Option<Vec2> {
        self.world_to_screen_with_depth(world_pos).map(|(p, _)| p)
    }

    /// Project a world-space point to screen coordinates with view depth
    pub fn world_to_screen_with_depth(&self, world_pos: Vec3) -> Option<(Vec2, f32)> {
        let v = self.to_view(world_pos);
        let f = self.focal();
        let (cx, cy) = (self.width / 2.0, self.height / 2.0);

        match self.projection {
            Projection::Perspective => {
                // Behind camera
                if v.z <= self.near {
                    return None;
                }
                Some((Vec2::new(cx + f * v.x / v.z, cy - f * v.y / v.z), v.z))
            }
            Projection::Orthographic => Some((Vec2::new(cx + f * v.x, cy - f * v.y), v.z)),
        }
    }

    /// Generate a ray from screen coordinates through the camera.
    ///
    /// The origin lies on the near plane under the pixel, so distinct pixels
    /// give distinct origins in both projection modes.
    pub fn screen_to_ray(&self, screen: Vec2) -> Ray {
        let f = self.focal();
        let nx = (screen.x - self.width / 2.0) / f;
        let ny = (self.height / 2.0 - screen.y) / f;

        match self.projection {
            Projection::Perspective => {
                let d = self.basis_x * nx + self.basis_y * ny + self.basis_z;
                Ray::new(self.position + d * self.near, d)
            }
            Projection::Orthographic => {
                let origin = self.position
                    + self.basis_x * nx
                    + self.basis_y * ny
                    + self.basis_z * self.near;
                Ray::new(origin, self.basis_z)
            }
        }
    }

    /// World to view matrix (rows are the camera axes)
    pub fn view_matrix(&self) -> Mat4 {
        let p = self.position;
        let (x, y, z) = (self.basis_x, self.basis_y, self.basis_z);
        [
            [x.x, x.y, x.z, -x.dot(p)],
            [y.x, y.y, y.z, -y.dot(p)],
            [z.x, z.y, z.z, -z.dot(p)],
            [0.0, 0.0, 0.0, 1.0],
        ]
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(800.0, 600.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::math::mat4_transform_point;

    #[test]
    fn test_screen_to_ray_roundtrip() {
        let mut camera = Camera::looking_at(Vec3::ZERO, 20.0, 640.0, 480.0);
        camera.rotate(0.4, 0.3);

        let world_point = Vec3::new(1.5, -0.5, 2.0);
        let screen = camera.world_to_screen(world_point).expect("point should be visible");
        let ray = camera.screen_to_ray(screen);

        let closest = ray.at(ray.closest_t(world_point));
        let distance = closest.distance(world_point);
        assert!(distance < 1e-3, "ray should pass through the point, got {}", distance);
    }

    #[test]
    fn test_screen_to_ray_center() {
        let camera = Camera::looking_at(Vec3::ZERO, 10.0, 640.0, 480.0);
        let ray = camera.screen_to_ray(Vec2::new(320.0, 240.0));
        let dot = ray.direction.dot(camera.basis_z);
        assert!(dot > 0.999, "center ray should be aligned with camera forward, got dot={}", dot);
        // Origin sits on the near plane
        assert!((camera.to_view(ray.origin).z - camera.near).abs() < 1e-4);
    }

    #[test]
    fn test_behind_camera_is_none() {
        let camera = Camera::looking_at(Vec3::ZERO, 10.0, 640.0, 480.0);
        assert!(camera.world_to_screen(Vec3::new(0.0, 0.0, 20.0)).is_none());
    }

    #[test]
    fn test_ortho_roundtrip() {
        let mut camera = Camera::looking_at(Vec3::ZERO, 10.0, 640.0, 480.0);
        camera.projection = Projection::Orthographic;
        let p = Vec3::new(2.0, 1.0, -3.0);
        let s = camera.world_to_screen(p).unwrap();
        let ray = camera.screen_to_ray(s);
        assert!(ray.at(ray.closest_t(p)).distance(p) < 1e-3);
        assert!(ray.direction.dot(camera.basis_z) > 0.9999);
    }

    #[test]
    fn test_view_matrix_matches_to_view() {
        let mut camera = Camera::looking_at(Vec3::new(1.0, 2.0, 3.0), 8.0, 640.0, 480.0);
        camera.rotate(-0.7, 0.2);
        let p = Vec3::new(-2.0, 0.5, 4.0);
        let a = mat4_transform_point(&camera.view_matrix(), p);
        let b = camera.to_view(p);
        assert!(a.distance(b) < 1e-4);
    }
}
