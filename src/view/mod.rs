//! Viewport math: vectors, matrices, rays and the orbit camera
//!
//! - `math` - Vec3, Vec2, Aabb, Mat4 helpers, ray/triangle intersection
//! - `ray` - Ray type
//! - `camera` - Orbit camera with perspective and orthographic projection

pub mod camera;
pub mod math;
pub mod ray;

pub use camera::{Camera, Projection};
pub use math::{
    Aabb, Mat4, Vec2, Vec3,
    mat4_identity, mat4_translation, mat4_rotation, mat4_scale,
    mat4_mul, mat4_transform_point, mat4_get_translation,
    mat4_from_position_rotation_scale,
    ray_triangle_intersect,
};
pub use ray::Ray;
