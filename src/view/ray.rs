//! Rays for picking and occlusion tests

use super::math::Vec3;

/// A 3D ray with origin and direction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,  // Normalized
}

impl Ray {
    /// Create a new ray, normalizing the direction
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize()
        }
    }

    /// Get point at distance t along ray
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Parameter of the point on the ray closest to `p` (may be negative)
    pub fn closest_t(&self, p: Vec3) -> f32 {
        (p - self.origin).dot(self.direction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ray_at() {
        let ray = Ray::new(
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(2.0, 0.0, 0.0),
        );
        let p = ray.at(5.0);
        assert!((p.x - 5.0).abs() < 0.001);
        assert!((p.y - 0.0).abs() < 0.001);
        assert!((p.z - 0.0).abs() < 0.001);
    }

    #[test]
    fn test_closest_t() {
        let ray = Ray::new(Vec3::new(0.0, 0.0, 10.0), Vec3::new(0.0, 0.0, -1.0));
        let t = ray.closest_t(Vec3::new(3.0, 1.0, 4.0));
        assert!((t - 6.0).abs() < 0.001);
    }
}
