//! World/screen conversions for the active viewport
//!
//! - `ScreenKey` - floored pixel coordinate, the identity of a candidate
//! - `ScreenProjector` - stateless wrapper over a [`Viewport`]
//! - `VisibleRegion` - the inset region rectangle, recomputed on view change
//! - `RegionFootprint` - that rectangle moved out to an object's depth, for
//!   cheap "is this world point on screen" tests

use crate::host::Viewport;
use crate::view::{Mat4, Vec2, Vec3, mat4_mul, mat4_transform_point, mat4_translation};

/// Floored screen-pixel coordinate
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScreenKey {
    pub x: i32,
    pub y: i32,
}

impl ScreenKey {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn from_point(p: Vec2) -> Self {
        Self { x: p.x.floor() as i32, y: p.y.floor() as i32 }
    }

    pub fn to_point(self) -> Vec2 {
        Vec2::new(self.x as f32, self.y as f32)
    }
}

pub struct ScreenProjector<'a, V: Viewport + ?Sized> {
    viewport: &'a V,
}

impl<'a, V: Viewport + ?Sized> ScreenProjector<'a, V> {
    pub fn new(viewport: &'a V) -> Self {
        Self { viewport }
    }

    /// Project and floor to pixel granularity
    pub fn world_to_screen(&self, world: Vec3) -> Option<ScreenKey> {
        self.viewport.location_to_region(world).map(ScreenKey::from_point)
    }

    /// Unfloored projection
    pub fn world_to_point(&self, world: Vec3) -> Option<Vec2> {
        self.viewport.location_to_region(world)
    }

    /// Point on the near view plane under `screen`
    pub fn screen_to_world(&self, screen: Vec2) -> Vec3 {
        self.viewport.region_to_origin(screen)
    }

    /// View ray direction through `screen`
    pub fn screen_normal(&self, screen: Vec2) -> Vec3 {
        self.viewport.region_to_vector(screen).normalize()
    }

    /// View-aligned transform whose origin is the world point under `origin_screen`.
    ///
    /// x and y of a transformed point are its offsets from that point in the
    /// view plane, z its depth offset.
    pub fn screen_to_world_transform(&self, origin_screen: Vec2) -> Mat4 {
        self.view_aligned_at(self.screen_to_world(origin_screen))
    }

    fn view_aligned_at(&self, world_origin: Vec3) -> Mat4 {
        let view = self.viewport.view_matrix();
        let shifted = mat4_transform_point(&view, world_origin);
        mat4_mul(&mat4_translation(-shifted), &view)
    }
}

/// The region rectangle inset by a margin, as seen from the camera
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VisibleRegion {
    /// Inset rectangle in pixels
    pub min_px: Vec2,
    pub max_px: Vec2,
    /// Near-plane points under the two inset corners
    pub min_origin: Vec3,
    pub max_origin: Vec3,
    min_dir: Vec3,
    max_dir: Vec3,
    /// View direction through the region center
    pub view_dir: Vec3,
}

impl VisibleRegion {
    /// `None` when the viewport has no usable region
    pub fn compute<V: Viewport + ?Sized>(viewport: &V, margin: f32) -> Option<Self> {
        let (w, h) = viewport.region_size()?;
        let projector = ScreenProjector::new(viewport);
        // Keep the inset rectangle non-degenerate on tiny regions
        let mx = margin.min(w / 2.0);
        let my = margin.min(h / 2.0);
        let min_px = Vec2::new(mx, my);
        let max_px = Vec2::new(w - mx, h - my);

        Some(Self {
            min_px,
            max_px,
            min_origin: projector.screen_to_world(min_px),
            max_origin: projector.screen_to_world(max_px),
            min_dir: projector.screen_normal(min_px),
            max_dir: projector.screen_normal(max_px),
            view_dir: projector.screen_normal(Vec2::new(w / 2.0, h / 2.0)),
        })
    }

    /// Inclusive pixel containment
    pub fn contains_px(&self, p: Vec2) -> bool {
        p.x >= self.min_px.x && p.x <= self.max_px.x && p.y >= self.min_px.y && p.y <= self.max_px.y
    }

    /// Whether a pixel rectangle overlaps the inset rectangle
    pub fn intersects_px(&self, min: Vec2, max: Vec2) -> bool {
        !(min.x > self.max_px.x || min.y > self.max_px.y || max.x < self.min_px.x || max.y < self.min_px.y)
    }

    /// The inset rectangle pushed out to the depth of `anchor`.
    ///
    /// Each corner slides along its own view ray, so the footprint grows with
    /// depth under perspective and stays put under orthographic projection.
    pub fn footprint_at<V: Viewport + ?Sized>(&self, viewport: &V, anchor: Vec3) -> RegionFootprint {
        let depth = (anchor - self.min_origin).dot(self.view_dir).max(0.0);
        let slide = |origin: Vec3, dir: Vec3| {
            let along = dir.dot(self.view_dir);
            if along.abs() < 1e-6 {
                origin
            } else {
                origin + dir * (depth / along)
            }
        };
        let near_corner = slide(self.min_origin, self.min_dir);
        let far_corner = slide(self.max_origin, self.max_dir);

        let matrix = ScreenProjector::new(viewport).view_aligned_at(near_corner);
        let extent = mat4_transform_point(&matrix, far_corner);
        RegionFootprint {
            matrix,
            lo: Vec2::new(extent.x.min(0.0), extent.y.min(0.0)),
            hi: Vec2::new(extent.x.max(0.0), extent.y.max(0.0)),
        }
    }
}

/// View-aligned rectangle at one depth
#[derive(Clone, Copy, Debug)]
pub struct RegionFootprint {
    matrix: Mat4,
    lo: Vec2,
    hi: Vec2,
}

impl RegionFootprint {
    /// Whether `world` falls inside the rectangle when viewed head-on
    pub fn contains(&self, world: Vec3) -> bool {
        let p = mat4_transform_point(&self.matrix, world);
        p.x >= self.lo.x && p.x <= self.hi.x && p.y >= self.lo.y && p.y <= self.hi.y
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{MemoryScene, SceneDocument};
    use crate::view::{Camera, Projection};

    fn scene() -> MemoryScene {
        MemoryScene::new(SceneDocument::new(), Camera::looking_at(Vec3::ZERO, 10.0, 640.0, 480.0))
    }

    #[test]
    fn test_screen_key_floors() {
        assert_eq!(ScreenKey::from_point(Vec2::new(10.9, 3.2)), ScreenKey::new(10, 3));
        assert_eq!(ScreenKey::from_point(Vec2::new(-0.5, 0.0)), ScreenKey::new(-1, 0));
    }

    #[test]
    fn test_world_to_screen_center() {
        let scene = scene();
        let projector = ScreenProjector::new(&scene);
        assert_eq!(projector.world_to_screen(Vec3::ZERO), Some(ScreenKey::new(320, 240)));
    }

    #[test]
    fn test_screen_to_world_transform_origin() {
        let scene = scene();
        let projector = ScreenProjector::new(&scene);
        let m = projector.screen_to_world_transform(Vec2::new(100.0, 50.0));
        let origin = projector.screen_to_world(Vec2::new(100.0, 50.0));
        assert!(mat4_transform_point(&m, origin).len() < 1e-5);
        // One unit to the right in the view plane
        let right = mat4_transform_point(&m, origin + scene.camera.basis_x);
        assert!((right.x - 1.0).abs() < 1e-5 && right.y.abs() < 1e-5);
    }

    #[test]
    fn test_footprint_matches_projection() {
        let mut scene = scene();
        scene.camera.rotate(0.3, 0.2);
        let region = VisibleRegion::compute(&scene, 20.0).unwrap();
        let anchor = Vec3::new(0.5, 0.0, -1.0);
        let footprint = region.footprint_at(&scene, anchor);

        // Points at the anchor's depth agree with a real projection
        let (x, y, z) = (scene.camera.basis_x, scene.camera.basis_y, scene.camera.basis_z);
        let depth = (anchor - scene.camera.position).dot(z);
        for (dx, dy) in [(0.0, 0.0), (3.0, 1.0), (-4.0, 2.5), (6.0, 0.0), (0.0, -5.0)] {
            let p = scene.camera.position + z * depth + x * dx + y * dy;
            let on_screen = scene.camera.world_to_screen(p).map(|s| region.contains_px(s)).unwrap_or(false);
            assert_eq!(footprint.contains(p), on_screen, "offset ({}, {})", dx, dy);
        }
    }

    #[test]
    fn test_footprint_orthographic() {
        let mut scene = scene();
        scene.camera.projection = Projection::Orthographic;
        let region = VisibleRegion::compute(&scene, 20.0).unwrap();
        let footprint = region.footprint_at(&scene, Vec3::ZERO);
        assert!(footprint.contains(Vec3::new(1.0, 1.0, 0.0)));
        assert!(!footprint.contains(Vec3::new(100.0, 0.0, 0.0)));
    }

    #[test]
    fn test_region_intersects() {
        let region = VisibleRegion::compute(&scene(), 20.0).unwrap();
        assert!(region.intersects_px(Vec2::new(0.0, 0.0), Vec2::new(30.0, 30.0)));
        assert!(!region.intersects_px(Vec2::new(0.0, 0.0), Vec2::new(10.0, 10.0)));
        assert!(!region.intersects_px(Vec2::new(700.0, 0.0), Vec2::new(800.0, 10.0)));
    }
}
