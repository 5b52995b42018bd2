//! Screen rectangles of object bounds, for picking under X-ray shading
//!
//! With see-through shading a scene ray cast would only ever report the
//! front-most object, so objects are picked by their projected bounds instead.

use super::geometry_cache::GeometryCache;
use super::projector::{ScreenProjector, VisibleRegion};
use crate::host::{ObjectId, Viewport};
use crate::view::Vec2;

#[derive(Debug, Default)]
pub struct ScreenBoundsIndex {
    /// Object id and its (min, max) pixel rectangle, in snapshot order
    bounds: Vec<(ObjectId, Vec2, Vec2)>,
}

impl ScreenBoundsIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Project every snapshot's bounding box, keeping those that overlap `region`
    pub fn rebuild<V: Viewport + ?Sized>(&mut self, viewport: &V, region: &VisibleRegion, geometry: &GeometryCache) {
        let projector = ScreenProjector::new(viewport);
        self.bounds.clear();

        for snapshot in geometry.iter() {
            let mut projected = snapshot.corners.iter().filter_map(|&c| projector.world_to_point(c));
            let Some(first) = projected.next() else { continue };
            let (min, max) = projected.fold((first, first), |(lo, hi), p| (lo.min(p), hi.max(p)));
            if region.intersects_px(min, max) {
                self.bounds.push((snapshot.id.clone(), min, max));
            }
        }
        log::debug!("screen bounds index holds {} objects", self.bounds.len());
    }

    pub fn clear(&mut self) {
        self.bounds.clear();
    }

    pub fn len(&self) -> usize {
        self.bounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bounds.is_empty()
    }

    pub fn rect(&self, id: &ObjectId) -> Option<(Vec2, Vec2)> {
        self.bounds.iter().find(|(o, _, _)| o == id).map(|&(_, min, max)| (min, max))
    }

    /// Objects whose rectangle strictly contains `cursor`
    pub fn objects_under<'a>(&'a self, cursor: Vec2) -> impl Iterator<Item = &'a ObjectId> + 'a {
        self.bounds.iter().filter_map(move |(id, min, max)| {
            let inside = cursor.x > min.x && cursor.x < max.x && cursor.y > min.y && cursor.y < max.y;
            inside.then_some(id)
        })
    }
}
