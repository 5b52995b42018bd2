//! Session-long snapshot of the visible mesh objects
//!
//! Topology is copied and moved to world space once, when a session starts,
//! so later edits in the host cannot disturb in-flight occlusion tests.

use super::bvh::{Bvh, BvhHit};
use crate::host::{MeshObject, MeshTopology, ObjectId};
use crate::view::{Aabb, Mat4, Vec3, mat4_get_translation, mat4_transform_point};
use std::collections::HashMap;

/// One visible object, frozen at session start
#[derive(Debug)]
pub struct ObjectSnapshot {
    pub id: ObjectId,
    pub transform: Mat4,
    /// Indexes into `mesh`, declared first so it is dropped first
    bvh: Bvh,
    /// World-space topology
    pub mesh: MeshTopology,
    /// Unique undirected edges of `mesh`
    pub edges: Vec<(usize, usize)>,
    /// Local bounding box corners moved to world space
    pub corners: [Vec3; 8],
    /// Bounding box diagonal in world units
    pub size: f32,
}

impl ObjectSnapshot {
    /// `None` when the object has nothing renderable
    pub fn capture(object: &MeshObject) -> Option<Self> {
        let local = object.mesh.as_ref()?;
        if local.is_empty() {
            return None;
        }
        let local_bounds = Aabb::from_points(local.vertices.iter().copied())?;
        let corners = local_bounds.corners().map(|c| mat4_transform_point(&object.transform, c));
        // corners[0] is the min corner, corners[6] the max corner
        let size = corners[0].distance(corners[6]);

        // Face indices must stay aligned with the host's, so no sanitizing here
        let mesh = local.transformed(&object.transform);
        let bvh = Bvh::build(&mesh);
        let edges = mesh.unique_edges();

        Some(Self {
            id: object.id.clone(),
            transform: object.transform,
            bvh,
            mesh,
            edges,
            corners,
            size,
        })
    }

    /// Object origin in world space
    pub fn origin(&self) -> Vec3 {
        mat4_get_translation(&self.transform)
    }

    pub fn ray_cast(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> Option<BvhHit> {
        self.bvh.ray_cast(&self.mesh, origin, direction, max_distance)
    }
}

/// Snapshots of every object that was visible when the session started
#[derive(Debug, Default)]
pub struct GeometryCache {
    snapshots: Vec<ObjectSnapshot>,
    by_id: HashMap<ObjectId, usize>,
}

impl GeometryCache {
    pub fn build(objects: &[MeshObject]) -> Self {
        let mut cache = Self::default();
        for object in objects {
            match ObjectSnapshot::capture(object) {
                Some(snapshot) => {
                    cache.by_id.insert(snapshot.id.clone(), cache.snapshots.len());
                    cache.snapshots.push(snapshot);
                }
                None => log::warn!("skipping '{}': no mesh data", object.id),
            }
        }
        log::debug!("geometry cache holds {} of {} objects", cache.snapshots.len(), objects.len());
        cache
    }

    pub fn get(&self, id: &ObjectId) -> Option<&ObjectSnapshot> {
        self.by_id.get(id).and_then(|&i| self.snapshots.get(i))
    }

    pub fn contains(&self, id: &ObjectId) -> bool {
        self.by_id.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ObjectSnapshot> {
        self.snapshots.iter()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Drop every snapshot. Each hierarchy goes before the mesh it indexes.
    pub fn release(&mut self) {
        self.by_id.clear();
        self.snapshots.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::{mat4_from_position_rotation_scale, mat4_identity};

    fn object(name: &str, mesh: Option<MeshTopology>, transform: Mat4) -> MeshObject {
        MeshObject { id: ObjectId::from(name), transform, mesh }
    }

    #[test]
    fn test_capture_moves_to_world_space() {
        let transform = mat4_from_position_rotation_scale(Vec3::new(5.0, 0.0, 0.0), Vec3::ZERO, Vec3::splat(1.0));
        let snap = ObjectSnapshot::capture(&object("Cube", Some(MeshTopology::cube(2.0)), transform)).unwrap();
        assert!(snap.origin().distance(Vec3::new(5.0, 0.0, 0.0)) < 1e-6);
        assert!(snap.mesh.vertices[6].distance(Vec3::new(6.0, 1.0, 1.0)) < 1e-6);
        assert!((snap.size - 12.0f32.sqrt()).abs() < 1e-5);
        let hit = snap.ray_cast(Vec3::new(5.0, 0.0, 5.0), -Vec3::Z, 10.0).unwrap();
        assert_eq!(hit.face_index, 1);
    }

    #[test]
    fn test_objects_without_geometry_are_excluded() {
        let objects = vec![
            object("Cube", Some(MeshTopology::cube(1.0)), mat4_identity()),
            object("Empty", None, mat4_identity()),
            object("Hollow", Some(MeshTopology::new()), mat4_identity()),
        ];
        let mut cache = GeometryCache::build(&objects);
        assert_eq!(cache.len(), 1);
        assert!(cache.contains(&ObjectId::from("Cube")));
        assert!(cache.get(&ObjectId::from("Empty")).is_none());

        cache.release();
        assert!(cache.is_empty());
        assert!(cache.get(&ObjectId::from("Cube")).is_none());
    }
}
