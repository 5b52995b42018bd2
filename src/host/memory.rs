//! In-memory host: an orbit camera looking at a scene document

use super::document::{Primitive, SceneDocument};
use super::mesh::MeshTopology;
use super::{MeshObject, ObjectId, SceneHit, SceneHost, Shading, Viewport};
use crate::recovery::RecoveryRecord;
use crate::view::{Camera, Mat4, Vec2, Vec3, ray_triangle_intersect};
use std::cell::Cell;

pub struct MemoryScene {
    pub camera: Camera,
    pub shading: Shading,
    /// Viewport is isolated to objects flagged `local`
    pub local_view: bool,
    document: SceneDocument,
    /// Local-space meshes, parallel to `document.objects`
    meshes: Vec<Option<MeshTopology>>,
    recovery: Option<RecoveryRecord>,
    ray_casts: Cell<usize>,
}

impl MemoryScene {
    pub fn new(document: SceneDocument, camera: Camera) -> Self {
        let meshes = build_meshes(&document);
        Self {
            camera,
            shading: Shading::default(),
            local_view: false,
            document,
            meshes,
            recovery: None,
            ray_casts: Cell::new(0),
        }
    }

    pub fn document(&self) -> &SceneDocument {
        &self.document
    }

    pub fn set_document(&mut self, document: SceneDocument) {
        self.meshes = build_meshes(&document);
        self.document = document;
    }

    pub fn into_document(self) -> SceneDocument {
        self.document
    }

    pub fn is_hidden(&self, id: &ObjectId) -> bool {
        self.document.find(id).map(|o| o.hidden).unwrap_or(false)
    }

    pub fn recovery(&self) -> Option<&RecoveryRecord> {
        self.recovery.as_ref()
    }

    /// Number of scene ray casts served so far
    pub fn ray_cast_count(&self) -> usize {
        self.ray_casts.get()
    }

    /// World-space meshes of every object the renderer should draw
    pub fn drawable_meshes(&self) -> Vec<(ObjectId, MeshTopology)> {
        self.document
            .objects
            .iter()
            .zip(&self.meshes)
            .filter(|(obj, _)| !obj.hidden && (!self.local_view || obj.local))
            .filter_map(|(obj, mesh)| {
                mesh.as_ref().map(|m| (obj.id(), m.transformed(&obj.transform())))
            })
            .collect()
    }
}

fn build_meshes(document: &SceneDocument) -> Vec<Option<MeshTopology>> {
    document.objects.iter().map(|o| o.primitive.build()).collect()
}

impl Viewport for MemoryScene {
    fn region_size(&self) -> Option<(f32, f32)> {
        if self.camera.width > 0.0 && self.camera.height > 0.0 {
            Some((self.camera.width, self.camera.height))
        } else {
            None
        }
    }

    fn location_to_region(&self, world: Vec3) -> Option<Vec2> {
        self.camera.world_to_screen(world)
    }

    fn region_to_origin(&self, region: Vec2) -> Vec3 {
        self.camera.screen_to_ray(region).origin
    }

    fn region_to_vector(&self, region: Vec2) -> Vec3 {
        self.camera.screen_to_ray(region).direction
    }

    fn view_matrix(&self) -> Mat4 {
        self.camera.view_matrix()
    }

    fn view_distance(&self) -> f32 {
        self.camera.distance
    }

    fn shading(&self) -> Shading {
        self.shading
    }
}

impl SceneHost for MemoryScene {
    fn visible_meshes(&self) -> Vec<MeshObject> {
        self.document
            .objects
            .iter()
            .zip(&self.meshes)
            .filter(|(obj, _)| !obj.hidden && (!self.local_view || obj.local))
            .filter(|(obj, _)| !matches!(obj.primitive, Primitive::Empty))
            .map(|(obj, mesh)| MeshObject {
                id: obj.id(),
                transform: obj.transform(),
                mesh: mesh.clone(),
            })
            .collect()
    }

    fn visible_objects(&self) -> Vec<ObjectId> {
        self.document.objects.iter().filter(|o| !o.hidden).map(|o| o.id()).collect()
    }

    fn local_view(&self) -> bool {
        self.local_view
    }

    /// Hits every non-hidden object, local view or not
    fn ray_cast(&self, origin: Vec3, direction: Vec3) -> Option<SceneHit> {
        self.ray_casts.set(self.ray_casts.get() + 1);
        let dir = direction.normalize();

        let mut best: Option<(f32, SceneHit)> = None;
        for (obj, mesh) in self.document.objects.iter().zip(&self.meshes) {
            if obj.hidden {
                continue;
            }
            let Some(mesh) = mesh else { continue };
            let world = mesh.transformed(&obj.transform());

            for (face_index, face) in world.faces.iter().enumerate() {
                for [a, b, c] in face.triangulate() {
                    let (Some(&v0), Some(&v1), Some(&v2)) =
                        (world.vertices.get(a), world.vertices.get(b), world.vertices.get(c))
                    else {
                        continue;
                    };
                    if let Some(t) = ray_triangle_intersect(origin, dir, v0, v1, v2) {
                        if best.as_ref().map_or(true, |(bt, _)| t < *bt) {
                            best = Some((t, SceneHit {
                                location: origin + dir * t,
                                object: obj.id(),
                                face_index,
                            }));
                        }
                    }
                }
            }
        }
        best.map(|(_, hit)| hit)
    }

    fn set_hidden(&mut self, id: &ObjectId, hidden: bool) {
        if let Some(obj) = self.document.find_mut(id) {
            obj.hidden = hidden;
        }
    }

    fn record_recovery(&mut self, record: &RecoveryRecord) {
        self.recovery = Some(record.clone());
    }

    fn discard_recovery(&mut self) {
        self.recovery = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::document::ObjectDesc;

    fn cube_scene() -> MemoryScene {
        let mut doc = SceneDocument::new();
        doc.add(ObjectDesc::new("Cube", Primitive::Cube { size: 2.0 }, Vec3::ZERO).with_local(true));
        doc.add(ObjectDesc::new("Far", Primitive::Cube { size: 2.0 }, Vec3::new(0.0, 0.0, -10.0)));
        doc.add(ObjectDesc::new("Anchor", Primitive::Empty, Vec3::Y));
        MemoryScene::new(doc, Camera::looking_at(Vec3::ZERO, 10.0, 640.0, 480.0))
    }

    #[test]
    fn test_ray_cast_hits_front_face() {
        let scene = cube_scene();
        let hit = scene.ray_cast(Vec3::new(0.0, 0.0, 10.0), -Vec3::Z).unwrap();
        assert_eq!(hit.object, ObjectId::from("Cube"));
        assert_eq!(hit.face_index, 1);
        assert!(hit.location.distance(Vec3::new(0.0, 0.0, 1.0)) < 1e-4);
        assert_eq!(scene.ray_cast_count(), 1);
    }

    #[test]
    fn test_ray_cast_skips_hidden() {
        let mut scene = cube_scene();
        scene.set_hidden(&ObjectId::from("Cube"), true);
        let hit = scene.ray_cast(Vec3::new(0.0, 0.0, 10.0), -Vec3::Z).unwrap();
        assert_eq!(hit.object, ObjectId::from("Far"));
    }

    #[test]
    fn test_local_view_limits_meshes_not_objects() {
        let mut scene = cube_scene();
        assert_eq!(scene.visible_meshes().len(), 2);
        scene.local_view = true;
        let meshes = scene.visible_meshes();
        assert_eq!(meshes.len(), 1);
        assert_eq!(meshes[0].id, ObjectId::from("Cube"));
        assert_eq!(scene.visible_objects().len(), 3);
    }

    #[test]
    fn test_zero_sized_region_is_none() {
        let mut scene = cube_scene();
        assert!(scene.region_size().is_some());
        scene.camera.set_viewport(0.0, 0.0);
        assert!(scene.region_size().is_none());
    }

    #[test]
    fn test_recovery_slot() {
        let mut scene = cube_scene();
        scene.record_recovery(&RecoveryRecord::new(vec![ObjectId::from("Far")]));
        assert!(scene.recovery().is_some());
        scene.discard_recovery();
        assert!(scene.recovery().is_none());
    }
}
