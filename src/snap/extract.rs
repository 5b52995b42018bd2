//! Candidate extraction for one object and one feature category
//!
//! Features are kept when they sit inside the visible region and, unless
//! occlusion is skipped, are not hidden behind the object's own surface.
//! Other objects never occlude. Origins are exempt from the region test.

use super::geometry_cache::ObjectSnapshot;
use super::projector::{ScreenKey, ScreenProjector, VisibleRegion};
use super::FeatureCategory;
use crate::config::SnapConfig;
use crate::host::{ObjectId, Viewport};
use crate::view::Vec3;

/// A snappable world point
#[derive(Clone, Debug, PartialEq)]
pub struct CandidateRecord {
    pub position: Vec3,
    pub object: ObjectId,
    /// Vertex, edge or face index within the object (0 for the origin)
    pub feature: usize,
}

/// Whether to run self-occlusion tests
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Occlusion {
    Test,
    Skip,
}

pub struct CandidateExtractor<'a, V: Viewport + ?Sized> {
    viewport: &'a V,
    region: &'a VisibleRegion,
    config: &'a SnapConfig,
}

impl<'a, V: Viewport + ?Sized> CandidateExtractor<'a, V> {
    pub fn new(viewport: &'a V, region: &'a VisibleRegion, config: &'a SnapConfig) -> Self {
        Self { viewport, region, config }
    }

    /// On-screen, unoccluded features of `snapshot`, keyed by screen pixel
    pub fn extract(
        &self,
        snapshot: &ObjectSnapshot,
        category: FeatureCategory,
        occlusion: Occlusion,
    ) -> Vec<(ScreenKey, CandidateRecord)> {
        let footprint = self.region.footprint_at(self.viewport, snapshot.origin());
        let projector = ScreenProjector::new(self.viewport);

        features(snapshot, category)
            .into_iter()
            .filter(|&(_, position)| category == FeatureCategory::Origin || footprint.contains(position))
            .filter(|&(index, position)| {
                occlusion == Occlusion::Skip || self.is_visible(snapshot, category, index, position)
            })
            .filter_map(|(feature, position)| {
                let key = projector.world_to_screen(position)?;
                Some((key, CandidateRecord { position, object: snapshot.id.clone(), feature }))
            })
            .collect()
    }

    fn is_visible(&self, snapshot: &ObjectSnapshot, category: FeatureCategory, index: usize, position: Vec3) -> bool {
        let view_dir = self.region.view_dir;
        let reach = snapshot.size * self.config.ray_length_factor;

        match category {
            // Face centers lie on the surface: the face must be the first
            // thing a ray from the camera side meets
            FeatureCategory::FaceCenter => {
                let start = position - view_dir * (snapshot.size * self.config.face_ray_backoff);
                snapshot
                    .ray_cast(start, view_dir, reach)
                    .map_or(false, |hit| hit.face_index == index)
            }
            // Points: nothing between them and the camera
            _ => {
                let start = position - view_dir * self.config.occlusion_epsilon;
                snapshot.ray_cast(start, -view_dir, reach).is_none()
            }
        }
    }
}

/// (feature index, world position) pairs of a category
fn features(snapshot: &ObjectSnapshot, category: FeatureCategory) -> Vec<(usize, Vec3)> {
    let mesh = &snapshot.mesh;
    match category {
        FeatureCategory::Origin => vec![(0, snapshot.origin())],
        FeatureCategory::Vertex => mesh.vertices.iter().copied().enumerate().collect(),
        FeatureCategory::EdgeMidpoint => snapshot
            .edges
            .iter()
            .enumerate()
            .filter_map(|(i, &(a, b))| {
                let (va, vb) = (mesh.vertices.get(a)?, mesh.vertices.get(b)?);
                Some((i, (*va + *vb) * 0.5))
            })
            .collect(),
        FeatureCategory::FaceCenter => (0..mesh.faces.len())
            .filter_map(|i| mesh.face_center(i).map(|c| (i, c)))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{MeshObject, MeshTopology, MemoryScene, SceneDocument};
    use crate::view::{Camera, mat4_identity, mat4_translation};

    fn cube_snapshot() -> ObjectSnapshot {
        ObjectSnapshot::capture(&MeshObject {
            id: ObjectId::from("Cube"),
            transform: mat4_identity(),
            mesh: Some(MeshTopology::cube(2.0)),
        })
        .unwrap()
    }

    fn head_on_scene() -> MemoryScene {
        MemoryScene::new(SceneDocument::new(), Camera::looking_at(Vec3::ZERO, 10.0, 640.0, 480.0))
    }

    fn extract(scene: &MemoryScene, category: FeatureCategory, occlusion: Occlusion) -> Vec<(ScreenKey, CandidateRecord)> {
        let config = SnapConfig::default();
        let region = VisibleRegion::compute(scene, config.region_margin_px).unwrap();
        CandidateExtractor::new(scene, &region, &config).extract(&cube_snapshot(), category, occlusion)
    }

    #[test]
    fn test_face_occlusion_keeps_front_drops_back() {
        let scene = head_on_scene();
        let faces: Vec<usize> = extract(&scene, FeatureCategory::FaceCenter, Occlusion::Test)
            .iter()
            .map(|(_, r)| r.feature)
            .collect();
        // Face 1 faces the camera, face 0 is directly behind it
        assert!(faces.contains(&1));
        assert!(!faces.contains(&0));
    }

    #[test]
    fn test_hidden_face_ray_does_not_resolve_to_itself() {
        let scene = head_on_scene();
        let snapshot = cube_snapshot();
        let region = VisibleRegion::compute(&scene, 20.0).unwrap();
        let back_center = snapshot.mesh.face_center(0).unwrap();
        let hit = snapshot.ray_cast(back_center - region.view_dir * (snapshot.size * 1.5), region.view_dir, snapshot.size * 2.0);
        assert_ne!(hit.map(|h| h.face_index), Some(0));
    }

    #[test]
    fn test_skip_occlusion_keeps_everything_on_screen() {
        let scene = head_on_scene();
        let faces = extract(&scene, FeatureCategory::FaceCenter, Occlusion::Skip);
        assert_eq!(faces.len(), 6);
    }

    #[test]
    fn test_vertex_occlusion_from_an_angle() {
        let mut scene = head_on_scene();
        // Look from front-right-top so exactly one corner is hidden
        scene.camera.rotate(-0.6, 0.5);
        let visible: Vec<usize> = extract(&scene, FeatureCategory::Vertex, Occlusion::Test)
            .iter()
            .map(|(_, r)| r.feature)
            .collect();
        assert_eq!(visible.len(), 7, "got {:?}", visible);
        // (-1, -1, -1) is the far corner
        assert!(!visible.contains(&0));
    }

    #[test]
    fn test_edge_midpoints() {
        let mut scene = head_on_scene();
        scene.camera.rotate(-0.6, 0.5);
        let all = extract(&scene, FeatureCategory::EdgeMidpoint, Occlusion::Skip);
        assert_eq!(all.len(), 12);
        let visible = extract(&scene, FeatureCategory::EdgeMidpoint, Occlusion::Test);
        // The three edges meeting at the far corner are hidden
        assert_eq!(visible.len(), 9);
    }

    #[test]
    fn test_off_screen_features_dropped() {
        let mut scene = head_on_scene();
        scene.camera.target = Vec3::new(50.0, 0.0, 0.0);
        scene.camera.update_basis();
        assert!(extract(&scene, FeatureCategory::Vertex, Occlusion::Skip).is_empty());
    }

    #[test]
    fn test_origin_inside_margin_is_kept() {
        let scene = head_on_scene();
        let config = SnapConfig::default();
        let region = VisibleRegion::compute(&scene, config.region_margin_px).unwrap();
        let extractor = CandidateExtractor::new(&scene, &region, &config);
        let snapshot = |x: f32, z: f32| {
            ObjectSnapshot::capture(&MeshObject {
                id: ObjectId::from("Edge"),
                transform: mat4_translation(Vec3::new(x, 0.0, z)),
                mesh: Some(MeshTopology::cube(0.2)),
            })
            .unwrap()
        };

        // Projects to x ~ 628, inside the 20 px margin of a 640 px region
        let near_edge = snapshot(6.0, 0.0);
        let origins = extractor.extract(&near_edge, FeatureCategory::Origin, Occlusion::Skip);
        assert_eq!(origins.len(), 1);
        assert!(!region.contains_px(origins[0].0.to_point()));
        assert!(extractor.extract(&near_edge, FeatureCategory::Vertex, Occlusion::Skip).is_empty());

        // Behind the camera there is no pixel to key it by
        let behind = snapshot(0.0, 20.0);
        assert!(extractor.extract(&behind, FeatureCategory::Origin, Occlusion::Skip).is_empty());
    }

    #[test]
    fn test_origin_feature() {
        let scene = head_on_scene();
        let origins = extract(&scene, FeatureCategory::Origin, Occlusion::Skip);
        assert_eq!(origins.len(), 1);
        assert_eq!(origins[0].0, ScreenKey::new(320, 240));
        assert_eq!(origins[0].1.position, Vec3::ZERO);
    }
}
