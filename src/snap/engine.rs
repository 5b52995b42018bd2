//! Snap engine: one interactive snapping session over a host viewport
//!
//! Lifecycle:
//! 1. `new` - snapshot visible meshes, hide objects outside a local view
//! 2. `query` - any number of cursor queries
//! 3. `teardown` - show hidden objects again, release geometry
//!
//! Every query first checks whether the camera moved. A moved camera resets
//! all category caches; otherwise caches only grow.

use super::cache::SnapCache;
use super::extract::{CandidateExtractor, CandidateRecord, Occlusion};
use super::geometry_cache::GeometryCache;
use super::projector::{ScreenKey, ScreenProjector, VisibleRegion};
use super::xray::ScreenBoundsIndex;
use super::{FeatureCategory, SnapResult};
use crate::config::SnapConfig;
use crate::error::SnapError;
use crate::host::{ObjectId, SceneHit, SnapHost};
use crate::recovery::RecoveryRecord;
use crate::view::{Mat4, Vec2, Vec3};
use std::collections::HashSet;

/// Camera state the caches were built for
#[derive(Clone, Copy, Debug, PartialEq)]
struct ViewState {
    distance: f32,
    matrix: Mat4,
    region_size: (f32, f32),
}

impl ViewState {
    /// `None` while the host has no usable region
    fn read<H: SnapHost + ?Sized>(host: &H) -> Option<Self> {
        let region_size = host.region_size()?;
        Some(Self { distance: host.view_distance(), matrix: host.view_matrix(), region_size })
    }
}

pub struct SnapEngine {
    config: SnapConfig,
    category: FeatureCategory,
    geometry: GeometryCache,
    cache: SnapCache,
    bounds: ScreenBoundsIndex,
    region: VisibleRegion,
    view: Option<ViewState>,
    xray: bool,
    /// Last pixel probed with a scene ray cast, per category
    last_probe: Option<(FeatureCategory, ScreenKey)>,
    /// Objects hidden for the local view, shown again at teardown
    hidden: Vec<ObjectId>,
    torn_down: bool,
}

impl SnapEngine {
    /// Start a session. Fails without side effects when the host has no region.
    pub fn new<H: SnapHost + ?Sized>(host: &mut H, config: SnapConfig) -> Result<Self, SnapError> {
        config.validate()?;

        let Some(region) = VisibleRegion::compute(&*host, config.region_margin_px) else {
            log::warn!("no 3D region available, snapping disabled");
            return Err(SnapError::NoRegion);
        };

        let meshes = host.visible_meshes();

        // Scene ray casts see through local view, so hide what is outside it
        let mut hidden = Vec::new();
        if host.local_view() {
            let local: HashSet<&ObjectId> = meshes.iter().map(|m| &m.id).collect();
            hidden = host.visible_objects().into_iter().filter(|id| !local.contains(id)).collect();
            for id in &hidden {
                host.set_hidden(id, true);
            }
            if !hidden.is_empty() {
                host.record_recovery(&RecoveryRecord::new(hidden.clone()));
                log::info!("local view: hid {} objects outside the isolation", hidden.len());
            }
        }

        let geometry = GeometryCache::build(&meshes);
        let mut engine = Self {
            config,
            category: FeatureCategory::default(),
            geometry,
            cache: SnapCache::new(),
            bounds: ScreenBoundsIndex::new(),
            region,
            view: ViewState::read(&*host),
            xray: false,
            last_probe: None,
            hidden,
            torn_down: false,
        };
        engine.refresh_shading(&*host);
        log::info!("snap session started over {} objects", engine.geometry.len());
        Ok(engine)
    }

    pub fn config(&self) -> &SnapConfig {
        &self.config
    }

    pub fn category(&self) -> FeatureCategory {
        self.category
    }

    /// Switch category. Nothing is recomputed until the next query.
    pub fn set_category(&mut self, category: FeatureCategory) {
        self.category = category;
    }

    pub fn is_xray(&self) -> bool {
        self.xray
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    pub fn geometry(&self) -> &GeometryCache {
        &self.geometry
    }

    /// Objects hidden for the local view
    pub fn hidden_objects(&self) -> &[ObjectId] {
        &self.hidden
    }

    /// Candidates of the active category, in insertion order
    pub fn candidates(&self) -> impl Iterator<Item = (ScreenKey, &CandidateRecord)> {
        let cache = self.cache.get(self.category);
        (0..cache.len()).filter_map(move |slot| cache.entry(slot)).map(|(k, r)| (*k, r))
    }

    pub fn candidate_count(&self) -> usize {
        self.cache.get(self.category).len()
    }

    /// World positions of the active category's candidates, for overlays
    pub fn candidate_points(&self) -> Vec<Vec3> {
        self.candidates().map(|(_, r)| r.position).collect()
    }

    /// Snap the cursor (region pixels) to the nearest feature of the active category.
    /// A miss while the host region is unavailable.
    pub fn query<H: SnapHost + ?Sized>(&mut self, host: &H, cursor: Vec2) -> Result<SnapResult, SnapError> {
        if self.torn_down {
            return Err(SnapError::TornDown);
        }
        if !self.update_view(host) {
            return Ok(SnapResult::miss());
        }
        self.update_cache(host, cursor);
        Ok(self.lookup(cursor))
    }

    /// Re-read the shading mode without waiting for a camera move.
    /// Toggling X-ray drops every candidate.
    pub fn refresh_shading<H: SnapHost + ?Sized>(&mut self, host: &H) {
        let xray = host.shading().xray();
        if xray != self.xray {
            self.cache.reset();
            self.last_probe = None;
            log::debug!("x-ray {}, candidate caches reset", if xray { "on" } else { "off" });
        }
        self.xray = xray;
        if self.xray {
            self.bounds.rebuild(host, &self.region, &self.geometry);
        } else {
            self.bounds.clear();
        }
    }

    /// Undo the local-view hiding and release all geometry. Call exactly once.
    pub fn teardown<H: SnapHost + ?Sized>(&mut self, host: &mut H) -> Result<(), SnapError> {
        if self.torn_down {
            return Err(SnapError::AlreadyTornDown);
        }
        self.torn_down = true;

        for id in &self.hidden {
            host.set_hidden(id, false);
        }
        if !self.hidden.is_empty() {
            host.discard_recovery();
            log::info!("restored {} hidden objects", self.hidden.len());
        }
        self.hidden.clear();

        self.cache.reset();
        self.bounds.clear();
        self.geometry.release();
        log::info!("snap session finished");
        Ok(())
    }

    /// Returns false while the host has no usable region
    fn update_view<H: SnapHost + ?Sized>(&mut self, host: &H) -> bool {
        let current = ViewState::read(host);
        if current.is_some() && self.view == current {
            return true;
        }
        self.reset_view(host)
    }

    fn reset_view<H: SnapHost + ?Sized>(&mut self, host: &H) -> bool {
        self.cache.reset();
        self.last_probe = None;

        let region = VisibleRegion::compute(host, self.config.region_margin_px);
        let (Some(region), Some(view)) = (region, ViewState::read(host)) else {
            if self.view.take().is_some() {
                log::debug!("region unavailable, candidate caches cleared");
            }
            self.bounds.clear();
            return false;
        };
        self.region = region;
        self.view = Some(view);
        self.refresh_shading(host);
        log::debug!("view changed, candidate caches reset (xray: {})", self.xray);
        true
    }

    fn update_cache<H: SnapHost + ?Sized>(&mut self, host: &H, cursor: Vec2) {
        let category = self.category;
        let projector = ScreenProjector::new(host);
        let extractor = CandidateExtractor::new(host, &self.region, &self.config);
        let reference = |key: ScreenKey| projector.screen_to_world(key.to_point());
        let cache = self.cache.get_mut(category);

        if category == FeatureCategory::Origin {
            if cache.index().is_none() {
                let batch = self
                    .geometry
                    .iter()
                    .map(|s| (s.id.clone(), extractor.extract(s, category, Occlusion::Skip)))
                    .collect();
                let added = cache.merge_batch(batch, reference);
                log::debug!("merged {} origins", added);
            }
            return;
        }

        let targets: Vec<(ObjectId, Occlusion)> = if self.xray {
            self.bounds
                .objects_under(cursor)
                .filter(|id| !cache.is_merged(id))
                .map(|id| (id.clone(), Occlusion::Skip))
                .collect()
        } else {
            let probe = (category, ScreenKey::from_point(cursor));
            if self.last_probe == Some(probe) {
                return;
            }
            self.last_probe = Some(probe);

            let origin = projector.screen_to_world(cursor);
            let direction = projector.screen_normal(cursor);
            let Some(hit) = host.ray_cast(origin, direction) else { return };
            if !self.geometry.contains(&hit.object) || cache.is_merged(&hit.object) {
                return;
            }
            if self.config.ignore_dense_faces && is_dense_face(&projector, &self.geometry, &hit, self.config.dense_face_area_px) {
                log::debug!("ignoring dense face {} of '{}'", hit.face_index, hit.object);
                return;
            }
            vec![(hit.object, Occlusion::Test)]
        };

        if targets.is_empty() {
            return;
        }
        let batch = targets
            .into_iter()
            .filter_map(|(id, occlusion)| {
                let snapshot = self.geometry.get(&id)?;
                Some((id, extractor.extract(snapshot, category, occlusion)))
            })
            .collect::<Vec<_>>();
        let objects = batch.len();
        let added = cache.merge_batch(batch, reference);
        log::debug!("merged {} objects into {}: {} new candidates", objects, category, added);
    }

    fn lookup(&self, cursor: Vec2) -> SnapResult {
        let cache = self.cache.get(self.category);
        let hits = cache.nearest_within(cursor, self.config.search_radius_px);
        let Some(closest) = hits.first() else {
            return SnapResult::miss();
        };

        if closest.distance < self.config.snap_radius_px {
            return match cache.entry(closest.item) {
                Some((_, record)) => SnapResult::hit(record.position, record.object.clone()),
                None => SnapResult::miss(),
            };
        }

        let nearby = hits
            .iter()
            .take(self.config.max_nearby)
            .filter_map(|h| cache.entry(h.item))
            .map(|(_, r)| r.position)
            .collect();
        SnapResult::near(nearby)
    }
}

/// Whether the hit face covers at most `max_area` square pixels on screen
fn is_dense_face<H: SnapHost + ?Sized>(
    projector: &ScreenProjector<'_, H>,
    geometry: &GeometryCache,
    hit: &SceneHit,
    max_area: f32,
) -> bool {
    let Some(snapshot) = geometry.get(&hit.object) else { return false };
    let Some(face) = snapshot.mesh.faces.get(hit.face_index) else { return false };

    let mut corners = Vec::with_capacity(face.vertices.len());
    for &vi in &face.vertices {
        let Some(&v) = snapshot.mesh.vertices.get(vi) else { return false };
        let Some(key) = projector.world_to_screen(v) else { return false };
        corners.push(key.to_point());
    }
    let Some(&first) = corners.first() else { return false };
    let (lo, hi) = corners.iter().fold((first, first), |(lo, hi), &p| (lo.min(p), hi.max(p)));
    (hi.x - lo.x) * (hi.y - lo.y) <= max_area
}
