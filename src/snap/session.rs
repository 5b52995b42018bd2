//! Scoped snapping session
//!
//! `SnapSession` borrows the host for as long as snapping is active. It runs
//! teardown when finished, and again from `Drop` if the session is abandoned
//! (early return, panic unwind), so hidden objects are always shown again.

use super::debounce::Debouncer;
use super::engine::SnapEngine;
use super::{FeatureCategory, SnapResult};
use crate::config::SnapConfig;
use crate::error::SnapError;
use crate::host::SnapHost;
use crate::view::Vec2;

pub struct SnapSession<'a, H: SnapHost + ?Sized> {
    host: &'a mut H,
    engine: SnapEngine,
    debouncer: Debouncer,
    last: SnapResult,
}

impl<'a, H: SnapHost + ?Sized> SnapSession<'a, H> {
    pub fn start(host: &'a mut H, config: SnapConfig) -> Result<Self, SnapError> {
        let debouncer = Debouncer::new(config.debounce_secs);
        let engine = SnapEngine::new(&mut *host, config)?;
        Ok(Self { host, engine, debouncer, last: SnapResult::miss() })
    }

    pub fn host(&self) -> &H {
        &*self.host
    }

    /// Mutable host access, e.g. to move the camera between queries
    pub fn host_mut(&mut self) -> &mut H {
        &mut *self.host
    }

    pub fn engine(&self) -> &SnapEngine {
        &self.engine
    }

    pub fn category(&self) -> FeatureCategory {
        self.engine.category()
    }

    /// Switch category and re-query the last pointer position right away
    pub fn set_category(&mut self, category: FeatureCategory, cursor: Vec2) -> Result<&SnapResult, SnapError> {
        self.engine.set_category(category);
        self.query_now(cursor)
    }

    /// Shading changed in the host
    pub fn refresh_shading(&mut self) {
        self.engine.refresh_shading(&*self.host);
    }

    /// Schedule a debounced query for the new pointer position
    pub fn pointer_moved(&mut self, cursor: Vec2, now: f64) {
        self.debouncer.schedule(cursor, now);
    }

    /// Run the pending query if it is due. `None` when nothing ran.
    pub fn tick(&mut self, now: f64) -> Result<Option<&SnapResult>, SnapError> {
        let Some(pending) = self.debouncer.poll(now) else {
            return Ok(None);
        };
        self.last = self.engine.query(&*self.host, pending.cursor)?;
        Ok(Some(&self.last))
    }

    /// Query immediately, dropping any pending debounced query
    pub fn query_now(&mut self, cursor: Vec2) -> Result<&SnapResult, SnapError> {
        self.debouncer.cancel();
        self.last = self.engine.query(&*self.host, cursor)?;
        Ok(&self.last)
    }

    /// Result of the most recent query
    pub fn last_result(&self) -> &SnapResult {
        &self.last
    }

    pub fn has_pending(&self) -> bool {
        self.debouncer.pending().is_some()
    }

    /// End the session, returning the last result
    pub fn finish(mut self) -> Result<SnapResult, SnapError> {
        self.debouncer.cancel();
        self.engine.teardown(&mut *self.host)?;
        Ok(std::mem::take(&mut self.last))
    }
}

impl<H: SnapHost + ?Sized> Drop for SnapSession<'_, H> {
    fn drop(&mut self) {
        if self.engine.is_torn_down() {
            return;
        }
        log::warn!("snap session dropped without finishing, restoring scene");
        if let Err(e) = self.engine.teardown(&mut *self.host) {
            log::error!("teardown failed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{MemoryScene, ObjectDesc, ObjectId, Primitive, SceneDocument};
    use crate::view::{Camera, Vec3};

    fn isolated_scene() -> MemoryScene {
        let mut doc = SceneDocument::new();
        doc.add(ObjectDesc::new("Cube", Primitive::Cube { size: 2.0 }, Vec3::ZERO).with_local(true));
        doc.add(ObjectDesc::new("Other", Primitive::Cube { size: 2.0 }, Vec3::new(4.0, 0.0, 0.0)));
        let mut scene = MemoryScene::new(doc, Camera::looking_at(Vec3::ZERO, 10.0, 1600.0, 900.0));
        scene.local_view = true;
        scene
    }

    #[test]
    fn test_finish_restores_and_returns_last_result() {
        let mut scene = isolated_scene();
        let corner = scene.camera.world_to_screen(Vec3::new(1.0, 1.0, 1.0)).unwrap();

        let mut session = SnapSession::start(&mut scene, SnapConfig::default()).unwrap();
        assert!(session.host().is_hidden(&ObjectId::from("Other")));
        let result = session.set_category(FeatureCategory::Vertex, Vec2::new(800.0, 450.0)).unwrap();
        assert!(!result.snapped);
        session.query_now(corner).unwrap();
        let last = session.finish().unwrap();

        assert!(last.snapped);
        assert_eq!(last.object, Some(ObjectId::from("Cube")));
        assert!(!scene.is_hidden(&ObjectId::from("Other")));
        assert!(scene.recovery().is_none());
    }

    #[test]
    fn test_drop_restores_scene() {
        let mut scene = isolated_scene();
        {
            let session = SnapSession::start(&mut scene, SnapConfig::default()).unwrap();
            assert!(!session.engine().hidden_objects().is_empty());
        }
        assert!(!scene.is_hidden(&ObjectId::from("Other")));
        assert!(scene.recovery().is_none());
    }

    #[test]
    fn test_pointer_moves_are_debounced() {
        let mut scene = isolated_scene();
        let mut session = SnapSession::start(&mut scene, SnapConfig::default()).unwrap();
        session.set_category(FeatureCategory::Vertex, Vec2::new(800.0, 450.0)).unwrap();
        let casts = session.host().ray_cast_count();

        // A burst of moves collapses into one query at the final position
        session.pointer_moved(Vec2::new(700.0, 400.0), 0.0);
        session.pointer_moved(Vec2::new(750.0, 420.0), 0.004);
        session.pointer_moved(Vec2::new(790.0, 440.0), 0.008);
        assert!(session.tick(0.012).unwrap().is_none());
        assert!(session.has_pending());
        assert!(session.tick(0.02).unwrap().is_some());
        assert!(!session.has_pending());
        assert_eq!(session.host().ray_cast_count(), casts + 1);
        assert!(session.tick(0.05).unwrap().is_none());
    }

    #[test]
    fn test_start_without_region_leaves_host_untouched() {
        let mut scene = isolated_scene();
        scene.camera.set_viewport(0.0, 0.0);
        assert!(matches!(SnapSession::start(&mut scene, SnapConfig::default()), Err(SnapError::NoRegion)));
        assert!(!scene.is_hidden(&ObjectId::from("Other")));
    }
}
