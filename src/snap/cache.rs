//! Per-category candidate caches
//!
//! Each category keeps its candidates in insertion order, a key lookup, the
//! set of objects already merged, and a KD-tree rebuilt after every merge
//! that changed the key set.

use super::extract::CandidateRecord;
use super::kdtree::{KdHit, KdTree};
use super::projector::ScreenKey;
use super::FeatureCategory;
use crate::host::ObjectId;
use crate::view::{Vec2, Vec3};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Default)]
pub struct CategoryCache {
    /// Insertion order doubles as the stable tie-break for equal distances
    entries: Vec<(ScreenKey, CandidateRecord)>,
    slots: HashMap<ScreenKey, usize>,
    merged: HashSet<ObjectId>,
    index: Option<KdTree>,
}

impl CategoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_merged(&self, id: &ObjectId) -> bool {
        self.merged.contains(id)
    }

    pub fn merged_count(&self) -> usize {
        self.merged.len()
    }

    pub fn index(&self) -> Option<&KdTree> {
        self.index.as_ref()
    }

    pub fn entry(&self, slot: usize) -> Option<&(ScreenKey, CandidateRecord)> {
        self.entries.get(slot)
    }

    pub fn get(&self, key: ScreenKey) -> Option<&CandidateRecord> {
        self.slots.get(&key).and_then(|&slot| self.entries.get(slot)).map(|(_, r)| r)
    }

    pub fn keys(&self) -> impl Iterator<Item = ScreenKey> + '_ {
        self.entries.iter().map(|(k, _)| *k)
    }

    pub fn records(&self) -> impl Iterator<Item = &CandidateRecord> {
        self.entries.iter().map(|(_, r)| r)
    }

    /// Insert one candidate. On a key collision the point closer to
    /// `reference` (the world point under that pixel) wins and keeps the slot.
    /// Returns true if the stored contents changed.
    pub fn insert(&mut self, key: ScreenKey, record: CandidateRecord, reference: Vec3) -> bool {
        match self.slots.get(&key) {
            Some(&slot) => {
                let existing = &mut self.entries[slot].1;
                if record.position.distance(reference) > existing.position.distance(reference) {
                    return false;
                }
                *existing = record;
                true
            }
            None => {
                self.slots.insert(key, self.entries.len());
                self.entries.push((key, record));
                true
            }
        }
    }

    /// Mark `object` merged and fold in its candidates.
    ///
    /// `reference` maps a key to the world point under that pixel. The index
    /// is rebuilt when anything changed. Returns the number of new keys.
    pub fn merge(
        &mut self,
        object: &ObjectId,
        candidates: Vec<(ScreenKey, CandidateRecord)>,
        reference: impl Fn(ScreenKey) -> Vec3,
    ) -> usize {
        self.merge_batch(vec![(object.clone(), candidates)], reference)
    }

    /// [`merge`](Self::merge) for several objects with a single index rebuild
    pub fn merge_batch(
        &mut self,
        batch: Vec<(ObjectId, Vec<(ScreenKey, CandidateRecord)>)>,
        reference: impl Fn(ScreenKey) -> Vec3,
    ) -> usize {
        let before = self.entries.len();
        let mut changed = false;
        for (object, candidates) in batch {
            self.merged.insert(object);
            for (key, record) in candidates {
                let r = reference(key);
                changed |= self.insert(key, record, r);
            }
        }
        if changed {
            self.rebuild_index();
        }
        self.entries.len() - before
    }

    /// Mark an object merged without adding candidates
    pub fn mark_merged(&mut self, object: &ObjectId) {
        self.merged.insert(object.clone());
    }

    pub fn rebuild_index(&mut self) {
        self.index = if self.entries.is_empty() {
            None
        } else {
            let points = self.entries.iter().enumerate().map(|(slot, (key, _))| (key.to_point(), slot)).collect();
            Some(KdTree::build(points))
        };
        log::debug!("rebuilt candidate index over {} keys", self.entries.len());
    }

    /// Range query sorted by ascending distance, ties by insertion order
    pub fn nearest_within(&self, center: Vec2, radius: f32) -> Vec<KdHit> {
        let Some(index) = &self.index else { return Vec::new() };
        let mut hits = index.within_radius(center, radius);
        hits.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.item.cmp(&b.item))
        });
        hits
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.slots.clear();
        self.merged.clear();
        self.index = None;
    }
}

/// One [`CategoryCache`] per feature category
#[derive(Debug, Default)]
pub struct SnapCache {
    records: [CategoryCache; 4],
}

impl SnapCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, category: FeatureCategory) -> &CategoryCache {
        &self.records[category.index()]
    }

    pub fn get_mut(&mut self, category: FeatureCategory) -> &mut CategoryCache {
        &mut self.records[category.index()]
    }

    /// Back to Empty for every category
    pub fn reset(&mut self) {
        for record in &mut self.records {
            record.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(object: &str, position: Vec3) -> CandidateRecord {
        CandidateRecord { position, object: ObjectId::from(object), feature: 0 }
    }

    #[test]
    fn test_collision_keeps_point_nearer_reference() {
        let mut cache = CategoryCache::new();
        let key = ScreenKey::new(10, 10);
        let reference = Vec3::new(0.0, 0.0, 10.0);

        assert!(cache.insert(key, record("Far", Vec3::new(0.0, 0.0, -5.0)), reference));
        assert!(cache.insert(key, record("Near", Vec3::new(0.0, 0.0, 2.0)), reference));
        assert!(!cache.insert(key, record("Farther", Vec3::new(0.0, 0.0, -9.0)), reference));

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(key).unwrap().object, ObjectId::from("Near"));
    }

    #[test]
    fn test_merge_marks_object_and_builds_index() {
        let mut cache = CategoryCache::new();
        let id = ObjectId::from("Cube");
        let added = cache.merge(
            &id,
            vec![
                (ScreenKey::new(0, 0), record("Cube", Vec3::ZERO)),
                (ScreenKey::new(5, 0), record("Cube", Vec3::X)),
            ],
            |_| Vec3::ZERO,
        );
        assert_eq!(added, 2);
        assert!(cache.is_merged(&id));
        assert_eq!(cache.index().map(|i| i.len()), Some(2));
    }

    #[test]
    fn test_merge_nothing_leaves_index_absent() {
        let mut cache = CategoryCache::new();
        let id = ObjectId::from("Offscreen");
        assert_eq!(cache.merge(&id, Vec::new(), |_| Vec3::ZERO), 0);
        assert!(cache.is_merged(&id));
        assert!(cache.index().is_none());
    }

    #[test]
    fn test_nearest_within_stable_ties() {
        let mut cache = CategoryCache::new();
        let id = ObjectId::from("A");
        cache.merge(
            &id,
            vec![
                (ScreenKey::new(10, 0), record("A", Vec3::X)),
                (ScreenKey::new(-10, 0), record("A", Vec3::Y)),
                (ScreenKey::new(0, 3), record("A", Vec3::Z)),
            ],
            |_| Vec3::ZERO,
        );
        let hits = cache.nearest_within(Vec2::ZERO, 200.0);
        let slots: Vec<usize> = hits.iter().map(|h| h.item).collect();
        assert_eq!(slots, vec![2, 0, 1]);
    }

    #[test]
    fn test_reset_clears_all_categories() {
        let mut cache = SnapCache::new();
        for category in FeatureCategory::ALL {
            cache.get_mut(category).mark_merged(&ObjectId::from("A"));
            cache.get_mut(category).insert(ScreenKey::new(1, 1), record("A", Vec3::ZERO), Vec3::ZERO);
        }
        cache.reset();
        for category in FeatureCategory::ALL {
            assert!(cache.get(category).is_empty());
            assert_eq!(cache.get(category).merged_count(), 0);
        }
    }
}
