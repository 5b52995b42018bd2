//! Screen-space snapping
//!
//! The engine snapshots the visible meshes when a session starts, then
//! answers cursor queries with the nearest snappable feature of the active
//! category. Candidates are gathered lazily: an object's features are only
//! extracted once the cursor has pointed at it, and everything is thrown away
//! whenever the camera moves.
//!
//! - `geometry_cache` / `bvh` - frozen world-space topology and its ray index
//! - `projector` - screen keys, visible region, view-aligned footprints
//! - `extract` - per-object candidate extraction with self-occlusion
//! - `cache` / `kdtree` - per-category candidates and their 2D index
//! - `xray` - bounds-based picking for see-through shading
//! - `engine` - the query orchestrator
//! - `session` - owns the host and guarantees teardown
//! - `debounce` - pointer-move coalescing

pub mod bvh;
pub mod cache;
pub mod debounce;
pub mod engine;
pub mod extract;
pub mod geometry_cache;
pub mod kdtree;
pub mod projector;
pub mod session;
pub mod xray;

pub use cache::{CategoryCache, SnapCache};
pub use debounce::{Debouncer, PendingQuery};
pub use engine::SnapEngine;
pub use extract::{CandidateExtractor, CandidateRecord, Occlusion};
pub use geometry_cache::{GeometryCache, ObjectSnapshot};
pub use projector::{ScreenKey, ScreenProjector, VisibleRegion};
pub use session::SnapSession;

use crate::host::ObjectId;
use crate::view::Vec3;
use std::fmt;
use std::str::FromStr;

/// What kind of feature the cursor snaps to
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum FeatureCategory {
    #[default]
    Origin,
    Vertex,
    EdgeMidpoint,
    FaceCenter,
}

impl FeatureCategory {
    pub const ALL: [FeatureCategory; 4] = [
        FeatureCategory::Origin,
        FeatureCategory::Vertex,
        FeatureCategory::EdgeMidpoint,
        FeatureCategory::FaceCenter,
    ];

    pub fn index(self) -> usize {
        match self {
            FeatureCategory::Origin => 0,
            FeatureCategory::Vertex => 1,
            FeatureCategory::EdgeMidpoint => 2,
            FeatureCategory::FaceCenter => 3,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            FeatureCategory::Origin => "ORIGINS",
            FeatureCategory::Vertex => "POINTS",
            FeatureCategory::EdgeMidpoint => "MIDPOINTS",
            FeatureCategory::FaceCenter => "FACES",
        }
    }
}

impl fmt::Display for FeatureCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Unknown category name
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CategoryParseError(pub String);

impl fmt::Display for CategoryParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown snap category '{}'", self.0)
    }
}

impl std::error::Error for CategoryParseError {}

impl FromStr for FeatureCategory {
    type Err = CategoryParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ORIGINS" | "origin" => Ok(FeatureCategory::Origin),
            "POINTS" | "vertex" => Ok(FeatureCategory::Vertex),
            "MIDPOINTS" | "edge_midpoint" => Ok(FeatureCategory::EdgeMidpoint),
            "FACES" | "face_center" => Ok(FeatureCategory::FaceCenter),
            other => Err(CategoryParseError(other.to_string())),
        }
    }
}

/// Answer to one cursor query
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SnapResult {
    pub snapped: bool,
    /// Snapped world position
    pub location: Option<Vec3>,
    /// Owner of the snapped feature
    pub object: Option<ObjectId>,
    /// Nearest candidates when nothing snapped, closest first
    pub nearby: Vec<Vec3>,
}

impl SnapResult {
    pub fn miss() -> Self {
        Self::default()
    }

    pub fn hit(location: Vec3, object: ObjectId) -> Self {
        Self { snapped: true, location: Some(location), object: Some(object), nearby: Vec::new() }
    }

    pub fn near(nearby: Vec<Vec3>) -> Self {
        Self { nearby, ..Self::default() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_parse() {
        assert_eq!("POINTS".parse(), Ok(FeatureCategory::Vertex));
        assert_eq!("face_center".parse(), Ok(FeatureCategory::FaceCenter));
        assert_eq!("MIDPOINTS".parse::<FeatureCategory>().map(|c| c.label()), Ok("MIDPOINTS"));
        assert_eq!("corners".parse::<FeatureCategory>(), Err(CategoryParseError("corners".to_string())));
    }

    #[test]
    fn test_label_roundtrip() {
        for category in FeatureCategory::ALL {
            assert_eq!(category.label().parse(), Ok(category));
        }
    }
}
