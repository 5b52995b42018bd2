//! Host viewport and scene interfaces
//!
//! The snap engine never owns a camera or a scene graph. It talks to the
//! application through the two traits here:
//!
//! - [`Viewport`] - projection, unprojection, camera state and shading mode
//!   for the active 3D region
//! - [`SceneHost`] - the object list, scene ray casts, and the hide/show
//!   workaround used inside an isolated local view
//!
//! `memory` provides an in-memory implementation backed by a
//! [`SceneDocument`](document::SceneDocument), used by the viewer binary and
//! by the tests.

pub mod document;
pub mod memory;
pub mod mesh;

use crate::recovery::RecoveryRecord;
use crate::view::{Mat4, Vec2, Vec3};
use serde::{Deserialize, Serialize};
use std::fmt;

pub use document::{DocumentError, ObjectDesc, Primitive, SceneDocument};
pub use memory::MemoryScene;
pub use mesh::{Face, MeshTopology};

/// Scene object identifier (the object's name)
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId(pub String);

impl ObjectId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ObjectId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Viewport shading type with its own X-ray toggle
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Shading {
    Wireframe { xray: bool },
    Solid { xray: bool },
    Material,
    Rendered,
}

impl Shading {
    /// Whether geometry is drawn see-through, which disables occlusion culling
    pub fn xray(&self) -> bool {
        match *self {
            Shading::Wireframe { xray } | Shading::Solid { xray } => xray,
            Shading::Material | Shading::Rendered => false,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Shading::Wireframe { .. } => "Wireframe",
            Shading::Solid { .. } => "Solid",
            Shading::Material => "Material",
            Shading::Rendered => "Rendered",
        }
    }
}

impl Default for Shading {
    fn default() -> Self {
        Shading::Solid { xray: false }
    }
}

/// Result of a scene ray cast
#[derive(Clone, Debug, PartialEq)]
pub struct SceneHit {
    pub location: Vec3,
    pub object: ObjectId,
    pub face_index: usize,
}

/// A visible mesh object as the host hands it over
#[derive(Clone, Debug)]
pub struct MeshObject {
    pub id: ObjectId,
    /// Local to world transform
    pub transform: Mat4,
    /// Local-space topology; `None` when the object has nothing renderable
    pub mesh: Option<MeshTopology>,
}

/// The active 3D region of the host
pub trait Viewport {
    /// Size of the drawable region in pixels, `None` when there is no usable region
    fn region_size(&self) -> Option<(f32, f32)>;

    /// World position to region pixels, `None` when it cannot be projected
    fn location_to_region(&self, world: Vec3) -> Option<Vec2>;

    /// Ray origin under a region pixel (on the near plane)
    fn region_to_origin(&self, region: Vec2) -> Vec3;

    /// View ray direction through a region pixel
    fn region_to_vector(&self, region: Vec2) -> Vec3;

    fn view_matrix(&self) -> Mat4;

    fn view_distance(&self) -> f32;

    fn shading(&self) -> Shading;
}

/// The scene graph of the host
pub trait SceneHost {
    /// Visible mesh objects. Inside a local view only the isolated ones.
    fn visible_meshes(&self) -> Vec<MeshObject>;

    /// Every visible object of any type, ignoring local view
    fn visible_objects(&self) -> Vec<ObjectId>;

    /// Whether the viewport is in an isolated local view
    fn local_view(&self) -> bool;

    /// Cast a ray against all non-hidden geometry, nearest hit only
    fn ray_cast(&self, origin: Vec3, direction: Vec3) -> Option<SceneHit>;

    fn set_hidden(&mut self, id: &ObjectId, hidden: bool);

    /// Store the recovery record where an external tool can find it
    fn record_recovery(&mut self, record: &RecoveryRecord);

    /// Forget the recovery record once visibility has been restored
    fn discard_recovery(&mut self);
}

/// Everything the snap engine needs from the application
pub trait SnapHost: Viewport + SceneHost {}

impl<T: Viewport + SceneHost> SnapHost for T {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_xray_flag_follows_shading_type() {
        assert!(Shading::Wireframe { xray: true }.xray());
        assert!(!Shading::Wireframe { xray: false }.xray());
        assert!(Shading::Solid { xray: true }.xray());
        assert!(!Shading::Material.xray());
        assert!(!Shading::Rendered.xray());
    }
}
