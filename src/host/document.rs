//! Scene documents for the viewer
//!
//! Uses RON (Rusty Object Notation) for human-readable scene files.
//! Supports both compressed (brotli) and uncompressed RON files.
//! - Reading: Auto-detects format by checking for valid RON start
//! - Writing: Always uses brotli compression

use super::mesh::MeshTopology;
use super::ObjectId;
use crate::recovery::RecoveryRecord;
use crate::view::{Mat4, Vec3, mat4_from_position_rotation_scale};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Cursor;
use std::path::Path;

/// Validation limits for scene files
pub mod limits {
    /// Maximum number of objects in a scene
    pub const MAX_OBJECTS: usize = 4096;
    /// Maximum vertices in an inline mesh
    pub const MAX_VERTICES: usize = 1_000_000;
    /// Maximum sides of a prism primitive
    pub const MAX_PRISM_SIDES: usize = 256;
    /// Maximum coordinate value (prevents overflow issues)
    pub const MAX_COORD: f32 = 1_000_000.0;
}

/// Error type for scene document loading and saving
#[derive(Debug)]
pub enum DocumentError {
    IoError(std::io::Error),
    ParseError(ron::error::SpannedError),
    SerializeError(ron::Error),
    ValidationError(String),
}

impl From<std::io::Error> for DocumentError {
    fn from(e: std::io::Error) -> Self {
        DocumentError::IoError(e)
    }
}

impl From<ron::error::SpannedError> for DocumentError {
    fn from(e: ron::error::SpannedError) -> Self {
        DocumentError::ParseError(e)
    }
}

impl From<ron::Error> for DocumentError {
    fn from(e: ron::Error) -> Self {
        DocumentError::SerializeError(e)
    }
}

impl std::fmt::Display for DocumentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocumentError::IoError(e) => write!(f, "IO error: {}", e),
            DocumentError::ParseError(e) => write!(f, "Parse error: {}", e),
            DocumentError::SerializeError(e) => write!(f, "Serialize error: {}", e),
            DocumentError::ValidationError(e) => write!(f, "Validation error: {}", e),
        }
    }
}

impl std::error::Error for DocumentError {}

/// Geometry source of a scene object
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Primitive {
    Cube { size: f32 },
    Plane { size: f32 },
    Pyramid { base: f32, height: f32 },
    Prism { sides: usize, radius: f32, height: f32 },
    Mesh(MeshTopology),
    /// Transform only, nothing to render
    Empty,
}

impl Primitive {
    /// Local-space topology, `None` for objects without renderable geometry
    pub fn build(&self) -> Option<MeshTopology> {
        let mesh = match self {
            Primitive::Cube { size } => MeshTopology::cube(*size),
            Primitive::Plane { size } => MeshTopology::plane(*size),
            Primitive::Pyramid { base, height } => MeshTopology::pyramid(*base, *height),
            Primitive::Prism { sides, radius, height } => MeshTopology::prism(*sides, *radius, *height),
            Primitive::Mesh(mesh) => mesh.clone().sanitized(),
            Primitive::Empty => return None,
        };
        if mesh.is_empty() {
            None
        } else {
            Some(mesh)
        }
    }
}

fn default_scale() -> Vec3 {
    Vec3::splat(1.0)
}

/// One object in a scene document
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ObjectDesc {
    pub name: String,
    pub primitive: Primitive,
    pub position: Vec3,
    /// Euler angles in degrees
    #[serde(default)]
    pub rotation: Vec3,
    #[serde(default = "default_scale")]
    pub scale: Vec3,
    #[serde(default)]
    pub hidden: bool,
    /// Member of the isolated local view
    #[serde(default)]
    pub local: bool,
}

impl ObjectDesc {
    pub fn new(name: impl Into<String>, primitive: Primitive, position: Vec3) -> Self {
        Self {
            name: name.into(),
            primitive,
            position,
            rotation: Vec3::ZERO,
            scale: default_scale(),
            hidden: false,
            local: false,
        }
    }

    pub fn with_rotation(mut self, rotation: Vec3) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_local(mut self, local: bool) -> Self {
        self.local = local;
        self
    }

    pub fn id(&self) -> ObjectId {
        ObjectId::new(self.name.clone())
    }

    pub fn transform(&self) -> Mat4 {
        mat4_from_position_rotation_scale(self.position, self.rotation, self.scale)
    }
}

/// A scene: a flat list of named objects
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneDocument {
    pub objects: Vec<ObjectDesc>,
}

impl SceneDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Small built-in scene used when the viewer starts without a file
    pub fn sample() -> Self {
        Self {
            objects: vec![
                ObjectDesc::new("Cube", Primitive::Cube { size: 2.0 }, Vec3::ZERO).with_local(true),
                ObjectDesc::new("Pyramid", Primitive::Pyramid { base: 2.0, height: 2.0 }, Vec3::new(3.5, -1.0, -1.0))
                    .with_rotation(Vec3::new(0.0, 30.0, 0.0)),
                ObjectDesc::new("Column", Primitive::Prism { sides: 8, radius: 0.8, height: 3.0 }, Vec3::new(-3.5, -1.5, -2.0)),
                ObjectDesc::new("Floor", Primitive::Plane { size: 12.0 }, Vec3::new(0.0, -1.5, 0.0)),
                ObjectDesc::new("Anchor", Primitive::Empty, Vec3::new(0.0, 2.5, 0.0)),
            ],
        }
    }

    pub fn add(&mut self, object: ObjectDesc) {
        self.objects.push(object);
    }

    pub fn find(&self, id: &ObjectId) -> Option<&ObjectDesc> {
        self.objects.iter().find(|o| o.name == id.0)
    }

    pub fn find_mut(&mut self, id: &ObjectId) -> Option<&mut ObjectDesc> {
        self.objects.iter_mut().find(|o| o.name == id.0)
    }

    /// Un-hide every object listed in the record. Returns how many changed.
    pub fn apply_recovery(&mut self, record: &RecoveryRecord) -> usize {
        let mut restored = 0;
        for id in &record.hidden {
            if let Some(obj) = self.find_mut(id) {
                if obj.hidden {
                    obj.hidden = false;
                    restored += 1;
                }
            }
        }
        restored
    }

    pub fn validate(&self) -> Result<(), DocumentError> {
        if self.objects.len() > limits::MAX_OBJECTS {
            return Err(DocumentError::ValidationError(format!(
                "too many objects ({} > {})", self.objects.len(), limits::MAX_OBJECTS
            )));
        }

        let mut names = std::collections::HashSet::new();
        for obj in &self.objects {
            if !names.insert(obj.name.as_str()) {
                return Err(DocumentError::ValidationError(format!(
                    "duplicate object name '{}'", obj.name
                )));
            }
            for v in [obj.position, obj.rotation, obj.scale] {
                if !v.is_finite() || v.x.abs().max(v.y.abs()).max(v.z.abs()) > limits::MAX_COORD {
                    return Err(DocumentError::ValidationError(format!(
                        "object '{}' has an invalid transform", obj.name
                    )));
                }
            }
            match &obj.primitive {
                Primitive::Prism { sides, .. } if *sides > limits::MAX_PRISM_SIDES => {
                    return Err(DocumentError::ValidationError(format!(
                        "object '{}': too many prism sides ({} > {})", obj.name, sides, limits::MAX_PRISM_SIDES
                    )));
                }
                Primitive::Mesh(mesh) if mesh.vertices.len() > limits::MAX_VERTICES => {
                    return Err(DocumentError::ValidationError(format!(
                        "object '{}': too many vertices ({} > {})", obj.name, mesh.vertices.len(), limits::MAX_VERTICES
                    )));
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Load a scene from a RON string
    pub fn load_from_str(s: &str) -> Result<Self, DocumentError> {
        let doc: SceneDocument = ron::from_str(s)?;
        doc.validate()?;
        Ok(doc)
    }

    /// Load a scene file, plain or brotli-compressed RON
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, DocumentError> {
        let path = path.as_ref();
        let contents = decode_scene_bytes(fs::read(path)?)?;
        Self::load_from_str(&contents).inspect_err(|e| {
            if let DocumentError::ParseError(parse) = e {
                log::error!("scene {} does not parse: {}", path.display(), parse);
            }
        })
    }

    pub fn to_ron_string(&self) -> Result<String, DocumentError> {
        let config = ron::ser::PrettyConfig::new()
            .depth_limit(4)
            .indentor("  ".to_string());
        Ok(ron::ser::to_string_pretty(self, config)?)
    }

    /// Write the scene as brotli-compressed RON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), DocumentError> {
        let text = self.to_ron_string()?;
        let params = brotli::enc::BrotliEncoderParams { quality: 6, lgwin: 22, ..Default::default() };
        let mut compressed = Vec::new();
        brotli::BrotliCompress(&mut Cursor::new(text.as_bytes()), &mut compressed, &params)
            .map_err(|e| invalid_data(format!("scene compression failed: {}", e)))?;
        fs::write(path, compressed)?;
        Ok(())
    }
}

fn invalid_data(message: String) -> DocumentError {
    DocumentError::IoError(std::io::Error::new(std::io::ErrorKind::InvalidData, message))
}

/// Scene text from file bytes. Plain RON opens with `(` or whitespace.
fn decode_scene_bytes(bytes: Vec<u8>) -> Result<String, DocumentError> {
    let plain = matches!(bytes.first(), Some(b'(' | b' ' | b'\n' | b'\r' | b'\t'));
    let text = if plain {
        bytes
    } else {
        let mut inflated = Vec::new();
        brotli::BrotliDecompress(&mut Cursor::new(&bytes), &mut inflated)
            .map_err(|e| invalid_data(format!("scene is neither RON nor brotli: {}", e)))?;
        inflated
    };
    String::from_utf8(text).map_err(|e| invalid_data(format!("scene is not UTF-8: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_is_valid() {
        let doc = SceneDocument::sample();
        assert!(doc.validate().is_ok());
        assert!(doc.find(&ObjectId::from("Cube")).is_some());
    }

    #[test]
    fn test_empty_primitive_has_no_mesh() {
        assert!(Primitive::Empty.build().is_none());
        assert!(Primitive::Mesh(MeshTopology::new()).build().is_none());
        assert!(Primitive::Cube { size: 1.0 }.build().is_some());
    }

    #[test]
    fn test_save_compressed_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scene.ron");
        let mut doc = SceneDocument::sample();
        doc.objects[1].hidden = true;
        doc.save(&path).unwrap();

        let bytes = fs::read(&path).unwrap();
        assert_ne!(bytes.first(), Some(&b'('), "saved file should be compressed");

        let loaded = SceneDocument::load(&path).unwrap();
        assert_eq!(loaded, doc);
    }

    #[test]
    fn test_load_plain_ron() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plain.ron");
        let doc = SceneDocument::sample();
        fs::write(&path, doc.to_ron_string().unwrap()).unwrap();
        assert_eq!(SceneDocument::load(&path).unwrap(), doc);
    }

    #[test]
    fn test_load_garbage_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.ron");
        fs::write(&path, [0xffu8, 0x00, 0x13, 0x37]).unwrap();
        assert!(SceneDocument::load(&path).is_err());
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let mut doc = SceneDocument::new();
        doc.add(ObjectDesc::new("A", Primitive::Empty, Vec3::ZERO));
        doc.add(ObjectDesc::new("A", Primitive::Empty, Vec3::ZERO));
        assert!(matches!(doc.validate(), Err(DocumentError::ValidationError(_))));
    }

    #[test]
    fn test_apply_recovery_unhides_listed_objects() {
        let mut doc = SceneDocument::sample();
        doc.objects[1].hidden = true;
        doc.objects[2].hidden = true;
        let record = RecoveryRecord::new(vec![ObjectId::from("Pyramid"), ObjectId::from("Missing")]);
        assert_eq!(doc.apply_recovery(&record), 1);
        assert!(!doc.objects[1].hidden);
        assert!(doc.objects[2].hidden);
    }
}
