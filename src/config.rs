//! Snap engine tuning
//!
//! Stored as RON. Every field has a default so partial files work.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Error type for config loading and validation
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(ron::error::SpannedError),
    Serialize(ron::Error),
    Invalid(String),
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<ron::error::SpannedError> for ConfigError {
    fn from(e: ron::error::SpannedError) -> Self {
        ConfigError::Parse(e)
    }
}

impl From<ron::Error> for ConfigError {
    fn from(e: ron::Error) -> Self {
        ConfigError::Serialize(e)
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Serialize(e) => write!(f, "Serialize error: {}", e),
            ConfigError::Invalid(msg) => write!(f, "Invalid config: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapConfig {
    /// A candidate closer than this (pixels, exclusive) is snapped to
    pub snap_radius_px: f32,
    /// Radius of the candidate range query (pixels, inclusive)
    pub search_radius_px: f32,
    /// Maximum nearby candidates reported when nothing is snapped
    pub max_nearby: usize,
    /// Inset of the visible region from the region border
    pub region_margin_px: f32,
    /// Offset toward the camera before a vertex/edge occlusion ray
    pub occlusion_epsilon: f32,
    /// Face occlusion rays start this many object sizes behind the face center
    pub face_ray_backoff: f32,
    /// Occlusion ray length in object sizes
    pub ray_length_factor: f32,
    /// Pointer-move coalescing window in seconds
    pub debounce_secs: f64,
    /// Ignore ray hits on faces that project smaller than `dense_face_area_px`
    pub ignore_dense_faces: bool,
    pub dense_face_area_px: f32,
}

impl Default for SnapConfig {
    fn default() -> Self {
        Self {
            snap_radius_px: 20.0,
            search_radius_px: 200.0,
            max_nearby: 6,
            region_margin_px: 20.0,
            occlusion_epsilon: 0.001,
            face_ray_backoff: 1.5,
            ray_length_factor: 2.0,
            debounce_secs: 0.01,
            ignore_dense_faces: false,
            dense_face_area_px: 3600.0,
        }
    }
}

impl SnapConfig {
    /// `<config dir>/just-snap/snap.ron`
    pub fn default_path() -> PathBuf {
        #[cfg(not(target_arch = "wasm32"))]
        let base = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        #[cfg(target_arch = "wasm32")]
        let base = PathBuf::from(".");
        base.join("just-snap").join("snap.ron")
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("snap_radius_px", self.snap_radius_px),
            ("search_radius_px", self.search_radius_px),
            ("occlusion_epsilon", self.occlusion_epsilon),
            ("face_ray_backoff", self.face_ray_backoff),
            ("ray_length_factor", self.ray_length_factor),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::Invalid(format!("{} must be positive, got {}", name, value)));
            }
        }
        if !self.region_margin_px.is_finite() || self.region_margin_px < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "region_margin_px must not be negative, got {}", self.region_margin_px
            )));
        }
        if !self.debounce_secs.is_finite() || self.debounce_secs < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "debounce_secs must not be negative, got {}", self.debounce_secs
            )));
        }
        if !self.dense_face_area_px.is_finite() || self.dense_face_area_px < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "dense_face_area_px must not be negative, got {}", self.dense_face_area_px
            )));
        }
        if self.max_nearby == 0 {
            return Err(ConfigError::Invalid("max_nearby must be at least 1".to_string()));
        }
        if self.snap_radius_px > self.search_radius_px {
            return Err(ConfigError::Invalid(format!(
                "snap_radius_px ({}) exceeds search_radius_px ({})",
                self.snap_radius_px, self.search_radius_px
            )));
        }
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config: SnapConfig = ron::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` if it exists, defaults otherwise
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            log::debug!("no config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::load(path)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::new())?;
        fs::write(path, contents)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(SnapConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: SnapConfig = ron::from_str("(snap_radius_px: 12.0)").unwrap();
        assert_eq!(config.snap_radius_px, 12.0);
        assert_eq!(config.search_radius_px, 200.0);
        assert_eq!(config.max_nearby, 6);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = SnapConfig { max_nearby: 0, ..Default::default() };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let config = SnapConfig { snap_radius_px: 300.0, ..Default::default() };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let config = SnapConfig { search_radius_px: f32::NAN, ..Default::default() };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snap.ron");
        let config = SnapConfig { ignore_dense_faces: true, max_nearby: 4, ..Default::default() };
        config.save(&path).unwrap();
        assert_eq!(SnapConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = SnapConfig::load_or_default(dir.path().join("absent.ron")).unwrap();
        assert_eq!(config, SnapConfig::default());
    }

    #[test]
    fn test_load_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snap.ron");
        fs::write(&path, "(snap_radius_px: \"wide\")").unwrap();
        assert!(matches!(SnapConfig::load(&path), Err(ConfigError::Parse(_))));
    }
}
