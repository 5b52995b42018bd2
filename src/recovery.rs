//! Visibility recovery record
//!
//! Inside an isolated local view the engine hides every object outside the
//! isolation for the duration of a session. The list of hidden objects is
//! written out once at session start so that `cargo xtask recover` can
//! restore visibility if the session never reached its teardown.

use crate::host::ObjectId;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Objects hidden by a snap session that must be shown again
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecoveryRecord {
    pub hidden: Vec<ObjectId>,
    /// Unix timestamp of the session start
    #[serde(default)]
    pub created_at_secs: u64,
}

impl RecoveryRecord {
    pub fn new(hidden: Vec<ObjectId>) -> Self {
        Self { hidden, created_at_secs: now_unix() }
    }

    pub fn is_empty(&self) -> bool {
        self.hidden.is_empty()
    }

    /// Where the viewer writes the record unless told otherwise
    pub fn default_path() -> PathBuf {
        #[cfg(not(target_arch = "wasm32"))]
        let base = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        #[cfg(target_arch = "wasm32")]
        let base = PathBuf::from(".");
        base.join("just-snap").join("recovery.ron")
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::new())
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;
        fs::write(path, contents)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let contents = fs::read_to_string(path)?;
        ron::from_str(&contents)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))
    }
}

fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("recovery.ron");
        let record = RecoveryRecord::new(vec![ObjectId::from("Floor"), ObjectId::from("Column")]);
        record.save(&path).unwrap();
        assert_eq!(RecoveryRecord::load(&path).unwrap(), record);
    }

    #[test]
    fn test_load_garbage_is_invalid_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recovery.ron");
        fs::write(&path, "not ron at all {").unwrap();
        let err = RecoveryRecord::load(&path).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_default_path_file_name() {
        assert!(RecoveryRecord::default_path().ends_with("just-snap/recovery.ron"));
    }
}
