//! Snap engine errors

use crate::config::ConfigError;
use std::fmt;

#[derive(Debug)]
pub enum SnapError {
    /// The host has no usable 3D region to snap in
    NoRegion,
    /// Query after the engine was torn down
    TornDown,
    /// Second teardown of the same engine
    AlreadyTornDown,
    Config(ConfigError),
}

impl From<ConfigError> for SnapError {
    fn from(e: ConfigError) -> Self {
        SnapError::Config(e)
    }
}

impl fmt::Display for SnapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnapError::NoRegion => write!(f, "no 3D viewport region available"),
            SnapError::TornDown => write!(f, "snap engine queried after teardown"),
            SnapError::AlreadyTornDown => write!(f, "snap engine already torn down"),
            SnapError::Config(e) => write!(f, "config error: {}", e),
        }
    }
}

impl std::error::Error for SnapError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SnapError::Config(e) => Some(e),
            _ => None,
        }
    }
}
