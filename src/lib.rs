//! Just Snap: screen-space snapping for 3D viewports
//!
//! While a session is active the cursor snaps to the nearest origin, vertex,
//! edge midpoint or face center under it, measured in screen pixels. Only
//! features that are actually visible from the camera are offered unless the
//! viewport shades in X-ray.
//!
//! - `view` - vector math and the orbit camera
//! - `host` - viewport and scene traits, plus an in-memory scene
//! - `snap` - the snap engine itself
//! - `config` - tunable thresholds
//! - `recovery` - record of objects hidden by a local-view session

pub mod config;
pub mod error;
pub mod host;
pub mod recovery;
pub mod snap;
pub mod view;

pub use config::{ConfigError, SnapConfig};
pub use error::SnapError;
pub use host::{MemoryScene, ObjectId, SceneDocument, SnapHost};
pub use recovery::RecoveryRecord;
pub use snap::{FeatureCategory, SnapEngine, SnapResult, SnapSession};

/// Version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
