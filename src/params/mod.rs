//! Parameter definitions with units and documented semantics.
//!
//! All tuned constants live here with:
//! - Units (radians per frame, bins, seconds, etc.)
//! - Documented ranges and meanings
//! - Validation where a bad value could poison per-frame maths

mod audio;
mod camera;
mod render;
mod scene;

// Re-export all types
pub use audio::{bands, AnalyzerConfig, ImpulseConfig};
pub use camera::CameraParams;
pub use render::{RecordingConfig, RenderConfig};
pub use scene::{CrowdParams, OrbParams, TerrainParams, WallParams};
