//! vibe-visualizer library - audio-reactive scenes with frame capture

pub mod audio;
pub mod camera;
pub mod capture;
pub mod cli;
pub mod error;
pub mod params;
pub mod pipeline;
pub mod rendering;
pub mod scene;

pub use error::{Result, VisualizerError};
