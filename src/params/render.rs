//! Rendering and recording configuration.

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

/// Rendering configuration
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Window width (pixels)
    pub window_width: u32,

    /// Window height (pixels)
    pub window_height: u32,

    /// Vertical field of view (degrees)
    pub fov_degrees: f32,

    /// Near clipping plane (world units)
    pub near_plane: f32,

    /// Far clipping plane (world units)
    pub far_plane: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            window_width: 1280,
            window_height: 720,
            fov_degrees: 55.0,
            near_plane: 0.1,
            far_plane: 500.0,
        }
    }
}

impl RenderConfig {
    pub fn aspect_ratio(&self) -> f32 {
        self.window_width as f32 / self.window_height.max(1) as f32
    }
}

/// Recording mode configuration
#[derive(Debug, Clone)]
pub struct RecordingConfig {
    /// Directory the finished video is written into
    pub output_dir: PathBuf,

    /// Target capture rate (FPS)
    pub fps: u32,

    /// Encoder executable
    pub ffmpeg_bin: String,

    /// Frames allowed in flight between the render thread and the encoder
    pub queue_depth: usize,
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            fps: 60,
            ffmpeg_bin: std::env::var("VIBE_FFMPEG").unwrap_or_else(|_| "ffmpeg".into()),
            queue_depth: 8,
        }
    }
}

impl RecordingConfig {
    /// Output file name for a recording finalized at `unix_ms`
    pub fn file_name(unix_ms: u128) -> String {
        format!("vibe-visualizer-{unix_ms}.webm")
    }

    /// Full output path for a recording finalized now
    pub fn output_path(&self) -> PathBuf {
        let unix_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        self.output_dir.join(Self::file_name(unix_ms))
    }
}
