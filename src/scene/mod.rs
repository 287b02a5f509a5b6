//! Audio-reactive scene renderers and the mode selector.
//!
//! Every renderer consumes the same [`FrameInput`] and writes its geometry
//! into a shared [`DrawList`]; exactly one renderer is attached at a time.

mod crowd;
mod geometry;
mod orb;
mod selector;
mod terrain;
mod wall;

use std::fmt;
use std::str::FromStr;

// Re-export public types
pub use crowd::{CharacterPose, CharacterSpec, CrowdRenderer, HairStyle, Reactivity};
pub use geometry::{icosahedron_edges, lerp, push_box, ColorVertex, DrawList, BOX_VERTEX_COUNT};
pub use orb::OrbRenderer;
pub use selector::{Scene, SceneParams, SceneSelector};
pub use terrain::{TerrainHistory, TerrainRenderer};
pub use wall::{pattern as wall_pattern, WallRenderer, WallUniforms};

use crate::audio::{AnalyzerSnapshot, BandEnergy};

/// Per-frame input shared by all renderers
#[derive(Debug, Clone, Copy)]
pub struct FrameInput<'a> {
    pub snapshot: &'a AnalyzerSnapshot,
    pub bands: BandEnergy,
    /// Wall-clock seconds since the visualizer started
    pub time_s: f32,
}

impl<'a> FrameInput<'a> {
    pub fn new(snapshot: &'a AnalyzerSnapshot, time_s: f32) -> Self {
        Self {
            snapshot,
            bands: snapshot.bands(),
            time_s,
        }
    }
}

/// Drawable surface dimensions handed to a renderer on attach
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceInfo {
    pub width: u32,
    pub height: u32,
}

impl SurfaceInfo {
    pub fn aspect_ratio(&self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }
}

/// Common capability of the four scene renderers
pub trait Renderer {
    /// Bind to a surface; only attached renderers mutate state
    fn attach(&mut self, surface: &SurfaceInfo);

    /// Advance one frame from the given audio features
    fn update(&mut self, frame: &FrameInput);

    /// Append this frame's geometry to `list`
    fn draw(&self, list: &mut DrawList);

    /// Release the per-frame subscription; later updates are ignored
    fn detach(&mut self);

    fn is_attached(&self) -> bool;
}

/// The four mutually exclusive visual modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SceneMode {
    Orb,
    Terrain,
    Crowd,
    Wall,
}

impl SceneMode {
    pub const ALL: [SceneMode; 4] = [Self::Orb, Self::Terrain, Self::Crowd, Self::Wall];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Orb => "orb",
            Self::Terrain => "terrain",
            Self::Crowd => "party",
            Self::Wall => "wall",
        }
    }

    /// Shared environment for this mode
    pub fn dressing(&self) -> SceneDressing {
        match self {
            Self::Orb => SceneDressing {
                sky_top: [0.02, 0.0, 0.06],
                sky_bottom: [0.12, 0.02, 0.18],
                fog_color: [0.08, 0.01, 0.12],
                fog_density: 0.025,
                draw_sky: true,
            },
            Self::Terrain => SceneDressing {
                sky_top: [0.0, 0.01, 0.05],
                sky_bottom: [0.02, 0.08, 0.16],
                fog_color: [0.01, 0.04, 0.1],
                fog_density: 0.035,
                draw_sky: true,
            },
            Self::Crowd => SceneDressing {
                sky_top: [0.05, 0.0, 0.1],
                sky_bottom: [0.3, 0.05, 0.25],
                fog_color: [0.2, 0.04, 0.2],
                fog_density: 0.02,
                draw_sky: true,
            },
            Self::Wall => SceneDressing {
                sky_top: [0.0; 3],
                sky_bottom: [0.0; 3],
                fog_color: [0.0; 3],
                fog_density: 0.0,
                draw_sky: false,
            },
        }
    }
}

impl fmt::Display for SceneMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SceneMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "orb" => Ok(Self::Orb),
            "terrain" => Ok(Self::Terrain),
            "crowd" | "party" => Ok(Self::Crowd),
            "wall" => Ok(Self::Wall),
            other => Err(format!("unknown scene mode '{other}'")),
        }
    }
}

/// Sky gradient and fog shared by the geometry-driven modes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneDressing {
    pub sky_top: [f32; 3],
    pub sky_bottom: [f32; 3],
    pub fog_color: [f32; 3],
    /// Exponential fog density per world unit
    pub fog_density: f32,
    pub draw_sky: bool,
}
