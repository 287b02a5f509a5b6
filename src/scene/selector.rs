//! Scene selection: exactly one attached renderer at a time.

use log::info;
use rand::rngs::StdRng;
use rand::SeedableRng;

use super::crowd::CrowdRenderer;
use super::geometry::DrawList;
use super::orb::OrbRenderer;
use super::terrain::TerrainRenderer;
use super::wall::WallRenderer;
use super::{FrameInput, Renderer, SceneDressing, SceneMode, SurfaceInfo};
use crate::error::Result;
use crate::params::{CrowdParams, OrbParams, TerrainParams, WallParams};

/// The active renderer, one variant per mode
pub enum Scene {
    Orb(OrbRenderer),
    Terrain(TerrainRenderer),
    Crowd(CrowdRenderer),
    Wall(WallRenderer),
}

impl Scene {
    pub fn mode(&self) -> SceneMode {
        match self {
            Self::Orb(_) => SceneMode::Orb,
            Self::Terrain(_) => SceneMode::Terrain,
            Self::Crowd(_) => SceneMode::Crowd,
            Self::Wall(_) => SceneMode::Wall,
        }
    }

    pub fn renderer(&self) -> &dyn Renderer {
        match self {
            Self::Orb(r) => r,
            Self::Terrain(r) => r,
            Self::Crowd(r) => r,
            Self::Wall(r) => r,
        }
    }

    pub fn renderer_mut(&mut self) -> &mut dyn Renderer {
        match self {
            Self::Orb(r) => r,
            Self::Terrain(r) => r,
            Self::Crowd(r) => r,
            Self::Wall(r) => r,
        }
    }
}

/// Per-mode parameters used when a scene is (re)built
#[derive(Debug, Clone, Default)]
pub struct SceneParams {
    pub orb: OrbParams,
    pub terrain: TerrainParams,
    pub crowd: CrowdParams,
    pub wall: WallParams,
}

impl SceneParams {
    /// Reject parameters that would break renderer construction or per-frame maths
    pub fn validate(&self) -> Result<()> {
        self.orb.validate()?;
        self.terrain.validate()?;
        self.crowd.validate()?;
        self.wall.validate()
    }
}

pub struct SceneSelector {
    params: SceneParams,
    surface: SurfaceInfo,
    rng: StdRng,
    scene: Scene,
}

impl SceneSelector {
    /// Build and attach the initial scene
    ///
    /// Without a seed the generator is drawn from the thread RNG, so crowds
    /// and particle halos differ between runs.
    pub fn new(mode: SceneMode, params: SceneParams, surface: SurfaceInfo, seed: Option<u64>) -> Self {
        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_rng(&mut rand::rng()),
        };
        let mut scene = build(mode, &params, &mut rng);
        scene.renderer_mut().attach(&surface);

        Self {
            params,
            surface,
            rng,
            scene,
        }
    }

    pub fn mode(&self) -> SceneMode {
        self.scene.mode()
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn dressing(&self) -> SceneDressing {
        self.mode().dressing()
    }

    /// Switch modes, detaching the old renderer before the new one attaches.
    /// Selecting the current mode keeps the running scene.
    pub fn switch(&mut self, mode: SceneMode) -> bool {
        if mode == self.mode() {
            return false;
        }
        self.scene.renderer_mut().detach();
        let mut next = build(mode, &self.params, &mut self.rng);
        next.renderer_mut().attach(&self.surface);
        let previous = std::mem::replace(&mut self.scene, next);
        drop(previous);

        info!("Scene: {}", mode);
        true
    }

    /// Re-attach the current renderer to a resized surface
    pub fn resize(&mut self, surface: SurfaceInfo) {
        self.surface = surface;
        self.scene.renderer_mut().attach(&surface);
    }

    pub fn update(&mut self, frame: &FrameInput) {
        self.scene.renderer_mut().update(frame);
    }

    /// Clear `list` and fill it with the active scene
    pub fn draw(&self, list: &mut DrawList) {
        list.clear();
        self.scene.renderer().draw(list);
    }
}

fn build(mode: SceneMode, params: &SceneParams, rng: &mut StdRng) -> Scene {
    match mode {
        SceneMode::Orb => Scene::Orb(OrbRenderer::new(params.orb.clone(), rng)),
        SceneMode::Terrain => Scene::Terrain(TerrainRenderer::new(params.terrain.clone())),
        SceneMode::Crowd => Scene::Crowd(CrowdRenderer::new(params.crowd.clone(), rng)),
        SceneMode::Wall => Scene::Wall(WallRenderer::new(params.wall.clone())),
    }
}
