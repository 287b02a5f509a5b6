//! One frame of audio-reactive animation, independent of the GPU.

use crate::audio::{Analyzer, AnalyzerSnapshot, SpectralSampler};
use crate::scene::{DrawList, FrameInput, SceneDressing, SceneMode, SceneSelector};

/// Sampler → renderer → draw list, run once per redraw
pub struct FramePipeline {
    sampler: SpectralSampler,
    selector: SceneSelector,
    draw_list: DrawList,
}

impl FramePipeline {
    pub fn new(selector: SceneSelector) -> Self {
        Self {
            sampler: SpectralSampler::new(),
            selector,
            draw_list: DrawList::default(),
        }
    }

    /// Pull a fresh snapshot, advance the active scene and rebuild its geometry
    pub fn tick(&mut self, analyzer: &mut dyn Analyzer, time_s: f32) -> &DrawList {
        let snapshot = self.sampler.sample(analyzer);
        let frame = FrameInput::new(snapshot, time_s);
        self.selector.update(&frame);
        self.selector.draw(&mut self.draw_list);
        &self.draw_list
    }

    pub fn switch(&mut self, mode: SceneMode) -> bool {
        self.selector.switch(mode)
    }

    pub fn mode(&self) -> SceneMode {
        self.selector.mode()
    }

    pub fn dressing(&self) -> SceneDressing {
        self.selector.dressing()
    }

    pub fn selector_mut(&mut self) -> &mut SceneSelector {
        &mut self.selector
    }

    pub fn snapshot(&self) -> &AnalyzerSnapshot {
        self.sampler.snapshot()
    }
}
