//! Terrain mode: a scrolling waterfall of historical spectrum rows.

use glam::{Mat4, Vec3};
use std::f32::consts::PI;

use super::geometry::{lerp, ColorVertex, DrawList};
use super::{FrameInput, Renderer, SurfaceInfo};
use crate::audio::Impulse;
use crate::params::{ImpulseConfig, TerrainParams};

const LINE_COLOR: [f32; 3] = [0.2, 0.85, 1.0];

/// Fixed-depth history of spectrum rows; row 0 is the newest
#[derive(Debug, Clone)]
pub struct TerrainHistory {
    rows: usize,
    samples: usize,
    data: Vec<f32>,
}

impl TerrainHistory {
    pub fn new(rows: usize, samples: usize) -> Self {
        Self {
            rows,
            samples,
            data: vec![0.0; rows * samples],
        }
    }

    /// Age every row by one (evicting the oldest) and write `front` as row 0
    pub fn push(&mut self, front: &[f32]) {
        let s = self.samples;
        self.data.copy_within(..(self.rows - 1) * s, s);
        let padded = front.iter().chain(std::iter::repeat(&0.0_f32));
        for (dst, src) in self.data[..s].iter_mut().zip(padded) {
            *dst = *src;
        }
    }

    pub fn row(&self, index: usize) -> &[f32] {
        &self.data[index * self.samples..(index + 1) * self.samples]
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn samples(&self) -> usize {
        self.samples
    }

    fn values(&self) -> &[f32] {
        &self.data
    }
}

/// Half-sine taper across a row, attenuating both ends
pub fn taper(index: usize, samples: usize) -> f32 {
    (PI * (index as f32 + 0.5) / samples as f32).sin()
}

/// Opacity of a row by age; row 0 is opaque, the oldest is nearly clear
pub fn row_alpha(row: usize, rows: usize) -> f32 {
    1.0 - row as f32 / rows as f32
}

pub struct TerrainRenderer {
    params: TerrainParams,
    attached: bool,
    history: TerrainHistory,
    front: Vec<f32>,
    /// Displayed heights chasing `history`, same layout
    display: Vec<f32>,
    /// Line vertices, two per segment, updated in place
    vertices: Vec<ColorVertex>,
    bass: Impulse,
    offset: f32,
    tilt: f32,
}

impl TerrainRenderer {
    pub fn new(params: TerrainParams) -> Self {
        let (rows, samples) = (params.rows, params.samples);
        Self {
            history: TerrainHistory::new(rows, samples),
            front: vec![0.0; samples],
            display: vec![0.0; rows * samples],
            vertices: vec![ColorVertex::default(); rows * (samples - 1) * 2],
            bass: Impulse::new(ImpulseConfig::bass()),
            offset: params.base_offset,
            tilt: 0.0,
            attached: false,
            params,
        }
    }

    pub fn history(&self) -> &TerrainHistory {
        &self.history
    }

    pub fn display_row(&self, row: usize) -> &[f32] {
        let s = self.params.samples;
        &self.display[row * s..(row + 1) * s]
    }

    pub fn offset(&self) -> f32 {
        self.offset
    }

    /// Sample the front row from the spectrum with a fixed stride
    fn fill_front(&mut self, frame: &FrameInput) {
        let s = self.params.samples;
        let bins = frame.snapshot.frequency.len() as f32;
        let stride = ((bins * self.params.spectrum_fraction) as usize / s).max(1);
        for (j, value) in self.front.iter_mut().enumerate() {
            let raw = frame.snapshot.frequency_at(j * stride) as f32 / 255.0;
            *value = raw * taper(j, s);
        }
    }

    fn rebuild_vertices(&mut self) {
        let p = &self.params;
        let s = p.samples;
        let transform = Mat4::from_translation(Vec3::new(0.0, self.offset, 0.0))
            * Mat4::from_rotation_x(self.tilt);
        let dx = p.width / (s - 1) as f32;

        let mut slot = 0;
        for row in 0..p.rows {
            let z = -(row as f32) * p.row_spacing;
            let alpha = row_alpha(row, p.rows);
            let color = [LINE_COLOR[0], LINE_COLOR[1], LINE_COLOR[2], alpha];
            let heights = &self.display[row * s..(row + 1) * s];

            for j in 0..s - 1 {
                for k in [j, j + 1] {
                    let local = Vec3::new(-p.width / 2.0 + k as f32 * dx, heights[k], z);
                    self.vertices[slot] = ColorVertex::new(transform.transform_point3(local), color);
                    slot += 1;
                }
            }
        }
    }
}

impl Renderer for TerrainRenderer {
    fn attach(&mut self, _surface: &SurfaceInfo) {
        self.attached = true;
    }

    fn update(&mut self, frame: &FrameInput) {
        if !self.attached {
            return;
        }

        let bass = self.bass.update(frame.bands.bass);
        self.fill_front(frame);
        self.history.push(&self.front);

        let (follow, scale) = (self.params.follow, self.params.height_scale);
        for (shown, target) in self.display.iter_mut().zip(self.history.values()) {
            *shown = lerp(*shown, target * scale, follow);
        }

        let p = &self.params;
        self.offset = lerp(self.offset, p.base_offset + bass * p.bass_lift, p.offset_follow);
        self.tilt = (frame.time_s * p.tilt_rate).sin() * p.tilt_amplitude;

        self.rebuild_vertices();
    }

    fn draw(&self, list: &mut DrawList) {
        list.lines.extend_from_slice(&self.vertices);
    }

    fn detach(&mut self) {
        self.attached = false;
    }

    fn is_attached(&self) -> bool {
        self.attached
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::AnalyzerSnapshot;

    fn attached_terrain() -> TerrainRenderer {
        let mut terrain = TerrainRenderer::new(TerrainParams::default());
        terrain.attach(&SurfaceInfo {
            width: 800,
            height: 600,
        });
        terrain
    }

    #[test]
    fn test_history_ages_and_evicts() {
        let rows = 45;
        let mut history = TerrainHistory::new(rows, 80);

        let total = 100;
        for k in 0..total {
            history.push(&[k as f32; 80]);
            assert_eq!(history.row(0)[0], k as f32);
        }

        // Row R-1 holds the R-th most recent push; anything older is gone
        let newest = (total - 1) as f32;
        assert_eq!(history.row(rows - 1)[0], newest - (rows - 1) as f32);
        for r in 0..rows {
            assert!(history.row(r).iter().all(|&v| v == newest - r as f32));
        }
        let oldest_kept = newest - (rows - 1) as f32;
        assert!((0..rows).all(|r| history.row(r)[0] >= oldest_kept));
    }

    #[test]
    fn test_renderer_history_matches_params() {
        let params = TerrainParams {
            rows: 12,
            samples: 30,
            ..Default::default()
        };
        let terrain = TerrainRenderer::new(params);
        assert_eq!(terrain.history().rows(), 12);
        assert_eq!(terrain.history().samples(), 30);
        assert_eq!(terrain.display_row(11).len(), 30);
    }

    #[test]
    fn test_short_front_row_pads_with_zero() {
        let mut history = TerrainHistory::new(3, 4);
        history.push(&[1.0, 2.0]);
        assert_eq!(history.row(0), &[1.0, 2.0, 0.0, 0.0]);
    }

    #[test]
    fn test_taper_attenuates_edges() {
        let s = 80;
        assert!(taper(0, s) < 0.05);
        assert!(taper(s - 1, s) < 0.05);
        assert!(taper(s / 2, s) > 0.99);
    }

    #[test]
    fn test_row_alpha_fades_with_age() {
        assert_eq!(row_alpha(0, 45), 1.0);
        for r in 1..45 {
            assert!(row_alpha(r, 45) < row_alpha(r - 1, 45));
            assert!(row_alpha(r, 45) > 0.0);
        }
    }

    #[test]
    fn test_display_chases_history() {
        let mut terrain = attached_terrain();
        let snapshot = AnalyzerSnapshot::from_parts(vec![255; 1024], vec![128; 2048]);
        let centre = 40;

        terrain.update(&FrameInput::new(&snapshot, 0.0));
        let target = terrain.history().row(0)[centre] * 4.0;
        let first = terrain.display_row(0)[centre];
        assert!((first - target * 0.4).abs() < 1e-4);

        terrain.update(&FrameInput::new(&snapshot, 0.016));
        let second = terrain.display_row(0)[centre];
        assert!(second > first && second < target);
    }

    #[test]
    fn test_bass_lifts_offset_gradually() {
        let mut terrain = attached_terrain();
        let rest = terrain.offset();
        let snapshot = AnalyzerSnapshot::from_parts(vec![255; 1024], vec![128; 2048]);
        terrain.update(&FrameInput::new(&snapshot, 0.0));
        assert!(terrain.offset() > rest);
        assert!(terrain.offset() < rest + 1.5);
    }

    #[test]
    fn test_tiny_spectrum_does_not_panic() {
        let mut terrain = attached_terrain();
        let snapshot = AnalyzerSnapshot::from_parts(vec![100; 5], vec![]);
        terrain.update(&FrameInput::new(&snapshot, 0.0));
        let mut list = DrawList::default();
        terrain.draw(&mut list);
        assert_eq!(list.lines.len(), 45 * 79 * 2);
        assert!(list.lines.iter().all(|v| v.position.iter().all(|c| c.is_finite())));
    }
}
