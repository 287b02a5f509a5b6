//! Crowd ("party") mode: a grid of figures bouncing to three bands.
//!
//! Appearance and reactivity are drawn from the RNG handed to
//! [`CrowdRenderer::new`]. The application passes an unseeded generator unless
//! `--seed` is given, so each new crowd looks different; this is cosmetic only.

use glam::{Mat4, Quat, Vec3};
use rand::Rng;
use std::ops::Range;

use super::geometry::{push_box, ColorVertex, DrawList};
use super::{FrameInput, Renderer, SurfaceInfo};
use crate::audio::BandImpulses;
use crate::params::CrowdParams;

/// Which band a figure bounces to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reactivity {
    Bass,
    Snare,
    High,
}

impl Reactivity {
    /// Weighted split into roughly equal thirds
    fn pick(rng: &mut impl Rng) -> Self {
        let roll: f32 = rng.random();
        if roll < 0.34 {
            Self::Bass
        } else if roll < 0.67 {
            Self::Snare
        } else {
            Self::High
        }
    }

    fn palette(&self) -> &'static [[f32; 3]] {
        match self {
            Self::Bass => &[[0.95, 0.25, 0.2], [1.0, 0.5, 0.1], [0.85, 0.1, 0.35]],
            Self::Snare => &[[0.2, 0.5, 1.0], [0.1, 0.8, 0.9], [0.45, 0.3, 0.95]],
            Self::High => &[[0.4, 0.95, 0.3], [0.95, 0.9, 0.2], [0.2, 0.9, 0.6]],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HairStyle {
    Spiky,
    Bob,
    Buns,
    Cap,
}

impl HairStyle {
    pub const ALL: [HairStyle; 4] = [Self::Spiky, Self::Bob, Self::Buns, Self::Cap];
}

const HAIR_COLORS: [[f32; 3]; 5] = [
    [0.08, 0.05, 0.03],
    [0.45, 0.25, 0.1],
    [0.95, 0.8, 0.35],
    [0.9, 0.2, 0.6],
    [0.3, 0.9, 0.95],
];

const SKIN: [f32; 4] = [0.95, 0.78, 0.62, 1.0];

/// Immutable per-figure record, generated once per crowd
#[derive(Debug, Clone, PartialEq)]
pub struct CharacterSpec {
    pub row: usize,
    pub col: usize,
    /// Resting world position of the figure's feet
    pub home: Vec3,
    pub body_color: [f32; 3],
    pub hair_color: [f32; 3],
    pub hair_style: HairStyle,
    pub reactivity: Reactivity,
    /// Grows with depth and distance from the centre column
    pub delay: f32,
}

/// Per-frame animation state of one figure
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CharacterPose {
    /// Bounce plus idle sway; negative while landing
    pub effective: f32,
    pub lift: f32,
    pub scale_x: f32,
    pub scale_y: f32,
    pub yaw: f32,
}

pub struct CrowdRenderer {
    params: CrowdParams,
    attached: bool,
    characters: Vec<CharacterSpec>,
    poses: Vec<CharacterPose>,
    impulses: BandImpulses,
    /// Model-space meshes of all figures, back to back
    model: Vec<ColorVertex>,
    /// Vertex range of each figure in `model`
    spans: Vec<Range<usize>>,
    /// World-space copy of `model`, updated in place
    vertices: Vec<ColorVertex>,
}

impl CrowdRenderer {
    pub fn new(params: CrowdParams, rng: &mut impl Rng) -> Self {
        let characters = generate_characters(&params, rng);

        let mut model = Vec::new();
        let mut spans = Vec::with_capacity(characters.len());
        for character in &characters {
            let start = model.len();
            build_figure(&mut model, character);
            spans.push(start..model.len());
        }

        Self {
            poses: vec![CharacterPose::default(); characters.len()],
            impulses: BandImpulses::default(),
            vertices: model.clone(),
            model,
            spans,
            characters,
            attached: false,
            params,
        }
    }

    pub fn characters(&self) -> &[CharacterSpec] {
        &self.characters
    }

    pub fn poses(&self) -> &[CharacterPose] {
        &self.poses
    }

    pub fn impulses(&self) -> &BandImpulses {
        &self.impulses
    }

    fn impulse_for(&self, reactivity: Reactivity) -> f32 {
        match reactivity {
            Reactivity::Bass => self.impulses.bass.value(),
            Reactivity::Snare => self.impulses.snare.value(),
            Reactivity::High => self.impulses.high.value(),
        }
    }

    fn pose(&self, character: &CharacterSpec, time_s: f32) -> CharacterPose {
        let p = &self.params;
        let bounce = (self.impulse_for(character.reactivity) - character.delay * p.delay_falloff)
            .max(0.0);
        let sway = (time_s * 2.1 + character.row as f32 * 0.9 + character.col as f32 * 1.7).sin()
            * p.sway_amplitude;
        let effective = bounce + sway;

        CharacterPose {
            effective,
            lift: effective.max(0.0) * p.jump_height,
            scale_x: 1.0 - effective * p.squash,
            scale_y: 1.0 + effective * p.stretch,
            // Linearized turn toward the forward point; exact aim is not needed at this distance
            yaw: -character.home.x * p.yaw_per_unit,
        }
    }
}

impl Renderer for CrowdRenderer {
    fn attach(&mut self, _surface: &SurfaceInfo) {
        self.attached = true;
    }

    fn update(&mut self, frame: &FrameInput) {
        if !self.attached {
            return;
        }

        self.impulses.update(&frame.bands);

        for i in 0..self.characters.len() {
            let pose = self.pose(&self.characters[i], frame.time_s);
            self.poses[i] = pose;

            let home = self.characters[i].home;
            let transform = Mat4::from_scale_rotation_translation(
                Vec3::new(pose.scale_x, pose.scale_y, pose.scale_x),
                Quat::from_rotation_y(pose.yaw),
                home + Vec3::new(0.0, pose.lift, 0.0),
            );
            let span = self.spans[i].clone();
            for (dst, src) in self.vertices[span.clone()].iter_mut().zip(&self.model[span]) {
                let position = transform.transform_point3(Vec3::from_array(src.position));
                *dst = ColorVertex::new(position, src.color);
            }
        }
    }

    fn draw(&self, list: &mut DrawList) {
        list.triangles.extend_from_slice(&self.vertices);
    }

    fn detach(&mut self) {
        self.attached = false;
    }

    fn is_attached(&self) -> bool {
        self.attached
    }
}

fn generate_characters(params: &CrowdParams, rng: &mut impl Rng) -> Vec<CharacterSpec> {
    let centre = (params.cols as f32 - 1.0) / 2.0;
    let (sx, sz) = params.spacing;
    let mut characters = Vec::with_capacity(params.count());

    for row in 0..params.rows {
        for col in 0..params.cols {
            let reactivity = Reactivity::pick(rng);
            let palette = reactivity.palette();
            let offset = col as f32 - centre;

            characters.push(CharacterSpec {
                row,
                col,
                home: Vec3::new(offset * sx, 0.0, -(row as f32) * sz),
                body_color: palette[rng.random_range(0..palette.len())],
                hair_color: HAIR_COLORS[rng.random_range(0..HAIR_COLORS.len())],
                hair_style: HairStyle::ALL[rng.random_range(0..HairStyle::ALL.len())],
                reactivity,
                delay: row as f32 * params.row_delay + offset.abs() * params.col_delay,
            });
        }
    }
    characters
}

/// Model-space figure with feet at the origin, facing +z
fn build_figure(out: &mut Vec<ColorVertex>, character: &CharacterSpec) {
    let id = Mat4::IDENTITY;
    let [r, g, b] = character.body_color;
    let body = [r, g, b, 1.0];
    let [r, g, b] = character.hair_color;
    let hair = [r, g, b, 1.0];

    push_box(out, id, Vec3::new(0.0, 0.55, 0.0), Vec3::new(0.28, 0.45, 0.2), body);
    push_box(out, id, Vec3::new(0.0, 1.25, 0.0), Vec3::splat(0.22), SKIN);

    match character.hair_style {
        HairStyle::Spiky => {
            for x in [-0.13, 0.0, 0.13] {
                push_box(out, id, Vec3::new(x, 1.56, 0.0), Vec3::new(0.05, 0.12, 0.05), hair);
            }
        }
        HairStyle::Bob => {
            push_box(out, id, Vec3::new(0.0, 1.33, -0.05), Vec3::new(0.26, 0.2, 0.22), hair);
        }
        HairStyle::Buns => {
            push_box(out, id, Vec3::new(0.0, 1.49, 0.0), Vec3::new(0.23, 0.03, 0.23), hair);
            for x in [-0.2, 0.2] {
                push_box(out, id, Vec3::new(x, 1.55, 0.0), Vec3::splat(0.09), hair);
            }
        }
        HairStyle::Cap => {
            push_box(out, id, Vec3::new(0.0, 1.52, 0.0), Vec3::new(0.24, 0.06, 0.24), hair);
            push_box(out, id, Vec3::new(0.0, 1.47, 0.32), Vec3::new(0.2, 0.02, 0.1), hair);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::AnalyzerSnapshot;
    use rand::{rngs::StdRng, SeedableRng};
    use std::collections::HashSet;

    fn crowd(seed: u64) -> CrowdRenderer {
        let mut crowd = CrowdRenderer::new(CrowdParams::default(), &mut StdRng::seed_from_u64(seed));
        crowd.attach(&SurfaceInfo {
            width: 1280,
            height: 720,
        });
        crowd
    }

    fn bass_hit() -> AnalyzerSnapshot {
        let mut freq = vec![0u8; 1024];
        freq[..4].fill(255);
        AnalyzerSnapshot::from_parts(freq, vec![128; 2048])
    }

    #[test]
    fn test_default_grid_has_98_valid_characters() {
        let crowd = crowd(1);
        assert_eq!(crowd.characters().len(), 98);
        for c in crowd.characters() {
            assert!(HairStyle::ALL.contains(&c.hair_style));
            assert!(matches!(
                c.reactivity,
                Reactivity::Bass | Reactivity::Snare | Reactivity::High
            ));
            assert!(c.delay >= 0.0);
        }
    }

    #[test]
    fn test_reactivity_split_is_roughly_thirds() {
        let crowd = CrowdRenderer::new(
            CrowdParams {
                rows: 30,
                cols: 30,
                ..Default::default()
            },
            &mut StdRng::seed_from_u64(99),
        );
        let count = |r| crowd.characters().iter().filter(|c| c.reactivity == r).count();
        for r in [Reactivity::Bass, Reactivity::Snare, Reactivity::High] {
            let n = count(r);
            assert!((220..=380).contains(&n), "{r:?}: {n}");
        }
        let styles: HashSet<_> = crowd.characters().iter().map(|c| c.hair_style).collect();
        assert_eq!(styles.len(), 4);
    }

    #[test]
    fn test_same_seed_same_crowd() {
        assert_eq!(crowd(5).characters(), crowd(5).characters());
    }

    #[test]
    fn test_delay_grows_with_depth_and_distance() {
        let crowd = crowd(2);
        let at = |row, col| {
            crowd
                .characters()
                .iter()
                .find(|c| c.row == row && c.col == col)
                .unwrap()
                .delay
        };
        assert!(at(3, 6) > at(0, 6));
        assert!(at(0, 0) > at(0, 6));
    }

    #[test]
    fn test_bass_hit_bounces_front_bass_figures_more_than_back() {
        let mut crowd = crowd(3);
        let snapshot = bass_hit();
        crowd.update(&FrameInput::new(&snapshot, 0.0));

        assert_eq!(crowd.impulses().bass.value(), 1.0);
        for (c, pose) in crowd.characters().iter().zip(crowd.poses()) {
            let bounce = (1.0 - c.delay * 0.15).max(0.0);
            let sway = (c.row as f32 * 0.9 + c.col as f32 * 1.7).sin() * 0.06;
            match c.reactivity {
                Reactivity::Bass => assert!((pose.effective - (bounce + sway)).abs() < 1e-5),
                _ => assert!((pose.effective - sway).abs() < 1e-5),
            }
        }
    }

    #[test]
    fn test_squash_and_stretch_are_proportional() {
        let mut crowd = crowd(4);
        let snapshot = bass_hit();
        crowd.update(&FrameInput::new(&snapshot, 0.3));
        for pose in crowd.poses() {
            assert!((pose.scale_y - (1.0 + pose.effective * 0.35)).abs() < 1e-5);
            assert!((pose.scale_x - (1.0 - pose.effective * 0.2)).abs() < 1e-5);
            if pose.effective < 0.0 {
                assert!(pose.scale_y < 1.0 && pose.scale_x > 1.0);
                assert_eq!(pose.lift, 0.0);
            }
        }
    }

    #[test]
    fn test_quiet_crowd_still_sways() {
        let mut crowd = crowd(6);
        let silence = AnalyzerSnapshot::from_parts(vec![0; 1024], vec![128; 2048]);
        crowd.update(&FrameInput::new(&silence, 1.0));
        let first: Vec<f32> = crowd.poses().iter().map(|p| p.effective).collect();
        crowd.update(&FrameInput::new(&silence, 1.5));
        let moved = crowd
            .poses()
            .iter()
            .zip(&first)
            .any(|(p, f)| (p.effective - f).abs() > 1e-3);
        assert!(moved);
    }

    #[test]
    fn test_figures_turn_toward_centre() {
        let mut crowd = crowd(8);
        let silence = AnalyzerSnapshot::default();
        crowd.update(&FrameInput::new(&silence, 0.0));
        for (c, pose) in crowd.characters().iter().zip(crowd.poses()) {
            assert!(pose.yaw * c.home.x <= 0.0);
        }
    }

    #[test]
    fn test_vertex_buffer_is_stable() {
        let mut crowd = crowd(9);
        let snapshot = bass_hit();
        let mut list = DrawList::default();
        crowd.draw(&mut list);
        let before = list.triangles.len();
        crowd.update(&FrameInput::new(&snapshot, 0.0));
        list.clear();
        crowd.draw(&mut list);
        assert_eq!(list.triangles.len(), before);
        assert!(before > 98 * 36 * 2);
    }
}
