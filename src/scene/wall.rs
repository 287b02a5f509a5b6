//! Wall mode: fullscreen procedural line pattern.
//!
//! The pattern itself runs in `wall.wgsl`; [`pattern`] is the same function on
//! the CPU and must stay in step with the shader.

use bytemuck::{Pod, Zeroable};
use glam::{Mat2, Vec2};

use super::geometry::{lerp, DrawList};
use super::{FrameInput, Renderer, SurfaceInfo};
use crate::audio::band_mean;
use crate::params::{bands, WallParams};

/// Uniform buffer for the wall shader
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct WallUniforms {
    pub time: f32,
    pub bass: f32,
    pub resolution: [f32; 2],
}

fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Line intensity at `uv` (0..1 across the surface), in [0, 1]
///
/// Louder bass warps the field harder and thickens the lines.
pub fn pattern(uv: Vec2, aspect: f32, time: f32, bass: f32) -> f32 {
    let mut p = (uv - Vec2::splat(0.5)) * Vec2::new(aspect, 1.0) * 6.0;
    p = Mat2::from_angle(time * 0.1) * p;

    let warp = 0.4 + bass * 1.2;
    p += warp * Vec2::new((p.y * 0.8 + time * 0.6).sin(), (p.x * 0.8 - time * 0.5).cos());

    let field = (p.x * 1.3).sin() + (p.y * 1.7).sin() + ((p.x + p.y) * 0.9 + time * 0.8).sin();
    let thickness = 0.08 + bass * 0.22;
    1.0 - smoothstep(thickness - 0.03, thickness + 0.03, field.abs())
}

pub struct WallRenderer {
    params: WallParams,
    attached: bool,
    resolution: [f32; 2],
    time: f32,
    bass: f32,
}

impl WallRenderer {
    pub fn new(params: WallParams) -> Self {
        Self {
            params,
            attached: false,
            resolution: [1.0, 1.0],
            time: 0.0,
            bass: 0.0,
        }
    }

    pub fn bass(&self) -> f32 {
        self.bass
    }

    pub fn uniforms(&self) -> WallUniforms {
        WallUniforms {
            time: self.time,
            bass: self.bass,
            resolution: self.resolution,
        }
    }
}

impl Renderer for WallRenderer {
    fn attach(&mut self, surface: &SurfaceInfo) {
        self.resolution = [surface.width as f32, surface.height.max(1) as f32];
        self.attached = true;
    }

    fn update(&mut self, frame: &FrameInput) {
        if !self.attached {
            return;
        }
        let target = band_mean(&frame.snapshot.frequency, bands::BASS) / 255.0;
        self.bass = lerp(self.bass, target, self.params.bass_follow);
        self.time = frame.time_s;
    }

    fn draw(&self, list: &mut DrawList) {
        list.wall = Some(self.uniforms());
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

    fn grid() -> impl Iterator<Item = Vec2> {
        (0..32).flat_map(|y| (0..32).map(move |x| Vec2::new(x as f32 / 31.0, y as f32 / 31.0)))
    }

    #[test]
    fn test_pattern_is_pure_and_bounded() {
        for (time, bass) in [(0.0, 0.0), (3.7, 0.5), (120.0, 1.0)] {
            for uv in grid() {
                let a = pattern(uv, 16.0 / 9.0, time, bass);
                let b = pattern(uv, 16.0 / 9.0, time, bass);
                assert_eq!(a.to_bits(), b.to_bits());
                assert!((0.0..=1.0).contains(&a), "{a}");
            }
        }
    }

    #[test]
    fn test_bass_thickens_lines() {
        let coverage = |bass| grid().map(|uv| pattern(uv, 1.0, 2.0, bass)).sum::<f32>();
        assert!(coverage(1.0) > coverage(0.0));
    }

    #[test]
    fn test_bass_glow_is_lerp_smoothed() {
        let mut wall = WallRenderer::new(WallParams::default());
        wall.attach(&SurfaceInfo {
            width: 640,
            height: 480,
        });
        let mut freq = vec![0u8; 1024];
        freq[..4].fill(255);
        let snapshot = AnalyzerSnapshot::from_parts(freq, vec![128; 2048]);

        wall.update(&FrameInput::new(&snapshot, 1.0));
        assert!((wall.bass() - 0.2).abs() < 1e-6);
        wall.update(&FrameInput::new(&snapshot, 1.016));
        assert!((wall.bass() - 0.36).abs() < 1e-6);

        let mut list = DrawList::default();
        wall.draw(&mut list);
        let uniforms = list.wall.unwrap();
        assert_eq!(uniforms.resolution, [640.0, 480.0]);
        assert_eq!(uniforms.time, 1.016);
    }
}
