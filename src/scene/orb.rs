//! Orb mode: waveform ring, breathing wireframe core, bar ring, particle halo.

use glam::{Mat4, Quat, Vec3};
use rand::Rng;
use std::f32::consts::TAU;

use super::geometry::{icosahedron_edges, lerp, push_box, ColorVertex, DrawList};
use super::{FrameInput, Renderer, SurfaceInfo};
use crate::audio::band_mean;
use crate::params::{bands, OrbParams};

const RING_COLOR: [f32; 3] = [0.3, 0.9, 1.0];
const CORE_COLOR: [f32; 4] = [1.0, 0.3, 0.9, 1.0];
const PARTICLE_COLOR: [f32; 4] = [0.8, 0.7, 1.0, 0.7];

/// Core spin (radians per frame)
const CORE_SPIN: f32 = 0.01;

pub struct OrbRenderer {
    params: OrbParams,
    attached: bool,

    /// Waveform ring, `ring_segments + 1` vertices updated in place
    ring: Vec<ColorVertex>,
    ring_rotation: f32,

    core_edges: Vec<(Vec3, Vec3)>,
    core_scale: f32,
    core_rotation: f32,

    bar_heights: Vec<f32>,

    /// Halo positions at zero rotation
    particles: Vec<Vec3>,
    particle_rotation: f32,

    /// Last normalized core bass (0..1)
    bass: f32,
}

impl OrbRenderer {
    pub fn new(params: OrbParams, rng: &mut impl Rng) -> Self {
        let (inner, outer) = params.particle_radius;
        let particles = (0..params.particle_count)
            .map(|_| {
                let angle = rng.random_range(0.0..TAU);
                let radius = rng.random_range(inner..outer);
                let height = rng.random_range(-1.5..1.5);
                Vec3::new(radius * angle.cos(), height, radius * angle.sin())
            })
            .collect();

        Self {
            ring: vec![ColorVertex::default(); params.ring_segments + 1],
            ring_rotation: 0.0,
            core_edges: icosahedron_edges(),
            core_scale: params.core_base_scale,
            core_rotation: 0.0,
            bar_heights: vec![0.0; params.bar_count],
            particles,
            particle_rotation: 0.0,
            bass: 0.0,
            attached: false,
            params,
        }
    }

    pub fn core_scale(&self) -> f32 {
        self.core_scale
    }

    pub fn bar_heights(&self) -> &[f32] {
        &self.bar_heights
    }

    pub fn ring(&self) -> &[ColorVertex] {
        &self.ring
    }

    pub fn particle_rotation(&self) -> f32 {
        self.particle_rotation
    }

    fn update_ring(&mut self, frame: &FrameInput) {
        let p = &self.params;
        let segments = p.ring_segments;
        let samples = frame.snapshot.time.len();
        self.ring_rotation += p.ring_spin;

        for (i, vertex) in self.ring.iter_mut().enumerate() {
            // Vertex `segments` closes the loop on sample 0
            let sample = frame.snapshot.time_at((i % segments) * samples / segments);
            let v = (sample as f32 - 128.0) / 128.0;
            let angle = i as f32 / segments as f32 * TAU + self.ring_rotation;
            let radius = p.ring_radius + v * p.ring_radial_scale;
            let glow = 0.5 + v.abs().min(1.0) * 0.5;

            *vertex = ColorVertex {
                position: [
                    radius * angle.cos(),
                    v * p.ring_vertical_scale,
                    radius * angle.sin(),
                ],
                color: [RING_COLOR[0] * glow, RING_COLOR[1] * glow, RING_COLOR[2], 1.0],
            };
        }
    }

    fn update_bars(&mut self, frame: &FrameInput) {
        let count = self.params.bar_count;
        for (i, height) in self.bar_heights.iter_mut().enumerate() {
            let bin = i * bands::ORB_BAR_SPAN / count;
            let target = frame.snapshot.frequency_at(bin) as f32 / 255.0 * self.params.bar_max_height;
            *height = lerp(*height, target, self.params.follow);
        }
    }
}

impl Renderer for OrbRenderer {
    fn attach(&mut self, _surface: &SurfaceInfo) {
        self.attached = true;
    }

    fn update(&mut self, frame: &FrameInput) {
        if !self.attached {
            return;
        }
        let p = &self.params;

        self.bass = band_mean(&frame.snapshot.frequency, bands::ORB_CORE) / 255.0;
        let target = p.core_base_scale + self.bass * p.core_bass_scale;
        self.core_scale = lerp(self.core_scale, target, p.follow);
        self.core_rotation += CORE_SPIN;
        self.particle_rotation += p.particle_spin + self.bass * p.particle_bass_spin;

        self.update_ring(frame);
        self.update_bars(frame);
    }

    fn draw(&self, list: &mut DrawList) {
        for pair in self.ring.windows(2) {
            list.lines.extend_from_slice(pair);
        }

        let core = Mat4::from_scale_rotation_translation(
            Vec3::splat(self.core_scale),
            Quat::from_euler(glam::EulerRot::YXZ, self.core_rotation, self.core_rotation * 0.6, 0.0),
            Vec3::ZERO,
        );
        for (a, b) in &self.core_edges {
            list.lines.push(ColorVertex::new(core.transform_point3(*a), CORE_COLOR));
            list.lines.push(ColorVertex::new(core.transform_point3(*b), CORE_COLOR));
        }

        let count = self.bar_heights.len();
        for (i, &height) in self.bar_heights.iter().enumerate() {
            let angle = i as f32 / count as f32 * TAU;
            let h = height.max(0.05);
            let level = (height / self.params.bar_max_height).clamp(0.0, 1.0);
            let color = [0.3 + level * 0.7, 0.2, 1.0 - level * 0.5, 0.9];
            let transform = Mat4::from_rotation_translation(
                Quat::from_rotation_y(-angle),
                Vec3::new(
                    self.params.bar_radius * angle.cos(),
                    -1.0,
                    self.params.bar_radius * angle.sin(),
                ),
            );
            push_box(
                &mut list.triangles,
                transform,
                Vec3::new(0.0, h / 2.0, 0.0),
                Vec3::new(0.12, h / 2.0, 0.12),
                color,
            );
        }

        let halo = Quat::from_rotation_y(self.particle_rotation);
        list.points.extend(
            self.particles
                .iter()
                .map(|&p| ColorVertex::new(halo * p, PARTICLE_COLOR)),
        );
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
    use rand::{rngs::StdRng, SeedableRng};

    fn attached_orb() -> OrbRenderer {
        let mut orb = OrbRenderer::new(OrbParams::default(), &mut StdRng::seed_from_u64(7));
        orb.attach(&SurfaceInfo {
            width: 1280,
            height: 720,
        });
        orb
    }

    fn bass_snapshot() -> AnalyzerSnapshot {
        let mut freq = vec![0u8; 1024];
        freq[..10].fill(255);
        AnalyzerSnapshot::from_parts(freq, vec![128; 2048])
    }

    #[test]
    fn test_core_scale_converges_up_without_overshoot() {
        let mut orb = attached_orb();
        let snapshot = bass_snapshot();
        let ceiling = 1.2 + 1.0 * 1.8;

        let mut previous = orb.core_scale();
        for frame in 0..5 {
            orb.update(&FrameInput::new(&snapshot, frame as f32 / 60.0));
            let scale = orb.core_scale();
            assert!(scale > previous);
            assert!(scale <= ceiling + 1e-5);
            previous = scale;
        }
        assert!(previous > 2.5);

        for frame in 5..200 {
            orb.update(&FrameInput::new(&snapshot, frame as f32 / 60.0));
            assert!(orb.core_scale() <= ceiling + 1e-5);
        }
        assert!((orb.core_scale() - ceiling).abs() < 1e-3);
    }

    #[test]
    fn test_ring_follows_time_domain() {
        let mut orb = attached_orb();
        let snapshot = AnalyzerSnapshot::from_parts(vec![0; 1024], vec![255; 2048]);
        orb.update(&FrameInput::new(&snapshot, 0.0));

        assert_eq!(orb.ring().len(), 257);
        let v = (255.0 - 128.0) / 128.0;
        for vertex in orb.ring() {
            let [x, y, z] = vertex.position;
            let radius = (x * x + z * z).sqrt();
            assert!((radius - (4.0 + v * 1.5)).abs() < 1e-4);
            assert!((y - v * 0.5).abs() < 1e-6);
        }
    }

    #[test]
    fn test_tiny_analyzer_degrades_by_clamping() {
        let mut orb = attached_orb();
        let snapshot = AnalyzerSnapshot::from_parts(vec![200; 8], vec![128; 16]);
        for _ in 0..3 {
            orb.update(&FrameInput::new(&snapshot, 0.0));
        }
        assert!(orb.bar_heights().iter().all(|h| h.is_finite() && *h > 0.0));

        let empty = AnalyzerSnapshot::default();
        orb.update(&FrameInput::new(&empty, 0.0));
        assert!(orb.core_scale().is_finite());
    }

    #[test]
    fn test_detached_orb_ignores_updates() {
        let mut orb = OrbRenderer::new(OrbParams::default(), &mut StdRng::seed_from_u64(1));
        let snapshot = bass_snapshot();
        orb.update(&FrameInput::new(&snapshot, 0.0));
        assert_eq!(orb.core_scale(), 1.2);
        assert_eq!(orb.particle_rotation(), 0.0);
    }

    #[test]
    fn test_halo_spins_faster_with_bass() {
        let mut quiet = attached_orb();
        let mut loud = attached_orb();
        let silence = AnalyzerSnapshot::from_parts(vec![0; 1024], vec![128; 2048]);
        let bass = bass_snapshot();
        quiet.update(&FrameInput::new(&silence, 0.0));
        loud.update(&FrameInput::new(&bass, 0.0));
        assert!(loud.particle_rotation() > quiet.particle_rotation());
    }

    #[test]
    fn test_ring_closes_on_non_periodic_waveform() {
        let mut orb = attached_orb();
        let ramp: Vec<u8> = (0..2048).map(|i| (i * 256 / 2048) as u8).collect();
        let snapshot = AnalyzerSnapshot::from_parts(vec![0; 1024], ramp);
        orb.update(&FrameInput::new(&snapshot, 0.0));

        let ring = orb.ring();
        assert_eq!(ring.len(), 257);
        let (first, last) = (ring[0].position, ring[256].position);
        for axis in 0..3 {
            assert!((first[axis] - last[axis]).abs() < 1e-4, "{first:?} vs {last:?}");
        }
    }

    #[test]
    fn test_draw_emits_all_parts() {
        let orb = attached_orb();
        let mut list = DrawList::default();
        orb.draw(&mut list);
        assert_eq!(list.lines.len(), 256 * 2 + 30 * 2);
        assert_eq!(list.triangles.len(), 64 * 36);
        assert_eq!(list.points.len(), 1500);
    }
}
