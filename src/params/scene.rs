//! Per-mode scene parameters.

use crate::error::{Result, VisualizerError};

fn invalid(message: String) -> Result<()> {
    Err(VisualizerError::InvalidConfig(message))
}

/// Per-frame lerp factors must stay in [0, 1] or smoothing overshoots
fn check_follow(name: &str, value: f32) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        return invalid(format!("{name} must be in [0, 1], got {value}"));
    }
    Ok(())
}

/// Orb mode: waveform ring, breathing core, bar ring, particle halo
#[derive(Debug, Clone)]
pub struct OrbParams {
    /// Waveform ring segments (vertex count is segments + 1, closing the loop)
    pub ring_segments: usize,

    /// Rest radius of the waveform ring (world units)
    pub ring_radius: f32,

    /// Radial displacement per unit of centred time-domain sample
    pub ring_radial_scale: f32,

    /// Vertical displacement per unit of centred time-domain sample
    pub ring_vertical_scale: f32,

    /// Ring spin (radians per frame, audio independent)
    pub ring_spin: f32,

    /// Core scale at silence
    pub core_base_scale: f32,

    /// Extra core scale at full bass
    /// Formula: target = core_base_scale + bass * core_bass_scale
    pub core_bass_scale: f32,

    /// Lerp factor toward the target scale / bar height (per frame)
    pub follow: f32,

    /// Number of bars around the core
    pub bar_count: usize,

    /// Radius at which bars stand (world units)
    pub bar_radius: f32,

    /// Bar height at full magnitude (world units)
    pub bar_max_height: f32,

    /// Particles in the outer halo
    pub particle_count: usize,

    /// Inner / outer radius of the halo (world units)
    pub particle_radius: (f32, f32),

    /// Halo spin at silence (radians per frame)
    pub particle_spin: f32,

    /// Extra halo spin at full bass (radians per frame)
    pub particle_bass_spin: f32,
}

impl Default for OrbParams {
    fn default() -> Self {
        Self {
            ring_segments: 256,
            ring_radius: 4.0,
            ring_radial_scale: 1.5,
            ring_vertical_scale: 0.5,
            ring_spin: 0.005,
            core_base_scale: 1.2,
            core_bass_scale: 1.8,
            follow: 0.3,
            bar_count: 64,
            bar_radius: 6.5,
            bar_max_height: 3.0,
            particle_count: 1500,
            particle_radius: (9.0, 14.0),
            particle_spin: 0.001,
            particle_bass_spin: 0.01,
        }
    }
}

impl OrbParams {
    pub fn validate(&self) -> Result<()> {
        if self.ring_segments == 0 {
            return invalid("orb ring needs at least one segment".into());
        }
        if self.bar_count == 0 {
            return invalid("orb needs at least one bar".into());
        }
        let (inner, outer) = self.particle_radius;
        if !(inner >= 0.0 && inner < outer) {
            return invalid(format!("halo radius must satisfy 0 <= inner < outer, got ({inner}, {outer})"));
        }
        check_follow("orb follow", self.follow)
    }
}

/// Terrain mode: scrolling spectrum waterfall
#[derive(Debug, Clone)]
pub struct TerrainParams {
    /// History depth (rows, one per frame)
    pub rows: usize,

    /// Samples per row
    pub samples: usize,

    /// Fraction of the spectrum spread across a row (0..1)
    pub spectrum_fraction: f32,

    /// Lerp factor for displayed heights toward history values
    pub follow: f32,

    /// Row width (world units)
    pub width: f32,

    /// Distance between consecutive rows (world units)
    pub row_spacing: f32,

    /// Height of a full-scale sample (world units)
    pub height_scale: f32,

    /// Resting vertical offset of the whole assembly
    pub base_offset: f32,

    /// Extra lift at full bass impulse
    pub bass_lift: f32,

    /// Easing factor for the vertical offset (per frame)
    pub offset_follow: f32,

    /// Tilt amplitude about X (radians)
    pub tilt_amplitude: f32,

    /// Tilt angular frequency (radians per second)
    pub tilt_rate: f32,
}

impl Default for TerrainParams {
    fn default() -> Self {
        Self {
            rows: 45,
            samples: 80,
            spectrum_fraction: 0.6,
            follow: 0.4,
            width: 24.0,
            row_spacing: 0.9,
            height_scale: 4.0,
            base_offset: -2.0,
            bass_lift: 1.5,
            offset_follow: 0.05,
            tilt_amplitude: 0.08,
            tilt_rate: 0.5,
        }
    }
}

impl TerrainParams {
    pub fn validate(&self) -> Result<()> {
        if self.rows == 0 {
            return invalid("terrain needs at least one row".into());
        }
        if self.samples < 2 {
            return invalid(format!("terrain rows need at least 2 samples, got {}", self.samples));
        }
        if !(self.spectrum_fraction > 0.0 && self.spectrum_fraction <= 1.0) {
            return invalid(format!(
                "spectrum fraction must be in (0, 1], got {}",
                self.spectrum_fraction
            ));
        }
        check_follow("terrain follow", self.follow)?;
        check_follow("terrain offset follow", self.offset_follow)
    }
}

/// Crowd mode: grid of bouncing figures
#[derive(Debug, Clone)]
pub struct CrowdParams {
    pub rows: usize,
    pub cols: usize,

    /// Horizontal / depth spacing between figures (world units)
    pub spacing: (f32, f32),

    /// Delay units per row of depth
    pub row_delay: f32,

    /// Delay units per column away from centre
    pub col_delay: f32,

    /// Impulse reduction per delay unit
    /// Formula: bounce = max(0, impulse - delay * delay_falloff)
    pub delay_falloff: f32,

    /// Height of a full bounce (world units)
    pub jump_height: f32,

    /// Idle sway amplitude (dimensionless, added to bounce)
    pub sway_amplitude: f32,

    /// Vertical stretch per unit of effective bounce
    pub stretch: f32,

    /// Horizontal narrowing per unit of effective bounce
    pub squash: f32,

    /// Yaw per world unit of horizontal offset (radians)
    pub yaw_per_unit: f32,
}

impl Default for CrowdParams {
    fn default() -> Self {
        Self {
            rows: 7,
            cols: 14,
            spacing: (1.6, 1.8),
            row_delay: 0.35,
            col_delay: 0.12,
            delay_falloff: 0.15,
            jump_height: 1.4,
            sway_amplitude: 0.06,
            stretch: 0.35,
            squash: 0.2,
            yaw_per_unit: 0.04,
        }
    }
}

impl CrowdParams {
    /// Total number of figures
    pub fn count(&self) -> usize {
        self.rows * self.cols
    }

    pub fn validate(&self) -> Result<()> {
        if self.count() == 0 {
            return invalid(format!("crowd grid {}x{} is empty", self.rows, self.cols));
        }
        if self.delay_falloff < 0.0 {
            return invalid(format!("delay falloff must be >= 0, got {}", self.delay_falloff));
        }
        Ok(())
    }
}

/// Wall mode: fullscreen procedural line pattern
#[derive(Debug, Clone)]
pub struct WallParams {
    /// Lerp factor for the bass glow value (per frame)
    pub bass_follow: f32,
}

impl Default for WallParams {
    fn default() -> Self {
        Self { bass_follow: 0.2 }
    }
}

impl WallParams {
    pub fn validate(&self) -> Result<()> {
        check_follow("wall bass follow", self.bass_follow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(OrbParams::default().validate().is_ok());
        assert!(TerrainParams::default().validate().is_ok());
        assert!(CrowdParams::default().validate().is_ok());
        assert!(WallParams::default().validate().is_ok());
    }

    #[test]
    fn test_orb_rejects_degenerate_geometry() {
        let no_ring = OrbParams {
            ring_segments: 0,
            ..Default::default()
        };
        assert!(matches!(no_ring.validate(), Err(VisualizerError::InvalidConfig(_))));

        let flat_halo = OrbParams {
            particle_radius: (5.0, 5.0),
            ..Default::default()
        };
        assert!(flat_halo.validate().is_err());

        let overshoot = OrbParams {
            follow: 1.5,
            ..Default::default()
        };
        assert!(overshoot.validate().is_err());
    }

    #[test]
    fn test_terrain_rejects_empty_history() {
        for (rows, samples) in [(0, 80), (45, 0), (45, 1)] {
            let params = TerrainParams {
                rows,
                samples,
                ..Default::default()
            };
            assert!(params.validate().is_err(), "{rows}x{samples} accepted");
        }
    }

    #[test]
    fn test_crowd_and_wall_limits() {
        let empty = CrowdParams {
            cols: 0,
            ..Default::default()
        };
        assert!(empty.validate().is_err());
        assert!(WallParams { bass_follow: -0.1 }.validate().is_err());
    }
}
