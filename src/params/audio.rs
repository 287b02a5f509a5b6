//! Analyzer configuration, band windows and impulse envelope tuning.

use crate::error::{Result, VisualizerError};

/// Live analyzer configuration (Web Audio `AnalyserNode` semantics)
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    /// Transform size in samples (power of two, 32..=32768)
    /// Frequency snapshot length is half of this
    pub fft_size: usize,

    /// Blend factor between the previous and current magnitude spectrum (0..1)
    pub smoothing_time_constant: f32,

    /// Magnitude mapped to byte 0 (dBFS)
    pub min_decibels: f32,

    /// Magnitude mapped to byte 255 (dBFS)
    pub max_decibels: f32,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            fft_size: 2048,
            smoothing_time_constant: 0.8,
            min_decibels: -100.0,
            max_decibels: -30.0,
        }
    }
}

impl AnalyzerConfig {
    /// Number of frequency bins exposed by the analyzer
    pub fn frequency_bin_count(&self) -> usize {
        self.fft_size / 2
    }

    /// Validate configuration (FFT size must be power of 2, etc.)
    pub fn validate(&self) -> Result<()> {
        if !self.fft_size.is_power_of_two() || !(32..=32768).contains(&self.fft_size) {
            return Err(VisualizerError::InvalidConfig(format!(
                "FFT size must be a power of 2 in 32..=32768, got {}",
                self.fft_size
            )));
        }
        if !(0.0..1.0).contains(&self.smoothing_time_constant) {
            return Err(VisualizerError::InvalidConfig(format!(
                "smoothing time constant must be in [0, 1), got {}",
                self.smoothing_time_constant
            )));
        }
        if self.min_decibels >= self.max_decibels {
            return Err(VisualizerError::InvalidConfig(format!(
                "min_decibels ({}) must be below max_decibels ({})",
                self.min_decibels, self.max_decibels
            )));
        }
        Ok(())
    }
}

/// Frequency band windows as bin-index ranges.
///
/// These are tuned bin windows, not physical Hz boundaries. At the default
/// 2048-point transform and 44.1 kHz they land roughly on kick, snare and
/// hi-hat content; at other rates they drift. Windows are clamped to the
/// available bin count when sampled.
pub mod bands {
    use std::ops::Range;

    /// Kick / sub content
    pub const BASS: Range<usize> = 0..4;

    /// Snare / mid content
    pub const SNARE: Range<usize> = 10..25;

    /// Hats / treble content (needs at least 250 bins to be fully populated)
    pub const HIGH: Range<usize> = 200..250;

    /// Bins averaged for the orb core's breathing scale
    pub const ORB_CORE: Range<usize> = 0..10;

    /// Bins spread across the orb's bar ring
    pub const ORB_BAR_SPAN: usize = 40;
}

/// Impulse envelope tuning for one band
#[derive(Debug, Clone, Copy)]
pub struct ImpulseConfig {
    /// Byte level below which the band reads as silent (0..255, exclusive of 255)
    threshold: f32,

    /// Scale applied after thresholding (0..=1)
    gain: f32,

    /// Per-frame factor applied to the previous value before comparing with the target
    pub decay: f32,

    /// Linear amount subtracted per frame once the target falls below the gate
    pub release_step: f32,
}

impl ImpulseConfig {
    /// Default comparison-gate factor
    pub const DECAY: f32 = 0.85;

    /// Default linear release per frame
    pub const RELEASE_STEP: f32 = 0.1;

    /// Create a config, rejecting thresholds that would make `255 - threshold` vanish
    pub fn new(threshold: f32, gain: f32) -> Result<Self> {
        if !(0.0..255.0).contains(&threshold) {
            return Err(VisualizerError::InvalidConfig(format!(
                "impulse threshold must be in [0, 255), got {threshold}"
            )));
        }
        if !(0.0..=1.0).contains(&gain) {
            return Err(VisualizerError::InvalidConfig(format!(
                "impulse gain must be in [0, 1], got {gain}"
            )));
        }
        Ok(Self {
            threshold,
            gain,
            decay: Self::DECAY,
            release_step: Self::RELEASE_STEP,
        })
    }

    /// Kick drum: threshold 150
    pub fn bass() -> Self {
        Self {
            threshold: 150.0,
            gain: 1.0,
            decay: Self::DECAY,
            release_step: Self::RELEASE_STEP,
        }
    }

    /// Snare: threshold 130
    pub fn snare() -> Self {
        Self {
            threshold: 130.0,
            gain: 1.0,
            decay: Self::DECAY,
            release_step: Self::RELEASE_STEP,
        }
    }

    /// Hats: threshold 90, scaled by 0.6 after thresholding
    pub fn high() -> Self {
        Self {
            threshold: 90.0,
            gain: 0.6,
            decay: Self::DECAY,
            release_step: Self::RELEASE_STEP,
        }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn gain(&self) -> f32 {
        self.gain
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_analyzer_config_is_valid() {
        let config = AnalyzerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.frequency_bin_count(), 1024);
    }

    #[test]
    fn test_analyzer_config_rejects_bad_fft_size() {
        let config = AnalyzerConfig {
            fft_size: 1000,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = AnalyzerConfig {
            fft_size: 16,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_impulse_threshold_must_be_below_full_scale() {
        assert!(ImpulseConfig::new(255.0, 1.0).is_err());
        assert!(ImpulseConfig::new(300.0, 1.0).is_err());
        assert!(ImpulseConfig::new(-1.0, 1.0).is_err());
        assert!(ImpulseConfig::new(254.0, 1.0).is_ok());
    }

    #[test]
    fn test_band_presets_keep_tuned_thresholds() {
        assert_eq!(ImpulseConfig::bass().threshold(), 150.0);
        assert_eq!(ImpulseConfig::snare().threshold(), 130.0);
        assert_eq!(ImpulseConfig::high().threshold(), 90.0);
        assert_eq!(ImpulseConfig::high().gain(), 0.6);
    }

    #[test]
    fn test_band_windows_do_not_overlap() {
        assert!(bands::BASS.end <= bands::SNARE.start);
        assert!(bands::SNARE.end <= bands::HIGH.start);
    }
}
