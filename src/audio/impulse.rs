//! Attack-instant / release-linear envelopes over band energy.

use super::sampler::BandEnergy;
use crate::params::ImpulseConfig;

/// Envelope for one band, always within [0, 1]
#[derive(Debug, Clone, Copy)]
pub struct Impulse {
    config: ImpulseConfig,
    value: f32,
}

impl Impulse {
    pub fn new(config: ImpulseConfig) -> Self {
        Self { config, value: 0.0 }
    }

    /// Feed one frame of mean band energy (0..=255), returning the new value
    ///
    /// The target jumps in as soon as it beats the previous value scaled by
    /// `decay`; otherwise the value falls by `release_step`.
    pub fn update(&mut self, energy: f32) -> f32 {
        let energy = if energy.is_finite() { energy } else { 0.0 };
        let threshold = self.config.threshold();
        let target =
            ((energy - threshold) / (255.0 - threshold)).max(0.0) * self.config.gain();

        let next = if self.value * self.config.decay < target {
            target
        } else {
            self.value - self.config.release_step
        };
        self.value = next.clamp(0.0, 1.0);
        self.value
    }

    pub fn value(&self) -> f32 {
        self.value
    }
}

/// The three band envelopes, updated together once per frame
#[derive(Debug, Clone, Copy)]
pub struct BandImpulses {
    pub bass: Impulse,
    pub snare: Impulse,
    pub high: Impulse,
}

impl Default for BandImpulses {
    fn default() -> Self {
        Self {
            bass: Impulse::new(ImpulseConfig::bass()),
            snare: Impulse::new(ImpulseConfig::snare()),
            high: Impulse::new(ImpulseConfig::high()),
        }
    }
}

impl BandImpulses {
    pub fn update(&mut self, bands: &BandEnergy) {
        self.bass.update(bands.bass);
        self.snare.update(bands.snare);
        self.high.update(bands.high);
    }
}
