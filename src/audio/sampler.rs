//! Per-frame spectral snapshots and band energies.

use std::ops::Range;

use super::analyzer::Analyzer;
use crate::params::bands;

/// One frame of analyzer output
#[derive(Debug, Clone, Default)]
pub struct AnalyzerSnapshot {
    /// Frequency magnitudes, 0..=255 (length = fft_size / 2)
    pub frequency: Vec<u8>,

    /// Time-domain samples, 0..=255 centred at 128 (length = fft_size)
    pub time: Vec<u8>,
}

impl AnalyzerSnapshot {
    /// Snapshot from explicit arrays (synthetic input, tests)
    pub fn from_parts(frequency: Vec<u8>, time: Vec<u8>) -> Self {
        Self { frequency, time }
    }

    /// Frequency bin clamped to the available length; 0 when empty
    pub fn frequency_at(&self, index: usize) -> u8 {
        clamped(&self.frequency, index, 0)
    }

    /// Time sample clamped to the available length; centre line when empty
    pub fn time_at(&self, index: usize) -> u8 {
        clamped(&self.time, index, 128)
    }

    pub fn bands(&self) -> BandEnergy {
        BandEnergy::from_frequency(&self.frequency)
    }
}

fn clamped(data: &[u8], index: usize, empty: u8) -> u8 {
    match data.len() {
        0 => empty,
        len => data[index.min(len - 1)],
    }
}

/// Mean byte value of `range`, clamped to `freq`; 0.0 if the clamped range is empty
pub fn band_mean(freq: &[u8], range: Range<usize>) -> f32 {
    let end = range.end.min(freq.len());
    let start = range.start.min(end);
    let window = &freq[start..end];
    if window.is_empty() {
        return 0.0;
    }
    window.iter().map(|&b| b as f32).sum::<f32>() / window.len() as f32
}

/// Mean energy (0..=255) of the three reactive bands
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BandEnergy {
    pub bass: f32,
    pub snare: f32,
    pub high: f32,
}

impl BandEnergy {
    pub fn from_frequency(freq: &[u8]) -> Self {
        Self {
            bass: band_mean(freq, bands::BASS),
            snare: band_mean(freq, bands::SNARE),
            high: band_mean(freq, bands::HIGH),
        }
    }
}

/// Pulls a fresh snapshot from an analyzer once per frame
///
/// Buffers are sized from the analyzer on every call, so an analyzer whose
/// bin count changes is followed without reallocating on steady frames.
#[derive(Debug, Default)]
pub struct SpectralSampler {
    snapshot: AnalyzerSnapshot,
}

impl SpectralSampler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sample(&mut self, analyzer: &mut dyn Analyzer) -> &AnalyzerSnapshot {
        let bins = analyzer.frequency_bin_count();
        let size = analyzer.fft_size();
        self.snapshot.frequency.resize(bins, 0);
        self.snapshot.time.resize(size, 128);

        analyzer.byte_frequency_data(&mut self.snapshot.frequency);
        analyzer.byte_time_domain_data(&mut self.snapshot.time);
        &self.snapshot
    }

    pub fn snapshot(&self) -> &AnalyzerSnapshot {
        &self.snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CountingAnalyzer {
        size: usize,
        calls: u8,
    }

    impl Analyzer for CountingAnalyzer {
        fn fft_size(&self) -> usize {
            self.size
        }

        fn byte_frequency_data(&mut self, out: &mut [u8]) {
            self.calls += 1;
            out.fill(self.calls);
        }

        fn byte_time_domain_data(&mut self, out: &mut [u8]) {
            out.fill(128);
        }
    }

    #[test]
    fn test_band_mean_over_window() {
        let mut freq = vec![0u8; 1024];
        freq[0..4].copy_from_slice(&[100, 200, 100, 200]);
        assert_eq!(band_mean(&freq, bands::BASS), 150.0);
        assert_eq!(band_mean(&freq, bands::SNARE), 0.0);
    }

    #[test]
    fn test_band_mean_clamps_short_spectrum() {
        // 220 bins: high window 200..250 clamps to 200..220
        let mut freq = vec![0u8; 220];
        freq[200..220].fill(90);
        assert_eq!(band_mean(&freq, bands::HIGH), 90.0);

        // 64 bins: high window is empty and reads silent
        let freq = vec![255u8; 64];
        assert_eq!(band_mean(&freq, bands::HIGH), 0.0);
        assert_eq!(band_mean(&[], bands::BASS), 0.0);
    }

    #[test]
    fn test_sampler_follows_analyzer_size_and_refreshes() {
        let mut analyzer = CountingAnalyzer { size: 64, calls: 0 };
        let mut sampler = SpectralSampler::new();

        let snapshot = sampler.sample(&mut analyzer);
        assert_eq!(snapshot.frequency.len(), 32);
        assert_eq!(snapshot.time.len(), 64);
        assert_eq!(snapshot.frequency[0], 1);

        analyzer.size = 128;
        let snapshot = sampler.sample(&mut analyzer);
        assert_eq!(snapshot.frequency.len(), 64);
        assert_eq!(snapshot.frequency[0], 2);
    }

    #[test]
    fn test_clamped_reads() {
        let snapshot = AnalyzerSnapshot::from_parts(vec![1, 2, 3], vec![]);
        assert_eq!(snapshot.frequency_at(100), 3);
        assert_eq!(snapshot.time_at(5), 128);
    }
}
