//! Live analyzer producing byte frequency and time-domain snapshots.

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::collections::VecDeque;
use std::f32::consts::PI;
use std::sync::{Arc, Mutex};

use crate::error::Result;
use crate::params::AnalyzerConfig;

/// Source of per-frame spectral snapshots.
///
/// Each call reflects the audio at the moment of the call; implementations
/// must not hand back a cached frame.
pub trait Analyzer {
    /// Transform size (samples); time-domain snapshots have this length
    fn fft_size(&self) -> usize;

    /// Frequency snapshot length
    fn frequency_bin_count(&self) -> usize {
        self.fft_size() / 2
    }

    /// Fill `out` with magnitudes scaled to 0..=255
    fn byte_frequency_data(&mut self, out: &mut [u8]);

    /// Fill `out` with samples scaled to 0..=255, centred on 128
    fn byte_time_domain_data(&mut self, out: &mut [u8]);
}

/// Ring of the most recent mono samples, written by the playback callback
#[derive(Clone)]
pub struct SampleTap {
    ring: Arc<Mutex<VecDeque<f32>>>,
    capacity: usize,
}

impl SampleTap {
    pub fn new(capacity: usize) -> Self {
        Self {
            ring: Arc::new(Mutex::new(VecDeque::from(vec![0.0; capacity]))),
            capacity,
        }
    }

    /// Append samples, discarding the oldest beyond capacity
    pub fn push(&self, samples: &[f32]) {
        let Ok(mut ring) = self.ring.lock() else {
            return;
        };
        for &s in samples {
            if ring.len() == self.capacity {
                ring.pop_front();
            }
            ring.push_back(s);
        }
    }

    /// Copy the newest `out.len()` samples into `out`, zero-padding the front
    pub fn copy_latest(&self, out: &mut [f32]) {
        out.fill(0.0);
        let Ok(ring) = self.ring.lock() else {
            return;
        };
        let n = out.len().min(ring.len());
        let start = out.len() - n;
        for (dst, &src) in out[start..].iter_mut().zip(ring.iter().skip(ring.len() - n)) {
            *dst = src;
        }
    }
}

/// Analyzer over a [`SampleTap`] with Blackman windowing, temporal smoothing
/// and dB-to-byte mapping
pub struct LiveAnalyzer {
    config: AnalyzerConfig,
    tap: SampleTap,
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    samples: Vec<f32>,
    spectrum: Vec<Complex<f32>>,
    smoothed: Vec<f32>,
}

impl LiveAnalyzer {
    pub fn new(config: AnalyzerConfig, tap: SampleTap) -> Result<Self> {
        config.validate()?;

        let size = config.fft_size;
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(size);
        let window = (0..size).map(|i| blackman_window(i, size)).collect();

        Ok(Self {
            tap,
            fft,
            window,
            samples: vec![0.0; size],
            spectrum: vec![Complex::new(0.0, 0.0); size],
            smoothed: vec![0.0; size / 2],
            config,
        })
    }

    /// Handle for the playback side
    pub fn tap(&self) -> SampleTap {
        self.tap.clone()
    }

    fn magnitude_to_byte(&self, magnitude: f32) -> u8 {
        let db = 20.0 * magnitude.log10();
        if !db.is_finite() {
            return 0;
        }
        let range = self.config.max_decibels - self.config.min_decibels;
        let scaled = 255.0 * (db - self.config.min_decibels) / range;
        scaled.clamp(0.0, 255.0) as u8
    }
}

impl Analyzer for LiveAnalyzer {
    fn fft_size(&self) -> usize {
        self.config.fft_size
    }

    fn byte_frequency_data(&mut self, out: &mut [u8]) {
        let size = self.config.fft_size;
        self.tap.copy_latest(&mut self.samples);

        for (i, bin) in self.spectrum.iter_mut().enumerate() {
            *bin = Complex::new(self.samples[i] * self.window[i], 0.0);
        }
        self.fft.process(&mut self.spectrum);

        let tau = self.config.smoothing_time_constant;
        for (k, smoothed) in self.smoothed.iter_mut().enumerate() {
            let magnitude = self.spectrum[k].norm() / size as f32;
            let next = tau * *smoothed + (1.0 - tau) * magnitude;
            *smoothed = if next.is_finite() { next } else { 0.0 };
        }

        for (k, byte) in out.iter_mut().enumerate() {
            *byte = match self.smoothed.get(k) {
                Some(&m) => self.magnitude_to_byte(m),
                None => 0,
            };
        }
    }

    fn byte_time_domain_data(&mut self, out: &mut [u8]) {
        self.tap.copy_latest(&mut self.samples);
        let offset = self.samples.len().saturating_sub(out.len());
        for (i, byte) in out.iter_mut().enumerate() {
            let s = self.samples.get(offset + i).copied().unwrap_or(0.0);
            *byte = (128.0 * (1.0 + s)).clamp(0.0, 255.0) as u8;
        }
    }
}

/// Blackman window function for FFT analysis
pub fn blackman_window(index: usize, size: usize) -> f32 {
    let x = index as f32 / size as f32;
    0.42 - 0.5 * (2.0 * PI * x).cos() + 0.08 * (4.0 * PI * x).cos()
}
