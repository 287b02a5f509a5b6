//! Audio decoding, playback and per-frame feature extraction.
//!
//! Playback feeds a shared sample tap from the output callback; the live
//! analyzer turns the tap into Web-Audio-style byte spectra on demand, and the
//! sampler/impulse layers turn those bytes into animation signals.

mod analyzer;
mod decode;
mod impulse;
mod playback;
mod sampler;

// Re-export public types
pub use analyzer::{blackman_window, Analyzer, LiveAnalyzer, SampleTap};
pub use decode::AudioClip;
pub use impulse::{BandImpulses, Impulse};
pub use playback::{Playback, Transport};
pub use sampler::{band_mean, AnalyzerSnapshot, BandEnergy, SpectralSampler};
