//! WAV decoding into an in-memory clip.

use std::path::Path;

use crate::error::{Result, VisualizerError};

/// Decoded audio held in memory, interleaved f32 in [-1, 1]
#[derive(Debug, Clone)]
pub struct AudioClip {
    pub samples: Vec<f32>,
    pub channels: u16,
    pub sample_rate: u32,
}

impl AudioClip {
    /// Decode a WAV file (integer PCM or 32-bit float)
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let reader = hound::WavReader::open(path)
            .map_err(|e| VisualizerError::AudioDecode(format!("{}: {e}", path.display())))?;
        Self::from_reader(reader)
    }

    pub fn from_reader<R: std::io::Read>(reader: hound::WavReader<R>) -> Result<Self> {
        let spec = reader.spec();
        if spec.channels == 0 || spec.sample_rate == 0 {
            return Err(VisualizerError::AudioDecode(
                "WAV header declares no channels or zero sample rate".into(),
            ));
        }

        let samples = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .into_samples::<f32>()
                .collect::<std::result::Result<Vec<_>, _>>()?,
            hound::SampleFormat::Int => {
                let full_scale = (1i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
                reader
                    .into_samples::<i32>()
                    .map(|s| s.map(|v| v as f32 / full_scale))
                    .collect::<std::result::Result<Vec<_>, _>>()?
            }
        };

        if samples.is_empty() {
            return Err(VisualizerError::AudioDecode("WAV file has no samples".into()));
        }

        Ok(Self {
            samples,
            channels: spec.channels,
            sample_rate: spec.sample_rate,
        })
    }

    /// Number of sample frames (one sample per channel)
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    pub fn duration_secs(&self) -> f32 {
        self.frames() as f32 / self.sample_rate as f32
    }

    /// Sample of `channel` at `frame`, wrapping the channel index; 0 past the end
    pub fn sample(&self, frame: usize, channel: usize) -> f32 {
        let channels = self.channels as usize;
        self.samples
            .get(frame * channels + channel % channels)
            .copied()
            .unwrap_or(0.0)
    }

    /// Mono mixdown of one frame
    pub fn mono(&self, frame: usize) -> f32 {
        let channels = self.channels as usize;
        (0..channels).map(|c| self.sample(frame, c)).sum::<f32>() / channels as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn wav_bytes(spec: hound::WavSpec, samples: &[i16]) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for &s in samples {
                writer.write_sample(s).unwrap();
            }
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    #[test]
    fn test_decode_int16_stereo() {
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 44100,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let bytes = wav_bytes(spec, &[16384, -16384, 0, 32767]);
        let reader = hound::WavReader::new(Cursor::new(bytes)).unwrap();
        let clip = AudioClip::from_reader(reader).unwrap();

        assert_eq!(clip.frames(), 2);
        assert!((clip.sample(0, 0) - 0.5).abs() < 1e-4);
        assert!((clip.sample(0, 1) + 0.5).abs() < 1e-4);
        assert!(clip.mono(0).abs() < 1e-4);
        assert_eq!(clip.sample(10, 0), 0.0);
    }

    #[test]
    fn test_garbage_is_a_decode_error() {
        let result = hound::WavReader::new(Cursor::new(b"not a wav file".to_vec()));
        assert!(result.is_err());

        let err = AudioClip::open("definitely/missing.wav").unwrap_err();
        assert!(matches!(err, VisualizerError::AudioDecode(_)));
    }
}
