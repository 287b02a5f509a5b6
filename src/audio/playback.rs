//! Playback transport on the default output device.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use log::{info, warn};
use std::sync::{Arc, Mutex};

use super::analyzer::SampleTap;
use super::decode::AudioClip;
use crate::error::{Result, VisualizerError};

#[derive(Debug, Default)]
struct TransportState {
    /// Fractional read position in clip frames
    position: f64,
    paused: bool,
    finished: bool,
}

/// Shared play/pause state, read by the output callback
#[derive(Clone, Default)]
pub struct Transport {
    state: Arc<Mutex<TransportState>>,
}

impl Transport {
    pub fn toggle_pause(&self) -> bool {
        let Ok(mut state) = self.state.lock() else {
            return false;
        };
        state.paused = !state.paused;
        state.paused
    }

    pub fn is_finished(&self) -> bool {
        self.state.lock().map(|s| s.finished).unwrap_or(true)
    }

    /// Advance `frames` output frames at `step` clip frames per output frame,
    /// calling `emit` with each clip frame index (or `None` for silence)
    fn advance(&self, frames: usize, step: f64, total: usize, mut emit: impl FnMut(Option<usize>)) {
        let Ok(mut state) = self.state.lock() else {
            (0..frames).for_each(|_| emit(None));
            return;
        };
        for _ in 0..frames {
            if state.paused || state.finished {
                emit(None);
                continue;
            }
            let frame = state.position as usize;
            if frame >= total {
                state.finished = true;
                emit(None);
                continue;
            }
            emit(Some(frame));
            state.position += step;
        }
    }
}

/// Audio playback system feeding the analyzer tap
pub struct Playback {
    transport: Transport,

    /// Audio output stream (kept alive)
    _stream: cpal::Stream,
}

impl Playback {
    /// Start playing `clip` on the default output device
    pub fn start(clip: Arc<AudioClip>, tap: SampleTap) -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| VisualizerError::AudioDevice("no audio output device found".into()))?;

        let config = device
            .default_output_config()
            .map_err(|e| VisualizerError::AudioDevice(format!("failed to get audio config: {e}")))?;

        if config.sample_format() != cpal::SampleFormat::F32 {
            return Err(VisualizerError::AudioDevice(format!(
                "unsupported output sample format {:?}",
                config.sample_format()
            )));
        }

        let device_rate = config.sample_rate().0;
        let out_channels = config.channels() as usize;
        info!(
            "Audio: {} @ {}Hz, clip {}Hz x{} ({:.1}s)",
            device.name().unwrap_or_else(|_| "Unknown".to_string()),
            device_rate,
            clip.sample_rate,
            clip.channels,
            clip.duration_secs()
        );
        if device_rate != clip.sample_rate {
            warn!("sample rate mismatch; resampling by nearest frame");
        }

        let transport = Transport::default();
        let callback_transport = transport.clone();
        let step = clip.sample_rate as f64 / device_rate as f64;
        let total = clip.frames();
        let mut mono = Vec::with_capacity(4096);

        let stream = device
            .build_output_stream(
                &config.into(),
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    mono.clear();
                    let frame_count = data.len() / out_channels;
                    let mut frames = data.chunks_mut(out_channels);
                    callback_transport.advance(frame_count, step, total, |frame| {
                        let Some(out) = frames.next() else {
                            return;
                        };
                        match frame {
                            Some(f) => {
                                for (c, sample) in out.iter_mut().enumerate() {
                                    *sample = clip.sample(f, c);
                                }
                                mono.push(clip.mono(f));
                            }
                            None => {
                                out.fill(0.0);
                                mono.push(0.0);
                            }
                        }
                    });
                    tap.push(&mono);
                },
                |err| warn!("Audio stream error: {}", err),
                None,
            )
            .map_err(|e| VisualizerError::AudioDevice(format!("failed to build audio stream: {e}")))?;

        stream
            .play()
            .map_err(|e| VisualizerError::AudioDevice(format!("failed to start audio stream: {e}")))?;

        Ok(Self {
            transport,
            _stream: stream,
        })
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }
}
