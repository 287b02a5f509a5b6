//! Drives the frame pipeline end to end with a synthetic analyzer and a
//! fake encoder, switching modes while a recording is armed.

use std::sync::{Arc, Mutex};

use vibe_visualizer::audio::Analyzer;
use vibe_visualizer::capture::{
    CaptureController, EncoderBackend, EncodingProfile, PixelLayout, RawFrame, SegmentEncoder,
    StartOutcome, StreamSpec,
};
use vibe_visualizer::params::RecordingConfig;
use vibe_visualizer::pipeline::FramePipeline;
use vibe_visualizer::scene::{SceneMode, SceneParams, SceneSelector, SurfaceInfo};
use vibe_visualizer::Result;

/// Kick drum every 30 frames, otherwise quiet
struct PulseAnalyzer {
    frame: u32,
}

impl Analyzer for PulseAnalyzer {
    fn fft_size(&self) -> usize {
        2048
    }

    fn byte_frequency_data(&mut self, out: &mut [u8]) {
        let hit = self.frame % 30 < 3;
        for (i, bin) in out.iter_mut().enumerate() {
            *bin = match i {
                0..=9 if hit => 240,
                0..=9 => 60,
                _ => (i % 50) as u8,
            };
        }
        self.frame += 1;
    }

    fn byte_time_domain_data(&mut self, out: &mut [u8]) {
        for (i, sample) in out.iter_mut().enumerate() {
            *sample = 128 + ((i as f32 * 0.05).sin() * 40.0) as u8;
        }
    }
}

struct Recorder {
    frames: Arc<Mutex<Vec<u8>>>,
}

impl SegmentEncoder for Recorder {
    fn submit(&mut self, frame: RawFrame) -> Result<bool> {
        self.frames.lock().unwrap().push(frame.pixels[0]);
        Ok(true)
    }

    fn finish(self: Box<Self>) -> Result<Vec<Vec<u8>>> {
        Ok(vec![self.frames.lock().unwrap().clone()])
    }
}

#[derive(Default)]
struct MemoryBackend {
    opened: usize,
    frames: Arc<Mutex<Vec<u8>>>,
}

impl EncoderBackend for MemoryBackend {
    fn supports(&mut self, _profile: EncodingProfile) -> bool {
        true
    }

    fn open(&mut self, _profile: EncodingProfile, _spec: &StreamSpec) -> Result<Box<dyn SegmentEncoder>> {
        self.opened += 1;
        Ok(Box::new(Recorder {
            frames: Arc::clone(&self.frames),
        }))
    }
}

#[test]
fn test_recording_spans_mode_switches() {
    let surface = SurfaceInfo {
        width: 4,
        height: 4,
    };
    let selector = SceneSelector::new(SceneMode::Orb, SceneParams::default(), surface, Some(1));
    let mut pipeline = FramePipeline::new(selector);
    let mut analyzer = PulseAnalyzer { frame: 0 };

    let config = RecordingConfig {
        output_dir: std::env::temp_dir().join(format!("vibe-visualizer-it-{}", std::process::id())),
        ..Default::default()
    };
    let mut capture = CaptureController::new(MemoryBackend::default(), config);
    assert_eq!(
        capture.start(4, 4, PixelLayout::Bgra).unwrap(),
        StartOutcome::Started(EncodingProfile::Vp9Webm)
    );

    let mut captured = 0u8;
    for frame in 0..240u32 {
        if frame % 60 == 0 {
            let mode = SceneMode::ALL[(frame / 60) as usize];
            pipeline.switch(mode);
            assert_eq!(pipeline.mode(), mode);
        }

        let time_s = frame as f32 / 60.0;
        let list = pipeline.tick(&mut analyzer, time_s);
        assert!(!list.is_empty());
        for v in list.lines.iter().chain(&list.triangles).chain(&list.points) {
            assert!(v.position.iter().all(|c| c.is_finite()));
        }

        if capture.should_capture(frame as f64 / 60.0) {
            capture
                .push_frame(RawFrame {
                    width: 4,
                    height: 4,
                    layout: PixelLayout::Bgra,
                    pixels: vec![captured; 64],
                })
                .unwrap();
            captured = captured.wrapping_add(1);
        }
    }

    assert!(capture.is_armed());
    let path = capture.stop().unwrap().expect("recording written");
    let bytes = std::fs::read(&path).unwrap();
    assert_eq!(bytes.len(), 240);
    assert!(bytes.windows(2).all(|w| w[1] == w[0].wrapping_add(1)));
    assert_eq!(capture.backend().opened, 1);
    let _ = std::fs::remove_file(path);
}

#[test]
fn test_wall_pass_tracks_the_beat() {
    let surface = SurfaceInfo {
        width: 1280,
        height: 720,
    };
    let selector = SceneSelector::new(SceneMode::Wall, SceneParams::default(), surface, Some(2));
    let mut pipeline = FramePipeline::new(selector);
    let mut analyzer = PulseAnalyzer { frame: 0 };

    let mut peak: f32 = 0.0;
    for frame in 0..30 {
        let list = pipeline.tick(&mut analyzer, frame as f32 / 60.0);
        let wall = list.wall.expect("wall uniforms");
        assert_eq!(wall.resolution, [1280.0, 720.0]);
        assert!((0.0..=1.0).contains(&wall.bass));
        peak = peak.max(wall.bass);
    }
    assert!(peak > 0.3);
}
