//! Encoder seam and the ffmpeg-backed WebM encoder.

use crossbeam_channel::{bounded, Sender, TrySendError};
use log::{debug, warn};
use std::collections::HashMap;
use std::io::{Read, Write};
use std::process::{Child, Command, Stdio};
use std::thread::{self, JoinHandle};

use crate::error::{Result, VisualizerError};

/// Byte order of captured pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelLayout {
    Rgba,
    Bgra,
}

impl PixelLayout {
    fn ffmpeg_name(&self) -> &'static str {
        match self {
            Self::Rgba => "rgba",
            Self::Bgra => "bgra",
        }
    }
}

/// One read-back frame, tightly packed (`width * 4` bytes per row)
#[derive(Debug, Clone)]
pub struct RawFrame {
    pub width: u32,
    pub height: u32,
    pub layout: PixelLayout,
    pub pixels: Vec<u8>,
}

/// Geometry and rate of a capture stream, fixed for the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamSpec {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub layout: PixelLayout,
}

impl StreamSpec {
    pub fn matches(&self, frame: &RawFrame) -> bool {
        frame.width == self.width && frame.height == self.height && frame.layout == self.layout
    }
}

/// Container/codec combinations, in preference order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EncodingProfile {
    /// VP9 in WebM
    Vp9Webm,
    /// VP8 in WebM
    Vp8Webm,
}

impl EncodingProfile {
    pub const PREFERENCE: [EncodingProfile; 2] = [Self::Vp9Webm, Self::Vp8Webm];

    /// ffmpeg encoder name
    pub fn codec(&self) -> &'static str {
        match self {
            Self::Vp9Webm => "libvpx-vp9",
            Self::Vp8Webm => "libvpx",
        }
    }

    fn codec_args(&self) -> &'static [&'static str] {
        match self {
            Self::Vp9Webm => &[
                "-b:v",
                "0",
                "-crf",
                "31",
                "-deadline",
                "realtime",
                "-cpu-used",
                "8",
                "-row-mt",
                "1",
            ],
            Self::Vp8Webm => &["-b:v", "8M", "-deadline", "realtime", "-cpu-used", "8"],
        }
    }
}

/// A running encoder for one recording session
pub trait SegmentEncoder: Send {
    /// Queue a frame without blocking; `Ok(false)` when the queue is full and the frame was dropped
    fn submit(&mut self, frame: RawFrame) -> Result<bool>;

    /// Flush and return encoded container segments in arrival order
    fn finish(self: Box<Self>) -> Result<Vec<Vec<u8>>>;
}

/// Factory for [`SegmentEncoder`]s
pub trait EncoderBackend {
    fn supports(&mut self, profile: EncodingProfile) -> bool;

    fn open(&mut self, profile: EncodingProfile, spec: &StreamSpec)
        -> Result<Box<dyn SegmentEncoder>>;
}

/// Spawns ffmpeg, streaming raw frames in and WebM out
pub struct FfmpegBackend {
    bin: String,
    queue_depth: usize,
    probed: HashMap<EncodingProfile, bool>,
}

impl FfmpegBackend {
    pub fn new(bin: impl Into<String>, queue_depth: usize) -> Self {
        Self {
            bin: bin.into(),
            queue_depth: queue_depth.max(1),
            probed: HashMap::new(),
        }
    }

    fn probe(&self, codec: &str) -> bool {
        let output = Command::new(&self.bin)
            .args(["-hide_banner", "-encoders"])
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output();
        match output {
            Ok(out) if out.status.success() => String::from_utf8_lossy(&out.stdout)
                .lines()
                .any(|line| line.split_whitespace().nth(1) == Some(codec)),
            Ok(_) => false,
            Err(err) => {
                warn!("cannot run {}: {}", self.bin, err);
                false
            }
        }
    }
}

impl EncoderBackend for FfmpegBackend {
    fn supports(&mut self, profile: EncodingProfile) -> bool {
        if let Some(&known) = self.probed.get(&profile) {
            return known;
        }
        let available = self.probe(profile.codec());
        self.probed.insert(profile, available);
        available
    }

    fn open(
        &mut self,
        profile: EncodingProfile,
        spec: &StreamSpec,
    ) -> Result<Box<dyn SegmentEncoder>> {
        let size = format!("{}x{}", spec.width, spec.height);
        let fps = spec.fps.to_string();

        let mut cmd = Command::new(&self.bin);
        cmd.args(["-hide_banner", "-loglevel", "error", "-y"])
            .args(["-f", "rawvideo", "-pix_fmt", spec.layout.ffmpeg_name()])
            .args(["-s", &size, "-r", &fps, "-i", "-", "-an"])
            .args(["-vf", "scale=trunc(iw/2)*2:trunc(ih/2)*2", "-pix_fmt", "yuv420p"])
            .args(["-c:v", profile.codec()])
            .args(profile.codec_args())
            .args(["-f", "webm", "-"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = cmd
            .spawn()
            .map_err(|e| VisualizerError::Capture(format!("failed to spawn {}: {e}", self.bin)))?;

        let pipes = (child.stdin.take(), child.stdout.take(), child.stderr.take());
        let (stdin, stdout, stderr) = match pipes {
            (Some(i), Some(o), Some(e)) => (i, o, e),
            _ => {
                let _ = child.kill();
                return Err(VisualizerError::Capture("encoder pipes unavailable".into()));
            }
        };

        let (tx, rx) = bounded::<RawFrame>(self.queue_depth);
        let writer = thread::spawn(move || {
            let mut stdin = stdin;
            for frame in rx.iter() {
                if let Err(err) = stdin.write_all(&frame.pixels) {
                    debug!("encoder input closed: {}", err);
                    break;
                }
            }
            // Dropping stdin here signals end of stream
        });
        let reader = thread::spawn(move || read_segments(stdout));
        let errors = thread::spawn(move || {
            let mut text = String::new();
            let mut stderr = stderr;
            let _ = stderr.read_to_string(&mut text);
            text
        });

        debug!("encoder started: {} {} @ {}fps", profile.codec(), size, spec.fps);
        Ok(Box::new(FfmpegEncoder {
            child,
            frames: Some(tx),
            writer,
            reader,
            errors,
        }))
    }
}

/// Read stdout until EOF, one segment per read
fn read_segments(mut stdout: impl Read) -> Vec<Vec<u8>> {
    let mut segments = Vec::new();
    let mut buf = vec![0u8; 64 * 1024];
    loop {
        match stdout.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => segments.push(buf[..n].to_vec()),
            Err(err) if err.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(err) => {
                warn!("encoder output error: {}", err);
                break;
            }
        }
    }
    segments
}

struct FfmpegEncoder {
    child: Child,
    frames: Option<Sender<RawFrame>>,
    writer: JoinHandle<()>,
    reader: JoinHandle<Vec<Vec<u8>>>,
    errors: JoinHandle<String>,
}

impl SegmentEncoder for FfmpegEncoder {
    fn submit(&mut self, frame: RawFrame) -> Result<bool> {
        let Some(tx) = &self.frames else {
            return Err(VisualizerError::Capture("encoder already finished".into()));
        };
        match tx.try_send(frame) {
            Ok(()) => Ok(true),
            Err(TrySendError::Full(_)) => Ok(false),
            Err(TrySendError::Disconnected(_)) => {
                Err(VisualizerError::Capture("encoder exited while recording".into()))
            }
        }
    }

    fn finish(mut self: Box<Self>) -> Result<Vec<Vec<u8>>> {
        drop(self.frames.take());
        let this = *self;

        let _ = this.writer.join();
        let segments = this
            .reader
            .join()
            .map_err(|_| VisualizerError::Capture("encoder reader panicked".into()))?;
        let stderr = this.errors.join().unwrap_or_default();

        let mut child = this.child;
        let status = child.wait()?;
        if !status.success() {
            return Err(VisualizerError::Capture(format!(
                "encoder exited with {status}: {}",
                stderr.trim()
            )));
        }
        Ok(segments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_profiles_prefer_vp9() {
        assert_eq!(EncodingProfile::PREFERENCE[0], EncodingProfile::Vp9Webm);
        assert_eq!(EncodingProfile::Vp9Webm.codec(), "libvpx-vp9");
        assert_eq!(EncodingProfile::Vp8Webm.codec(), "libvpx");
    }

    #[test]
    fn test_read_segments_preserves_order() {
        let data: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        let segments = read_segments(Cursor::new(data.clone()));
        assert!(segments.len() > 1);
        assert_eq!(segments.concat(), data);
    }

    #[test]
    fn test_missing_binary_reports_no_support() {
        let mut backend = FfmpegBackend::new("/nonexistent/ffmpeg-for-tests", 4);
        assert!(!backend.supports(EncodingProfile::Vp9Webm));
        let spec = StreamSpec {
            width: 4,
            height: 4,
            fps: 60,
            layout: PixelLayout::Rgba,
        };
        assert!(matches!(
            backend.open(EncodingProfile::Vp9Webm, &spec),
            Err(VisualizerError::Capture(_))
        ));
    }

    #[test]
    fn test_stream_spec_matches_frame() {
        let spec = StreamSpec {
            width: 2,
            height: 2,
            fps: 60,
            layout: PixelLayout::Bgra,
        };
        let frame = RawFrame {
            width: 2,
            height: 2,
            layout: PixelLayout::Bgra,
            pixels: vec![0; 16],
        };
        assert!(spec.matches(&frame));
        assert!(!spec.matches(&RawFrame {
            layout: PixelLayout::Rgba,
            ..frame
        }));
    }
}
