//! Frame capture: Idle / Armed state machine around a WebM encoder.
//!
//! While armed, the render loop asks [`CaptureController::should_capture`]
//! each frame and hands read-back frames to [`CaptureController::push_frame`].
//! Encoding runs off the frame thread; segments are collected in arrival order
//! and concatenated into one file on [`CaptureController::stop`].

mod encoder;
mod pacer;

use log::{error, info, warn};
use std::fs;
use std::path::PathBuf;

// Re-export public types
pub use encoder::{
    EncoderBackend, EncodingProfile, FfmpegBackend, PixelLayout, RawFrame, SegmentEncoder,
    StreamSpec,
};
pub use pacer::FramePacer;

use crate::error::{Result, VisualizerError};
use crate::params::RecordingConfig;

/// Result of a start request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started(EncodingProfile),
    /// A session was already running; nothing changed
    AlreadyArmed,
}

/// An armed recording
struct RecordingSession {
    encoder: Box<dyn SegmentEncoder>,
    profile: EncodingProfile,
    spec: StreamSpec,
    pacer: FramePacer,
    submitted: u64,
    dropped: u64,
    mismatched: u64,
}

enum CaptureState {
    Idle,
    Armed(RecordingSession),
}

pub struct CaptureController<B: EncoderBackend> {
    backend: B,
    config: RecordingConfig,
    state: CaptureState,
}

impl CaptureController<FfmpegBackend> {
    pub fn with_ffmpeg(config: RecordingConfig) -> Self {
        let backend = FfmpegBackend::new(config.ffmpeg_bin.clone(), config.queue_depth);
        Self::new(backend, config)
    }
}

impl<B: EncoderBackend> CaptureController<B> {
    pub fn new(backend: B, config: RecordingConfig) -> Self {
        Self {
            backend,
            config,
            state: CaptureState::Idle,
        }
    }

    pub fn is_armed(&self) -> bool {
        matches!(self.state, CaptureState::Armed(_))
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Arm with the first available profile; stays Idle and errors if none opens
    pub fn start(&mut self, width: u32, height: u32, layout: PixelLayout) -> Result<StartOutcome> {
        if self.is_armed() {
            warn!("recording already in progress");
            return Ok(StartOutcome::AlreadyArmed);
        }

        let spec = StreamSpec {
            width,
            height,
            fps: self.config.fps,
            layout,
        };

        let mut failures = Vec::new();
        for profile in EncodingProfile::PREFERENCE {
            if !self.backend.supports(profile) {
                failures.push(format!("{} unavailable", profile.codec()));
                continue;
            }
            match self.backend.open(profile, &spec) {
                Ok(encoder) => {
                    info!("Recording started ({}, {}x{})", profile.codec(), width, height);
                    self.state = CaptureState::Armed(RecordingSession {
                        encoder,
                        profile,
                        spec,
                        pacer: FramePacer::new(spec.fps),
                        submitted: 0,
                        dropped: 0,
                        mismatched: 0,
                    });
                    return Ok(StartOutcome::Started(profile));
                }
                Err(err) => {
                    warn!("{} failed to open: {}", profile.codec(), err);
                    failures.push(err.to_string());
                }
            }
        }

        Err(VisualizerError::Capture(format!(
            "no WebM encoder could be started ({})",
            failures.join("; ")
        )))
    }

    /// Whether the frame rendered at `now_s` should be read back
    pub fn should_capture(&mut self, now_s: f64) -> bool {
        match &mut self.state {
            CaptureState::Armed(session) => session.pacer.admit(now_s),
            CaptureState::Idle => false,
        }
    }

    /// Hand a read-back frame to the encoder; ignored while Idle
    ///
    /// An encoder failure ends the session and is returned to the caller.
    pub fn push_frame(&mut self, frame: RawFrame) -> Result<()> {
        let CaptureState::Armed(session) = &mut self.state else {
            return Ok(());
        };
        if !session.spec.matches(&frame) {
            if session.mismatched == 0 {
                warn!(
                    "frame {}x{} does not match recording {}x{}; skipping",
                    frame.width, frame.height, session.spec.width, session.spec.height
                );
            }
            session.mismatched += 1;
            return Ok(());
        }

        match session.encoder.submit(frame) {
            Ok(true) => session.submitted += 1,
            Ok(false) => session.dropped += 1,
            Err(err) => {
                error!("recording aborted: {}", err);
                if let CaptureState::Armed(session) =
                    std::mem::replace(&mut self.state, CaptureState::Idle)
                {
                    let _ = session.encoder.finish();
                }
                return Err(err);
            }
        }
        Ok(())
    }

    /// Submit frames still in flight at stop time, then finalize
    ///
    /// An encoder failure while submitting ends the session without a file.
    pub fn stop_after(
        &mut self,
        frames: impl IntoIterator<Item = RawFrame>,
    ) -> Result<Option<PathBuf>> {
        for frame in frames {
            self.push_frame(frame)?;
        }
        self.stop()
    }

    /// Finalize the recording into a `.webm` file; `Ok(None)` when not armed
    pub fn stop(&mut self) -> Result<Option<PathBuf>> {
        let CaptureState::Armed(session) = std::mem::replace(&mut self.state, CaptureState::Idle)
        else {
            return Ok(None);
        };

        if session.dropped > 0 {
            warn!("{} frames dropped while the encoder was busy", session.dropped);
        }
        let (submitted, profile) = (session.submitted, session.profile);
        let segments = session.encoder.finish()?;

        let path = self.config.output_path();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&path, segments.concat())?;

        info!(
            "Recording saved: {} ({} frames, {})",
            path.display(),
            submitted,
            profile.codec()
        );
        Ok(Some(path))
    }
}
