//! vibe-visualizer - a playing track drives one of four 3D scenes
//!
//! Keys: 1 orb, 2 terrain, 3 party, 4 wall, R record, Space pause, Esc quit.

use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use clap::Parser;
use log::{error, info, warn};
use winit::{
    application::ApplicationHandler,
    event::*,
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use vibe_visualizer::audio::{AudioClip, LiveAnalyzer, Playback, SampleTap};
use vibe_visualizer::camera::CameraSystem;
use vibe_visualizer::capture::{CaptureController, FfmpegBackend, StartOutcome};
use vibe_visualizer::cli::Args;
use vibe_visualizer::params::{AnalyzerConfig, RenderConfig};
use vibe_visualizer::pipeline::FramePipeline;
use vibe_visualizer::rendering::{FrameUniforms, RenderSystem};
use vibe_visualizer::scene::{SceneMode, SceneParams, SceneSelector, SurfaceInfo};

/// Main application state
struct App {
    // Window and rendering
    window: Option<Arc<Window>>,
    render_system: Option<RenderSystem>,

    // Audio
    clip: Arc<AudioClip>,
    analyzer: LiveAnalyzer,
    playback: Option<Playback>,
    finished_logged: bool,

    // Animation
    pipeline: FramePipeline,
    camera: CameraSystem,

    // Capture
    capture: CaptureController<FfmpegBackend>,
    record_on_start: bool,
    capture_error: Option<String>,

    // Configuration
    render_config: RenderConfig,

    // Time tracking
    start_time: Instant,
    title: String,
}

impl App {
    fn new(args: &Args, clip: AudioClip, analyzer_config: AnalyzerConfig) -> anyhow::Result<Self> {
        let render_config = RenderConfig::default();
        let surface = SurfaceInfo {
            width: render_config.window_width,
            height: render_config.window_height,
        };

        let tap = SampleTap::new(analyzer_config.fft_size * 2);
        let analyzer = LiveAnalyzer::new(analyzer_config, tap).context("analyzer setup")?;
        let scene_params = SceneParams::default();
        scene_params.validate().context("invalid scene settings")?;
        let selector = SceneSelector::new(args.parse_mode(), scene_params, surface, args.seed);

        Ok(Self {
            window: None,
            render_system: None,
            clip: Arc::new(clip),
            analyzer,
            playback: None,
            finished_logged: false,
            pipeline: FramePipeline::new(selector),
            camera: CameraSystem::default(),
            capture: CaptureController::with_ffmpeg(args.recording_config()),
            record_on_start: args.record,
            capture_error: None,
            render_config,
            start_time: Instant::now(),
            title: String::new(),
        })
    }
}

impl ApplicationHandler for App {
    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return; // Already initialized
        }

        let window_attributes = Window::default_attributes()
            .with_title("vibe-visualizer")
            .with_inner_size(winit::dpi::LogicalSize::new(
                self.render_config.window_width,
                self.render_config.window_height,
            ));

        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                error!("Failed to create window: {}", e);
                event_loop.exit();
                return;
            }
        };

        let render_system = match pollster::block_on(RenderSystem::new(Arc::clone(&window))) {
            Ok(render_system) => render_system,
            Err(e) => {
                error!("{}", e);
                event_loop.exit();
                return;
            }
        };
        self.apply_size(render_system.size());

        // Rendering continues silently without an output device
        match Playback::start(Arc::clone(&self.clip), self.analyzer.tap()) {
            Ok(playback) => self.playback = Some(playback),
            Err(e) => error!("{}", e),
        }

        info!("vibe-visualizer is running");
        info!("Keys: 1-4 switch mode, R record, Space pause, Esc quit");

        self.window = Some(window);
        self.render_system = Some(render_system);

        if self.record_on_start {
            self.toggle_recording();
        }
        self.update_title();
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => {
                if let Some(render_system) = &mut self.render_system {
                    render_system.resize(size.width, size.height);
                    let size = render_system.size();
                    self.apply_size(size);
                }
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        state: ElementState::Pressed,
                        physical_key: PhysicalKey::Code(code),
                        repeat: false,
                        ..
                    },
                ..
            } => self.handle_key(event_loop, code),
            WindowEvent::RedrawRequested => self.render_frame(event_loop),
            _ => {}
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.finish_recording();
    }
}

impl App {
    fn handle_key(&mut self, event_loop: &ActiveEventLoop, code: KeyCode) {
        let mode = match code {
            KeyCode::Digit1 => Some(SceneMode::Orb),
            KeyCode::Digit2 => Some(SceneMode::Terrain),
            KeyCode::Digit3 => Some(SceneMode::Crowd),
            KeyCode::Digit4 => Some(SceneMode::Wall),
            KeyCode::KeyR => {
                self.toggle_recording();
                None
            }
            KeyCode::Space => {
                if let Some(playback) = &self.playback {
                    let paused = playback.transport().toggle_pause();
                    info!("Playback {}", if paused { "paused" } else { "resumed" });
                }
                None
            }
            KeyCode::Escape => {
                event_loop.exit();
                None
            }
            _ => None,
        };

        if let Some(mode) = mode {
            self.pipeline.switch(mode);
        }
        self.update_title();
    }

    fn apply_size(&mut self, (width, height): (u32, u32)) {
        self.render_config.window_width = width;
        self.render_config.window_height = height;
        self.pipeline
            .selector_mut()
            .resize(SurfaceInfo { width, height });
    }

    fn toggle_recording(&mut self) {
        if self.capture.is_armed() {
            self.finish_recording();
            return;
        }

        let Some(render_system) = &self.render_system else {
            return;
        };
        let Some(layout) = render_system.capture_layout() else {
            self.capture_error = Some("surface cannot be captured".into());
            error!("Recording unavailable: surface cannot be captured");
            return;
        };

        let (width, height) = render_system.size();
        match self.capture.start(width, height, layout) {
            Ok(StartOutcome::Started(_)) | Ok(StartOutcome::AlreadyArmed) => {
                self.capture_error = None;
            }
            Err(e) => {
                error!("Recording failed to start: {}", e);
                self.capture_error = Some(e.to_string());
            }
        }
    }

    fn finish_recording(&mut self) {
        if !self.capture.is_armed() {
            return;
        }
        // Frames still in flight belong to this recording
        let pending = self
            .render_system
            .as_mut()
            .map(RenderSystem::flush_captures)
            .unwrap_or_default();
        match self.capture.stop_after(pending) {
            Ok(Some(path)) => info!("Saved {}", path.display()),
            Ok(None) => {}
            Err(e) => {
                error!("Failed to save recording: {}", e);
                self.capture_error = Some(e.to_string());
            }
        }
    }

    fn update_title(&mut self) {
        let Some(window) = &self.window else {
            return;
        };
        let mut title = format!("vibe-visualizer - {}", self.pipeline.mode());
        if self.capture.is_armed() {
            title.push_str(" [REC]");
        } else if let Some(err) = &self.capture_error {
            title.push_str(&format!(" [capture failed: {err}]"));
        }
        if title != self.title {
            window.set_title(&title);
            self.title = title;
        }
    }

    /// Render a single frame
    fn render_frame(&mut self, event_loop: &ActiveEventLoop) {
        let Some(render_system) = &mut self.render_system else {
            return;
        };

        let elapsed = self.start_time.elapsed();
        let time_s = elapsed.as_secs_f32();

        let mode = self.pipeline.mode();
        let dressing = self.pipeline.dressing();
        let (view_proj, eye) = self
            .camera
            .create_view_proj_matrix(mode, time_s, &self.render_config);
        let uniforms = FrameUniforms::new(view_proj, eye, &dressing);

        let list = self.pipeline.tick(&mut self.analyzer, time_s);
        let capture = self.capture.should_capture(elapsed.as_secs_f64());

        match render_system.render(list, &uniforms, dressing.draw_sky, capture) {
            Ok(_) => {}
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                render_system.reconfigure();
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                error!("GPU out of memory");
                event_loop.exit();
                return;
            }
            Err(e) => warn!("Render error: {:?}", e),
        }

        for frame in render_system.poll_captures() {
            if let Err(e) = self.capture.push_frame(frame) {
                self.capture_error = Some(e.to_string());
            }
        }

        if !self.finished_logged {
            if let Some(playback) = &self.playback {
                if playback.transport().is_finished() {
                    info!("Playback finished");
                    self.finished_logged = true;
                }
            }
        }

        self.update_title();
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let analyzer_config = args.analyzer_config().context("invalid analyzer settings")?;

    // Nothing is created before the track is known to decode
    let clip = match AudioClip::open(&args.audio) {
        Ok(clip) => clip,
        Err(e) => {
            error!("{}: {}", args.audio.display(), e);
            std::process::exit(1);
        }
    };
    info!(
        "Loaded {} ({:.1}s, {}Hz)",
        args.audio.display(),
        clip.duration_secs(),
        clip.sample_rate
    );

    let mut app = App::new(&args, clip, analyzer_config)?;
    let event_loop = EventLoop::new().context("failed to create event loop")?;
    event_loop.run_app(&mut app).context("event loop failed")?;
    Ok(())
}
