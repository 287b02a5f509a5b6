//! Command-line argument parsing.

use std::path::PathBuf;

use clap::Parser;
use log::{info, warn};

use crate::error::Result;
use crate::params::{AnalyzerConfig, RecordingConfig};
use crate::scene::SceneMode;

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "vibe-visualizer")]
#[command(about = "Audio-reactive 3D visualizer with WebM capture", long_about = None)]
pub struct Args {
    /// WAV file to play and visualize
    #[arg(value_name = "AUDIO")]
    pub audio: PathBuf,

    /// Initial mode: orb (default), terrain, party, wall
    #[arg(long, value_name = "MODE", default_value = "orb")]
    pub mode: String,

    /// Analyzer FFT size (power of two, 32..=32768)
    #[arg(long, value_name = "SAMPLES", default_value_t = 2048)]
    pub fft_size: usize,

    /// Seed for crowd and particle generation (random when omitted)
    #[arg(long, value_name = "SEED")]
    pub seed: Option<u64>,

    /// Directory recordings are written into
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub output_dir: PathBuf,

    /// Start recording as soon as the window opens
    #[arg(long)]
    pub record: bool,
}

impl Args {
    /// Parse the initial mode, falling back to the orb
    pub fn parse_mode(&self) -> SceneMode {
        match self.mode.parse::<SceneMode>() {
            Ok(mode) => {
                info!("Mode: {}", mode);
                mode
            }
            Err(err) => {
                warn!("{}, using orb", err);
                SceneMode::Orb
            }
        }
    }

    /// Analyzer configuration with the requested FFT size
    pub fn analyzer_config(&self) -> Result<AnalyzerConfig> {
        let config = AnalyzerConfig {
            fft_size: self.fft_size,
            ..Default::default()
        };
        config.validate()?;
        Ok(config)
    }

    pub fn recording_config(&self) -> RecordingConfig {
        RecordingConfig {
            output_dir: self.output_dir.clone(),
            ..Default::default()
        }
    }
}
