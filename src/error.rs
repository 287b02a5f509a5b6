//! Error types shared by the audio, capture and rendering layers.

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, VisualizerError>;

#[derive(Debug, thiserror::Error)]
pub enum VisualizerError {
    /// Audio file could not be opened or decoded
    #[error("failed to decode audio: {0}")]
    AudioDecode(String),

    /// No usable output device, or the stream could not be built
    #[error("audio device error: {0}")]
    AudioDevice(String),

    /// Adapter, device or surface setup failed
    #[error("GPU error: {0}")]
    Gpu(String),

    /// Recording could not be started or finalized
    #[error("capture error: {0}")]
    Capture(String),

    /// A configuration value is outside its valid range
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<hound::Error> for VisualizerError {
    fn from(err: hound::Error) -> Self {
        Self::AudioDecode(err.to_string())
    }
}
