use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Audio device error: {0}")]
    Device(#[from] DeviceError),

    #[error("Signaling channel error: {0}")]
    Channel(String),

    #[error("Audio decode error: {0}")]
    Decode(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Shutdown requested")]
    ShutdownRequested,

    #[error("Fatal error, cannot recover: {0}")]
    Fatal(String),
}

/// Microphone/speaker acquisition and stream failures.
///
/// Reported exactly once per failure; the core never retries on its own.
/// Whether to re-acquire the device is the caller's decision.
#[derive(Error, Debug)]
pub enum DeviceError {
    #[error("Input device not found: {name:?}")]
    DeviceNotFound { name: Option<String> },

    #[error("Output device not found")]
    NoOutputDevice,

    #[error("Device disconnected")]
    DeviceDisconnected,

    #[error("Sample format not supported: {format}")]
    FormatNotSupported { format: String },

    #[error("CPAL stream error: {0}")]
    Stream(#[from] cpal::StreamError),

    #[error("Build stream error: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("Play stream error: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),

    #[error("Supported stream configs error: {0}")]
    SupportedStreamConfigs(#[from] cpal::SupportedStreamConfigsError),

    #[error("Device enumeration error: {0}")]
    Devices(#[from] cpal::DevicesError),

    #[error("Default stream config error: {0}")]
    DefaultStreamConfig(#[from] cpal::DefaultStreamConfigError),

    #[error("Fatal error, cannot recover: {0}")]
    Fatal(String),
}
