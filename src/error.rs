//! Error types for the noise engine and its collaborators.

use thiserror::Error;

/// Result type alias for focus_noise operations
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The output stream could not be built or started
    #[error("Audio backend failed to start: {0}")]
    AudioBackendStart(String),

    #[error("No output device available")]
    NoOutputDevice,

    #[error("Output device '{0}' not found")]
    DeviceNotFound(String),

    #[error("Unsupported sample format: {0}")]
    UnsupportedSampleFormat(String),

    /// Registering or unregistering the login item failed
    #[error("Launch at login registration failed: {0}")]
    LaunchAtLoginRegistration(String),

    #[error("Settings IO error: {0}")]
    SettingsIo(#[from] std::io::Error),

    #[error("Settings serialization error: {0}")]
    SettingsSerialize(#[from] toml::ser::Error),

    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    #[error("No settings directory available on this platform")]
    NoSettingsDir,
}
