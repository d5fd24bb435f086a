//! Error types for voxtimer.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum VoxtimerError {
    // Configuration errors
    #[error("Configuration file not found at {path}")]
    ConfigFileNotFound { path: String },

    #[error("Failed to parse configuration: {message}")]
    ConfigParse { message: String },

    #[error("Invalid configuration value for {key}: {message}")]
    ConfigInvalidValue { key: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Invalid stage '{stage}': {message}")]
    InvalidStage { stage: String, message: String },

    #[error(
        "Countdown announcement '{text}' takes {duration_ms}ms at rate {rate}, \
         must be under 1000ms (raise tts.rate_countdown)"
    )]
    CountdownTooSlow {
        text: String,
        duration_ms: u64,
        rate: u32,
    },

    // Synthesis errors
    #[error("Speech synthesizer not available: {program}")]
    SynthesisUnavailable { program: String },

    #[error("Speech synthesis failed for '{text}': {message}")]
    Synthesis { text: String, message: String },

    // Playback errors
    #[error("Audio player not available: {program}")]
    PlayerUnavailable { program: String },

    #[error("Playback failed: {message}")]
    Playback { message: String },

    // Output errors
    #[error("WAV encoding failed: {message}")]
    Wav { message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Broken invariants and crashed tasks
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse classification used to decide what is fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Synthesis,
    Io,
    /// A bug or a crashed worker, not something the user can fix.
    Internal,
}

impl VoxtimerError {
    /// Classify the error.
    ///
    /// Configuration and I/O errors are always fatal. Synthesis errors are fatal
    /// unless the run opted into best-effort mode.
    pub fn kind(&self) -> ErrorKind {
        match self {
            VoxtimerError::ConfigFileNotFound { .. }
            | VoxtimerError::ConfigParse { .. }
            | VoxtimerError::ConfigInvalidValue { .. }
            | VoxtimerError::Config(_)
            | VoxtimerError::InvalidStage { .. }
            | VoxtimerError::CountdownTooSlow { .. } => ErrorKind::Configuration,
            VoxtimerError::SynthesisUnavailable { .. } | VoxtimerError::Synthesis { .. } => {
                ErrorKind::Synthesis
            }
            VoxtimerError::PlayerUnavailable { .. }
            | VoxtimerError::Playback { .. }
            | VoxtimerError::Wav { .. }
            | VoxtimerError::Io(_) => ErrorKind::Io,
            VoxtimerError::Internal(_) => ErrorKind::Internal,
        }
    }

    pub(crate) fn invalid_value(key: &str, message: impl Into<String>) -> Self {
        VoxtimerError::ConfigInvalidValue {
            key: key.to_string(),
            message: message.into(),
        }
    }
}

impl From<hound::Error> for VoxtimerError {
    fn from(e: hound::Error) -> Self {
        match e {
            hound::Error::IoError(io) => VoxtimerError::Io(io),
            other => VoxtimerError::Wav {
                message: other.to_string(),
            },
        }
    }
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, VoxtimerError>;
