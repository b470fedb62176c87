//! Error types for the Vocalis engine

use thiserror::Error;
use vocalis_voice::VoiceError;

/// Result type alias for engine operations
pub type SimResult<T> = Result<T, SimError>;

/// Errors raised by the engine.
///
/// Backend failures (`Generation`, `Synthesis`, `Transcription`, `Analysis`) are
/// normally caught inside the loops and turned into notices; the remaining variants
/// are returned to callers that used an entry point in the wrong state.
#[derive(Error, Debug)]
pub enum SimError {
    #[error("Generation failed: {0}")]
    Generation(String),

    #[error("Speech synthesis failed: {0}")]
    Synthesis(String),

    #[error("Transcription failed: {0}")]
    Transcription(String),

    #[error("Performance analysis failed: {0}")]
    Analysis(String),

    #[error("Session persistence error: {0}")]
    Persistence(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("A run is already active for this session")]
    RunActive,

    #[error("No run is active")]
    NotRunning,

    #[error("A round is already in flight")]
    RoundInFlight,

    #[error("A recording is already active")]
    CaptureActive,

    #[error("No recording is active")]
    NoCapture,

    #[error(transparent)]
    Voice(#[from] VoiceError),
}

impl From<sled::Error> for SimError {
    fn from(err: sled::Error) -> Self {
        SimError::Persistence(err.to_string())
    }
}

impl From<serde_json::Error> for SimError {
    fn from(err: serde_json::Error) -> Self {
        SimError::Persistence(err.to_string())
    }
}

impl From<config::ConfigError> for SimError {
    fn from(err: config::ConfigError) -> Self {
        SimError::Config(err.to_string())
    }
}
