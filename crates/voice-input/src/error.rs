use thiserror::Error;

pub type Result<T, E = VoiceError> = core::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum VoiceError {
    /// Audio was captured but no words came out of it.
    #[error("could not understand the audio")]
    NotUnderstood,
    #[error("speech service error: {0}")]
    Service(String),
    #[error("audio device error: {0}")]
    Audio(String),
    #[error("operation not supported in this build: {0}")]
    Unsupported(&'static str),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
