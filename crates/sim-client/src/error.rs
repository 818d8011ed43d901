use thiserror::Error;

pub type Result<T, E = SimError> = core::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("API control is not enabled")]
    ApiControlDisabled,
    #[error("vehicle is not armed")]
    NotArmed,
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
    #[error("backend error: {0}")]
    Backend(String),
    #[error("I/O error: {0}")]
    Io(String),
}
