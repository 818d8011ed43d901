use thiserror::Error;

pub type Result<T, E = IntentError> = core::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum IntentError {
    #[error("invalid keyword pattern: {0}")]
    Pattern(#[from] regex::Error),
    #[error("label {0:?} is not a known command")]
    UnknownLabel(String),
    #[error("classifier backend error: {0}")]
    Backend(String),
    #[error("invalid matcher configuration: {0}")]
    InvalidConfig(&'static str),
    #[error("not supported in this build: {0}")]
    Unsupported(&'static str),
}
