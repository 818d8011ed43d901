use sim_client::SimError;
use thiserror::Error;

pub type Result<T, E = FlightError> = core::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum FlightError {
    #[error("simulator: {0}")]
    Sim(#[from] SimError),
    #[error("the simulator returned no image")]
    NoImage,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("executor is shut down")]
    ShutDown,
    #[error("failed to start worker thread: {0}")]
    Spawn(String),
    #[error("metrics: {0}")]
    Metrics(#[from] prometheus::Error),
    #[error("invalid motion profile: {0}")]
    InvalidProfile(&'static str),
}
