//! sim-client: multirotor simulator client abstractions
//!
//! This crate provides the blocking [`MultirotorClient`] trait used to fly a
//! simulated quadrotor, the shared pose/image types, and a [`Task`] handle for
//! long-running maneuvers. The default build enables a `mock` backend: an
//! in-process kinematic simulator so binaries and tests run without an
//! external simulator.

mod types;
pub use types::{
    ImageRequest, ImageResponse, ImageType, Kinematics, LandedState, MultirotorState,
    Quaternionr, Vector3r,
};

mod error;
pub use error::{Result, SimError};

mod task;
pub use task::{Task, TaskId, TaskOutcome};

mod traits;
pub use traits::MultirotorClient;

pub mod math;

#[cfg(feature = "mock")]
mod mock;

#[cfg(feature = "mock")]
pub use mock::{MockConfig, MockMultirotor};
