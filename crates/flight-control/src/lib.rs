//! flight-control: drone commands → simulator maneuvers
//!
//! [`plan`] maps a [`DroneCommand`](intent_matcher::DroneCommand) to a
//! [`Maneuver`] under a [`MotionProfile`]; a [`DroneController`] executes
//! maneuvers against any [`MultirotorClient`](sim_client::MultirotorClient);
//! the [`CommandExecutor`] keeps at most one maneuver in flight.

mod error;
pub use error::{FlightError, Result};

mod profile;
pub use profile::{MotionProfile, MovementMode};

mod plan;
pub use plan::{plan, Maneuver};

mod cancel;
pub use cancel::CancelToken;

pub mod capture;

mod controller;
pub use controller::{Completion, DroneController};

mod executor;
pub use executor::{CommandExecutor, CommandId};

mod session;
pub use session::FlightSession;

mod metrics;
pub use metrics::PilotMetrics;
