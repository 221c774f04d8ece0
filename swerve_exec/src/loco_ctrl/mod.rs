//! Locomotion control module
//!
//! Converts the single chassis velocity demanded each cycle into speed and steer angle targets for
//! the four swerve modules.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod kinematics;
mod params;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use kinematics::*;
pub use params::*;
pub use state::*;

use comms_if::eqpt::drive::{ChassisVelocity, NUM_MODULES};

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during LocoCtrl operation.
#[derive(Debug, thiserror::Error)]
pub enum LocoCtrlError {
    #[error("Could not load parameters: {0}")]
    ParamLoadError(util::params::LoadError),

    #[error("LocoCtrl has not been initialised")]
    NotInitialised,

    #[error("The module positions {0:?} do not span the chassis motion")]
    DegenerateGeometry([[f64; 2]; NUM_MODULES]),

    #[error("The maximum module speed must be positive, found {0}")]
    InvalidMaxSpeed(f64),

    #[error("Recieved a non-finite chassis velocity command: {0:?}")]
    InvalidCommand(ChassisVelocity),
}
