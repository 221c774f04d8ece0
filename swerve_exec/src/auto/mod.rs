//! # Autonomy Module
//!
//! This module runs pre-planned autonomous routines. A routine is a group of trajectory segments
//! followed one after the other, with event commands attached to each segment, mirrored for the
//! alliance the robot is on and bounded by a timeout.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Event command lifecycle counters
pub mod cmd_log;

/// Commands attached to routine segments
pub mod event;

/// The routine state machine
pub mod routine;

/// Trajectory files and groups
pub mod traj;

pub mod tm;

// ------------------------------------------------------------------------------------------------
// EXPORTS
// ------------------------------------------------------------------------------------------------

pub use cmd_log::{CmdLogMode, CmdLogTm, CmdLogger};
pub use event::{CmdFactory, EventCmd, EventCtx, EventMap, LogCmd, NoOpCmd, WaitCmd};
pub use routine::{AutoRoutine, AutoState, DEFAULT_TIMEOUT_S};
pub use tm::AutoTm;
pub use traj::{available_routines, TrajError, Trajectory, TrajectoryGroup, DO_NOTHING_ROUTINE};

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Errors that can occur when setting up an autonomous routine.
#[derive(Debug, thiserror::Error)]
pub enum AutoError {
    #[error("Could not load the routine's trajectories: {0}")]
    TrajError(TrajError),

    #[error("Routine timeout must be positive, found {0} s")]
    InvalidTimeout(f64),
}
