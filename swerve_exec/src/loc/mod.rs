//! # Localisation module
//!
//! This module provides the robot's estimate of where it is on the field, fusing swerve wheel
//! odometry with pose observations from the vision system.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod estimator;
mod params;
mod pose;

// ---------------------------------------------------------------------------
// EXPORTS
// ---------------------------------------------------------------------------

pub use estimator::{LocReport, PoseEstimator, VisionObservation, VisionOutcome, VisionRejection};
pub use params::LocParams;
pub use pose::{Pose, Transform, Twist};

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors which can occur in the localisation module.
#[derive(Debug, thiserror::Error)]
pub enum LocError {
    #[error("Could not load parameters: {0}")]
    ParamLoadError(util::params::LoadError),

    #[error("Standard deviations must be finite and non-negative, found {0:?}")]
    InvalidStdDevs([f64; 3]),

    #[error("The odometry history window must be positive, found {0} s")]
    InvalidHistoryWindow(f64),
}
