//! Trajectory control parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for trajectory control
#[derive(Deserialize, Debug, Clone)]
pub struct Params {
    /// Field X error controller proportional gain
    pub x_k_p: f64,

    /// Field X error controller integral gain
    pub x_k_i: f64,

    /// Field X error controller derivative gain
    pub x_k_d: f64,

    /// Field Y error controller proportional gain
    pub y_k_p: f64,

    /// Field Y error controller integral gain
    pub y_k_i: f64,

    /// Field Y error controller derivative gain
    pub y_k_d: f64,

    /// Heading controller proportional gain
    pub head_k_p: f64,

    /// Heading controller integral gain
    pub head_k_i: f64,

    /// Heading controller derivative gain
    pub head_k_d: f64,

    /// Position error above which the status report flags the follower as off the trajectory.
    ///
    /// Units: meters
    pub position_error_limit_m: f64,

    /// Heading error above which the status report flags the follower as off the trajectory.
    ///
    /// Units: radians
    pub head_error_limit_rad: f64,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            x_k_p: 0.7,
            x_k_i: 0.0,
            x_k_d: 0.0,
            y_k_p: 0.7,
            y_k_i: 0.0,
            y_k_d: 0.0,
            head_k_p: 0.05,
            head_k_i: 0.0,
            head_k_d: 0.01,
            position_error_limit_m: 0.5,
            head_error_limit_rad: 0.5,
        }
    }
}
