//! # Swerve Executable Parameters
//!
//! This module provide parameters for the swerve executable.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwerveExecParams {
    /// Target period of one control cycle.
    ///
    /// Units: seconds
    pub cycle_period_s: f64,

    /// Directory containing trajectory files, relative to the software root.
    pub traj_dir: String,

    /// Length of the field along field X.
    ///
    /// Units: meters
    pub field_length_m: f64,

    /// Timeout of autonomous routines when none is given.
    ///
    /// Units: seconds
    pub default_timeout_s: f64,

    /// Number of consecutive cycle overruns before an alert is raised.
    pub max_consec_overruns: u64,
}
