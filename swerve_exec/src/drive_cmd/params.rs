//! Parameters structure for DriveCmd

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the drive command translator.
#[derive(Debug, Clone, Deserialize)]
pub struct Params {
    // ---- SHAPING ----
    /// Deadband applied to the normalised forward and strafe axes.
    pub translation_deadband: f64,

    /// Deadband applied to the normalised rotation axis.
    pub rotation_deadband: f64,

    /// Maximum rate of change of the normalised forward and strafe axes.
    ///
    /// Units: 1/second
    pub translation_slew_rate_ps: f64,

    /// Maximum rate of change of the normalised rotation axis.
    ///
    /// Units: 1/second
    pub rotation_slew_rate_ps: f64,

    /// Speed scale applied with the slow mode axis fully pressed.
    pub slow_mode_min_scale: f64,

    // ---- LIMITS ----
    /// Chassis speed commanded by a full translation input.
    ///
    /// Units: meters/second
    pub max_speed_ms: f64,

    /// Chassis rate commanded by a full rotation input.
    ///
    /// Units: radians/second
    pub max_angular_rate_rads: f64,

    // ---- FRAMING ----
    /// If true the translation axes are relative to the field on startup.
    pub field_relative: bool,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            translation_deadband: 0.1,
            rotation_deadband: 0.1,
            translation_slew_rate_ps: 2.0,
            rotation_slew_rate_ps: 2.0,
            slow_mode_min_scale: 0.2,
            max_speed_ms: 4.572,
            max_angular_rate_rads: 1.5 * std::f64::consts::PI,
            field_relative: true,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_shipped_params_parse() {
        let p: Params = util::params::from_str(include_str!("../../../params/drive_cmd.toml")).unwrap();
        assert!(p.translation_deadband < 1.0);
        assert!(p.slow_mode_min_scale > 0.0 && p.slow_mode_min_scale <= 1.0);
    }
}
