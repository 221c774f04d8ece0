//! Parameters structure for the characterization routines

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::eqpt::drive::SysIdMechanism;
use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct Params {
    /// Rate at which the quasistatic test increases the voltage.
    ///
    /// Units: volts/second
    pub ramp_rate_vps: f64,

    /// Voltage of the dynamic test step for each mechanism.
    ///
    /// Units: volts
    pub translation_step_v: f64,
    pub rotation_step_v: f64,
    pub steer_step_v: f64,

    /// Duration after which a test is stopped if it hasn't been already.
    ///
    /// Units: seconds
    pub timeout_s: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Params {
    fn default() -> Self {
        Self {
            ramp_rate_vps: 1.0,
            translation_step_v: 4.0,
            rotation_step_v: 4.0,
            steer_step_v: 7.0,
            timeout_s: 10.0,
        }
    }
}

impl Params {
    pub fn step_v(&self, mechanism: SysIdMechanism) -> f64 {
        match mechanism {
            SysIdMechanism::Translation => self.translation_step_v,
            SysIdMechanism::Rotation => self.rotation_step_v,
            SysIdMechanism::Steer => self.steer_step_v,
        }
    }
}
