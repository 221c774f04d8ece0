//! Parameters structure for LocoCtrl

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::eqpt::drive::NUM_MODULES;
use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for Locomotion control.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct Params {
    // ---- GEOMETRY ----
    /// The position of each module's steer axis in the robot body frame, in the order front left,
    /// front right, rear left, rear right.
    ///
    /// Units: meters,
    /// Frame: Robot body
    pub module_pos_m_rb: [[f64; 2]; NUM_MODULES],

    // ---- CAPABILITIES ----
    /// Maximum achievable wheel speed of a module.
    ///
    /// Units: meters/second
    pub max_module_speed_ms: f64,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_shipped_params_parse() {
        let p: Params = util::params::from_str(include_str!("../../../params/loco_ctrl.toml")).unwrap();
        assert!(p.max_module_speed_ms > 0.0);

        // Front left is forward and to the left of the centre
        assert!(p.module_pos_m_rb[0][0] > 0.0 && p.module_pos_m_rb[0][1] > 0.0);
    }
}
