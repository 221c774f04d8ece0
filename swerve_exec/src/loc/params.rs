//! # Localisation parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the pose estimator.
#[derive(Debug, Clone, Deserialize)]
pub struct LocParams {
    /// Standard deviations of the odometry state, as [forward (m), lateral (m), heading (rad)].
    ///
    /// Larger values trust odometry less and vision more.
    pub state_std_devs: [f64; 3],

    /// Default standard deviations of vision observations, as [forward (m), lateral (m),
    /// heading (rad)], used when an observation doesn't carry its own.
    pub vision_std_devs: [f64; 3],

    /// Length of odometry history kept for fusing late vision observations. Observations older
    /// than this are discarded.
    ///
    /// Units: seconds
    pub history_window_s: f64,
}

impl Default for LocParams {
    fn default() -> Self {
        Self {
            state_std_devs: [0.1, 0.1, 0.1],
            vision_std_devs: [0.9, 0.9, 0.9],
            history_window_s: 1.5,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_shipped_params_parse() {
        let p: LocParams = util::params::from_str(include_str!("../../../params/loc.toml")).unwrap();
        assert!(p.history_window_s > 0.0);
        assert!(p.vision_std_devs.iter().all(|s| *s > 0.0));
    }
}
