//! # Trajectory controllers module
//!
//! This module provides the PID controller used by TrajCtrl.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Serialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A PID controller
#[derive(Debug, Serialize, Clone)]
pub struct PidController {
    /// Proportional gain
    k_p: f64,

    /// Integral gain
    k_i: f64,

    /// Dervative gain
    k_d: f64,

    /// Previous error
    prev_error: Option<f64>,

    /// The integral accumulation
    integral: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PidController {
    /// Create a new controller with the given gains.
    pub fn new(k_p: f64, k_i: f64, k_d: f64) -> Self {
        Self {
            k_p,
            k_i,
            k_d,
            integral: 0f64,
            prev_error: None,
        }
    }

    /// Get the value of the controller for the given error, `dt_s` seconds after the previous
    /// call.
    pub fn get(&mut self, error: f64, dt_s: f64) -> f64 {
        // Proportional only without a time step
        let (integral_step, deriv) = if dt_s > 0.0 {
            let deriv = match self.prev_error {
                Some(e) => (error - e) / dt_s,
                None => 0f64,
            };
            (error * dt_s, deriv)
        } else {
            (0f64, 0f64)
        };

        self.integral += integral_step;

        let out = self.k_p * error + self.k_i * self.integral + self.k_d * deriv;

        self.prev_error = Some(error);

        out
    }

    /// Clear the integral and derivative history.
    pub fn reset(&mut self) {
        self.integral = 0f64;
        self.prev_error = None;
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_pid_terms() {
        let mut p = PidController::new(2.0, 0.0, 0.0);
        assert_eq!(p.get(0.5, 0.02), 1.0);

        let mut i = PidController::new(0.0, 1.0, 0.0);
        i.get(1.0, 0.5);
        assert!((i.get(1.0, 0.5) - 1.0).abs() < 1e-12);

        // First derivative sample has no history to difference against
        let mut d = PidController::new(0.0, 0.0, 1.0);
        assert_eq!(d.get(1.0, 0.1), 0.0);
        assert!((d.get(1.5, 0.1) - 5.0).abs() < 1e-9);

        d.reset();
        assert_eq!(d.get(3.0, 0.1), 0.0);
    }
}
