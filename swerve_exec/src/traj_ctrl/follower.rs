//! Trajectory follower state

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::eqpt::drive::ChassisVelocity;
use log::trace;
use serde::{Deserialize, Serialize};

use super::{Params, PidController, TrajCtrlError};
use crate::loc::Pose;
use util::{maths::ang_dist, params};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A time indexed reference state along a trajectory.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct TrajectorySample {
    /// Time since the start of the trajectory.
    ///
    /// Units: seconds
    pub time_s: f64,

    /// Reference pose.
    pub pose: Pose,

    /// Reference velocity in the field frame.
    pub velocity_fd: ChassisVelocity,
}

/// Keeps the robot on a reference trajectory.
///
/// The reference velocity is fed forward and independent PID controllers correct the field X, field
/// Y and heading errors.
#[derive(Debug, Clone)]
pub struct TrajCtrl {
    params: Params,

    x_ctrl: PidController,
    y_ctrl: PidController,
    head_ctrl: PidController,

    report: StatusReport,
}

/// The status report containing tracking errors and monitoring flags.
#[derive(Debug, Default, Copy, Clone, Serialize)]
pub struct StatusReport {
    /// Error along field X.
    pub x_error_m: f64,

    /// Error along field Y.
    pub y_error_m: f64,

    /// Wrapped heading error.
    pub head_error_rad: f64,

    /// True if the position error is larger than the limit in the parameters.
    pub position_error_limit_exceeded: bool,

    /// True if the heading error is larger than the limit in the parameters.
    pub head_error_limit_exceeded: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl TrajCtrl {
    /// Create a new controller from the parameters.
    pub fn new(params: Params) -> Self {
        Self {
            x_ctrl: PidController::new(params.x_k_p, params.x_k_i, params.x_k_d),
            y_ctrl: PidController::new(params.y_k_p, params.y_k_i, params.y_k_d),
            head_ctrl: PidController::new(params.head_k_p, params.head_k_i, params.head_k_d),
            params,
            report: StatusReport::default(),
        }
    }

    /// Load the parameters from the given file and create a new controller.
    pub fn init(params_path: &str) -> Result<Self, TrajCtrlError> {
        let params = params::load(params_path).map_err(TrajCtrlError::ParamLoadError)?;

        Ok(Self::new(params))
    }

    /// Clear the controllers' history, called at the start of every trajectory.
    pub fn reset(&mut self) {
        self.x_ctrl.reset();
        self.y_ctrl.reset();
        self.head_ctrl.reset();
        self.report = StatusReport::default();
    }

    pub fn report(&self) -> StatusReport {
        self.report
    }

    /// Compute the robot frame chassis velocity that follows the reference from the current pose.
    pub fn follow(
        &mut self,
        reference: &TrajectorySample,
        pose: &Pose,
        dt_s: f64,
    ) -> ChassisVelocity {
        let x_error_m = reference.pose.x_m() - pose.x_m();
        let y_error_m = reference.pose.y_m() - pose.y_m();

        // Wrapped so the controller always turns the short way round
        let head_error_rad = ang_dist(pose.heading_rad, reference.pose.heading_rad);

        self.report = StatusReport {
            x_error_m,
            y_error_m,
            head_error_rad,
            position_error_limit_exceeded: x_error_m.hypot(y_error_m)
                > self.params.position_error_limit_m,
            head_error_limit_exceeded: head_error_rad.abs() > self.params.head_error_limit_rad,
        };

        let field = ChassisVelocity::new(
            reference.velocity_fd.vx_ms + self.x_ctrl.get(x_error_m, dt_s),
            reference.velocity_fd.vy_ms + self.y_ctrl.get(y_error_m, dt_s),
            reference.velocity_fd.omega_rads + self.head_ctrl.get(head_error_rad, dt_s),
        );

        trace!("TrajCtrl errors: {:?}", self.report);

        ChassisVelocity::from_field_relative(field, pose.heading_rad)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::f64::consts::PI;

    fn reference(x: f64, y: f64, heading: f64, vx: f64) -> TrajectorySample {
        TrajectorySample {
            time_s: 0.0,
            pose: Pose::new(x, y, heading),
            velocity_fd: ChassisVelocity::new(vx, 0.0, 0.0),
        }
    }

    #[test]
    fn test_on_trajectory_is_pure_feedforward() {
        let mut tc = TrajCtrl::new(Params::default());
        let v = tc.follow(&reference(1.0, 1.0, 0.0, 2.0), &Pose::new(1.0, 1.0, 0.0), 0.02);
        assert!((v.vx_ms - 2.0).abs() < 1e-12);
        assert_eq!(v.vy_ms, 0.0);
        assert_eq!(v.omega_rads, 0.0);
    }

    #[test]
    fn test_corrects_towards_reference() {
        let mut tc = TrajCtrl::new(Params::default());

        // Robot is 1 m to the right of the reference, facing field +Y
        let v = tc.follow(&reference(0.0, 0.0, PI / 2.0, 0.0), &Pose::new(1.0, 0.0, PI / 2.0), 0.02);

        // Field -X is to the robot's left
        assert!(v.vx_ms.abs() < 1e-12);
        assert!((v.vy_ms - 0.7).abs() < 1e-12);
        assert!(tc.report().position_error_limit_exceeded);
    }

    #[test]
    fn test_heading_error_wraps() {
        let mut tc = TrajCtrl::new(Params {
            head_k_d: 0.0,
            ..Params::default()
        });

        // Reference just anticlockwise of the discontinuity, robot just clockwise of it
        let v = tc.follow(
            &reference(0.0, 0.0, -PI + 0.1, 0.0),
            &Pose::new(0.0, 0.0, PI - 0.1),
            0.02,
        );

        let err = tc.report().head_error_rad;
        assert!((err - 0.2).abs() < 1e-9);
        assert!(err > -PI && err <= PI);
        assert!(v.omega_rads > 0.0 && v.omega_rads < 0.05);
    }
}
