//! Swerve drive kinematics
//!
//! Inverse kinematics maps a chassis velocity onto each module's speed and steer angle. Forward
//! kinematics recovers the chassis motion from the modules by least squares, since four modules
//! over-determine the three degrees of freedom of the chassis.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::eqpt::drive::{ChassisVelocity, ModuleState, ModuleTarget, NUM_MODULES};
use nalgebra::{Matrix3, Vector2, Vector3};

use super::LocoCtrlError;
use crate::loc::Twist;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Kinematic model of the drivetrain.
#[derive(Debug, Clone)]
pub struct SwerveKinematics {
    /// Position of each module's steer axis in the robot body frame.
    ///
    /// Units: meters,
    /// Frame: Robot body
    module_pos_m_rb: [Vector2<f64>; NUM_MODULES],

    /// Inverse of the normal matrix of the forward kinematics problem.
    normal_inv: Matrix3<f64>,
}

/// A module's accumulated drive distance and steer angle.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ModulePosition {
    pub distance_m: f64,
    pub angle_rad: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SwerveKinematics {
    /// Build the model from the module positions in the robot body frame.
    ///
    /// Fails if the modules do not span the chassis motion, for example if they are all at the
    /// same point.
    pub fn new(module_pos_m_rb: [[f64; 2]; NUM_MODULES]) -> Result<Self, LocoCtrlError> {
        let mut pos = [Vector2::zeros(); NUM_MODULES];
        let mut normal = Matrix3::zeros();

        for (i, p) in module_pos_m_rb.iter().enumerate() {
            let (px, py) = (p[0], p[1]);
            pos[i] = Vector2::new(px, py);

            // Rows of the model for this module are [1, 0, -py] and [0, 1, px]
            normal += Matrix3::new(
                1.0, 0.0, -py,
                0.0, 1.0, px,
                -py, px, px * px + py * py,
            );
        }

        let normal_inv = normal
            .try_inverse()
            .ok_or(LocoCtrlError::DegenerateGeometry(module_pos_m_rb))?;

        Ok(Self {
            module_pos_m_rb: pos,
            normal_inv,
        })
    }

    /// Position of the modules in the robot body frame.
    pub fn module_positions(&self) -> &[Vector2<f64>; NUM_MODULES] {
        &self.module_pos_m_rb
    }

    /// Compute the speed and angle each module needs to produce the given robot frame velocity.
    ///
    /// For a zero velocity every module is given a zero speed and zero angle, callers wishing to
    /// hold the current angles must handle that case themselves.
    pub fn to_module_targets(&self, vel: &ChassisVelocity) -> [ModuleTarget; NUM_MODULES] {
        let mut targets = [ModuleTarget::default(); NUM_MODULES];

        if vel.is_zero() {
            return targets;
        }

        for (target, p) in targets.iter_mut().zip(self.module_pos_m_rb.iter()) {
            let vx = vel.vx_ms - vel.omega_rads * p[1];
            let vy = vel.vy_ms + vel.omega_rads * p[0];

            target.speed_ms = vx.hypot(vy);
            target.angle_rad = vy.atan2(vx);
        }

        targets
    }

    /// Estimate the robot frame chassis velocity from measured module states.
    pub fn to_chassis_velocity(&self, states: &[ModuleState; NUM_MODULES]) -> ChassisVelocity {
        let x = self.solve(
            states
                .iter()
                .map(|s| (s.drive_vel_ms, s.steer_angle_rad)),
        );

        ChassisVelocity::new(x[0], x[1], x[2])
    }

    /// Estimate the twist of the chassis from the change in each module's position.
    ///
    /// Each delta is the distance driven since the last update paired with the module's current
    /// angle.
    pub fn to_twist(&self, deltas: &[ModulePosition; NUM_MODULES]) -> Twist {
        let x = self.solve(deltas.iter().map(|d| (d.distance_m, d.angle_rad)));

        Twist::new(x[0], x[1], x[2])
    }

    /// Least squares solution of the forward kinematics for per-module (magnitude, angle) pairs.
    fn solve<I>(&self, modules: I) -> Vector3<f64>
    where
        I: Iterator<Item = (f64, f64)>,
    {
        let mut rhs = Vector3::zeros();

        for ((mag, angle), p) in modules.zip(self.module_pos_m_rb.iter()) {
            let (sin, cos) = angle.sin_cos();
            let (mx, my) = (mag * cos, mag * sin);

            rhs += Vector3::new(mx, my, -p[1] * mx + p[0] * my);
        }

        self.normal_inv * rhs
    }
}
