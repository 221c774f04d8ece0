//! # Drivetrain Equipment Demands and Sensor Data

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

use crate::tc::ParseEnumError;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// The number of swerve modules on the drivetrain.
pub const NUM_MODULES: usize = 4;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A velocity of the chassis.
///
/// Whether this is in the robot body or field frame depends on the producer, anything handed to
/// the actuation interface is in the robot body frame.
#[derive(Serialize, Deserialize, Debug, Default, Clone, Copy, PartialEq)]
pub struct ChassisVelocity {
    /// Velocity along the X axis (forwards in the robot body frame).
    ///
    /// Units: meters/second
    pub vx_ms: f64,

    /// Velocity along the Y axis (left in the robot body frame).
    ///
    /// Units: meters/second
    pub vy_ms: f64,

    /// Angular rate about Z, anticlockwise positive.
    ///
    /// Units: radians/second
    pub omega_rads: f64,
}

/// The measured state of a single swerve module.
#[derive(Serialize, Deserialize, Debug, Default, Clone, Copy, PartialEq)]
pub struct ModuleState {
    /// Distance travelled by the drive wheel since the actuation interface started.
    ///
    /// Units: meters
    pub drive_pos_m: f64,

    /// Linear speed of the drive wheel.
    ///
    /// Units: meters/second
    pub drive_vel_ms: f64,

    /// Absolute angle of the steer axis, zero pointing along the robot X axis.
    ///
    /// Units: radians
    pub steer_angle_rad: f64,

    /// Rate of the steer axis.
    ///
    /// Units: radians/second
    pub steer_vel_rads: f64,
}

/// The demanded state of a single swerve module.
#[derive(Serialize, Deserialize, Debug, Default, Clone, Copy, PartialEq)]
pub struct ModuleTarget {
    /// Demanded wheel speed.
    ///
    /// Units: meters/second
    pub speed_ms: f64,

    /// Demanded absolute steer angle.
    ///
    /// Units: radians
    pub angle_rad: f64,
}

/// Sensor data reported by the actuation interface every cycle.
#[derive(Serialize, Deserialize, Debug, Default, Clone, Copy, PartialEq)]
pub struct DriveSensData {
    /// Measured module states, in module order (FL, FR, RL, RR).
    pub modules: [ModuleState; NUM_MODULES],

    /// True if a module has reported a fault or failed to return data this cycle.
    pub faults: [bool; NUM_MODULES],

    /// Raw gyro heading, anticlockwise positive.
    ///
    /// Units: radians
    pub gyro_heading_rad: f64,

    /// Raw gyro yaw rate.
    ///
    /// Units: radians/second
    pub gyro_rate_rads: f64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Demands sent to the actuation interface. Exactly one of these is sent each cycle.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub enum DriveDems {
    /// Closed loop speed and angle targets for each module.
    Modules([ModuleTarget; NUM_MODULES]),

    /// Open loop voltage applied to one mechanism of the drivetrain, used for characterization.
    SysIdVolts {
        mechanism: SysIdMechanism,
        volts: f64,
    },
}

/// A drivetrain mechanism which can be characterized.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SysIdMechanism {
    /// All drive motors, with the modules pointing forwards.
    Translation,

    /// All drive motors, with the modules tangent to the rotation circle.
    Rotation,

    /// All steer motors.
    Steer,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl ChassisVelocity {
    pub fn new(vx_ms: f64, vy_ms: f64, omega_rads: f64) -> Self {
        Self {
            vx_ms,
            vy_ms,
            omega_rads,
        }
    }

    /// A velocity demanding the chassis be stationary.
    pub fn zero() -> Self {
        Self::default()
    }

    /// Returns true if all components are exactly zero.
    pub fn is_zero(&self) -> bool {
        self.vx_ms == 0.0 && self.vy_ms == 0.0 && self.omega_rads == 0.0
    }

    /// Convert a field frame velocity into the robot body frame, given the robot's heading in the
    /// field frame.
    pub fn from_field_relative(field: ChassisVelocity, heading_rad: f64) -> Self {
        let (sin, cos) = heading_rad.sin_cos();

        Self {
            vx_ms: field.vx_ms * cos + field.vy_ms * sin,
            vy_ms: -field.vx_ms * sin + field.vy_ms * cos,
            omega_rads: field.omega_rads,
        }
    }

    /// Convert this robot body frame velocity into the field frame.
    pub fn to_field_relative(&self, heading_rad: f64) -> Self {
        let (sin, cos) = heading_rad.sin_cos();

        Self {
            vx_ms: self.vx_ms * cos - self.vy_ms * sin,
            vy_ms: self.vx_ms * sin + self.vy_ms * cos,
            omega_rads: self.omega_rads,
        }
    }

    /// Magnitude of the linear part of the velocity.
    pub fn linear_speed_ms(&self) -> f64 {
        self.vx_ms.hypot(self.vy_ms)
    }
}

impl DriveSensData {
    /// Returns true if any module is reporting a fault.
    pub fn is_degraded(&self) -> bool {
        self.faults.iter().any(|f| *f)
    }
}

impl Default for DriveDems {
    fn default() -> Self {
        DriveDems::Modules([ModuleTarget::default(); NUM_MODULES])
    }
}

impl DriveDems {
    /// Returns true if this demand will not move anything.
    pub fn is_stop(&self) -> bool {
        match self {
            DriveDems::Modules(targets) => targets.iter().all(|t| t.speed_ms == 0.0),
            DriveDems::SysIdVolts { volts, .. } => *volts == 0.0,
        }
    }
}

impl FromStr for SysIdMechanism {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "translation" | "trans" => Ok(SysIdMechanism::Translation),
            "rotation" | "rot" => Ok(SysIdMechanism::Rotation),
            "steer" | "str" => Ok(SysIdMechanism::Steer),
            _ => Err(ParseEnumError::Unknown {
                kind: "mechanism",
                value: s.to_string(),
            }),
        }
    }
}

impl Display for SysIdMechanism {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SysIdMechanism::Translation => write!(f, "translation"),
            SysIdMechanism::Rotation => write!(f, "rotation"),
            SysIdMechanism::Steer => write!(f, "steer"),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_field_relative_round_trip_at_quarter_turn() {
        // Robot facing +Y in the field, a field +Y velocity is robot forwards
        let robot = ChassisVelocity::from_field_relative(ChassisVelocity::new(0.0, 1.0, 0.5), PI / 2.0);
        assert!((robot.vx_ms - 1.0).abs() < 1e-12);
        assert!(robot.vy_ms.abs() < 1e-12);
        assert_eq!(robot.omega_rads, 0.5);

        let field = robot.to_field_relative(PI / 2.0);
        assert!(field.vx_ms.abs() < 1e-12);
        assert!((field.vy_ms - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_mechanism_parse() {
        assert_eq!("Translation".parse::<SysIdMechanism>().unwrap(), SysIdMechanism::Translation);
        assert_eq!("steer".parse::<SysIdMechanism>().unwrap(), SysIdMechanism::Steer);
        assert!("wheel".parse::<SysIdMechanism>().is_err());
    }

    #[test]
    fn test_default_dems_is_stop() {
        assert!(DriveDems::default().is_stop());
        assert!(!DriveDems::SysIdVolts {
            mechanism: SysIdMechanism::Steer,
            volts: 1.0
        }
        .is_stop());
    }
}
