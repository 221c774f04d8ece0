//! # Drive Client
//!
//! The interface to the drivetrain's actuation firmware. Each cycle sensor data is read from the
//! drivetrain and exactly one set of demands is sent to it.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::eqpt::drive::{DriveDems, DriveSensData, ModuleTarget, NUM_MODULES};
use log::trace;

use crate::loco_ctrl::SwerveKinematics;

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

pub trait DriveIf {
    /// Read the latest sensor data from the drivetrain.
    fn read_sens(&mut self) -> Result<DriveSensData, DriveIfError>;

    /// Send this cycle's demands to the drivetrain.
    fn send_dems(&mut self, dems: &DriveDems) -> Result<(), DriveIfError>;
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A drivetrain which immediately achieves whatever it is asked to do.
///
/// Module targets are reported back as the measured module states, with the drive positions and
/// the gyro integrated over the cycle period. Voltage demands don't move anything. Used to run the
/// executable on the bench.
pub struct LoopbackDrive {
    kinematics: SwerveKinematics,
    period_s: f64,
    sens: DriveSensData,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum DriveIfError {
    #[error("Demands contain non-finite values: {0:?}")]
    NonFiniteDemand(DriveDems),

    #[error("Module {0} index is out of range")]
    InvalidModule(usize),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl LoopbackDrive {
    pub fn new(kinematics: SwerveKinematics, period_s: f64) -> Self {
        Self {
            kinematics,
            period_s,
            sens: DriveSensData::default(),
        }
    }

    /// Mark a module as faulted, which is reported in the sensor data.
    pub fn set_fault(&mut self, module: usize, faulted: bool) -> Result<(), DriveIfError> {
        match self.sens.faults.get_mut(module) {
            Some(f) => {
                *f = faulted;
                Ok(())
            }
            None => Err(DriveIfError::InvalidModule(module)),
        }
    }

    fn apply_targets(&mut self, targets: &[ModuleTarget; NUM_MODULES]) {
        for (m, t) in self.sens.modules.iter_mut().zip(targets.iter()) {
            m.steer_vel_rads = (t.angle_rad - m.steer_angle_rad) / self.period_s;
            m.steer_angle_rad = t.angle_rad;
            m.drive_vel_ms = t.speed_ms;
            m.drive_pos_m += t.speed_ms * self.period_s;
        }

        let vel = self.kinematics.to_chassis_velocity(&self.sens.modules);
        self.sens.gyro_rate_rads = vel.omega_rads;
        self.sens.gyro_heading_rad += vel.omega_rads * self.period_s;
    }
}

impl DriveIf for LoopbackDrive {
    fn read_sens(&mut self) -> Result<DriveSensData, DriveIfError> {
        Ok(self.sens)
    }

    fn send_dems(&mut self, dems: &DriveDems) -> Result<(), DriveIfError> {
        trace!("Loopback demands: {:?}", dems);

        match dems {
            DriveDems::Modules(targets) => {
                let finite = targets
                    .iter()
                    .all(|t| t.speed_ms.is_finite() && t.angle_rad.is_finite());
                if !finite {
                    return Err(DriveIfError::NonFiniteDemand(*dems));
                }
                self.apply_targets(targets);
            }
            DriveDems::SysIdVolts { volts, .. } => {
                if !volts.is_finite() {
                    return Err(DriveIfError::NonFiniteDemand(*dems));
                }
                for m in self.sens.modules.iter_mut() {
                    m.drive_vel_ms = 0.0;
                    m.steer_vel_rads = 0.0;
                }
                self.sens.gyro_rate_rads = 0.0;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn drive() -> LoopbackDrive {
        let kin =
            SwerveKinematics::new([[0.3, 0.3], [0.3, -0.3], [-0.3, 0.3], [-0.3, -0.3]]).unwrap();
        LoopbackDrive::new(kin, 0.02)
    }

    #[test]
    fn test_loopback_integrates_targets() {
        let mut d = drive();
        let targets = [ModuleTarget {
            speed_ms: 1.0,
            angle_rad: 0.0,
        }; NUM_MODULES];

        for _ in 0..50 {
            d.send_dems(&DriveDems::Modules(targets)).unwrap();
        }

        let sens = d.read_sens().unwrap();
        assert!((sens.modules[0].drive_pos_m - 1.0).abs() < 1e-9);
        assert_eq!(sens.modules[3].drive_vel_ms, 1.0);
        assert!(sens.gyro_heading_rad.abs() < 1e-9);
    }

    #[test]
    fn test_faults_and_bad_demands() {
        let mut d = drive();
        d.set_fault(1, true).unwrap();
        assert!(d.read_sens().unwrap().is_degraded());
        assert!(d.set_fault(NUM_MODULES, true).is_err());

        let mut targets = [ModuleTarget::default(); NUM_MODULES];
        targets[0].speed_ms = std::f64::NAN;
        assert!(matches!(
            d.send_dems(&DriveDems::Modules(targets)),
            Err(DriveIfError::NonFiniteDemand(_))
        ));
    }
}
