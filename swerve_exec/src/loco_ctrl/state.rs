//! Implementations for the LocoCtrl state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::trace;
use serde::Serialize;
use std::f64::consts::FRAC_PI_2;

// Internal
use super::{LocoCtrlError, Params, SwerveKinematics};
use comms_if::eqpt::drive::{ChassisVelocity, ModuleState, ModuleTarget, NUM_MODULES};
use util::{
    maths::{ang_dist, wrap_angle},
    module::State,
    params,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Locomotion control module state
#[derive(Default)]
pub struct LocoCtrl {
    pub(crate) params: Params,

    kinematics: Option<SwerveKinematics>,

    pub(crate) report: StatusReport,

    pub(crate) output: Option<OutputData>,
}

/// Input data to Locomotion Control.
#[derive(Default, Clone, Copy)]
pub struct InputData {
    /// The robot frame chassis velocity to achieve, or `None` if nothing commanded the chassis this
    /// cycle, which is treated as a stop.
    pub cmd: Option<ChassisVelocity>,

    /// The measured state of the modules, used to pick the shortest steer move.
    pub measured: [ModuleState; NUM_MODULES],
}

/// Output targets from LocoCtrl that the actuation interface must execute.
#[derive(Clone, Copy, Serialize, Debug, Default, PartialEq)]
pub struct OutputData {
    pub targets: [ModuleTarget; NUM_MODULES],
}

/// Status report for LocoCtrl processing.
#[derive(Clone, Copy, Default, Serialize, Debug)]
pub struct StatusReport {
    /// True if the module speeds were scaled down to stay within the maximum module speed.
    pub desaturated: bool,

    /// True if a module's drive direction was reversed to shorten its steer move.
    pub drive_reversed: [bool; NUM_MODULES],

    /// True if this cycle's output is a stop, holding the steer angles.
    pub stopped: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl State for LocoCtrl {
    type InitData = &'static str;
    type InitError = LocoCtrlError;

    type InputData = InputData;
    type OutputData = OutputData;
    type StatusReport = StatusReport;
    type ProcError = LocoCtrlError;

    /// Initialise the LocoCtrl module.
    ///
    /// Expected init data is the path to the parameter file
    fn init(&mut self, init_data: Self::InitData) -> Result<(), Self::InitError> {
        let params: Params = params::load(init_data).map_err(LocoCtrlError::ParamLoadError)?;

        *self = Self::new(params)?;

        Ok(())
    }

    /// Perform cyclic processing of Locomotion Control.
    fn proc(
        &mut self,
        input_data: &Self::InputData,
    ) -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError> {
        // Clear the status report
        self.report = StatusReport::default();

        let output = match input_data.cmd {
            Some(cmd) if !cmd.is_zero() => self.calc_targets(&cmd, &input_data.measured)?,
            _ => self.calc_stop(&input_data.measured),
        };

        trace!("LocoCtrl output: {:?}", output.targets);

        self.output = Some(output);

        Ok((output, self.report))
    }
}

impl LocoCtrl {
    /// Create a new instance from the given parameters.
    pub fn new(params: Params) -> Result<Self, LocoCtrlError> {
        if !(params.max_module_speed_ms > 0.0) {
            return Err(LocoCtrlError::InvalidMaxSpeed(params.max_module_speed_ms));
        }

        let kinematics = SwerveKinematics::new(params.module_pos_m_rb)?;

        Ok(Self {
            params,
            kinematics: Some(kinematics),
            report: StatusReport::default(),
            output: None,
        })
    }

    /// The kinematic model built from the parameters, if initialised.
    pub fn kinematics(&self) -> Option<&SwerveKinematics> {
        self.kinematics.as_ref()
    }

    /// Calculate module targets for a non-zero chassis velocity.
    fn calc_targets(
        &mut self,
        cmd: &ChassisVelocity,
        measured: &[ModuleState; NUM_MODULES],
    ) -> Result<OutputData, LocoCtrlError> {
        if !(cmd.vx_ms.is_finite() && cmd.vy_ms.is_finite() && cmd.omega_rads.is_finite()) {
            return Err(LocoCtrlError::InvalidCommand(*cmd));
        }

        let kinematics = self
            .kinematics
            .as_ref()
            .ok_or(LocoCtrlError::NotInitialised)?;

        let mut targets = kinematics.to_module_targets(cmd);

        self.desaturate(&mut targets);

        // Never steer a module more than a quarter turn, drive it backwards instead
        for (i, (target, state)) in targets.iter_mut().zip(measured.iter()).enumerate() {
            if ang_dist(state.steer_angle_rad, target.angle_rad).abs() > FRAC_PI_2 {
                target.angle_rad = wrap_angle(target.angle_rad + std::f64::consts::PI);
                target.speed_ms = -target.speed_ms;
                self.report.drive_reversed[i] = true;
            }
        }

        Ok(OutputData { targets })
    }

    /// Scale all module speeds by the same factor so that none exceed the maximum.
    fn desaturate(&mut self, targets: &mut [ModuleTarget; NUM_MODULES]) {
        let fastest_ms = targets
            .iter()
            .map(|t| t.speed_ms.abs())
            .fold(0.0, f64::max);

        if fastest_ms > self.params.max_module_speed_ms {
            let scale = self.params.max_module_speed_ms / fastest_ms;
            for t in targets.iter_mut() {
                t.speed_ms *= scale;
            }
            self.report.desaturated = true;
        }
    }

    /// Perform the stop calculations.
    ///
    /// The stop shall:
    ///     1. Maintain the current steer angle targets, or the measured angles if there are none
    ///     2. Set all drive speeds to zero.
    ///
    /// Stop shall never error.
    fn calc_stop(&mut self, measured: &[ModuleState; NUM_MODULES]) -> OutputData {
        let mut output = match self.output {
            Some(o) => o,
            None => {
                let mut o = OutputData::default();
                for (t, m) in o.targets.iter_mut().zip(measured.iter()) {
                    t.angle_rad = m.steer_angle_rad;
                }
                o
            }
        };

        for t in output.targets.iter_mut() {
            t.speed_ms = 0.0;
        }

        self.report.stopped = true;

        output
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::f64::consts::PI;

    fn loco_ctrl() -> LocoCtrl {
        LocoCtrl::new(Params {
            module_pos_m_rb: [[0.3, 0.3], [0.3, -0.3], [-0.3, 0.3], [-0.3, -0.3]],
            max_module_speed_ms: 4.0,
        })
        .unwrap()
    }

    fn input(cmd: Option<ChassisVelocity>) -> InputData {
        InputData {
            cmd,
            measured: [ModuleState::default(); NUM_MODULES],
        }
    }

    #[test]
    fn test_invalid_params() {
        assert!(matches!(
            LocoCtrl::new(Params {
                module_pos_m_rb: [[0.3, 0.3], [0.3, -0.3], [-0.3, 0.3], [-0.3, -0.3]],
                max_module_speed_ms: 0.0,
            }),
            Err(LocoCtrlError::InvalidMaxSpeed(_))
        ));
    }

    #[test]
    fn test_stop_holds_angles() {
        let mut lc = loco_ctrl();

        let (out, rpt) = lc
            .proc(&input(Some(ChassisVelocity::new(0.0, 1.0, 0.0))))
            .unwrap();
        assert!(!rpt.stopped);
        assert!((out.targets[0].angle_rad - PI / 2.0).abs() < 1e-12);

        // With nothing commanding the chassis the angles are held and the drive stopped
        let (out, rpt) = lc.proc(&input(None)).unwrap();
        assert!(rpt.stopped);
        for t in out.targets.iter() {
            assert_eq!(t.speed_ms, 0.0);
            assert!((t.angle_rad - PI / 2.0).abs() < 1e-12);
        }

        let (out2, _) = lc.proc(&input(Some(ChassisVelocity::zero()))).unwrap();
        assert_eq!(out, out2);
    }

    #[test]
    fn test_desaturation_preserves_ratios() {
        let mut lc = loco_ctrl();
        let (out, rpt) = lc
            .proc(&input(Some(ChassisVelocity::new(4.0, 0.0, 6.0))))
            .unwrap();

        assert!(rpt.desaturated);
        let fastest = out
            .targets
            .iter()
            .map(|t| t.speed_ms.abs())
            .fold(0.0, f64::max);
        assert!((fastest - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_reverse_instead_of_half_turn() {
        let mut lc = loco_ctrl();
        let (out, rpt) = lc
            .proc(&input(Some(ChassisVelocity::new(-1.0, 0.0, 0.0))))
            .unwrap();

        // Modules at zero should drive backwards rather than turn around
        for (i, t) in out.targets.iter().enumerate() {
            assert!(rpt.drive_reversed[i]);
            assert!((t.speed_ms + 1.0).abs() < 1e-12);
            assert!(t.angle_rad.abs() < 1e-12);
        }
    }

    #[test]
    fn test_non_finite_command_rejected() {
        let mut lc = loco_ctrl();
        assert!(matches!(
            lc.proc(&input(Some(ChassisVelocity::new(std::f64::NAN, 0.0, 0.0)))),
            Err(LocoCtrlError::InvalidCommand(_))
        ));
    }
}
