//! Characterization routine state

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::{
    eqpt::drive::{DriveDems, DriveSensData, SysIdMechanism, NUM_MODULES},
    tc::{SysIdDirection, SysIdTest},
};
use log::{info, trace};
use serde::Serialize;

use super::{Params, SysIdError, SysIdLog, SysIdRecord};
use util::{module::State, params};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// State name logged when no test is running.
pub const STATE_NONE: &str = "none";

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Open loop characterization of one drivetrain mechanism at a time.
///
/// The quasistatic test ramps the voltage up from zero, the dynamic test applies a fixed step.
/// While a test runs the output demands bypass locomotion control entirely.
#[derive(Default)]
pub struct SysId {
    params: Params,

    log: Option<Box<dyn SysIdLog>>,

    active: Option<ActiveTest>,
}

/// A test to perform.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SysIdSpec {
    pub mechanism: SysIdMechanism,
    pub test: SysIdTest,
    pub direction: SysIdDirection,

    /// Stop after this long instead of the timeout in the parameters.
    ///
    /// Units: seconds
    pub duration_s: Option<f64>,
}

#[derive(Debug, Clone, Copy)]
struct ActiveTest {
    spec: SysIdSpec,
    start_time_s: f64,
    timeout_s: f64,
}

/// Input data to the characterization routines.
#[derive(Debug, Clone, Copy, Default)]
pub struct InputData {
    /// Session time.
    ///
    /// Units: seconds
    pub time_s: f64,

    /// Latest drivetrain sensor data.
    pub sens: DriveSensData,

    /// Set to stop the running test this cycle.
    pub stop: bool,
}

/// Status report for the characterization routines.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StatusReport {
    /// The current test state, `none` if no test is running.
    pub state: String,

    /// Units: volts
    pub volts: f64,

    /// Time the running test has been going for.
    ///
    /// Units: seconds
    pub elapsed_s: f64,

    /// True on the cycle in which a test stopped.
    pub stopped: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl State for SysId {
    type InitData = &'static str;
    type InitError = SysIdError;

    type InputData = InputData;
    type OutputData = Option<DriveDems>;
    type StatusReport = StatusReport;
    type ProcError = SysIdError;

    /// Expected init data is the path to the parameter file
    fn init(&mut self, init_data: Self::InitData) -> Result<(), Self::InitError> {
        self.params = params::load(init_data).map_err(SysIdError::ParamLoadError)?;
        Ok(())
    }

    /// Produce this cycle's voltage demand.
    ///
    /// Returns no demand when no test is running, and a zero voltage demand on the cycle a test
    /// stops.
    fn proc(
        &mut self,
        input_data: &Self::InputData,
    ) -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError> {
        let active = match self.active {
            Some(a) => a,
            None => {
                return Ok((
                    None,
                    StatusReport {
                        state: STATE_NONE.into(),
                        ..Default::default()
                    },
                ))
            }
        };

        let time_s = input_data.time_s;
        let elapsed_s = time_s - active.start_time_s;
        let mechanism = active.spec.mechanism;

        if input_data.stop || elapsed_s >= active.timeout_s {
            info!(
                "SysId {} stopped after {:.2} s",
                state_name(&active.spec),
                elapsed_s
            );
            self.active = None;
            self.write(SysIdRecord::marker(time_s, mechanism, STATE_NONE))?;

            return Ok((
                Some(DriveDems::SysIdVolts {
                    mechanism,
                    volts: 0.0,
                }),
                StatusReport {
                    state: STATE_NONE.into(),
                    volts: 0.0,
                    elapsed_s,
                    stopped: true,
                },
            ));
        }

        let volts = self.volts(&active.spec, elapsed_s);
        let (position, velocity) = measure(mechanism, &input_data.sens);

        trace!("SysId {:.3} V, pos {:.4}, vel {:.4}", volts, position, velocity);

        let state = state_name(&active.spec);
        self.write(SysIdRecord {
            time_s,
            mechanism,
            state: state.clone(),
            volts: Some(volts),
            position: Some(position),
            velocity: Some(velocity),
        })?;

        Ok((
            Some(DriveDems::SysIdVolts { mechanism, volts }),
            StatusReport {
                state,
                volts,
                elapsed_s,
                stopped: false,
            },
        ))
    }
}

impl SysId {
    pub fn new(params: Params) -> Self {
        Self {
            params,
            log: None,
            active: None,
        }
    }

    /// Write records to the given log.
    pub fn with_log<L: SysIdLog + 'static>(mut self, log: L) -> Self {
        self.log = Some(Box::new(log));
        self
    }

    pub fn is_running(&self) -> bool {
        self.active.is_some()
    }

    /// Start a test at the given session time.
    pub fn start(&mut self, spec: SysIdSpec, time_s: f64) -> Result<(), SysIdError> {
        if let Some(active) = self.active {
            return Err(SysIdError::AlreadyRunning(state_name(&active.spec)));
        }

        let timeout_s = spec.duration_s.unwrap_or(self.params.timeout_s);
        if !(timeout_s > 0.0) {
            return Err(SysIdError::InvalidDuration(timeout_s));
        }

        let state = state_name(&spec);
        info!("Starting SysId {} on {:?}", state, spec.mechanism);

        self.write(SysIdRecord::marker(time_s, spec.mechanism, &state))?;

        self.active = Some(ActiveTest {
            spec,
            start_time_s: time_s,
            timeout_s,
        });

        Ok(())
    }

    fn volts(&self, spec: &SysIdSpec, elapsed_s: f64) -> f64 {
        let sign = spec.direction.sign();
        match spec.test {
            SysIdTest::Quasistatic => sign * self.params.ramp_rate_vps * elapsed_s,
            SysIdTest::Dynamic => sign * self.params.step_v(spec.mechanism),
        }
    }

    fn write(&mut self, record: SysIdRecord) -> Result<(), SysIdError> {
        match self.log {
            Some(ref mut log) => log.write(&record).map_err(SysIdError::LogError),
            None => Ok(()),
        }
    }
}

/// Name of the test state, for example `dynamic-reverse`.
pub fn state_name(spec: &SysIdSpec) -> String {
    format!("{}-{}", spec.test, spec.direction)
}

/// Measured position and velocity of the mechanism.
fn measure(mechanism: SysIdMechanism, sens: &DriveSensData) -> (f64, f64) {
    let n = NUM_MODULES as f64;
    match mechanism {
        SysIdMechanism::Translation => (
            sens.modules.iter().map(|m| m.drive_pos_m).sum::<f64>() / n,
            sens.modules.iter().map(|m| m.drive_vel_ms).sum::<f64>() / n,
        ),
        SysIdMechanism::Rotation => (sens.gyro_heading_rad, sens.gyro_rate_rads),
        SysIdMechanism::Steer => (
            sens.modules.iter().map(|m| m.steer_angle_rad).sum::<f64>() / n,
            sens.modules.iter().map(|m| m.steer_vel_rads).sum::<f64>() / n,
        ),
    }
}
