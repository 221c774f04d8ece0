//! # Drive command translator
//!
//! Converts the operator's normalised axes into a robot frame chassis velocity. Each cycle the
//! axes are deadbanded, slew limited, scaled by the slow mode axis, resolved into the robot frame
//! if field relative control is active, and finally scaled to the maximum chassis speeds.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod filters;
mod params;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

pub use filters::SlewRateLimiter;
pub use params::Params;

use comms_if::{eqpt::drive::ChassisVelocity, fms::AllianceSide};
use log::{info, trace};
use serde::{Deserialize, Serialize};
use util::{maths::apply_deadband, module::State};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The drive command translator.
pub struct DriveCmd {
    params: Params,

    field_relative: bool,

    forward_limiter: SlewRateLimiter,
    strafe_limiter: SlewRateLimiter,
    rotation_limiter: SlewRateLimiter,
}

/// Normalised operator axes, each in [-1, 1].
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct OperatorAxes {
    /// Forwards (away from the operator when field relative).
    pub forward: f64,

    /// Leftwards.
    pub strafe: f64,

    /// Anticlockwise rotation.
    pub rotation: f64,

    /// Slow mode, zero for full speed.
    pub slow: f64,
}

/// Input data to the translator.
#[derive(Debug, Clone, Copy)]
pub struct InputData {
    pub axes: OperatorAxes,

    /// Current heading estimate, used when field relative.
    ///
    /// Units: radians
    pub heading_rad: f64,

    /// The alliance the operator is standing on.
    pub alliance: AllianceSide,

    /// Time since the previous cycle.
    ///
    /// Units: seconds
    pub dt_s: f64,
}

/// Status report for the translator.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct StatusReport {
    pub field_relative: bool,

    /// Scale applied by the slow mode axis.
    pub speed_scale: f64,

    /// The axes after deadbanding and slew limiting.
    pub shaped: OperatorAxes,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum DriveCmdError {
    #[error("Could not load parameters: {0}")]
    ParamLoadError(util::params::LoadError),

    #[error("Invalid drive command parameters: {0}")]
    InvalidParams(String),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for DriveCmd {
    fn default() -> Self {
        let params = Params::default();
        Self {
            field_relative: params.field_relative,
            forward_limiter: SlewRateLimiter::new(params.translation_slew_rate_ps),
            strafe_limiter: SlewRateLimiter::new(params.translation_slew_rate_ps),
            rotation_limiter: SlewRateLimiter::new(params.rotation_slew_rate_ps),
            params,
        }
    }
}

impl State for DriveCmd {
    type InitData = &'static str;
    type InitError = DriveCmdError;

    type InputData = InputData;
    type OutputData = ChassisVelocity;
    type StatusReport = StatusReport;
    type ProcError = DriveCmdError;

    /// Expected init data is the path to the parameter file
    fn init(&mut self, init_data: Self::InitData) -> Result<(), Self::InitError> {
        let params: Params = util::params::load(init_data).map_err(DriveCmdError::ParamLoadError)?;

        *self = Self::new(params)?;

        Ok(())
    }

    fn proc(
        &mut self,
        input_data: &Self::InputData,
    ) -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError> {
        let axes = &input_data.axes;
        let dt_s = input_data.dt_s;

        let forward = self.forward_limiter.calculate(
            apply_deadband(sanitise(axes.forward), self.params.translation_deadband, 1.0),
            dt_s,
        );
        let strafe = self.strafe_limiter.calculate(
            apply_deadband(sanitise(axes.strafe), self.params.translation_deadband, 1.0),
            dt_s,
        );
        let rotation = self.rotation_limiter.calculate(
            apply_deadband(sanitise(axes.rotation), self.params.rotation_deadband, 1.0),
            dt_s,
        );

        let speed_scale = self.slow_mode_scale(sanitise(axes.slow));

        let mut vel = ChassisVelocity::new(
            forward * speed_scale * self.params.max_speed_ms,
            strafe * speed_scale * self.params.max_speed_ms,
            rotation * speed_scale * self.params.max_angular_rate_rads,
        );

        if self.field_relative {
            // Red operators stand at the other end of the field
            if input_data.alliance.is_red() {
                vel.vx_ms = -vel.vx_ms;
                vel.vy_ms = -vel.vy_ms;
            }

            vel = ChassisVelocity::from_field_relative(vel, input_data.heading_rad);
        }

        trace!("DriveCmd output: {:?}", vel);

        Ok((
            vel,
            StatusReport {
                field_relative: self.field_relative,
                speed_scale,
                shaped: OperatorAxes {
                    forward,
                    strafe,
                    rotation,
                    slow: axes.slow,
                },
            },
        ))
    }
}

impl DriveCmd {
    /// Create a new translator from the given parameters.
    pub fn new(params: Params) -> Result<Self, DriveCmdError> {
        for (name, db) in &[
            ("translation_deadband", params.translation_deadband),
            ("rotation_deadband", params.rotation_deadband),
        ] {
            if !(*db >= 0.0 && *db < 1.0) {
                return Err(DriveCmdError::InvalidParams(format!(
                    "{} must be in [0, 1), found {}",
                    name, db
                )));
            }
        }

        if !(params.slow_mode_min_scale >= 0.0 && params.slow_mode_min_scale <= 1.0) {
            return Err(DriveCmdError::InvalidParams(format!(
                "slow_mode_min_scale must be in [0, 1], found {}",
                params.slow_mode_min_scale
            )));
        }

        Ok(Self {
            field_relative: params.field_relative,
            forward_limiter: SlewRateLimiter::new(params.translation_slew_rate_ps),
            strafe_limiter: SlewRateLimiter::new(params.translation_slew_rate_ps),
            rotation_limiter: SlewRateLimiter::new(params.rotation_slew_rate_ps),
            params,
        })
    }

    pub fn is_field_relative(&self) -> bool {
        self.field_relative
    }

    pub fn set_field_relative(&mut self, field_relative: bool) {
        if field_relative != self.field_relative {
            info!(
                "Drive is now {}",
                if field_relative { "field relative" } else { "robot relative" }
            );
        }
        self.field_relative = field_relative;
    }

    pub fn toggle_field_relative(&mut self) {
        self.set_field_relative(!self.field_relative);
    }

    /// Return all slew limiters to zero, used when control is handed back to the operator.
    pub fn reset(&mut self) {
        self.forward_limiter.reset(0.0);
        self.strafe_limiter.reset(0.0);
        self.rotation_limiter.reset(0.0);
    }

    /// Speed scale for the slow mode axis, one with the axis released.
    fn slow_mode_scale(&self, slow: f64) -> f64 {
        1.0 - (1.0 - self.params.slow_mode_min_scale) * slow.abs()
    }
}

/// Clamp an axis into [-1, 1], treating garbage as released.
fn sanitise(axis: f64) -> f64 {
    if axis.is_finite() {
        axis.max(-1.0).min(1.0)
    } else {
        0.0
    }
}
