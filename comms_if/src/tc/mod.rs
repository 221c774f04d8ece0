//! # Telecommand module
//!
//! Telecommands select the mode the executable runs in. They are parsed from the command line
//! with `structopt`, and are serialisable so that they can be recorded in the session telemetry.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use structopt::StructOpt;
use thiserror::Error;

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod sys_id;

pub use sys_id::{SysIdDirection, SysIdTest};

use crate::eqpt::drive::SysIdMechanism;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Arguments to the control executable.
#[derive(Debug, Clone, Serialize, Deserialize, StructOpt)]
#[structopt(name = "swerve_exec", about = "Swerve drive control executable")]
pub struct ExecArgs {
    /// A JSON-lines file of vision observations to replay into the pose estimator.
    #[structopt(long = "vision", parse(from_os_str))]
    pub vision: Option<PathBuf>,

    /// The mode to run in.
    #[structopt(subcommand)]
    pub mode: Tc,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// A mode telecommand.
#[derive(Debug, Clone, Serialize, Deserialize, StructOpt)]
pub enum Tc {
    /// Run a named autonomous routine.
    #[structopt(name = "auto")]
    Auto {
        /// Name of the trajectory group to run.
        routine: String,

        /// Run as the red alliance, mirroring the starting pose and all paths.
        #[structopt(long = "red")]
        red: bool,

        /// Keep the current pose estimate rather than resetting it to the start of the first
        /// segment.
        #[structopt(long = "no-reset")]
        no_reset: bool,

        /// Override the routine timeout in seconds.
        #[structopt(long = "timeout")]
        timeout_s: Option<f64>,
    },

    /// Run a characterization test on a drivetrain mechanism.
    #[structopt(name = "sys-id")]
    SysId {
        /// The mechanism to characterize (translation, rotation, steer).
        mechanism: SysIdMechanism,

        /// The test to perform (quasistatic, dynamic).
        test: SysIdTest,

        /// The direction to perform the test in (forward, reverse).
        direction: SysIdDirection,

        /// Stop the test after this many seconds, rather than the configured timeout.
        #[structopt(long = "duration")]
        duration_s: Option<f64>,
    },

    /// Drive the robot from a script of operator inputs.
    #[structopt(name = "teleop")]
    Teleop {
        /// CSV file of timestamped operator axis values.
        #[structopt(parse(from_os_str))]
        script: PathBuf,

        /// Run as the red alliance, which flips the field-relative operator perspective.
        #[structopt(long = "red")]
        red: bool,
    },

    /// List the autonomous routines which are available.
    #[structopt(name = "list")]
    List {
        /// Only offer routines intended for a competition environment.
        #[structopt(long = "competition")]
        competition: bool,
    },
}

/// Errors which can occur when parsing a mode enumeration from a string.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParseEnumError {
    #[error("Unknown {kind} \"{value}\"")]
    Unknown { kind: &'static str, value: String },
}

impl Tc {
    /// Short name of the mode, used in telemetry.
    pub fn name(&self) -> &'static str {
        match self {
            Tc::Auto { .. } => "auto",
            Tc::SysId { .. } => "sys-id",
            Tc::Teleop { .. } => "teleop",
            Tc::List { .. } => "list",
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_auto() {
        let args = ExecArgs::from_iter_safe(&[
            "swerve_exec",
            "auto",
            "four_note",
            "--red",
            "--timeout",
            "12.5",
        ])
        .unwrap();

        match args.mode {
            Tc::Auto {
                routine,
                red,
                no_reset,
                timeout_s,
            } => {
                assert_eq!(routine, "four_note");
                assert!(red);
                assert!(!no_reset);
                assert_eq!(timeout_s, Some(12.5));
            }
            _ => panic!("Expected auto mode"),
        }
        assert!(args.vision.is_none());
    }

    #[test]
    fn test_parse_sys_id() {
        let args = ExecArgs::from_iter_safe(&[
            "swerve_exec",
            "--vision",
            "obs.jsonl",
            "sys-id",
            "steer",
            "dynamic",
            "reverse",
        ])
        .unwrap();

        match args.mode {
            Tc::SysId {
                mechanism,
                test,
                direction,
                duration_s,
            } => {
                assert_eq!(mechanism, SysIdMechanism::Steer);
                assert_eq!(test, SysIdTest::Dynamic);
                assert_eq!(direction, SysIdDirection::Reverse);
                assert!(duration_s.is_none());
            }
            _ => panic!("Expected sys-id mode"),
        }
        assert_eq!(args.vision, Some(PathBuf::from("obs.jsonl")));
    }

    #[test]
    fn test_parse_rejects_bad_mechanism() {
        assert!(ExecArgs::from_iter_safe(&[
            "swerve_exec",
            "sys-id",
            "arm",
            "dynamic",
            "forward"
        ])
        .is_err());
    }
}
