//! # Swerve library.
//!
//! This library allows other crates in the workspace to access items defined inside the swerve
//! crate, and holds every component the executable's control loop is built from.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Operator alerts - grouped status messages for the dashboard
pub mod alerts;

/// Autonomy - multi-segment autonomous routines with event commands
pub mod auto;

/// Data store - per-cycle data shared between the modules of the executable
pub mod data_store;

/// Drive command translator - converts operator axes into a chassis velocity
pub mod drive_cmd;

/// Drive client - interface to the drivetrain actuation firmware
pub mod drive_client;

/// Localisation module - provides the robot with an idea of where it is on the field
pub mod loc;

/// Locomotion control module - converts a chassis velocity into individual module targets
pub mod loco_ctrl;

/// Operator script - replays operator inputs from a file
pub mod operator_script;

/// Executable parameters
pub mod params;

/// Characterization routines - open loop voltage tests of the drivetrain
pub mod sys_id;

/// Telemetry - per-cycle packets and sinks
pub mod tm;

/// Trajectory control module - keeps the robot on the given trajectory
pub mod traj_ctrl;

/// Vision client - receives pose observations from the vision system
pub mod vision_client;
