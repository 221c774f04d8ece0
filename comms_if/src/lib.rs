//! # Communications interface crate.
//!
//! Provides the interface types exchanged between the swerve control core and its external
//! collaborators, chiefly the actuation firmware and the field management system.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Mode commands accepted by the executable
pub mod tc;

/// Demand and sensor data definitions for equipment (the drivetrain)
pub mod eqpt;

/// Field management system signals (alliance, match state)
pub mod fms;
