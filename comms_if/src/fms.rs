//! # Field Management System signals

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Match state as reported by the field management system.
#[derive(Serialize, Deserialize, Debug, Default, Clone, Copy, PartialEq)]
pub struct MatchState {
    /// The alliance the robot is on, `None` if the field hasn't reported it yet.
    pub alliance: Option<AllianceSide>,

    /// True when running in a competition environment.
    pub is_competition: bool,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// The side of the field the robot starts on.
///
/// Paths are authored for the blue side, red is the geometric reflection of blue.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AllianceSide {
    Blue,
    Red,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for AllianceSide {
    fn default() -> Self {
        AllianceSide::Blue
    }
}

impl AllianceSide {
    pub fn is_red(&self) -> bool {
        matches!(self, AllianceSide::Red)
    }
}

impl MatchState {
    /// The alliance to use for this routine, blue if the field hasn't said otherwise.
    pub fn alliance_or_default(&self) -> AllianceSide {
        self.alliance.unwrap_or_default()
    }
}
