//! # Characterization telecommand parameters

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

use super::ParseEnumError;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// The characterization test primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SysIdTest {
    /// Voltage ramps slowly from zero.
    Quasistatic,

    /// A fixed voltage step is applied.
    Dynamic,
}

/// The direction a characterization test drives the mechanism in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SysIdDirection {
    Forward,
    Reverse,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SysIdDirection {
    /// Sign applied to the test voltage.
    pub fn sign(&self) -> f64 {
        match self {
            SysIdDirection::Forward => 1.0,
            SysIdDirection::Reverse => -1.0,
        }
    }
}

impl FromStr for SysIdTest {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "quasistatic" | "qs" => Ok(SysIdTest::Quasistatic),
            "dynamic" | "dyn" => Ok(SysIdTest::Dynamic),
            _ => Err(ParseEnumError::Unknown {
                kind: "test",
                value: s.to_string(),
            }),
        }
    }
}

impl FromStr for SysIdDirection {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "forward" | "fwd" => Ok(SysIdDirection::Forward),
            "reverse" | "rev" => Ok(SysIdDirection::Reverse),
            _ => Err(ParseEnumError::Unknown {
                kind: "direction",
                value: s.to_string(),
            }),
        }
    }
}

impl Display for SysIdTest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SysIdTest::Quasistatic => write!(f, "quasistatic"),
            SysIdTest::Dynamic => write!(f, "dynamic"),
        }
    }
}

impl Display for SysIdDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SysIdDirection::Forward => write!(f, "forward"),
            SysIdDirection::Reverse => write!(f, "reverse"),
        }
    }
}
