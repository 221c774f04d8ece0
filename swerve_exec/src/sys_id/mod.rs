//! # Characterization module
//!
//! Open loop voltage tests used to fit a dynamic model of the drivetrain's translation, rotation
//! and steering. Records are written to a log which is analysed offline.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod record;
mod params;
mod state;

// ---------------------------------------------------------------------------
// EXPORTS
// ---------------------------------------------------------------------------

pub use self::record::{ArchiveSysIdLog, SysIdLog, SysIdRecord};
pub use self::params::Params;
pub use self::state::{state_name, InputData, StatusReport, SysId, SysIdSpec, STATE_NONE};

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum SysIdError {
    #[error("Could not load parameters: {0}")]
    ParamLoadError(util::params::LoadError),

    #[error("A test ({0}) is already running")]
    AlreadyRunning(String),

    #[error("Test duration must be positive, found {0} s")]
    InvalidDuration(f64),

    #[error("Could not write the characterization log: {0}")]
    LogError(util::archive::ArchiveError),
}
