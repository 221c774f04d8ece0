//! Characterization log records

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::eqpt::drive::SysIdMechanism;
use serde::Serialize;
use util::{
    archive::{ArchiveError, Archiver},
    session::Session,
};

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A sink for characterization records, read back offline to fit the drivetrain model.
pub trait SysIdLog {
    fn write(&mut self, record: &SysIdRecord) -> Result<(), ArchiveError>;
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// One row of the characterization log.
///
/// State markers have no voltage or measurements, samples have all fields filled.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SysIdRecord {
    /// Units: seconds
    pub time_s: f64,

    pub mechanism: SysIdMechanism,

    /// Test state, for example `quasistatic-forward`, or `none` when stopped.
    pub state: String,

    /// Units: volts
    pub volts: Option<f64>,

    /// Position of the mechanism, meters for translation and radians otherwise.
    pub position: Option<f64>,

    /// Velocity of the mechanism, meters/second for translation and radians/second otherwise.
    pub velocity: Option<f64>,
}

/// Writes the characterization log as a CSV file in the session archive.
pub struct ArchiveSysIdLog {
    arch: Archiver,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SysIdRecord {
    pub fn marker(time_s: f64, mechanism: SysIdMechanism, state: &str) -> Self {
        Self {
            time_s,
            mechanism,
            state: state.to_string(),
            volts: None,
            position: None,
            velocity: None,
        }
    }

    pub fn is_marker(&self) -> bool {
        self.volts.is_none()
    }
}

impl ArchiveSysIdLog {
    /// Create the log in the session's archive directory.
    pub fn new(session: &Session) -> Result<Self, ArchiveError> {
        Ok(Self {
            arch: Archiver::from_path(session, "sys_id.csv")?,
        })
    }
}

impl SysIdLog for ArchiveSysIdLog {
    fn write(&mut self, record: &SysIdRecord) -> Result<(), ArchiveError> {
        self.arch.serialise(record)
    }
}
