//! # Telemetry
//!
//! A [`TmPacket`] is built from the data store once per cycle and passed to a [`TmSink`]. The
//! [`TmWriter`] sink appends packets as JSON lines to a file in the session directory.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{
    collections::BTreeMap,
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use comms_if::eqpt::drive::{ChassisVelocity, DriveDems, ModuleState, NUM_MODULES};
use serde::Serialize;
use util::session::Session;

use crate::{
    alerts::AlertGroupTm,
    auto::AutoTm,
    data_store::{ActuationOwner, DataStore},
    drive_cmd,
    loc::{LocReport, Pose},
    loco_ctrl, sys_id, traj_ctrl,
};

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// Somewhere telemetry can be sent.
pub trait TmSink {
    fn send(&mut self, packet: &TmPacket) -> Result<(), TmError>;
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Writes telemetry packets as JSON lines.
pub struct TmWriter<W: Write> {
    writer: W,
}

/// Telemetry packet produced every cycle.
#[derive(Debug, Clone, Serialize)]
pub struct TmPacket {
    pub time_s: f64,

    pub cycle: u64,

    pub mode: String,

    pub pose: Pose,

    /// Fused field frame velocity.
    pub field_vel: ChassisVelocity,

    pub loc_report: LocReport,

    pub chassis_cmd: Option<ChassisVelocity>,

    pub actuation_owner: Option<ActuationOwner>,

    pub dems: DriveDems,

    pub measured_modules: [ModuleState; NUM_MODULES],

    pub module_faults: [bool; NUM_MODULES],

    /// True if any module is faulted.
    pub degraded: bool,

    pub loco_ctrl_output: loco_ctrl::OutputData,
    pub loco_ctrl_status_rpt: loco_ctrl::StatusReport,
    pub drive_cmd_status_rpt: Option<drive_cmd::StatusReport>,
    pub traj_ctrl_status_rpt: Option<traj_ctrl::StatusReport>,
    pub sys_id_status_rpt: Option<sys_id::StatusReport>,

    pub auto_tm: Option<AutoTm>,

    pub alerts: BTreeMap<String, AlertGroupTm>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum TmError {
    #[error("Could not write telemetry: {0}")]
    FileError(std::io::Error),

    #[error("Could not serialize the telemetry: {0}")]
    SerializationError(serde_json::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl TmWriter<BufWriter<File>> {
    /// Create a writer to `tm.jsonl` in the session directory.
    pub fn new(session: &Session) -> Result<Self, TmError> {
        Self::from_path(session.session_root.join("tm.jsonl"))
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, TmError> {
        let file = File::create(path).map_err(TmError::FileError)?;
        Ok(Self::from_writer(BufWriter::new(file)))
    }
}

impl<W: Write> TmWriter<W> {
    pub fn from_writer(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> TmSink for TmWriter<W> {
    fn send(&mut self, packet: &TmPacket) -> Result<(), TmError> {
        serde_json::to_writer(&mut self.writer, packet).map_err(TmError::SerializationError)?;
        self.writer.write_all(b"\n").map_err(TmError::FileError)?;
        self.writer.flush().map_err(TmError::FileError)
    }
}

impl TmPacket {
    pub fn from_datastore(ds: &DataStore) -> Self {
        Self {
            time_s: ds.time_s,
            cycle: ds.num_cycles as u64,
            mode: ds.mode.to_string(),
            pose: ds.pose,
            field_vel: ds.field_vel,
            loc_report: ds.loc_report,
            chassis_cmd: ds.chassis_cmd,
            actuation_owner: ds.actuation_owner(),
            dems: ds.actuation_dems(),
            measured_modules: ds.drive_sens.modules,
            module_faults: ds.drive_sens.faults,
            degraded: ds.drive_sens.is_degraded(),
            loco_ctrl_output: ds.loco_ctrl_output,
            loco_ctrl_status_rpt: ds.loco_ctrl_status_rpt,
            drive_cmd_status_rpt: ds.drive_cmd_status_rpt,
            traj_ctrl_status_rpt: ds.traj_ctrl_status_rpt,
            sys_id_status_rpt: ds.sys_id_status_rpt.clone(),
            auto_tm: ds.auto_tm.clone(),
            alerts: ds.alerts.clone(),
        }
    }
}
