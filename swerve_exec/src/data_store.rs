//! # Data Store

use std::collections::BTreeMap;

use comms_if::eqpt::drive::{ChassisVelocity, DriveDems, DriveSensData};
use log::trace;
use serde::Serialize;

use crate::{
    alerts::AlertGroupTm,
    auto::AutoTm,
    drive_cmd,
    loc::{LocReport, Pose},
    loco_ctrl, sys_id, traj_ctrl,
};

// ---------------------------------------------------------------------------
// ENUMS
// ---------------------------------------------------------------------------

/// The mode which commands the drivetrain in a cycle.
#[derive(Debug, Eq, PartialEq, Copy, Clone, Serialize)]
pub enum ActuationOwner {
    Teleop,
    Auto,
    SysId,
    /// The executable itself, stopping the drivetrain.
    Exec,
}

#[derive(Debug, thiserror::Error)]
pub enum DataStoreError {
    #[error("{requested:?} cannot command the drivetrain, {owner:?} already has this cycle")]
    ActuationAlreadyClaimed {
        owner: ActuationOwner,
        requested: ActuationOwner,
    },
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Global data store for the executable.
#[derive(Default)]
pub struct DataStore {
    // Cycle management
    /// Number of cycles already executed
    pub num_cycles: u128,

    /// Session time at the start of this cycle
    pub time_s: f64,

    /// Time since the start of the previous cycle
    pub dt_s: f64,

    /// Name of the active mode
    pub mode: &'static str,

    // Drivetrain
    pub drive_sens: DriveSensData,

    // Localisation
    pub pose: Pose,
    pub field_vel: ChassisVelocity,
    pub loc_report: LocReport,

    // Chassis command for this cycle, from whichever mode is active
    pub chassis_cmd: Option<ChassisVelocity>,

    // Module status reports
    pub drive_cmd_status_rpt: Option<drive_cmd::StatusReport>,
    pub traj_ctrl_status_rpt: Option<traj_ctrl::StatusReport>,
    pub sys_id_status_rpt: Option<sys_id::StatusReport>,
    pub loco_ctrl_output: loco_ctrl::OutputData,
    pub loco_ctrl_status_rpt: loco_ctrl::StatusReport,

    // Autonomy
    pub auto_tm: Option<AutoTm>,

    // Alerts
    pub alerts: BTreeMap<String, AlertGroupTm>,

    /// The demands sent to the drivetrain this cycle and who sent them.
    actuation: Option<(ActuationOwner, DriveDems)>,

    // Monitoring Counters
    /// Number of consecutive cycle overruns
    pub num_consec_cycle_overruns: u64,
}

// ---------------------------------------------------------------------------
// IMPLS
// ---------------------------------------------------------------------------

impl DataStore {
    /// Perform actions required at the start of a cycle.
    ///
    /// Clears the per-cycle outputs, including the actuation claim.
    pub fn cycle_start(&mut self, time_s: f64) {
        self.dt_s = if self.num_cycles == 0 {
            0.0
        } else {
            time_s - self.time_s
        };
        self.time_s = time_s;

        self.chassis_cmd = None;
        self.actuation = None;
        self.drive_cmd_status_rpt = None;
        self.traj_ctrl_status_rpt = None;
        self.sys_id_status_rpt = None;
        self.loco_ctrl_output = loco_ctrl::OutputData::default();
        self.loco_ctrl_status_rpt = loco_ctrl::StatusReport::default();
    }

    /// Perform actions required at the end of a cycle.
    pub fn cycle_end(&mut self) {
        self.num_cycles += 1;
    }

    /// Claim the drivetrain for this cycle, setting the demands to send.
    ///
    /// Only one owner may command the drivetrain per cycle.
    pub fn claim_actuation(
        &mut self,
        owner: ActuationOwner,
        dems: DriveDems,
    ) -> Result<(), DataStoreError> {
        if let Some((current, _)) = self.actuation {
            return Err(DataStoreError::ActuationAlreadyClaimed {
                owner: current,
                requested: owner,
            });
        }

        trace!("{:?} claimed actuation with {:?}", owner, dems);
        self.actuation = Some((owner, dems));

        Ok(())
    }

    /// The owner of this cycle's demands, if claimed.
    pub fn actuation_owner(&self) -> Option<ActuationOwner> {
        self.actuation.map(|(o, _)| o)
    }

    /// The demands to send this cycle. If nothing claimed the drivetrain the modules are stopped.
    pub fn actuation_dems(&self) -> DriveDems {
        match self.actuation {
            Some((_, dems)) => dems,
            None => DriveDems::default(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use comms_if::eqpt::drive::SysIdMechanism;

    #[test]
    fn test_single_writer_per_cycle() {
        let mut ds = DataStore::default();
        ds.cycle_start(0.0);

        assert!(ds.actuation_dems().is_stop());

        let volts = DriveDems::SysIdVolts {
            mechanism: SysIdMechanism::Steer,
            volts: 1.0,
        };
        ds.claim_actuation(ActuationOwner::SysId, volts).unwrap();
        assert!(matches!(
            ds.claim_actuation(ActuationOwner::Teleop, DriveDems::default()),
            Err(DataStoreError::ActuationAlreadyClaimed {
                owner: ActuationOwner::SysId,
                requested: ActuationOwner::Teleop
            })
        ));
        assert_eq!(ds.actuation_dems(), volts);

        // A new cycle frees the drivetrain
        ds.cycle_end();
        ds.cycle_start(0.02);
        assert!((ds.dt_s - 0.02).abs() < 1e-12);
        assert!(ds.actuation_owner().is_none());
        ds.claim_actuation(ActuationOwner::Teleop, DriveDems::default())
            .unwrap();
    }
}
