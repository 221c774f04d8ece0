//! Main swerve drive executable entry point.
//!
//! # Architecture
//!
//! The general execution methodology consists of:
//!
//!     - Initialise all modules
//!     - Main loop:
//!         - System input acquisition:
//!             - Drivetrain sensing
//!             - Vision observations
//!         - Localisation processing
//!         - Mode processing, one of:
//!             - Autonomous routine with trajectory control
//!             - Teleoperation through the drive command translator
//!             - Characterization
//!         - Locomotion control processing
//!         - Drivetrain actuation
//!         - Telemetry
//!
//! # Modules
//!
//! All cyclic modules (e.g. `loco_ctrl`) shall meet the following requirements:
//!     1. Provide a public struct implementing the `util::module::State` trait.
//!

// ---------------------------------------------------------------------------
// USE MODULES FROM LIBRARY
// ---------------------------------------------------------------------------

use comms_if::{
    eqpt::drive::{DriveDems, NUM_MODULES},
    fms::{AllianceSide, MatchState},
    tc::{ExecArgs, Tc},
};
use swerve_lib::{
    alerts::{AlertId, AlertLevel, AlertRegistry, DEFAULT_GROUP},
    auto::{available_routines, AutoRoutine, AutoState, EventCmd, EventMap, LogCmd},
    data_store::{ActuationOwner, DataStore},
    drive_client::{DriveIf, LoopbackDrive},
    drive_cmd::{self, DriveCmd},
    loc::PoseEstimator,
    loco_ctrl::{self, LocoCtrl},
    operator_script::OperatorScript,
    params::SwerveExecParams,
    sys_id::{self, ArchiveSysIdLog, SysId, SysIdSpec},
    tm::{TmPacket, TmSink, TmWriter},
    traj_ctrl::TrajCtrl,
    vision_client::VisionClient,
};

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{
    eyre::{eyre, WrapErr},
    Report,
};
use log::{debug, error, info, warn};
use std::thread;
use std::time::{Duration, Instant};
use structopt::StructOpt;

// Internal
use util::{
    host,
    logger::{logger_init, LevelFilter},
    module::State,
    session::{self, Session},
};

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    // ---- EARLY INITIALISATION ----

    let args = ExecArgs::from_args();

    // Initialise session
    let session = Session::new("swerve_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Trace, &session).wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Swerve Drive Executable\n");
    info!(
        "Running on: {:#?}",
        host::get_uname().wrap_err("Failed to get host information")?
    );
    info!(
        "Session started at {}",
        session::get_epoch().with_timezone(&chrono::Local)
    );
    info!("Session directory: {:?}\n", session.session_root);
    debug!("CLI arguments: {:?}", args);

    // ---- LOAD PARAMETERS ----

    let exec_params: SwerveExecParams =
        util::params::load("swerve_exec.toml").wrap_err("Could not load exec params")?;

    let traj_dir = host::get_swerve_sw_root()
        .wrap_err("Could not find the software root")?
        .join(&exec_params.traj_dir);

    info!("Exec parameters loaded");

    // ---- MATCH STATE ----

    let match_state = match args.mode {
        Tc::Auto { red, .. } | Tc::Teleop { red, .. } => MatchState {
            alliance: Some(if red { AllianceSide::Red } else { AllianceSide::Blue }),
            is_competition: false,
        },
        Tc::List { competition } => MatchState {
            alliance: None,
            is_competition: competition,
        },
        Tc::SysId { .. } => MatchState::default(),
    };
    let alliance = match_state.alliance_or_default();

    // Listing doesn't run the loop
    if let Tc::List { .. } = args.mode {
        let routines = available_routines(&traj_dir, match_state.is_competition)
            .wrap_err("Could not list the available routines")?;

        info!("{} routines available in {:?}", routines.len(), traj_dir);
        for r in routines {
            println!("{}", r);
        }

        return Ok(());
    }

    // ---- INITIALISE DATASTORE ----

    info!("Initialising modules...");

    let mut ds = DataStore::default();
    ds.mode = args.mode.name();

    let mut tm = TmWriter::new(&session).wrap_err("Failed to initialise telemetry")?;

    let mut alerts = AlertRegistry::new();
    let exec_alerts = ExecAlerts::new(&mut alerts);

    // ---- INITIALISE MODULES ----

    let mut loco_ctrl = LocoCtrl::default();
    loco_ctrl
        .init("loco_ctrl.toml")
        .wrap_err("Failed to initialise LocoCtrl")?;
    info!("LocoCtrl init complete");

    let kinematics = loco_ctrl
        .kinematics()
        .cloned()
        .ok_or_else(|| eyre!("LocoCtrl has no kinematics after initialisation"))?;

    let mut loc = PoseEstimator::init("loc.toml", kinematics.clone())
        .wrap_err("Failed to initialise the pose estimator")?;
    info!("PoseEstimator init complete");

    let mut traj_ctrl =
        TrajCtrl::init("traj_ctrl.toml").wrap_err("Failed to initialise TrajCtrl")?;
    info!("TrajCtrl init complete");

    let mut mode = match args.mode {
        Tc::Auto {
            ref routine,
            no_reset,
            timeout_s,
            ..
        } => {
            let loaded =
                AutoRoutine::load(&traj_dir, routine, alliance, exec_params.field_length_m);

            let r = match loaded {
                Ok(r) => r,
                Err(e) => {
                    // Report the failure in telemetry before exiting
                    alerts.set_text(
                        exec_alerts.auto_config,
                        &format!("Autonomous routine \"{}\" could not be loaded", routine),
                    );
                    alerts.set(exec_alerts.auto_config, true, session::get_elapsed_seconds());
                    ds.alerts = alerts.tm();
                    if let Err(tm_err) = tm.send(&TmPacket::from_datastore(&ds)) {
                        warn!("Telemetry error: {}", tm_err);
                    }

                    return Err(e).wrap_err("Failed to load the autonomous routine");
                }
            };

            let num_segments = r.num_segments();
            let r = r
                .with_reset(!no_reset)
                .with_timeout(timeout_s.unwrap_or(exec_params.default_timeout_s))
                .wrap_err("Invalid routine timeout")?
                .with_sequential(segment_log_events(num_segments));

            info!(
                "Running routine \"{}\" ({} segments) for the {:?} alliance",
                routine, num_segments, alliance
            );

            Mode::Auto(Box::new(r))
        }
        Tc::Teleop { ref script, .. } => {
            let script = OperatorScript::load(script).wrap_err("Failed to load operator script")?;
            info!("Loaded operator script lasting {:.02} s", script.duration_s());

            let mut drive_cmd = DriveCmd::default();
            drive_cmd
                .init("drive_cmd.toml")
                .wrap_err("Failed to initialise DriveCmd")?;
            info!("DriveCmd init complete");

            Mode::Teleop {
                script,
                drive_cmd,
                start_time_s: None,
            }
        }
        Tc::SysId {
            mechanism,
            test,
            direction,
            duration_s,
        } => {
            let mut charac = SysId::default();
            charac
                .init("sys_id.toml")
                .wrap_err("Failed to initialise SysId")?;

            let log = ArchiveSysIdLog::new(&session)
                .wrap_err("Failed to create the characterization log")?;
            let mut charac = charac.with_log(log);

            charac
                .start(
                    SysIdSpec {
                        mechanism,
                        test,
                        direction,
                        duration_s,
                    },
                    session::get_elapsed_seconds(),
                )
                .wrap_err("Failed to start the characterization test")?;

            Mode::SysId(Box::new(charac))
        }
        Tc::List { .. } => return Err(eyre!("List mode does not run the control loop")),
    };

    info!("Module initialisation complete\n");

    // ---- INITIALISE CLIENTS ----

    let mut drive = LoopbackDrive::new(kinematics, exec_params.cycle_period_s);
    info!("Using the loopback drivetrain");

    let vision = match args.vision {
        Some(ref path) => Some(
            VisionClient::replay(path, session::get_elapsed_seconds)
                .wrap_err("Failed to start the vision replay")?,
        ),
        None => None,
    };

    // ---- MAIN LOOP ----

    info!("Beginning main loop\n");

    loop {
        // Get cycle start time
        let cycle_start_instant = Instant::now();

        // Clear items that need wiping at the start of the cycle
        ds.cycle_start(session::get_elapsed_seconds());
        let time_s = ds.time_s;

        // ---- DATA INPUT ----

        match drive.read_sens() {
            Ok(s) => ds.drive_sens = s,
            Err(e) => warn!("Could not read the drivetrain sensors: {}", e),
        }

        for (i, id) in exec_alerts.module_faults.iter().enumerate() {
            alerts.set(*id, ds.drive_sens.faults[i], time_s);
        }

        // ---- LOCALISATION ----

        loc.update_odometry(
            &ds.drive_sens.modules,
            ds.drive_sens.gyro_heading_rad,
            time_s,
        );

        // Rejections are counted in the loc report
        if let Some(ref v) = vision {
            for obs in v.drain() {
                loc.add_vision_measurement(&obs);
            }
        }

        ds.pose = loc.current_pose();
        ds.field_vel = loc.field_velocity(&ds.drive_sens.modules);

        // ---- MODE PROCESSING ----

        let finished = match mode {
            Mode::Auto(ref mut routine) => {
                ds.chassis_cmd = Some(routine.step(time_s, ds.dt_s, &mut loc, &mut traj_ctrl));
                ds.traj_ctrl_status_rpt = Some(traj_ctrl.report());

                if routine.state() == AutoState::TimedOut {
                    alerts.set(exec_alerts.auto_timeout, true, time_s);
                }

                ds.auto_tm = Some(routine.tm());

                // The routine may have reset the pose
                ds.pose = loc.current_pose();

                routine.is_finished()
            }
            Mode::Teleop {
                ref script,
                ref mut drive_cmd,
                ref mut start_time_s,
            } => {
                let script_time_s = time_s - *start_time_s.get_or_insert(time_s);

                let input = drive_cmd::InputData {
                    axes: script.axes_at(script_time_s),
                    heading_rad: ds.pose.heading_rad,
                    alliance,
                    dt_s: ds.dt_s,
                };

                match drive_cmd.proc(&input) {
                    Ok((cmd, rpt)) => {
                        ds.chassis_cmd = Some(cmd);
                        ds.drive_cmd_status_rpt = Some(rpt);
                    }
                    Err(e) => warn!("Error during DriveCmd processing: {}", e),
                }

                script.is_finished(script_time_s)
            }
            Mode::SysId(ref mut charac) => {
                let input = sys_id::InputData {
                    time_s,
                    sens: ds.drive_sens,
                    stop: false,
                };

                match charac.proc(&input) {
                    Ok((dems, rpt)) => {
                        if let Some(d) = dems {
                            if let Err(e) = ds.claim_actuation(ActuationOwner::SysId, d) {
                                error!("{}", e);
                            }
                        }
                        ds.sys_id_status_rpt = Some(rpt);
                        !charac.is_running()
                    }
                    Err(e) => {
                        error!("Error during SysId processing: {}", e);
                        true
                    }
                }
            }
        };

        // ---- LOCOMOTION CONTROL ----

        // Characterization drives the mechanisms directly, otherwise LocoCtrl converts this cycle's
        // chassis command, stopping if there isn't one.
        if ds.actuation_owner().is_none() {
            let input = loco_ctrl::InputData {
                cmd: ds.chassis_cmd,
                measured: ds.drive_sens.modules,
            };

            match loco_ctrl.proc(&input) {
                Ok((o, r)) => {
                    ds.loco_ctrl_output = o;
                    ds.loco_ctrl_status_rpt = r;

                    if let Err(e) = ds.claim_actuation(mode.owner(), DriveDems::Modules(o.targets))
                    {
                        error!("{}", e);
                    }
                }
                Err(e) => warn!("Error during LocoCtrl processing: {}", e),
            }
        }

        // ---- ACTUATION ----

        match drive.send_dems(&ds.actuation_dems()) {
            Ok(()) => alerts.set(exec_alerts.actuation, false, time_s),
            Err(e) => {
                alerts.set_text(
                    exec_alerts.actuation,
                    &format!("Could not send demands to the drivetrain: {}", e),
                );
                alerts.set(exec_alerts.actuation, true, time_s);
            }
        }

        // ---- TELEMETRY ----

        ds.loc_report = loc.report();
        ds.alerts = alerts.tm();

        if let Err(e) = tm.send(&TmPacket::from_datastore(&ds)) {
            warn!("Telemetry error: {}", e);
        }

        ds.cycle_end();

        if finished {
            info!("Mode {} finished after {:.02} s", ds.mode, time_s);
            break;
        }

        // ---- CYCLE MANAGEMENT ----

        let cycle_dur = Instant::now() - cycle_start_instant;
        let cycle_period = Duration::from_secs_f64(exec_params.cycle_period_s);

        // Get sleep duration
        match cycle_period.checked_sub(cycle_dur) {
            Some(d) => {
                ds.num_consec_cycle_overruns = 0;
                alerts.set(exec_alerts.overrun, false, time_s);
                thread::sleep(d);
            }
            None => {
                warn!(
                    "Cycle overran by {:.06} s",
                    cycle_dur.as_secs_f64() - cycle_period.as_secs_f64()
                );
                ds.num_consec_cycle_overruns += 1;

                if ds.num_consec_cycle_overruns > exec_params.max_consec_overruns {
                    alerts.set(exec_alerts.overrun, true, time_s);
                }
            }
        }
    }

    // ---- SHUTDOWN ----

    // Leave nothing moving
    if let Err(e) = drive.send_dems(&DriveDems::default()) {
        warn!("Could not stop the drivetrain: {}", e);
    }

    info!("End of execution");

    Ok(())
}

/// Sequential events logging the completion of each segment.
fn segment_log_events(num_segments: usize) -> EventMap {
    let mut events = EventMap::new();
    for i in 0..num_segments {
        events.insert(i, move || -> Box<dyn EventCmd> {
            Box::new(LogCmd::new(format!("Segment {} complete", i)))
        });
    }
    events
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Alerts raised by the executable.
struct ExecAlerts {
    module_faults: Vec<AlertId>,
    actuation: AlertId,
    overrun: AlertId,
    auto_timeout: AlertId,
    auto_config: AlertId,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The mode the executable is running in.
enum Mode {
    Auto(Box<AutoRoutine>),
    Teleop {
        script: OperatorScript,
        drive_cmd: DriveCmd,
        start_time_s: Option<f64>,
    },
    SysId(Box<SysId>),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ExecAlerts {
    fn new(alerts: &mut AlertRegistry) -> Self {
        Self {
            module_faults: (0..NUM_MODULES)
                .map(|i| {
                    alerts.add(
                        "Drive",
                        &format!("Swerve module {} is faulted", i),
                        AlertLevel::Error,
                    )
                })
                .collect(),
            actuation: alerts.add(
                "Drive",
                "Could not send demands to the drivetrain",
                AlertLevel::Error,
            ),
            overrun: alerts.add(
                DEFAULT_GROUP,
                "The control loop is overrunning",
                AlertLevel::Warning,
            ),
            auto_timeout: alerts.add(
                "Auto",
                "The autonomous routine timed out",
                AlertLevel::Warning,
            ),
            auto_config: alerts.add(
                "Auto",
                "The autonomous routine could not be loaded",
                AlertLevel::Error,
            ),
        }
    }
}

impl Mode {
    /// Who commands the drivetrain through LocoCtrl in this mode.
    fn owner(&self) -> ActuationOwner {
        match self {
            Mode::Auto(_) => ActuationOwner::Auto,
            Mode::Teleop { .. } => ActuationOwner::Teleop,
            // Stops between and after characterization tests
            Mode::SysId(_) => ActuationOwner::Exec,
        }
    }
}
