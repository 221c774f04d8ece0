//! # Autonomous routine
//!
//! An [`AutoRoutine`] runs the segments of a trajectory group in order. During segment `i` the
//! parallel event command for `i` runs alongside the trajectory follower, and once the segment is
//! over the sequential event command for `i` runs to completion before segment `i + 1` starts.
//!
//! The routine moves through the following states:
//!
//! - `Idle` - not yet stepped.
//! - `Starting` - running the optional start command.
//! - `Resetting` - seeding the pose estimator with the start of the first segment.
//! - `RunningSegment(i)` - following segment `i`.
//! - `SequentialEvent(i)` - running the sequential event command of segment `i`.
//! - `Completed`, `TimedOut`, `Interrupted` - terminal, the chassis is commanded to stop.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{fmt::Display, path::Path};

use comms_if::{eqpt::drive::ChassisVelocity, fms::AllianceSide};
use log::{debug, info, warn};

use super::{
    traj::{TrajectoryGroup, DO_NOTHING_ROUTINE},
    AutoError, AutoTm, CmdFactory, CmdLogMode, CmdLogger, EventCmd, EventCtx, EventMap,
};
use crate::{loc::PoseEstimator, traj_ctrl::TrajCtrl};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Timeout used when none is given.
///
/// Units: seconds
pub const DEFAULT_TIMEOUT_S: f64 = 16.0;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A multi-segment autonomous routine.
pub struct AutoRoutine {
    /// Segments to follow, already mirrored for the alliance.
    group: TrajectoryGroup,

    alliance: AllianceSide,

    should_reset: bool,

    timeout_s: f64,

    sequential: EventMap,
    parallel: EventMap,
    start_cmd: Option<CmdFactory>,

    state: AutoState,

    /// Session time of the first step.
    start_time_s: Option<f64>,

    /// Session time the current segment started.
    segment_start_s: f64,

    elapsed_s: f64,

    /// The event command currently running, if any.
    active: Option<ActiveCmd>,

    next_cmd_id: u64,
    cmd_logger: CmdLogger,
}

struct ActiveCmd {
    cmd: Box<dyn EventCmd>,
    id: u64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoState {
    Idle,
    Starting,
    Resetting,
    RunningSegment(usize),
    SequentialEvent(usize),
    Completed,
    TimedOut,
    Interrupted,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl AutoRoutine {
    /// Create a routine for the given blue alliance group.
    ///
    /// When `alliance` is red every segment is mirrored across the field, whose length along X is
    /// `field_length_m`. By default the routine resets the pose, has no event commands and times out
    /// after [`DEFAULT_TIMEOUT_S`].
    pub fn new(group: TrajectoryGroup, alliance: AllianceSide, field_length_m: f64) -> Self {
        let group = if alliance.is_red() {
            group.mirrored(field_length_m)
        } else {
            group
        };

        Self {
            group,
            alliance,
            should_reset: true,
            timeout_s: DEFAULT_TIMEOUT_S,
            sequential: EventMap::new(),
            parallel: EventMap::new(),
            start_cmd: None,
            state: AutoState::Idle,
            start_time_s: None,
            segment_start_s: 0.0,
            elapsed_s: 0.0,
            active: None,
            next_cmd_id: 0,
            cmd_logger: CmdLogger::default(),
        }
    }

    /// Load the named routine from the trajectory directory.
    ///
    /// The do-nothing routine needs no files and completes as soon as it is stepped.
    pub fn load<P: AsRef<Path>>(
        traj_dir: P,
        name: &str,
        alliance: AllianceSide,
        field_length_m: f64,
    ) -> Result<Self, AutoError> {
        let group = if name == DO_NOTHING_ROUTINE {
            TrajectoryGroup::empty(name)
        } else {
            TrajectoryGroup::load(traj_dir, name).map_err(AutoError::TrajError)?
        };

        Ok(Self::new(group, alliance, field_length_m))
    }

    pub fn with_reset(mut self, should_reset: bool) -> Self {
        self.should_reset = should_reset;
        self
    }

    pub fn with_timeout(mut self, timeout_s: f64) -> Result<Self, AutoError> {
        if !(timeout_s > 0.0) {
            return Err(AutoError::InvalidTimeout(timeout_s));
        }
        self.timeout_s = timeout_s;
        Ok(self)
    }

    pub fn with_sequential(mut self, events: EventMap) -> Self {
        self.sequential = events;
        self
    }

    pub fn with_parallel(mut self, events: EventMap) -> Self {
        self.parallel = events;
        self
    }

    /// Run a command before the pose is reset and the first segment starts.
    pub fn with_start_cmd<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> Box<dyn EventCmd> + 'static,
    {
        self.start_cmd = Some(Box::new(factory));
        self
    }

    pub fn with_cmd_log_mode(mut self, mode: CmdLogMode) -> Self {
        self.cmd_logger = CmdLogger::new(mode);
        self
    }

    pub fn state(&self) -> AutoState {
        self.state
    }

    pub fn is_finished(&self) -> bool {
        self.state.is_terminal()
    }

    pub fn num_segments(&self) -> usize {
        self.group.len()
    }

    pub fn tm(&self) -> AutoTm {
        AutoTm {
            routine: self.group.name.clone(),
            alliance: self.alliance,
            state: self.state.to_string(),
            segment_index: self.state.segment_index(),
            num_segments: self.group.len(),
            elapsed_s: self.elapsed_s,
            cmd_counts: self.cmd_logger.tm().clone(),
        }
    }

    /// Step the routine, returning the robot frame chassis velocity to command this cycle.
    ///
    /// `time_s` is the session time and `dt_s` the time since the last cycle. The pose estimator
    /// is read for the current pose and is reset when the routine starts, if configured to do so.
    pub fn step(
        &mut self,
        time_s: f64,
        dt_s: f64,
        loc: &mut PoseEstimator,
        traj_ctrl: &mut TrajCtrl,
    ) -> ChassisVelocity {
        if self.state.is_terminal() {
            return ChassisVelocity::zero();
        }

        let start_time_s = *self.start_time_s.get_or_insert(time_s);
        self.elapsed_s = time_s - start_time_s;

        if self.elapsed_s >= self.timeout_s {
            warn!(
                "Routine \"{}\" timed out after {:.2} s in {}",
                self.group.name, self.elapsed_s, self.state
            );
            self.terminate(AutoState::TimedOut);
            return ChassisVelocity::zero();
        }

        // Every state either produces a command or moves forward, so this ends once a command is
        // produced or a terminal state is reached.
        loop {
            let ctx = EventCtx {
                time_s,
                pose: loc.current_pose(),
            };

            match self.state {
                AutoState::Idle => {
                    info!("Starting routine \"{}\"", self.group.name);
                    match self.start_cmd.as_ref().map(|f| f()) {
                        Some(cmd) => {
                            self.start(cmd, &ctx);
                            self.set_state(AutoState::Starting);
                        }
                        None => self.set_state(AutoState::Resetting),
                    }
                }
                AutoState::Starting => {
                    if self.run_active(&ctx) {
                        return ChassisVelocity::zero();
                    }
                    self.set_state(AutoState::Resetting);
                }
                AutoState::Resetting => {
                    if self.should_reset {
                        if let Some(first) = self.group.segments.first() {
                            let pose = first.initial_pose();
                            info!("Resetting pose to {:?}", pose);
                            loc.reset_pose(pose);
                        }
                    }
                    self.begin_segment(0, time_s, traj_ctrl);
                }
                AutoState::RunningSegment(i) => {
                    let parallel_running = self.run_active(&ctx);

                    let traj = &self.group.segments[i];
                    let t = time_s - self.segment_start_s;

                    if t < traj.total_time_s() {
                        return traj_ctrl.follow(&traj.sample(t), &ctx.pose, dt_s);
                    }

                    // Trajectory over but the parallel command hasn't finished, hold still
                    if parallel_running {
                        return ChassisVelocity::zero();
                    }

                    let cmd = self.sequential.make(i);
                    self.start(cmd, &ctx);
                    self.set_state(AutoState::SequentialEvent(i));
                }
                AutoState::SequentialEvent(i) => {
                    if self.run_active(&ctx) {
                        return ChassisVelocity::zero();
                    }
                    self.begin_segment(i + 1, time_s, traj_ctrl);
                }
                AutoState::Completed | AutoState::TimedOut | AutoState::Interrupted => {
                    return ChassisVelocity::zero()
                }
            }
        }
    }

    /// Stop the routine early. Any running event command is ended as interrupted and the chassis
    /// must be commanded to stop.
    pub fn interrupt(&mut self) -> ChassisVelocity {
        if !self.state.is_terminal() {
            info!("Routine \"{}\" interrupted in {}", self.group.name, self.state);
            self.terminate(AutoState::Interrupted);
        }
        ChassisVelocity::zero()
    }

    /// Start segment `index`, or complete the routine if there are no more segments.
    fn begin_segment(&mut self, index: usize, time_s: f64, traj_ctrl: &mut TrajCtrl) {
        if index >= self.group.len() {
            info!(
                "Routine \"{}\" completed in {:.2} s",
                self.group.name, self.elapsed_s
            );
            self.terminate(AutoState::Completed);
            return;
        }

        traj_ctrl.reset();
        self.segment_start_s = time_s;
        self.set_state(AutoState::RunningSegment(index));

        let ctx = EventCtx {
            time_s,
            pose: self.group.segments[index].initial_pose(),
        };
        let cmd = self.parallel.make(index);
        self.start(cmd, &ctx);
    }

    /// Initialise a command and make it the active one. It is executed at least once before it
    /// can finish.
    fn start(&mut self, mut cmd: Box<dyn EventCmd>, ctx: &EventCtx) {
        let id = self.next_cmd_id;
        self.next_cmd_id += 1;

        cmd.init(ctx);
        self.cmd_logger.on_init(cmd.name(), id);

        self.active = Some(ActiveCmd { cmd, id });
    }

    /// Execute the active command, returning true if it is still running.
    fn run_active(&mut self, ctx: &EventCtx) -> bool {
        let mut active = match self.active.take() {
            Some(a) => a,
            None => return false,
        };

        active.cmd.execute(ctx);

        if active.cmd.is_finished() {
            active.cmd.end(false);
            self.cmd_logger.on_end(active.cmd.name(), active.id, false);
            false
        } else {
            self.active = Some(active);
            true
        }
    }

    fn terminate(&mut self, state: AutoState) {
        if let Some(mut active) = self.active.take() {
            active.cmd.end(true);
            self.cmd_logger.on_end(active.cmd.name(), active.id, true);
        }
        self.set_state(state);
    }

    fn set_state(&mut self, state: AutoState) {
        if state != self.state {
            debug!("AutoRoutine state change to: {}", state);
        }
        self.state = state;
    }
}

impl AutoState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AutoState::Completed | AutoState::TimedOut | AutoState::Interrupted
        )
    }

    pub fn segment_index(&self) -> Option<usize> {
        match self {
            AutoState::RunningSegment(i) | AutoState::SequentialEvent(i) => Some(*i),
            _ => None,
        }
    }
}

impl Display for AutoState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AutoState::Idle => write!(f, "Idle"),
            AutoState::Starting => write!(f, "Starting"),
            AutoState::Resetting => write!(f, "Resetting"),
            AutoState::RunningSegment(i) => write!(f, "RunningSegment({})", i),
            AutoState::SequentialEvent(i) => write!(f, "SequentialEvent({})", i),
            AutoState::Completed => write!(f, "Completed"),
            AutoState::TimedOut => write!(f, "TimedOut"),
            AutoState::Interrupted => write!(f, "Interrupted"),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        auto::{traj::test::straight, WaitCmd},
        loc::{LocParams, Pose},
        loco_ctrl::SwerveKinematics,
        traj_ctrl::Params as TrajCtrlParams,
    };
    use std::{cell::RefCell, rc::Rc};

    const DT_S: f64 = 0.02;
    const FIELD_LENGTH_M: f64 = 16.541;

    fn loc() -> PoseEstimator {
        let kin =
            SwerveKinematics::new([[0.3, 0.3], [0.3, -0.3], [-0.3, 0.3], [-0.3, -0.3]]).unwrap();
        PoseEstimator::new(LocParams::default(), kin).unwrap()
    }

    /// Three one second segments.
    fn three_segments() -> TrajectoryGroup {
        TrajectoryGroup {
            name: String::from("three"),
            segments: vec![
                straight(1.0, 1.0, 1.0),
                straight(2.0, 1.0, 1.0),
                straight(3.0, 1.0, 1.0),
            ],
        }
    }

    /// Step the routine until it finishes or `max_s` passes, returning the states visited and the
    /// final command.
    fn run(routine: &mut AutoRoutine, max_s: f64) -> (Vec<AutoState>, ChassisVelocity, f64) {
        let mut loc = loc();
        let mut traj_ctrl = TrajCtrl::new(TrajCtrlParams::default());
        let mut states = vec![];
        let mut cmd = ChassisVelocity::zero();
        let mut time_s = 0.0;

        for i in 0..((max_s / DT_S) as usize) {
            time_s = i as f64 * DT_S;
            cmd = routine.step(time_s, DT_S, &mut loc, &mut traj_ctrl);
            if states.last() != Some(&routine.state()) {
                states.push(routine.state());
            }
            if routine.is_finished() {
                break;
            }
        }

        (states, cmd, time_s)
    }

    #[derive(Default)]
    struct Record {
        inits: Vec<String>,
        executes: usize,
        ends: Vec<(String, bool)>,
    }

    /// Runs for a fixed number of cycles, recording its lifecycle.
    struct RecordCmd {
        name: String,
        cycles: usize,
        record: Rc<RefCell<Record>>,
    }

    impl EventCmd for RecordCmd {
        fn name(&self) -> &str {
            &self.name
        }

        fn init(&mut self, _ctx: &EventCtx) {
            self.record.borrow_mut().inits.push(self.name.clone());
        }

        fn execute(&mut self, _ctx: &EventCtx) {
            self.record.borrow_mut().executes += 1;
            self.cycles = self.cycles.saturating_sub(1);
        }

        fn is_finished(&self) -> bool {
            self.cycles == 0
        }

        fn end(&mut self, interrupted: bool) {
            self.record.borrow_mut().ends.push((self.name.clone(), interrupted));
        }
    }

    fn recorder(
        name: &str,
        cycles: usize,
        record: &Rc<RefCell<Record>>,
    ) -> impl Fn() -> Box<dyn EventCmd> {
        let name = name.to_string();
        let record = record.clone();
        move || -> Box<dyn EventCmd> {
            Box::new(RecordCmd {
                name: name.clone(),
                cycles,
                record: record.clone(),
            })
        }
    }

    #[test]
    fn test_empty_event_maps_complete() {
        let mut routine = AutoRoutine::new(three_segments(), AllianceSide::Blue, FIELD_LENGTH_M)
            .with_cmd_log_mode(CmdLogMode::TimesRan);

        let (states, cmd, _) = run(&mut routine, 5.0);

        let segments: Vec<usize> = states.iter().filter_map(|s| s.segment_index()).collect();
        assert_eq!(segments, vec![0, 1, 2]);
        assert_eq!(routine.state(), AutoState::Completed);
        assert!(cmd.is_zero());

        // A parallel and a sequential no-op for each segment
        assert_eq!(routine.tm().cmd_counts.times_ran.get("no_op"), Some(&6));
    }

    #[test]
    fn test_timeout() {
        let group = TrajectoryGroup {
            name: String::from("long"),
            segments: vec![straight(1.0, 5.0, 1.0)],
        };
        let record = Rc::new(RefCell::new(Record::default()));
        let mut routine = AutoRoutine::new(group, AllianceSide::Blue, FIELD_LENGTH_M)
            .with_timeout(2.0)
            .unwrap()
            .with_parallel(EventMap::new().with(0, recorder("intake", 1000, &record)));

        let (_, cmd, time_s) = run(&mut routine, 10.0);

        assert_eq!(routine.state(), AutoState::TimedOut);
        assert!((time_s - 2.0).abs() < 2.0 * DT_S);
        assert!(cmd.is_zero());
        assert_eq!(record.borrow().ends, vec![(String::from("intake"), true)]);

        // Terminal states keep commanding zero
        let mut traj_ctrl = TrajCtrl::new(TrajCtrlParams::default());
        assert!(routine.step(3.0, DT_S, &mut loc(), &mut traj_ctrl).is_zero());
    }

    #[test]
    fn test_invalid_timeout() {
        assert!(AutoRoutine::new(three_segments(), AllianceSide::Blue, FIELD_LENGTH_M)
            .with_timeout(0.0)
            .is_err());
    }

    #[test]
    fn test_events_run_in_order() {
        let record = Rc::new(RefCell::new(Record::default()));
        let mut routine = AutoRoutine::new(three_segments(), AllianceSide::Blue, FIELD_LENGTH_M)
            .with_start_cmd(recorder("start", 3, &record))
            .with_parallel(EventMap::new().with(1, recorder("par1", 2, &record)))
            .with_sequential(
                EventMap::new()
                    .with(0, recorder("seq0", 5, &record))
                    // Out of range indices are never triggered
                    .with(3, recorder("seq3", 1, &record))
                    .with(7, recorder("seq7", 1, &record)),
            );

        let (states, _, _) = run(&mut routine, 10.0);

        assert_eq!(routine.state(), AutoState::Completed);
        assert_eq!(states[0], AutoState::Starting);
        assert!(states.contains(&AutoState::SequentialEvent(0)));
        assert_eq!(record.borrow().inits, vec!["start", "seq0", "par1"]);
        assert!(record.borrow().ends.iter().all(|(_, i)| !i));
    }

    #[test]
    fn test_parallel_command_extends_segment() {
        let record = Rc::new(RefCell::new(Record::default()));
        let group = TrajectoryGroup {
            name: String::from("one"),
            segments: vec![straight(1.0, 1.0, 1.0)],
        };
        // Three seconds of cycles for a one second segment
        let mut routine = AutoRoutine::new(group, AllianceSide::Blue, FIELD_LENGTH_M)
            .with_parallel(EventMap::new().with(0, recorder("long", 150, &record)));

        let (_, _, time_s) = run(&mut routine, 10.0);

        assert_eq!(routine.state(), AutoState::Completed);
        assert!(time_s > 2.9);
    }

    #[test]
    fn test_reset_and_mirroring() {
        let mut loc = loc();
        let mut traj_ctrl = TrajCtrl::new(TrajCtrlParams::default());

        let mut blue = AutoRoutine::new(three_segments(), AllianceSide::Blue, FIELD_LENGTH_M);
        blue.step(0.0, DT_S, &mut loc, &mut traj_ctrl);
        let blue_pose = loc.current_pose();
        assert!(blue_pose.distance_to(&Pose::new(1.0, 1.0, 0.0)) < 1e-9);

        let mut red = AutoRoutine::new(three_segments(), AllianceSide::Red, FIELD_LENGTH_M);
        let cmd = red.step(0.0, DT_S, &mut loc, &mut traj_ctrl);
        let red_pose = loc.current_pose();
        assert!((red_pose.x_m() - (FIELD_LENGTH_M - 1.0)).abs() < 1e-9);
        assert!((red_pose.y_m() - 1.0).abs() < 1e-9);
        assert!((red_pose.heading_rad.abs() - std::f64::consts::PI).abs() < 1e-9);

        // Red robot faces field -X, so driving along the mirrored path is still forwards
        assert!(cmd.vx_ms > 0.0);

        // Without reset the pose is left alone
        let mut no_reset = AutoRoutine::new(three_segments(), AllianceSide::Blue, FIELD_LENGTH_M)
            .with_reset(false);
        no_reset.step(0.0, DT_S, &mut loc, &mut traj_ctrl);
        assert!(loc.current_pose().distance_to(&red_pose) < 1e-9);
    }

    #[test]
    fn test_interrupt() {
        let record = Rc::new(RefCell::new(Record::default()));
        let mut loc = loc();
        let mut traj_ctrl = TrajCtrl::new(TrajCtrlParams::default());
        let mut routine = AutoRoutine::new(three_segments(), AllianceSide::Blue, FIELD_LENGTH_M)
            .with_parallel(EventMap::new().with(0, recorder("par0", 100, &record)));

        let cmd = routine.step(0.0, DT_S, &mut loc, &mut traj_ctrl);
        assert!(!cmd.is_zero());
        assert_eq!(routine.state(), AutoState::RunningSegment(0));

        assert!(routine.interrupt().is_zero());
        assert_eq!(routine.state(), AutoState::Interrupted);
        assert_eq!(record.borrow().ends, vec![(String::from("par0"), true)]);
        assert!(routine.step(0.02, DT_S, &mut loc, &mut traj_ctrl).is_zero());
    }

    #[test]
    fn test_do_nothing_routine() {
        let mut routine =
            AutoRoutine::load("/nonexistent", DO_NOTHING_ROUTINE, AllianceSide::Red, FIELD_LENGTH_M)
                .unwrap();
        let (_, cmd, _) = run(&mut routine, 1.0);
        assert_eq!(routine.state(), AutoState::Completed);
        assert!(cmd.is_zero());

        assert!(AutoRoutine::load("/nonexistent", "four_note", AllianceSide::Blue, FIELD_LENGTH_M)
            .is_err());
    }

    #[test]
    fn test_sequential_wait_holds_still() {
        let group = TrajectoryGroup {
            name: String::from("one"),
            segments: vec![straight(1.0, 1.0, 1.0)],
        };
        let mut routine = AutoRoutine::new(group, AllianceSide::Blue, FIELD_LENGTH_M)
            .with_sequential(EventMap::new().with(0, || Box::new(WaitCmd::new(1.0))));

        let mut loc = loc();
        let mut traj_ctrl = TrajCtrl::new(TrajCtrlParams::default());
        let mut t = 0.0;
        while routine.state() != AutoState::SequentialEvent(0) {
            routine.step(t, DT_S, &mut loc, &mut traj_ctrl);
            t += DT_S;
        }
        assert!(routine.step(t, DT_S, &mut loc, &mut traj_ctrl).is_zero());
    }

    #[test]
    fn test_finished_commands_execute_once() {
        let record = Rc::new(RefCell::new(Record::default()));
        let group = TrajectoryGroup {
            name: String::from("one"),
            segments: vec![straight(1.0, 1.0, 1.0)],
        };
        // Zero cycle commands are finished as soon as they are initialised
        let mut routine = AutoRoutine::new(group, AllianceSide::Blue, FIELD_LENGTH_M)
            .with_start_cmd(recorder("start", 0, &record))
            .with_parallel(EventMap::new().with(0, recorder("par0", 0, &record)))
            .with_sequential(EventMap::new().with(0, recorder("seq0", 0, &record)));

        run(&mut routine, 5.0);

        assert_eq!(routine.state(), AutoState::Completed);
        assert_eq!(record.borrow().inits, vec!["start", "par0", "seq0"]);
        assert_eq!(record.borrow().executes, 3);
        assert_eq!(record.borrow().ends.len(), 3);
        assert!(record.borrow().ends.iter().all(|(_, i)| !i));
    }
}
