//! # Pose estimator
//!
//! Wheel odometry is integrated every cycle and stored in a short history. Vision observations are
//! fused against the odometry pose interpolated at the observation's timestamp, so late
//! observations correct the pose the robot had when the image was taken. The correction is then
//! carried forwards onto the latest odometry.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::collections::VecDeque;

use comms_if::eqpt::drive::{ChassisVelocity, ModuleState, NUM_MODULES};
use log::{debug, trace};
use serde::{Deserialize, Serialize};

use super::{LocError, LocParams, Pose, Twist};
use crate::loco_ctrl::{ModulePosition, SwerveKinematics};
use util::{
    maths::{ang_dist, wrap_angle},
    params,
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Fuses wheel odometry and vision into a single pose estimate.
pub struct PoseEstimator {
    params: LocParams,

    kinematics: SwerveKinematics,

    /// Variance of the odometry state per axis.
    state_var: [f64; 3],

    /// Vision standard deviations used when an observation doesn't carry its own.
    default_vision_std_devs: [f64; 3],

    odometry: Option<Odometry>,

    /// Odometry poses over the history window, oldest first.
    odom_history: VecDeque<OdomSample>,

    /// Applied vision corrections, oldest first.
    vision_updates: VecDeque<VisionUpdate>,

    estimate: Pose,

    last_vision_time_s: Option<f64>,

    report: LocReport,
}

/// A pose observed by the vision system.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct VisionObservation {
    /// The observed pose of the robot.
    pub pose: Pose,

    /// Session time at which the observation was captured.
    ///
    /// Units: seconds
    pub time_s: f64,

    /// Standard deviations of the observation as [forward (m), lateral (m), heading (rad)].
    #[serde(default)]
    pub std_devs: Option<[f64; 3]>,
}

/// Running counters of the estimator, for telemetry.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct LocReport {
    pub num_vision_applied: u64,
    pub num_vision_rejected: u64,

    /// The correction applied by the latest accepted vision observation.
    pub last_correction: Option<Twist>,
}

#[derive(Debug, Clone, Copy)]
struct OdomSample {
    time_s: f64,
    pose: Pose,
}

/// A vision correction, stored as the corrected pose alongside the odometry pose it corrected.
#[derive(Debug, Clone, Copy)]
struct VisionUpdate {
    time_s: f64,
    vision_pose: Pose,
    odom_pose: Pose,
}

/// Dead reckoning from module positions and the gyro.
#[derive(Debug, Clone)]
struct Odometry {
    pose: Pose,
    gyro_offset_rad: f64,
    prev_heading_rad: f64,
    prev_gyro_rad: f64,
    prev_positions: [ModulePosition; NUM_MODULES],
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Result of offering a vision observation to the estimator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VisionOutcome {
    /// The observation was fused, applying the given correction at its timestamp.
    Applied(Twist),

    /// The observation was discarded, the estimate is unchanged.
    Rejected(VisionRejection),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisionRejection {
    /// No odometry has been recorded yet.
    NoOdometry,

    /// The observation is older than the odometry history.
    OutsideHistory,

    /// The observation is older than the last applied observation.
    OutOfOrder,

    /// The observation's standard deviations are negative or not finite.
    InvalidStdDevs,

    /// The observed position or heading is not finite.
    InvalidPose,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl PoseEstimator {
    /// Create a new estimator with the pose at the field origin.
    pub fn new(params: LocParams, kinematics: SwerveKinematics) -> Result<Self, LocError> {
        validate_std_devs(&params.state_std_devs)?;
        validate_std_devs(&params.vision_std_devs)?;

        if !(params.history_window_s > 0.0) {
            return Err(LocError::InvalidHistoryWindow(params.history_window_s));
        }

        let mut state_var = [0.0; 3];
        for (v, s) in state_var.iter_mut().zip(params.state_std_devs.iter()) {
            *v = s * s;
        }

        Ok(Self {
            default_vision_std_devs: params.vision_std_devs,
            params,
            kinematics,
            state_var,
            odometry: None,
            odom_history: VecDeque::new(),
            vision_updates: VecDeque::new(),
            estimate: Pose::default(),
            last_vision_time_s: None,
            report: LocReport::default(),
        })
    }

    /// Load the parameters from the given file and create a new estimator.
    pub fn init(params_path: &str, kinematics: SwerveKinematics) -> Result<Self, LocError> {
        let params: LocParams = params::load(params_path).map_err(LocError::ParamLoadError)?;

        Self::new(params, kinematics)
    }

    /// The current best estimate of the robot pose.
    pub fn current_pose(&self) -> Pose {
        self.estimate
    }

    pub fn report(&self) -> LocReport {
        self.report
    }

    /// Set the vision standard deviations used for observations which don't carry their own.
    pub fn configure_vision_std_devs(
        &mut self,
        forward_m: f64,
        lateral_m: f64,
        rotational_rad: f64,
    ) -> Result<(), LocError> {
        let std_devs = [forward_m, lateral_m, rotational_rad];
        validate_std_devs(&std_devs)?;

        debug!("Default vision std devs set to {:?}", std_devs);
        self.default_vision_std_devs = std_devs;

        Ok(())
    }

    /// Force the estimate to the given pose.
    ///
    /// Odometry is rebaselined on the last measured gyro and module positions, so the next update
    /// only integrates motion made after the reset. All history and vision corrections are
    /// discarded.
    pub fn reset_pose(&mut self, pose: Pose) {
        if let Some(ref mut odom) = self.odometry {
            odom.reset(pose);
        }

        self.odom_history.clear();
        self.vision_updates.clear();
        self.last_vision_time_s = None;
        self.estimate = pose;

        debug!("Pose reset to {:?}", pose);
    }

    /// Integrate the motion of the modules since the last update.
    pub fn update_odometry(
        &mut self,
        module_states: &[ModuleState; NUM_MODULES],
        gyro_heading_rad: f64,
        time_s: f64,
    ) -> Pose {
        let mut positions = [ModulePosition::default(); NUM_MODULES];
        for (p, s) in positions.iter_mut().zip(module_states.iter()) {
            p.distance_m = s.drive_pos_m;
            p.angle_rad = s.steer_angle_rad;
        }

        let odom_pose = match self.odometry {
            Some(ref mut odom) => odom.update(&self.kinematics, gyro_heading_rad, &positions),
            None => {
                let odom = Odometry::new(gyro_heading_rad, positions, self.estimate);
                let pose = odom.pose;
                self.odometry = Some(odom);
                pose
            }
        };

        // Keep the history sorted and inside the window
        while matches!(self.odom_history.back(), Some(s) if s.time_s >= time_s) {
            self.odom_history.pop_back();
        }
        self.odom_history.push_back(OdomSample {
            time_s,
            pose: odom_pose,
        });
        while matches!(
            self.odom_history.front(),
            Some(s) if s.time_s < time_s - self.params.history_window_s
        ) {
            self.odom_history.pop_front();
        }

        self.estimate = match self.vision_updates.back() {
            Some(update) => update.compensate(&odom_pose),
            None => odom_pose,
        };

        trace!("Odometry {:?}, estimate {:?}", odom_pose, self.estimate);

        self.estimate
    }

    /// Fuse a vision observation into the estimate.
    ///
    /// Stale, out of order and malformed observations are discarded without changing the estimate.
    pub fn add_vision_measurement(&mut self, obs: &VisionObservation) -> VisionOutcome {
        let outcome = self.fuse(obs);

        match outcome {
            VisionOutcome::Applied(correction) => {
                self.report.num_vision_applied += 1;
                self.report.last_correction = Some(correction);
                trace!("Vision at {:.3} s applied: {:?}", obs.time_s, correction);
            }
            VisionOutcome::Rejected(reason) => {
                self.report.num_vision_rejected += 1;
                debug!("Vision at {:.3} s rejected: {:?}", obs.time_s, reason);
            }
        }

        outcome
    }

    /// Field frame velocity of the robot measured by the modules.
    pub fn field_velocity(&self, module_states: &[ModuleState; NUM_MODULES]) -> ChassisVelocity {
        self.kinematics
            .to_chassis_velocity(module_states)
            .to_field_relative(self.estimate.heading_rad)
    }

    fn fuse(&mut self, obs: &VisionObservation) -> VisionOutcome {
        let std_devs = obs.std_devs.unwrap_or(self.default_vision_std_devs);
        if validate_std_devs(&std_devs).is_err() {
            return VisionOutcome::Rejected(VisionRejection::InvalidStdDevs);
        }

        let pose_finite = obs.pose.position_m_fd.iter().all(|p| p.is_finite())
            && obs.pose.heading_rad.is_finite();
        if !pose_finite {
            return VisionOutcome::Rejected(VisionRejection::InvalidPose);
        }

        if let Some(last_s) = self.last_vision_time_s {
            if obs.time_s < last_s {
                return VisionOutcome::Rejected(VisionRejection::OutOfOrder);
            }
        }

        let (odom_now, oldest_s) = match (&self.odometry, self.odom_history.front()) {
            (Some(odom), Some(oldest)) => (odom.pose, oldest.time_s),
            _ => return VisionOutcome::Rejected(VisionRejection::NoOdometry),
        };

        if !(obs.time_s >= oldest_s) {
            return VisionOutcome::Rejected(VisionRejection::OutsideHistory);
        }

        self.clean_up_vision_updates();

        let odom_at_t = self.sample_odometry(obs.time_s);
        let estimate_at_t = self.estimate_at(obs.time_s, &odom_at_t);

        // Scale the correction per axis by the Kalman gain
        let twist = estimate_at_t.log(&obs.pose);
        let gains = self.gains(&std_devs);
        let correction = Twist::new(
            twist.dx_m * gains[0],
            twist.dy_m * gains[1],
            twist.dtheta_rad * gains[2],
        );

        let update = VisionUpdate {
            time_s: obs.time_s,
            vision_pose: estimate_at_t.exp(&correction),
            odom_pose: odom_at_t,
        };

        while matches!(self.vision_updates.back(), Some(u) if u.time_s >= obs.time_s) {
            self.vision_updates.pop_back();
        }
        self.vision_updates.push_back(update);

        self.estimate = update.compensate(&odom_now);
        self.last_vision_time_s = Some(obs.time_s);

        VisionOutcome::Applied(correction)
    }

    /// Per axis gain for a vision observation with the given standard deviations.
    fn gains(&self, std_devs: &[f64; 3]) -> [f64; 3] {
        let mut k = [0.0; 3];

        for i in 0..3 {
            let q = self.state_var[i];
            let r = std_devs[i] * std_devs[i];

            k[i] = if q == 0.0 { 0.0 } else { q / (q + (q * r).sqrt()) };
        }

        k
    }

    /// Interpolate the odometry pose at the given time, clamped to the history.
    fn sample_odometry(&self, time_s: f64) -> Pose {
        let mut prev: Option<&OdomSample> = None;

        for sample in self.odom_history.iter() {
            if sample.time_s >= time_s {
                return match prev {
                    Some(p) => {
                        let frac = (time_s - p.time_s) / (sample.time_s - p.time_s);
                        p.pose.interpolate(&sample.pose, frac)
                    }
                    None => sample.pose,
                };
            }
            prev = Some(sample);
        }

        prev.map(|s| s.pose).unwrap_or(self.estimate)
    }

    /// The estimate the robot had at the given time, given the odometry at that time.
    fn estimate_at(&self, time_s: f64, odom_at_t: &Pose) -> Pose {
        match self.vision_updates.iter().rev().find(|u| u.time_s <= time_s) {
            Some(update) => update.compensate(odom_at_t),
            None => *odom_at_t,
        }
    }

    /// Drop vision updates which can no longer be needed to correct an odometry sample.
    fn clean_up_vision_updates(&mut self) {
        let oldest_s = match self.odom_history.front() {
            Some(s) => s.time_s,
            None => return,
        };

        // Keep the newest update at or before the oldest odometry sample, and everything after
        let keep_from = match self
            .vision_updates
            .iter()
            .rposition(|u| u.time_s <= oldest_s)
        {
            Some(i) => i,
            None => return,
        };

        self.vision_updates.drain(..keep_from);
    }
}

impl VisionUpdate {
    /// Carry this correction forward onto a later odometry pose.
    fn compensate(&self, pose: &Pose) -> Pose {
        let delta = pose.relative_to(&self.odom_pose);
        self.vision_pose.transform_by(&delta)
    }
}

impl Odometry {
    fn new(gyro_rad: f64, positions: [ModulePosition; NUM_MODULES], pose: Pose) -> Self {
        Self {
            pose,
            gyro_offset_rad: wrap_angle(pose.heading_rad - gyro_rad),
            prev_heading_rad: pose.heading_rad,
            prev_gyro_rad: gyro_rad,
            prev_positions: positions,
        }
    }

    fn update(
        &mut self,
        kinematics: &SwerveKinematics,
        gyro_rad: f64,
        positions: &[ModulePosition; NUM_MODULES],
    ) -> Pose {
        let heading_rad = wrap_angle(gyro_rad + self.gyro_offset_rad);

        let mut deltas = [ModulePosition::default(); NUM_MODULES];
        for (i, d) in deltas.iter_mut().enumerate() {
            d.distance_m = positions[i].distance_m - self.prev_positions[i].distance_m;
            d.angle_rad = positions[i].angle_rad;
        }

        // The gyro is trusted over the wheels for rotation
        let mut twist = kinematics.to_twist(&deltas);
        twist.dtheta_rad = ang_dist(self.prev_heading_rad, heading_rad);

        let moved = self.pose.exp(&twist);
        self.pose = Pose {
            position_m_fd: moved.position_m_fd,
            heading_rad,
        };

        self.prev_heading_rad = heading_rad;
        self.prev_gyro_rad = gyro_rad;
        self.prev_positions = *positions;

        self.pose
    }

    fn reset(&mut self, pose: Pose) {
        self.gyro_offset_rad = wrap_angle(pose.heading_rad - self.prev_gyro_rad);
        self.prev_heading_rad = pose.heading_rad;
        self.pose = pose;
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn validate_std_devs(std_devs: &[f64; 3]) -> Result<(), LocError> {
    if std_devs.iter().all(|s| s.is_finite() && *s >= 0.0) {
        Ok(())
    } else {
        Err(LocError::InvalidStdDevs(*std_devs))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::f64::consts::PI;

    fn estimator() -> PoseEstimator {
        let kin =
            SwerveKinematics::new([[0.3, 0.3], [0.3, -0.3], [-0.3, 0.3], [-0.3, -0.3]]).unwrap();
        PoseEstimator::new(LocParams::default(), kin).unwrap()
    }

    #[test]
    fn test_init_reports_missing_params() {
        let kin =
            SwerveKinematics::new([[0.3, 0.3], [0.3, -0.3], [-0.3, 0.3], [-0.3, -0.3]]).unwrap();
        assert!(matches!(
            PoseEstimator::init("loc_missing.toml", kin),
            Err(LocError::ParamLoadError(_))
        ));
    }

    /// All modules pointing forwards having driven the given distance.
    fn modules(dist_m: f64) -> [ModuleState; NUM_MODULES] {
        let mut m = [ModuleState::default(); NUM_MODULES];
        for s in m.iter_mut() {
            s.drive_pos_m = dist_m;
        }
        m
    }

    /// Drive forwards 0.1 m every 0.1 s from t = 0 to t = 1.
    fn drive_one_meter(est: &mut PoseEstimator) {
        for i in 0..=10 {
            est.update_odometry(&modules(0.1 * i as f64), 0.0, 0.1 * i as f64);
        }
    }

    fn obs(x: f64, y: f64, time_s: f64, std: f64) -> VisionObservation {
        VisionObservation {
            pose: Pose::new(x, y, 0.0),
            time_s,
            std_devs: Some([std; 3]),
        }
    }

    #[test]
    fn test_straight_odometry() {
        let mut est = estimator();
        drive_one_meter(&mut est);

        let p = est.current_pose();
        assert!((p.x_m() - 1.0).abs() < 1e-9);
        assert!(p.y_m().abs() < 1e-9);
    }

    #[test]
    fn test_reset_rebaselines_odometry() {
        let mut est = estimator();
        drive_one_meter(&mut est);

        est.reset_pose(Pose::new(5.0, 5.0, PI / 2.0));

        // No motion since the reset leaves the pose where it was put
        let p = est.update_odometry(&modules(1.0), 0.0, 1.1);
        assert!(p.distance_to(&Pose::new(5.0, 5.0, PI / 2.0)) < 1e-9);
        assert!((p.heading_rad - PI / 2.0).abs() < 1e-9);

        // Driving forwards now moves along field +Y
        let p = est.update_odometry(&modules(2.0), 0.0, 1.2);
        assert!((p.x_m() - 5.0).abs() < 1e-9);
        assert!((p.y_m() - 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_vision_before_odometry_rejected() {
        let mut est = estimator();
        assert_eq!(
            est.add_vision_measurement(&obs(1.0, 1.0, 0.0, 0.1)),
            VisionOutcome::Rejected(VisionRejection::NoOdometry)
        );
        assert_eq!(est.current_pose(), Pose::default());
    }

    #[test]
    fn test_larger_std_devs_correct_less() {
        let mut trusting = estimator();
        let mut doubting = estimator();
        drive_one_meter(&mut trusting);
        drive_one_meter(&mut doubting);

        trusting.add_vision_measurement(&obs(1.0, 0.5, 1.0, 0.1));
        doubting.add_vision_measurement(&obs(1.0, 0.5, 1.0, 2.0));

        let odom = Pose::new(1.0, 0.0, 0.0);
        let small = doubting.current_pose().distance_to(&odom);
        let large = trusting.current_pose().distance_to(&odom);
        assert!(small > 0.0);
        assert!(small < large);
        assert!(large < 0.5);
    }

    #[test]
    fn test_stale_observation_rejected() {
        let mut est = estimator();
        drive_one_meter(&mut est);

        assert!(matches!(
            est.add_vision_measurement(&obs(1.0, 0.2, 0.8, 0.5)),
            VisionOutcome::Applied(_)
        ));
        let before = est.current_pose();

        assert_eq!(
            est.add_vision_measurement(&obs(3.0, 3.0, 0.5, 0.01)),
            VisionOutcome::Rejected(VisionRejection::OutOfOrder)
        );
        assert_eq!(est.current_pose(), before);

        // Equal timestamps are still fused
        assert!(matches!(
            est.add_vision_measurement(&obs(1.0, 0.2, 0.8, 0.5)),
            VisionOutcome::Applied(_)
        ));
        assert_eq!(est.report().num_vision_rejected, 1);
    }

    #[test]
    fn test_late_observation_carried_forward() {
        let mut est = estimator();
        drive_one_meter(&mut est);

        // A perfectly trusted observation of where the robot was at the start
        est.add_vision_measurement(&obs(0.0, 1.0, 0.0, 0.0));

        let p = est.current_pose();
        assert!((p.x_m() - 1.0).abs() < 1e-9);
        assert!((p.y_m() - 1.0).abs() < 1e-9);

        // And the correction persists through later odometry
        let p = est.update_odometry(&modules(1.5), 0.0, 1.1);
        assert!((p.x_m() - 1.5).abs() < 1e-9);
        assert!((p.y_m() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_observation_outside_history_rejected() {
        let mut est = estimator();
        for i in 0..=40 {
            est.update_odometry(&modules(0.0), 0.0, 0.1 * i as f64);
        }
        assert_eq!(
            est.add_vision_measurement(&obs(1.0, 1.0, 1.0, 0.1)),
            VisionOutcome::Rejected(VisionRejection::OutsideHistory)
        );
    }

    #[test]
    fn test_configure_std_devs() {
        let mut est = estimator();
        assert!(est.configure_vision_std_devs(0.5, 0.5, 1.0).is_ok());
        assert!(matches!(
            est.configure_vision_std_devs(-0.5, 0.5, 1.0),
            Err(LocError::InvalidStdDevs(_))
        ));
    }

    #[test]
    fn test_field_velocity_follows_heading() {
        let mut est = estimator();
        est.reset_pose(Pose::new(0.0, 0.0, PI / 2.0));
        est.update_odometry(&modules(0.0), 0.0, 0.0);

        let mut m = modules(0.0);
        for s in m.iter_mut() {
            s.drive_vel_ms = 1.0;
        }

        let v = est.field_velocity(&m);
        assert!(v.vx_ms.abs() < 1e-9);
        assert!((v.vy_ms - 1.0).abs() < 1e-9);
        assert!(v.omega_rads.abs() < 1e-9);
    }

    #[test]
    fn test_non_finite_pose_rejected() {
        let mut est = estimator();
        drive_one_meter(&mut est);

        let mut bad = obs(std::f64::NAN, 0.0, 0.9, 0.1);
        assert_eq!(
            est.add_vision_measurement(&bad),
            VisionOutcome::Rejected(VisionRejection::InvalidPose)
        );

        bad = obs(1.0, 0.0, 0.9, 0.1);
        bad.pose.heading_rad = std::f64::INFINITY;
        assert_eq!(
            est.add_vision_measurement(&bad),
            VisionOutcome::Rejected(VisionRejection::InvalidPose)
        );
        assert_eq!(est.report().num_vision_rejected, 2);

        // Odometry carries on unaffected
        let p = est.update_odometry(&modules(2.0), 0.0, 2.0);
        assert!((p.x_m() - 2.0).abs() < 1e-9);
        assert!(p.y_m().abs() < 1e-9);
    }
}
