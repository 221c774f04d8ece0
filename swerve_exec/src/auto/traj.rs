//! # Trajectories
//!
//! Trajectories are produced offline by the path planning tool and stored as `.traj` JSON files.
//! A trajectory group named `four_note` is the set of files `four_note.1.traj`,
//! `four_note.2.traj`, ... in the trajectory directory, each file being one segment of the group.
//!
//! Trajectories are always authored for the blue alliance, the red alliance's versions are found
//! by mirroring them across the field's centre line.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{
    collections::BTreeSet,
    fs,
    path::{Path, PathBuf},
};

use comms_if::eqpt::drive::ChassisVelocity;
use log::{debug, info};
use serde::Deserialize;

use crate::loc::Pose;
use crate::traj_ctrl::TrajectorySample;
use util::maths::{ang_dist, wrap_angle};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Name of the routine that is always available and does nothing.
pub const DO_NOTHING_ROUTINE: &str = "do_nothing";

/// Suffix of routines intended for a competition environment.
pub const COMPETITION_SUFFIX: &str = "_cmp";

/// Extension of trajectory files.
const TRAJ_EXT: &str = "traj";

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A single trajectory segment, an immutable time ordered list of reference states.
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    samples: Vec<TrajectorySample>,
}

/// An ordered list of trajectory segments sharing a name.
#[derive(Debug, Clone)]
pub struct TrajectoryGroup {
    pub name: String,
    pub segments: Vec<Trajectory>,
}

/// On-disk format of a trajectory file. Keys other than the samples are ignored.
#[derive(Debug, Deserialize)]
struct TrajFile {
    samples: Vec<TrajFileSample>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TrajFileSample {
    timestamp: f64,
    x: f64,
    y: f64,
    heading: f64,
    velocity_x: f64,
    velocity_y: f64,
    angular_velocity: f64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum TrajError {
    #[error("No trajectory files found for the group \"{0}\"")]
    GroupNotFound(String),

    #[error("Could not read {0:?}: {1}")]
    FileError(PathBuf, std::io::Error),

    #[error("Could not parse {0:?}: {1}")]
    ParseError(PathBuf, serde_json::Error),

    #[error("Trajectory group contains invalid segments at index(s) {0:?}")]
    InvalidSegments(Vec<usize>),

    #[error("A trajectory needs at least two samples in time order")]
    InvalidSamples,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Trajectory {
    /// Create a trajectory from samples, which must number at least two and not go back in time.
    pub fn new(samples: Vec<TrajectorySample>) -> Result<Self, TrajError> {
        let ordered = samples
            .windows(2)
            .all(|w| w[1].time_s >= w[0].time_s);

        if samples.len() < 2 || !ordered || !samples.iter().all(|s| s.time_s.is_finite()) {
            return Err(TrajError::InvalidSamples);
        }

        Ok(Self { samples })
    }

    /// Parse a trajectory from the contents of a `.traj` file.
    fn from_json(json: &str) -> Result<Result<Self, TrajError>, serde_json::Error> {
        let file: TrajFile = serde_json::from_str(json)?;

        let samples = file
            .samples
            .into_iter()
            .map(|s| TrajectorySample {
                time_s: s.timestamp,
                pose: Pose::new(s.x, s.y, s.heading),
                velocity_fd: ChassisVelocity::new(s.velocity_x, s.velocity_y, s.angular_velocity),
            })
            .collect();

        Ok(Self::new(samples))
    }

    pub fn samples(&self) -> &[TrajectorySample] {
        &self.samples
    }

    /// Duration of the trajectory.
    ///
    /// Units: seconds
    pub fn total_time_s(&self) -> f64 {
        match (self.samples.first(), self.samples.last()) {
            (Some(f), Some(l)) => l.time_s - f.time_s,
            _ => 0.0,
        }
    }

    pub fn initial_pose(&self) -> Pose {
        self.samples.first().map(|s| s.pose).unwrap_or_default()
    }

    /// Get the reference state `time_s` seconds into the trajectory.
    ///
    /// Times outside the trajectory are clamped to its ends. Between samples the state is linearly
    /// interpolated, with the heading taking the shortest way round.
    pub fn sample(&self, time_s: f64) -> TrajectorySample {
        let first = match self.samples.first() {
            Some(f) => f,
            None => return TrajectorySample::default(),
        };
        let t = time_s + first.time_s;

        // Index of the first sample after t
        let next = self.samples.iter().position(|s| s.time_s > t);

        // Returned times are relative to the first sample
        let relative = |s: &TrajectorySample| TrajectorySample {
            time_s: s.time_s - first.time_s,
            ..*s
        };

        match next {
            None => relative(self.samples.last().unwrap_or(first)),
            Some(0) => relative(first),
            Some(i) => {
                let a = &self.samples[i - 1];
                let b = &self.samples[i];
                let frac = (t - a.time_s) / (b.time_s - a.time_s);

                TrajectorySample {
                    time_s: t - first.time_s,
                    pose: Pose {
                        position_m_fd: a.pose.position_m_fd
                            + (b.pose.position_m_fd - a.pose.position_m_fd) * frac,
                        heading_rad: wrap_angle(
                            a.pose.heading_rad
                                + ang_dist(a.pose.heading_rad, b.pose.heading_rad) * frac,
                        ),
                    },
                    velocity_fd: ChassisVelocity::new(
                        lerp(a.velocity_fd.vx_ms, b.velocity_fd.vx_ms, frac),
                        lerp(a.velocity_fd.vy_ms, b.velocity_fd.vy_ms, frac),
                        lerp(a.velocity_fd.omega_rads, b.velocity_fd.omega_rads, frac),
                    ),
                }
            }
        }
    }

    /// Reflect the trajectory for the red alliance.
    ///
    /// Field X positions and velocities are reflected, headings and rotation rates reversed, and Y
    /// left unchanged. Mirroring twice gives back the original trajectory.
    pub fn mirrored(&self, field_length_m: f64) -> Trajectory {
        Trajectory {
            samples: self
                .samples
                .iter()
                .map(|s| TrajectorySample {
                    time_s: s.time_s,
                    pose: s.pose.mirrored(field_length_m),
                    velocity_fd: ChassisVelocity::new(
                        -s.velocity_fd.vx_ms,
                        s.velocity_fd.vy_ms,
                        -s.velocity_fd.omega_rads,
                    ),
                })
                .collect(),
        }
    }
}

impl TrajectoryGroup {
    /// A group with no segments, which completes as soon as it starts.
    pub fn empty(name: &str) -> Self {
        Self {
            name: name.to_string(),
            segments: Vec::new(),
        }
    }

    /// Load the group of the given name from the trajectory directory.
    pub fn load<P: AsRef<Path>>(traj_dir: P, name: &str) -> Result<Self, TrajError> {
        let mut segments = Vec::new();
        let mut invalid = Vec::new();

        for i in 1.. {
            let path = traj_dir.as_ref().join(format!("{}.{}.{}", name, i, TRAJ_EXT));
            if !path.is_file() {
                break;
            }

            let json = fs::read_to_string(&path).map_err(|e| TrajError::FileError(path.clone(), e))?;

            match Trajectory::from_json(&json).map_err(|e| TrajError::ParseError(path.clone(), e))? {
                Ok(t) => segments.push(t),
                Err(_) => invalid.push(i - 1),
            }
        }

        if segments.is_empty() && invalid.is_empty() {
            return Err(TrajError::GroupNotFound(name.to_string()));
        }

        if !invalid.is_empty() {
            return Err(TrajError::InvalidSegments(invalid));
        }

        info!(
            "Loaded trajectory group \"{}\" with {} segments",
            name,
            segments.len()
        );

        Ok(Self {
            name: name.to_string(),
            segments,
        })
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Total duration of all segments.
    ///
    /// Units: seconds
    pub fn total_time_s(&self) -> f64 {
        self.segments.iter().map(|s| s.total_time_s()).sum()
    }

    /// Reflect every segment for the red alliance.
    pub fn mirrored(&self, field_length_m: f64) -> TrajectoryGroup {
        TrajectoryGroup {
            name: self.name.clone(),
            segments: self
                .segments
                .iter()
                .map(|s| s.mirrored(field_length_m))
                .collect(),
        }
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// List the routines which can be run from the trajectory directory.
///
/// In a competition environment only routines whose name ends with `_cmp` are offered. The
/// do-nothing routine is always first.
pub fn available_routines<P: AsRef<Path>>(
    traj_dir: P,
    is_competition: bool,
) -> Result<Vec<String>, TrajError> {
    let dir = traj_dir.as_ref();
    let entries = fs::read_dir(dir).map_err(|e| TrajError::FileError(dir.to_path_buf(), e))?;

    let mut names = BTreeSet::new();

    for entry in entries {
        let entry = entry.map_err(|e| TrajError::FileError(dir.to_path_buf(), e))?;
        let file_name = entry.file_name();
        let file_name = match file_name.to_str() {
            Some(f) => f,
            None => continue,
        };

        if let Some(group) = group_name(file_name) {
            if !is_competition || group.ends_with(COMPETITION_SUFFIX) {
                names.insert(group.to_string());
            }
        }
    }

    debug!("Found routines {:?} in {:?}", names, dir);

    let mut routines = vec![DO_NOTHING_ROUTINE.to_string()];
    routines.extend(names.into_iter().filter(|n| n != DO_NOTHING_ROUTINE));

    Ok(routines)
}

/// Extract the group name from a segment file name of the form `<group>.<n>.traj`.
fn group_name(file_name: &str) -> Option<&str> {
    let stem = file_name.strip_suffix(TRAJ_EXT)?.strip_suffix('.')?;
    let dot = stem.rfind('.')?;

    let (group, index) = (&stem[..dot], &stem[dot + 1..]);

    if group.is_empty() || index.parse::<usize>().is_err() {
        None
    } else {
        Some(group)
    }
}

fn lerp(a: f64, b: f64, frac: f64) -> f64 {
    a + (b - a) * frac
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use std::f64::consts::PI;

    /// A straight line trajectory along field X at constant speed.
    pub(crate) fn straight(start_x: f64, length_m: f64, speed_ms: f64) -> Trajectory {
        let duration_s = length_m / speed_ms;
        let n = 10;
        let samples = (0..=n)
            .map(|i| {
                let t = duration_s * i as f64 / n as f64;
                TrajectorySample {
                    time_s: t,
                    pose: Pose::new(start_x + speed_ms * t, 1.0, 0.0),
                    velocity_fd: ChassisVelocity::new(speed_ms, 0.0, 0.0),
                }
            })
            .collect();
        Trajectory::new(samples).unwrap()
    }

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("swerve_traj_{}_{}", name, std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    const SEGMENT_JSON: &str = r#"{
        "samples": [
            {"x": 1.0, "y": 2.0, "heading": 0.0, "angularVelocity": 0.0, "velocityX": 0.0,
             "velocityY": 0.0, "timestamp": 0.0},
            {"x": 2.0, "y": 2.0, "heading": 0.5, "angularVelocity": 0.5, "velocityX": 1.0,
             "velocityY": 0.0, "timestamp": 1.0}
        ],
        "eventMarkers": []
    }"#;

    #[test]
    fn test_sample_interpolates_and_clamps() {
        let t = Trajectory::from_json(SEGMENT_JSON).unwrap().unwrap();
        assert_eq!(t.total_time_s(), 1.0);

        let mid = t.sample(0.5);
        assert!((mid.pose.x_m() - 1.5).abs() < 1e-12);
        assert!((mid.pose.heading_rad - 0.25).abs() < 1e-12);
        assert!((mid.velocity_fd.vx_ms - 0.5).abs() < 1e-12);

        assert_eq!(t.sample(-1.0).pose, t.initial_pose());
        assert_eq!(t.sample(5.0).pose, t.samples()[t.samples().len() - 1].pose);
    }

    #[test]
    fn test_sample_time_relative_to_start() {
        let samples = (0..3)
            .map(|i| TrajectorySample {
                time_s: 2.0 + i as f64,
                pose: Pose::new(i as f64, 0.0, 0.0),
                velocity_fd: ChassisVelocity::new(1.0, 0.0, 0.0),
            })
            .collect();
        let t = Trajectory::new(samples).unwrap();

        assert_eq!(t.total_time_s(), 2.0);
        assert_eq!(t.sample(-1.0).time_s, 0.0);
        assert_eq!(t.sample(0.5).time_s, 0.5);
        assert_eq!(t.sample(10.0).time_s, 2.0);
        assert_eq!(t.sample(10.0).pose.x_m(), 2.0);
    }

    #[test]
    fn test_heading_interpolates_short_way() {
        let mk = |t, h| TrajectorySample {
            time_s: t,
            pose: Pose::new(0.0, 0.0, h),
            velocity_fd: ChassisVelocity::zero(),
        };
        let t = Trajectory::new(vec![mk(0.0, PI - 0.1), mk(1.0, -PI + 0.1)]).unwrap();
        assert!((t.sample(0.5).pose.heading_rad.abs() - PI).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_samples() {
        assert!(Trajectory::new(vec![]).is_err());
        let s = TrajectorySample::default();
        let mut late = s;
        late.time_s = 1.0;
        assert!(Trajectory::new(vec![late, s]).is_err());
    }

    #[test]
    fn test_mirror_trajectory() {
        let l = 16.541;
        let t = Trajectory::from_json(SEGMENT_JSON).unwrap().unwrap();
        let m = t.mirrored(l);

        let (a, b) = (&t.samples()[1], &m.samples()[1]);
        assert!((b.pose.x_m() - (l - 2.0)).abs() < 1e-12);
        assert_eq!(b.pose.y_m(), a.pose.y_m());
        assert_eq!(b.velocity_fd.vx_ms, -1.0);
        assert_eq!(b.velocity_fd.omega_rads, -0.5);
        assert_eq!(b.velocity_fd.linear_speed_ms(), a.velocity_fd.linear_speed_ms());

        let back = m.mirrored(l);
        for (x, y) in back.samples().iter().zip(t.samples().iter()) {
            assert!(x.pose.distance_to(&y.pose) < 1e-9);
            assert!(ang_dist(x.pose.heading_rad, y.pose.heading_rad).abs() < 1e-9);
            assert_eq!(x.velocity_fd, y.velocity_fd);
        }
    }

    #[test]
    fn test_load_group_and_list() {
        let dir = temp_dir("load");
        for name in &["three.1.traj", "three.2.traj", "three.3.traj", "final_cmp.1.traj"] {
            fs::write(dir.join(name), SEGMENT_JSON).unwrap();
        }
        fs::write(dir.join("notes.txt"), "").unwrap();

        let g = TrajectoryGroup::load(&dir, "three").unwrap();
        assert_eq!(g.len(), 3);
        assert_eq!(g.total_time_s(), 3.0);

        assert!(matches!(
            TrajectoryGroup::load(&dir, "missing"),
            Err(TrajError::GroupNotFound(_))
        ));

        assert_eq!(
            available_routines(&dir, false).unwrap(),
            vec!["do_nothing", "final_cmp", "three"]
        );
        assert_eq!(
            available_routines(&dir, true).unwrap(),
            vec!["do_nothing", "final_cmp"]
        );
    }

    #[test]
    fn test_invalid_segment_reported() {
        let dir = temp_dir("invalid");
        fs::write(dir.join("bad.1.traj"), SEGMENT_JSON).unwrap();
        fs::write(dir.join("bad.2.traj"), r#"{"samples": []}"#).unwrap();

        match TrajectoryGroup::load(&dir, "bad") {
            Err(TrajError::InvalidSegments(i)) => assert_eq!(i, vec![1]),
            other => panic!("Unexpected {:?}", other),
        }
    }

    #[test]
    fn test_group_name() {
        assert_eq!(group_name("a.b.1.traj"), Some("a.b"));
        assert_eq!(group_name("four.12.traj"), Some("four"));
        assert_eq!(group_name("four.traj"), None);
        assert_eq!(group_name("four.x.traj"), None);
    }

    #[test]
    fn test_deployed_routines() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("../deploy/choreo");

        assert_eq!(
            available_routines(&dir, false).unwrap(),
            vec!["do_nothing", "taxi", "two_piece", "two_piece_cmp"]
        );
        assert_eq!(
            available_routines(&dir, true).unwrap(),
            vec!["do_nothing", "two_piece_cmp"]
        );

        let group = TrajectoryGroup::load(&dir, "two_piece").unwrap();
        assert_eq!(group.len(), 2);
        assert!((group.total_time_s() - 3.2).abs() < 1e-9);

        // Segments join up
        let end = group.segments[0].sample(group.segments[0].total_time_s());
        let gap = end.pose.distance_to(&group.segments[1].initial_pose());
        assert!(gap < 1e-6);
    }
}
