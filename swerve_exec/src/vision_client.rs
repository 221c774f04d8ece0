//! # Vision Client
//!
//! Vision observations arrive at an irregular rate from a source outside the control loop. They
//! are queued on a channel and drained by the loop at the start of each cycle, so the pose
//! estimator is only ever touched by the loop itself.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{
    fs,
    path::{Path, PathBuf},
    sync::mpsc::{self, Receiver, Sender},
    thread::{self, JoinHandle},
    time::Duration,
};

use log::{debug, info};

use crate::loc::VisionObservation;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Interval at which the replay thread checks the clock.
const REPLAY_POLL_INTERVAL: Duration = Duration::from_millis(5);

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

pub struct VisionClient {
    rx: Receiver<VisionObservation>,

    // Detached when the client is dropped
    _replay_handle: Option<JoinHandle<()>>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum VisionClientError {
    #[error("Could not read the observation file {0:?}: {1}")]
    FileError(PathBuf, std::io::Error),

    #[error("Could not parse observation on line {0}: {1}")]
    ParseError(usize, serde_json::Error),

    #[error("Could not start the replay thread: {0}")]
    ThreadError(std::io::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl VisionClient {
    /// Create a client along with the sender observations should be pushed into.
    pub fn channel() -> (Sender<VisionObservation>, Self) {
        let (tx, rx) = mpsc::channel();
        (
            tx,
            Self {
                rx,
                _replay_handle: None,
            },
        )
    }

    /// Replay observations from a JSON-lines file.
    ///
    /// Each observation is released once `clock` (session time) reaches the observation's
    /// timestamp. The whole file is parsed before the replay starts.
    pub fn replay<P, C>(path: P, clock: C) -> Result<Self, VisionClientError>
    where
        P: AsRef<Path>,
        C: Fn() -> f64 + Send + 'static,
    {
        let observations = load_observations(path.as_ref())?;
        info!(
            "Replaying {} vision observations from {:?}",
            observations.len(),
            path.as_ref()
        );

        let (tx, mut client) = Self::channel();

        let handle = thread::Builder::new()
            .name("vision_replay".into())
            .spawn(move || {
                for obs in observations {
                    while clock() < obs.time_s {
                        thread::sleep(REPLAY_POLL_INTERVAL);
                    }
                    // Receiver gone means the loop has stopped
                    if tx.send(obs).is_err() {
                        return;
                    }
                }
                debug!("Vision replay complete");
            })
            .map_err(VisionClientError::ThreadError)?;

        client._replay_handle = Some(handle);

        Ok(client)
    }

    /// Take every observation received since the last call, oldest first.
    pub fn drain(&self) -> Vec<VisionObservation> {
        self.rx.try_iter().collect()
    }
}

/// Parse a JSON-lines observation file, ignoring blank lines.
fn load_observations(path: &Path) -> Result<Vec<VisionObservation>, VisionClientError> {
    let contents =
        fs::read_to_string(path).map_err(|e| VisionClientError::FileError(path.to_path_buf(), e))?;

    contents
        .lines()
        .enumerate()
        .filter(|(_, l)| !l.trim().is_empty())
        .map(|(i, l)| serde_json::from_str(l).map_err(|e| VisionClientError::ParseError(i + 1, e)))
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::loc::Pose;

    #[test]
    fn test_channel_drains_in_order() {
        let (tx, client) = VisionClient::channel();
        assert!(client.drain().is_empty());

        for t in &[0.1, 0.2] {
            tx.send(VisionObservation {
                pose: Pose::default(),
                time_s: *t,
                std_devs: None,
            })
            .unwrap();
        }

        let obs = client.drain();
        assert_eq!(obs.len(), 2);
        assert_eq!(obs[0].time_s, 0.1);
        assert!(client.drain().is_empty());
    }

    #[test]
    fn test_replay_file() {
        let path = std::env::temp_dir().join(format!("vision_replay_{}.jsonl", std::process::id()));
        fs::write(
            &path,
            r#"{"pose": {"position_m_fd": [1.0, 2.0], "heading_rad": 0.5}, "time_s": 0.0}

{"pose": {"position_m_fd": [1.1, 2.0], "heading_rad": 0.5}, "time_s": 0.1, "std_devs": [0.5, 0.5, 1.0]}
"#,
        )
        .unwrap();

        let client = VisionClient::replay(&path, || 1.0e9).unwrap();

        let mut obs = Vec::new();
        for _ in 0..200 {
            obs.extend(client.drain());
            if obs.len() == 2 {
                break;
            }
            thread::sleep(Duration::from_millis(5));
        }

        assert_eq!(obs.len(), 2);
        assert_eq!(obs[1].std_devs, Some([0.5, 0.5, 1.0]));
        assert!((obs[0].pose.x_m() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_bad_line_reported() {
        let path = std::env::temp_dir().join(format!("vision_bad_{}.jsonl", std::process::id()));
        fs::write(&path, "{\"time_s\": 1.0}\n").unwrap();

        assert!(matches!(
            VisionClient::replay(&path, || 0.0),
            Err(VisionClientError::ParseError(1, _))
        ));
    }
}
