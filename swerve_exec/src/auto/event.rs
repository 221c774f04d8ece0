//! # Event commands
//!
//! Event commands are attached to the segments of an autonomous routine, either running alongside
//! a segment (parallel) or after it has finished (sequential). They never command the chassis.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::collections::HashMap;

use log::info;

use crate::loc::Pose;

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// A command which runs as part of an autonomous routine.
///
/// The routine calls `init` once, then `execute` every cycle until `is_finished` returns true or
/// the routine cancels the command, and finally `end`.
pub trait EventCmd {
    /// Name used in logs and telemetry.
    fn name(&self) -> &str;

    fn init(&mut self, _ctx: &EventCtx) {}

    fn execute(&mut self, _ctx: &EventCtx) {}

    fn is_finished(&self) -> bool;

    /// Called once when the command stops, with `interrupted` set if it was cancelled before
    /// finishing.
    fn end(&mut self, _interrupted: bool) {}
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Data available to event commands each cycle.
#[derive(Debug, Clone, Copy)]
pub struct EventCtx {
    /// Session time.
    ///
    /// Units: seconds
    pub time_s: f64,

    /// Current pose estimate.
    pub pose: Pose,
}

/// Creates a fresh instance of an event command each time a routine runs.
pub type CmdFactory = Box<dyn Fn() -> Box<dyn EventCmd>>;

/// Map from segment index to the command to run for it. Indices without an entry get a
/// [`NoOpCmd`].
#[derive(Default)]
pub struct EventMap {
    factories: HashMap<usize, CmdFactory>,
}

/// Does nothing and finishes immediately.
#[derive(Debug, Default)]
pub struct NoOpCmd;

/// Finishes after a fixed time.
#[derive(Debug)]
pub struct WaitCmd {
    duration_s: f64,
    start_s: Option<f64>,
    finished: bool,
}

/// Logs a message when started and finishes immediately.
#[derive(Debug)]
pub struct LogCmd {
    message: String,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl EventMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a command factory for the given segment index, replacing any existing one.
    pub fn with<F>(mut self, index: usize, factory: F) -> Self
    where
        F: Fn() -> Box<dyn EventCmd> + 'static,
    {
        self.insert(index, factory);
        self
    }

    pub fn insert<F>(&mut self, index: usize, factory: F)
    where
        F: Fn() -> Box<dyn EventCmd> + 'static,
    {
        self.factories.insert(index, Box::new(factory));
    }

    /// Create the command for the given segment index.
    pub fn make(&self, index: usize) -> Box<dyn EventCmd> {
        match self.factories.get(&index) {
            Some(f) => f(),
            None => Box::new(NoOpCmd),
        }
    }
}

impl EventCmd for NoOpCmd {
    fn name(&self) -> &str {
        "no_op"
    }

    fn is_finished(&self) -> bool {
        true
    }
}

impl WaitCmd {
    pub fn new(duration_s: f64) -> Self {
        Self {
            duration_s,
            start_s: None,
            finished: false,
        }
    }
}

impl EventCmd for WaitCmd {
    fn name(&self) -> &str {
        "wait"
    }

    fn init(&mut self, ctx: &EventCtx) {
        self.start_s = Some(ctx.time_s);
        self.finished = self.duration_s <= 0.0;
    }

    fn execute(&mut self, ctx: &EventCtx) {
        if let Some(start_s) = self.start_s {
            self.finished = ctx.time_s - start_s >= self.duration_s;
        }
    }

    fn is_finished(&self) -> bool {
        self.finished
    }
}

impl LogCmd {
    pub fn new<S: Into<String>>(message: S) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl EventCmd for LogCmd {
    fn name(&self) -> &str {
        "log"
    }

    fn init(&mut self, ctx: &EventCtx) {
        info!("[auto event at {:?}] {}", ctx.pose.position_m_fd, self.message);
    }

    fn is_finished(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn ctx(time_s: f64) -> EventCtx {
        EventCtx {
            time_s,
            pose: Pose::default(),
        }
    }

    #[test]
    fn test_missing_index_is_no_op() {
        let map = EventMap::new().with(1, || Box::new(WaitCmd::new(1.0)));

        assert_eq!(map.make(0).name(), "no_op");
        assert!(map.make(0).is_finished());
        assert_eq!(map.make(1).name(), "wait");
    }

    #[test]
    fn test_wait_cmd() {
        let mut w = WaitCmd::new(0.5);
        w.init(&ctx(10.0));
        assert!(!w.is_finished());
        w.execute(&ctx(10.4));
        assert!(!w.is_finished());
        w.execute(&ctx(10.5));
        assert!(w.is_finished());
    }
}
