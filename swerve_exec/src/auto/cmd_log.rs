//! # Event command lifecycle logging

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::collections::BTreeMap;

use log::debug;
use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Tracks the lifecycle of event commands for telemetry.
#[derive(Debug, Clone, Default)]
pub struct CmdLogger {
    mode: CmdLogMode,
    tm: CmdLogTm,
}

/// Counters reported by the [`CmdLogger`]. Only those selected by the logger's mode are filled.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CmdLogTm {
    /// Whether each command instance (`name#id`) is running.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub is_active: BTreeMap<String, bool>,

    /// Number of running instances of each named command.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub active_count: BTreeMap<String, i64>,

    /// Number of times each named command has been started.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub times_ran: BTreeMap<String, u64>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// What the [`CmdLogger`] records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CmdLogMode {
    IsActive,
    ActiveCount,
    TimesRan,
    IsActiveAndActiveCount,
    IsActiveAndTimesRan,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for CmdLogMode {
    fn default() -> Self {
        CmdLogMode::IsActive
    }
}

impl CmdLogMode {
    fn logs_is_active(&self) -> bool {
        matches!(
            self,
            CmdLogMode::IsActive | CmdLogMode::IsActiveAndActiveCount | CmdLogMode::IsActiveAndTimesRan
        )
    }

    fn logs_active_count(&self) -> bool {
        matches!(self, CmdLogMode::ActiveCount | CmdLogMode::IsActiveAndActiveCount)
    }

    fn logs_times_ran(&self) -> bool {
        matches!(self, CmdLogMode::TimesRan | CmdLogMode::IsActiveAndTimesRan)
    }
}

impl CmdLogger {
    pub fn new(mode: CmdLogMode) -> Self {
        Self {
            mode,
            tm: CmdLogTm::default(),
        }
    }

    /// Record that a command instance has started.
    pub fn on_init(&mut self, name: &str, id: u64) {
        debug!("Event command {}#{} started", name, id);
        self.record(name, id, true);
    }

    /// Record that a command instance has finished, or was interrupted.
    pub fn on_end(&mut self, name: &str, id: u64, interrupted: bool) {
        debug!(
            "Event command {}#{} {}",
            name,
            id,
            if interrupted { "interrupted" } else { "finished" }
        );
        self.record(name, id, false);
    }

    pub fn tm(&self) -> &CmdLogTm {
        &self.tm
    }

    fn record(&mut self, name: &str, id: u64, active: bool) {
        if self.mode.logs_is_active() {
            self.tm.is_active.insert(format!("{}#{}", name, id), active);
        }

        if self.mode.logs_active_count() {
            *self.tm.active_count.entry(name.to_string()).or_insert(0) +=
                if active { 1 } else { -1 };
        }

        if self.mode.logs_times_ran() {
            let count = self.tm.times_ran.entry(name.to_string()).or_insert(0);
            if active {
                *count += 1;
            }
        }
    }
}
