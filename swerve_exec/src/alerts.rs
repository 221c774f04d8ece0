//! # Alerts
//!
//! Persistent status messages shown to the operator, grouped by name and split into info, warning
//! and error levels. The registry is constructed once by the executable and passed to whatever
//! needs to raise alerts.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{cmp::Ordering, collections::BTreeMap};

use log::{error, info, warn};
use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Group used when none is given.
pub const DEFAULT_GROUP: &str = "Alerts";

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Handle to an alert in an [`AlertRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AlertId(usize);

#[derive(Debug, Default)]
pub struct AlertRegistry {
    alerts: Vec<Alert>,
    groups: BTreeMap<String, Vec<AlertId>>,
}

#[derive(Debug, Clone)]
struct Alert {
    level: AlertLevel,
    message: String,
    active: bool,
    active_start_s: f64,
}

/// Active alert messages of one group, newest first.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AlertGroupTm {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub infos: Vec<String>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlertLevel {
    Info,
    Warning,
    Error,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl AlertRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a new inactive alert to the group, creating the group if needed.
    pub fn add(&mut self, group: &str, message: &str, level: AlertLevel) -> AlertId {
        let id = AlertId(self.alerts.len());

        self.alerts.push(Alert {
            level,
            message: message.to_string(),
            active: false,
            active_start_s: 0.0,
        });
        self.groups.entry(group.to_string()).or_default().push(id);

        id
    }

    /// Set whether the alert is active. The message is reported when the alert becomes active.
    pub fn set(&mut self, id: AlertId, active: bool, time_s: f64) {
        if let Some(alert) = self.alerts.get_mut(id.0) {
            if active && !alert.active {
                alert.active_start_s = time_s;
                report(alert.level, &alert.message);
            }
            alert.active = active;
        }
    }

    /// Change the alert's message, reporting it again if the alert is active.
    pub fn set_text(&mut self, id: AlertId, text: &str) {
        if let Some(alert) = self.alerts.get_mut(id.0) {
            if alert.active && text != alert.message {
                report(alert.level, text);
            }
            alert.message = text.to_string();
        }
    }

    pub fn toggle(&mut self, id: AlertId, time_s: f64) {
        let active = self.is_active(id);
        self.set(id, !active, time_s);
    }

    pub fn is_active(&self, id: AlertId) -> bool {
        self.alerts.get(id.0).map(|a| a.active).unwrap_or(false)
    }

    /// Messages of the active alerts in the group with the given level, most recently activated
    /// first.
    pub fn strings(&self, group: &str, level: AlertLevel) -> Vec<String> {
        let ids = match self.groups.get(group) {
            Some(ids) => ids,
            None => return Vec::new(),
        };

        let mut active: Vec<&Alert> = ids
            .iter()
            .filter_map(|id| self.alerts.get(id.0))
            .filter(|a| a.active && a.level == level)
            .collect();

        active.sort_by(|a, b| {
            b.active_start_s
                .partial_cmp(&a.active_start_s)
                .unwrap_or(Ordering::Equal)
        });

        active.iter().map(|a| a.message.clone()).collect()
    }

    /// Active messages of every group.
    pub fn tm(&self) -> BTreeMap<String, AlertGroupTm> {
        self.groups
            .keys()
            .map(|g| {
                (
                    g.clone(),
                    AlertGroupTm {
                        errors: self.strings(g, AlertLevel::Error),
                        warnings: self.strings(g, AlertLevel::Warning),
                        infos: self.strings(g, AlertLevel::Info),
                    },
                )
            })
            .collect()
    }
}

fn report(level: AlertLevel, message: &str) {
    match level {
        AlertLevel::Error => error!("{}", message),
        AlertLevel::Warning => warn!("{}", message),
        AlertLevel::Info => info!("{}", message),
    }
}
