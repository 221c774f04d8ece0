//! # Defines Telemetry Pack for Autonomy

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use comms_if::fms::AllianceSide;
use serde::{Deserialize, Serialize};

use super::CmdLogTm;

// -----------------------------------------------------------------------------------------------
// STRUCTS
// -----------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AutoTm {
    pub routine: String,
    pub alliance: AllianceSide,
    pub state: String,
    pub segment_index: Option<usize>,
    pub num_segments: usize,
    pub elapsed_s: f64,
    pub cmd_counts: CmdLogTm,
}
