//! # Operator Script
//!
//! Replays operator inputs from a CSV file with the columns
//! `time_s,forward,strafe,rotation,slow`. Each row holds until the next row's time, and the script
//! ends at the time of the last row.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::path::Path;

use serde::Deserialize;

use crate::drive_cmd::OperatorAxes;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

pub struct OperatorScript {
    rows: Vec<ScriptRow>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
struct ScriptRow {
    time_s: f64,
    forward: f64,
    strafe: f64,
    rotation: f64,
    slow: f64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum OperatorScriptError {
    #[error("Could not read the operator script: {0}")]
    CsvError(csv::Error),

    #[error("The operator script contains no rows")]
    Empty,

    #[error("Row {0} of the operator script is earlier than the row before it")]
    NotInOrder(usize),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl OperatorScript {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, OperatorScriptError> {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(OperatorScriptError::CsvError)?;

        Self::from_reader(reader)
    }

    fn from_reader<R: std::io::Read>(
        mut reader: csv::Reader<R>,
    ) -> Result<Self, OperatorScriptError> {
        let rows = reader
            .deserialize()
            .collect::<Result<Vec<ScriptRow>, _>>()
            .map_err(OperatorScriptError::CsvError)?;

        if rows.is_empty() {
            return Err(OperatorScriptError::Empty);
        }

        if let Some(i) = rows.windows(2).position(|w| w[1].time_s < w[0].time_s) {
            return Err(OperatorScriptError::NotInOrder(i + 1));
        }

        Ok(Self { rows })
    }

    /// Time of the last row.
    ///
    /// Units: seconds
    pub fn duration_s(&self) -> f64 {
        self.rows.last().map(|r| r.time_s).unwrap_or(0.0)
    }

    pub fn is_finished(&self, time_s: f64) -> bool {
        time_s >= self.duration_s()
    }

    /// The axes at the given time since the script started. Released before the first row.
    pub fn axes_at(&self, time_s: f64) -> OperatorAxes {
        match self.rows.iter().rev().find(|r| r.time_s <= time_s) {
            Some(r) => OperatorAxes {
                forward: r.forward,
                strafe: r.strafe,
                rotation: r.rotation,
                slow: r.slow,
            },
            None => OperatorAxes::default(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn script(csv: &str) -> Result<OperatorScript, OperatorScriptError> {
        OperatorScript::from_reader(
            csv::ReaderBuilder::new()
                .trim(csv::Trim::All)
                .from_reader(csv.as_bytes()),
        )
    }

    #[test]
    fn test_rows_hold_until_next() {
        let s = script(
            "time_s, forward, strafe, rotation, slow\n\
             0.5, 1.0, 0.0, 0.0, 0.0\n\
             1.0, 0.0, 0.5, 0.0, 1.0\n\
             2.0, 0.0, 0.0, 0.0, 0.0\n",
        )
        .unwrap();

        assert_eq!(s.axes_at(0.0), OperatorAxes::default());
        assert_eq!(s.axes_at(0.7).forward, 1.0);
        assert_eq!(s.axes_at(1.5).strafe, 0.5);
        assert_eq!(s.axes_at(1.5).slow, 1.0);
        assert!(!s.is_finished(1.9));
        assert!(s.is_finished(2.0));
    }

    #[test]
    fn test_invalid_scripts() {
        assert!(matches!(
            script("time_s,forward,strafe,rotation,slow\n"),
            Err(OperatorScriptError::Empty)
        ));
        assert!(matches!(
            script("time_s,forward,strafe,rotation,slow\n1,0,0,0,0\n0.5,0,0,0,0\n"),
            Err(OperatorScriptError::NotInOrder(1))
        ));
        assert!(matches!(
            script("time_s,forward\n1,0\n"),
            Err(OperatorScriptError::CsvError(_))
        ));
    }
}
